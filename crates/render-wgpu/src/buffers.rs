use wgpu::util::DeviceExt;

const FLOAT_SIZE: u64 = std::mem::size_of::<f32>() as u64;

/// Errors from validating and uploading vertex data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("mesh '{label}' has no vertex data")]
    EmptyVertices { label: String },
    #[error("mesh '{label}' has {floats} floats, not a multiple of {per_vertex} per vertex")]
    MisalignedVertices {
        label: String,
        floats: usize,
        per_vertex: usize,
    },
    #[error("mesh '{label}' index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        label: String,
        index: u32,
        vertex_count: usize,
    },
    #[error("vertex attributes must have 1 to 4 components, got {0}")]
    UnsupportedComponents(u32),
}

/// How a flat `[f32]` vertex stream is split into attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    /// `vec3` position at location 0.
    Position,
    /// Position-only with a caller-chosen component count at location 0;
    /// the stride follows the component count.
    Strided { components: u32 },
    /// `vec3` position at location 0, `vec2` texcoord at location 1.
    PositionTexCoord,
}

/// One attribute of a [`VertexLayout`], in byte terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDesc {
    pub location: u32,
    pub components: u32,
    pub offset: u64,
}

impl VertexLayout {
    /// Component counts per attribute, in location order.
    fn components(&self) -> &[u32] {
        match self {
            VertexLayout::Position => &[3],
            VertexLayout::Strided { components } => std::slice::from_ref(components),
            VertexLayout::PositionTexCoord => &[3, 2],
        }
    }

    pub fn floats_per_vertex(&self) -> usize {
        self.components().iter().sum::<u32>() as usize
    }

    pub fn stride(&self) -> u64 {
        self.floats_per_vertex() as u64 * FLOAT_SIZE
    }

    pub fn attributes(&self) -> Vec<AttributeDesc> {
        let mut offset = 0;
        self.components()
            .iter()
            .enumerate()
            .map(|(location, &components)| {
                let desc = AttributeDesc {
                    location: location as u32,
                    components,
                    offset,
                };
                offset += components as u64 * FLOAT_SIZE;
                desc
            })
            .collect()
    }

    /// Components supplied at `location`, if the layout provides it.
    pub fn components_at(&self, location: u32) -> Option<u32> {
        self.components().get(location as usize).copied()
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        for &components in self.components() {
            if !(1..=4).contains(&components) {
                return Err(BufferError::UnsupportedComponents(components));
            }
        }
        Ok(())
    }

    /// Owned wgpu attribute list; borrow it through [`WgpuVertexLayout::buffer_layout`].
    pub fn to_wgpu(&self) -> Result<WgpuVertexLayout, BufferError> {
        self.validate()?;
        let attributes = self
            .attributes()
            .into_iter()
            .map(|a| wgpu::VertexAttribute {
                format: float_format(a.components),
                offset: a.offset,
                shader_location: a.location,
            })
            .collect();
        Ok(WgpuVertexLayout {
            stride: self.stride(),
            attributes,
        })
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Attribute storage backing a `wgpu::VertexBufferLayout`.
#[derive(Debug, Clone)]
pub struct WgpuVertexLayout {
    stride: u64,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl WgpuVertexLayout {
    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Check vertex data against a layout and optional index list.
///
/// Returns the vertex count on success.
pub fn validate_mesh(
    label: &str,
    vertices: &[f32],
    layout: VertexLayout,
    indices: Option<&[u32]>,
) -> Result<usize, BufferError> {
    layout.validate()?;
    if vertices.is_empty() {
        return Err(BufferError::EmptyVertices {
            label: label.into(),
        });
    }
    let per_vertex = layout.floats_per_vertex();
    if vertices.len() % per_vertex != 0 {
        return Err(BufferError::MisalignedVertices {
            label: label.into(),
            floats: vertices.len(),
            per_vertex,
        });
    }
    let vertex_count = vertices.len() / per_vertex;
    if let Some(&index) = indices
        .into_iter()
        .flatten()
        .find(|&&i| i as usize >= vertex_count)
    {
        return Err(BufferError::IndexOutOfRange {
            label: label.into(),
            index,
            vertex_count,
        });
    }
    Ok(vertex_count)
}

/// Static GPU copy of a mesh: a vertex buffer and an optional index buffer.
///
/// Written once at creation; there is no update path.
pub struct MeshBuffers {
    layout: VertexLayout,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    index_buffer: Option<(wgpu::Buffer, u32)>,
}

impl MeshBuffers {
    pub fn upload(
        device: &wgpu::Device,
        label: &str,
        vertices: &[f32],
        layout: VertexLayout,
        indices: Option<&[u32]>,
    ) -> Result<Self, BufferError> {
        let vertex_count = validate_mesh(label, vertices, layout, indices)?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = indices.filter(|i| !i.is_empty()).map(|indices| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_index_buffer")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });

        tracing::debug!(
            label,
            vertex_count,
            index_count = index_buffer.as_ref().map_or(0, |(_, n)| *n),
            stride = layout.stride(),
            "uploaded mesh buffers"
        );

        Ok(Self {
            layout,
            vertex_buffer,
            vertex_count: vertex_count as u32,
            index_buffer,
        })
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> Option<u32> {
        self.index_buffer.as_ref().map(|(_, n)| *n)
    }

    /// Bind the buffers and issue one draw, indexed when an index buffer exists.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        match &self.index_buffer {
            Some((buffer, count)) => {
                pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..*count, 0, 0..1);
            }
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }
}
