//! Shader programs: linking compiled stages, named uniforms, and the wgpu
//! pipeline behind them.
//!
//! Linking checks what a GL driver would check when attaching and linking
//! stages: entry points exist, resource declarations agree, and every value
//! the fragment stage reads is written by the vertex stage. The reflected
//! uniform blocks then back the name-based setters of [`UniformWriter`].
//!
//! # Binding model
//! - `@group(0)` holds uniform buffers only. Each is bound with a dynamic
//!   offset so every draw in a frame gets its own slot.
//! - `@group(1)` holds material bindings: 2D float textures and filtering
//!   samplers.

use crate::buffers::VertexLayout;
use crate::shader::{CompiledStage, ShaderError, ShaderStage, compile_all, read_source};
use crate::texture::Texture;
use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use orrery_kernel::ProgramPaths;
use std::collections::BTreeMap;

pub const UNIFORM_GROUP: u32 = 0;
pub const MATERIAL_GROUP: u32 = 1;

/// One named member of a uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// A `var<uniform>` in `@group(0)`, flattened to named byte ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockLayout {
    pub binding: u32,
    pub name: String,
    pub size: u32,
    pub fields: Vec<UniformField>,
    pub visibility: wgpu::ShaderStages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Texture2d,
    Sampler,
}

/// A texture or sampler in `@group(1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialBinding {
    pub binding: u32,
    pub name: String,
    pub kind: MaterialKind,
    pub visibility: wgpu::ShaderStages,
}

#[derive(Debug, Clone)]
enum Resource {
    Uniform(UniformBlockLayout),
    Material(MaterialBinding),
}

impl Resource {
    fn visibility_mut(&mut self) -> &mut wgpu::ShaderStages {
        match self {
            Resource::Uniform(u) => &mut u.visibility,
            Resource::Material(m) => &mut m.visibility,
        }
    }

    /// Same shape, ignoring variable names and visibility.
    fn same_layout(&self, other: &Resource) -> bool {
        match (self, other) {
            (Resource::Uniform(a), Resource::Uniform(b)) => a.size == b.size && a.fields == b.fields,
            (Resource::Material(a), Resource::Material(b)) => a.kind == b.kind,
            _ => false,
        }
    }
}

/// Vertex and fragment stages that passed the link checks.
#[derive(Debug)]
pub struct LinkedProgram {
    label: String,
    vertex: CompiledStage,
    fragment: CompiledStage,
    vertex_entry: String,
    fragment_entry: String,
    vertex_inputs: BTreeMap<u32, naga::TypeInner>,
    uniform_blocks: Vec<UniformBlockLayout>,
    material_bindings: Vec<MaterialBinding>,
}

impl LinkedProgram {
    /// Read, compile, and link the stages named by `paths`.
    pub fn from_files(label: &str, paths: &ProgramPaths) -> Result<Self, ShaderError> {
        let mut sources = vec![
            (
                ShaderStage::Vertex,
                paths.vertex.display().to_string(),
                read_source(&paths.vertex)?,
            ),
            (
                ShaderStage::Fragment,
                paths.fragment.display().to_string(),
                read_source(&paths.fragment)?,
            ),
        ];
        if let Some(geometry) = &paths.geometry {
            sources.push((
                ShaderStage::Geometry,
                geometry.display().to_string(),
                read_source(geometry)?,
            ));
        }
        Self::from_stages(label, compile_all(sources)?)
    }

    /// Compile and link in-memory WGSL sources.
    pub fn from_sources(label: &str, vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let stages = compile_all(vec![
            (ShaderStage::Vertex, format!("{label}.vertex"), vertex.into()),
            (ShaderStage::Fragment, format!("{label}.fragment"), fragment.into()),
        ])?;
        Self::from_stages(label, stages)
    }

    fn from_stages(label: &str, stages: Vec<CompiledStage>) -> Result<Self, ShaderError> {
        let mut vertex = None;
        let mut fragment = None;
        for stage in stages {
            match stage.stage() {
                ShaderStage::Vertex => vertex = Some(stage),
                ShaderStage::Fragment => fragment = Some(stage),
                stage @ ShaderStage::Geometry => return Err(ShaderError::UnsupportedStage { stage }),
            }
        }
        let link_error = |reason: &str| ShaderError::Link {
            label: label.into(),
            reason: reason.into(),
        };
        let vertex = vertex.ok_or_else(|| link_error("no vertex stage"))?;
        let fragment = fragment.ok_or_else(|| link_error("no fragment stage"))?;
        Self::link(label, vertex, fragment)
    }

    /// Attach a compiled vertex and fragment stage and check they fit together.
    pub fn link(
        label: &str,
        vertex: CompiledStage,
        fragment: CompiledStage,
    ) -> Result<Self, ShaderError> {
        let result = link_interface(&vertex, &fragment);
        let interface = result.map_err(|reason| {
            let err = ShaderError::Link {
                label: label.into(),
                reason,
            };
            tracing::error!("{err}");
            err
        })?;

        tracing::info!(
            program = label,
            uniform_blocks = interface.uniform_blocks.len(),
            material_bindings = interface.material_bindings.len(),
            "linked shader program"
        );

        Ok(Self {
            label: label.into(),
            vertex,
            fragment,
            vertex_entry: interface.vertex_entry,
            fragment_entry: interface.fragment_entry,
            vertex_inputs: interface.vertex_inputs,
            uniform_blocks: interface.uniform_blocks,
            material_bindings: interface.material_bindings,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn uniform_blocks(&self) -> &[UniformBlockLayout] {
        &self.uniform_blocks
    }

    pub fn material_bindings(&self) -> &[MaterialBinding] {
        &self.material_bindings
    }

    /// Vertex input locations and their component counts.
    pub fn vertex_inputs(&self) -> impl Iterator<Item = (u32, Option<u32>)> + '_ {
        self.vertex_inputs
            .iter()
            .map(|(location, ty)| (*location, float_components(ty)))
    }

    /// Check that `layout` feeds every vertex input with matching components.
    pub fn check_vertex_layout(&self, layout: &VertexLayout) -> Result<(), ShaderError> {
        let link_error = |reason: String| ShaderError::Link {
            label: self.label.clone(),
            reason,
        };
        layout.validate().map_err(|e| link_error(e.to_string()))?;
        for (location, ty) in &self.vertex_inputs {
            let wanted = float_components(ty).ok_or_else(|| {
                link_error(format!(
                    "vertex input @location({location}) must be f32 scalar or vector, found {ty:?}"
                ))
            })?;
            match layout.components_at(*location) {
                Some(given) if given == wanted => {}
                Some(given) => {
                    return Err(link_error(format!(
                        "vertex input @location({location}) expects {wanted} components, layout supplies {given}"
                    )));
                }
                None => {
                    return Err(link_error(format!(
                        "vertex input @location({location}) is not supplied by the vertex layout"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Zeroed CPU staging for this program's uniform blocks.
    pub fn staging(&self) -> UniformStaging {
        UniformStaging::new(&self.uniform_blocks)
    }
}

struct Interface {
    vertex_entry: String,
    fragment_entry: String,
    vertex_inputs: BTreeMap<u32, naga::TypeInner>,
    uniform_blocks: Vec<UniformBlockLayout>,
    material_bindings: Vec<MaterialBinding>,
}

fn link_interface(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<Interface, String> {
    let vs_entry = vertex
        .entry_point()
        .ok_or_else(|| format!("'{}' has no @vertex entry point", vertex.label()))?;
    let fs_entry = fragment
        .entry_point()
        .ok_or_else(|| format!("'{}' has no @fragment entry point", fragment.label()))?;

    // Resources: merge both stages by (group, binding).
    let mut resources: BTreeMap<(u32, u32), Resource> = BTreeMap::new();
    for (stage, visibility) in [
        (vertex, wgpu::ShaderStages::VERTEX),
        (fragment, wgpu::ShaderStages::FRAGMENT),
    ] {
        for (key, resource) in reflect_resources(stage.module(), visibility)? {
            match resources.get_mut(&key) {
                Some(existing) if existing.same_layout(&resource) => {
                    *existing.visibility_mut() |= visibility;
                }
                Some(_) => {
                    return Err(format!(
                        "@group({}) @binding({}) is declared differently in the vertex and fragment stages",
                        key.0, key.1
                    ));
                }
                None => {
                    resources.insert(key, resource);
                }
            }
        }
    }

    // Stage interface: every fragment input must be a vertex output of the same type.
    let vs_module = vertex.module();
    let fs_module = fragment.module();
    let mut vs_outputs = BTreeMap::new();
    if let Some(result) = &vs_entry.function.result {
        collect_locations(vs_module, result.ty, result.binding.as_ref(), &mut vs_outputs);
    }
    let mut fs_inputs = BTreeMap::new();
    for arg in &fs_entry.function.arguments {
        collect_locations(fs_module, arg.ty, arg.binding.as_ref(), &mut fs_inputs);
    }
    for (location, input_ty) in &fs_inputs {
        match vs_outputs.get(location) {
            Some(output_ty) if output_ty == input_ty => {}
            Some(output_ty) => {
                return Err(format!(
                    "@location({location}) is written as {output_ty:?} but read as {input_ty:?}"
                ));
            }
            None => {
                return Err(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                ));
            }
        }
    }

    let mut vertex_inputs = BTreeMap::new();
    for arg in &vs_entry.function.arguments {
        collect_locations(vs_module, arg.ty, arg.binding.as_ref(), &mut vertex_inputs);
    }

    let mut uniform_blocks = Vec::new();
    let mut material_bindings = Vec::new();
    for resource in resources.into_values() {
        match resource {
            Resource::Uniform(u) => uniform_blocks.push(u),
            Resource::Material(m) => material_bindings.push(m),
        }
    }

    Ok(Interface {
        vertex_entry: vs_entry.name.clone(),
        fragment_entry: fs_entry.name.clone(),
        vertex_inputs,
        uniform_blocks,
        material_bindings,
    })
}

fn reflect_resources(
    module: &naga::Module,
    visibility: wgpu::ShaderStages,
) -> Result<Vec<((u32, u32), Resource)>, String> {
    let mut out = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let name = var.name.clone().unwrap_or_default();
        let key = (binding.group, binding.binding);
        let inner = &module.types[var.ty].inner;

        let resource = match var.space {
            naga::AddressSpace::Uniform => {
                if binding.group != UNIFORM_GROUP {
                    return Err(format!(
                        "uniform '{name}' must be in @group({UNIFORM_GROUP}), found @group({})",
                        binding.group
                    ));
                }
                Resource::Uniform(uniform_block(module, &name, binding.binding, inner, visibility))
            }
            naga::AddressSpace::Handle => {
                if binding.group != MATERIAL_GROUP {
                    return Err(format!(
                        "'{name}' must be in @group({MATERIAL_GROUP}), found @group({})",
                        binding.group
                    ));
                }
                let kind = match inner {
                    naga::TypeInner::Image {
                        dim: naga::ImageDimension::D2,
                        arrayed: false,
                        class:
                            naga::ImageClass::Sampled {
                                kind: naga::ScalarKind::Float,
                                multi: false,
                            },
                    } => MaterialKind::Texture2d,
                    naga::TypeInner::Sampler { comparison: false } => MaterialKind::Sampler,
                    other => return Err(format!("unsupported material binding '{name}': {other:?}")),
                };
                Resource::Material(MaterialBinding {
                    binding: binding.binding,
                    name,
                    kind,
                    visibility,
                })
            }
            other => return Err(format!("unsupported resource '{name}' in {other:?} space")),
        };
        out.push((key, resource));
    }
    Ok(out)
}

fn uniform_block(
    module: &naga::Module,
    name: &str,
    binding: u32,
    inner: &naga::TypeInner,
    visibility: wgpu::ShaderStages,
) -> UniformBlockLayout {
    let ctx = module.to_ctx();
    let (size, fields) = match inner {
        naga::TypeInner::Struct { members, span } => {
            let fields = members
                .iter()
                .filter_map(|m| {
                    Some(UniformField {
                        name: m.name.clone()?,
                        offset: m.offset,
                        size: module.types[m.ty].inner.size(ctx),
                    })
                })
                .collect();
            (*span, fields)
        }
        // A bare `var<uniform> x: T` is addressed by the variable name.
        other => {
            let size = other.size(ctx);
            let field = UniformField {
                name: name.into(),
                offset: 0,
                size,
            };
            (size, vec![field])
        }
    };
    UniformBlockLayout {
        binding,
        name: name.into(),
        size,
        fields,
        visibility,
    }
}

/// Record `@location` bindings of a value, looking through one struct level.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeMap<u32, naga::TypeInner>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                        out.insert(*location, module.types[member.ty].inner.clone());
                    }
                }
            }
        }
    }
}

fn float_components(ty: &naga::TypeInner) -> Option<u32> {
    match ty {
        naga::TypeInner::Scalar(s) if s.kind == naga::ScalarKind::Float => Some(1),
        naga::TypeInner::Vector { size, scalar } if scalar.kind == naga::ScalarKind::Float => {
            Some(*size as u32)
        }
        _ => None,
    }
}

/// Name-resolved uniform uploads.
///
/// Setters are fire-and-forget: a name that is not an active uniform is
/// ignored, and a value whose size does not match the member is dropped with
/// a warning.
pub trait UniformWriter {
    /// Write raw bytes to every member called `name`. Returns whether the
    /// name resolved.
    fn write_uniform(&mut self, name: &str, bytes: &[u8]) -> bool;

    /// WGSL has no host-shareable bool; booleans travel as `u32`.
    fn set_bool(&mut self, name: &str, value: bool) {
        self.write_uniform(name, bytemuck::bytes_of(&(value as u32)));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.write_uniform(name, bytemuck::bytes_of(&value));
    }

    fn set_uint(&mut self, name: &str, value: u32) {
        self.write_uniform(name, bytemuck::bytes_of(&value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.write_uniform(name, bytemuck::bytes_of(&value));
    }

    fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.write_uniform(name, bytemuck::cast_slice(&value.to_array()));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write_uniform(name, bytemuck::cast_slice(&value.to_array()));
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.write_uniform(name, bytemuck::cast_slice(&value.to_array()));
    }

    fn set_mat2(&mut self, name: &str, value: Mat2) {
        self.write_uniform(name, bytemuck::cast_slice(&value.to_cols_array()));
    }

    /// Columns are padded to 16 bytes, as in the uniform address space.
    fn set_mat3(&mut self, name: &str, value: Mat3) {
        let padded = [
            value.x_axis.extend(0.0).to_array(),
            value.y_axis.extend(0.0).to_array(),
            value.z_axis.extend(0.0).to_array(),
        ];
        self.write_uniform(name, bytemuck::cast_slice(&padded));
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write_uniform(name, bytemuck::cast_slice(&value.to_cols_array()));
    }
}

#[derive(Debug, Clone)]
struct StagedBlock {
    layout: UniformBlockLayout,
    bytes: Vec<u8>,
}

/// CPU copy of a program's uniform blocks, written by name.
#[derive(Debug, Clone)]
pub struct UniformStaging {
    blocks: Vec<StagedBlock>,
}

impl UniformStaging {
    pub fn new(layouts: &[UniformBlockLayout]) -> Self {
        Self {
            blocks: layouts
                .iter()
                .map(|layout| StagedBlock {
                    layout: layout.clone(),
                    bytes: vec![0; layout.size as usize],
                })
                .collect(),
        }
    }

    /// Blocks in binding order with their current bytes.
    pub fn blocks(&self) -> impl Iterator<Item = (&UniformBlockLayout, &[u8])> {
        self.blocks.iter().map(|b| (&b.layout, b.bytes.as_slice()))
    }

    /// Current bytes of the first member called `name`.
    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        self.blocks.iter().find_map(|block| {
            let field = block.layout.fields.iter().find(|f| f.name == name)?;
            Some(&block.bytes[field.offset as usize..][..field.size as usize])
        })
    }
}

impl UniformWriter for UniformStaging {
    fn write_uniform(&mut self, name: &str, bytes: &[u8]) -> bool {
        let mut resolved = false;
        for block in &mut self.blocks {
            for field in block.layout.fields.iter().filter(|f| f.name == name) {
                resolved = true;
                if field.size as usize != bytes.len() {
                    tracing::warn!(
                        uniform = name,
                        expected = field.size,
                        given = bytes.len(),
                        "uniform size mismatch; write skipped"
                    );
                    continue;
                }
                block.bytes[field.offset as usize..][..bytes.len()].copy_from_slice(bytes);
            }
        }
        if !resolved {
            tracing::trace!(uniform = name, "not an active uniform; write ignored");
        }
        resolved
    }
}

/// Dynamic offsets selecting one committed uniform slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    index: u32,
    offsets: Vec<u32>,
}

impl UniformSlot {
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Everything needed to build a [`ShaderProgram`] from files.
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    pub paths: &'a ProgramPaths,
    pub vertex_layout: VertexLayout,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    /// Uniform slots available between two [`ShaderProgram::begin_frame`] calls.
    pub max_draws_per_frame: u32,
}

struct GpuBlock {
    buffer: wgpu::Buffer,
    stride: u32,
}

/// A linked program: render pipeline, uniform buffers, and staging.
pub struct ShaderProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniform_bind_group: wgpu::BindGroup,
    material_layout: Option<wgpu::BindGroupLayout>,
    material_bindings: Vec<MaterialBinding>,
    staging: UniformStaging,
    gpu_blocks: Vec<GpuBlock>,
    capacity: u32,
    next_slot: u32,
}

impl ShaderProgram {
    /// Read, compile, and link the program's files, then build its pipeline.
    pub fn load(device: &wgpu::Device, desc: &ProgramDescriptor<'_>) -> Result<Self, ShaderError> {
        let linked = LinkedProgram::from_files(desc.label, desc.paths)?;
        Self::new(device, linked, desc)
    }

    pub fn new(
        device: &wgpu::Device,
        linked: LinkedProgram,
        desc: &ProgramDescriptor<'_>,
    ) -> Result<Self, ShaderError> {
        linked.check_vertex_layout(&desc.vertex_layout)?;
        let link_error = |reason: String| ShaderError::Link {
            label: linked.label.clone(),
            reason,
        };
        let vertex_layout = desc
            .vertex_layout
            .to_wgpu()
            .map_err(|e| link_error(e.to_string()))?;
        let capacity = desc.max_draws_per_frame.max(1);
        let alignment = device.limits().min_uniform_buffer_offset_alignment;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(linked.vertex.label()),
            source: wgpu::ShaderSource::Wgsl(linked.vertex.source().into()),
        });
        let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(linked.fragment.label()),
            source: wgpu::ShaderSource::Wgsl(linked.fragment.source().into()),
        });

        let uniform_entries: Vec<_> = linked
            .uniform_blocks
            .iter()
            .map(|block| wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility: block.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(block.size as u64),
                },
                count: None,
            })
            .collect();
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{}_uniform_layout", linked.label)),
            entries: &uniform_entries,
        });

        let gpu_blocks: Vec<GpuBlock> = linked
            .uniform_blocks
            .iter()
            .map(|block| {
                let stride = align_up(block.size, alignment);
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{}_{}_uniforms", linked.label, block.name)),
                    size: stride as u64 * capacity as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                GpuBlock { buffer, stride }
            })
            .collect();

        let uniform_bind_entries: Vec<_> = linked
            .uniform_blocks
            .iter()
            .zip(&gpu_blocks)
            .map(|(block, gpu)| wgpu::BindGroupEntry {
                binding: block.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &gpu.buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block.size as u64),
                }),
            })
            .collect();
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_uniform_bind_group", linked.label)),
            layout: &uniform_layout,
            entries: &uniform_bind_entries,
        });

        let material_layout = (!linked.material_bindings.is_empty()).then(|| {
            let entries: Vec<_> = linked
                .material_bindings
                .iter()
                .map(|m| wgpu::BindGroupLayoutEntry {
                    binding: m.binding,
                    visibility: m.visibility,
                    ty: match m.kind {
                        MaterialKind::Texture2d => wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        MaterialKind::Sampler => {
                            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                        }
                    },
                    count: None,
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{}_material_layout", linked.label)),
                entries: &entries,
            })
        });

        let mut bind_group_layouts = vec![&uniform_layout];
        bind_group_layouts.extend(material_layout.as_ref());
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pipeline_layout", linked.label)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{}_pipeline", linked.label)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(&linked.vertex_entry),
                compilation_options: Default::default(),
                buffers: &[vertex_layout.buffer_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(&linked.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: desc.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let err = link_error(err.to_string());
            tracing::error!("{err}");
            return Err(err);
        }

        tracing::debug!(program = %linked.label, capacity, "created render pipeline");

        Ok(Self {
            staging: linked.staging(),
            label: linked.label,
            pipeline,
            uniform_bind_group,
            material_layout,
            material_bindings: linked.material_bindings,
            gpu_blocks,
            capacity,
            next_slot: 0,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Make every uniform slot available again. Call once per frame before
    /// the first [`ShaderProgram::commit`].
    pub fn begin_frame(&mut self) {
        self.next_slot = 0;
    }

    /// Copy the staged uniform values into the next slot for one draw.
    pub fn commit(&mut self, queue: &wgpu::Queue) -> Result<UniformSlot, ShaderError> {
        if self.next_slot >= self.capacity {
            return Err(ShaderError::SlotsExhausted {
                label: self.label.clone(),
                capacity: self.capacity,
            });
        }
        let index = self.next_slot;
        self.next_slot += 1;

        let mut offsets = Vec::with_capacity(self.gpu_blocks.len());
        for ((_, bytes), gpu) in self.staging.blocks().zip(&self.gpu_blocks) {
            let offset = index * gpu.stride;
            queue.write_buffer(&gpu.buffer, offset as u64, bytes);
            offsets.push(offset);
        }
        Ok(UniformSlot { index, offsets })
    }

    /// Set the pipeline and the uniform slot for the next draw.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, slot: &UniformSlot) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(UNIFORM_GROUP, &self.uniform_bind_group, &slot.offsets);
    }

    /// Bind group for `@group(1)` pointing at `texture`, or `None` when the
    /// program samples nothing.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        texture: &Texture,
    ) -> Option<wgpu::BindGroup> {
        let layout = self.material_layout.as_ref()?;
        let entries: Vec<_> = self
            .material_bindings
            .iter()
            .map(|m| wgpu::BindGroupEntry {
                binding: m.binding,
                resource: match m.kind {
                    MaterialKind::Texture2d => wgpu::BindingResource::TextureView(&texture.view),
                    MaterialKind::Sampler => wgpu::BindingResource::Sampler(&texture.sampler),
                },
            })
            .collect();
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_material_bind_group", self.label)),
            layout,
            entries: &entries,
        }))
    }
}

impl UniformWriter for ShaderProgram {
    fn write_uniform(&mut self, name: &str, bytes: &[u8]) -> bool {
        self.staging.write_uniform(name, bytes)
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}
