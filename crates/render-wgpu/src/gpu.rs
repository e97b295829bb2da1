use crate::buffers::{BufferError, MeshBuffers, VertexLayout};
use crate::camera::FlyCamera;
use crate::program::{ProgramDescriptor, ShaderProgram, UniformSlot, UniformWriter};
use crate::shader::ShaderError;
use crate::texture::{Texture, TextureError};
use glam::{Mat4, Vec3};
use orrery_assets::{RgbaImage, SphereError, UvSphere};
use orrery_common::BodyKind;
use orrery_kernel::{LightingConfig, ProgramPaths, SceneConfig, SystemState, TextureSource};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Draws per frame each program must be able to serve.
const DRAWS_PER_FRAME: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error(transparent)]
    Sphere(#[from] SphereError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Per-body inputs for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDraw {
    pub kind: BodyKind,
    pub model: Mat4,
    pub color: Vec3,
}

/// One draw per body, suns first.
pub fn plan_bodies(state: &SystemState, lighting: &LightingConfig) -> [BodyDraw; 4] {
    state.bodies().map(|body| BodyDraw {
        kind: body.kind,
        model: body.transform.model_matrix(),
        color: match body.kind {
            BodyKind::SunA | BodyKind::SunB => lighting.sun_color,
            BodyKind::Planet => lighting.planet_color,
            BodyKind::Moon => lighting.moon_color,
        },
    })
}

/// Frame-wide values shared by every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_pos: Vec3,
    pub light_pos_a: Vec3,
    pub light_pos_b: Vec3,
    pub light_color: Vec3,
}

impl FrameUniforms {
    pub fn new(
        camera: &FlyCamera,
        aspect: f32,
        state: &SystemState,
        lighting: &LightingConfig,
    ) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(aspect),
            view_pos: camera.position,
            light_pos_a: state.sun_a,
            light_pos_b: state.sun_b,
            light_color: lighting.sun_color,
        }
    }
}

/// Write the uniforms of one body draw. Names a program does not declare are
/// skipped by the writer, so both programs take the same calls.
pub fn write_body_uniforms(writer: &mut impl UniformWriter, frame: &FrameUniforms, draw: &BodyDraw) {
    writer.set_mat4("model", draw.model);
    writer.set_mat4("view", frame.view);
    writer.set_mat4("projection", frame.projection);
    if draw.kind.is_sun() {
        writer.set_vec3("light_color", draw.color);
    } else {
        writer.set_vec3("view_pos", frame.view_pos);
        writer.set_vec3("light_pos_a", frame.light_pos_a);
        writer.set_vec3("light_pos_b", frame.light_pos_b);
        writer.set_vec3("light_color_a", frame.light_color);
        writer.set_vec3("light_color_b", frame.light_color);
        writer.set_vec3("object_color", draw.color);
    }
}

struct Material {
    kind: BodyKind,
    bind_group: Option<wgpu::BindGroup>,
    _texture: Texture,
}

/// wgpu renderer for the two suns, the planet, and the moon.
pub struct OrreryRenderer {
    sphere: MeshBuffers,
    sun_program: ShaderProgram,
    planet_program: ShaderProgram,
    materials: Vec<Material>,
    depth_texture: wgpu::TextureView,
    clear_color: wgpu::Color,
    lighting: LightingConfig,
    surface_format: wgpu::TextureFormat,
}

impl OrreryRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: &SceneConfig,
    ) -> Result<Self, RenderError> {
        let sphere = UvSphere::generate(
            config.sphere.longitude_segments,
            config.sphere.latitude_segments,
        )?;
        let sphere = MeshBuffers::upload(
            device,
            "sphere",
            &sphere.interleaved(),
            VertexLayout::PositionTexCoord,
            Some(&sphere.indices),
        )?;

        let program = |label: &str, paths: &ProgramPaths| {
            ShaderProgram::load(
                device,
                &ProgramDescriptor {
                    label,
                    paths,
                    vertex_layout: VertexLayout::PositionTexCoord,
                    color_format: surface_format,
                    depth_format: Some(DEPTH_FORMAT),
                    max_draws_per_frame: DRAWS_PER_FRAME,
                },
            )
        };
        let sun_program = program("sun", &config.shaders.sun)?;
        let planet_program = program("planet", &config.shaders.planet)?;

        let mut materials = Vec::with_capacity(BodyKind::ALL.len());
        for kind in BodyKind::ALL {
            let (source, program) = match kind {
                BodyKind::SunA | BodyKind::SunB => (&config.textures.sun, &sun_program),
                BodyKind::Planet => (&config.textures.planet, &planet_program),
                BodyKind::Moon => (&config.textures.moon, &planet_program),
            };
            let texture = load_texture(device, queue, kind, source)?;
            materials.push(Material {
                kind,
                bind_group: program.material_bind_group(device, &texture),
                _texture: texture,
            });
        }

        let [r, g, b] = config.window.clear_color;
        tracing::info!(
            longitude = config.sphere.longitude_segments,
            latitude = config.sphere.latitude_segments,
            "orrery renderer ready"
        );

        Ok(Self {
            sphere,
            sun_program,
            planet_program,
            materials,
            depth_texture: Self::create_depth_texture(device, width, height),
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            lighting: config.lighting,
            surface_format,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Render one frame: each body is one indexed draw of the shared sphere.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        camera: &FlyCamera,
        aspect: f32,
        state: &SystemState,
    ) -> Result<(), RenderError> {
        let frame = FrameUniforms::new(camera, aspect, state, &self.lighting);
        self.sun_program.begin_frame();
        self.planet_program.begin_frame();

        let mut draws: Vec<(BodyKind, UniformSlot)> = Vec::with_capacity(4);
        for draw in plan_bodies(state, &self.lighting) {
            let program = if draw.kind.is_sun() {
                &mut self.sun_program
            } else {
                &mut self.planet_program
            };
            write_body_uniforms(program, &frame, &draw);
            draws.push((draw.kind, program.commit(queue)?));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (kind, slot) in &draws {
                let program = if kind.is_sun() {
                    &self.sun_program
                } else {
                    &self.planet_program
                };
                program.bind(&mut pass, slot);
                if let Some(bind_group) = self
                    .materials
                    .iter()
                    .find(|m| m.kind == *kind)
                    .and_then(|m| m.bind_group.as_ref())
                {
                    pass.set_bind_group(crate::program::MATERIAL_GROUP, bind_group, &[]);
                }
                self.sphere.draw(&mut pass);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

fn load_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    kind: BodyKind,
    source: &TextureSource,
) -> Result<Texture, TextureError> {
    let image = RgbaImage::load_or_solid(&source.path, source.fallback_color);
    Texture::from_image(device, queue, &format!("{kind}_texture"), &image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::LinkedProgram;
    use orrery_kernel::{OrbitConfig, ShaderConfig};
    use std::path::Path;

    fn shipped(paths: &ProgramPaths, label: &str) -> LinkedProgram {
        let root = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../"));
        let paths = ProgramPaths::new(root.join(&paths.vertex), root.join(&paths.fragment));
        LinkedProgram::from_files(label, &paths).unwrap()
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(bytes)
    }

    fn frame(state: &SystemState) -> FrameUniforms {
        let camera = FlyCamera::default();
        FrameUniforms::new(&camera, 1.5, state, &LightingConfig::default())
    }

    #[test]
    fn plans_one_draw_per_body() {
        let state = SystemState::at(&OrbitConfig::default(), 0.0);
        let draws = plan_bodies(&state, &LightingConfig::default());
        let kinds: Vec<_> = draws.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, BodyKind::ALL);

        let moon = draws[3];
        assert_eq!(moon.color, Vec3::splat(0.9));
        assert_eq!(
            moon.model,
            Mat4::from_translation(state.moon) * Mat4::from_scale(Vec3::splat(0.4))
        );
        assert_eq!(draws[0].model.w_axis.truncate(), Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn planet_uniforms_carry_both_lights() {
        let state = SystemState::at(&OrbitConfig::default(), 2.0);
        let frame = frame(&state);
        let mut staging = shipped(&ShaderConfig::default().planet, "planet").staging();
        let draw = plan_bodies(&state, &LightingConfig::default())[2];
        write_body_uniforms(&mut staging, &frame, &draw);

        let field = |name| floats(staging.field_bytes(name).unwrap());
        assert_eq!(field("model"), draw.model.to_cols_array());
        assert_eq!(field("light_pos_a"), state.sun_a.to_array());
        assert_eq!(field("light_pos_b"), state.sun_b.to_array());
        assert_eq!(field("light_color_b"), [1.0, 1.0, 1.0]);
        assert_eq!(field("object_color"), [1.0, 1.0, 1.0]);
        assert_eq!(field("view_pos"), [0.0, 0.0, 20.0]);
    }

    #[test]
    fn sun_uniforms_set_light_color() {
        let state = SystemState::at(&OrbitConfig::default(), 0.5);
        let frame = frame(&state);
        let mut staging = shipped(&ShaderConfig::default().sun, "sun").staging();
        let draw = plan_bodies(&state, &LightingConfig::default())[1];
        write_body_uniforms(&mut staging, &frame, &draw);

        assert_eq!(
            floats(staging.field_bytes("projection").unwrap()),
            frame.projection.to_cols_array()
        );
        assert_eq!(
            floats(staging.field_bytes("light_color").unwrap()),
            [1.0, 1.0, 1.0]
        );
    }
}
