//! wgpu render backend for the orrery.
//!
//! Buffer binding, shader programs with name-resolved uniforms, the fly
//! camera, and the renderer that draws every body as one shared UV sphere.
//!
//! # Invariants
//! - The renderer never mutates orbital state.
//! - Camera motion is NOT part of the kernel; it uses unscaled frame time.
//! - A program only exists once every stage compiled and the stages linked.

pub mod buffers;
mod camera;
mod gpu;
pub mod program;
pub mod shader;
mod texture;

pub use buffers::{BufferError, MeshBuffers, VertexLayout};
pub use camera::{FlyCamera, MAX_ZOOM, MIN_ZOOM, PITCH_LIMIT};
pub use gpu::{
    BodyDraw, DEPTH_FORMAT, FrameUniforms, OrreryRenderer, RenderError, plan_bodies,
    write_body_uniforms,
};
pub use program::{LinkedProgram, ProgramDescriptor, ShaderProgram, UniformStaging, UniformWriter};
pub use shader::{CompiledStage, ShaderError, ShaderStage};
pub use texture::{Texture, TextureError};

pub fn crate_info() -> &'static str {
    "orrery-render-wgpu v0.1.0"
}
