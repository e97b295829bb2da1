//! CPU-side assets: the procedural sphere mesh shared by every body and the
//! RGBA images that texture them.
//!
//! Nothing here touches the GPU; the render backend uploads what this crate
//! produces.

pub mod image_data;
pub mod sphere;

pub use image_data::{ImageLoadError, RgbaImage};
pub use sphere::{SphereError, UvSphere};

pub fn crate_info() -> &'static str {
    "orrery-assets v0.1.0"
}
