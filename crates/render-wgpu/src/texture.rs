//! 2D textures for body materials.

use orrery_assets::RgbaImage;
use wgpu::util::DeviceExt;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("texture data size ({actual}) does not match expected ({expected}) for {width}x{height}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}

/// Check that `image` holds exactly `width * height` RGBA8 texels.
pub fn validate_image(image: &RgbaImage) -> Result<(), TextureError> {
    let (width, height) = (image.width, image.height);
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if image.pixels.len() != expected {
        return Err(TextureError::DataSizeMismatch {
            actual: image.pixels.len(),
            expected,
            width,
            height,
        });
    }
    Ok(())
}

/// A sampled sRGB texture with its view and a linear repeating sampler.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub dimensions: (u32, u32),
}

impl Texture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &RgbaImage,
    ) -> Result<Self, TextureError> {
        validate_image(image)?;
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.pixels,
        );
        let view = texture.create_view(&Default::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label}_sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        tracing::debug!(label, width = image.width, height = image.height, "uploaded texture");
        Ok(Self {
            texture,
            view,
            sampler,
            dimensions: (image.width, image.height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_texel_is_valid() {
        validate_image(&RgbaImage::solid([255, 0, 0, 255])).unwrap();
    }

    #[test]
    fn rejects_bad_images() {
        let empty = RgbaImage {
            width: 0,
            height: 4,
            pixels: vec![],
        };
        assert_eq!(
            validate_image(&empty),
            Err(TextureError::ZeroDimensions { width: 0, height: 4 })
        );

        let short = RgbaImage {
            width: 2,
            height: 2,
            pixels: vec![0; 12],
        };
        assert!(matches!(
            validate_image(&short),
            Err(TextureError::DataSizeMismatch {
                actual: 12,
                expected: 16,
                ..
            })
        ));
    }
}
