use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded 8-bit RGBA pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// Decode a PNG or JPEG file into RGBA8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImageLoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ImageLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| ImageLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!("decoded {} ({width}x{height})", path.display());
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// A single texel of `color`.
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: color.to_vec(),
        }
    }

    /// Load `path`, or fall back to a solid `color` texel when it is missing
    /// or undecodable.
    pub fn load_or_solid(path: impl AsRef<Path>, color: [u8; 4]) -> Self {
        match Self::load(path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("{e}; using solid fallback color {color:?}");
                Self::solid(color)
            }
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_png_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        let pixels = vec![255, 0, 0, 255, 0, 0, 255, 128];
        image::RgbaImage::from_raw(2, 1, pixels.clone())
            .unwrap()
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let loaded = RgbaImage::load(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (2, 1));
        assert_eq!(loaded.pixels, pixels);
        assert_eq!(loaded.bytes_per_row(), 8);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RgbaImage::load(dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, ImageLoadError::Read { .. }));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"definitely not an image").unwrap();
        let err = RgbaImage::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode { .. }));
    }

    #[test]
    fn fallback_is_single_texel() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbaImage::load_or_solid(dir.path().join("missing.png"), [1, 2, 3, 4]);
        assert_eq!(image, RgbaImage::solid([1, 2, 3, 4]));
    }
}
