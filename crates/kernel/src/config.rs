//! Scene configuration.
//!
//! Every field has a default matching the stock scene, and the YAML loader
//! accepts partial files: anything omitted keeps its default.

use crate::orbit::Orbit;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from loading or validating a scene configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub sphere: SphereConfig,
    pub orbits: OrbitConfig,
    pub lighting: LightingConfig,
    pub shaders: ShaderConfig,
    pub textures: TextureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 3],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "SolarSys".into(),
            width: 1200,
            height: 800,
            clear_color: [0.01, 0.01, 0.1],
        }
    }
}

/// Starting pose and tuning of the fly camera. Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 20.0),
            yaw: -90.0,
            pitch: 0.0,
            zoom: 45.0,
            speed: 2.5,
            sensitivity: 0.1,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    pub longitude_segments: u32,
    pub latitude_segments: u32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            longitude_segments: 64,
            latitude_segments: 64,
        }
    }
}

/// Orbits and body scales of the binary system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Shared orbit of the two suns around the origin.
    pub binary: Orbit,
    /// Planet around sun A.
    pub planet: Orbit,
    /// Moon around the planet.
    pub moon: Orbit,
    pub sun_scale: f32,
    pub planet_scale: f32,
    pub moon_scale: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            binary: Orbit::new(6.0, 0.5),
            planet: Orbit::new(6.0, 1.0),
            moon: Orbit::new(2.0, 1.0),
            sun_scale: 2.0,
            planet_scale: 0.7,
            moon_scale: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub sun_color: Vec3,
    pub planet_color: Vec3,
    pub moon_color: Vec3,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sun_color: Vec3::ONE,
            planet_color: Vec3::ONE,
            moon_color: Vec3::splat(0.9),
        }
    }
}

/// Source files of one shader program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<PathBuf>,
}

impl ProgramPaths {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Unlit, textured program for the suns.
    pub sun: ProgramPaths,
    /// Two-light program for the planet and moon.
    pub planet: ProgramPaths,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            sun: ProgramPaths::new("assets/shaders/sun.vert.wgsl", "assets/shaders/sun.frag.wgsl"),
            planet: ProgramPaths::new(
                "assets/shaders/planet.vert.wgsl",
                "assets/shaders/planet.frag.wgsl",
            ),
        }
    }
}

/// An image file plus the RGBA color used when it cannot be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSource {
    pub path: PathBuf,
    #[serde(default = "TextureSource::default_fallback")]
    pub fallback_color: [u8; 4],
}

impl TextureSource {
    pub fn new(path: impl Into<PathBuf>, fallback_color: [u8; 4]) -> Self {
        Self {
            path: path.into(),
            fallback_color,
        }
    }

    fn default_fallback() -> [u8; 4] {
        [255, 255, 255, 255]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub sun: TextureSource,
    pub planet: TextureSource,
    pub moon: TextureSource,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            sun: TextureSource::new("assets/textures/sun.jpg", [255, 196, 64, 255]),
            planet: TextureSource::new("assets/textures/earth.jpg", [64, 110, 200, 255]),
            moon: TextureSource::new("assets/textures/moon.jpg", [170, 170, 170, 255]),
        }
    }
}

impl SceneConfig {
    /// Read, parse, and validate a YAML scene file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SceneConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, otherwise use the validated defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }
        if self.sphere.longitude_segments == 0 || self.sphere.latitude_segments == 0 {
            return invalid("sphere segment counts must be at least 1".into());
        }
        let (lon, lat) = (self.sphere.longitude_segments, self.sphere.latitude_segments);
        let vertices = (lon as u64 + 1) * (lat as u64 + 1);
        if vertices > u32::MAX as u64 {
            return invalid(format!(
                "a {lon}x{lat} sphere has {vertices} vertices, more than 32-bit indices can address"
            ));
        }

        let cam = &self.camera;
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return invalid(format!(
                "camera clip planes must satisfy 0 < near < far, got near={} far={}",
                cam.near, cam.far
            ));
        }
        if !(1.0..=45.0).contains(&cam.zoom) {
            return invalid(format!("camera zoom must be within [1, 45], got {}", cam.zoom));
        }
        if !(-89.0..=89.0).contains(&cam.pitch) {
            return invalid(format!("camera pitch must be within [-89, 89], got {}", cam.pitch));
        }
        if !cam.position.is_finite() || !cam.speed.is_finite() || !cam.sensitivity.is_finite() {
            return invalid("camera values must be finite".into());
        }

        let orbits = &self.orbits;
        for (name, orbit) in [
            ("binary", orbits.binary),
            ("planet", orbits.planet),
            ("moon", orbits.moon),
        ] {
            if !orbit.radius.is_finite() || orbit.radius < 0.0 || !orbit.speed.is_finite() {
                return invalid(format!(
                    "{name} orbit needs a finite, non-negative radius and finite speed"
                ));
            }
        }
        for (name, scale) in [
            ("sun", orbits.sun_scale),
            ("planet", orbits.planet_scale),
            ("moon", orbits.moon_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return invalid(format!("{name} scale must be positive, got {scale}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        SceneConfig::default().validate().unwrap();
        assert!(SceneConfig::load_or_default(None).is_ok());
    }

    #[test]
    fn yaml_round_trip() {
        let config = SceneConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed: SceneConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "orbits:\n  binary:\n    radius: 9.0\n    speed: 0.25").unwrap();

        let config = SceneConfig::load(tmp.path()).unwrap();
        assert_eq!(config.orbits.binary, Orbit::new(9.0, 0.25));
        assert_eq!(config.orbits.planet, OrbitConfig::default().planet);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SceneConfig::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "window: [this is not a window").unwrap();
        let err = SceneConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_segments_rejected() {
        let mut config = SceneConfig::default();
        config.sphere.latitude_segments = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_sphere_rejected() {
        let mut config = SceneConfig::default();
        config.sphere.longitude_segments = 70_000;
        config.sphere.latitude_segments = 70_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.sphere.longitude_segments = 65_534;
        config.sphere.latitude_segments = 65_534;
        config.validate().unwrap();
    }

    #[test]
    fn bad_clip_planes_rejected() {
        let mut config = SceneConfig::default();
        config.camera.far = config.camera.near;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_scale_rejected() {
        let mut config = SceneConfig::default();
        config.orbits.moon_scale = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn geometry_path_is_optional() {
        let yaml = "vertex: a.wgsl\nfragment: b.wgsl\ngeometry: c.wgsl\n";
        let paths: ProgramPaths = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(paths.geometry, Some(PathBuf::from("c.wgsl")));

        let yaml = "vertex: a.wgsl\nfragment: b.wgsl\n";
        let paths: ProgramPaths = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(paths.geometry, None);
    }
}
