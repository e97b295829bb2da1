//! Orrery kernel: scene configuration, frame clock, and orbital kinematics.
//!
//! # Invariants
//! - Body positions are pure functions of elapsed time and configuration.
//!   Nothing is integrated, so there is no drift and any instant can be
//!   evaluated directly.
//! - Sun B is always the exact negation of sun A.

pub mod clock;
pub mod config;
pub mod orbit;

pub use clock::{FrameClock, OrbitalClock};
pub use config::{
    CameraConfig, ConfigError, LightingConfig, OrbitConfig, ProgramPaths, SceneConfig,
    ShaderConfig, SphereConfig, TextureConfig, TextureSource, WindowConfig,
};
pub use orbit::{Body, Orbit, SystemState};

pub fn crate_info() -> &'static str {
    "orrery-kernel v0.1.0"
}
