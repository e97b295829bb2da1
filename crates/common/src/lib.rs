//! Shared types used by the kinematics kernel, the renderer, and the apps.

pub mod types;

pub use types::{BodyKind, Transform};
