use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four bodies of the toy system, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    SunA,
    SunB,
    Planet,
    Moon,
}

impl BodyKind {
    pub const ALL: [BodyKind; 4] = [
        BodyKind::SunA,
        BodyKind::SunB,
        BodyKind::Planet,
        BodyKind::Moon,
    ];

    /// Suns are emissive and drawn with the unlit program.
    pub fn is_sun(self) -> bool {
        matches!(self, BodyKind::SunA | BodyKind::SunB)
    }

    pub fn name(self) -> &'static str {
        match self {
            BodyKind::SunA => "sun A",
            BodyKind::SunB => "sun B",
            BodyKind::Planet => "planet",
            BodyKind::Moon => "moon",
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Placement of a body: world position plus uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self { position, scale }
    }

    /// Translate then scale, so the scale is applied in local space.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn model_matrix_scales_in_local_space() {
        let t = Transform::new(Vec3::new(4.0, 0.0, 0.0), 2.0);
        let m = t.model_matrix();
        // The body centre lands on the translation, not on a scaled translation.
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(m.transform_point3(Vec3::X), Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn only_suns_are_suns() {
        let suns: Vec<_> = BodyKind::ALL.iter().filter(|b| b.is_sun()).collect();
        assert_eq!(suns, vec![&BodyKind::SunA, &BodyKind::SunB]);
    }
}
