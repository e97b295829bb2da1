use crate::config::OrbitConfig;
use glam::Vec3;
use orrery_common::{BodyKind, Transform};
use serde::{Deserialize, Serialize};

/// A circular orbit in the XZ plane: radius in world units, angular speed in
/// radians per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub radius: f32,
    pub speed: f32,
}

impl Orbit {
    pub const fn new(radius: f32, speed: f32) -> Self {
        Self { radius, speed }
    }

    /// Offset from the orbit centre at time `t` seconds.
    pub fn offset_at(&self, t: f32) -> Vec3 {
        let angle = t * self.speed;
        Vec3::new(angle.cos() * self.radius, 0.0, angle.sin() * self.radius)
    }

    /// Seconds for one full revolution, or `None` for a stationary orbit.
    pub fn period(&self) -> Option<f32> {
        (self.speed != 0.0).then(|| std::f32::consts::TAU / self.speed.abs())
    }
}

/// One body placed in the world at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub kind: BodyKind,
    pub transform: Transform,
}

/// Positions of every body at a single instant.
///
/// The planet orbits the moving sun A and the moon orbits the moving planet,
/// so offsets compound. This is intentional for the toy scene and not
/// orbital mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub time: f32,
    pub sun_a: Vec3,
    pub sun_b: Vec3,
    pub planet: Vec3,
    pub moon: Vec3,
    sun_scale: f32,
    planet_scale: f32,
    moon_scale: f32,
}

impl SystemState {
    /// Evaluate the system at `t` seconds of global elapsed time.
    pub fn at(config: &OrbitConfig, t: f32) -> Self {
        let sun_a = config.binary.offset_at(t);
        let sun_b = -sun_a;
        let planet = sun_a + config.planet.offset_at(t);
        let moon = planet + config.moon.offset_at(t);
        Self {
            time: t,
            sun_a,
            sun_b,
            planet,
            moon,
            sun_scale: config.sun_scale,
            planet_scale: config.planet_scale,
            moon_scale: config.moon_scale,
        }
    }

    pub fn position(&self, kind: BodyKind) -> Vec3 {
        match kind {
            BodyKind::SunA => self.sun_a,
            BodyKind::SunB => self.sun_b,
            BodyKind::Planet => self.planet,
            BodyKind::Moon => self.moon,
        }
    }

    pub fn scale(&self, kind: BodyKind) -> f32 {
        match kind {
            BodyKind::SunA | BodyKind::SunB => self.sun_scale,
            BodyKind::Planet => self.planet_scale,
            BodyKind::Moon => self.moon_scale,
        }
    }

    pub fn body(&self, kind: BodyKind) -> Body {
        Body {
            kind,
            transform: Transform::new(self.position(kind), self.scale(kind)),
        }
    }

    /// All bodies in draw order: both suns first, then planet and moon.
    pub fn bodies(&self) -> [Body; 4] {
        BodyKind::ALL.map(|kind| self.body(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPS: f32 = 1e-4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    #[test]
    fn sun_a_starts_on_positive_x() {
        let config = OrbitConfig::default();
        let state = SystemState::at(&config, 0.0);
        assert_eq!(state.sun_a, Vec3::new(config.binary.radius, 0.0, 0.0));
    }

    #[test]
    fn half_binary_orbit_flips_sun_a() {
        let config = OrbitConfig::default();
        let t = PI / config.binary.speed;
        let state = SystemState::at(&config, t);
        assert!(approx(
            state.sun_a,
            Vec3::new(-config.binary.radius, 0.0, 0.0)
        ));
    }

    #[test]
    fn sun_b_is_exact_negation() {
        let config = OrbitConfig::default();
        for i in 0..500 {
            let t = i as f32 * 0.173 - 20.0;
            let state = SystemState::at(&config, t);
            assert_eq!(state.sun_b, -state.sun_a, "t = {t}");
        }
    }

    #[test]
    fn offsets_compound() {
        let config = OrbitConfig::default();
        let t = 3.7;
        let state = SystemState::at(&config, t);
        assert!(approx(state.planet - state.sun_a, config.planet.offset_at(t)));
        assert!(approx(state.moon - state.planet, config.moon.offset_at(t)));
        assert!(((state.planet - state.sun_a).length() - config.planet.radius).abs() < EPS);
        assert!(((state.moon - state.planet).length() - config.moon.radius).abs() < EPS);
    }

    #[test]
    fn motion_stays_in_orbital_plane() {
        let config = OrbitConfig::default();
        for i in 0..100 {
            let state = SystemState::at(&config, i as f32 * 0.5);
            for body in state.bodies() {
                assert_eq!(body.transform.position.y, 0.0);
            }
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let config = OrbitConfig::default();
        assert_eq!(SystemState::at(&config, 12.5), SystemState::at(&config, 12.5));
    }

    #[test]
    fn bodies_carry_configured_scales() {
        let config = OrbitConfig::default();
        let state = SystemState::at(&config, 1.0);
        let bodies = state.bodies();
        assert_eq!(bodies[0].kind, BodyKind::SunA);
        assert_eq!(bodies[0].transform.scale, config.sun_scale);
        assert_eq!(bodies[1].transform.scale, config.sun_scale);
        assert_eq!(bodies[2].transform.scale, config.planet_scale);
        assert_eq!(bodies[3].transform.scale, config.moon_scale);
    }

    #[test]
    fn period_of_default_binary_orbit() {
        let orbit = Orbit::new(6.0, 0.5);
        let period = orbit.period().unwrap();
        assert!((period - 4.0 * PI).abs() < EPS);
        assert!(approx(orbit.offset_at(period), orbit.offset_at(0.0)));
        assert_eq!(Orbit::new(1.0, 0.0).period(), None);
    }
}
