use glam::{Mat4, Vec3};
use orrery_input::CameraMovement;
use orrery_kernel::CameraConfig;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;
pub const PITCH_LIMIT: f32 = 89.0;

/// Fly camera driven by held movement keys, mouse look, and scroll zoom.
///
/// Angles are in degrees. `front`, `right`, and `up` are recomputed on every
/// orientation change and always form a right-handed orthonormal basis.
/// Camera motion lives outside the kernel: it never feeds back into the
/// orbital state.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    yaw: f32,
    pitch: f32,
    zoom: f32,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    world_up: Vec3,
    pub speed: f32,
    pub sensitivity: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl FlyCamera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self::default();
        camera.position = position;
        camera.yaw = yaw;
        camera.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        camera.update_basis();
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: config.position,
            yaw: config.yaw,
            pitch: config.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            zoom: config.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            world_up: Vec3::Y,
            speed: config.speed,
            sensitivity: config.sensitivity,
            near: config.near,
            far: config.far,
        };
        camera.update_basis();
        camera
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Move along the camera basis by `speed * dt`.
    pub fn process_keyboard(&mut self, movement: CameraMovement, dt: f32) {
        let velocity = self.speed * dt;
        match movement {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Apply a cursor delta in pixels. Positive `dy` pitches up.
    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_basis();
    }

    pub fn process_scroll(&mut self, amount: f32) {
        self.zoom = (self.zoom - amount).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, self.near, self.far)
    }

    fn update_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_eq(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn default_camera() {
        let cam = FlyCamera::default();
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 20.0));
        assert_eq!(cam.yaw(), -90.0);
        assert_eq!(cam.zoom(), 45.0);
        assert!(cam.front().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn view_matrix_matches_look_at() {
        let cam = FlyCamera::new(Vec3::new(0.0, 0.0, 5.0), -90.0, 0.0);
        let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 4.0), Vec3::Y);
        assert_mat_eq(cam.view_matrix(), expected);
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut cam = FlyCamera::default();
        for _ in 0..100 {
            cam.process_mouse(3.0, 50.0);
        }
        assert_eq!(cam.pitch(), PITCH_LIMIT);
        for _ in 0..200 {
            cam.process_mouse(-7.0, -50.0);
        }
        assert_eq!(cam.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn zoom_stays_clamped() {
        let mut cam = FlyCamera::default();
        cam.process_scroll(-10.0);
        assert_eq!(cam.zoom(), MAX_ZOOM);
        for _ in 0..20 {
            cam.process_scroll(5.0);
        }
        assert_eq!(cam.zoom(), MIN_ZOOM);
        cam.process_scroll(-2.5);
        assert_eq!(cam.zoom(), 3.5);
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut cam = FlyCamera::default();
        for (dx, dy) in [(12.0, 4.0), (-300.0, 80.0), (45.0, -900.0), (1.5, 0.25)] {
            cam.process_mouse(dx, dy);
            let (f, r, u) = (cam.front(), cam.right(), cam.up());
            for v in [f, r, u] {
                assert!((v.length() - 1.0).abs() < 1e-5);
            }
            assert!(f.dot(r).abs() < 1e-5);
            assert!(f.dot(u).abs() < 1e-5);
            assert!(r.dot(u).abs() < 1e-5);
            // Right-handed: right x up = -front.
            assert!(r.cross(u).abs_diff_eq(-f, 1e-4));
        }
    }

    #[test]
    fn keyboard_moves_along_basis() {
        let mut cam = FlyCamera::new(Vec3::ZERO, -90.0, 0.0);
        cam.process_keyboard(CameraMovement::Forward, 2.0);
        assert!(cam.position.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
        cam.process_keyboard(CameraMovement::Right, 1.0);
        assert!(cam.position.abs_diff_eq(Vec3::new(2.5, 0.0, -5.0), 1e-5));
        cam.process_keyboard(CameraMovement::Left, 1.0);
        cam.process_keyboard(CameraMovement::Backward, 2.0);
        assert!(cam.position.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn from_config_clamps_inputs() {
        let config = CameraConfig {
            pitch: 120.0,
            zoom: 80.0,
            ..CameraConfig::default()
        };
        let cam = FlyCamera::from_config(&config);
        assert_eq!(cam.pitch(), PITCH_LIMIT);
        assert_eq!(cam.zoom(), MAX_ZOOM);
    }
}
