use egui::Context as EguiContext;
use orrery_common::BodyKind;
use orrery_input::{CameraMovement, CursorTracker, HeldMovement};
use orrery_kernel::{FrameClock, OrbitalClock, SceneConfig, SystemState};
use orrery_render_wgpu::FlyCamera;
use winit::keyboard::KeyCode;

/// Where mouse-look deltas come from while the cursor is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookInput {
    /// Raw device motion; unbounded, unaffected by the window border.
    RawMotion,
    /// Absolute cursor positions, used when the cursor could not be grabbed.
    Cursor,
}

/// Application state: everything the event callbacks read and mutate.
pub struct AppState {
    pub config: SceneConfig,
    pub camera: FlyCamera,
    pub clock: FrameClock,
    pub orbital: OrbitalClock,
    pub system: SystemState,
    pub held: HeldMovement,
    pub cursor: CursorTracker,
    pub look: LookInput,
    pub mouse_captured: bool,
    pub show_overlay: bool,
}

impl AppState {
    pub fn new(config: SceneConfig, time_scale: f32) -> Self {
        let system = SystemState::at(&config.orbits, 0.0);
        Self {
            camera: FlyCamera::from_config(&config.camera),
            clock: FrameClock::new(),
            orbital: OrbitalClock::new(time_scale),
            system,
            held: HeldMovement::new(),
            cursor: CursorTracker::new(),
            look: LookInput::RawMotion,
            mouse_captured: false,
            show_overlay: false,
            config,
        }
    }

    /// Step to timestamp `now` (seconds since start). Camera movement uses the
    /// raw frame delta; the orbits use the scaled one.
    pub fn update(&mut self, now: f32) {
        let dt = self.clock.tick(now);
        for movement in self.held.iter() {
            self.camera.process_keyboard(movement, dt);
        }
        let t = self.orbital.advance(dt);
        self.system = SystemState::at(&self.config.orbits, t);
    }

    /// Returns `false` when the key asks to quit.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let movement = match key {
            KeyCode::KeyW => Some(CameraMovement::Forward),
            KeyCode::KeyS => Some(CameraMovement::Backward),
            KeyCode::KeyA => Some(CameraMovement::Left),
            KeyCode::KeyD => Some(CameraMovement::Right),
            _ => None,
        };
        if let Some(movement) = movement {
            self.held.set(movement, pressed);
            return true;
        }
        if !pressed {
            return true;
        }
        match key {
            KeyCode::Escape => return false,
            KeyCode::F1 => self.show_overlay = !self.show_overlay,
            _ => {}
        }
        true
    }

    /// Enter or leave captured mode. `look` says where deltas will come from.
    pub fn set_captured(&mut self, captured: bool, look: LookInput) {
        self.mouse_captured = captured;
        self.look = look;
        // Re-anchor so the jump between release and capture is not a look.
        self.cursor.reset();
    }

    /// Raw device motion in pixels, y down.
    pub fn handle_motion(&mut self, dx: f32, dy: f32) {
        if self.mouse_captured && self.look == LookInput::RawMotion {
            self.camera.process_mouse(dx, -dy);
        }
    }

    /// Absolute cursor position in window pixels.
    pub fn handle_cursor(&mut self, x: f32, y: f32) {
        if !self.mouse_captured || self.look != LookInput::Cursor {
            return;
        }
        let delta = self.cursor.delta(x, y);
        self.camera.process_mouse(delta.x, delta.y);
    }

    pub fn draw_ui(&self, ctx: &EguiContext) {
        if !self.show_overlay {
            return;
        }
        egui::Window::new("Orrery")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Time: {:.2} s (x{})",
                    self.orbital.time(),
                    self.orbital.scale()
                ));
                ui.label(format!("FPS: {:.0}", self.clock.fps()));
                ui.separator();
                let pos = self.camera.position;
                ui.label(format!("Camera: ({:.2}, {:.2}, {:.2})", pos.x, pos.y, pos.z));
                ui.label(format!(
                    "Yaw {:.1}°  Pitch {:.1}°  Zoom {:.1}°",
                    self.camera.yaw(),
                    self.camera.pitch(),
                    self.camera.zoom()
                ));
                ui.separator();
                egui::Grid::new("bodies").striped(true).show(ui, |ui| {
                    for kind in BodyKind::ALL {
                        let p = self.system.position(kind);
                        ui.label(kind.name());
                        ui.label(format!("({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
                        ui.end_row();
                    }
                });
                ui.separator();
                ui.label("WASD move · Tab capture mouse · wheel zoom · Esc quit");
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn state(time_scale: f32) -> AppState {
        AppState::new(SceneConfig::default(), time_scale)
    }

    #[test]
    fn time_scale_applies_to_orbits_only() {
        let mut app = state(2.0);
        app.handle_key(KeyCode::KeyW, true);
        app.update(0.5);
        app.update(1.0);

        assert_eq!(app.orbital.time(), 2.0);
        assert_eq!(app.system, SystemState::at(&app.config.orbits, 2.0));
        // One real second at 2.5 units/s along -Z from (0, 0, 20).
        assert!(app.camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, 17.5), 1e-4));
    }

    #[test]
    fn raw_motion_yaw_is_unbounded() {
        let mut app = state(1.0);
        app.set_captured(true, LookInput::RawMotion);
        for _ in 0..1000 {
            app.handle_motion(50.0, 0.0);
        }
        assert!((app.camera.yaw() - (-90.0 + 5000.0)).abs() < 1e-2);

        // Device y grows downward; moving up pitches up.
        app.handle_motion(0.0, -10.0);
        assert!(app.camera.pitch() > 0.0);
    }

    #[test]
    fn look_source_is_exclusive() {
        let mut app = state(1.0);
        app.set_captured(true, LookInput::RawMotion);
        app.handle_cursor(10.0, 10.0);
        app.handle_cursor(500.0, 10.0);
        assert_eq!(app.camera.yaw(), -90.0);

        app.set_captured(true, LookInput::Cursor);
        app.handle_motion(100.0, 0.0);
        assert_eq!(app.camera.yaw(), -90.0);
        app.handle_cursor(10.0, 10.0);
        app.handle_cursor(20.0, 10.0);
        assert_eq!(app.camera.yaw(), -89.0);
    }

    #[test]
    fn uncaptured_mouse_does_not_look() {
        let mut app = state(1.0);
        app.handle_motion(100.0, 100.0);
        app.handle_cursor(0.0, 0.0);
        app.handle_cursor(100.0, 100.0);
        assert_eq!(app.camera.yaw(), -90.0);
        assert_eq!(app.camera.pitch(), 0.0);
    }

    #[test]
    fn escape_quits_and_f1_toggles_overlay() {
        let mut app = state(1.0);
        assert!(app.handle_key(KeyCode::F1, true));
        assert!(app.show_overlay);
        assert!(!app.handle_key(KeyCode::Escape, true));
    }
}
