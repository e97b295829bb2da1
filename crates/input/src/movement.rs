/// Discrete camera movement directions, relative to the camera basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

impl CameraMovement {
    pub const ALL: [CameraMovement; 4] = [
        CameraMovement::Forward,
        CameraMovement::Backward,
        CameraMovement::Left,
        CameraMovement::Right,
    ];

    fn bit(self) -> u8 {
        match self {
            CameraMovement::Forward => 1,
            CameraMovement::Backward => 1 << 1,
            CameraMovement::Left => 1 << 2,
            CameraMovement::Right => 1 << 3,
        }
    }
}

/// Set of movement directions whose keys are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldMovement(u8);

impl HeldMovement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, movement: CameraMovement, held: bool) {
        if held {
            self.0 |= movement.bit();
        } else {
            self.0 &= !movement.bit();
        }
    }

    pub fn is_held(&self, movement: CameraMovement) -> bool {
        self.0 & movement.bit() != 0
    }

    /// Held directions in a fixed order, so per-frame application is stable.
    pub fn iter(&self) -> impl Iterator<Item = CameraMovement> + '_ {
        CameraMovement::ALL.into_iter().filter(|m| self.is_held(*m))
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}
