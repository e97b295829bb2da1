//! Camera input decoupled from the windowing layer.
//!
//! The desktop app maps raw key codes and cursor events onto these types;
//! the camera only ever sees directions and deltas.
//!
//! # Invariants
//! - The first cursor sample after construction or [`CursorTracker::reset`]
//!   produces a zero delta.

pub mod cursor;
pub mod movement;

pub use cursor::CursorTracker;
pub use movement::{CameraMovement, HeldMovement};

pub fn crate_info() -> &'static str {
    "orrery-input v0.1.0"
}
