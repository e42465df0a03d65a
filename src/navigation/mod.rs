//! Page navigation: positions, tap zones, modes and zoom

pub mod address;
pub mod gesture;
pub mod mode;
pub mod tap_zone;
pub mod zoom;

pub use address::PageAddress;
pub use gesture::{Gesture, TapBurst};
pub use mode::{Command, Effect, Interaction, InteractionSet, ModeConfig, ModeController, ViewMode};
pub use tap_zone::{resolve_tap, TapResult, TapZoneConfig};
pub use zoom::Zoom;

/// Direction of a page turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavigationIntent {
    Backward,
    Forward,
}
