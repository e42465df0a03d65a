//! Host-shell collaborator

/// Device orientation as reported by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Half-page turns only make sense on a tall screen
    pub fn allows_half_page(self) -> bool {
        matches!(self, Self::Portrait)
    }
}

pub trait HostShell {
    /// Ask the platform to keep the screen on (or release that request)
    fn set_screen_awake_hint(&mut self, awake: bool);

    fn current_orientation(&self) -> Orientation;
}

/// Host used when the presentation layer has nothing to plug in
#[derive(Debug, Default)]
pub struct HeadlessHost {
    pub awake: bool,
    pub orientation: Orientation,
}

impl HostShell for HeadlessHost {
    fn set_screen_awake_hint(&mut self, awake: bool) {
        self.awake = awake;
    }

    fn current_orientation(&self) -> Orientation {
        self.orientation
    }
}
