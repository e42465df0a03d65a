//! Tap-burst detection for leaving performance mode

use std::time::{Duration, Instant};

/// Taps needed to leave performance mode
pub const EXIT_TAP_COUNT: usize = 3;

/// Default window in which all exit taps must land
pub const DEFAULT_EXIT_WINDOW: Duration = Duration::from_millis(600);

/// Gestures the presentation layer forwards to the engine
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    /// Relative pinch scale since the previous event
    Pinch { scale: f32 },
    /// Pan delta in unit space of the view
    Pan { dx: f32, dy: f32 },
}

/// Counts taps that land within a sliding window.
///
/// The first tap of each burst records an opaque snapshot so the caller can
/// undo whatever the earlier taps of a completed burst did.
#[derive(Clone, Debug)]
pub struct TapBurst<S> {
    window: Duration,
    started: Option<Instant>,
    count: usize,
    snapshot: Option<S>,
}

impl<S: Clone> TapBurst<S> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            started: None,
            count: 0,
            snapshot: None,
        }
    }

    /// Register a tap. Returns the snapshot taken at the burst's first tap
    /// once `EXIT_TAP_COUNT` taps have landed inside the window.
    pub fn register(&mut self, at: Instant, snapshot: impl FnOnce() -> S) -> Option<S> {
        let in_window = self
            .started
            .is_some_and(|start| at.saturating_duration_since(start) <= self.window);

        if !in_window {
            self.started = Some(at);
            self.count = 0;
            self.snapshot = Some(snapshot());
        }

        self.count += 1;
        if self.count >= EXIT_TAP_COUNT {
            let taken = self.snapshot.take();
            self.clear();
            return taken;
        }
        None
    }

    pub fn clear(&mut self) {
        self.started = None;
        self.count = 0;
        self.snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_quick_taps_complete() {
        let mut burst = TapBurst::new(DEFAULT_EXIT_WINDOW);
        let t0 = Instant::now();
        assert_eq!(burst.register(t0, || 1), None);
        assert_eq!(burst.register(t0 + Duration::from_millis(150), || 2), None);
        assert_eq!(burst.register(t0 + Duration::from_millis(300), || 3), Some(1));
    }

    #[test]
    fn slow_taps_restart_the_burst() {
        let mut burst = TapBurst::new(DEFAULT_EXIT_WINDOW);
        let t0 = Instant::now();
        burst.register(t0, || 1);
        burst.register(t0 + Duration::from_millis(200), || 2);
        assert_eq!(burst.register(t0 + Duration::from_millis(900), || 3), None);
        assert_eq!(burst.register(t0 + Duration::from_millis(1000), || 4), None);
        assert_eq!(burst.register(t0 + Duration::from_millis(1100), || 5), Some(3));
    }

    #[test]
    fn single_tap_never_completes() {
        let mut burst: TapBurst<()> = TapBurst::new(DEFAULT_EXIT_WINDOW);
        let t0 = Instant::now();
        for i in 0..5 {
            assert!(burst.register(t0 + Duration::from_secs(i), || ()).is_none());
        }
    }
}
