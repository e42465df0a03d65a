//! Crop rectangle editing
//!
//! Drags are recomputed from the snapshot taken when the drag began plus the
//! total pointer translation, so rounding never accumulates across frames.

use crate::region::{NormalizedRegion, MIN_REGION_SIZE};

/// Drag handles of the crop rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub fn all() -> [Handle; 8] {
        [
            Handle::TopLeft,
            Handle::Top,
            Handle::TopRight,
            Handle::Right,
            Handle::BottomRight,
            Handle::Bottom,
            Handle::BottomLeft,
            Handle::Left,
        ]
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Handle::TopLeft | Handle::TopRight | Handle::BottomRight | Handle::BottomLeft
        )
    }

    fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Left | Handle::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::Right | Handle::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Top | Handle::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::Bottom | Handle::BottomRight)
    }
}

/// Edges of a rectangle in unit space, possibly invalid mid-computation
#[derive(Clone, Copy, Debug)]
struct Edges {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

/// One edge pair along an axis, with the side the handle moves
struct Span<'a> {
    low: &'a mut f32,
    high: &'a mut f32,
    moves_low: bool,
}

impl Span<'_> {
    /// Restore the minimum size by moving whichever edge the handle drives
    fn enforce_min(&mut self) {
        if *self.high - *self.low < MIN_REGION_SIZE {
            if self.moves_low {
                *self.low = *self.high - MIN_REGION_SIZE;
            } else {
                *self.high = *self.low + MIN_REGION_SIZE;
            }
        }
    }

    fn clamp_to_unit(&mut self) {
        if *self.low < 0.0 {
            *self.low = 0.0;
        }
        if *self.high > 1.0 {
            *self.high = 1.0;
        }
    }
}

/// Interactive editor for one page's crop region
#[derive(Clone, Debug)]
pub struct CropEditor {
    snapshot: NormalizedRegion,
    live: NormalizedRegion,
}

impl CropEditor {
    /// Start editing from `region`
    pub fn begin(region: NormalizedRegion) -> Self {
        let region = region.sanitized();
        Self {
            snapshot: region,
            live: region,
        }
    }

    /// The region as currently shown
    pub fn region(&self) -> NormalizedRegion {
        self.live
    }

    /// Recompute the region for a drag of `handle` by `total_delta`, the
    /// pointer translation in unit space since the drag started.
    pub fn drag(&mut self, handle: Handle, total_delta: (f32, f32)) -> NormalizedRegion {
        let dx = if total_delta.0.is_finite() { total_delta.0 } else { 0.0 };
        let dy = if total_delta.1.is_finite() { total_delta.1 } else { 0.0 };

        let s = self.snapshot;
        let mut e = Edges {
            left: s.x,
            top: s.y,
            right: s.right(),
            bottom: s.bottom(),
        };

        if handle.moves_left() {
            e.left += dx;
        }
        if handle.moves_right() {
            e.right += dx;
        }
        if handle.moves_top() {
            e.top += dy;
        }
        if handle.moves_bottom() {
            e.bottom += dy;
        }

        let mut horizontal = Span {
            low: &mut e.left,
            high: &mut e.right,
            moves_low: handle.moves_left(),
        };
        horizontal.enforce_min();
        horizontal.clamp_to_unit();
        horizontal.enforce_min();

        let mut vertical = Span {
            low: &mut e.top,
            high: &mut e.bottom,
            moves_low: handle.moves_top(),
        };
        vertical.enforce_min();
        vertical.clamp_to_unit();
        vertical.enforce_min();

        self.live = NormalizedRegion::from_edges(e.left, e.top, e.right, e.bottom);
        self.live
    }

    /// Finish the current drag; the next drag starts from here
    pub fn commit_drag(&mut self) {
        self.snapshot = self.live;
    }

    /// Abandon the current drag
    pub fn cancel_drag(&mut self) {
        self.live = self.snapshot;
    }

    pub fn reset_to_full(&mut self) {
        self.snapshot = NormalizedRegion::FULL;
        self.live = NormalizedRegion::FULL;
    }

    /// Unit-space location of a handle on the live region
    pub fn handle_position(&self, handle: Handle) -> (f32, f32) {
        let r = self.live;
        let mid_x = r.x + r.width / 2.0;
        let mid_y = r.y + r.height / 2.0;
        match handle {
            Handle::TopLeft => (r.x, r.y),
            Handle::Top => (mid_x, r.y),
            Handle::TopRight => (r.right(), r.y),
            Handle::Right => (r.right(), mid_y),
            Handle::BottomRight => (r.right(), r.bottom()),
            Handle::Bottom => (mid_x, r.bottom()),
            Handle::BottomLeft => (r.x, r.bottom()),
            Handle::Left => (r.x, mid_y),
        }
    }

    /// Find the handle under a unit-space point.
    ///
    /// Corners are tested first so they win where they overlap an edge.
    /// Edges are grabbable along their whole length.
    pub fn hit_test(&self, point: (f32, f32), tolerance: f32) -> Option<Handle> {
        let (px, py) = point;
        if !(px.is_finite() && py.is_finite()) {
            return None;
        }
        let tol = tolerance.abs();

        let near = |a: f32, b: f32| (a - b).abs() <= tol;

        let corner = Handle::all()
            .into_iter()
            .filter(|h| h.is_corner())
            .find(|&h| {
                let (hx, hy) = self.handle_position(h);
                near(px, hx) && near(py, hy)
            });
        if corner.is_some() {
            return corner;
        }

        let r = self.live;
        let within_x = px >= r.x - tol && px <= r.right() + tol;
        let within_y = py >= r.y - tol && py <= r.bottom() + tol;

        if within_y && near(px, r.x) {
            Some(Handle::Left)
        } else if within_y && near(px, r.right()) {
            Some(Handle::Right)
        } else if within_x && near(py, r.y) {
            Some(Handle::Top)
        } else if within_x && near(py, r.bottom()) {
            Some(Handle::Bottom)
        } else {
            None
        }
    }
}

/// Convert a pointer delta in screen points to unit space of a page
/// displayed at `displayed_size`
pub fn screen_delta_to_unit(delta_px: (f32, f32), displayed_size: (f32, f32)) -> (f32, f32) {
    let axis = |d: f32, size: f32| {
        if size.is_finite() && size > 0.0 && d.is_finite() {
            d / size
        } else {
            0.0
        }
    };
    (
        axis(delta_px.0, displayed_size.0),
        axis(delta_px.1, displayed_size.1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn bottom_right_past_top_left_collapses_to_min_square() {
        let mut editor = CropEditor::begin(NormalizedRegion::FULL);
        let r = editor.drag(Handle::BottomRight, (-5.0, -5.0));
        assert!(approx(r.x, 0.0));
        assert!(approx(r.y, 0.0));
        assert!(approx(r.width, MIN_REGION_SIZE));
        assert!(approx(r.height, MIN_REGION_SIZE));
    }

    #[test]
    fn top_left_past_bottom_right_pins_to_far_corner() {
        let mut editor = CropEditor::begin(NormalizedRegion::FULL);
        let r = editor.drag(Handle::TopLeft, (5.0, 5.0));
        assert!(approx(r.right(), 1.0));
        assert!(approx(r.bottom(), 1.0));
        assert!(approx(r.width, MIN_REGION_SIZE));
    }

    #[test]
    fn handles_move_only_their_edges() {
        let start = NormalizedRegion::new(0.2, 0.2, 0.5, 0.5);
        let mut editor = CropEditor::begin(start);

        let r = editor.drag(Handle::Right, (0.1, 0.3));
        assert!(approx(r.x, 0.2));
        assert!(approx(r.y, 0.2));
        assert!(approx(r.width, 0.6));
        assert!(approx(r.height, 0.5));

        let r = editor.drag(Handle::Top, (0.3, -0.1));
        assert!(approx(r.x, 0.2));
        assert!(approx(r.y, 0.1));
        assert!(approx(r.bottom(), 0.7));
    }

    #[test]
    fn drags_are_relative_to_snapshot() {
        let mut editor = CropEditor::begin(NormalizedRegion::FULL);
        editor.drag(Handle::Left, (0.1, 0.0));
        editor.drag(Handle::Left, (0.2, 0.0));
        let r = editor.drag(Handle::Left, (0.3, 0.0));
        assert!(approx(r.x, 0.3));

        editor.commit_drag();
        let r = editor.drag(Handle::Left, (0.1, 0.0));
        assert!(approx(r.x, 0.4));

        editor.cancel_drag();
        assert!(approx(editor.region().x, 0.3));
    }

    #[test]
    fn overshoot_shrinks_only_the_moving_edge() {
        let start = NormalizedRegion::new(0.5, 0.5, 0.3, 0.3);
        let mut editor = CropEditor::begin(start);
        let r = editor.drag(Handle::BottomRight, (2.0, 2.0));
        assert!(approx(r.x, 0.5));
        assert!(approx(r.y, 0.5));
        assert!(approx(r.right(), 1.0));
        assert!(approx(r.bottom(), 1.0));
    }

    #[test]
    fn arbitrary_drags_keep_region_valid() {
        let deltas = [-100.0_f32, -1.5, -0.97, -0.5, -0.02, 0.0, 0.03, 0.4, 0.99, 3.0, 1e6];
        let starts = [
            NormalizedRegion::FULL,
            NormalizedRegion::new(0.0, 0.0, 0.05, 0.05),
            NormalizedRegion::new(0.95, 0.95, 0.05, 0.05),
            NormalizedRegion::new(0.3, 0.1, 0.4, 0.8),
        ];
        for start in starts {
            for handle in Handle::all() {
                for &dx in &deltas {
                    for &dy in &deltas {
                        let mut editor = CropEditor::begin(start);
                        let r = editor.drag(handle, (dx, dy));
                        assert!(r.is_valid(), "{handle:?} {dx} {dy} from {start:?} -> {r:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let mut editor = CropEditor::begin(NormalizedRegion::FULL);
        let r = editor.drag(Handle::Left, (f32::NAN, f32::INFINITY));
        assert!(r.is_full());
    }

    #[test]
    fn hit_test_prefers_corners() {
        let editor = CropEditor::begin(NormalizedRegion::new(0.2, 0.2, 0.6, 0.6));
        assert_eq!(editor.hit_test((0.21, 0.19), 0.03), Some(Handle::TopLeft));
        assert_eq!(editor.hit_test((0.8, 0.8), 0.03), Some(Handle::BottomRight));
        assert_eq!(editor.hit_test((0.2, 0.5), 0.03), Some(Handle::Left));
        assert_eq!(editor.hit_test((0.5, 0.79), 0.03), Some(Handle::Bottom));
        assert_eq!(editor.hit_test((0.5, 0.5), 0.03), None);
        assert_eq!(editor.hit_test((0.05, 0.5), 0.03), None);
    }

    #[test]
    fn handle_positions_follow_region() {
        let editor = CropEditor::begin(NormalizedRegion::new(0.1, 0.2, 0.4, 0.6));
        let (x, y) = editor.handle_position(Handle::Right);
        assert!(approx(x, 0.5));
        assert!(approx(y, 0.5));
    }

    #[test]
    fn reset_to_full_replaces_snapshot() {
        let mut editor = CropEditor::begin(NormalizedRegion::new(0.1, 0.2, 0.4, 0.6));
        editor.reset_to_full();
        editor.cancel_drag();
        assert!(editor.region().is_full());
    }

    #[test]
    fn screen_delta_conversion() {
        assert_eq!(screen_delta_to_unit((50.0, 100.0), (500.0, 1000.0)), (0.1, 0.1));
        assert_eq!(screen_delta_to_unit((50.0, 100.0), (0.0, -1.0)), (0.0, 0.0));
    }
}
