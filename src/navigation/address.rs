//! Linear viewing positions for half-page navigation
//!
//! An N-page document has positions `0..=2N-2`. Even positions show page
//! `p/2` in full; odd positions show the bottom half of page `p/2` stacked
//! over the top half of page `p/2 + 1`. Page indices here are 0-based,
//! page numbers are 1-based.

use super::NavigationIntent;

/// The page(s) a viewing position shows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageAddress {
    /// One page shown in full
    Full(usize),
    /// Bottom half of the lower page over the top half of the upper page
    Split(usize, usize),
}

impl PageAddress {
    /// The first page visible at this address
    #[must_use]
    pub fn first_page(self) -> usize {
        match self {
            Self::Full(page) | Self::Split(page, _) => page,
        }
    }

    /// Returns true if the address shows the given page, fully or in part
    #[must_use]
    pub fn shows(self, page: usize) -> bool {
        match self {
            Self::Full(p) => p == page,
            Self::Split(lower, upper) => lower == page || upper == page,
        }
    }
}

/// Highest valid position for a document
#[must_use]
pub fn max_position(total_pages: usize) -> usize {
    total_pages.saturating_mul(2).saturating_sub(2)
}

/// Clamp a requested position into `[0, max_position]`
#[must_use]
pub fn clamp_position(position: usize, total_pages: usize) -> usize {
    position.min(max_position(total_pages))
}

/// Resolve a position to the page(s) it shows.
///
/// Total for every input: out-of-range positions are clamped first, and
/// documents with fewer than two pages always resolve to the first page.
#[must_use]
pub fn position_to_pages(position: usize, total_pages: usize) -> PageAddress {
    if total_pages <= 1 {
        return PageAddress::Full(0);
    }

    let position = clamp_position(position, total_pages);
    let lower = position / 2;
    if position % 2 == 0 {
        PageAddress::Full(lower)
    } else {
        PageAddress::Split(lower, lower + 1)
    }
}

/// Half position that shows the given 1-based page in full
#[must_use]
pub fn half_position_for_page(page_number: usize) -> usize {
    page_number.saturating_sub(1) * 2
}

/// 1-based page to show when leaving half-page mode at `position`
#[must_use]
pub fn page_for_half_position(position: usize) -> usize {
    position / 2 + 1
}

/// Returns true if half-page navigation has more than one position
#[must_use]
pub fn supports_half_page(total_pages: usize) -> bool {
    max_position(total_pages) > 0
}

/// Move one position in the given direction.
///
/// Returns `None` when the move would leave the document.
#[must_use]
pub fn step_position(position: usize, intent: NavigationIntent, total_pages: usize) -> Option<usize> {
    let position = clamp_position(position, total_pages);
    match intent {
        NavigationIntent::Backward => position.checked_sub(1),
        NavigationIntent::Forward => {
            let next = position + 1;
            (next <= max_position(total_pages)).then_some(next)
        }
    }
}

/// Move one page in the given direction, for 1-based page numbers.
///
/// Returns `None` when the move would leave the document.
#[must_use]
pub fn step_page(page_number: usize, intent: NavigationIntent, total_pages: usize) -> Option<usize> {
    if total_pages == 0 {
        return None;
    }
    let page_number = page_number.clamp(1, total_pages);
    match intent {
        NavigationIntent::Backward => (page_number > 1).then(|| page_number - 1),
        NavigationIntent::Forward => (page_number < total_pages).then(|| page_number + 1),
    }
}
