//! View-mode state machine
//!
//! Owns the current mode, the reading position and the zoom state, and is
//! the single authority on which interactions are permitted right now.
//! Callers feed it [`Command`]s and act on the returned [`Effect`]s.

use std::time::{Duration, Instant};

use log::debug;

use super::address::{
    clamp_position, half_position_for_page, page_for_half_position, position_to_pages,
    step_page, step_position, supports_half_page, PageAddress,
};
use super::gesture::{Gesture, TapBurst, DEFAULT_EXIT_WINDOW};
use super::tap_zone::{resolve_tap, TapZoneConfig};
use super::zoom::Zoom;
use super::NavigationIntent;
use crate::host::Orientation;

/// The exclusive interaction state of the viewer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
    #[default]
    Normal,
    HalfPage,
    Performance,
    CropEditing,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Normal => "Normal",
            ViewMode::HalfPage => "Half page",
            ViewMode::Performance => "Performance",
            ViewMode::CropEditing => "Crop",
        }
    }
}

/// Interactions gated by the current mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    TapNavigation,
    Pinch,
    Pan,
    CropDrag,
    SettingsAccess,
}

/// Everything a mode enables
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionSet {
    pub tap_navigation: bool,
    pub pinch: bool,
    pub pan: bool,
    pub crop_drag: bool,
    pub settings_access: bool,
    pub keep_screen_awake: bool,
}

impl InteractionSet {
    #[must_use]
    pub fn for_mode(mode: ViewMode) -> Self {
        match mode {
            ViewMode::Normal | ViewMode::HalfPage => Self {
                tap_navigation: true,
                pinch: true,
                pan: true,
                settings_access: true,
                ..Self::default()
            },
            ViewMode::Performance => Self {
                tap_navigation: true,
                keep_screen_awake: true,
                ..Self::default()
            },
            ViewMode::CropEditing => Self {
                crop_drag: true,
                ..Self::default()
            },
        }
    }

    #[must_use]
    pub fn permits(&self, interaction: Interaction) -> bool {
        match interaction {
            Interaction::TapNavigation => self.tap_navigation,
            Interaction::Pinch => self.pinch,
            Interaction::Pan => self.pan,
            Interaction::CropDrag => self.crop_drag,
            Interaction::SettingsAccess => self.settings_access,
        }
    }
}

/// Tunables for the controller
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeConfig {
    pub normal_tap_zones: TapZoneConfig,
    pub performance_tap_zones: TapZoneConfig,
    pub exit_window: Duration,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            normal_tap_zones: TapZoneConfig::NORMAL,
            performance_tap_zones: TapZoneConfig::PERFORMANCE,
            exit_window: DEFAULT_EXIT_WINDOW,
        }
    }
}

/// Layout underneath any overlay mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BaseMode {
    Normal,
    HalfPage,
}

impl From<BaseMode> for ViewMode {
    fn from(base: BaseMode) -> Self {
        match base {
            BaseMode::Normal => ViewMode::Normal,
            BaseMode::HalfPage => ViewMode::HalfPage,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Overlay {
    Performance,
    CropEditing,
}

/// Reading position in both page and half-page terms
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Placement {
    page_number: usize,
    half_position: usize,
}

/// Commands that modify mode state
#[derive(Clone, Copy, Debug)]
pub enum Command {
    /// Update the page count
    SetPageCount(usize),
    /// Jump to a 1-based page
    GoToPage(usize),
    /// Switch between Normal and HalfPage
    ToggleHalfPage,
    /// Lock the view for playing
    EnterPerformance,
    /// Open the crop editor on the current page
    EnterCropEditing,
    /// Close the crop editor
    ExitCropEditing,
    /// A tap at `x` on a screen `width` points wide
    Tap { x: f32, width: f32, at: Instant },
    /// Page-turn pedal or key
    Navigate(NavigationIntent),
    /// Pinch or pan
    Gesture(Gesture),
    /// The host reported a new orientation
    SetOrientation(Orientation),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// The active mode changed
    ModeChanged(ViewMode),
    /// The visible page(s) or their layout changed
    RenderCurrentView,
    /// Update prefetch queue
    UpdatePrefetch,
    /// Keep the screen on (or release it)
    ScreenAwake(bool),
    /// Zoom or pan changed
    ZoomChanged,
    /// The crop editor opened on this 0-based page
    CropEditorOpened(usize),
    /// The crop editor closed
    CropEditorClosed,
}

/// Mode state for one open document
#[derive(Clone, Debug)]
pub struct ModeController {
    base: BaseMode,
    overlay: Option<Overlay>,
    placement: Placement,
    page_count: usize,
    orientation: Orientation,
    zoom: Zoom,
    exit_burst: TapBurst<Placement>,
    config: ModeConfig,
}

impl ModeController {
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        Self::with_config(page_count, ModeConfig::default())
    }

    #[must_use]
    pub fn with_config(page_count: usize, config: ModeConfig) -> Self {
        Self {
            base: BaseMode::Normal,
            overlay: None,
            placement: Placement {
                page_number: 1,
                half_position: 0,
            },
            page_count,
            orientation: Orientation::Portrait,
            zoom: Zoom::default(),
            exit_burst: TapBurst::new(config.exit_window),
            config,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        match self.overlay {
            Some(Overlay::Performance) => ViewMode::Performance,
            Some(Overlay::CropEditing) => ViewMode::CropEditing,
            None => self.base.into(),
        }
    }

    /// The mode Performance or CropEditing will return to
    #[must_use]
    pub fn base_mode(&self) -> ViewMode {
        self.base.into()
    }

    #[must_use]
    pub fn permissions(&self) -> InteractionSet {
        InteractionSet::for_mode(self.mode())
    }

    #[must_use]
    pub fn permits(&self, interaction: Interaction) -> bool {
        self.permissions().permits(interaction)
    }

    #[must_use]
    pub fn tap_zones(&self) -> TapZoneConfig {
        if self.mode() == ViewMode::Performance {
            self.config.performance_tap_zones
        } else {
            self.config.normal_tap_zones
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Current 1-based page in page layout
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.placement.page_number
    }

    /// Current half-page position
    #[must_use]
    pub fn half_position(&self) -> usize {
        self.placement.half_position
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    /// Returns true if the view is laid out in half pages right now.
    /// Crop editing always shows a single full page.
    #[must_use]
    pub fn half_layout(&self) -> bool {
        self.base == BaseMode::HalfPage && self.overlay != Some(Overlay::CropEditing)
    }

    /// Linear position of the view in its current layout
    #[must_use]
    pub fn position(&self) -> usize {
        if self.half_layout() {
            self.placement.half_position
        } else {
            self.current_page()
        }
    }

    /// The 0-based page the view is on; for a split, the page in the top slot
    #[must_use]
    pub fn current_page(&self) -> usize {
        let number = if self.base == BaseMode::HalfPage {
            page_for_half_position(self.placement.half_position)
        } else {
            self.placement.page_number
        };
        number.saturating_sub(1)
    }

    /// Page(s) the view shows now
    #[must_use]
    pub fn address(&self) -> PageAddress {
        if self.half_layout() {
            position_to_pages(self.placement.half_position, self.page_count)
        } else {
            PageAddress::Full(self.current_page())
        }
    }

    /// Returns true if the half-page toggle would do anything
    #[must_use]
    pub fn can_toggle_half_page(&self) -> bool {
        self.overlay.is_none()
            && (self.base == BaseMode::HalfPage
                || (supports_half_page(self.page_count) && self.orientation.allows_half_page()))
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::SetPageCount(count) => self.set_page_count(count),

            Command::GoToPage(page_number) => {
                if self.overlay == Some(Overlay::CropEditing) || self.page_count == 0 {
                    return vec![];
                }
                let page_number = page_number.clamp(1, self.page_count);
                let before = self.address();
                self.placement.page_number = page_number;
                self.placement.half_position =
                    clamp_position(half_position_for_page(page_number), self.page_count);
                self.view_moved(before)
            }

            Command::ToggleHalfPage => self.toggle_half_page(),

            Command::EnterPerformance => {
                if self.overlay.is_some() {
                    return vec![];
                }
                self.overlay = Some(Overlay::Performance);
                self.exit_burst.clear();
                debug!("Entering performance mode over {:?}", self.base);

                let mut effects = vec![
                    Effect::ModeChanged(ViewMode::Performance),
                    Effect::ScreenAwake(true),
                ];
                if !self.zoom.is_identity() {
                    self.zoom.reset();
                    effects.push(Effect::ZoomChanged);
                }
                effects
            }

            Command::EnterCropEditing => {
                if self.overlay.is_some() || self.page_count == 0 {
                    return vec![];
                }
                self.overlay = Some(Overlay::CropEditing);
                self.zoom.reset();
                debug!("Crop editing page {}", self.current_page());
                vec![
                    Effect::ModeChanged(ViewMode::CropEditing),
                    Effect::CropEditorOpened(self.current_page()),
                    Effect::RenderCurrentView,
                ]
            }

            Command::ExitCropEditing => {
                if self.overlay != Some(Overlay::CropEditing) {
                    return vec![];
                }
                self.overlay = None;
                vec![
                    Effect::ModeChanged(self.base.into()),
                    Effect::CropEditorClosed,
                    Effect::RenderCurrentView,
                    Effect::UpdatePrefetch,
                ]
            }

            Command::Tap { x, width, at } => self.tap(x, width, at),

            Command::Navigate(intent) => {
                if !self.permits(Interaction::TapNavigation) {
                    return vec![];
                }
                self.navigate(intent)
            }

            Command::Gesture(gesture) => self.gesture(gesture),

            Command::SetOrientation(orientation) => self.set_orientation(orientation),
        }
    }

    fn set_page_count(&mut self, count: usize) -> Vec<Effect> {
        if self.page_count == count {
            return vec![];
        }
        let before = self.address();
        self.page_count = count;
        self.placement.page_number = self.placement.page_number.clamp(1, count.max(1));
        self.placement.half_position = clamp_position(self.placement.half_position, count);

        let mut effects = vec![];
        if self.base == BaseMode::HalfPage && !supports_half_page(count) {
            self.leave_half_page();
            if self.overlay.is_none() {
                effects.push(Effect::ModeChanged(ViewMode::Normal));
            }
        }
        if self.address() != before || !effects.is_empty() {
            effects.push(Effect::RenderCurrentView);
            effects.push(Effect::UpdatePrefetch);
        }
        effects
    }

    fn toggle_half_page(&mut self) -> Vec<Effect> {
        if !self.can_toggle_half_page() {
            return vec![];
        }

        match self.base {
            BaseMode::Normal => {
                self.placement.half_position = clamp_position(
                    half_position_for_page(self.placement.page_number),
                    self.page_count,
                );
                self.base = BaseMode::HalfPage;
                debug!(
                    "Half page on at position {} (page {})",
                    self.placement.half_position, self.placement.page_number
                );
            }
            BaseMode::HalfPage => {
                self.leave_half_page();
                debug!("Half page off at page {}", self.placement.page_number);
            }
        }

        vec![
            Effect::ModeChanged(self.base.into()),
            Effect::RenderCurrentView,
            Effect::UpdatePrefetch,
        ]
    }

    /// Re-derive the full page from the half position and switch layouts
    fn leave_half_page(&mut self) {
        let page_number = page_for_half_position(self.placement.half_position);
        self.placement.page_number = page_number.clamp(1, self.page_count.max(1));
        self.base = BaseMode::Normal;
    }

    fn tap(&mut self, x: f32, width: f32, at: Instant) -> Vec<Effect> {
        if !self.permits(Interaction::TapNavigation) {
            return vec![];
        }

        if self.overlay == Some(Overlay::Performance) {
            let current = self.placement;
            if let Some(snapshot) = self.exit_burst.register(at, || current) {
                return self.exit_performance(snapshot);
            }
        }

        match resolve_tap(x, width, self.tap_zones()).intent() {
            Some(intent) => self.navigate(intent),
            None => vec![],
        }
    }

    fn exit_performance(&mut self, restore: Placement) -> Vec<Effect> {
        let before = self.address();
        self.overlay = None;
        self.placement = restore;
        debug!("Leaving performance mode back to {:?}", self.base);

        let mut effects = vec![
            Effect::ModeChanged(self.base.into()),
            Effect::ScreenAwake(false),
        ];
        if self.address() != before {
            effects.push(Effect::RenderCurrentView);
            effects.push(Effect::UpdatePrefetch);
        }
        effects
    }

    fn navigate(&mut self, intent: NavigationIntent) -> Vec<Effect> {
        let before = self.address();

        if self.half_layout() {
            let Some(position) = step_position(self.placement.half_position, intent, self.page_count)
            else {
                return vec![];
            };
            self.placement.half_position = position;
            self.placement.page_number = page_for_half_position(position);
        } else {
            let Some(page_number) = step_page(self.placement.page_number, intent, self.page_count)
            else {
                return vec![];
            };
            self.placement.page_number = page_number;
            self.placement.half_position =
                clamp_position(half_position_for_page(page_number), self.page_count);
        }

        self.view_moved(before)
    }

    fn view_moved(&self, before: PageAddress) -> Vec<Effect> {
        if self.address() != before {
            vec![Effect::RenderCurrentView, Effect::UpdatePrefetch]
        } else {
            vec![]
        }
    }

    fn gesture(&mut self, gesture: Gesture) -> Vec<Effect> {
        let before = self.zoom;
        match gesture {
            Gesture::Pinch { scale } => {
                if !self.permits(Interaction::Pinch) {
                    return vec![];
                }
                self.zoom.pinch(scale);
            }
            Gesture::Pan { dx, dy } => {
                if !self.permits(Interaction::Pan) {
                    return vec![];
                }
                self.zoom.pan_by(dx, dy);
            }
        }

        if self.zoom != before {
            vec![Effect::ZoomChanged]
        } else {
            vec![]
        }
    }

    fn set_orientation(&mut self, orientation: Orientation) -> Vec<Effect> {
        if self.orientation == orientation {
            return vec![];
        }
        self.orientation = orientation;

        if orientation.allows_half_page() || self.base != BaseMode::HalfPage {
            return vec![];
        }

        let before = self.address();
        self.leave_half_page();
        debug!("Half page disabled by {orientation:?}");

        let mut effects = vec![];
        if self.overlay.is_none() {
            effects.push(Effect::ModeChanged(ViewMode::Normal));
        }
        if self.address() != before {
            effects.push(Effect::RenderCurrentView);
            effects.push(Effect::UpdatePrefetch);
        }
        effects
    }
}
