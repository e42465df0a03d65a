//! Viewer session: one open document and everything that acts on it
//!
//! The session owns the mode controller, crop store, render service and the
//! crop editor while one is open. The presentation layer drives it with
//! input events and draws whatever [`ViewerSession::poll_render`] delivers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::crop_store::{CropStore, DocumentId};
use crate::editor::{screen_delta_to_unit, CropEditor, Handle};
use crate::host::{HostShell, Orientation};
use crate::navigation::address::{clamp_position, max_position, position_to_pages};
use crate::navigation::{
    Command, Effect, Gesture, Interaction, ModeController, NavigationIntent, PageAddress,
    ViewMode, Zoom,
};
use crate::page_source::PageSource;
use crate::region::{CropSettings, NormalizedRegion};
use crate::render::{
    HalfSelector, RenderService, SlotSpec, TargetSize, ViewTicket, ViewUpdate,
};
use crate::settings::EngineSettings;
use crate::store::SettingsStore;

/// Where an edited crop is saved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyScope {
    /// Override for the edited page only
    ThisPage,
    /// New document default; clears every page override
    AllPages,
}

/// Crop editor bound to the page it edits
struct OpenEditor {
    page: usize,
    editor: CropEditor,
}

pub struct ViewerSession {
    document: DocumentId,
    source: Arc<dyn PageSource>,
    controller: ModeController,
    crops: CropStore,
    renderer: RenderService,
    editor: Option<OpenEditor>,
    host: Box<dyn HostShell>,
    target: TargetSize,
}

impl ViewerSession {
    pub fn new(
        document: DocumentId,
        source: Arc<dyn PageSource>,
        store: Box<dyn SettingsStore>,
        host: Box<dyn HostShell>,
        settings: &EngineSettings,
    ) -> Self {
        let page_count = source.page_count();
        let mut controller = ModeController::with_config(page_count, settings.mode_config());
        let _ = controller.apply(Command::SetOrientation(host.current_orientation()));
        let renderer = RenderService::with_config(Arc::clone(&source), settings.service_config());

        info!("Opened {document} with {page_count} pages");

        Self {
            document,
            source,
            controller,
            crops: CropStore::new(store),
            renderer,
            editor: None,
            host,
            target: TargetSize::new(0, 0),
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn mode(&self) -> ViewMode {
        self.controller.mode()
    }

    pub fn permits(&self, interaction: Interaction) -> bool {
        self.controller.permits(interaction)
    }

    pub fn address(&self) -> PageAddress {
        self.controller.address()
    }

    pub fn zoom(&self) -> &Zoom {
        self.controller.zoom()
    }

    pub fn target(&self) -> TargetSize {
        self.target
    }

    /// The open crop editor, with the page it edits
    pub fn editor(&self) -> Option<(usize, &CropEditor)> {
        self.editor.as_ref().map(|open| (open.page, &open.editor))
    }

    /// Crop currently applied to a page
    pub fn crop_for(&mut self, page: usize) -> CropSettings {
        self.crops.get(&self.document, page)
    }

    pub fn has_crop_override(&mut self, page: usize) -> bool {
        self.crops.has_override(&self.document, page)
    }

    /// Set the display size the view renders for
    pub fn set_viewport(&mut self, target: TargetSize) {
        if self.target == target {
            return;
        }
        debug!("Viewport {:?} -> {target:?}", self.target);
        self.target = target;
        self.render_current_view();
        self.schedule_prefetch();
    }

    /// Apply a command to the mode controller and carry out its effects.
    /// The effects are returned for the presentation layer.
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        let effects = self.controller.apply(cmd);
        self.execute_effects(&effects);
        effects
    }

    pub fn tap(&mut self, x: f32, width: f32) -> Vec<Effect> {
        self.tap_at(x, width, Instant::now())
    }

    pub fn tap_at(&mut self, x: f32, width: f32, at: Instant) -> Vec<Effect> {
        self.apply(Command::Tap { x, width, at })
    }

    /// Page-turn pedal or key
    pub fn navigate(&mut self, intent: NavigationIntent) -> Vec<Effect> {
        self.apply(Command::Navigate(intent))
    }

    pub fn go_to_page(&mut self, page_number: usize) -> Vec<Effect> {
        self.apply(Command::GoToPage(page_number))
    }

    pub fn toggle_half_page(&mut self) -> Vec<Effect> {
        self.apply(Command::ToggleHalfPage)
    }

    pub fn enter_performance(&mut self) -> Vec<Effect> {
        self.apply(Command::EnterPerformance)
    }

    pub fn gesture(&mut self, gesture: Gesture) -> Vec<Effect> {
        self.apply(Command::Gesture(gesture))
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> Vec<Effect> {
        self.apply(Command::SetOrientation(orientation))
    }

    /// Re-read the orientation from the host
    pub fn sync_orientation(&mut self) -> Vec<Effect> {
        let orientation = self.host.current_orientation();
        self.set_orientation(orientation)
    }

    /// The page count changed, e.g. after pages were removed from the source
    pub fn refresh_page_count(&mut self) -> Vec<Effect> {
        let count = self.source.page_count();
        self.apply(Command::SetPageCount(count))
    }

    /// Open the crop editor on the current page. Returns false if the
    /// current mode does not allow it.
    pub fn begin_crop_edit(&mut self) -> bool {
        !self.apply(Command::EnterCropEditing).is_empty()
    }

    /// Drag a handle by the total unit-space translation since the drag began
    pub fn drag_handle(&mut self, handle: Handle, total_delta: (f32, f32)) -> Option<NormalizedRegion> {
        if !self.controller.permits(Interaction::CropDrag) {
            return None;
        }
        let open = self.editor.as_mut()?;
        Some(open.editor.drag(handle, total_delta))
    }

    /// Like [`drag_handle`](Self::drag_handle) with a delta in screen points
    /// over a page displayed at `displayed_size`
    pub fn drag_handle_px(
        &mut self,
        handle: Handle,
        delta_px: (f32, f32),
        displayed_size: (f32, f32),
    ) -> Option<NormalizedRegion> {
        self.drag_handle(handle, screen_delta_to_unit(delta_px, displayed_size))
    }

    /// Pointer released; the next drag starts from the current region
    pub fn end_drag(&mut self) {
        if let Some(open) = self.editor.as_mut() {
            open.editor.commit_drag();
        }
    }

    /// Put the editor back to the whole page; nothing is saved until applied
    pub fn reset_editor_to_full(&mut self) {
        if let Some(open) = self.editor.as_mut() {
            open.editor.reset_to_full();
        }
    }

    /// Save the edited region and close the editor.
    ///
    /// A failed save is logged; the new crop stays in effect for the session.
    pub fn apply_crop(&mut self, scope: ApplyScope) -> Vec<Effect> {
        let Some(open) = self.editor.as_mut() else {
            return vec![];
        };
        open.editor.commit_drag();
        let page = open.page;
        let settings = CropSettings::new(open.editor.region());

        let saved = match scope {
            ApplyScope::ThisPage => self.crops.set_for_page(&self.document, page, settings),
            ApplyScope::AllPages => self.crops.set_default(&self.document, settings),
        };
        if let Err(e) = saved {
            error!("Failed to save crop settings for {}: {e}", self.document);
        }

        match scope {
            ApplyScope::ThisPage => self.renderer.invalidate_page(page),
            ApplyScope::AllPages => self.renderer.invalidate_all(),
        }
        info!("Applied crop {:?} to {scope:?} (page {page})", settings.region);

        self.apply(Command::ExitCropEditing)
    }

    /// Close the editor without saving
    pub fn cancel_crop_edit(&mut self) -> Vec<Effect> {
        self.apply(Command::ExitCropEditing)
    }

    /// Drop a page's own crop so it follows the document default again
    pub fn reset_page_crop(&mut self, page: usize) {
        if let Err(e) = self.crops.reset(&self.document, page) {
            error!("Failed to save crop settings for {}: {e}", self.document);
        }
        self.renderer.invalidate_page(page);

        if self.mode() != ViewMode::CropEditing && self.address().shows(page) {
            self.render_current_view();
        }
    }

    pub fn current_ticket(&self) -> Option<ViewTicket> {
        self.renderer.current_ticket()
    }

    /// Slots of the current view that finished rendering
    pub fn poll_render(&mut self) -> Vec<ViewUpdate> {
        self.renderer.poll_responses()
    }

    pub fn poll_render_timeout(&mut self, timeout: Duration) -> Vec<ViewUpdate> {
        self.renderer.poll_responses_timeout(timeout)
    }

    pub fn is_view_complete(&self) -> bool {
        self.renderer.is_view_complete()
    }

    pub fn render_service(&self) -> &RenderService {
        &self.renderer
    }

    fn execute_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::ModeChanged(mode) => {
                    debug!("Mode is now {}", mode.as_str());
                }

                Effect::RenderCurrentView => self.render_current_view(),

                Effect::UpdatePrefetch => self.schedule_prefetch(),

                Effect::ScreenAwake(awake) => self.host.set_screen_awake_hint(*awake),

                Effect::ZoomChanged => {}

                Effect::CropEditorOpened(page) => {
                    let region = self.crops.get(&self.document, *page).region;
                    self.editor = Some(OpenEditor {
                        page: *page,
                        editor: CropEditor::begin(region),
                    });
                }

                Effect::CropEditorClosed => self.editor = None,
            }
        }
    }

    /// Images that make up the view at `address`
    fn slots_for(&mut self, address: PageAddress) -> Vec<SlotSpec> {
        if self.mode() == ViewMode::CropEditing {
            // The editor draws its rectangle over the uncropped page
            return vec![SlotSpec::full(address.first_page(), NormalizedRegion::FULL)];
        }

        match address {
            PageAddress::Full(page) => {
                vec![SlotSpec::full(page, self.crop_for(page).region)]
            }
            PageAddress::Split(lower, upper) => vec![
                SlotSpec::half(lower, self.crop_for(lower).region, HalfSelector::Bottom),
                SlotSpec::half(upper, self.crop_for(upper).region, HalfSelector::Top),
            ],
        }
    }

    fn render_current_view(&mut self) {
        if self.target.is_empty() || self.controller.page_count() == 0 {
            debug!("Nothing to render yet (target {:?})", self.target);
            return;
        }

        let address = self.controller.address();
        let slots = self.slots_for(address);
        self.renderer
            .request_view(self.controller.position(), address, &slots, self.target);
    }

    fn schedule_prefetch(&mut self) {
        let radius = self.renderer.prefetch_radius();
        let total = self.controller.page_count();
        if radius == 0 || total == 0 || self.target.is_empty() {
            return;
        }
        if self.mode() == ViewMode::CropEditing {
            return;
        }

        let position = self.controller.position();
        let half_layout = self.controller.half_layout();
        let last = if half_layout {
            max_position(total)
        } else {
            total - 1
        };

        let mut slots = vec![];
        for offset in 1..=radius {
            let neighbors = [
                position.checked_add(offset).filter(|p| *p <= last),
                position.checked_sub(offset),
            ];
            for neighbor in neighbors.into_iter().flatten() {
                let address = if half_layout {
                    position_to_pages(clamp_position(neighbor, total), total)
                } else {
                    PageAddress::Full(neighbor)
                };
                slots.extend(self.slots_for(address));
            }
        }

        self.renderer.prefetch(&slots, self.target);
    }
}
