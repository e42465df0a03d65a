//! Page navigation and region rendering for a sheet-music viewer.
//!
//! The crate is driven by a presentation layer through [`ViewerSession`]:
//! it turns taps, pedals and gestures into page positions, keeps per-page
//! crop regions, and renders full or half pages on a worker pool.

pub mod crop_store;
pub mod editor;
pub mod host;
pub mod logging;
pub mod navigation;
pub mod page_source;
pub mod paths;
pub mod region;
pub mod render;
pub mod session;
pub mod settings;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crop_store::{CropStore, DocumentCropSettings, DocumentId};
pub use editor::{CropEditor, Handle};
pub use host::{HeadlessHost, HostShell, Orientation};
pub use navigation::{
    Command, Effect, Gesture, Interaction, ModeController, NavigationIntent, PageAddress, ViewMode,
};
pub use page_source::{ImagePageSource, PageHandle, PageOrigin, PageSource, RenderFault};
pub use region::{CropSettings, NormalizedRegion, MIN_REGION_SIZE};
pub use render::{RenderService, TargetSize, ViewUpdate};
pub use session::{ApplyScope, ViewerSession};
pub use settings::EngineSettings;
pub use store::{JsonFileStore, MemoryStore, SettingsStore, StoreError};
