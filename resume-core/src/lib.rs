pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod scroll;
pub mod tracker;
pub mod viewer;

pub use config::{project_dirs, RendererConfig, ViewerConfig};
pub use document::{
    DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, PageCache, PageSize,
    RenderImage, RenderRequest,
};
pub use error::ViewerError;
pub use geometry::{layout_pages, page_width, Breakpoint, PageLayout, PageRect, PageSlots};
pub use scroll::{ScrollBehavior, ScrollContainer, ScrollPane};
pub use tracker::{ViewState, ViewportTracker};
pub use viewer::{
    Command, LoadState, PlatformActions, Viewer, ViewerEvent, VisiblePage, LOAD_FAILED_HINT,
    LOAD_FAILED_TITLE,
};
