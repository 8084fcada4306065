use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ViewerConfig;
use crate::document::{
    DocumentBackend, DocumentInfo, DocumentProvider, PageCache, PageSize, RenderImage,
    RenderRequest,
};
use crate::error::ViewerError;
use crate::geometry::{layout_pages, Breakpoint, PageLayout, PageRect};
use crate::scroll::{ScrollContainer, ScrollPane};
use crate::tracker::ViewportTracker;

pub const LOAD_FAILED_TITLE: &str = "Failed to load PDF";
pub const LOAD_FAILED_HINT: &str = "Please check if the file exists";

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Loaded { page_count: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ScrollBy { delta: f32 },
    PreviousPage,
    NextPage,
    FirstPage,
    LastPage,
    /// 1-based.
    GotoPage { page: usize },
    PageInput { raw: String },
    ZoomIn,
    ZoomOut,
    Print,
    Download,
    OpenWebsite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Loaded { page_count: usize },
    LoadFailed { reason: String },
    RedrawNeeded,
    PageChanged { page: usize },
    ScaleChanged { scale: f32 },
    Notice(String),
}

/// Side effects that leave the viewer: printing, saving a copy, opening the
/// website.
pub trait PlatformActions: Send + Sync {
    fn print(&self, document: &Path) -> Result<()>;
    fn download(&self, document: &Path, file_name: &str) -> Result<PathBuf>;
    fn open_url(&self, url: &Url) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisiblePage {
    /// 1-based.
    pub page: usize,
    pub rect: PageRect,
}

pub struct Viewer {
    config: ViewerConfig,
    website: Url,
    state: LoadState,
    tracker: ViewportTracker,
    pane: Option<ScrollPane>,
    backend: Option<Arc<dyn DocumentBackend>>,
    page_sizes: Vec<PageSize>,
    layout: Option<PageLayout>,
    window_width: f32,
    viewport_height: f32,
    cache: PageCache,
    actions: Arc<dyn PlatformActions>,
    events: Mutex<Vec<ViewerEvent>>,
}

impl Viewer {
    pub fn new(
        config: ViewerConfig,
        actions: Arc<dyn PlatformActions>,
    ) -> Result<Self, ViewerError> {
        config.validate()?;
        let website = config.website_url()?;
        let tracker = ViewportTracker::new(config.scroll_offset);
        Ok(Self {
            config,
            website,
            state: LoadState::Loading,
            tracker,
            pane: None,
            backend: None,
            page_sizes: Vec::new(),
            layout: None,
            window_width: 0.0,
            viewport_height: 0.0,
            cache: PageCache::new(),
            actions,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn tracker(&self) -> &ViewportTracker {
        &self.tracker
    }

    pub fn page_count(&self) -> usize {
        self.tracker.page_count()
    }

    pub fn current_page(&self) -> usize {
        self.tracker.current_page()
    }

    pub fn scale(&self) -> f32 {
        self.tracker.scale()
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        self.backend.as_deref().map(|backend| backend.info())
    }

    pub fn layout(&self) -> Option<&PageLayout> {
        self.layout.as_ref()
    }

    pub fn breakpoint(&self) -> Breakpoint {
        Breakpoint::for_window_width(self.window_width)
    }

    pub fn scroll_top(&self) -> f32 {
        self.pane.as_ref().map_or(0.0, |pane| pane.scroll_top())
    }

    pub fn is_animating(&self) -> bool {
        self.pane.as_ref().is_some_and(|pane| pane.is_animating())
    }

    /// Toolbars and navigation exist only once a non-empty document loaded.
    pub fn controls_visible(&self) -> bool {
        matches!(self.state, LoadState::Loaded { page_count } if page_count > 0)
    }

    pub fn drain_events(&self) -> Vec<ViewerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Opens the configured document. A failure is terminal and shown in
    /// place of the pages; it is not returned as an error.
    pub async fn load<P>(&mut self, provider: &P)
    where
        P: DocumentProvider + ?Sized,
    {
        let path = self.config.document.clone();
        self.load_with(provider, path).await
    }

    #[instrument(skip(self, provider))]
    pub async fn load_with<P>(&mut self, provider: &P, path: PathBuf)
    where
        P: DocumentProvider + ?Sized,
    {
        let opened = match provider.open(&path).await {
            Ok(backend) => backend.page_sizes().map(|sizes| (backend, sizes)),
            Err(err) => Err(err),
        };

        match opened {
            Ok((backend, sizes)) => {
                let page_count = backend.info().page_count;
                info!(?path, page_count, "document loaded");
                self.tracker.on_load(page_count);
                self.page_sizes = sizes;
                self.backend = Some(backend);
                self.state = LoadState::Loaded { page_count };
                self.cache.clear();
                self.relayout();
                self.push(ViewerEvent::Loaded { page_count });
            }
            Err(err) => {
                warn!(?err, ?path, "failed to load document");
                let reason = format!("{err:#}");
                self.state = LoadState::Failed {
                    reason: reason.clone(),
                };
                self.push(ViewerEvent::LoadFailed { reason });
            }
        }
        self.push(ViewerEvent::RedrawNeeded);
    }

    /// Window geometry changed. Attaches the scroll pane on first call.
    pub fn resize(&mut self, window_width: f32, viewport_height: f32) {
        self.window_width = window_width.max(0.0);
        self.viewport_height = viewport_height.max(0.0);
        if self.pane.is_none() {
            self.pane = Some(
                ScrollPane::new(self.viewport_height, 0.0).with_easing(self.config.easing),
            );
        }
        self.relayout();
        self.push(ViewerEvent::RedrawNeeded);
    }

    fn relayout(&mut self) {
        if self.page_sizes.is_empty() {
            return;
        }
        if !self.cache.is_empty() {
            // Renders at the old width are evicted first as new ones arrive.
            debug!(cached = self.cache.len(), "relayout with cached renders");
        }
        let layout = layout_pages(&self.page_sizes, self.window_width, self.tracker.scale());
        debug!(
            page_width = layout.page_width,
            content_height = layout.content_height,
            "laid out pages"
        );
        self.tracker.attach_layout(&layout);
        if let Some(pane) = self.pane.as_mut() {
            pane.resize(self.viewport_height, layout.content_height);
        }
        self.layout = Some(layout);
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        if !self.controls_visible() {
            debug!(?command, "ignoring command while no document is shown");
            return Ok(());
        }

        match command {
            Command::ScrollBy { delta } => {
                let moved = self
                    .pane
                    .as_mut()
                    .is_some_and(|pane| pane.scroll_by(delta));
                if moved {
                    self.sync_page();
                    self.push(ViewerEvent::RedrawNeeded);
                }
            }
            Command::PreviousPage => {
                self.tracker.go_to_previous_page(self.pane.as_mut());
            }
            Command::NextPage => {
                self.tracker.go_to_next_page(self.pane.as_mut());
            }
            Command::FirstPage => {
                self.tracker.scroll_to_page(1, self.pane.as_mut());
            }
            Command::LastPage => {
                let last = self.tracker.page_count();
                self.tracker.scroll_to_page(last, self.pane.as_mut());
            }
            Command::GotoPage { page } => {
                self.tracker.scroll_to_page(page, self.pane.as_mut());
            }
            Command::PageInput { raw } => {
                if !self.tracker.go_to_page_input(&raw, self.pane.as_mut()) {
                    debug!(%raw, "ignoring page input");
                }
            }
            Command::ZoomIn => self.zoom(ViewportTracker::zoom_in),
            Command::ZoomOut => self.zoom(ViewportTracker::zoom_out),
            Command::Print => {
                let document = self.document_path();
                let notice = match self.actions.print(&document) {
                    Ok(()) => format!("Sent {} to the printer", display_name(&document)),
                    Err(err) => {
                        warn!(?err, ?document, "print failed");
                        format!("Print failed: {err}")
                    }
                };
                self.push(ViewerEvent::Notice(notice));
            }
            Command::Download => {
                let document = self.document_path();
                let notice = match self
                    .actions
                    .download(&document, &self.config.download_name)
                {
                    Ok(saved) => format!("Saved {}", saved.display()),
                    Err(err) => {
                        warn!(?err, ?document, "download failed");
                        format!("Download failed: {err}")
                    }
                };
                self.push(ViewerEvent::Notice(notice));
            }
            Command::OpenWebsite => {
                let notice = match self.actions.open_url(&self.website) {
                    Ok(()) => format!("Opened {}", self.website),
                    Err(err) => {
                        warn!(?err, url = %self.website, "failed to open website");
                        format!("Could not open {}: {err}", self.website)
                    }
                };
                self.push(ViewerEvent::Notice(notice));
            }
        }
        Ok(())
    }

    fn zoom(&mut self, step: fn(&mut ViewportTracker) -> bool) {
        if step(&mut self.tracker) {
            let scale = self.tracker.scale();
            self.relayout();
            self.push(ViewerEvent::ScaleChanged { scale });
            self.push(ViewerEvent::RedrawNeeded);
        }
    }

    /// Advances a smooth scroll by one frame. Returns whether anything moved.
    pub fn tick(&mut self) -> bool {
        let moved = self.pane.as_mut().is_some_and(|pane| pane.tick());
        if moved {
            self.sync_page();
        }
        moved
    }

    fn sync_page(&mut self) {
        if let Some(page) = self.tracker.on_scroll(self.pane.as_ref()) {
            self.push(ViewerEvent::PageChanged { page });
        }
    }

    /// Pages intersecting the viewport, top to bottom.
    pub fn visible_pages(&self) -> Vec<VisiblePage> {
        let Some(pane) = self.pane.as_ref() else {
            return Vec::new();
        };
        let from = pane.scroll_top();
        let to = from + pane.viewport_height();
        self.tracker
            .pages()
            .iter()
            .filter(|(_, rect)| rect.intersects(from, to))
            .map(|(page, rect)| VisiblePage { page, rect })
            .collect()
    }

    /// Bitmap of `page` (1-based) at the current layout width.
    pub fn render_page(&self, page: usize) -> Result<Arc<RenderImage>> {
        let backend = self
            .backend
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no document loaded"))?;
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("document has not been laid out"))?;
        let page_index = page
            .checked_sub(1)
            .filter(|idx| *idx < self.page_count())
            .ok_or_else(|| anyhow::anyhow!("page {page} out of range"))?;

        let request = RenderRequest {
            page_index,
            width: layout.page_width.round().max(1.0) as u32,
        };
        self.cache
            .get_or_render(backend, request, self.current_page().saturating_sub(1))
    }

    fn document_path(&self) -> PathBuf {
        self.info()
            .map(|info| info.path.clone())
            .unwrap_or_else(|| self.config.document.clone())
    }

    fn push(&self, event: ViewerEvent) {
        self.events.lock().push(event);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .to_string()
}
