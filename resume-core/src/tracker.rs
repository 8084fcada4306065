//! Keeps the current page number in step with the scroll position of a
//! vertically stacked page list, and drives scroll-to-page navigation.

use tracing::{debug, trace};

use crate::geometry::{PageLayout, PageSlots};
use crate::scroll::{ScrollBehavior, ScrollContainer};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;
pub const SCALE_STEP: f32 = 0.25;
pub const DEFAULT_SCALE: f32 = 1.0;

/// Distance kept between the viewport top and a page navigated to.
pub const DEFAULT_SCROLL_OFFSET: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// 1-based.
    pub current_page: usize,
    pub scale: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_page: 1,
            scale: DEFAULT_SCALE,
        }
    }
}

impl ViewState {
    pub fn zoom_in(&mut self) -> bool {
        self.set_scale(self.scale + SCALE_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_scale(self.scale - SCALE_STEP)
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    fn set_scale(&mut self, scale: f32) -> bool {
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if (scale - self.scale).abs() > f32::EPSILON {
            self.scale = scale;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewportTracker {
    view: ViewState,
    page_count: usize,
    pages: PageSlots,
    scroll_offset: f32,
}

impl Default for ViewportTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_OFFSET)
    }
}

impl ViewportTracker {
    pub fn new(scroll_offset: f32) -> Self {
        Self {
            view: ViewState::default(),
            page_count: 0,
            pages: PageSlots::new(),
            scroll_offset,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn current_page(&self) -> usize {
        self.view.current_page
    }

    pub fn scale(&self) -> f32 {
        self.view.scale
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn pages(&self) -> &PageSlots {
        &self.pages
    }

    /// Document finished loading: size the page arena, all slots detached.
    pub fn on_load(&mut self, page_count: usize) {
        self.page_count = page_count;
        self.pages.allocate(page_count);
        self.view.current_page = 1;
    }

    /// Replaces every page rectangle with the ones from `layout`.
    pub fn attach_layout(&mut self, layout: &PageLayout) {
        self.pages.detach_all();
        for (idx, rect) in layout.rects.iter().enumerate() {
            self.pages.attach(idx + 1, *rect);
        }
    }

    /// Resolves the page under the vertical centre of the viewport.
    ///
    /// Returns the new page number when it changed. Leaves the page untouched
    /// if no rectangle contains the centre or the container is detached.
    pub fn on_scroll<C>(&mut self, container: Option<&C>) -> Option<usize>
    where
        C: ScrollContainer + ?Sized,
    {
        let container = container?;
        let scroll_center = container.scroll_top() + container.viewport_height() / 2.0;

        let (page, _) = self
            .pages
            .iter()
            .find(|(_, rect)| rect.contains(scroll_center))?;

        if page == self.view.current_page {
            return None;
        }
        trace!(page, scroll_center, "current page changed");
        self.view.current_page = page;
        Some(page)
    }

    /// Issues a smooth scroll that brings `page` just below the top of the
    /// viewport. Returns whether a scroll was issued.
    pub fn scroll_to_page<C>(&self, page: usize, container: Option<&mut C>) -> bool
    where
        C: ScrollContainer + ?Sized,
    {
        if page == 0 || page > self.page_count {
            return false;
        }
        let (Some(container), Some(rect)) = (container, self.pages.get(page)) else {
            return false;
        };

        let target = rect.top - self.scroll_offset;
        debug!(page, target, "scrolling to page");
        container.scroll_to(target, ScrollBehavior::Smooth);
        true
    }

    pub fn go_to_previous_page<C>(&self, container: Option<&mut C>) -> bool
    where
        C: ScrollContainer + ?Sized,
    {
        if self.view.current_page > 1 {
            self.scroll_to_page(self.view.current_page - 1, container)
        } else {
            false
        }
    }

    pub fn go_to_next_page<C>(&self, container: Option<&mut C>) -> bool
    where
        C: ScrollContainer + ?Sized,
    {
        if self.view.current_page < self.page_count {
            self.scroll_to_page(self.view.current_page + 1, container)
        } else {
            false
        }
    }

    /// Navigates to a typed page number; anything that is not a page of the
    /// document is ignored.
    pub fn go_to_page_input<C>(&self, raw: &str, container: Option<&mut C>) -> bool
    where
        C: ScrollContainer + ?Sized,
    {
        match raw.trim().parse::<usize>() {
            Ok(page) if (1..=self.page_count).contains(&page) => {
                self.scroll_to_page(page, container)
            }
            _ => false,
        }
    }

    pub fn zoom_in(&mut self) -> bool {
        self.view.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.view.zoom_out()
    }
}
