use crate::document::PageSize;

/// Width used before the window size is known.
pub const FALLBACK_PAGE_WIDTH: f32 = 800.0;

const TABLET_MIN_WIDTH: f32 = 768.0;
const DESKTOP_MIN_WIDTH: f32 = 1024.0;

const MOBILE_MAX_PAGE_WIDTH: f32 = 600.0;
const TABLET_MAX_PAGE_WIDTH: f32 = 700.0;
const DESKTOP_PAGE_WIDTH: f32 = 800.0;

const MOBILE_SIDE_PADDING: f32 = 16.0;
const TABLET_SIDE_PADDING: f32 = 32.0;

pub const CONTENT_TOP_PADDING: f32 = 32.0;
pub const CONTENT_BOTTOM_PADDING: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub fn for_window_width(window_width: f32) -> Self {
        if window_width < TABLET_MIN_WIDTH {
            Breakpoint::Mobile
        } else if window_width < DESKTOP_MIN_WIDTH {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        matches!(self, Breakpoint::Mobile)
    }

    /// Vertical gap after every page but the last.
    pub fn page_gap(self) -> f32 {
        match self {
            Breakpoint::Mobile => 8.0,
            Breakpoint::Tablet | Breakpoint::Desktop => 16.0,
        }
    }
}

/// Rendered page width for a window of `window_width` pixels at `scale`.
///
/// A zero width means the window has not been measured yet; the fallback is
/// returned unscaled.
pub fn page_width(window_width: f32, scale: f32) -> f32 {
    if window_width <= 0.0 {
        return FALLBACK_PAGE_WIDTH;
    }

    match Breakpoint::for_window_width(window_width) {
        Breakpoint::Mobile => {
            (window_width - 2.0 * MOBILE_SIDE_PADDING).min(MOBILE_MAX_PAGE_WIDTH) * scale
        }
        Breakpoint::Tablet => {
            (window_width - 2.0 * TABLET_SIDE_PADDING).min(TABLET_MAX_PAGE_WIDTH) * scale
        }
        Breakpoint::Desktop => DESKTOP_PAGE_WIDTH * scale,
    }
}

/// Measured rectangle of a laid-out page, in content coordinates of the
/// scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub top: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Half-open containment: `top <= y < bottom`.
    pub fn contains(&self, y: f32) -> bool {
        y >= self.top && y < self.bottom()
    }

    pub fn intersects(&self, from: f32, to: f32) -> bool {
        self.top < to && self.bottom() > from
    }
}

/// Arena of page rectangles keyed by 1-based page number.
///
/// Slots are allocated empty when a document finishes loading and filled in
/// once the pages have been laid out. An empty slot reads as "not attached".
#[derive(Debug, Clone, Default)]
pub struct PageSlots {
    slots: Vec<Option<PageRect>>,
}

impl PageSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, page_count: usize) {
        self.slots = vec![None; page_count];
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn attach(&mut self, page: usize, rect: PageRect) -> bool {
        match page.checked_sub(1).and_then(|idx| self.slots.get_mut(idx)) {
            Some(slot) => {
                *slot = Some(rect);
                true
            }
            None => false,
        }
    }

    pub fn detach_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn get(&self, page: usize) -> Option<PageRect> {
        page.checked_sub(1)
            .and_then(|idx| self.slots.get(idx))
            .copied()
            .flatten()
    }

    /// Attached slots in page order as `(page, rect)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, PageRect)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|rect| (idx + 1, rect)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub breakpoint: Breakpoint,
    pub page_width: f32,
    pub rects: Vec<PageRect>,
    pub content_height: f32,
}

/// Stacks pages vertically at the responsive width for `window_width` and
/// `scale`, preserving each page's aspect ratio.
pub fn layout_pages(sizes: &[PageSize], window_width: f32, scale: f32) -> PageLayout {
    let breakpoint = Breakpoint::for_window_width(window_width);
    let width = page_width(window_width, scale);
    let gap = breakpoint.page_gap();

    let mut rects = Vec::with_capacity(sizes.len());
    let mut cursor = CONTENT_TOP_PADDING;
    for (idx, size) in sizes.iter().enumerate() {
        let height = width * size.aspect_ratio();
        rects.push(PageRect::new(cursor, height));
        cursor += height;
        if idx + 1 < sizes.len() {
            cursor += gap;
        }
    }

    PageLayout {
        breakpoint,
        page_width: width,
        rects,
        content_height: cursor + CONTENT_BOTTOM_PADDING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter() -> PageSize {
        PageSize {
            width: 612.0,
            height: 792.0,
        }
    }

    #[test]
    fn page_width_follows_breakpoints() {
        assert_eq!(page_width(0.0, 2.0), 800.0);
        assert_eq!(page_width(375.0, 1.0), 343.0);
        assert_eq!(page_width(700.0, 1.0), 600.0);
        assert_eq!(page_width(700.0, 0.5), 300.0);
        assert_eq!(page_width(800.0, 1.0), 700.0);
        assert_eq!(page_width(768.0, 1.0), 700.0);
        assert_eq!(page_width(1920.0, 1.25), 1000.0);
    }

    #[test]
    fn breakpoint_boundaries_are_half_open() {
        assert_eq!(Breakpoint::for_window_width(767.0), Breakpoint::Mobile);
        assert_eq!(Breakpoint::for_window_width(768.0), Breakpoint::Tablet);
        assert_eq!(Breakpoint::for_window_width(1023.0), Breakpoint::Tablet);
        assert_eq!(Breakpoint::for_window_width(1024.0), Breakpoint::Desktop);
    }

    #[test]
    fn layout_stacks_pages_with_gaps_and_padding() {
        let sizes = vec![letter(); 3];
        let layout = layout_pages(&sizes, 1280.0, 1.0);
        let height = 800.0 * 792.0 / 612.0;

        assert_eq!(layout.rects.len(), 3);
        assert_eq!(layout.rects[0].top, CONTENT_TOP_PADDING);
        assert!((layout.rects[1].top - (CONTENT_TOP_PADDING + height + 16.0)).abs() < 1e-3);
        let last = layout.rects[2];
        assert!((layout.content_height - (last.bottom() + CONTENT_BOTTOM_PADDING)).abs() < 1e-3);
    }

    #[test]
    fn mobile_layout_uses_tighter_gap() {
        let sizes = vec![letter(); 2];
        let layout = layout_pages(&sizes, 400.0, 1.0);
        assert_eq!(layout.breakpoint, Breakpoint::Mobile);
        let first = layout.rects[0];
        assert!((layout.rects[1].top - (first.bottom() + 8.0)).abs() < 1e-3);
    }

    #[test]
    fn slots_are_keyed_by_page_number() {
        let mut slots = PageSlots::new();
        slots.allocate(3);
        assert!(slots.get(1).is_none());
        assert!(slots.attach(2, PageRect::new(10.0, 5.0)));
        assert!(!slots.attach(0, PageRect::new(0.0, 1.0)));
        assert!(!slots.attach(4, PageRect::new(0.0, 1.0)));
        assert_eq!(slots.get(2), Some(PageRect::new(10.0, 5.0)));
        assert_eq!(slots.iter().map(|(page, _)| page).collect::<Vec<_>>(), vec![2]);

        slots.detach_all();
        assert!(slots.get(2).is_none());
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn rect_containment_excludes_bottom_edge() {
        let rect = PageRect::new(100.0, 50.0);
        assert!(rect.contains(100.0));
        assert!(rect.contains(149.9));
        assert!(!rect.contains(150.0));
        assert!(rect.intersects(140.0, 200.0));
        assert!(!rect.intersects(150.0, 200.0));
    }
}
