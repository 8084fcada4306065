#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// Scroll offset and geometry of the container holding the page stack.
pub trait ScrollContainer {
    fn scroll_top(&self) -> f32;
    fn viewport_height(&self) -> f32;
    fn scroll_to(&mut self, top: f32, behavior: ScrollBehavior);
}

const DEFAULT_EASING: f32 = 0.35;
const SETTLE_DISTANCE: f32 = 0.5;

/// Vertical scroll container with exponential ease-out for smooth scrolls.
///
/// A smooth scroll only records a target; each `tick` closes a fixed fraction
/// of the remaining distance. Issuing a new target replaces the old one.
#[derive(Debug, Clone)]
pub struct ScrollPane {
    scroll_top: f32,
    viewport_height: f32,
    content_height: f32,
    target: Option<f32>,
    easing: f32,
}

impl ScrollPane {
    pub fn new(viewport_height: f32, content_height: f32) -> Self {
        Self {
            scroll_top: 0.0,
            viewport_height: viewport_height.max(0.0),
            content_height: content_height.max(0.0),
            target: None,
            easing: DEFAULT_EASING,
        }
    }

    pub fn with_easing(mut self, easing: f32) -> Self {
        self.easing = if easing.is_finite() {
            easing.clamp(0.05, 1.0)
        } else {
            DEFAULT_EASING
        };
        self
    }

    pub fn max_scroll(&self) -> f32 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    pub fn is_animating(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<f32> {
        self.target
    }

    /// Updates the geometry after a relayout or resize, keeping the offset
    /// inside the new bounds.
    pub fn resize(&mut self, viewport_height: f32, content_height: f32) {
        self.viewport_height = viewport_height.max(0.0);
        self.content_height = content_height.max(0.0);
        self.scroll_top = self.clamp(self.scroll_top);
        self.target = self.target.map(|target| self.clamp(target));
    }

    /// Immediate relative scroll, as from a wheel or arrow key. Cancels any
    /// smooth scroll in flight.
    pub fn scroll_by(&mut self, delta: f32) -> bool {
        self.target = None;
        let next = self.clamp(self.scroll_top + delta);
        let moved = (next - self.scroll_top).abs() > f32::EPSILON;
        self.scroll_top = next;
        moved
    }

    /// Advances a smooth scroll by one frame. Returns whether the offset moved.
    pub fn tick(&mut self) -> bool {
        let Some(target) = self.target else {
            return false;
        };

        let remaining = target - self.scroll_top;
        if remaining.abs() <= SETTLE_DISTANCE {
            self.scroll_top = target;
            self.target = None;
            return remaining != 0.0;
        }

        self.scroll_top += remaining * self.easing;
        true
    }

    /// Runs the animation to completion.
    pub fn settle(&mut self) {
        while self.tick() {}
    }

    fn clamp(&self, top: f32) -> f32 {
        top.clamp(0.0, self.max_scroll())
    }
}

impl ScrollContainer for ScrollPane {
    fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn scroll_to(&mut self, top: f32, behavior: ScrollBehavior) {
        let top = self.clamp(top);
        match behavior {
            ScrollBehavior::Smooth => {
                if (top - self.scroll_top).abs() <= f32::EPSILON {
                    self.target = None;
                } else {
                    self.target = Some(top);
                }
            }
            ScrollBehavior::Instant => {
                self.target = None;
                self.scroll_top = top;
            }
        }
    }
}
