//! Viewport collaborator: the scroll position reset between pages.

use std::sync::atomic::{AtomicU64, Ordering};

/// The scrollable window the overlay covers.
pub trait Viewport: Send + Sync {
    /// Jumps to the top of the document.
    fn scroll_to_top(&self);
}

/// In-memory viewport tracking the vertical scroll offset.
#[derive(Debug, Default)]
pub struct MemoryViewport {
    scroll_y: AtomicU64,
    resets: AtomicU64,
}

impl MemoryViewport {
    /// Creates a viewport scrolled to the top.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vertical scroll offset in pixels.
    pub fn scroll_to(&self, y: u64) {
        self.scroll_y.store(y, Ordering::SeqCst);
    }

    /// Current vertical scroll offset in pixels.
    #[must_use]
    pub fn scroll_y(&self) -> u64 {
        self.scroll_y.load(Ordering::SeqCst)
    }

    /// How many times [`Viewport::scroll_to_top`] has been called.
    #[must_use]
    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }
}

impl Viewport for MemoryViewport {
    fn scroll_to_top(&self) {
        self.scroll_y.store(0, Ordering::SeqCst);
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_to_top_resets_and_counts() {
        let viewport = MemoryViewport::new();
        viewport.scroll_to(840);
        assert_eq!(viewport.scroll_y(), 840);

        viewport.scroll_to_top();
        assert_eq!(viewport.scroll_y(), 0);
        assert_eq!(viewport.resets(), 1);
    }
}
