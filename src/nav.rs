//! Navigation bar and fullscreen menu.
//!
//! Nav links behave like [`TransitionLink`]s with one exception: on the
//! home page every section lives on the same page, so a click scrolls to
//! the section instead of navigating.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::link::{ClickEvent, LinkDecision, TransitionLink};
use crate::route::RoutePath;
use crate::transition::TransitionCoordinator;

/// Scroll offset (in pixels) past which the bar switches to its compact
/// "scrolled" look and the menu button appears.
pub const SCROLLED_THRESHOLD: u64 = 100;

/// One entry of the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    /// Link target
    pub href: String,
    /// Text shown in the bar
    pub label: String,
    /// Id of the home-page section this entry scrolls to
    pub section: String,
}

impl NavLink {
    /// Creates a nav entry.
    #[must_use]
    pub fn new(href: impl Into<String>, label: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
            section: section.into(),
        }
    }

    /// The portfolio's four entries.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("/", "Home", "hero"),
            Self::new("/about", "About", "about"),
            Self::new("/projects", "Projects", "projects"),
            Self::new("/contact", "Contact", "contact"),
        ]
    }
}

/// What a nav click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    /// Scrolled to a section of the home page.
    ScrollToSection(String),
    /// Went through the transition link.
    Link(LinkDecision),
}

/// Navigation bar state: entries, menu visibility, scrolled look.
#[derive(Debug, Clone)]
pub struct NavBar {
    links: Vec<(NavLink, TransitionLink)>,
    menu_open: bool,
    scrolled: bool,
    last_path: RoutePath,
}

impl NavBar {
    /// Creates a bar for `links`, resolving absolute URLs against `origin`.
    #[must_use]
    pub fn new(links: Vec<NavLink>, origin: Option<&str>, current: RoutePath) -> Self {
        let links = links
            .into_iter()
            .map(|nav| {
                let link = TransitionLink::with_origin(nav.href.clone(), origin);
                (nav, link)
            })
            .collect();
        Self {
            links,
            menu_open: false,
            scrolled: false,
            last_path: current,
        }
    }

    /// Configured entries.
    pub fn links(&self) -> impl Iterator<Item = &NavLink> {
        self.links.iter().map(|(nav, _)| nav)
    }

    /// Whether the fullscreen menu is open.
    #[must_use]
    pub const fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    /// Whether the bar shows its scrolled look.
    #[must_use]
    pub const fn is_scrolled(&self) -> bool {
        self.scrolled
    }

    /// Opens or closes the menu.
    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    /// Closes the menu.
    pub fn close_menu(&mut self) {
        self.menu_open = false;
    }

    /// Scroll listener.
    pub fn on_scroll(&mut self, scroll_y: u64) {
        self.scrolled = scroll_y > SCROLLED_THRESHOLD;
    }

    /// Route listener: any change of path closes the menu.
    pub fn on_path_changed(&mut self, path: &RoutePath) {
        if *path != self.last_path {
            self.last_path = path.clone();
            self.menu_open = false;
        }
    }

    /// Clicks the entry for `section`. Returns `None` if no entry has that
    /// section.
    pub fn click(
        &mut self,
        section: &str,
        event: &mut ClickEvent,
        coordinator: &Arc<TransitionCoordinator>,
    ) -> Option<NavAction> {
        let (nav, link) = self.links.iter().find(|(nav, _)| nav.section == section)?;

        if coordinator.current_path().is_root() {
            event.prevent_default();
            debug!(section = %nav.section, "scrolling to home-page section");
            let action = NavAction::ScrollToSection(nav.section.clone());
            self.menu_open = false;
            return Some(action);
        }

        Some(NavAction::Link(link.handle_click(event, coordinator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::FallThrough;
    use crate::router::{MemoryRouter, Router};
    use crate::transition::TransitionPhase;
    use crate::viewport::{MemoryViewport, Viewport};

    fn path(s: &str) -> RoutePath {
        RoutePath::parse(s).unwrap()
    }

    fn coordinator_at(p: &str) -> Arc<TransitionCoordinator> {
        let router: Arc<dyn Router> = Arc::new(MemoryRouter::new(path(p)));
        let viewport: Arc<dyn Viewport> = Arc::new(MemoryViewport::new());
        Arc::new(TransitionCoordinator::new(router, viewport))
    }

    #[test]
    fn test_scrolled_threshold() {
        let mut bar = NavBar::new(NavLink::defaults(), None, path("/"));
        bar.on_scroll(100);
        assert!(!bar.is_scrolled());
        bar.on_scroll(101);
        assert!(bar.is_scrolled());
        bar.on_scroll(0);
        assert!(!bar.is_scrolled());
    }

    #[test]
    fn test_menu_closes_on_route_change() {
        let mut bar = NavBar::new(NavLink::defaults(), None, path("/"));
        bar.toggle_menu();
        assert!(bar.is_menu_open());

        bar.on_path_changed(&path("/"));
        assert!(bar.is_menu_open());

        bar.on_path_changed(&path("/about"));
        assert!(!bar.is_menu_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_page_click_scrolls_to_section() {
        let coordinator = coordinator_at("/");
        let mut bar = NavBar::new(NavLink::defaults(), None, path("/"));
        bar.toggle_menu();

        let mut event = ClickEvent::plain();
        let action = bar.click("projects", &mut event, &coordinator);
        assert_eq!(action, Some(NavAction::ScrollToSection("projects".into())));
        assert!(event.is_default_prevented());
        assert!(!bar.is_menu_open());
        assert_eq!(coordinator.phase(), TransitionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_elsewhere_starts_transition() {
        let coordinator = coordinator_at("/about");
        let mut bar = NavBar::new(NavLink::defaults(), None, path("/about"));

        let mut event = ClickEvent::plain();
        let action = bar.click("contact", &mut event, &coordinator);
        assert_eq!(
            action,
            Some(NavAction::Link(LinkDecision::Intercept(path("/contact"))))
        );
        assert_eq!(coordinator.phase(), TransitionPhase::Covering);

        let mut same = ClickEvent::plain();
        assert_eq!(
            bar.click("about", &mut same, &coordinator),
            Some(NavAction::Link(LinkDecision::FallThrough(FallThrough::SamePage)))
        );
    }

    #[test]
    fn test_unknown_section() {
        let coordinator = coordinator_at("/about");
        let mut bar = NavBar::new(NavLink::defaults(), None, path("/about"));
        assert!(bar.click("blog", &mut ClickEvent::plain(), &coordinator).is_none());
    }
}
