//! Link interception.
//!
//! A [`TransitionLink`] wraps an `href` and decides, per click, whether the
//! click becomes an animated transition or falls through to the browser's
//! default navigation. The coordinator only ever sees the intercepted ones.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::observability::metrics;
use crate::route::RoutePath;
use crate::transition::{TransitionCoordinator, TransitionPhase};

/// Modifier keys held during a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClickModifiers {
    /// Cmd on macOS
    pub meta: bool,
    /// Control
    pub ctrl: bool,
    /// Shift
    pub shift: bool,
    /// Alt / Option
    pub alt: bool,
}

impl ClickModifiers {
    /// Returns `true` if any modifier is held.
    #[must_use]
    pub const fn any(self) -> bool {
        self.meta || self.ctrl || self.shift || self.alt
    }
}

/// A click on a link, as delivered by the UI layer.
#[derive(Debug, Clone, Default)]
pub struct ClickEvent {
    /// Modifier keys held
    pub modifiers: ClickModifiers,
    default_prevented: bool,
}

impl ClickEvent {
    /// A plain click without modifiers.
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    /// A click with the given modifiers.
    #[must_use]
    pub fn with_modifiers(modifiers: ClickModifiers) -> Self {
        Self {
            modifiers,
            default_prevented: false,
        }
    }

    /// Suppresses the browser's default navigation.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether a handler already suppressed the default navigation.
    #[must_use]
    pub const fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// What an `href` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Href {
    /// A path on this site.
    Internal(RoutePath),
    /// Another origin, another scheme, or a protocol-relative URL.
    External(String),
    /// A fragment on the current page (`#contact`).
    Anchor(String),
    /// A fragment on a named page (`/#contact`, `/about#team`). Only a
    /// link to another page moves the router.
    PageAnchor {
        /// Page holding the fragment
        path: RoutePath,
        /// Fragment including the leading `#`
        fragment: String,
    },
    /// Relative or malformed; left to the browser.
    Unroutable(String),
}

impl Href {
    /// Classifies a raw `href`.
    ///
    /// Absolute URLs on `origin` (e.g. `https://example.dev/about`) are
    /// treated as internal paths.
    #[must_use]
    pub fn classify(raw: &str, origin: Option<&str>) -> Self {
        if raw.starts_with('#') {
            return Self::Anchor(raw.to_string());
        }

        if let Some(origin) = origin.map(|o| o.trim_end_matches('/')) {
            if let Some(rest) = raw.strip_prefix(origin) {
                if rest.is_empty() || rest.starts_with('#') {
                    return Self::site_path(&format!("/{rest}"), raw);
                }
                if rest.starts_with('/') && !rest.starts_with("//") {
                    return Self::site_path(rest, raw);
                }
            }
        }

        if raw.starts_with("//") || has_scheme(raw) {
            return Self::External(raw.to_string());
        }

        Self::site_path(raw, raw)
    }

    /// `target` is a site-relative path, possibly with a fragment.
    fn site_path(target: &str, raw: &str) -> Self {
        let (page, fragment) = match target.split_once('#') {
            Some((page, fragment)) => (page, Some(fragment)),
            None => (target, None),
        };
        match (RoutePath::parse(page), fragment) {
            (Ok(path), None) => Self::Internal(path),
            (Ok(path), Some(fragment)) => Self::PageAnchor {
                path,
                fragment: format!("#{fragment}"),
            },
            (Err(_), _) => Self::Unroutable(raw.to_string()),
        }
    }
}

/// `scheme:` prefix per RFC 3986: a letter, then letters, digits, `+`,
/// `-` or `.`, terminated by `:` before any `/`, `?` or `#`.
fn has_scheme(raw: &str) -> bool {
    let Some(colon) = raw.find(':') else {
        return false;
    };
    let scheme = &raw[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Why a click was left to default navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallThrough {
    /// An earlier handler already called `prevent_default`.
    AlreadyHandled,
    /// The link leaves the site.
    External,
    /// The link targets a fragment on this page.
    Anchor,
    /// The link is relative or malformed.
    Unroutable,
    /// A modifier key asks for browser-native behavior (new tab, ...).
    Modifier,
    /// The link targets the current page.
    SamePage,
    /// Another transition is in flight.
    Transitioning,
}

impl FallThrough {
    /// Label used for metrics and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyHandled => "already_handled",
            Self::External => "external",
            Self::Anchor => "anchor",
            Self::Unroutable => "unroutable",
            Self::Modifier => "modifier",
            Self::SamePage => "same_page",
            Self::Transitioning => "transitioning",
        }
    }
}

/// Outcome of a click on a [`TransitionLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// The click became a transition to this path.
    Intercept(RoutePath),
    /// The click was left to the browser.
    FallThrough(FallThrough),
}

impl LinkDecision {
    /// `"intercepted"` or the fall-through label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Intercept(_) => "intercepted",
            Self::FallThrough(reason) => reason.as_str(),
        }
    }
}

impl fmt::Display for LinkDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A link that navigates through the transition coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionLink {
    href: String,
    target: Href,
}

impl TransitionLink {
    /// Creates a link with no site origin configured.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self::with_origin(href, None)
    }

    /// Creates a link, treating absolute URLs on `origin` as internal.
    #[must_use]
    pub fn with_origin(href: impl Into<String>, origin: Option<&str>) -> Self {
        let href = href.into();
        let target = Href::classify(&href, origin);
        Self { href, target }
    }

    /// Raw `href`.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Classified target.
    #[must_use]
    pub const fn target(&self) -> &Href {
        &self.target
    }

    /// Decides what a click should do, without side effects.
    #[must_use]
    pub fn decide(
        &self,
        event: &ClickEvent,
        phase: TransitionPhase,
        current_path: &RoutePath,
    ) -> LinkDecision {
        if event.is_default_prevented() {
            return LinkDecision::FallThrough(FallThrough::AlreadyHandled);
        }
        let path = match &self.target {
            Href::Internal(path) => path,
            Href::PageAnchor { path, .. } if path == current_path => {
                return LinkDecision::FallThrough(FallThrough::Anchor);
            }
            Href::PageAnchor { path, .. } => path,
            Href::External(_) => return LinkDecision::FallThrough(FallThrough::External),
            Href::Anchor(_) => return LinkDecision::FallThrough(FallThrough::Anchor),
            Href::Unroutable(_) => return LinkDecision::FallThrough(FallThrough::Unroutable),
        };
        if event.modifiers.any() {
            return LinkDecision::FallThrough(FallThrough::Modifier);
        }
        if path == current_path {
            return LinkDecision::FallThrough(FallThrough::SamePage);
        }
        if phase.is_active() {
            return LinkDecision::FallThrough(FallThrough::Transitioning);
        }
        LinkDecision::Intercept(path.clone())
    }

    /// Handles a click: intercepted clicks have their default prevented
    /// and start a transition.
    pub fn handle_click(
        &self,
        event: &mut ClickEvent,
        coordinator: &Arc<TransitionCoordinator>,
    ) -> LinkDecision {
        let decision = self.decide(event, coordinator.phase(), &coordinator.current_path());
        metrics::record_link_click(decision.label());
        tracing::debug!(href = %self.href, decision = decision.label(), "link clicked");

        if let LinkDecision::Intercept(destination) = &decision {
            event.prevent_default();
            coordinator.start_transition(destination);
        }
        decision
    }
}
