//! Site configuration schema.
//!
//! These types are deserialized from YAML site files. Durations stay as
//! strings (`"500ms"`, `"2s"`) until the validator has checked them.

use serde::{Deserialize, Serialize};

use crate::nav::NavLink;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root of a site file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SiteConfig {
    /// Site metadata and route table (required)
    pub site: SiteMetadata,

    /// Transition timings
    #[serde(default)]
    pub transition: TransitionConfig,

    /// In-memory router behavior
    #[serde(default)]
    pub router: RouterConfig,

    /// Landing screen
    #[serde(default)]
    pub landing: LandingConfig,

    /// Navigation bar entries; the portfolio defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<Vec<NavLink>>,

    /// Scripted session steps
    #[serde(default)]
    pub scenario: Vec<Step>,
}

impl SiteConfig {
    /// Nav entries, falling back to the defaults.
    #[must_use]
    pub fn nav_links(&self) -> Vec<NavLink> {
        self.nav.clone().unwrap_or_else(NavLink::defaults)
    }
}

// ============================================================================
// Site Metadata
// ============================================================================

/// Site identification and routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SiteMetadata {
    /// Site name (required)
    pub name: String,

    /// Public origin; absolute links on it count as internal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Path the router starts at
    #[serde(default = "default_start_path")]
    pub start_path: String,

    /// Known routes; navigation anywhere else is dropped by the router.
    /// Empty means every path is routable.
    #[serde(default)]
    pub routes: Vec<String>,
}

fn default_start_path() -> String {
    "/".to_string()
}

// ============================================================================
// Transition
// ============================================================================

/// Transition timings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransitionConfig {
    /// Cover animation length (default 500ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_duration: Option<String>,

    /// Delay between the route change and the reveal (default 16ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_interval: Option<String>,

    /// Reveal animation length; defaults to the cover duration, and
    /// `never` leaves the reveal unfinished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_duration: Option<String>,
}

/// Keyword for a reveal animation that never reports completion.
pub const NEVER: &str = "never";

// ============================================================================
// Router
// ============================================================================

/// How the in-memory router completes navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterMode {
    /// Path changes inside `navigate`
    #[default]
    Immediate,
    /// Path changes after `latency`
    Delayed,
    /// Navigations never complete
    Stalled,
}

/// Router section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RouterConfig {
    /// Commit behavior
    #[serde(default)]
    pub mode: RouterMode,

    /// Commit latency for `delayed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
}

// ============================================================================
// Landing
// ============================================================================

/// Landing screen section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LandingConfig {
    /// Whether visitors must pass the landing screen first
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

const fn default_true() -> bool {
    true
}

// ============================================================================
// Scenario
// ============================================================================

/// Modifier key held during a scripted click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Cmd
    Meta,
    /// Control
    Ctrl,
    /// Shift
    Shift,
    /// Alt / Option
    Alt,
}

/// One scripted session step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Press "enter" on the landing screen and wait for hyperspace
    Enter,

    /// Click a transition link
    Click {
        /// Link target
        href: String,
        /// Modifier keys held
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<Modifier>,
    },

    /// Click a nav bar entry
    Nav {
        /// Section id of the entry
        section: String,
    },

    /// Open or close the nav menu
    ToggleMenu,

    /// Let time pass
    Wait {
        /// How long
        duration: String,
    },

    /// Move the router without a transition (back button, address bar)
    Commit {
        /// New path
        path: String,
    },

    /// Report the end of the reveal animation by hand
    RevealDone,

    /// Scroll the page
    Scroll {
        /// Vertical offset in pixels
        y: u64,
    },
}

impl Step {
    /// Action name as written in YAML.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Click { .. } => "click",
            Self::Nav { .. } => "nav",
            Self::ToggleMenu => "toggle_menu",
            Self::Wait { .. } => "wait",
            Self::Commit { .. } => "commit",
            Self::RevealDone => "reveal_done",
            Self::Scroll { .. } => "scroll",
        }
    }
}
