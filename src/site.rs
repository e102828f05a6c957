//! Landing gate.
//!
//! Visitors first see a landing screen. Pressing "enter" plays the
//! hyperspace sequence, and only when it finishes is the main layout (and
//! with it every transition link) mounted.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Hyperspace progress gained per animation frame.
const HYPERSPACE_STEP: f64 = 0.012;

/// Progress at which the hyperspace sequence hands over to the site.
const HYPERSPACE_HANDOFF: f64 = 0.9;

/// Delay between reaching the handoff point and mounting the site.
pub const HYPERSPACE_SETTLE: Duration = Duration::from_millis(150);

/// Where the visitor is relative to the landing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePhase {
    /// Landing screen shown.
    #[default]
    Landing,
    /// Hyperspace sequence playing.
    Entering,
    /// Main layout mounted.
    Entered,
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Landing => "landing",
            Self::Entering => "entering",
            Self::Entered => "entered",
        };
        f.write_str(s)
    }
}

/// Landing → entering → entered.
#[derive(Debug, Clone, Default)]
pub struct SiteGate {
    phase: GatePhase,
}

impl SiteGate {
    /// Creates a gate on the landing screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gate phase.
    #[must_use]
    pub const fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Whether the main layout is mounted.
    #[must_use]
    pub const fn has_entered(&self) -> bool {
        matches!(self.phase, GatePhase::Entered)
    }

    /// Starts the hyperspace sequence. Returns `false` if not on the
    /// landing screen.
    pub fn enter(&mut self) -> bool {
        if self.phase != GatePhase::Landing {
            return false;
        }
        self.phase = GatePhase::Entering;
        true
    }

    /// Finishes the hyperspace sequence. Returns `false` if it was not
    /// playing.
    pub fn complete(&mut self) -> bool {
        if self.phase != GatePhase::Entering {
            return false;
        }
        self.phase = GatePhase::Entered;
        true
    }
}

/// Time the hyperspace sequence takes at the given frame interval.
#[must_use]
pub fn hyperspace_duration(frame_interval: Duration) -> Duration {
    let mut progress = 0.0;
    let mut frames = 0u32;
    while progress < HYPERSPACE_HANDOFF {
        progress += HYPERSPACE_STEP;
        frames += 1;
    }
    frame_interval * frames + HYPERSPACE_SETTLE
}
