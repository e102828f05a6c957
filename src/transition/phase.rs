//! Transition phases and phase-change records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four discrete states of a page transition.
///
/// A transition always walks `Idle → Covering → Covered → Revealing → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPhase {
    /// No transition in flight.
    #[default]
    Idle,
    /// The overlay is growing to obscure the viewport.
    Covering,
    /// The overlay fully covers the viewport; navigation has been issued.
    Covered,
    /// The new route is active and the overlay is animating away.
    Revealing,
}

impl TransitionPhase {
    /// All phases in sequence order.
    pub const ALL: [Self; 4] = [Self::Idle, Self::Covering, Self::Covered, Self::Revealing];

    /// Returns the phase that follows this one in a transition.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Covering,
            Self::Covering => Self::Covered,
            Self::Covered => Self::Revealing,
            Self::Revealing => Self::Idle,
        }
    }

    /// Returns `true` while a transition is in flight.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Lowercase name, used for logs, metric labels and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Covering => "covering",
            Self::Covered => "covered",
            Self::Revealing => "revealing",
        }
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A navigation request was accepted.
    Requested,
    /// The cover duration elapsed.
    CoverElapsed,
    /// The router path changed and a frame passed.
    RouteChanged,
    /// The overlay finished its exit animation.
    RevealFinished,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::CoverElapsed => "cover_elapsed",
            Self::RouteChanged => "route_changed",
            Self::RevealFinished => "reveal_finished",
        };
        f.write_str(s)
    }
}

/// Record of a single phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    /// Phase we left
    pub from: TransitionPhase,
    /// Phase we entered
    pub to: TransitionPhase,
    /// Why the change happened
    pub cause: TransitionCause,
}

impl PhaseTransition {
    pub(crate) const fn new(from: TransitionPhase, to: TransitionPhase, cause: TransitionCause) -> Self {
        Self { from, to, cause }
    }
}

/// Why a navigation request was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Another transition is already in flight.
    InFlight,
    /// The destination is the current path.
    SamePath,
}

impl RejectReason {
    /// Label used for metrics and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InFlight => "in_flight",
            Self::SamePath => "same_path",
        }
    }
}
