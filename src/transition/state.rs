//! Transition state and the guard functions that move it between phases.
//!
//! Every edge of the state machine is a method on [`TransitionState`] that
//! checks its guard, mutates the state, and reports what happened. The
//! methods do no I/O and never wait, so each edge can be exercised in
//! isolation; [`TransitionCoordinator`](super::TransitionCoordinator) owns
//! the timers and collaborators that decide when to call them.

use serde::Serialize;

use crate::route::RoutePath;

use super::phase::{PhaseTransition, RejectReason, TransitionCause, TransitionPhase};

/// Mutable state of the transition coordinator.
///
/// `phase == Idle` implies there is no pending destination and no
/// navigation in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionState {
    phase: TransitionPhase,
    /// Navigation target, cleared once the route actually changes
    pending_destination: Option<RoutePath>,
    /// True from cover start until the router path is seen to change
    is_navigating: bool,
    /// Last path reported by the router
    previous_path: RoutePath,
    /// The gating path change has been observed; reveal after a frame tick
    reveal_scheduled: bool,
}

/// Result of the cover timer firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverElapsed {
    /// The `Covering → Covered` change
    pub transition: PhaseTransition,
    /// Where the router must now navigate
    pub destination: RoutePath,
    /// The route already changed while covering; schedule the reveal now
    pub reveal_due: bool,
}

/// Result of comparing a router-reported path against the last one seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathObservation {
    /// Same path as before.
    Unchanged,
    /// Path changed but no transition was waiting on it.
    Moved,
    /// Path changed while covered; the reveal is due after one frame.
    RevealDue,
    /// Path changed before the cover finished; the reveal waits for the
    /// cover timer.
    ArrivedEarly,
}

/// Serializable copy of the coordinator's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionSnapshot {
    /// Current phase
    pub phase: TransitionPhase,
    /// Requested destination, if not yet reached
    pub pending_destination: Option<RoutePath>,
    /// Whether a navigation is awaiting its path change
    pub is_navigating: bool,
    /// Last observed router path
    pub previous_path: RoutePath,
}

impl TransitionState {
    /// Creates an idle state anchored at the router's initial path.
    #[must_use]
    pub const fn new(initial_path: RoutePath) -> Self {
        Self {
            phase: TransitionPhase::Idle,
            pending_destination: None,
            is_navigating: false,
            previous_path: initial_path,
            reveal_scheduled: false,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> TransitionPhase {
        self.phase
    }

    /// Returns the pending destination, if any.
    #[must_use]
    pub const fn pending_destination(&self) -> Option<&RoutePath> {
        self.pending_destination.as_ref()
    }

    /// Returns whether a navigation is awaiting its path change.
    #[must_use]
    pub const fn is_navigating(&self) -> bool {
        self.is_navigating
    }

    /// Returns the last path reported by the router.
    #[must_use]
    pub const fn previous_path(&self) -> &RoutePath {
        &self.previous_path
    }

    /// `Idle → Covering`.
    ///
    /// # Errors
    ///
    /// Returns the reason the request was ignored: a transition is already
    /// in flight, or `destination` equals `current_path`. The state is left
    /// untouched in both cases.
    pub fn begin(
        &mut self,
        destination: &RoutePath,
        current_path: &RoutePath,
    ) -> Result<PhaseTransition, RejectReason> {
        if self.phase != TransitionPhase::Idle {
            return Err(RejectReason::InFlight);
        }
        if destination == current_path {
            return Err(RejectReason::SamePath);
        }

        self.pending_destination = Some(destination.clone());
        self.is_navigating = true;
        self.reveal_scheduled = false;
        self.phase = TransitionPhase::Covering;

        Ok(PhaseTransition::new(
            TransitionPhase::Idle,
            TransitionPhase::Covering,
            TransitionCause::Requested,
        ))
    }

    /// `Covering → Covered`, once the cover duration has elapsed.
    ///
    /// Returns `None` when not covering or when no destination is pending.
    pub fn cover_elapsed(&mut self) -> Option<CoverElapsed> {
        if self.phase != TransitionPhase::Covering {
            return None;
        }
        let destination = self.pending_destination.clone()?;

        self.phase = TransitionPhase::Covered;
        if self.reveal_scheduled {
            // The route already moved; nothing is left to wait for.
            self.pending_destination = None;
        }

        Some(CoverElapsed {
            transition: PhaseTransition::new(
                TransitionPhase::Covering,
                TransitionPhase::Covered,
                TransitionCause::CoverElapsed,
            ),
            destination,
            reveal_due: self.reveal_scheduled,
        })
    }

    /// Records a router-reported path and decides whether it gates a reveal.
    pub fn observe_path(&mut self, path: &RoutePath) -> PathObservation {
        if *path == self.previous_path {
            return PathObservation::Unchanged;
        }
        self.previous_path = path.clone();

        if !self.is_navigating {
            return PathObservation::Moved;
        }

        self.is_navigating = false;
        self.reveal_scheduled = true;
        match self.phase {
            TransitionPhase::Covered => {
                self.pending_destination = None;
                PathObservation::RevealDue
            }
            // is_navigating is only set while covering or covered
            _ => PathObservation::ArrivedEarly,
        }
    }

    /// `Covered → Revealing`, one frame after the gating path change.
    ///
    /// Returns `None` unless covered with a reveal scheduled.
    pub fn frame_elapsed(&mut self) -> Option<PhaseTransition> {
        if self.phase != TransitionPhase::Covered || !self.reveal_scheduled {
            return None;
        }
        self.reveal_scheduled = false;
        self.phase = TransitionPhase::Revealing;
        Some(PhaseTransition::new(
            TransitionPhase::Covered,
            TransitionPhase::Revealing,
            TransitionCause::RouteChanged,
        ))
    }

    /// `Revealing → Idle`, when the overlay reports its exit animation done.
    ///
    /// Returns `None` in any other phase.
    pub fn reveal_finished(&mut self) -> Option<PhaseTransition> {
        if self.phase != TransitionPhase::Revealing {
            return None;
        }
        self.phase = TransitionPhase::Idle;
        self.pending_destination = None;
        self.is_navigating = false;
        Some(PhaseTransition::new(
            TransitionPhase::Revealing,
            TransitionPhase::Idle,
            TransitionCause::RevealFinished,
        ))
    }

    /// Returns a serializable copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> TransitionSnapshot {
        TransitionSnapshot {
            phase: self.phase,
            pending_destination: self.pending_destination.clone(),
            is_navigating: self.is_navigating,
            previous_path: self.previous_path.clone(),
        }
    }
}
