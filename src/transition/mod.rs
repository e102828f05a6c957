//! Page-transition coordination.
//!
//! Intercepted navigations run through a fixed four-phase sequence:
//!
//! ```text
//! Idle --start_transition--> Covering --cover elapsed--> Covered
//!      <--reveal finished-- Revealing <--route changed + 1 frame--
//! ```
//!
//! # Architecture
//!
//! - [`TransitionState`] - plain state plus one guard method per edge
//! - [`TransitionCoordinator`] - timers, router/viewport collaborators,
//!   phase broadcast
//! - [`TransitionPhase`] / [`PhaseTransition`] - phase values and change records

pub mod coordinator;
pub mod phase;
pub mod state;

pub use coordinator::{COVER_DURATION, FRAME_INTERVAL, TransitionCoordinator, TransitionTimings};
pub use phase::{PhaseTransition, RejectReason, TransitionCause, TransitionPhase};
pub use state::{CoverElapsed, PathObservation, TransitionSnapshot, TransitionState};
