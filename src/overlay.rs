//! Transition overlay.
//!
//! The overlay is the full-viewport panel that slides in to hide the old
//! page and slides out to show the new one. Painting it belongs to the UI
//! layer; this module describes what it should look like in each phase and
//! relays the end of its exit animation back to the coordinator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transition::{TransitionCoordinator, TransitionPhase};

/// Overlay fill color.
pub const OVERLAY_COLOR: &str = "#1a0a2e";

/// Easing shared by the cover and reveal animations.
pub const OVERLAY_EASING: &str = "cubic-bezier(0.76, 0, 0.24, 1)";

/// Stacking order above the navigation bar and page content.
pub const OVERLAY_Z_INDEX: u16 = 200;

const CLIP_HIDDEN_LEFT: &str = "polygon(0 0, 0 0, 0 100%, 0 100%)";
const CLIP_FULL: &str = "polygon(0 0, 100% 0, 100% 100%, 0 100%)";
const CLIP_EXIT_RIGHT: &str = "polygon(100% 0, 100% 0, 100% 100%, 100% 100%)";

/// Keyframe sets used by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Keyframes {
    /// Hidden-left to full.
    #[serde(rename = "coverScreen")]
    CoverScreen,
    /// Full to exited-right.
    #[serde(rename = "revealScreen")]
    RevealScreen,
}

impl Keyframes {
    /// CSS keyframes name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CoverScreen => "coverScreen",
            Self::RevealScreen => "revealScreen",
        }
    }
}

/// A running overlay animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayAnimation {
    /// Keyframes to play
    pub keyframes: Keyframes,
    /// Animation length
    pub duration: Duration,
}

impl fmt::Display for OverlayAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}ms {} forwards",
            self.keyframes.name(),
            self.duration.as_millis(),
            OVERLAY_EASING
        )
    }
}

/// How the overlay should be drawn in a given phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayStyle {
    /// Fill color
    pub background: &'static str,
    /// Clip polygon at the start of the phase
    pub clip_from: &'static str,
    /// Clip polygon the phase ends on
    pub clip_to: &'static str,
    /// Animation between the two, if any
    pub animation: Option<OverlayAnimation>,
}

impl OverlayStyle {
    /// Returns the overlay style for `phase`, or `None` when the overlay
    /// is not mounted (`Idle`).
    #[must_use]
    pub const fn for_phase(phase: TransitionPhase, duration: Duration) -> Option<Self> {
        let (clip_from, clip_to, animation) = match phase {
            TransitionPhase::Idle => return None,
            TransitionPhase::Covering => (
                CLIP_HIDDEN_LEFT,
                CLIP_FULL,
                Some(OverlayAnimation {
                    keyframes: Keyframes::CoverScreen,
                    duration,
                }),
            ),
            TransitionPhase::Covered => (CLIP_FULL, CLIP_FULL, None),
            TransitionPhase::Revealing => (
                CLIP_FULL,
                CLIP_EXIT_RIGHT,
                Some(OverlayAnimation {
                    keyframes: Keyframes::RevealScreen,
                    duration,
                }),
            ),
        };
        Some(Self {
            background: OVERLAY_COLOR,
            clip_from,
            clip_to,
            animation,
        })
    }
}

/// Overlay bound to a coordinator.
#[derive(Debug)]
pub struct Overlay {
    coordinator: Arc<TransitionCoordinator>,
    duration: Duration,
}

impl Overlay {
    /// Creates an overlay whose animations last `duration`.
    #[must_use]
    pub const fn new(coordinator: Arc<TransitionCoordinator>, duration: Duration) -> Self {
        Self {
            coordinator,
            duration,
        }
    }

    /// Style for the coordinator's current phase.
    #[must_use]
    pub fn style(&self) -> Option<OverlayStyle> {
        OverlayStyle::for_phase(self.coordinator.phase(), self.duration)
    }

    /// Animation-end callback from the UI layer.
    ///
    /// Only the end of the reveal animation matters; the end of the cover
    /// animation is ignored because the coordinator times that edge
    /// itself. Returns `true` if the completion was forwarded.
    pub fn animation_end(&self) -> bool {
        if self.coordinator.phase() != TransitionPhase::Revealing {
            return false;
        }
        self.coordinator.on_reveal_animation_complete();
        true
    }

    /// Spawns a task that plays the reveal animation for headless runs:
    /// each time the phase becomes `Revealing`, it waits `reveal_duration`
    /// and reports completion. With `None` the animation never finishes.
    pub fn spawn_driver(
        self: &Arc<Self>,
        reveal_duration: Option<Duration>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let overlay = Arc::clone(self);
        let mut rx = self.coordinator.subscribe();
        tokio::spawn(async move {
            // Pending end of the current reveal; dropped when the phase moves on
            let mut deadline: Option<Instant> = None;
            loop {
                let pending = deadline;
                let timer = async move {
                    match pending {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                };
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = timer => {
                        deadline = None;
                        overlay.animation_end();
                    }
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let phase = *rx.borrow_and_update();
                        deadline = match (phase, reveal_duration) {
                            (TransitionPhase::Revealing, Some(duration)) => {
                                Some(Instant::now() + duration)
                            }
                            (TransitionPhase::Revealing, None) => {
                                debug!("reveal animation never completes");
                                None
                            }
                            _ => None,
                        };
                    }
                }
            }
        })
    }
}
