//! Transition coordinator.
//!
//! The `TransitionCoordinator` turns navigation requests into the fixed
//! cover → navigate → reveal sequence. Two independent triggers feed it:
//! the cover timer it schedules itself, and path changes reported by the
//! router. The last edge is driven by the overlay reporting the end of its
//! exit animation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;
use crate::route::RoutePath;
use crate::router::Router;
use crate::viewport::Viewport;

use super::phase::{PhaseTransition, TransitionPhase};
use super::state::{PathObservation, TransitionSnapshot, TransitionState};

/// Time the overlay takes to cover the viewport before navigating.
pub const COVER_DURATION: Duration = Duration::from_millis(500);

/// One animation frame at 60 Hz; the delay between observing the new
/// route and starting the reveal.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Timing parameters of the transition sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTimings {
    /// Delay between `Covering` and `Covered` (and the navigate call)
    pub cover_duration: Duration,
    /// Delay between the route change and `Revealing`
    pub frame_interval: Duration,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            cover_duration: COVER_DURATION,
            frame_interval: FRAME_INTERVAL,
        }
    }
}

/// Serializes navigation requests into animated page transitions.
///
/// The coordinator is the only writer of transition state. Readers either
/// poll [`phase`](Self::phase), watch the current phase through
/// [`subscribe`](Self::subscribe), or receive every individual change
/// through [`subscribe_transitions`](Self::subscribe_transitions).
///
/// A router that never reports the new path leaves the coordinator in
/// [`TransitionPhase::Covered`] for good; there is no recovery timeout.
pub struct TransitionCoordinator {
    state: Mutex<TransitionState>,
    started_at: Mutex<Option<Instant>>,
    phase_tx: watch::Sender<TransitionPhase>,
    transition_tx: broadcast::Sender<PhaseTransition>,
    router: Arc<dyn Router>,
    viewport: Arc<dyn Viewport>,
    timings: TransitionTimings,
    events: Arc<EventEmitter>,
    cancel: CancellationToken,
}

impl TransitionCoordinator {
    /// Creates an idle coordinator anchored at the router's current path.
    #[must_use]
    pub fn new(router: Arc<dyn Router>, viewport: Arc<dyn Viewport>) -> Self {
        let initial = router.current_path();
        let (phase_tx, _) = watch::channel(TransitionPhase::Idle);
        let (transition_tx, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(TransitionState::new(initial)),
            started_at: Mutex::new(None),
            phase_tx,
            transition_tx,
            router,
            viewport,
            timings: TransitionTimings::default(),
            events: Arc::new(EventEmitter::noop()),
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the default timings.
    #[must_use]
    pub const fn with_timings(mut self, timings: TransitionTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Sends structured events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        self.lock().phase()
    }

    /// Returns a receiver that always holds the latest phase.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TransitionPhase> {
        self.phase_tx.subscribe()
    }

    /// Returns a receiver for every phase change, in order.
    #[must_use]
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<PhaseTransition> {
        self.transition_tx.subscribe()
    }

    /// Returns a copy of the full transition state.
    #[must_use]
    pub fn snapshot(&self) -> TransitionSnapshot {
        self.lock().snapshot()
    }

    /// Returns the configured timings.
    #[must_use]
    pub const fn timings(&self) -> TransitionTimings {
        self.timings
    }

    /// Returns the router's current path.
    #[must_use]
    pub fn current_path(&self) -> RoutePath {
        self.router.current_path()
    }

    /// Starts a transition to `destination`.
    ///
    /// Ignored without any signal when a transition is already in flight
    /// or `destination` is the router's current path. Otherwise the phase
    /// becomes `Covering` immediately and, after the cover duration, the
    /// viewport scrolls to the top, the phase becomes `Covered`, and the
    /// router is asked to navigate.
    pub fn start_transition(self: &Arc<Self>, destination: &RoutePath) {
        let current = self.router.current_path();
        let mut state = self.lock();

        match state.begin(destination, &current) {
            Err(reason) => {
                drop(state);
                debug!(
                    destination = %destination,
                    current = %current,
                    reason = reason.as_str(),
                    "transition request ignored"
                );
                metrics::record_transition_rejected(reason);
                self.events.emit(Event::TransitionRequested {
                    timestamp: Utc::now(),
                    destination: destination.clone(),
                    accepted: false,
                    reason: Some(reason.as_str().to_owned()),
                });
            }
            Ok(transition) => {
                info!(destination = %destination, from = %current, "transition started");
                metrics::record_transition_started();
                self.events.emit(Event::TransitionRequested {
                    timestamp: Utc::now(),
                    destination: destination.clone(),
                    accepted: true,
                    reason: None,
                });
                *self
                    .started_at
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
                self.publish(&state, transition);
                drop(state);
                self.schedule_cover();
            }
        }
    }

    /// Feeds a router-reported path into the state machine.
    ///
    /// Only a path that differs from the last one observed counts. While
    /// covered, such a change schedules the reveal one frame later; while
    /// still covering, it is remembered and the reveal follows the cover
    /// timer.
    pub fn on_path_changed(self: &Arc<Self>, path: &RoutePath) {
        let (previous, observation) = {
            let mut state = self.lock();
            let previous = state.previous_path().clone();
            (previous, state.observe_path(path))
        };

        match observation {
            PathObservation::Unchanged => return,
            PathObservation::Moved => {
                debug!(from = %previous, to = %path, "path changed outside a transition");
            }
            PathObservation::RevealDue => {
                debug!(from = %previous, to = %path, "route changed; reveal on next frame");
                self.schedule_reveal();
            }
            PathObservation::ArrivedEarly => {
                debug!(
                    from = %previous,
                    to = %path,
                    "route changed before cover finished; reveal deferred"
                );
            }
        }

        self.events.emit(Event::PathChanged {
            timestamp: Utc::now(),
            from: previous,
            to: path.clone(),
        });
    }

    /// Called by the overlay when its exit animation has finished.
    ///
    /// Moves `Revealing` to `Idle`; ignored in every other phase.
    pub fn on_reveal_animation_complete(&self) {
        let mut state = self.lock();
        let Some(transition) = state.reveal_finished() else {
            debug!(phase = %state.phase(), "reveal completion ignored");
            return;
        };

        let started = self
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(started) = started {
            metrics::record_transition_completed(started.elapsed());
        }
        self.publish(&state, transition);
    }

    /// Spawns the task that forwards router path changes to
    /// [`on_path_changed`](Self::on_path_changed).
    ///
    /// The task stops on [`shutdown`](Self::shutdown) or when the router's
    /// channel closes.
    pub fn attach(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.router.subscribe();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // The router may have moved between construction and attach.
            let path = rx.borrow_and_update().clone();
            this.on_path_changed(&path);

            loop {
                tokio::select! {
                    () = this.cancel.cancelled() => {
                        debug!("path watcher cancelled");
                        break;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() {
                            debug!("router closed; path watcher stopping");
                            break;
                        }
                        let path = rx.borrow_and_update().clone();
                        this.on_path_changed(&path);
                    }
                }
            }
        })
    }

    /// Stops the path watcher and any pending timers (application unmount).
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn schedule_cover(self: &Arc<Self>) {
        let deadline = Instant::now() + self.timings.cover_duration;
        trace!(delay = ?self.timings.cover_duration, "cover timer scheduled");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = this.cancel.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => this.finish_cover(),
            }
        });
    }

    fn finish_cover(self: &Arc<Self>) {
        let mut state = self.lock();
        let Some(cover) = state.cover_elapsed() else {
            return;
        };

        self.viewport.scroll_to_top();
        self.publish(&state, cover.transition);
        drop(state);

        info!(destination = %cover.destination, "navigating");
        self.events.emit(Event::NavigationIssued {
            timestamp: Utc::now(),
            destination: cover.destination.clone(),
        });
        self.router.navigate(&cover.destination);

        if cover.reveal_due {
            self.schedule_reveal();
        }
    }

    fn schedule_reveal(self: &Arc<Self>) {
        let deadline = Instant::now() + self.timings.frame_interval;
        trace!(delay = ?self.timings.frame_interval, "reveal frame scheduled");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = this.cancel.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => this.finish_frame(),
            }
        });
    }

    fn finish_frame(&self) {
        let mut state = self.lock();
        if let Some(transition) = state.frame_elapsed() {
            self.publish(&state, transition);
        }
    }

    /// Announces a phase change. Takes the state guard so that subscribers
    /// see changes in the order the state made them.
    fn publish(&self, _state: &MutexGuard<'_, TransitionState>, transition: PhaseTransition) {
        info!(
            from = %transition.from,
            to = %transition.to,
            cause = %transition.cause,
            "phase transition"
        );
        metrics::record_phase_change(transition.from, transition.to);
        self.events.emit(Event::PhaseChanged {
            timestamp: Utc::now(),
            from: transition.from,
            to: transition.to,
            cause: transition.cause,
        });
        self.phase_tx.send_replace(transition.to);
        let _ = self.transition_tx.send(transition);
    }

    fn lock(&self) -> MutexGuard<'_, TransitionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TransitionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionCoordinator")
            .field("state", &*self.lock())
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{CommitMode, MemoryRouter};
    use crate::transition::TransitionCause;
    use crate::viewport::MemoryViewport;

    fn path(s: &str) -> RoutePath {
        RoutePath::parse(s).unwrap()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn setup(mode: CommitMode) -> (Arc<TransitionCoordinator>, Arc<MemoryRouter>, Arc<MemoryViewport>) {
        let router = Arc::new(MemoryRouter::new(path("/")).with_mode(mode));
        let viewport = Arc::new(MemoryViewport::new());
        let coordinator = Arc::new(TransitionCoordinator::new(
            Arc::clone(&router) as Arc<dyn Router>,
            Arc::clone(&viewport) as Arc<dyn Viewport>,
        ));
        (coordinator, router, viewport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_not_before_cover_duration() {
        let (coordinator, router, viewport) = setup(CommitMode::Stalled);
        coordinator.start_transition(&path("/about"));
        assert_eq!(coordinator.phase(), TransitionPhase::Covering);

        settle().await;
        tokio::time::advance(Duration::from_millis(499)).await;
        settle().await;
        assert!(router.requests().is_empty());
        assert_eq!(viewport.resets(), 0);
        assert_eq!(coordinator.phase(), TransitionPhase::Covering);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(router.requests(), vec![path("/about")]);
        assert_eq!(viewport.resets(), 1);
        assert_eq!(coordinator.phase(), TransitionPhase::Covered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_waits_one_frame_after_path_change() {
        let (coordinator, router, _viewport) = setup(CommitMode::Stalled);
        let watcher = coordinator.attach();
        coordinator.start_transition(&path("/about"));
        settle().await;

        tokio::time::advance(COVER_DURATION).await;
        settle().await;
        assert_eq!(coordinator.phase(), TransitionPhase::Covered);

        router.commit(&path("/about"));
        settle().await;
        assert_eq!(coordinator.phase(), TransitionPhase::Covered);
        assert!(!coordinator.snapshot().is_navigating);

        tokio::time::advance(FRAME_INTERVAL).await;
        settle().await;
        assert_eq!(coordinator.phase(), TransitionPhase::Revealing);

        coordinator.shutdown();
        watcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_channel_reports_every_edge() {
        let (coordinator, _router, _viewport) = setup(CommitMode::Immediate);
        let mut transitions = coordinator.subscribe_transitions();
        let _watcher = coordinator.attach();
        settle().await;

        coordinator.start_transition(&path("/contact"));
        settle().await;
        tokio::time::advance(COVER_DURATION).await;
        settle().await;
        tokio::time::advance(FRAME_INTERVAL).await;
        settle().await;
        coordinator.on_reveal_animation_complete();

        let mut causes = Vec::new();
        while let Ok(t) = transitions.try_recv() {
            causes.push((t.from, t.to, t.cause));
        }
        assert_eq!(
            causes,
            vec![
                (TransitionPhase::Idle, TransitionPhase::Covering, TransitionCause::Requested),
                (TransitionPhase::Covering, TransitionPhase::Covered, TransitionCause::CoverElapsed),
                (TransitionPhase::Covered, TransitionPhase::Revealing, TransitionCause::RouteChanged),
                (TransitionPhase::Revealing, TransitionPhase::Idle, TransitionCause::RevealFinished),
            ]
        );
        coordinator.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_subscriber_sees_latest_phase() {
        let (coordinator, _router, _viewport) = setup(CommitMode::Stalled);
        let mut rx = coordinator.subscribe();
        assert_eq!(*rx.borrow(), TransitionPhase::Idle);

        coordinator.start_transition(&path("/about"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), TransitionPhase::Covering);

        let mut changed = tokio_test::task::spawn(rx.changed());
        tokio_test::assert_pending!(changed.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_complete_ignored_when_not_revealing() {
        let (coordinator, _router, _viewport) = setup(CommitMode::Stalled);
        coordinator.on_reveal_animation_complete();
        assert_eq!(coordinator.phase(), TransitionPhase::Idle);

        coordinator.start_transition(&path("/about"));
        coordinator.on_reveal_animation_complete();
        assert_eq!(coordinator.phase(), TransitionPhase::Covering);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_watcher() {
        let (coordinator, _router, _viewport) = setup(CommitMode::Immediate);
        let watcher = coordinator.attach();
        coordinator.shutdown();
        tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .expect("watcher should stop after shutdown")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timings() {
        let (coordinator, router, _viewport) = setup(CommitMode::Stalled);
        let coordinator = Arc::new(
            Arc::try_unwrap(coordinator)
                .unwrap()
                .with_timings(TransitionTimings {
                    cover_duration: Duration::from_millis(120),
                    frame_interval: Duration::from_millis(8),
                }),
        );
        coordinator.start_transition(&path("/projects"));
        settle().await;
        tokio::time::advance(Duration::from_millis(120)).await;
        settle().await;
        assert_eq!(router.requests(), vec![path("/projects")]);
    }

    #[test]
    fn test_debug_output() {
        let (coordinator, _router, _viewport) = setup(CommitMode::Immediate);
        let debug = format!("{coordinator:?}");
        assert!(debug.contains("TransitionCoordinator"));
        assert!(debug.contains("Idle"));
    }
}
