//! Navigation sessions.
//!
//! A [`Session`] is the composition root: it builds the router, viewport,
//! coordinator, overlay, nav bar and landing gate from a [`SiteConfig`],
//! plays a scripted scenario against them and summarizes what happened.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::schema::{Modifier, NEVER, RouterMode, SiteConfig, Step};
use crate::config::validation::parse_duration;
use crate::error::{ConfigError, PageshiftError, Result};
use crate::link::{ClickEvent, ClickModifiers, TransitionLink};
use crate::nav::{NavAction, NavBar};
use crate::observability::events::{Event, EventEmitter};
use crate::overlay::Overlay;
use crate::route::RoutePath;
use crate::router::{CommitMode, MemoryRouter, Router};
use crate::site::{GatePhase, SiteGate, hyperspace_duration};
use crate::transition::{
    PhaseTransition, TransitionCause, TransitionCoordinator, TransitionPhase, TransitionTimings,
};
use crate::viewport::{MemoryViewport, Viewport};

// ============================================================================
// Summary
// ============================================================================

/// One phase change, timed from session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
    /// Phase left
    pub from: TransitionPhase,
    /// Phase entered
    pub to: TransitionPhase,
    /// What drove the change
    pub cause: TransitionCause,
}

/// One scripted click and what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickRecord {
    /// Index of the scenario step
    pub step: usize,
    /// Clicked `href` (or `#section` for home-page scrolls)
    pub href: String,
    /// `"intercepted"`, a fall-through reason, `"scrolled"` or `"not_mounted"`
    pub outcome: String,
}

impl ClickRecord {
    /// Whether the click started a transition.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.outcome == "intercepted"
    }
}

/// What a session did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Session identifier
    pub session_id: String,
    /// Site name
    pub site: String,
    /// Scenario steps executed
    pub steps: usize,
    /// Every phase change in order
    pub timeline: Vec<TimelineEntry>,
    /// Paths passed to `navigate`, in order
    pub navigations: Vec<RoutePath>,
    /// Paths the router has been at, starting with the start path
    pub history: Vec<RoutePath>,
    /// Times the viewport was scrolled to the top
    pub scroll_resets: u64,
    /// Every scripted click
    pub clicks: Vec<ClickRecord>,
    /// Clicks that started a transition
    pub accepted_clicks: usize,
    /// Clicks that did not
    pub rejected_clicks: usize,
    /// Phase at the end of the run
    pub final_phase: TransitionPhase,
    /// Router path at the end of the run
    pub final_path: RoutePath,
    /// Landing gate at the end of the run
    pub gate: GatePhase,
    /// Whether the nav menu was left open
    pub menu_open: bool,
    /// Wall-clock length of the run in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Completed transitions (`Revealing → Idle` edges).
    #[must_use]
    pub fn completed_transitions(&self) -> usize {
        self.timeline
            .iter()
            .filter(|e| e.to == TransitionPhase::Idle)
            .count()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Object graph for one visitor.
pub struct Session {
    id: String,
    config: Arc<SiteConfig>,
    router: Arc<MemoryRouter>,
    viewport: Arc<MemoryViewport>,
    coordinator: Arc<TransitionCoordinator>,
    overlay: Arc<Overlay>,
    reveal_duration: Option<Duration>,
    nav: NavBar,
    gate: SiteGate,
    events: Arc<EventEmitter>,
    clicks: Vec<ClickRecord>,
}

impl Session {
    /// Builds a session from a validated site configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a route or duration in the configuration cannot
    /// be parsed.
    pub fn new(config: Arc<SiteConfig>, events: Arc<EventEmitter>) -> Result<Self> {
        let start = RoutePath::parse(&config.site.start_path)?;
        let routes = config
            .site
            .routes
            .iter()
            .map(|r| RoutePath::parse(r))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mode = match config.router.mode {
            RouterMode::Immediate => CommitMode::Immediate,
            RouterMode::Stalled => CommitMode::Stalled,
            RouterMode::Delayed => {
                let latency = config.router.latency.as_deref().unwrap_or_default();
                CommitMode::Delayed(duration_field("router.latency", latency)?)
            }
        };
        let mut router = MemoryRouter::new(start.clone()).with_mode(mode);
        if !routes.is_empty() {
            router = router.with_routes(routes);
        }
        let router = Arc::new(router);
        let viewport = Arc::new(MemoryViewport::new());

        let mut timings = TransitionTimings::default();
        if let Some(raw) = &config.transition.cover_duration {
            timings.cover_duration = duration_field("transition.cover_duration", raw)?;
        }
        if let Some(raw) = &config.transition.frame_interval {
            timings.frame_interval = duration_field("transition.frame_interval", raw)?;
        }
        let reveal_duration = match config.transition.reveal_duration.as_deref().map(str::trim) {
            None => Some(timings.cover_duration),
            Some(NEVER) => None,
            Some(raw) => Some(duration_field("transition.reveal_duration", raw)?),
        };

        let coordinator = Arc::new(
            TransitionCoordinator::new(
                Arc::clone(&router) as Arc<dyn Router>,
                Arc::clone(&viewport) as Arc<dyn Viewport>,
            )
            .with_timings(timings)
            .with_events(Arc::clone(&events)),
        );
        let overlay = Arc::new(Overlay::new(
            Arc::clone(&coordinator),
            timings.cover_duration,
        ));

        let nav = NavBar::new(config.nav_links(), config.site.origin.as_deref(), start);
        let mut gate = SiteGate::new();
        if !config.landing.enabled {
            gate.enter();
            gate.complete();
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            config,
            router,
            viewport,
            coordinator,
            overlay,
            reveal_duration,
            nav,
            gate,
            events,
            clicks: Vec::new(),
        })
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<TransitionCoordinator> {
        &self.coordinator
    }

    /// The session's router.
    #[must_use]
    pub const fn router(&self) -> &Arc<MemoryRouter> {
        &self.router
    }

    /// The session's viewport.
    #[must_use]
    pub const fn viewport(&self) -> &Arc<MemoryViewport> {
        &self.viewport
    }

    /// Runs the configured scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if a step carries an unparseable path or duration.
    pub async fn run(self) -> Result<RunSummary> {
        let steps = self.config.scenario.clone();
        self.run_steps(&steps).await
    }

    /// Runs `steps` and tears the session down.
    ///
    /// # Errors
    ///
    /// Returns an error if a step carries an unparseable path or duration.
    /// The session is shut down either way.
    pub async fn run_steps(mut self, steps: &[Step]) -> Result<RunSummary> {
        let span = info_span!("session", id = %self.id, site = %self.config.site.name);
        async move {
            let started = Instant::now();
            self.events.emit(Event::SessionStarted {
                timestamp: Utc::now(),
                session_id: self.id.clone(),
                site_name: self.config.site.name.clone(),
                start_path: self.router.current_path(),
            });

            let cancel = CancellationToken::new();
            let timeline = Arc::new(Mutex::new(Vec::new()));
            let recorder = spawn_recorder(
                &self.coordinator,
                started,
                Arc::clone(&timeline),
                cancel.clone(),
            );
            let watcher = self.coordinator.attach();
            let driver = self.overlay.spawn_driver(self.reveal_duration, cancel.clone());
            info!(steps = steps.len(), "session started");

            let mut outcome = Ok(());
            for (index, step) in steps.iter().enumerate() {
                self.sync_nav();
                if let Err(e) = self.step(index, step).await {
                    warn!(step = index, action = step.action(), error = %e, "step failed");
                    outcome = Err(e);
                    break;
                }
                tokio::task::yield_now().await;
            }
            self.sync_nav();

            self.coordinator.shutdown();
            cancel.cancel();
            let _ = watcher.await;
            let _ = driver.await;
            let _ = recorder.await;

            let reason = match &outcome {
                Ok(()) => "scenario complete".to_string(),
                Err(e) => format!("step failed: {e}"),
            };
            self.events.emit(Event::SessionStopped {
                timestamp: Utc::now(),
                reason,
            });
            outcome?;

            let timeline = std::mem::take(
                &mut *timeline.lock().unwrap_or_else(PoisonError::into_inner),
            );
            let summary = self.summarize(steps.len(), timeline, started);
            info!(
                transitions = summary.completed_transitions(),
                final_phase = %summary.final_phase,
                final_path = %summary.final_path,
                "session finished"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    async fn step(&mut self, index: usize, step: &Step) -> Result<()> {
        debug!(step = index, action = step.action(), phase = %self.coordinator.phase(), "step");
        match step {
            Step::Enter => {
                if self.gate.enter() {
                    let delay = hyperspace_duration(self.coordinator.timings().frame_interval);
                    debug!(?delay, "hyperspace");
                    tokio::time::sleep(delay).await;
                    self.gate.complete();
                    info!("site entered");
                } else {
                    debug!(gate = %self.gate.phase(), "enter ignored");
                }
            }
            Step::Click { href, modifiers } => {
                let outcome = if self.gate.has_entered() {
                    let link =
                        TransitionLink::with_origin(href.clone(), self.config.site.origin.as_deref());
                    let mut event = ClickEvent::with_modifiers(click_modifiers(modifiers));
                    link.handle_click(&mut event, &self.coordinator).label().to_string()
                } else {
                    warn!(href = %href, "click before the site was entered");
                    "not_mounted".to_string()
                };
                self.record_click(index, href.clone(), outcome);
            }
            Step::Nav { section } => {
                if !self.gate.has_entered() {
                    warn!(section = %section, "nav click before the site was entered");
                    self.record_click(index, format!("#{section}"), "not_mounted".to_string());
                    return Ok(());
                }
                let mut event = ClickEvent::plain();
                match self.nav.click(section, &mut event, &self.coordinator) {
                    Some(NavAction::ScrollToSection(id)) => {
                        self.record_click(index, format!("#{id}"), "scrolled".to_string());
                    }
                    Some(NavAction::Link(decision)) => {
                        let href = self
                            .nav
                            .links()
                            .find(|l| l.section == *section)
                            .map_or_else(|| section.clone(), |l| l.href.clone());
                        self.record_click(index, href, decision.label().to_string());
                    }
                    None => {
                        return Err(PageshiftError::Usage(format!(
                            "scenario[{index}]: unknown nav section '{section}'"
                        )));
                    }
                }
            }
            Step::ToggleMenu => {
                self.nav.toggle_menu();
                debug!(open = self.nav.is_menu_open(), "menu toggled");
            }
            Step::Wait { duration } => {
                let delay = duration_field(&format!("scenario[{index}].duration"), duration)?;
                tokio::time::sleep(delay).await;
            }
            Step::Commit { path } => {
                let path = RoutePath::parse(path)?;
                if !self.router.commit(&path) {
                    debug!(path = %path, "commit to current path ignored");
                }
            }
            Step::RevealDone => {
                if !self.overlay.animation_end() {
                    debug!(phase = %self.coordinator.phase(), "reveal_done outside reveal");
                }
            }
            Step::Scroll { y } => {
                self.viewport.scroll_to(*y);
            }
        }
        Ok(())
    }

    fn record_click(&mut self, step: usize, href: String, outcome: String) {
        self.events.emit(Event::LinkClicked {
            timestamp: Utc::now(),
            href: href.clone(),
            decision: outcome.clone(),
        });
        self.clicks.push(ClickRecord {
            step,
            href,
            outcome,
        });
    }

    /// Feeds router and viewport state into the nav bar.
    fn sync_nav(&mut self) {
        self.nav.on_path_changed(&self.router.current_path());
        self.nav.on_scroll(self.viewport.scroll_y());
    }

    fn summarize(
        &self,
        steps: usize,
        timeline: Vec<TimelineEntry>,
        started: Instant,
    ) -> RunSummary {
        let accepted_clicks = self.clicks.iter().filter(|c| c.accepted()).count();
        RunSummary {
            session_id: self.id.clone(),
            site: self.config.site.name.clone(),
            steps,
            timeline,
            navigations: self.router.requests(),
            history: self.router.history(),
            scroll_resets: self.viewport.resets(),
            accepted_clicks,
            rejected_clicks: self.clicks.len() - accepted_clicks,
            clicks: self.clicks.clone(),
            final_phase: self.coordinator.phase(),
            final_path: self.router.current_path(),
            gate: self.gate.phase(),
            menu_open: self.nav.is_menu_open(),
            duration_ms: millis(started.elapsed()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("site", &self.config.site.name)
            .field("coordinator", &self.coordinator)
            .field("gate", &self.gate.phase())
            .finish_non_exhaustive()
    }
}

/// Records every phase change with its time since `started`.
fn spawn_recorder(
    coordinator: &TransitionCoordinator,
    started: Instant,
    timeline: Arc<Mutex<Vec<TimelineEntry>>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = coordinator.subscribe_transitions();
    tokio::spawn(async move {
        let push = |t: PhaseTransition| {
            timeline
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(TimelineEntry {
                    elapsed_ms: millis(started.elapsed()),
                    from: t.from,
                    to: t.to,
                    cause: t.cause,
                });
        };
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Ok(t) => push(t),
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "timeline recorder lagged"),
                    Err(RecvError::Closed) => break,
                },
                () = cancel.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(t) => push(t),
                            Err(TryRecvError::Lagged(_)) => {}
                            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                        }
                    }
                    break;
                }
            }
        }
    })
}

fn click_modifiers(modifiers: &[Modifier]) -> ClickModifiers {
    let mut out = ClickModifiers::default();
    for m in modifiers {
        match m {
            Modifier::Meta => out.meta = true,
            Modifier::Ctrl => out.ctrl = true,
            Modifier::Shift => out.shift = true,
            Modifier::Alt => out.alt = true,
        }
    }
    out
}

fn duration_field(field: &str, raw: &str) -> Result<Duration> {
    parse_duration(raw).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            expected: "a duration such as '16ms' or '2s'".to_string(),
        }
        .into()
    })
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(yaml: &str) -> Session {
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        Session::new(Arc::new(config), Arc::new(EventEmitter::noop())).unwrap()
    }

    const SITE: &str = r"
site:
  name: portfolio
  routes: [/, /about, /projects, /contact]
landing:
  enabled: false
";

    #[tokio::test(start_paused = true)]
    async fn test_full_transition_timeline() {
        let yaml = format!(
            "{SITE}scenario:
  - action: click
    href: /about
  - action: wait
    duration: 2s
"
        );
        let summary = session(&yaml).run().await.unwrap();

        assert_eq!(summary.navigations, vec![RoutePath::parse("/about").unwrap()]);
        assert_eq!(summary.scroll_resets, 1);
        assert_eq!(summary.accepted_clicks, 1);
        assert_eq!(summary.final_phase, TransitionPhase::Idle);
        assert_eq!(summary.final_path.as_str(), "/about");
        assert_eq!(summary.completed_transitions(), 1);

        let times: Vec<_> = summary.timeline.iter().map(|e| (e.to, e.elapsed_ms)).collect();
        assert_eq!(
            times,
            vec![
                (TransitionPhase::Covering, 0),
                (TransitionPhase::Covered, 500),
                (TransitionPhase::Revealing, 516),
                (TransitionPhase::Idle, 1016),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_during_transition_rejected() {
        let yaml = format!(
            "{SITE}scenario:
  - action: click
    href: /about
  - action: wait
    duration: 100ms
  - action: click
    href: /contact
  - action: wait
    duration: 2s
"
        );
        let summary = session(&yaml).run().await.unwrap();
        assert_eq!(summary.accepted_clicks, 1);
        assert_eq!(summary.rejected_clicks, 1);
        assert_eq!(summary.clicks[1].outcome, "transitioning");
        assert_eq!(summary.navigations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_landing_gates_clicks() {
        let yaml = r"
site:
  name: portfolio
scenario:
  - action: click
    href: /about
  - action: enter
  - action: click
    href: /about
  - action: wait
    duration: 2s
";
        let summary = session(yaml).run().await.unwrap();
        assert_eq!(summary.clicks[0].outcome, "not_mounted");
        assert_eq!(summary.clicks[1].outcome, "intercepted");
        assert_eq!(summary.gate, GatePhase::Entered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_router_stays_covered() {
        let yaml = format!(
            "{SITE}router:
  mode: stalled
scenario:
  - action: click
    href: /projects
  - action: wait
    duration: 10s
"
        );
        let summary = session(&yaml).run().await.unwrap();
        assert_eq!(summary.final_phase, TransitionPhase::Covered);
        assert_eq!(summary.final_path.as_str(), "/");
        assert_eq!(summary.navigations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_never_finishes_until_reveal_done() {
        let yaml = format!(
            "{SITE}transition:
  reveal_duration: never
scenario:
  - action: click
    href: /contact
  - action: wait
    duration: 5s
  - action: reveal_done
"
        );
        let summary = session(&yaml).run().await.unwrap();
        let last = summary.timeline.last().unwrap();
        assert_eq!(last.to, TransitionPhase::Idle);
        assert_eq!(last.elapsed_ms, 5000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_nav_scrolls_and_menu_closes_on_route_change() {
        let yaml = format!(
            "{SITE}scenario:
  - action: toggle_menu
  - action: nav
    section: projects
  - action: toggle_menu
  - action: commit
    path: /about
  - action: wait
    duration: 10ms
"
        );
        let summary = session(&yaml).run().await.unwrap();
        assert_eq!(summary.clicks[0].outcome, "scrolled");
        assert_eq!(summary.clicks[0].href, "#projects");
        assert!(!summary.menu_open);
        assert!(summary.timeline.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_commit_path_fails() {
        let yaml = format!("{SITE}scenario:\n  - action: commit\n    path: about\n");
        let result = session(&yaml).run().await;
        assert!(matches!(result, Err(PageshiftError::Route(_))));
    }

    #[test]
    fn test_click_modifiers() {
        let m = click_modifiers(&[Modifier::Ctrl, Modifier::Alt]);
        assert!(m.ctrl && m.alt && !m.meta && !m.shift);
    }
}
