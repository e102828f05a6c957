//! Shared integration-test harness: an in-memory coordinator wired to a
//! memory router and viewport, plus helpers for running the binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Output;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use pageshift::route::RoutePath;
use pageshift::router::{CommitMode, MemoryRouter, Router};
use pageshift::transition::{PhaseTransition, TransitionCoordinator, TransitionPhase};
use pageshift::viewport::{MemoryViewport, Viewport};

pub fn path(s: &str) -> RoutePath {
    RoutePath::parse(s).expect("valid test path")
}

/// Lets spawned tasks run without moving the paused clock.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Advances the paused clock, letting timers fire on the way.
pub async fn advance_ms(ms: u64) {
    settle().await;
    tokio::time::advance(std::time::Duration::from_millis(ms)).await;
    settle().await;
}

/// Coordinator plus the fakes it talks to.
pub struct Harness {
    pub coordinator: Arc<TransitionCoordinator>,
    pub router: Arc<MemoryRouter>,
    pub viewport: Arc<MemoryViewport>,
    transitions: broadcast::Receiver<PhaseTransition>,
    watcher: JoinHandle<()>,
}

impl Harness {
    /// Must be called inside a tokio runtime; spawns the path watcher.
    pub fn new(start: &str, mode: CommitMode) -> Self {
        let router = Arc::new(MemoryRouter::new(path(start)).with_mode(mode));
        let viewport = Arc::new(MemoryViewport::new());
        let coordinator = Arc::new(TransitionCoordinator::new(
            Arc::clone(&router) as Arc<dyn Router>,
            Arc::clone(&viewport) as Arc<dyn Viewport>,
        ));
        let transitions = coordinator.subscribe_transitions();
        let watcher = coordinator.attach();
        Self {
            coordinator,
            router,
            viewport,
            transitions,
            watcher,
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.coordinator.phase()
    }

    /// Phases entered since the last call, in order.
    pub fn entered(&mut self) -> Vec<TransitionPhase> {
        let mut out = Vec::new();
        while let Ok(t) = self.transitions.try_recv() {
            out.push(t.to);
        }
        out
    }

    pub async fn shutdown(self) {
        self.coordinator.shutdown();
        self.watcher.await.expect("watcher panicked");
    }
}

// ----------------------------------------------------------------------------
// Binary helpers
// ----------------------------------------------------------------------------

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs `pageshift` with `args` and waits for it to exit.
pub fn run_pageshift(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_pageshift"))
        .args(args)
        .env_remove("PAGESHIFT_CONFIG")
        .env_remove("PAGESHIFT_EVENTS")
        .env_remove("PAGESHIFT_LOG_LEVEL")
        .env("PAGESHIFT_COLOR", "never")
        .output()
        .expect("failed to run pageshift")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
