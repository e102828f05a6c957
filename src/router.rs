//! Router collaborator.
//!
//! The coordinator never maps paths to pages itself. It asks a [`Router`]
//! for the current path, tells it where to go, and watches for the path to
//! change. [`MemoryRouter`] is the in-process implementation used by
//! sessions and tests.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::route::RoutePath;

/// Client-side router as seen by the transition coordinator.
pub trait Router: Send + Sync {
    /// Returns the currently active path.
    fn current_path(&self) -> RoutePath;

    /// Requests programmatic navigation. Completion is only observable
    /// through [`subscribe`](Self::subscribe).
    fn navigate(&self, path: &RoutePath);

    /// Returns a receiver notified whenever the active path changes.
    fn subscribe(&self) -> watch::Receiver<RoutePath>;
}

/// How a [`MemoryRouter`] completes navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// The path changes inside `navigate`.
    #[default]
    Immediate,
    /// The path changes after the given delay.
    Delayed(Duration),
    /// Navigations never complete.
    Stalled,
}

struct Shared {
    current: watch::Sender<RoutePath>,
    history: Mutex<Vec<RoutePath>>,
}

impl Shared {
    fn commit(&self, path: &RoutePath) -> bool {
        let changed = self.current.send_if_modified(|current| {
            if current == path {
                false
            } else {
                *current = path.clone();
                true
            }
        });
        if changed {
            self.history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(path.clone());
        }
        changed
    }
}

/// In-memory router with configurable commit behavior.
///
/// When a route table is set, navigating to an unknown path is dropped
/// with a warning, the same way a broken link leaves a real router where
/// it was.
pub struct MemoryRouter {
    shared: Arc<Shared>,
    mode: CommitMode,
    routes: Option<BTreeSet<RoutePath>>,
    requests: Mutex<Vec<RoutePath>>,
}

impl MemoryRouter {
    /// Creates a router at `initial` that commits immediately.
    #[must_use]
    pub fn new(initial: RoutePath) -> Self {
        let (current, _) = watch::channel(initial.clone());
        Self {
            shared: Arc::new(Shared {
                current,
                history: Mutex::new(vec![initial]),
            }),
            mode: CommitMode::Immediate,
            routes: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sets how navigations complete.
    #[must_use]
    pub const fn with_mode(mut self, mode: CommitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Restricts navigation to the given routes.
    #[must_use]
    pub fn with_routes(mut self, routes: impl IntoIterator<Item = RoutePath>) -> Self {
        self.routes = Some(routes.into_iter().collect());
        self
    }

    /// Moves the router outside of any requested navigation (browser
    /// back/forward, address bar). Returns `true` if the path changed.
    pub fn commit(&self, path: &RoutePath) -> bool {
        self.shared.commit(path)
    }

    /// Every path passed to [`Router::navigate`], in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<RoutePath> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every path the router has been at, starting with the initial one.
    #[must_use]
    pub fn history(&self) -> Vec<RoutePath> {
        self.shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the commit mode.
    #[must_use]
    pub const fn mode(&self) -> CommitMode {
        self.mode
    }
}

impl Router for MemoryRouter {
    fn current_path(&self) -> RoutePath {
        self.shared.current.borrow().clone()
    }

    fn navigate(&self, path: &RoutePath) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());

        if let Some(routes) = &self.routes {
            if !routes.contains(path) {
                warn!(path = %path, "navigation to unknown route dropped");
                return;
            }
        }

        match self.mode {
            CommitMode::Immediate => {
                self.shared.commit(path);
            }
            CommitMode::Delayed(delay) => {
                let shared = Arc::clone(&self.shared);
                let path = path.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.commit(&path);
                });
            }
            CommitMode::Stalled => {
                debug!(path = %path, "router stalled; navigation will not complete");
            }
        }
    }

    fn subscribe(&self) -> watch::Receiver<RoutePath> {
        self.shared.current.subscribe()
    }
}

impl std::fmt::Debug for MemoryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRouter")
            .field("current_path", &self.current_path())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
