//! Structured event stream for `pageshift`.
//!
//! Discrete, typed events emitted while a session runs. Events are
//! serialized as newline-delimited JSON (JSONL) with a monotonically
//! increasing sequence number, so a consumer can rebuild the exact phase
//! timeline of every transition.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::route::RoutePath;
use crate::transition::{TransitionCause, TransitionPhase};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a navigation session.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A session has been composed and is about to run.
    SessionStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
        /// Unique session identifier.
        session_id: String,
        /// Configured site name.
        site_name: String,
        /// Router path at startup.
        start_path: RoutePath,
    },

    /// The session has finished.
    SessionStopped {
        /// When the session stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
    },

    /// A transition link was clicked.
    LinkClicked {
        /// When the click happened.
        timestamp: DateTime<Utc>,
        /// Raw `href` of the link.
        href: String,
        /// `"intercepted"` or the fall-through reason.
        decision: String,
    },

    /// The coordinator received a navigation request.
    TransitionRequested {
        /// When the request arrived.
        timestamp: DateTime<Utc>,
        /// Requested destination.
        destination: RoutePath,
        /// Whether a transition started.
        accepted: bool,
        /// Why the request was ignored, if it was.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The transition phase changed.
    PhaseChanged {
        /// When the change happened.
        timestamp: DateTime<Utc>,
        /// Phase left.
        from: TransitionPhase,
        /// Phase entered.
        to: TransitionPhase,
        /// What drove the change.
        cause: TransitionCause,
    },

    /// The coordinator asked the router to navigate.
    NavigationIssued {
        /// When navigate was called.
        timestamp: DateTime<Utc>,
        /// Navigation target.
        destination: RoutePath,
    },

    /// The router reported a new active path.
    PathChanged {
        /// When the change was observed.
        timestamp: DateTime<Utc>,
        /// Previously observed path.
        from: RoutePath,
        /// Newly active path.
        to: RoutePath,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped: a broken event sink must
/// never stall a transition.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
