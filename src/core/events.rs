// ─── Sync Events ───
// Typed progress stream shared by every long-running stage.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events emitted while a synchronization run is in flight.
///
/// `Completed`, `Failed` and `Cancelled` are terminal: the orchestrator emits
/// exactly one of them per run, always last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Progress {
        done: u64,
        total: u64,
        label: Option<String>,
    },
    Check {
        done: usize,
        total: usize,
        label: String,
    },
    Speed {
        bytes_per_sec: f64,
    },
    Estimated {
        seconds_remaining: f64,
    },
    Extract(String),
    Patch(String),
    /// Non-fatal failure (one file in a batch, one processor in lenient mode).
    Error(String),
    Completed,
    Failed(String),
    Cancelled(String),
}

impl SyncEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncEvent::Completed | SyncEvent::Failed(_) | SyncEvent::Cancelled(_)
        )
    }
}

/// Cheap, cloneable handle used by components to report events upward.
///
/// A detached emitter (no receiver) swallows everything, which is what the
/// components use when they run standalone.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    sender: Option<UnboundedSender<SyncEvent>>,
}

impl EventEmitter {
    pub fn channel() -> (Self, UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SyncEvent) {
        if let Some(sender) = &self.sender {
            // Receiver gone means nobody is listening anymore; not our problem.
            let _ = sender.send(event);
        }
    }

    pub fn progress(&self, done: u64, total: u64, label: Option<&str>) {
        self.emit(SyncEvent::Progress {
            done,
            total,
            label: label.map(str::to_owned),
        });
    }

    pub fn check(&self, done: usize, total: usize, label: &str) {
        self.emit(SyncEvent::Check {
            done,
            total,
            label: label.to_owned(),
        });
    }

    pub fn extract(&self, message: impl Into<String>) {
        self.emit(SyncEvent::Extract(message.into()));
    }

    pub fn patch(&self, text: impl Into<String>) {
        self.emit(SyncEvent::Patch(text.into()));
    }

    pub fn error(&self, detail: impl Into<String>) {
        self.emit(SyncEvent::Error(detail.into()));
    }
}
