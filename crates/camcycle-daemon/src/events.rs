//! Slideshow event bus — typed events from every task.
//!
//! The bus is a `tokio::sync::broadcast` channel carrying [`SlideshowEvent`]
//! values. The SSE endpoint and any future consumer subscribe independently;
//! emission with no subscribers is a no-op.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Every event the daemon emits. Serialized to JSON for the SSE stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SlideshowEvent {
    /// The daemon finished startup with an initial camera list.
    DaemonStarted {
        version: String,
        camera_count: usize,
    },
    /// A list re-acquisition succeeded and the working list was swapped.
    ListRefreshed {
        camera_count: usize,
        elapsed_ms: u64,
    },
    /// A list re-acquisition failed; the previous list stays in use.
    ListRefreshFailed { error: String },
    /// The slideshow moved to another camera (timer tick or manual).
    RotationAdvanced {
        id: String,
        index: usize,
        manual: bool,
    },
    /// Playback was paused or resumed.
    PlaybackChanged { playing: bool },
    /// A fresh snapshot for the current camera was stored.
    SnapshotUpdated {
        id: String,
        bytes: usize,
        elapsed_ms: u64,
    },
    /// One snapshot fetch attempt failed.
    SnapshotFailed {
        id: String,
        attempt: u32,
        error: String,
    },
    /// A camera was skipped after exhausting snapshot retries.
    CameraSkipped { id: String, attempts: u32 },
}

/// The central event bus for the daemon.
pub struct EventBus {
    sender: broadcast::Sender<SlideshowEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: SlideshowEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SlideshowEvent> {
        self.sender.subscribe()
    }
}
