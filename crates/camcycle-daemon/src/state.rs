//! Shared daemon state passed to tasks and the REST layer.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;

use camcycle::acquire::FeedAcquirer;
use camcycle::types::CameraList;

use crate::config::Config;
use crate::events::EventBus;
use crate::rotation::Slideshow;
use crate::snapshot::{Snapshot, SnapshotFetcher};

/// Buffered events before a slow SSE subscriber starts lagging.
const EVENT_BUS_CAPACITY: usize = 256;

/// Everything the periodic tasks and REST handlers share.
///
/// RwLocks allow concurrent reads (status, SSE, image serving) while
/// serializing writes (rotation, list swap, snapshot store). All access
/// happens on the single cooperative runtime.
pub struct SharedState {
    pub config: Config,
    pub slideshow: RwLock<Slideshow>,
    /// Latest image for the camera on screen; `None` until first capture.
    pub snapshot: RwLock<Option<Snapshot>>,
    pub events: EventBus,
    pub acquirer: FeedAcquirer,
    pub fetcher: SnapshotFetcher,
    pub started_at: Instant,
    /// When the working list was last swapped for a fresh one.
    pub last_refresh: RwLock<Option<DateTime<Utc>>>,
    /// Signals all periodic tasks to stop.
    pub shutdown: Notify,
    /// Single-writer rule: at most one list refresh in flight.
    pub(crate) refresh_guard: Mutex<()>,
    pub(crate) rotation_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) snapshot_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) list_refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SharedState {
    /// Assemble shared state around an initial, non-empty camera list.
    pub fn new(config: Config, acquirer: FeedAcquirer, initial: CameraList) -> Arc<Self> {
        let fetcher = SnapshotFetcher::new(config.fetch_timeout);
        Arc::new(Self {
            slideshow: RwLock::new(Slideshow::new(initial)),
            snapshot: RwLock::new(None),
            events: EventBus::new(EVENT_BUS_CAPACITY),
            acquirer,
            fetcher,
            started_at: Instant::now(),
            last_refresh: RwLock::new(None),
            shutdown: Notify::new(),
            refresh_guard: Mutex::new(()),
            rotation_task: Mutex::new(None),
            snapshot_task: Mutex::new(None),
            list_refresh_task: Mutex::new(None),
            config,
        })
    }
}
