//! Periodic slideshow tasks: rotation advance, snapshot refresh, list refresh.
//!
//! Every task is a spawned loop over a `tokio::time` interval that also
//! `select!`s the shared shutdown notify (and is aborted on shutdown as a
//! backstop). Starting a task first aborts any previously spawned instance of
//! the same task, so duplicate overlapping timers cannot exist; manual
//! navigation restarts the rotation task so the full interval re-applies.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use camcycle::types::CameraRecord;

use crate::events::SlideshowEvent;
use crate::rotation::Direction;
use crate::state::SharedState;

/// What one list refresh attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fresh list was acquired and swapped in.
    Swapped { camera_count: usize },
    /// Another refresh was already in flight; this one was skipped.
    AlreadyRunning,
    /// Acquisition failed; the previous list stays in use.
    Failed { error: String },
}

/// Start (or restart) all three periodic tasks.
pub async fn start_all(state: &Arc<SharedState>) {
    start_rotation(state).await;
    start_snapshot_refresh(state).await;
    start_list_refresh(state).await;
}

/// Stop every periodic task.
pub async fn stop_all(state: &Arc<SharedState>) {
    state.shutdown.notify_waiters();
    for slot in [
        &state.rotation_task,
        &state.snapshot_task,
        &state.list_refresh_task,
    ] {
        abort_slot(slot).await;
    }
}

async fn abort_slot(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = slot.lock().await.take() {
        handle.abort();
    }
}

/// Start (or restart) the rotation-advance task.
///
/// The first advance happens one full rotation interval after this call, so a
/// restart always re-applies the whole interval.
pub async fn start_rotation(state: &Arc<SharedState>) {
    let mut slot = state.rotation_task.lock().await;
    if let Some(previous) = slot.take() {
        previous.abort();
    }
    *slot = Some(tokio::spawn(rotation_loop(Arc::clone(state))));
}

/// Start (or restart) the snapshot-refresh task.
pub async fn start_snapshot_refresh(state: &Arc<SharedState>) {
    let mut slot = state.snapshot_task.lock().await;
    if let Some(previous) = slot.take() {
        previous.abort();
    }
    *slot = Some(tokio::spawn(snapshot_loop(Arc::clone(state))));
}

/// Start (or restart) the hourly list-refresh task.
pub async fn start_list_refresh(state: &Arc<SharedState>) {
    let mut slot = state.list_refresh_task.lock().await;
    if let Some(previous) = slot.take() {
        previous.abort();
    }
    *slot = Some(tokio::spawn(list_refresh_loop(Arc::clone(state))));
}

/// Move one step in either direction on behalf of the user.
///
/// Emits a manual [`SlideshowEvent::RotationAdvanced`] and restarts the
/// rotation timer. Returns the camera now on screen.
pub async fn navigate(state: &Arc<SharedState>, direction: Direction) -> Option<CameraRecord> {
    let mut show = state.slideshow.write().await;
    let camera = show.step(direction).cloned();
    let index = show.current_index();
    drop(show);

    let camera = camera?;
    state.events.emit(SlideshowEvent::RotationAdvanced {
        id: camera.id.clone(),
        index,
        manual: true,
    });
    start_rotation(state).await;
    Some(camera)
}

/// Re-acquire the camera list and swap it in on success.
///
/// Guarded so at most one refresh runs at a time; an overlapping call is
/// skipped rather than queued. A failed acquisition keeps the previous list —
/// stale but working beats empty.
pub async fn refresh_list(state: &Arc<SharedState>) -> RefreshOutcome {
    let Ok(_guard) = state.refresh_guard.try_lock() else {
        tracing::debug!("list refresh already in flight; skipping");
        return RefreshOutcome::AlreadyRunning;
    };

    let started = Instant::now();
    match state.acquirer.acquire(&state.config.defaults).await {
        Ok(list) => {
            let camera_count = list.len();
            state.slideshow.write().await.swap_list(list);
            *state.last_refresh.write().await = Some(Utc::now());
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!("camera list refreshed: {camera_count} active cameras in {elapsed_ms}ms");
            state.events.emit(SlideshowEvent::ListRefreshed {
                camera_count,
                elapsed_ms,
            });
            RefreshOutcome::Swapped { camera_count }
        }
        Err(e) => {
            tracing::warn!("camera list refresh failed, keeping previous list: {e}");
            let error = e.to_string();
            state.events.emit(SlideshowEvent::ListRefreshFailed {
                error: error.clone(),
            });
            RefreshOutcome::Failed { error }
        }
    }
}

async fn rotation_loop(state: Arc<SharedState>) {
    let period = state.config.rotate_every;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = state.shutdown.notified() => {
                tracing::debug!("rotation task stopping");
                break;
            }
            _ = ticker.tick() => {
                let mut show = state.slideshow.write().await;
                if !show.is_playing() {
                    continue;
                }
                let advanced = show.advance().map(|c| c.id.clone());
                let index = show.current_index();
                drop(show);

                if let Some(id) = advanced {
                    tracing::debug!("rotated to camera {id}");
                    state.events.emit(SlideshowEvent::RotationAdvanced {
                        id,
                        index,
                        manual: false,
                    });
                }
            }
        }
    }
}

async fn snapshot_loop(state: Arc<SharedState>) {
    let mut ticker = tokio::time::interval(state.config.snapshot_refresh);
    // After a retry delay the next tick fires once, immediately, instead of
    // bursting through every missed tick.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut failures: u32 = 0;
    let mut failing_id: Option<String> = None;

    loop {
        tokio::select! {
            _ = state.shutdown.notified() => {
                tracing::debug!("snapshot task stopping");
                break;
            }
            _ = ticker.tick() => {
                let current = state.slideshow.read().await.current().cloned();
                let Some(camera) = current else { continue };

                // The failure streak belongs to one camera; rotation resets it.
                if failing_id.as_deref() != Some(camera.id.as_str()) {
                    failures = 0;
                    failing_id = Some(camera.id.clone());
                }

                let started = Instant::now();
                match state.fetcher.fetch(&camera).await {
                    Ok(snapshot) => {
                        failures = 0;
                        let bytes = snapshot.bytes.len();
                        *state.snapshot.write().await = Some(snapshot);
                        state.events.emit(SlideshowEvent::SnapshotUpdated {
                            id: camera.id.clone(),
                            bytes,
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::warn!(
                            "snapshot for camera {} failed (attempt {failures}): {e}",
                            camera.id
                        );
                        state.events.emit(SlideshowEvent::SnapshotFailed {
                            id: camera.id.clone(),
                            attempt: failures,
                            error: e.to_string(),
                        });

                        if failures >= state.config.snapshot_retry_limit {
                            tracing::info!(
                                "giving up on camera {} after {failures} attempts",
                                camera.id
                            );
                            state.events.emit(SlideshowEvent::CameraSkipped {
                                id: camera.id.clone(),
                                attempts: failures,
                            });
                            failures = 0;
                            failing_id = None;
                            skip_to_next(&state).await;
                        } else {
                            // Fixed delay before retrying the same camera.
                            tokio::select! {
                                _ = state.shutdown.notified() => break,
                                _ = tokio::time::sleep(state.config.snapshot_retry_delay) => {}
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Advance past a camera whose snapshots keep failing.
async fn skip_to_next(state: &Arc<SharedState>) {
    let mut show = state.slideshow.write().await;
    let next = show.advance().map(|c| c.id.clone());
    let index = show.current_index();
    drop(show);

    if let Some(id) = next {
        state.events.emit(SlideshowEvent::RotationAdvanced {
            id,
            index,
            manual: false,
        });
    }
}

async fn list_refresh_loop(state: Arc<SharedState>) {
    let period = state.config.list_refresh_every;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = state.shutdown.notified() => {
                tracing::debug!("list refresh task stopping");
                break;
            }
            _ = ticker.tick() => {
                refresh_list(&state).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::broadcast::error::TryRecvError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use camcycle::acquire::FeedAcquirer;
    use camcycle::types::{CameraList, CameraRecord, FeedDefaults};

    use crate::config::Config;

    fn record(id: &str, source_url: &str) -> CameraRecord {
        CameraRecord {
            id: id.to_string(),
            title: format!("Camera {id}"),
            owner: "Campus Services".to_string(),
            source_url: source_url.to_string(),
        }
    }

    fn test_config(sources: Vec<String>) -> Config {
        Config {
            sources,
            http_port: 0,
            snapshot_refresh: Duration::from_millis(20),
            rotate_every: Duration::from_millis(40),
            list_refresh_every: Duration::from_secs(3600),
            snapshot_retry_limit: 2,
            snapshot_retry_delay: Duration::from_millis(10),
            fetch_timeout: Duration::from_secs(5),
            startup_retry_delay: Duration::from_millis(10),
            defaults: FeedDefaults::default(),
        }
    }

    fn test_state(cameras: Vec<CameraRecord>) -> Arc<SharedState> {
        let config = test_config(vec!["http://127.0.0.1:1/feed.js".to_string()]);
        let acquirer =
            FeedAcquirer::with_timeout(config.sources.clone(), config.fetch_timeout);
        SharedState::new(config, acquirer, CameraList::new(cameras))
    }

    fn drain_advances(
        rx: &mut tokio::sync::broadcast::Receiver<SlideshowEvent>,
    ) -> Vec<SlideshowEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        events
    }

    #[tokio::test]
    async fn test_rotation_loop_advances_while_playing() {
        let state = test_state(vec![
            record("a", "https://example.edu/a.jpg"),
            record("b", "https://example.edu/b.jpg"),
            record("c", "https://example.edu/c.jpg"),
        ]);
        let mut rx = state.events.subscribe();

        start_rotation(&state).await;
        tokio::time::sleep(Duration::from_millis(220)).await;
        stop_all(&state).await;

        let advances = drain_advances(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, SlideshowEvent::RotationAdvanced { manual: false, .. }))
            .count();
        assert!(advances >= 1, "expected at least one automatic advance");
    }

    #[tokio::test]
    async fn test_rotation_loop_respects_pause() {
        let state = test_state(vec![
            record("a", "https://example.edu/a.jpg"),
            record("b", "https://example.edu/b.jpg"),
        ]);
        state.slideshow.write().await.set_playing(false);
        let mut rx = state.events.subscribe();

        start_rotation(&state).await;
        tokio::time::sleep(Duration::from_millis(180)).await;
        stop_all(&state).await;

        assert_eq!(state.slideshow.read().await.current_index(), 0);
        assert!(drain_advances(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_rotation_task() {
        let state = test_state(vec![record("a", "https://example.edu/a.jpg")]);
        start_rotation(&state).await;
        let first = state
            .rotation_task
            .lock()
            .await
            .as_ref()
            .map(|h| h.is_finished());
        assert_eq!(first, Some(false));

        start_rotation(&state).await;
        assert!(state.rotation_task.lock().await.is_some());
        stop_all(&state).await;
    }

    #[tokio::test]
    async fn test_snapshot_loop_stores_latest_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/north.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0xFF, 0xD8])
                    .insert_header("content-type", "image/jpeg"),
            )
            .mount(&server)
            .await;

        let state = test_state(vec![record("north", &format!("{}/north.jpg", server.uri()))]);
        start_snapshot_refresh(&state).await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        stop_all(&state).await;

        let snapshot = state.snapshot.read().await;
        let snapshot = snapshot.as_ref().expect("snapshot should be captured");
        assert_eq!(snapshot.camera_id, "north");
        assert_eq!(snapshot.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_snapshot_failures_skip_to_next_camera() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/south.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0xFF, 0xD8])
                    .insert_header("content-type", "image/jpeg"),
            )
            .mount(&server)
            .await;

        let state = test_state(vec![
            record("broken", &format!("{}/broken.jpg", server.uri())),
            record("south", &format!("{}/south.jpg", server.uri())),
        ]);
        let mut rx = state.events.subscribe();

        start_snapshot_refresh(&state).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        stop_all(&state).await;

        assert_eq!(
            state.slideshow.read().await.current().unwrap().id,
            "south",
            "failing camera should be skipped"
        );
        let snapshot = state.snapshot.read().await;
        assert_eq!(snapshot.as_ref().unwrap().camera_id, "south");
        assert!(drain_advances(&mut rx)
            .iter()
            .any(|e| matches!(e, SlideshowEvent::CameraSkipped { attempts: 2, .. })));
    }

    #[tokio::test]
    async fn test_refresh_list_swaps_and_preserves_current() {
        let server = MockServer::start().await;
        let mut feed = String::from("// regenerated camera feed, padded for length\n");
        feed.push_str("cams[\"south\"][\"title\"] = \"South Lawn\";\n");
        feed.push_str("randCams.push(\"north\");\n");
        feed.push_str("randCams.push(\"south\");\n");
        feed.push_str("randCams.push(\"extra\");\n");
        Mock::given(method("GET"))
            .and(path("/feed.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed))
            .mount(&server)
            .await;

        let config = test_config(vec![format!("{}/feed.js", server.uri())]);
        let acquirer =
            FeedAcquirer::with_timeout(config.sources.clone(), config.fetch_timeout);
        let state = SharedState::new(
            config,
            acquirer,
            CameraList::new(vec![
                record("north", "https://example.edu/north.jpg"),
                record("south", "https://example.edu/south.jpg"),
            ]),
        );
        state.slideshow.write().await.advance(); // -> south

        let outcome = refresh_list(&state).await;
        assert_eq!(outcome, RefreshOutcome::Swapped { camera_count: 3 });

        let show = state.slideshow.read().await;
        assert_eq!(show.len(), 3);
        assert_eq!(show.current().unwrap().id, "south");
        assert_eq!(show.current().unwrap().title, "South Lawn");
        drop(show);
        assert!(state.last_refresh.read().await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_list_failure_keeps_previous_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.js"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = test_config(vec![format!("{}/feed.js", server.uri())]);
        let acquirer =
            FeedAcquirer::with_timeout(config.sources.clone(), config.fetch_timeout);
        let state = SharedState::new(
            config,
            acquirer,
            CameraList::new(vec![record("north", "https://example.edu/north.jpg")]),
        );
        let mut rx = state.events.subscribe();

        let outcome = refresh_list(&state).await;
        assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
        assert_eq!(state.slideshow.read().await.len(), 1);
        assert!(drain_advances(&mut rx)
            .iter()
            .any(|e| matches!(e, SlideshowEvent::ListRefreshFailed { .. })));
    }

    #[tokio::test]
    async fn test_navigate_emits_manual_advance_and_restarts_rotation() {
        let state = test_state(vec![
            record("a", "https://example.edu/a.jpg"),
            record("b", "https://example.edu/b.jpg"),
        ]);
        let mut rx = state.events.subscribe();

        let camera = navigate(&state, Direction::Forward).await.unwrap();
        assert_eq!(camera.id, "b");
        assert!(state.rotation_task.lock().await.is_some());

        let camera = navigate(&state, Direction::Back).await.unwrap();
        assert_eq!(camera.id, "a");

        let manual = drain_advances(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, SlideshowEvent::RotationAdvanced { manual: true, .. }))
            .count();
        assert_eq!(manual, 2);
        stop_all(&state).await;
    }

    #[tokio::test]
    async fn test_navigate_on_empty_list_is_none() {
        let state = test_state(Vec::new());
        assert!(navigate(&state, Direction::Forward).await.is_none());
    }
}
