//! Rotation state for the slideshow.
//!
//! An explicit state struct owned behind [`crate::state::SharedState`] — no
//! process-wide current-index or playing globals. All mutation happens on the
//! single cooperative runtime through the surrounding `RwLock`.

use camcycle::types::{CameraList, CameraRecord};

/// Which way a navigation step moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Current position and playback state over a working camera list.
#[derive(Debug)]
pub struct Slideshow {
    list: CameraList,
    current: usize,
    playing: bool,
}

impl Slideshow {
    /// Start a slideshow at the first camera, playing.
    pub fn new(list: CameraList) -> Self {
        Self {
            list,
            current: 0,
            playing: true,
        }
    }

    /// The working camera list.
    pub fn list(&self) -> &CameraList {
        &self.list
    }

    /// Number of cameras in rotation.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the rotation holds no cameras.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Whether timed rotation is active.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Set the playing flag; returns whether it changed.
    pub fn set_playing(&mut self, playing: bool) -> bool {
        let changed = self.playing != playing;
        self.playing = playing;
        changed
    }

    /// The camera currently on screen, if any.
    pub fn current(&self) -> Option<&CameraRecord> {
        self.list.get(self.current)
    }

    /// Index of the camera currently on screen.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Move one step circularly and return the new current camera.
    pub fn step(&mut self, direction: Direction) -> Option<&CameraRecord> {
        if self.list.is_empty() {
            return None;
        }
        self.current = match direction {
            Direction::Forward => (self.current + 1) % self.list.len(),
            Direction::Back => (self.current + self.list.len() - 1) % self.list.len(),
        };
        self.current()
    }

    /// Advance circularly forward.
    pub fn advance(&mut self) -> Option<&CameraRecord> {
        self.step(Direction::Forward)
    }

    /// Step circularly backward.
    pub fn step_back(&mut self) -> Option<&CameraRecord> {
        self.step(Direction::Back)
    }

    /// Install a freshly acquired list.
    ///
    /// Callers only swap in a successfully produced, non-empty list. The
    /// currently displayed camera is preserved across the swap by looking up
    /// the pre-swap camera id in the new list; when the id is gone, the
    /// position resets to the first camera. The adjustment is computed from
    /// the pre-swap identifier, never the pre-swap numeric index.
    pub fn swap_list(&mut self, list: CameraList) {
        debug_assert!(!list.is_empty(), "never swap in an empty list");
        let previous_id = self.current().map(|c| c.id.clone());
        self.current = previous_id
            .as_deref()
            .and_then(|id| list.position_of(id))
            .unwrap_or(0);
        self.list = list;
    }
}
