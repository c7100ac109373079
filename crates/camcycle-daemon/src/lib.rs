//! Camcycle slideshow daemon — rotation control, snapshot capture, and the
//! REST/SSE surface a display page consumes.

pub mod config;
pub mod events;
pub mod rest;
pub mod rotation;
pub mod snapshot;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use events::{EventBus, SlideshowEvent};
pub use rotation::{Direction, Slideshow};
pub use state::SharedState;
