//! Camcycle core library — camera feed acquisition, feed-text scraping, and the
//! slideshow list model.

pub mod acquire;
pub mod parser;
pub mod types;

pub use acquire::FeedAcquirer;
pub use parser::parse_feed;
pub use types::*;
