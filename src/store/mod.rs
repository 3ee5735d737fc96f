//! In-memory state the timeline renders from.

pub mod channels;
pub mod tweets;
