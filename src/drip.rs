//! Drip scheduling: when does a module unlock for a member, and which modules unlock on a given day.
//!
//! Everything here is pure. The current time is always passed in, so the same
//! inputs give the same answer on any thread at any moment.

pub use calendar::*;
pub use selector::*;
pub use status::*;

mod calendar;
mod selector;
mod status;
