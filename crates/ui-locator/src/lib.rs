//! Polling element locator.
//!
//! Every locate is bounded by a [`PollConfig`]: the call either returns a
//! visible element reference within the budget or fails with a typed
//! timeout error. It never hangs and never returns an invisible handle.

pub mod errors;
pub mod locator;

pub use errors::LocateError;
pub use locator::ElementLocator;
