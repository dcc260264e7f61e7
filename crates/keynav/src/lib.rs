//! Keyboard navigator.
//!
//! Drives pure-keyboard UI traversal the way a keyboard-only user would:
//! move focus, inspect the focused element's identity tags, repeat until
//! the target tag shows up, then activate. Exercises the UI's real tab
//! order and focus traps rather than its visual layout.

pub mod errors;
pub mod navigator;

pub use errors::NavError;
pub use navigator::{KeyboardNavigator, NavLimits, NavOutcome};
