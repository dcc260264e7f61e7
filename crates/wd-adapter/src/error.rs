//! Error types surfaced by the driver adapter.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories surfaced by the adapter.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq, Serialize, Deserialize)]
pub enum DriverErrorKind {
    /// The remote session is gone or was never established.
    #[error("session lost")]
    SessionLost,

    /// The targeted window handle no longer exists.
    #[error("no such window")]
    NoSuchWindow,

    /// A find command matched nothing.
    #[error("no such element")]
    NoSuchElement,

    /// An element reference outlived its document.
    #[error("stale element reference")]
    StaleElement,

    /// The element exists but cannot receive the interaction.
    #[error("element not interactable")]
    NotInteractable,

    /// The remote end reported a timeout.
    #[error("operation timed out")]
    Timeout,

    /// The selector expression was rejected by the remote end.
    #[error("invalid selector")]
    InvalidSelector,

    /// Transport-level failure (connection refused, broken pipe, bad gateway).
    #[error("wire transport failure")]
    Wire,

    /// The remote end answered with a payload we cannot interpret.
    #[error("protocol violation")]
    Protocol,

    /// The remote end does not implement the command.
    #[error("unsupported operation")]
    Unsupported,

    /// Internal error (should not happen in normal operation).
    #[error("internal error")]
    Internal,
}

impl DriverErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            DriverErrorKind::SessionLost => "session-lost",
            DriverErrorKind::NoSuchWindow => "no-such-window",
            DriverErrorKind::NoSuchElement => "no-such-element",
            DriverErrorKind::StaleElement => "stale-element",
            DriverErrorKind::NotInteractable => "not-interactable",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::InvalidSelector => "invalid-selector",
            DriverErrorKind::Wire => "wire",
            DriverErrorKind::Protocol => "protocol",
            DriverErrorKind::Unsupported => "unsupported",
            DriverErrorKind::Internal => "internal",
        }
    }

    /// Map a W3C error code string to an adapter kind.
    pub fn from_wire(code: &str) -> Self {
        match code {
            "invalid session id" => DriverErrorKind::SessionLost,
            "no such window" => DriverErrorKind::NoSuchWindow,
            "no such element" => DriverErrorKind::NoSuchElement,
            "stale element reference" => DriverErrorKind::StaleElement,
            "element not interactable" => DriverErrorKind::NotInteractable,
            "timeout" | "script timeout" => DriverErrorKind::Timeout,
            "invalid selector" => DriverErrorKind::InvalidSelector,
            "unknown command" | "unsupported operation" | "unknown method" => {
                DriverErrorKind::Unsupported
            }
            _ => DriverErrorKind::Protocol,
        }
    }
}

/// Enriched error metadata passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

impl DriverError {
    pub fn new(kind: DriverErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    pub fn is_session_lost(&self) -> bool {
        self.kind == DriverErrorKind::SessionLost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_map_to_kinds() {
        assert_eq!(
            DriverErrorKind::from_wire("invalid session id"),
            DriverErrorKind::SessionLost
        );
        assert_eq!(
            DriverErrorKind::from_wire("no such window"),
            DriverErrorKind::NoSuchWindow
        );
        assert_eq!(
            DriverErrorKind::from_wire("stale element reference"),
            DriverErrorKind::StaleElement
        );
        assert_eq!(
            DriverErrorKind::from_wire("something else"),
            DriverErrorKind::Protocol
        );
    }

    #[test]
    fn display_appends_hint() {
        let err = DriverError::new(DriverErrorKind::NoSuchElement).with_hint("selector css:#x");
        assert_eq!(err.to_string(), "no such element: selector css:#x");
    }
}
