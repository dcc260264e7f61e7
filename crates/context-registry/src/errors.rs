use thiserror::Error;
use wd_adapter::DriverError;
use webpilot_core_types::ContextId;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The remote session is gone; every context operation checks this
    /// precondition before touching the wire.
    #[error("remote session lost")]
    SessionLost(#[source] DriverError),

    #[error("unknown context: {0}")]
    UnknownContext(ContextId),

    /// Classification by elimination only works when at most one context
    /// is untagged.
    #[error("cannot classify {count} untagged contexts by elimination")]
    AmbiguousContexts { count: usize },

    /// An expected new context never materialized within the poll budget.
    #[error("new context did not materialize within {waited_ms}ms")]
    SwitchRace { waited_ms: u64 },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl RegistryError {
    /// Fold a driver error into the registry taxonomy, promoting session
    /// loss to its own variant.
    pub fn from_driver(err: DriverError) -> Self {
        if err.is_session_lost() {
            RegistryError::SessionLost(err)
        } else {
            RegistryError::Driver(err)
        }
    }
}
