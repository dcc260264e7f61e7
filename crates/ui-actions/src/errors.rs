use thiserror::Error;
use ui_locator::LocateError;
use wd_adapter::DriverError;

#[derive(Debug, Error)]
pub enum ActionError {
    /// The element never became visible/interactable within the budget.
    /// The detail names the element's test-id when it could be read.
    #[error("element not interactable: {detail}")]
    NotInteractable { detail: String },

    /// The element stayed disabled within the budget.
    #[error("element not enabled: {detail}")]
    NotEnabled { detail: String },

    /// An element handle was used after its context stopped being current.
    #[error("stale element handle: {0}")]
    StaleHandle(String),

    /// A shortcut dispatch failed; never swallowed, since a missed key
    /// desyncs keyboard-driven navigation state.
    #[error("shortcut dispatch failed: {keys}")]
    DispatchFailed {
        keys: String,
        #[source]
        source: DriverError,
    },

    /// The document never reached ready state within the budget.
    #[error("wait timed out: {0}")]
    WaitTimeout(String),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
