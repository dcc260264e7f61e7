use thiserror::Error;
use wd_adapter::DriverError;
use webpilot_core_types::Selector;

#[derive(Debug, Error)]
pub enum LocateError {
    /// Existence polling exhausted the budget.
    #[error("element not found: {selector} (waited {waited_ms}ms)")]
    NotFound { selector: Selector, waited_ms: u64 },

    /// The element exists but never became visible within the budget.
    #[error("element never became visible: {selector} (waited {waited_ms}ms)")]
    NotVisible { selector: Selector, waited_ms: u64 },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl LocateError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            LocateError::NotFound { .. } | LocateError::NotVisible { .. }
        )
    }
}
