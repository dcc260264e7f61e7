use thiserror::Error;
use ui_actions::ActionError;
use wd_adapter::DriverError;

#[derive(Debug, Error)]
pub enum NavError {
    /// The step bound was exhausted before the target tag appeared in any
    /// focused element. The traversal does not recurse unbounded.
    #[error("target '{tag}' not reached within {steps} focus moves")]
    TargetUnreachable { tag: String, steps: usize },

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
