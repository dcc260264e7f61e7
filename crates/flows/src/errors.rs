use keynav::NavError;
use thiserror::Error;
use ui_actions::ActionError;
use ui_locator::LocateError;
use wd_adapter::DriverError;
use webpilot_registry::RegistryError;

/// What went wrong inside a single flow step.
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A terminal state check did not hold (wrong text, wrong route).
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[derive(Debug, Error)]
pub enum FlowError {
    /// A step failed; the flow aborted there with no recovery attempt.
    #[error("flow '{flow}' failed at step '{step}'")]
    Step {
        flow: &'static str,
        step: &'static str,
        #[source]
        source: StepFailure,
    },

    #[error("flow '{flow}' cancelled")]
    Cancelled { flow: &'static str },

    #[error("flow '{flow}' exceeded its deadline")]
    DeadlineExceeded { flow: &'static str },

    #[error("invalid seed phrase: {0}")]
    InvalidSeedPhrase(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

impl FlowError {
    /// The failing step, when the error carries one.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            FlowError::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}
