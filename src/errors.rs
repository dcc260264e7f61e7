//! Top-level error type for the session layer.

use thiserror::Error;

use ui_actions::ActionError;
use ui_locator::LocateError;
use wd_adapter::DriverError;
use webpilot_flows::FlowError;
use webpilot_registry::RegistryError;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("artifact i/o error: {0}")]
    Io(#[from] std::io::Error),
}
