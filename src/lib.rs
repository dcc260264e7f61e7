//! webpilot library.
//!
//! A multi-context UI automation driver: a W3C WebDriver client plus the
//! orchestration layers needed to drive a browser-extension popup and a
//! counterpart dapp page through multi-window interaction scenarios. The
//! session object here replaces the global driver/root-URL state the
//! scripts it supersedes leaned on; everything a flow needs is constructed
//! per suite and passed explicitly.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod errors;
pub mod session;

pub use config::PilotConfig;
pub use errors::PilotError;
pub use session::PilotSession;

// Re-export the layer APIs test suites compose against.
pub use keynav::{KeyboardNavigator, NavError, NavLimits};
pub use ui_actions::{ActionError, DispatchMode, ShortcutDispatcher};
pub use ui_locator::{ElementLocator, LocateError};
pub use wd_adapter::{
    DriverError, DriverErrorKind, FakeDriver, HttpDriver, Key, KeyInput, WireDriver,
};
pub use webpilot_core_types::{ContextId, ContextRole, ElementHandle, PollConfig, Selector};
pub use webpilot_flows::{FlowCtx, FlowError, FlowReport, FlowRunner, PrivateKey, SeedPhrase};
pub use webpilot_registry::{ContextRegistry, RegistryError};
