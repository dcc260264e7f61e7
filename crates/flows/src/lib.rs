//! Composed scenario procedures.
//!
//! Each flow is a strict sequence of locator/executor/dispatcher calls: the
//! first failing step aborts the flow and propagates with the step name.
//! Flows are not idempotent and are never retried; they re-derive the
//! current context from the registry instead of caching handles.

pub mod errors;
pub mod runner;
pub mod types;

pub use errors::{FlowError, StepFailure};
pub use runner::FlowRunner;
pub use types::{
    is_shortened_address, shorten_address, FlowCtx, FlowReport, PrivateKey, SeedPhrase,
    StepReport,
};
