//! W3C WebDriver remote-control adapter.
//!
//! Exposes a semantic driver trait ([`WireDriver`]) rather than raw protocol
//! commands, an HTTP implementation speaking the W3C wire protocol
//! ([`HttpDriver`]), and an in-memory scriptable implementation
//! ([`FakeDriver`]) that the higher layers test against.

pub mod driver;
pub mod error;
pub mod fake;
pub mod http;
pub mod keys;
pub mod metrics;

pub use driver::WireDriver;
pub use error::{DriverError, DriverErrorKind};
pub use fake::{ElementSpec, FakeDriver, FakeEffect};
pub use http::{HttpDriver, HttpDriverConfig};
pub use keys::{Key, KeyInput, KeyPulse, KeySequence};
