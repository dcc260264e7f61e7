//! Shared primitives for the webpilot automation driver.
//!
//! Everything here is protocol-agnostic: identifiers handed out by the
//! remote end, the selector algebra, context roles, and the polling
//! configuration every bounded wait derives its deadline from.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle to one browser window/tab/extension surface.
///
/// The string value is whatever the remote end uses as a window handle;
/// it is never synthesized locally.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub String);

impl ContextId {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// W3C element reference returned by a find command.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation id for one logical action, used in tracing output.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which logical party a context represents in a multi-window interaction.
///
/// Roles are assigned by whoever caused the context to exist (the flow that
/// opened the dapp tab, the wait that observed the popup spawn). A context
/// that nobody has claimed yet is `Unknown`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ContextRole {
    Unknown,
    Dapp,
    ExtensionPopup,
}

impl ContextRole {
    pub fn name(&self) -> &'static str {
        match self {
            ContextRole::Unknown => "unknown",
            ContextRole::Dapp => "dapp",
            ContextRole::ExtensionPopup => "extension-popup",
        }
    }

    /// The complementary role in a two-window interaction.
    pub fn counterpart(&self) -> Option<ContextRole> {
        match self {
            ContextRole::Dapp => Some(ContextRole::ExtensionPopup),
            ContextRole::ExtensionPopup => Some(ContextRole::Dapp),
            ContextRole::Unknown => None,
        }
    }
}

impl fmt::Display for ContextRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element selector algebra.
///
/// A selector is resolved against exactly one context at a time. `TestId`
/// is the primary lookup key (`data-testid` attribute); `Id` covers legacy
/// and dapp-side elements that only expose a plain `id`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Selector {
    TestId(String),
    Id(String),
    Css(String),
    Text(String),
    XPath(String),
}

impl Selector {
    pub fn test_id(value: impl Into<String>) -> Self {
        Selector::TestId(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Selector::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Selector::Text(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    /// W3C location strategy name for this selector.
    pub fn strategy(&self) -> &'static str {
        match self {
            Selector::TestId(_) | Selector::Id(_) | Selector::Css(_) => "css selector",
            Selector::Text(_) | Selector::XPath(_) => "xpath",
        }
    }

    /// Expression sent alongside [`Selector::strategy`] on the wire.
    pub fn expression(&self) -> String {
        match self {
            Selector::TestId(value) => {
                format!("[data-testid=\"{}\"]", escape_css_attr(value))
            }
            Selector::Id(value) => format!("[id=\"{}\"]", escape_css_attr(value)),
            Selector::Css(value) => value.clone(),
            Selector::Text(value) => {
                format!("//*[normalize-space(text())={}]", xpath_literal(value))
            }
            Selector::XPath(value) => value.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::TestId(value) => write!(f, "testid:{value}"),
            Selector::Id(value) => write!(f, "id:{value}"),
            Selector::Css(value) => write!(f, "css:{value}"),
            Selector::Text(value) => write!(f, "text:{value}"),
            Selector::XPath(value) => write!(f, "xpath:{value}"),
        }
    }
}

fn escape_css_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote a string as an XPath literal, falling back to `concat()` when the
/// value mixes both quote characters.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let mut parts = Vec::new();
    for (i, chunk) in value.split('"').enumerate() {
        if i > 0 {
            parts.push("'\"'".to_string());
        }
        if !chunk.is_empty() {
            parts.push(format!("\"{chunk}\""));
        }
    }
    format!("concat({})", parts.join(", "))
}

/// Reference to a located DOM node, scoped to the context it was found in.
///
/// A handle must never be used after switching away from its context; the
/// executor enforces this against the registry's notion of "current".
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElementHandle {
    pub element: ElementId,
    pub context: ContextId,
    pub selector: Selector,
}

impl ElementHandle {
    pub fn new(element: ElementId, context: ContextId, selector: Selector) -> Self {
        Self {
            element,
            context,
            selector,
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.selector, self.context)
    }
}

/// Polling budget for bounded waits.
///
/// Every locate/wait operation derives a hard deadline from `timeout` and
/// re-checks its condition every `interval`. Nothing in the driver is
/// allowed to wait without one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Budget with the same interval but a different total timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(250),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testid_selector_compiles_to_css_attribute() {
        let sel = Selector::test_id("import-wallet");
        assert_eq!(sel.strategy(), "css selector");
        assert_eq!(sel.expression(), "[data-testid=\"import-wallet\"]");
    }

    #[test]
    fn testid_selector_escapes_quotes() {
        let sel = Selector::test_id("a\"b");
        assert_eq!(sel.expression(), "[data-testid=\"a\\\"b\"]");
    }

    #[test]
    fn text_selector_compiles_to_xpath() {
        let sel = Selector::text("Connect");
        assert_eq!(sel.strategy(), "xpath");
        assert_eq!(sel.expression(), "//*[normalize-space(text())=\"Connect\"]");
    }

    #[test]
    fn xpath_literal_handles_mixed_quotes() {
        assert_eq!(xpath_literal("plain"), "\"plain\"");
        assert_eq!(xpath_literal("it\"s"), "'it\"s'");
        assert_eq!(xpath_literal("a\"b'c"), "concat(\"a\", '\"', \"b'c\")");
    }

    #[test]
    fn role_counterparts_are_symmetric() {
        assert_eq!(
            ContextRole::Dapp.counterpart(),
            Some(ContextRole::ExtensionPopup)
        );
        assert_eq!(
            ContextRole::ExtensionPopup.counterpart(),
            Some(ContextRole::Dapp)
        );
        assert_eq!(ContextRole::Unknown.counterpart(), None);
    }

    #[test]
    fn poll_config_default_is_bounded() {
        let poll = PollConfig::default();
        assert!(poll.timeout > Duration::ZERO);
        assert!(poll.interval < poll.timeout);
    }
}
