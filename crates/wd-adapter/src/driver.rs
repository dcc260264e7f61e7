//! The semantic driver trait every higher layer is written against.

use async_trait::async_trait;
use webpilot_core_types::{ContextId, ElementId, Selector};

use crate::error::DriverError;
use crate::keys::KeySequence;

/// Remote browser-control operations, expressed semantically rather than as
/// raw protocol commands so an in-memory implementation can stand in for a
/// real remote end.
///
/// Operations that take a [`ContextId`] guarantee the targeted window is the
/// remote end's current one before acting (switching if necessary).
#[async_trait]
pub trait WireDriver: Send + Sync {
    /// Session liveness probe. Checked as a precondition of every context
    /// operation by the registry.
    async fn status(&self) -> Result<(), DriverError>;

    /// Open a new window, navigate it to `url`, and leave it current.
    async fn open_window(&self, url: &str) -> Result<ContextId, DriverError>;

    async fn navigate(&self, ctx: &ContextId, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self, ctx: &ContextId) -> Result<String, DriverError>;

    /// All open window handles, in the remote end's enumeration order.
    async fn window_handles(&self) -> Result<Vec<ContextId>, DriverError>;

    async fn switch_to(&self, ctx: &ContextId) -> Result<(), DriverError>;

    async fn close_window(&self, ctx: &ContextId) -> Result<(), DriverError>;

    /// All elements matching `selector`, possibly empty.
    async fn find(
        &self,
        ctx: &ContextId,
        selector: &Selector,
    ) -> Result<Vec<ElementId>, DriverError>;

    async fn is_displayed(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<bool, DriverError>;

    async fn is_enabled(&self, ctx: &ContextId, element: &ElementId)
        -> Result<bool, DriverError>;

    async fn click(&self, ctx: &ContextId, element: &ElementId) -> Result<(), DriverError>;

    async fn clear(&self, ctx: &ContextId, element: &ElementId) -> Result<(), DriverError>;

    async fn send_text(
        &self,
        ctx: &ContextId,
        element: &ElementId,
        text: &str,
    ) -> Result<(), DriverError>;

    /// The element holding focus, if any.
    async fn active_element(&self, ctx: &ContextId) -> Result<Option<ElementId>, DriverError>;

    /// Identity tags (`data-testid`) of an element and its descendants.
    async fn identity_tags(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<Vec<String>, DriverError>;

    async fn attribute(
        &self,
        ctx: &ContextId,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn text(&self, ctx: &ContextId, element: &ElementId) -> Result<String, DriverError>;

    /// Whether the hosting document's ready-state has reached "complete".
    async fn document_ready(&self, ctx: &ContextId) -> Result<bool, DriverError>;

    /// Dispatch a key-action sequence to whatever holds focus in `ctx`.
    async fn dispatch_keys(
        &self,
        ctx: &ContextId,
        sequence: &KeySequence,
    ) -> Result<(), DriverError>;

    /// Full-page screenshot as decoded PNG bytes.
    async fn screenshot(&self, ctx: &ContextId) -> Result<Vec<u8>, DriverError>;

    /// Tear the session down.
    async fn quit(&self) -> Result<(), DriverError>;
}
