//! Action executor: click, type, clear.
//!
//! Before acting it re-checks document readiness, absorbs animation timing
//! with a fixed settle delay, then waits for visibility and enabled state.
//! Failures carry the element's test-id when it can be read; the secondary
//! lookup error is deliberately swallowed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use wd_adapter::{KeySequence, WireDriver};
use webpilot_core_types::{ActionId, ContextId, ElementHandle, PollConfig};

use crate::errors::ActionError;

#[derive(Clone, Copy, Debug)]
pub struct ExecutorConfig {
    /// Fixed delay absorbing animation/transition timing that has no
    /// observable readiness signal.
    pub settle: Duration,
    /// Budget for the readiness/visibility/enabled waits around an action.
    pub poll: PollConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(250),
            poll: PollConfig::default(),
        }
    }
}

pub struct ActionExecutor {
    driver: Arc<dyn WireDriver>,
    cfg: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn WireDriver>) -> Self {
        Self {
            driver,
            cfg: ExecutorConfig::default(),
        }
    }

    pub fn with_config(driver: Arc<dyn WireDriver>, cfg: ExecutorConfig) -> Self {
        Self { driver, cfg }
    }

    pub async fn click(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let action_id = ActionId::new();
        info!(action_id = %action_id, target = %handle, "click");
        self.prepare(handle, true).await?;
        self.driver
            .click(&handle.context, &handle.element)
            .await
            .map_err(|err| self.enriched_failure(handle, err))?;
        Ok(())
    }

    /// Type into a located element.
    pub async fn type_text(&self, handle: &ElementHandle, text: &str) -> Result<(), ActionError> {
        let action_id = ActionId::new();
        info!(
            action_id = %action_id,
            target = %handle,
            text_length = text.len(),
            "type text"
        );
        self.prepare(handle, true).await?;
        self.driver
            .send_text(&handle.context, &handle.element, text)
            .await
            .map_err(|err| self.enriched_failure(handle, err))?;
        Ok(())
    }

    /// Degraded typing path: raw keystrokes against whatever holds focus.
    ///
    /// Used when focus was established through keyboard navigation and no
    /// element handle exists.
    pub async fn type_into_focused(
        &self,
        ctx: &ContextId,
        text: &str,
    ) -> Result<(), ActionError> {
        let action_id = ActionId::new();
        info!(action_id = %action_id, context = %ctx, text_length = text.len(), "type into focused");
        self.wait_document_ready(ctx).await?;
        sleep(self.cfg.settle).await;
        let sequence = KeySequence::text(text);
        self.driver
            .dispatch_keys(ctx, &sequence)
            .await
            .map_err(|err| ActionError::DispatchFailed {
                keys: sequence.label().to_string(),
                source: err,
            })?;
        Ok(())
    }

    pub async fn clear(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let action_id = ActionId::new();
        info!(action_id = %action_id, target = %handle, "clear");
        self.prepare(handle, false).await?;
        self.driver
            .clear(&handle.context, &handle.element)
            .await
            .map_err(|err| self.enriched_failure(handle, err))?;
        Ok(())
    }

    /// Ready gate, settle delay, then visibility (and optionally enabled)
    /// polling under the configured budget.
    async fn prepare(
        &self,
        handle: &ElementHandle,
        require_enabled: bool,
    ) -> Result<(), ActionError> {
        self.wait_document_ready(&handle.context).await?;
        sleep(self.cfg.settle).await;

        let deadline = Instant::now() + self.cfg.poll.timeout;
        loop {
            if self
                .driver
                .is_displayed(&handle.context, &handle.element)
                .await?
            {
                break;
            }
            if Instant::now() + self.cfg.poll.interval > deadline {
                return Err(ActionError::NotInteractable {
                    detail: self.describe(handle).await,
                });
            }
            sleep(self.cfg.poll.interval).await;
        }

        if require_enabled {
            loop {
                if self
                    .driver
                    .is_enabled(&handle.context, &handle.element)
                    .await?
                {
                    break;
                }
                if Instant::now() + self.cfg.poll.interval > deadline {
                    return Err(ActionError::NotEnabled {
                        detail: self.describe(handle).await,
                    });
                }
                sleep(self.cfg.poll.interval).await;
            }
        }
        Ok(())
    }

    async fn wait_document_ready(&self, ctx: &ContextId) -> Result<(), ActionError> {
        let deadline = Instant::now() + self.cfg.poll.timeout;
        loop {
            if self.driver.document_ready(ctx).await? {
                return Ok(());
            }
            if Instant::now() + self.cfg.poll.interval > deadline {
                return Err(ActionError::WaitTimeout(format!(
                    "document in {ctx} never reached ready state"
                )));
            }
            sleep(self.cfg.poll.interval).await;
        }
    }

    /// Best-effort element description for failure messages. The attribute
    /// lookup itself may fail; that secondary error is swallowed.
    async fn describe(&self, handle: &ElementHandle) -> String {
        match self
            .driver
            .attribute(&handle.context, &handle.element, "data-testid")
            .await
        {
            Ok(Some(test_id)) => format!("{} (data-testid={test_id})", handle.selector),
            _ => handle.selector.to_string(),
        }
    }

    fn enriched_failure(&self, handle: &ElementHandle, err: wd_adapter::DriverError) -> ActionError {
        debug!(target = %handle, error = %err, "action failed");
        ActionError::Driver(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ui_locator::ElementLocator;
    use wd_adapter::{ElementSpec, FakeDriver};
    use webpilot_core_types::Selector;

    fn fast_cfg() -> ExecutorConfig {
        ExecutorConfig {
            settle: Duration::from_millis(1),
            poll: PollConfig::new(Duration::from_millis(100), Duration::from_millis(2)),
        }
    }

    async fn locate(
        driver: &Arc<FakeDriver>,
        ctx: &ContextId,
        selector: Selector,
    ) -> ElementHandle {
        ElementLocator::new(driver.clone())
            .locate(ctx, &selector, &fast_cfg().poll)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn click_goes_through_after_settle() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        driver.add_element(&ctx, ElementSpec::new().with_test_id("unlock"));
        let executor = ActionExecutor::with_config(driver.clone(), fast_cfg());

        let handle = locate(&driver, &ctx, Selector::test_id("unlock")).await;
        executor.click(&handle).await.unwrap();
        assert_eq!(driver.clicks(), vec!["unlock".to_string()]);
    }

    #[tokio::test]
    async fn click_on_disabled_element_reports_test_id() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        driver.add_element(&ctx, ElementSpec::new().with_test_id("submit").disabled());
        let executor = ActionExecutor::with_config(driver.clone(), fast_cfg());

        let handle = locate(&driver, &ctx, Selector::test_id("submit")).await;
        let err = executor.click(&handle).await.unwrap_err();
        match err {
            ActionError::NotEnabled { detail } => assert!(detail.contains("submit")),
            other => panic!("expected NotEnabled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn type_text_lands_in_element() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let input = driver.add_element(&ctx, ElementSpec::new().with_test_id("seed-input"));
        let executor = ActionExecutor::with_config(driver.clone(), fast_cfg());

        let handle = locate(&driver, &ctx, Selector::test_id("seed-input")).await;
        executor.type_text(&handle, "abandon ability able").await.unwrap();
        assert_eq!(
            driver.element_value(&ctx, &input).unwrap(),
            "abandon ability able"
        );
    }

    #[tokio::test]
    async fn clear_empties_element_value() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let input = driver.add_element(&ctx, ElementSpec::new().with_test_id("password"));
        let executor = ActionExecutor::with_config(driver.clone(), fast_cfg());

        let handle = locate(&driver, &ctx, Selector::test_id("password")).await;
        executor.type_text(&handle, "hunter2").await.unwrap();
        executor.clear(&handle).await.unwrap();
        assert_eq!(driver.element_value(&ctx, &input).unwrap(), "");
    }

    #[tokio::test]
    async fn type_into_focused_sends_raw_keystrokes() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let field = driver.add_element(&ctx, ElementSpec::new().with_test_id("search"));
        driver.set_tab_order(&ctx, &["search"]);
        let executor = ActionExecutor::with_config(driver.clone(), fast_cfg());

        // Focus via keyboard, then type with no element handle.
        driver
            .dispatch_keys(
                &ctx,
                &KeySequence::tap(wd_adapter::KeyInput::Named(wd_adapter::Key::Tab)),
            )
            .await
            .unwrap();
        executor.type_into_focused(&ctx, "usdc").await.unwrap();
        assert_eq!(driver.element_value(&ctx, &field).unwrap(), "usdc");
    }
}
