//! Locator implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, trace};

use wd_adapter::WireDriver;
use webpilot_core_types::{ContextId, ElementHandle, PollConfig, Selector};

use crate::errors::LocateError;

/// Polls a context for a selector until present and visible.
pub struct ElementLocator {
    driver: Arc<dyn WireDriver>,
}

impl ElementLocator {
    pub fn new(driver: Arc<dyn WireDriver>) -> Self {
        Self { driver }
    }

    /// Locate an element: document ready, then existence, then visibility,
    /// all under one shared deadline derived from `poll.timeout`.
    pub async fn locate(
        &self,
        ctx: &ContextId,
        selector: &Selector,
        poll: &PollConfig,
    ) -> Result<ElementHandle, LocateError> {
        let started = Instant::now();
        let deadline = started + poll.timeout;

        // Document ready gate shares the locate budget.
        loop {
            if self.driver.document_ready(ctx).await? {
                break;
            }
            if Instant::now() + poll.interval > deadline {
                return Err(LocateError::NotFound {
                    selector: selector.clone(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            trace!(context = %ctx, "document not ready yet");
            sleep(poll.interval).await;
        }

        // Existence.
        let element = loop {
            let mut matches = self.driver.find(ctx, selector).await?;
            if !matches.is_empty() {
                break matches.remove(0);
            }
            if Instant::now() + poll.interval > deadline {
                debug!(selector = %selector, "existence polling timed out");
                return Err(LocateError::NotFound {
                    selector: selector.clone(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            sleep(poll.interval).await;
        };

        // Visibility, within the same total budget.
        loop {
            if self.driver.is_displayed(ctx, &element).await? {
                return Ok(ElementHandle::new(
                    element,
                    ctx.clone(),
                    selector.clone(),
                ));
            }
            if Instant::now() + poll.interval > deadline {
                debug!(selector = %selector, "visibility polling timed out");
                return Err(LocateError::NotVisible {
                    selector: selector.clone(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            sleep(poll.interval).await;
        }
    }

    /// Non-throwing presence probe for negative assertions.
    ///
    /// Races a normal locate against a short probe window and reports
    /// presence as a flag. A genuinely absent selector always yields
    /// `false`, however often this is called.
    pub async fn try_locate(
        &self,
        ctx: &ContextId,
        selector: &Selector,
        poll: &PollConfig,
        probe: Duration,
    ) -> bool {
        tokio::select! {
            outcome = self.locate(ctx, selector, poll) => outcome.is_ok(),
            _ = sleep(probe) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wd_adapter::{ElementSpec, FakeDriver};

    fn fast_poll() -> PollConfig {
        PollConfig::new(Duration::from_millis(100), Duration::from_millis(2))
    }

    fn setup() -> (Arc<FakeDriver>, ContextId, ElementLocator) {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html#/home");
        let locator = ElementLocator::new(driver.clone());
        (driver, ctx, locator)
    }

    #[tokio::test]
    async fn locate_returns_visible_element() {
        let (driver, ctx, locator) = setup();
        driver.add_element(&ctx, ElementSpec::new().with_test_id("balance"));

        let handle = locator
            .locate(&ctx, &Selector::test_id("balance"), &fast_poll())
            .await
            .unwrap();
        assert_eq!(handle.context, ctx);
        assert_eq!(handle.selector, Selector::test_id("balance"));
    }

    #[tokio::test]
    async fn locate_polls_through_deferred_reveal() {
        let (driver, ctx, locator) = setup();
        driver.add_element(
            &ctx,
            ElementSpec::new().with_test_id("toast").reveal_after(3),
        );

        let handle = locator
            .locate(&ctx, &Selector::test_id("toast"), &fast_poll())
            .await;
        assert!(handle.is_ok());
    }

    #[tokio::test]
    async fn locate_waits_for_document_ready() {
        let (driver, ctx, locator) = setup();
        driver.add_element(&ctx, ElementSpec::new().with_test_id("balance"));
        driver.set_ready_after(&ctx, 3);

        let handle = locator
            .locate(&ctx, &Selector::test_id("balance"), &fast_poll())
            .await;
        assert!(handle.is_ok());
    }

    #[tokio::test]
    async fn absent_element_times_out_as_not_found() {
        let (_driver, ctx, locator) = setup();
        let started = Instant::now();
        let err = locator
            .locate(&ctx, &Selector::test_id("missing"), &fast_poll())
            .await
            .unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
        // Bounded: must not run far past the configured budget.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn invisible_element_times_out_as_not_visible() {
        let (driver, ctx, locator) = setup();
        driver.add_element(&ctx, ElementSpec::new().with_test_id("spinner").hidden());

        let err = locator
            .locate(&ctx, &Selector::test_id("spinner"), &fast_poll())
            .await
            .unwrap_err();
        assert!(matches!(err, LocateError::NotVisible { .. }));
    }

    #[tokio::test]
    async fn locate_waits_for_visibility() {
        let (driver, ctx, locator) = setup();
        driver.add_element(
            &ctx,
            ElementSpec::new().with_test_id("fade-in").visible_after(3),
        );

        let handle = locator
            .locate(&ctx, &Selector::test_id("fade-in"), &fast_poll())
            .await;
        assert!(handle.is_ok());
    }

    #[tokio::test]
    async fn try_locate_is_false_for_absent_and_idempotent() {
        let (_driver, ctx, locator) = setup();
        let probe = Duration::from_millis(20);
        for _ in 0..3 {
            let present = locator
                .try_locate(&ctx, &Selector::test_id("ghost"), &fast_poll(), probe)
                .await;
            assert!(!present);
        }
    }

    #[tokio::test]
    async fn try_locate_is_true_for_present() {
        let (driver, ctx, locator) = setup();
        driver.add_element(&ctx, ElementSpec::new().with_test_id("real"));
        let present = locator
            .try_locate(
                &ctx,
                &Selector::test_id("real"),
                &fast_poll(),
                Duration::from_millis(50),
            )
            .await;
        assert!(present);
    }
}
