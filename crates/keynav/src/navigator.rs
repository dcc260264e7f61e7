//! Navigator state machine.

use std::sync::Arc;

use tracing::{debug, info};

use ui_actions::ShortcutDispatcher;
use wd_adapter::{Key, KeyInput, WireDriver};
use webpilot_core_types::ContextId;

use crate::errors::NavError;

/// Traversal bounds.
#[derive(Clone, Copy, Debug)]
pub struct NavLimits {
    /// Maximum focus moves before giving up with `TargetUnreachable`.
    pub max_steps: usize,
}

impl Default for NavLimits {
    fn default() -> Self {
        Self { max_steps: 50 }
    }
}

/// Successful traversal summary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NavOutcome {
    /// Focus moves it took to reach the target.
    pub steps: usize,
}

pub struct KeyboardNavigator {
    driver: Arc<dyn WireDriver>,
    dispatcher: Arc<ShortcutDispatcher>,
}

impl KeyboardNavigator {
    pub fn new(driver: Arc<dyn WireDriver>, dispatcher: Arc<ShortcutDispatcher>) -> Self {
        Self { driver, dispatcher }
    }

    /// Tab until the focused element (or one of its descendants) carries
    /// `target_tag`. Leaves focus on the match without activating it.
    pub async fn focus_on(
        &self,
        ctx: &ContextId,
        target_tag: &str,
        limits: &NavLimits,
    ) -> Result<NavOutcome, NavError> {
        for step in 1..=limits.max_steps {
            self.dispatcher
                .perform(ctx, KeyInput::Named(Key::Tab), 1)
                .await?;

            let Some(active) = self.driver.active_element(ctx).await? else {
                debug!(step, "no element focused yet");
                continue;
            };
            let tags = self.driver.identity_tags(ctx, &active).await?;
            debug!(step, ?tags, "inspecting focused element");

            if tags.iter().any(|tag| tag == target_tag) {
                info!(target = target_tag, steps = step, "focus reached target");
                return Ok(NavOutcome { steps: step });
            }
        }
        Err(NavError::TargetUnreachable {
            tag: target_tag.to_string(),
            steps: limits.max_steps,
        })
    }

    /// Tab to the target, then send exactly one activation key.
    pub async fn navigate_to(
        &self,
        ctx: &ContextId,
        target_tag: &str,
        limits: &NavLimits,
    ) -> Result<NavOutcome, NavError> {
        let outcome = self.focus_on(ctx, target_tag, limits).await?;
        self.dispatcher
            .perform(ctx, KeyInput::Named(Key::Enter), 1)
            .await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wd_adapter::{ElementSpec, FakeDriver, FakeEffect};

    fn setup(tags: &[&str]) -> (Arc<FakeDriver>, ContextId, KeyboardNavigator) {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html#/home");
        for tag in tags {
            driver.add_element(&ctx, ElementSpec::new().with_test_id(*tag));
        }
        driver.set_tab_order(&ctx, tags);
        let dispatcher = Arc::new(ShortcutDispatcher::new(driver.clone()));
        let navigator = KeyboardNavigator::new(driver.clone(), dispatcher);
        (driver, ctx, navigator)
    }

    #[tokio::test]
    async fn reaches_target_in_exactly_n_steps_with_one_activation() {
        let (driver, ctx, navigator) = setup(&["home", "assets", "settings"]);

        let outcome = navigator
            .navigate_to(&ctx, "settings", &NavLimits::default())
            .await
            .unwrap();

        assert_eq!(outcome.steps, 3);
        assert_eq!(driver.tab_presses(), 3);
        assert_eq!(driver.activations(), vec!["settings".to_string()]);
    }

    #[tokio::test]
    async fn matches_descendant_identity_tags() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html#/home");
        driver.add_element(
            &ctx,
            ElementSpec::new()
                .with_test_id("asset-row")
                .with_child_tag("asset-row-symbol"),
        );
        driver.set_tab_order(&ctx, &["asset-row"]);
        let dispatcher = Arc::new(ShortcutDispatcher::new(driver.clone()));
        let navigator = KeyboardNavigator::new(driver.clone(), dispatcher);

        let outcome = navigator
            .focus_on(&ctx, "asset-row-symbol", &NavLimits::default())
            .await
            .unwrap();
        assert_eq!(outcome.steps, 1);
        assert!(driver.activations().is_empty());
    }

    #[tokio::test]
    async fn unreachable_target_fails_at_the_bound() {
        let (driver, ctx, navigator) = setup(&["home", "assets"]);

        let limits = NavLimits { max_steps: 7 };
        let err = navigator
            .navigate_to(&ctx, "nonexistent", &limits)
            .await
            .unwrap_err();

        match err {
            NavError::TargetUnreachable { tag, steps } => {
                assert_eq!(tag, "nonexistent");
                assert_eq!(steps, 7);
            }
            other => panic!("expected TargetUnreachable, got {other:?}"),
        }
        // Bound respected: no runaway tabbing, no activation sent.
        assert_eq!(driver.tab_presses(), 7);
        assert!(driver.activations().is_empty());
    }

    #[tokio::test]
    async fn activation_effect_fires_on_navigate() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html#/home");
        driver.add_element(
            &ctx,
            ElementSpec::new()
                .with_test_id("nav-settings")
                .on_activate(FakeEffect::SetUrl(
                    "https://wallet.test/popup.html#/settings".into(),
                )),
        );
        driver.set_tab_order(&ctx, &["nav-settings"]);
        let dispatcher = Arc::new(ShortcutDispatcher::new(driver.clone()));
        let navigator = KeyboardNavigator::new(driver.clone(), dispatcher);

        navigator
            .navigate_to(&ctx, "nav-settings", &NavLimits::default())
            .await
            .unwrap();
        assert!(driver.url_of(&ctx).unwrap().contains("settings"));
    }
}
