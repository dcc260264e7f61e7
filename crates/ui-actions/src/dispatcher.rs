//! Shortcut dispatcher.
//!
//! Translates logical key requests into wire key-action sequences. Repeated
//! presses go out as a concurrent burst by default, which mirrors how the
//! automation scripts this replaces fired them; `Serial` is available for
//! UIs whose debouncing races with the burst.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use wd_adapter::{Key, KeyInput, KeySequence, WireDriver};
use webpilot_core_types::ContextId;

use crate::errors::ActionError;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// All repeats in flight at once.
    #[default]
    Burst,
    /// One dispatch at a time, each awaited before the next.
    Serial,
}

pub struct ShortcutDispatcher {
    driver: Arc<dyn WireDriver>,
    mode: DispatchMode,
}

impl ShortcutDispatcher {
    pub fn new(driver: Arc<dyn WireDriver>) -> Self {
        Self {
            driver,
            mode: DispatchMode::default(),
        }
    }

    pub fn with_mode(driver: Arc<dyn WireDriver>, mode: DispatchMode) -> Self {
        Self { driver, mode }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Dispatch `repeat` independent presses of a single key.
    pub async fn perform(
        &self,
        ctx: &ContextId,
        input: KeyInput,
        repeat: usize,
    ) -> Result<(), ActionError> {
        if repeat == 0 {
            return Ok(());
        }
        let sequence = KeySequence::tap(input);
        debug!(context = %ctx, keys = %sequence, repeat, mode = ?self.mode, "dispatching shortcut");

        match self.mode {
            DispatchMode::Burst => {
                let dispatches =
                    (0..repeat).map(|_| self.driver.dispatch_keys(ctx, &sequence));
                for outcome in join_all(dispatches).await {
                    outcome.map_err(|err| self.raise(&sequence, err))?;
                }
            }
            DispatchMode::Serial => {
                for _ in 0..repeat {
                    self.driver
                        .dispatch_keys(ctx, &sequence)
                        .await
                        .map_err(|err| self.raise(&sequence, err))?;
                }
            }
        }
        Ok(())
    }

    /// Dispatch a modifier chord as one atomic sequence:
    /// key-down(modifier), key, key-up(modifier).
    pub async fn perform_chord(
        &self,
        ctx: &ContextId,
        modifier: Key,
        input: KeyInput,
    ) -> Result<(), ActionError> {
        let sequence = KeySequence::chord(modifier, input);
        debug!(context = %ctx, keys = %sequence, "dispatching chord");
        self.driver
            .dispatch_keys(ctx, &sequence)
            .await
            .map_err(|err| self.raise(&sequence, err))?;
        Ok(())
    }

    /// Log with the offending keys and re-raise. Never swallowed: a missed
    /// shortcut silently desyncs keyboard-driven navigation.
    fn raise(&self, sequence: &KeySequence, err: wd_adapter::DriverError) -> ActionError {
        error!(keys = %sequence.label(), error = %err, "shortcut dispatch failed");
        ActionError::DispatchFailed {
            keys: sequence.label().to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wd_adapter::{FakeDriver, KeyPulse};

    #[tokio::test]
    async fn repeat_issues_independent_dispatches() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let dispatcher = ShortcutDispatcher::new(driver.clone());

        dispatcher
            .perform(&ctx, KeyInput::Named(Key::Tab), 3)
            .await
            .unwrap();
        assert_eq!(driver.tab_presses(), 3);
    }

    #[tokio::test]
    async fn serial_mode_matches_burst_counts() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let dispatcher = ShortcutDispatcher::with_mode(driver.clone(), DispatchMode::Serial);

        dispatcher
            .perform(&ctx, KeyInput::Named(Key::ArrowDown), 4)
            .await
            .unwrap();
        let down = Key::ArrowDown.code();
        let presses = driver
            .key_log()
            .iter()
            .filter(|p| matches!(p, KeyPulse::Down(c) if *c == down))
            .count();
        assert_eq!(presses, 4);
    }

    #[tokio::test]
    async fn literal_character_dispatches_unchanged() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let dispatcher = ShortcutDispatcher::new(driver.clone());

        dispatcher
            .perform(&ctx, KeyInput::Char('j'), 1)
            .await
            .unwrap();
        assert!(driver
            .key_log()
            .iter()
            .any(|p| matches!(p, KeyPulse::Down('j'))));
    }

    #[tokio::test]
    async fn chord_is_one_atomic_sequence() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let dispatcher = ShortcutDispatcher::new(driver.clone());

        dispatcher
            .perform_chord(&ctx, Key::Meta, KeyInput::Named(Key::Enter))
            .await
            .unwrap();
        let log = driver.key_log();
        assert_eq!(
            log,
            vec![
                KeyPulse::Down(Key::Meta.code()),
                KeyPulse::Down(Key::Enter.code()),
                KeyPulse::Up(Key::Enter.code()),
                KeyPulse::Up(Key::Meta.code()),
            ]
        );
    }

    #[tokio::test]
    async fn dispatch_failure_is_reraised_with_key_names() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://wallet.test/popup.html");
        let dispatcher = ShortcutDispatcher::new(driver.clone());

        driver.kill();
        let err = dispatcher
            .perform(&ctx, KeyInput::Named(Key::Enter), 1)
            .await
            .unwrap_err();
        match err {
            ActionError::DispatchFailed { keys, .. } => assert_eq!(keys, "ENTER"),
            other => panic!("expected DispatchFailed, got {other:?}"),
        }
    }
}
