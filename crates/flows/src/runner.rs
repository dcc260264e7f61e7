//! Flow implementations.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::sleep;
use tracing::{info, warn};

use keynav::{KeyboardNavigator, NavLimits};
use ui_actions::{ActionError, ActionExecutor, DispatchMode, ExecutorConfig, ShortcutDispatcher};
use ui_locator::ElementLocator;
use wd_adapter::{Key, KeyInput, WireDriver};
use webpilot_core_types::{ContextId, ContextRole, ElementHandle, PollConfig, Selector};
use webpilot_registry::ContextRegistry;

use crate::errors::{FlowError, StepFailure};
use crate::types::{is_shortened_address, FlowCtx, FlowReport, PrivateKey, SeedPhrase};

// Extension popup test-ids.
const IMPORT_SEED_START: &str = "import-wallet-seed";
const IMPORT_KEY_START: &str = "import-wallet-key";
const SEED_INPUT: &str = "seed-phrase-input";
const KEY_INPUT: &str = "private-key-input";
const IMPORT_SUBMIT: &str = "import-submit";
const WALLET_READY: &str = "wallet-ready";
const ACCOUNT_ADDRESS: &str = "account-address";
const POPUP_APPROVE: &str = "approve-connect";
const NAV_SETTINGS: &str = "nav-settings";

// Counterpart dapp page uses plain ids.
const DAPP_CONNECT: &str = "connect";
const DAPP_ACCOUNTS: &str = "accounts";

/// Runs composed scenario procedures against one session.
///
/// Holds no context state of its own; "current" is always re-derived from
/// the registry so windows opening and closing cannot leave a flow with a
/// stale handle.
pub struct FlowRunner {
    driver: Arc<dyn WireDriver>,
    registry: Arc<ContextRegistry>,
    locator: ElementLocator,
    executor: ActionExecutor,
    dispatcher: Arc<ShortcutDispatcher>,
    navigator: KeyboardNavigator,
    poll: PollConfig,
    nav_limits: NavLimits,
}

impl FlowRunner {
    pub fn new(
        driver: Arc<dyn WireDriver>,
        registry: Arc<ContextRegistry>,
        exec_cfg: ExecutorConfig,
        mode: DispatchMode,
        nav_limits: NavLimits,
    ) -> Self {
        let locator = ElementLocator::new(driver.clone());
        let executor = ActionExecutor::with_config(driver.clone(), exec_cfg);
        let dispatcher = Arc::new(ShortcutDispatcher::with_mode(driver.clone(), mode));
        let navigator = KeyboardNavigator::new(driver.clone(), dispatcher.clone());
        Self {
            driver,
            registry,
            locator,
            executor,
            dispatcher,
            navigator,
            poll: exec_cfg.poll,
            nav_limits,
        }
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    pub fn locator(&self) -> &ElementLocator {
        &self.locator
    }

    // ---- flows ----------------------------------------------------------

    /// Import a wallet from a recovery phrase and verify the terminal
    /// state: the ready confirmation is visible and the account address is
    /// displayed shortened.
    pub async fn import_wallet_by_seed(
        &self,
        fctx: &FlowCtx,
        popup: &ContextId,
        phrase: &SeedPhrase,
    ) -> Result<FlowReport, FlowError> {
        let (mut report, started) = FlowReport::begin("import-wallet-seed");
        info!(flow = report.flow, words = phrase.word_count(), "starting flow");

        self.switch_step(fctx, &mut report, popup).await?;
        self.click_step(fctx, &mut report, "open-import", popup, Selector::test_id(IMPORT_SEED_START))
            .await?;
        self.type_step(
            fctx,
            &mut report,
            "enter-phrase",
            popup,
            Selector::test_id(SEED_INPUT),
            phrase.as_str(),
        )
        .await?;
        self.click_step(fctx, &mut report, "submit", popup, Selector::test_id(IMPORT_SUBMIT))
            .await?;
        self.step(fctx, &mut report, "wallet-ready", async {
            self.locator
                .locate(popup, &Selector::test_id(WALLET_READY), &self.poll)
                .await?;
            Ok::<_, StepFailure>(())
        })
        .await?;
        self.verify_shortened_address(fctx, &mut report, popup).await?;

        Ok(report.finish_ok(started))
    }

    /// Import a wallet from a raw private key; same terminal checks as the
    /// seed path.
    pub async fn import_wallet_by_private_key(
        &self,
        fctx: &FlowCtx,
        popup: &ContextId,
        key: &PrivateKey,
    ) -> Result<FlowReport, FlowError> {
        let (mut report, started) = FlowReport::begin("import-wallet-key");
        info!(flow = report.flow, "starting flow");

        self.switch_step(fctx, &mut report, popup).await?;
        self.click_step(fctx, &mut report, "open-import", popup, Selector::test_id(IMPORT_KEY_START))
            .await?;
        self.type_step(
            fctx,
            &mut report,
            "enter-key",
            popup,
            Selector::test_id(KEY_INPUT),
            key.as_str(),
        )
        .await?;
        self.click_step(fctx, &mut report, "submit", popup, Selector::test_id(IMPORT_SUBMIT))
            .await?;
        self.step(fctx, &mut report, "wallet-ready", async {
            self.locator
                .locate(popup, &Selector::test_id(WALLET_READY), &self.poll)
                .await?;
            Ok::<_, StepFailure>(())
        })
        .await?;
        self.verify_shortened_address(fctx, &mut report, popup).await?;

        Ok(report.finish_ok(started))
    }

    /// Connect an external application to the wallet: click the dapp's
    /// connect control, wait for the approval popup to materialize,
    /// approve, and verify the dapp sees an account.
    ///
    /// The caller opens/navigates the dapp surface first and passes its
    /// context; the flow keeps the working set at exactly two contexts,
    /// which is what role classification is specified against.
    pub async fn connect_to_dapp(
        &self,
        fctx: &FlowCtx,
        dapp: &ContextId,
    ) -> Result<FlowReport, FlowError> {
        let (mut report, started) = FlowReport::begin("connect-to-dapp");
        info!(flow = report.flow, dapp = %dapp, "starting flow");

        self.step(fctx, &mut report, "sync-contexts", async {
            self.registry.refresh().await?;
            self.registry.switch_to(dapp).await?;
            self.registry.assign_role(dapp, ContextRole::Dapp)?;
            Ok::<_, StepFailure>(())
        })
        .await?;

        let baseline: Vec<ContextId> = self
            .step(fctx, &mut report, "snapshot-contexts", async {
                let entries = self.registry.refresh().await?;
                Ok::<_, StepFailure>(entries.into_iter().map(|e| e.id).collect())
            })
            .await?;

        self.click_step(fctx, &mut report, "click-connect", dapp, Selector::id(DAPP_CONNECT))
            .await?;

        let popup = self
            .step(fctx, &mut report, "await-popup", async {
                let ctx = self
                    .registry
                    .wait_for_new_context(&baseline, &self.poll)
                    .await?;
                self.registry
                    .assign_role(&ctx, ContextRole::ExtensionPopup)?;
                self.registry.switch_to(&ctx).await?;
                Ok::<_, StepFailure>(ctx)
            })
            .await?;

        self.click_step(fctx, &mut report, "approve", &popup, Selector::test_id(POPUP_APPROVE))
            .await?;

        self.step(fctx, &mut report, "return-to-dapp", async {
            // The popup usually closes itself after approval; reconcile
            // before switching back.
            self.registry.refresh().await?;
            self.registry.switch_to(dapp).await?;
            Ok::<_, StepFailure>(())
        })
        .await?;

        self.step(fctx, &mut report, "verify-accounts", async {
            let handle = self
                .locator
                .locate(dapp, &Selector::id(DAPP_ACCOUNTS), &self.poll)
                .await?;
            let text = self.driver.text(dapp, &handle.element).await?;
            if text.trim().is_empty() {
                return Err(StepFailure::Assertion(
                    "dapp accounts list is empty after approval".to_string(),
                ));
            }
            Ok::<_, StepFailure>(())
        })
        .await?;

        Ok(report.finish_ok(started))
    }

    /// Keyboard-only navigation into the settings section, optionally one
    /// subpage deeper. Verifies the route via URL-substring containment.
    pub async fn navigate_to_settings(
        &self,
        fctx: &FlowCtx,
        popup: &ContextId,
        subpage: Option<&str>,
    ) -> Result<FlowReport, FlowError> {
        let (mut report, started) = FlowReport::begin("navigate-to-settings");
        info!(flow = report.flow, ?subpage, "starting flow");

        self.switch_step(fctx, &mut report, popup).await?;
        self.step(fctx, &mut report, "tab-to-settings", async {
            self.navigator
                .navigate_to(popup, NAV_SETTINGS, &self.nav_limits)
                .await?;
            Ok::<_, StepFailure>(())
        })
        .await?;
        self.step(fctx, &mut report, "verify-route", async {
            self.expect_url_contains(popup, "settings").await
        })
        .await?;

        if let Some(subpage) = subpage {
            let selector = Selector::test_id(subpage.to_string());
            self.click_step(fctx, &mut report, "open-subpage", popup, selector)
                .await?;
        }

        Ok(report.finish_ok(started))
    }

    /// Focus an asset row by keyboard and open the send route with a
    /// Meta+Enter chord; verified via URL-substring containment.
    pub async fn send_via_chord(
        &self,
        fctx: &FlowCtx,
        popup: &ContextId,
        row_tag: &str,
    ) -> Result<FlowReport, FlowError> {
        let (mut report, started) = FlowReport::begin("send-via-chord");
        info!(flow = report.flow, row_tag, "starting flow");

        self.switch_step(fctx, &mut report, popup).await?;
        self.step(fctx, &mut report, "focus-row", async {
            self.navigator
                .focus_on(popup, row_tag, &self.nav_limits)
                .await?;
            Ok::<_, StepFailure>(())
        })
        .await?;
        self.step(fctx, &mut report, "chord-send", async {
            self.dispatcher
                .perform_chord(popup, Key::Meta, KeyInput::Named(Key::Enter))
                .await?;
            Ok::<_, StepFailure>(())
        })
        .await?;
        self.step(fctx, &mut report, "verify-route", async {
            self.expect_url_contains(popup, "send").await
        })
        .await?;

        Ok(report.finish_ok(started))
    }

    // ---- shared step plumbing -------------------------------------------

    async fn step<T>(
        &self,
        fctx: &FlowCtx,
        report: &mut FlowReport,
        name: &'static str,
        outcome: impl Future<Output = Result<T, StepFailure>>,
    ) -> Result<T, FlowError> {
        fctx.check(report.flow)?;
        let started = Instant::now();
        match outcome.await {
            Ok(value) => {
                report.push_step(name, true, started.elapsed());
                Ok(value)
            }
            Err(source) => {
                report.push_step(name, false, started.elapsed());
                warn!(flow = report.flow, step = name, error = %source, "flow step failed");
                Err(FlowError::Step {
                    flow: report.flow,
                    step: name,
                    source,
                })
            }
        }
    }

    async fn switch_step(
        &self,
        fctx: &FlowCtx,
        report: &mut FlowReport,
        ctx: &ContextId,
    ) -> Result<(), FlowError> {
        self.step(fctx, report, "sync-contexts", async {
            self.registry.refresh().await?;
            self.registry.switch_to(ctx).await?;
            Ok::<_, StepFailure>(())
        })
        .await
    }

    async fn click_step(
        &self,
        fctx: &FlowCtx,
        report: &mut FlowReport,
        name: &'static str,
        ctx: &ContextId,
        selector: Selector,
    ) -> Result<ElementHandle, FlowError> {
        self.step(fctx, report, name, async {
            let handle = self.locator.locate(ctx, &selector, &self.poll).await?;
            self.guard(&handle)?;
            self.executor.click(&handle).await?;
            Ok::<_, StepFailure>(handle)
        })
        .await
    }

    async fn type_step(
        &self,
        fctx: &FlowCtx,
        report: &mut FlowReport,
        name: &'static str,
        ctx: &ContextId,
        selector: Selector,
        text: &str,
    ) -> Result<(), FlowError> {
        self.step(fctx, report, name, async {
            let handle = self.locator.locate(ctx, &selector, &self.poll).await?;
            self.guard(&handle)?;
            self.executor.clear(&handle).await?;
            self.executor.type_text(&handle, text).await?;
            Ok::<_, StepFailure>(())
        })
        .await
    }

    async fn verify_shortened_address(
        &self,
        fctx: &FlowCtx,
        report: &mut FlowReport,
        popup: &ContextId,
    ) -> Result<(), FlowError> {
        self.step(fctx, report, "verify-address", async {
            let handle = self
                .locator
                .locate(popup, &Selector::test_id(ACCOUNT_ADDRESS), &self.poll)
                .await?;
            let display = self.driver.text(popup, &handle.element).await?;
            if !is_shortened_address(display.trim()) {
                return Err(StepFailure::Assertion(format!(
                    "account address '{display}' is not in shortened form"
                )));
            }
            Ok::<_, StepFailure>(())
        })
        .await
    }

    /// Element handles must not outlive their context being current.
    fn guard(&self, handle: &ElementHandle) -> Result<(), StepFailure> {
        match self.registry.current() {
            Some(current) if current == handle.context => Ok(()),
            _ => Err(StepFailure::Action(ActionError::StaleHandle(
                handle.to_string(),
            ))),
        }
    }

    /// Poll the context URL until it contains `fragment`.
    async fn expect_url_contains(
        &self,
        ctx: &ContextId,
        fragment: &str,
    ) -> Result<(), StepFailure> {
        let deadline = Instant::now() + self.poll.timeout;
        loop {
            let url = self.driver.current_url(ctx).await?;
            if url.contains(fragment) {
                return Ok(());
            }
            if Instant::now() + self.poll.interval > deadline {
                return Err(StepFailure::Assertion(format!(
                    "url '{url}' does not contain '{fragment}'"
                )));
            }
            sleep(self.poll.interval).await;
        }
    }
}
