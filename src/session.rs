//! Session object.
//!
//! One `PilotSession` per test suite, constructed explicitly and passed to
//! every flow. On flow failure it captures a full-page screenshot of the
//! current context before propagating the error.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use wd_adapter::{HttpDriver, HttpDriverConfig, WireDriver};
use webpilot_core_types::{ContextId, ContextRole};
use webpilot_flows::{FlowCtx, FlowError, FlowReport, FlowRunner};
use webpilot_registry::ContextRegistry;

use crate::artifacts;
use crate::config::PilotConfig;
use crate::errors::PilotError;

pub struct PilotSession {
    driver: Arc<dyn WireDriver>,
    registry: Arc<ContextRegistry>,
    runner: FlowRunner,
    cfg: PilotConfig,
}

impl PilotSession {
    /// Establish a WebDriver session against the configured remote end.
    pub async fn connect(cfg: PilotConfig) -> Result<Self, PilotError> {
        let capabilities = json!({ "browserName": "chrome" });
        let driver = HttpDriver::connect(
            HttpDriverConfig {
                endpoint: cfg.webdriver_url.clone(),
                ..HttpDriverConfig::default()
            },
            capabilities,
        )
        .await?;
        Ok(Self::with_driver(Arc::new(driver), cfg))
    }

    /// Build a session over any driver implementation. Tests pass the
    /// in-memory fake here.
    pub fn with_driver(driver: Arc<dyn WireDriver>, cfg: PilotConfig) -> Self {
        let registry = Arc::new(ContextRegistry::new(driver.clone()));
        let runner = FlowRunner::new(
            driver.clone(),
            registry.clone(),
            cfg.executor(),
            cfg.dispatch_mode,
            cfg.nav_limits(),
        );
        Self {
            driver,
            registry,
            runner,
            cfg,
        }
    }

    pub fn config(&self) -> &PilotConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    pub fn flows(&self) -> &FlowRunner {
        &self.runner
    }

    pub fn flow_ctx(&self) -> FlowCtx {
        FlowCtx::new(self.cfg.flow_timeout())
    }

    /// Open the extension popup on a client-side route and tag its role.
    pub async fn open_popup(&self, route: &str) -> Result<ContextId, PilotError> {
        let url = self.cfg.popup_url(route);
        let ctx = self.registry.open_context(&url).await?;
        self.registry
            .assign_role(&ctx, ContextRole::ExtensionPopup)?;
        Ok(ctx)
    }

    /// Open an external application surface and tag its role.
    pub async fn open_dapp(&self, url: &str) -> Result<ContextId, PilotError> {
        let ctx = self.registry.open_context(url).await?;
        self.registry.assign_role(&ctx, ContextRole::Dapp)?;
        Ok(ctx)
    }

    /// Run a flow under this session's deadline; on failure, capture a
    /// screenshot named after the scenario, then propagate the error.
    pub async fn run_flow<F, Fut>(
        &self,
        scenario: &str,
        flow: F,
    ) -> Result<FlowReport, PilotError>
    where
        F: FnOnce(FlowCtx) -> Fut,
        Fut: Future<Output = Result<FlowReport, FlowError>>,
    {
        let fctx = self.flow_ctx();
        match flow(fctx).await {
            Ok(report) => {
                info!(scenario, latency_ms = report.latency_ms, "flow succeeded");
                Ok(report)
            }
            Err(err) => {
                self.capture_failure(scenario).await;
                Err(err.into())
            }
        }
    }

    /// Best-effort screenshot of the current context. Capture problems are
    /// logged, never allowed to mask the original failure.
    async fn capture_failure(&self, scenario: &str) {
        let Some(ctx) = self.registry.current() else {
            warn!(scenario, "no current context to screenshot");
            return;
        };
        match self.driver.screenshot(&ctx).await {
            Ok(bytes) => {
                match artifacts::write_screenshot(&self.cfg.artifacts_dir, scenario, &bytes) {
                    Ok(path) => info!(scenario, path = %path.display(), "failure screenshot written"),
                    Err(err) => warn!(scenario, error = %err, "failed to write screenshot"),
                }
            }
            Err(err) => warn!(scenario, error = %err, "failed to capture screenshot"),
        }
    }

    /// Tear the remote session down.
    pub async fn quit(self) -> Result<(), PilotError> {
        self.driver.quit().await?;
        Ok(())
    }
}
