//! Session configuration.
//!
//! Layered the usual way: built-in defaults, an optional TOML file, then
//! `WEBPILOT_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use keynav::NavLimits;
use ui_actions::{DispatchMode, ExecutorConfig};
use webpilot_core_types::PollConfig;

use crate::errors::PilotError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// WebDriver remote end, e.g. a chromedriver instance.
    pub webdriver_url: String,
    /// Extension under test; composes popup URLs.
    pub extension_id: String,
    pub extension_scheme: String,
    /// Failure screenshots land here.
    pub artifacts_dir: PathBuf,
    pub poll_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Fixed settle delay absorbing animation timing before actions.
    pub settle_ms: u64,
    /// Whole-flow deadline.
    pub flow_timeout_ms: u64,
    /// Keyboard navigation step bound.
    pub nav_max_steps: usize,
    pub dispatch_mode: DispatchMode,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            extension_id: "nkbihfbeogaeaoehlefnkodbefgpgknn".to_string(),
            extension_scheme: "chrome-extension".to_string(),
            artifacts_dir: PathBuf::from("screenshots"),
            poll_timeout_ms: 10_000,
            poll_interval_ms: 250,
            settle_ms: 250,
            flow_timeout_ms: 120_000,
            nav_max_steps: 50,
            dispatch_mode: DispatchMode::Burst,
        }
    }
}

impl PilotConfig {
    /// Defaults, then the optional file, then `WEBPILOT_*` env overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, PilotError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                config::File::from(file).format(config::FileFormat::Toml),
            );
        }
        builder = builder
            .add_source(config::Environment::with_prefix("WEBPILOT").try_parsing(true));
        let loaded = builder
            .build()
            .map_err(|err| PilotError::Config(err.to_string()))?;

        // Serde defaults fill everything the sources left out.
        loaded
            .try_deserialize()
            .map_err(|err| PilotError::Config(err.to_string()))
    }

    pub fn poll(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_millis(self.poll_timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn executor(&self) -> ExecutorConfig {
        ExecutorConfig {
            settle: Duration::from_millis(self.settle_ms),
            poll: self.poll(),
        }
    }

    pub fn nav_limits(&self) -> NavLimits {
        NavLimits {
            max_steps: self.nav_max_steps,
        }
    }

    pub fn flow_timeout(&self) -> Duration {
        Duration::from_millis(self.flow_timeout_ms)
    }

    /// `<scheme>://<extension-id>/popup.html#/<route>`
    pub fn popup_url(&self, route: &str) -> String {
        let route = route.trim_start_matches('/');
        format!(
            "{}://{}/popup.html#/{}",
            self.extension_scheme, self.extension_id, route
        )
    }
}
