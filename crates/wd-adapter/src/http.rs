//! W3C WebDriver wire-protocol implementation of [`WireDriver`].
//!
//! JSON-over-HTTP against a driver endpoint (chromedriver, geckodriver, or
//! a Selenium hub). Commands that have no wire endpoint (ready-state,
//! identity tags) go through `execute/sync`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use webpilot_core_types::{ContextId, ElementId, Selector};

use crate::driver::WireDriver;
use crate::error::{DriverError, DriverErrorKind};
use crate::keys::{KeyPulse, KeySequence};
use crate::metrics;

/// W3C element identifier key in wire payloads.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const IDENTITY_TAGS_SCRIPT: &str = "\
const root = arguments[0];\n\
const tags = [];\n\
const own = root.getAttribute && root.getAttribute('data-testid');\n\
if (own) { tags.push(own); }\n\
if (root.querySelectorAll) {\n\
  for (const node of root.querySelectorAll('[data-testid]')) {\n\
    tags.push(node.getAttribute('data-testid'));\n\
  }\n\
}\n\
return tags;";

#[derive(Clone, Debug)]
pub struct HttpDriverConfig {
    /// Remote end base URL, e.g. `http://localhost:9515`.
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// WebDriver client bound to one remote session.
pub struct HttpDriver {
    http: reqwest::Client,
    base: String,
    session: RwLock<Option<String>>,
    current: RwLock<Option<ContextId>>,
}

impl HttpDriver {
    /// Establish a session against the remote end.
    pub async fn connect(
        cfg: HttpDriverConfig,
        capabilities: Value,
    ) -> Result<Self, DriverError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|err| {
                DriverError::new(DriverErrorKind::Wire).with_hint(err.to_string())
            })?;

        let driver = Self {
            http,
            base: cfg.endpoint.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            current: RwLock::new(None),
        };

        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let value = driver
            .raw_cmd("new-session", Method::POST, "session", Some(body))
            .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::Protocol)
                    .with_hint("new session response carried no sessionId")
            })?
            .to_string();

        debug!(session = %session_id, endpoint = %driver.base, "webdriver session established");
        *driver.session.write() = Some(session_id);
        Ok(driver)
    }

    fn session_id(&self) -> Result<String, DriverError> {
        self.session.read().clone().ok_or_else(|| {
            DriverError::new(DriverErrorKind::SessionLost).with_hint("no active session")
        })
    }

    async fn raw_cmd(
        &self,
        command: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        metrics::record_command(command);
        let url = format!("{}/{}", self.base, path);
        let mut request = self.http.request(method.clone(), url.as_str());
        if method == Method::POST {
            // The wire protocol requires a JSON body on every POST.
            request = request.json(body.as_ref().unwrap_or(&json!({})));
        }

        let response = request.send().await.map_err(|err| {
            metrics::record_failure(command, DriverErrorKind::Wire.name());
            DriverError::new(DriverErrorKind::Wire)
                .with_hint(err.to_string())
                .retriable(true)
        })?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|err| {
            metrics::record_failure(command, DriverErrorKind::Protocol.name());
            DriverError::new(DriverErrorKind::Protocol).with_hint(err.to_string())
        })?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            let (kind, hint) = match value.get("error").and_then(Value::as_str) {
                Some(code) => (
                    DriverErrorKind::from_wire(code),
                    value
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                ),
                None => (
                    DriverErrorKind::Protocol,
                    Some(format!("http status {status}")),
                ),
            };
            metrics::record_failure(command, kind.name());
            warn!(command, error = %kind, "webdriver command failed");
            let mut err = DriverError::new(kind);
            if let Some(hint) = hint {
                err = err.with_hint(hint);
            }
            return Err(err);
        }

        Ok(value)
    }

    async fn cmd(
        &self,
        command: &'static str,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let session = self.session_id()?;
        let path = if suffix.is_empty() {
            format!("session/{session}")
        } else {
            format!("session/{session}/{suffix}")
        };
        self.raw_cmd(command, method, &path, body).await
    }

    /// Switch the remote end's current window to `ctx` if it is not already.
    async fn ensure_current(&self, ctx: &ContextId) -> Result<(), DriverError> {
        let already = self.current.read().as_ref() == Some(ctx);
        if already {
            return Ok(());
        }
        self.cmd(
            "switch-window",
            Method::POST,
            "window",
            Some(json!({ "handle": ctx.as_str() })),
        )
        .await?;
        *self.current.write() = Some(ctx.clone());
        Ok(())
    }

    async fn execute_sync(
        &self,
        ctx: &ContextId,
        script: &str,
        args: Value,
    ) -> Result<Value, DriverError> {
        self.ensure_current(ctx).await?;
        self.cmd(
            "execute-sync",
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }
}

fn element_from_value(value: &Value) -> Result<ElementId, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint("element payload missing the W3C identifier key")
        })
}

fn element_arg(element: &ElementId) -> Value {
    json!({ ELEMENT_KEY: element.as_str() })
}

#[async_trait]
impl WireDriver for HttpDriver {
    async fn status(&self) -> Result<(), DriverError> {
        let value = self.raw_cmd("status", Method::GET, "status", None).await?;
        if value.get("ready").and_then(Value::as_bool) == Some(false) {
            return Err(DriverError::new(DriverErrorKind::Wire)
                .with_hint("remote end reports not ready")
                .retriable(true));
        }
        // Probe the session itself; "invalid session id" maps to SessionLost.
        let session = self.session.read().clone();
        if let Some(session) = session {
            self.raw_cmd(
                "session-probe",
                Method::GET,
                &format!("session/{session}/url"),
                None,
            )
            .await?;
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<ContextId, DriverError> {
        let value = self
            .cmd(
                "new-window",
                Method::POST,
                "window/new",
                Some(json!({ "type": "tab" })),
            )
            .await?;
        let handle = value
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::Protocol)
                    .with_hint("new window response carried no handle")
            })?;
        let ctx = ContextId::new(handle);
        self.switch_to(&ctx).await?;
        self.navigate(&ctx, url).await?;
        Ok(ctx)
    }

    async fn navigate(&self, ctx: &ContextId, url: &str) -> Result<(), DriverError> {
        self.ensure_current(ctx).await?;
        self.cmd(
            "navigate",
            Method::POST,
            "url",
            Some(json!({ "url": url })),
        )
        .await?;
        Ok(())
    }

    async fn current_url(&self, ctx: &ContextId) -> Result<String, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self.cmd("current-url", Method::GET, "url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::Protocol).with_hint("url payload was not a string")
            })
    }

    async fn window_handles(&self) -> Result<Vec<ContextId>, DriverError> {
        let value = self
            .cmd("window-handles", Method::GET, "window/handles", None)
            .await?;
        let handles = value.as_array().ok_or_else(|| {
            DriverError::new(DriverErrorKind::Protocol).with_hint("handles payload was not a list")
        })?;
        Ok(handles
            .iter()
            .filter_map(Value::as_str)
            .map(ContextId::new)
            .collect())
    }

    async fn switch_to(&self, ctx: &ContextId) -> Result<(), DriverError> {
        self.cmd(
            "switch-window",
            Method::POST,
            "window",
            Some(json!({ "handle": ctx.as_str() })),
        )
        .await?;
        *self.current.write() = Some(ctx.clone());
        Ok(())
    }

    async fn close_window(&self, ctx: &ContextId) -> Result<(), DriverError> {
        self.ensure_current(ctx).await?;
        self.cmd("close-window", Method::DELETE, "window", None)
            .await?;
        *self.current.write() = None;
        Ok(())
    }

    async fn find(
        &self,
        ctx: &ContextId,
        selector: &Selector,
    ) -> Result<Vec<ElementId>, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self
            .cmd(
                "find-elements",
                Method::POST,
                "elements",
                Some(json!({
                    "using": selector.strategy(),
                    "value": selector.expression(),
                })),
            )
            .await?;
        let matches = value.as_array().ok_or_else(|| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint("find response payload was not a list")
        })?;
        matches.iter().map(element_from_value).collect()
    }

    async fn is_displayed(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<bool, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self
            .cmd(
                "is-displayed",
                Method::GET,
                &format!("element/{}/displayed", element.as_str()),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<bool, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self
            .cmd(
                "is-enabled",
                Method::GET,
                &format!("element/{}/enabled", element.as_str()),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, ctx: &ContextId, element: &ElementId) -> Result<(), DriverError> {
        self.ensure_current(ctx).await?;
        self.cmd(
            "click",
            Method::POST,
            &format!("element/{}/click", element.as_str()),
            None,
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, ctx: &ContextId, element: &ElementId) -> Result<(), DriverError> {
        self.ensure_current(ctx).await?;
        self.cmd(
            "clear",
            Method::POST,
            &format!("element/{}/clear", element.as_str()),
            None,
        )
        .await?;
        Ok(())
    }

    async fn send_text(
        &self,
        ctx: &ContextId,
        element: &ElementId,
        text: &str,
    ) -> Result<(), DriverError> {
        self.ensure_current(ctx).await?;
        self.cmd(
            "send-keys",
            Method::POST,
            &format!("element/{}/value", element.as_str()),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn active_element(&self, ctx: &ContextId) -> Result<Option<ElementId>, DriverError> {
        self.ensure_current(ctx).await?;
        match self
            .cmd("active-element", Method::GET, "element/active", None)
            .await
        {
            Ok(value) => element_from_value(&value).map(Some),
            Err(err) if err.kind == DriverErrorKind::NoSuchElement => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn identity_tags(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<Vec<String>, DriverError> {
        let value = self
            .execute_sync(ctx, IDENTITY_TAGS_SCRIPT, json!([element_arg(element)]))
            .await?;
        let tags = value.as_array().ok_or_else(|| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint("identity tag payload was not a list")
        })?;
        Ok(tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    async fn attribute(
        &self,
        ctx: &ContextId,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self
            .cmd(
                "attribute",
                Method::GET,
                &format!("element/{}/attribute/{name}", element.as_str()),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn text(&self, ctx: &ContextId, element: &ElementId) -> Result<String, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self
            .cmd(
                "element-text",
                Method::GET,
                &format!("element/{}/text", element.as_str()),
                None,
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn document_ready(&self, ctx: &ContextId) -> Result<bool, DriverError> {
        let value = self
            .execute_sync(ctx, "return document.readyState;", json!([]))
            .await?;
        Ok(value.as_str() == Some("complete"))
    }

    async fn dispatch_keys(
        &self,
        ctx: &ContextId,
        sequence: &KeySequence,
    ) -> Result<(), DriverError> {
        self.ensure_current(ctx).await?;
        let actions: Vec<Value> = sequence
            .pulses()
            .iter()
            .map(|pulse| match pulse {
                KeyPulse::Down(c) => json!({ "type": "keyDown", "value": c.to_string() }),
                KeyPulse::Up(c) => json!({ "type": "keyUp", "value": c.to_string() }),
            })
            .collect();
        self.cmd(
            "perform-actions",
            Method::POST,
            "actions",
            Some(json!({
                "actions": [{
                    "type": "key",
                    "id": "webpilot-keyboard",
                    "actions": actions,
                }]
            })),
        )
        .await?;
        Ok(())
    }

    async fn screenshot(&self, ctx: &ContextId) -> Result<Vec<u8>, DriverError> {
        self.ensure_current(ctx).await?;
        let value = self
            .cmd("screenshot", Method::GET, "screenshot", None)
            .await?;
        let encoded = value.as_str().ok_or_else(|| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint("screenshot payload was not a string")
        })?;
        Base64.decode(encoded).map_err(|err| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint(format!("screenshot payload was not base64: {err}"))
        })
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let session = self.session.read().clone();
        if let Some(session) = session {
            self.raw_cmd(
                "delete-session",
                Method::DELETE,
                &format!("session/{session}"),
                None,
            )
            .await?;
        }
        *self.session.write() = None;
        *self.current.write() = None;
        Ok(())
    }
}
