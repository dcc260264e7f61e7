//! Registry implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use wd_adapter::WireDriver;
use webpilot_core_types::{ContextId, ContextRole, PollConfig};

use crate::errors::RegistryError;
use crate::metrics;
use crate::model::ContextEntry;

/// Result of role classification: the two parties of an interaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Classified {
    pub dapp: ContextId,
    pub popup: ContextId,
}

/// Tracks the set of open browser contexts and their roles.
///
/// Thread-safe internally, but a session must still be driven by one
/// logical flow at a time.
pub struct ContextRegistry {
    driver: Arc<dyn WireDriver>,
    entries: DashMap<ContextId, Arc<RwLock<ContextEntry>>>,
    current: RwLock<Option<ContextId>>,
}

impl ContextRegistry {
    pub fn new(driver: Arc<dyn WireDriver>) -> Self {
        Self {
            driver,
            entries: DashMap::new(),
            current: RwLock::new(None),
        }
    }

    /// Session liveness, checked as a precondition of every context
    /// operation rather than special-cased around risky navigations.
    pub async fn ensure_live(&self) -> Result<(), RegistryError> {
        self.driver
            .status()
            .await
            .map_err(RegistryError::from_driver)
    }

    /// Reconcile the registry against the remote end's handle list.
    ///
    /// New handles are admitted with `Unknown` role; entries whose handle
    /// disappeared are dropped. Roles of surviving entries are preserved.
    pub async fn refresh(&self) -> Result<Vec<ContextEntry>, RegistryError> {
        self.ensure_live().await?;
        let handles = self
            .driver
            .window_handles()
            .await
            .map_err(RegistryError::from_driver)?;

        for handle in &handles {
            if !self.entries.contains_key(handle) {
                debug!(context = %handle, "admitting new context");
                self.entries.insert(
                    handle.clone(),
                    Arc::new(RwLock::new(ContextEntry::new(handle.clone()))),
                );
            }
        }
        self.entries.retain(|id, _| handles.contains(id));
        {
            let mut current = self.current.write();
            if let Some(ctx) = current.as_ref() {
                if !handles.contains(ctx) {
                    *current = None;
                }
            }
        }
        metrics::set_context_count(self.entries.len());

        let mut snapshot = Vec::with_capacity(handles.len());
        for handle in &handles {
            if let Some(entry) = self.entries.get(handle) {
                let mut guard = entry.write();
                guard.last_seen = Instant::now();
                snapshot.push(guard.clone());
            }
        }
        Ok(snapshot)
    }

    /// Snapshot of known contexts without touching the wire.
    pub fn contexts(&self) -> Vec<ContextEntry> {
        self.entries
            .iter()
            .map(|entry| entry.value().read().clone())
            .collect()
    }

    pub fn assign_role(&self, ctx: &ContextId, role: ContextRole) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .get(ctx)
            .ok_or_else(|| RegistryError::UnknownContext(ctx.clone()))?;
        let mut guard = entry.write();
        if guard.role != role {
            info!(context = %ctx, role = %role, "context role assigned");
            guard.role = role;
        }
        Ok(())
    }

    pub fn role_of(&self, ctx: &ContextId) -> Option<ContextRole> {
        self.entries.get(ctx).map(|entry| entry.read().role)
    }

    pub fn find_by_role(&self, role: ContextRole) -> Option<ContextId> {
        self.entries
            .iter()
            .find(|entry| entry.value().read().role == role)
            .map(|entry| entry.key().clone())
    }

    /// Resolve the dapp/popup pairing.
    ///
    /// Explicit role tags win. When exactly one context is untagged and the
    /// other party is known, the untagged one is resolved by elimination
    /// and the tag is persisted so later calls need no inference. Any
    /// larger untagged set is a typed error instead of a guess.
    pub async fn classify(
        &self,
        known: Option<(&ContextId, ContextRole)>,
    ) -> Result<Classified, RegistryError> {
        self.refresh().await?;
        if let Some((ctx, role)) = known {
            self.assign_role(ctx, role)?;
        }

        if let (Some(dapp), Some(popup)) = (
            self.find_by_role(ContextRole::Dapp),
            self.find_by_role(ContextRole::ExtensionPopup),
        ) {
            return Ok(Classified { dapp, popup });
        }

        let untagged: Vec<ContextId> = self
            .entries
            .iter()
            .filter(|entry| entry.value().read().role == ContextRole::Unknown)
            .map(|entry| entry.key().clone())
            .collect();

        let known_role = self
            .find_by_role(ContextRole::Dapp)
            .map(|ctx| (ctx, ContextRole::Dapp))
            .or_else(|| {
                self.find_by_role(ContextRole::ExtensionPopup)
                    .map(|ctx| (ctx, ContextRole::ExtensionPopup))
            });

        match (known_role, untagged.as_slice()) {
            (Some((known_ctx, role)), [other]) => {
                let (dapp, popup) = match role {
                    ContextRole::Dapp => {
                        self.assign_role(other, ContextRole::ExtensionPopup)?;
                        (known_ctx, other.clone())
                    }
                    _ => {
                        self.assign_role(other, ContextRole::Dapp)?;
                        (other.clone(), known_ctx)
                    }
                };
                Ok(Classified { dapp, popup })
            }
            _ => Err(RegistryError::AmbiguousContexts {
                count: untagged.len(),
            }),
        }
    }

    pub async fn switch_to(&self, ctx: &ContextId) -> Result<(), RegistryError> {
        self.ensure_live().await?;
        if !self.entries.contains_key(ctx) {
            return Err(RegistryError::UnknownContext(ctx.clone()));
        }
        self.driver
            .switch_to(ctx)
            .await
            .map_err(RegistryError::from_driver)?;
        *self.current.write() = Some(ctx.clone());
        metrics::record_switch();
        Ok(())
    }

    pub fn current(&self) -> Option<ContextId> {
        self.current.read().clone()
    }

    /// Wait for a context that is not in `baseline` to appear.
    ///
    /// Replaces the source's fixed settle delay with polling under the
    /// configured budget; the interval backs off geometrically, capped at
    /// one second.
    pub async fn wait_for_new_context(
        &self,
        baseline: &[ContextId],
        poll: &PollConfig,
    ) -> Result<ContextId, RegistryError> {
        self.ensure_live().await?;
        let started = Instant::now();
        let deadline = started + poll.timeout;
        let mut delay = poll.interval;

        loop {
            let handles = self
                .driver
                .window_handles()
                .await
                .map_err(RegistryError::from_driver)?;
            if let Some(fresh) = handles.iter().find(|h| !baseline.contains(h)) {
                debug!(context = %fresh, "new context materialized");
                self.entries.insert(
                    fresh.clone(),
                    Arc::new(RwLock::new(ContextEntry::new(fresh.clone()))),
                );
                metrics::set_context_count(self.entries.len());
                return Ok(fresh.clone());
            }
            if Instant::now() + delay > deadline {
                let waited_ms = started.elapsed().as_millis() as u64;
                metrics::record_switch_race();
                warn!(waited_ms, "expected context never materialized");
                return Err(RegistryError::SwitchRace { waited_ms });
            }
            sleep(delay).await;
            delay = (delay * 2).min(Duration::from_secs(1));
        }
    }

    /// Navigate with session liveness checked on both sides.
    ///
    /// A context's role is positional, so navigation demotes it back to
    /// `Unknown`; callers that know better re-tag afterwards.
    pub async fn safe_navigate(&self, ctx: &ContextId, url: &str) -> Result<(), RegistryError> {
        self.ensure_live().await?;
        self.driver
            .navigate(ctx, url)
            .await
            .map_err(RegistryError::from_driver)?;
        self.ensure_live().await?;
        if let Some(entry) = self.entries.get(ctx) {
            let mut guard = entry.write();
            guard.url = Some(url.to_string());
            guard.role = ContextRole::Unknown;
        }
        Ok(())
    }

    /// Open a fresh window on `url`, admit it, and make it current.
    pub async fn open_context(&self, url: &str) -> Result<ContextId, RegistryError> {
        self.ensure_live().await?;
        let ctx = self
            .driver
            .open_window(url)
            .await
            .map_err(RegistryError::from_driver)?;
        let mut entry = ContextEntry::new(ctx.clone());
        entry.url = Some(url.to_string());
        self.entries
            .insert(ctx.clone(), Arc::new(RwLock::new(entry)));
        *self.current.write() = Some(ctx.clone());
        metrics::set_context_count(self.entries.len());
        Ok(ctx)
    }

    pub async fn close(&self, ctx: &ContextId) -> Result<(), RegistryError> {
        self.ensure_live().await?;
        self.driver
            .close_window(ctx)
            .await
            .map_err(RegistryError::from_driver)?;
        self.entries.remove(ctx);
        let mut current = self.current.write();
        if current.as_ref() == Some(ctx) {
            *current = None;
        }
        metrics::set_context_count(self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wd_adapter::{DriverErrorKind, FakeDriver};

    fn fast_poll() -> PollConfig {
        PollConfig::new(Duration::from_millis(200), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn refresh_admits_and_drops_contexts() {
        let driver = Arc::new(FakeDriver::new());
        let a = driver.add_window("https://dapp.test/");
        let b = driver.add_window("https://wallet.test/popup.html");
        let registry = ContextRegistry::new(driver.clone());

        let snapshot = registry.refresh().await.unwrap();
        assert_eq!(snapshot.len(), 2);

        driver.close_window(&b).await.unwrap();
        let snapshot = registry.refresh().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, a);
    }

    #[tokio::test]
    async fn classify_resolves_counterpart_by_elimination() {
        let driver = Arc::new(FakeDriver::new());
        let dapp = driver.add_window("https://dapp.test/");
        let popup = driver.add_window("https://wallet.test/notification.html");
        let registry = ContextRegistry::new(driver);

        let classified = registry
            .classify(Some((&dapp, ContextRole::Dapp)))
            .await
            .unwrap();
        assert_eq!(classified.dapp, dapp);
        assert_eq!(classified.popup, popup);

        // The inferred tag is persisted.
        assert_eq!(registry.role_of(&popup), Some(ContextRole::ExtensionPopup));
    }

    #[tokio::test]
    async fn classify_with_three_untagged_contexts_is_a_typed_error() {
        let driver = Arc::new(FakeDriver::new());
        let known = driver.add_window("https://dapp.test/");
        driver.add_window("https://wallet.test/a.html");
        driver.add_window("https://wallet.test/b.html");
        let registry = ContextRegistry::new(driver);

        let err = registry
            .classify(Some((&known, ContextRole::Dapp)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::AmbiguousContexts { count: 2 }
        ));
    }

    #[tokio::test]
    async fn wait_for_new_context_polls_until_it_materializes() {
        let driver = Arc::new(FakeDriver::new());
        let existing = driver.add_window("https://dapp.test/");
        let popup = driver.schedule_window("https://wallet.test/notification.html", 3);
        let registry = ContextRegistry::new(driver);

        let baseline = vec![existing];
        let fresh = registry
            .wait_for_new_context(&baseline, &fast_poll())
            .await
            .unwrap();
        assert_eq!(fresh, popup);
    }

    #[tokio::test]
    async fn wait_for_new_context_times_out_as_switch_race() {
        let driver = Arc::new(FakeDriver::new());
        let existing = driver.add_window("https://dapp.test/");
        let registry = ContextRegistry::new(driver);

        let baseline = vec![existing];
        let err = registry
            .wait_for_new_context(&baseline, &fast_poll())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SwitchRace { .. }));
    }

    #[tokio::test]
    async fn operations_check_liveness_first() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://dapp.test/");
        let registry = ContextRegistry::new(driver.clone());
        registry.refresh().await.unwrap();

        driver.kill();
        let err = registry.switch_to(&ctx).await.unwrap_err();
        match err {
            RegistryError::SessionLost(inner) => {
                assert_eq!(inner.kind, DriverErrorKind::SessionLost)
            }
            other => panic!("expected SessionLost, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn safe_navigate_demotes_role_to_unknown() {
        let driver = Arc::new(FakeDriver::new());
        let ctx = driver.add_window("https://dapp.test/");
        let registry = ContextRegistry::new(driver);
        registry.refresh().await.unwrap();
        registry.assign_role(&ctx, ContextRole::Dapp).unwrap();

        registry
            .safe_navigate(&ctx, "https://elsewhere.test/")
            .await
            .unwrap();
        assert_eq!(registry.role_of(&ctx), Some(ContextRole::Unknown));
    }
}
