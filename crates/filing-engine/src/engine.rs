//! Engine wiring.
//!
//! [`AccessEngine`] owns the data store, event bus, clock and configuration
//! and hands out the individual services. Services are cheap handles that
//! share one [`EngineContext`].

use std::sync::Arc;

use uuid::Uuid;

use filing_access::AccessResolution;
use filing_events::{Event, EventBus, MemoryEventBus, Subscription};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::services::{
    AccessOverrideService, AccessResolver, AccessRuleService, BusinessRoleService, ExpirySweeper,
    MemberDirectory, OrgUnitService,
};
use crate::store::DataStore;

/// State shared by every service.
pub struct EngineContext {
    pub(crate) store: DataStore,
    pub(crate) bus: Arc<dyn EventBus>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Publish a change event; failures are logged, never returned.
    pub(crate) async fn publish(&self, event: Event) {
        let event_type = event.event_type.clone();
        if let Err(e) = self.bus.publish(event).await {
            tracing::warn!(error = %e, event_type = %event_type, "Failed to publish change event");
        }
    }

    /// Publish a batch of events in order.
    pub(crate) async fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            self.publish(event).await;
        }
    }
}

/// Builder for [`AccessEngine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    bus: Option<Arc<dyn EventBus>>,
    clock: Option<Arc<dyn Clock>>,
    store: Option<DataStore>,
}

impl EngineBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Publish change events on the given bus.
    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Read time from the given clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Operate on an existing store.
    pub fn store(mut self, store: DataStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and build the engine.
    pub fn build(self) -> EngineResult<AccessEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let bus = self
            .bus
            .unwrap_or_else(|| Arc::new(MemoryEventBus::with_capacity(config.event_channel_capacity)));

        Ok(AccessEngine {
            ctx: Arc::new(EngineContext {
                store: self.store.unwrap_or_default(),
                bus,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                config,
            }),
        })
    }
}

/// Entry point of the access core.
///
/// # Example
///
/// ```rust,no_run
/// use filing_engine::AccessEngine;
/// use filing_org::{Member, NewOrgUnit, PlatformRole, UnitType};
/// use uuid::Uuid;
///
/// async fn example() -> filing_engine::EngineResult<()> {
///     let engine = AccessEngine::from_env()?;
///     let org_id = Uuid::now_v7();
///
///     let root = engine
///         .org_units()
///         .create(NewOrgUnit::new(org_id, "Presidency", UnitType::Presidency))
///         .await?;
///     engine
///         .members()
///         .upsert(Member::new(org_id, "user-1", PlatformRole::Member).in_unit(root.id))
///         .await?;
///
///     let resolution = engine
///         .resolve_user_access("user-1", Uuid::now_v7(), org_id)
///         .await;
///     println!("{}", resolution.effective_access);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AccessEngine {
    ctx: Arc<EngineContext>,
}

impl AccessEngine {
    /// Create a builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Build an engine with configuration read from the environment.
    pub fn from_env() -> EngineResult<Self> {
        EngineBuilder::new().config(EngineConfig::from_env()).build()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// The bus change events are published on.
    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        self.ctx.bus.clone()
    }

    /// Subscribe to change events matching a topic pattern.
    pub async fn subscribe(&self, pattern: &str) -> EngineResult<Subscription> {
        Ok(self.ctx.bus.subscribe(pattern).await?)
    }

    /// Organizational unit hierarchy.
    pub fn org_units(&self) -> OrgUnitService {
        OrgUnitService::new(self.ctx.clone())
    }

    /// Business role registry.
    pub fn business_roles(&self) -> BusinessRoleService {
        BusinessRoleService::new(self.ctx.clone())
    }

    /// Member directory.
    pub fn members(&self) -> MemberDirectory {
        MemberDirectory::new(self.ctx.clone())
    }

    /// Access rule matrix.
    pub fn rules(&self) -> AccessRuleService {
        AccessRuleService::new(self.ctx.clone())
    }

    /// Per-user access overrides.
    pub fn overrides(&self) -> AccessOverrideService {
        AccessOverrideService::new(self.ctx.clone())
    }

    /// Access resolution.
    pub fn resolver(&self) -> AccessResolver {
        AccessResolver::new(self.ctx.clone())
    }

    /// Compute the effective access of a user on a filing cell.
    pub async fn resolve_user_access(
        &self,
        user_id: &str,
        filing_cell_id: Uuid,
        organization_id: Uuid,
    ) -> AccessResolution {
        self.resolver()
            .resolve(user_id, filing_cell_id, organization_id)
            .await
    }

    /// Start the background expiry sweep if one is configured.
    ///
    /// Returns `Ok(None)` when `expiry_sweep_secs` is `0`.
    pub fn start_expiry_sweeper(&self) -> EngineResult<Option<ExpirySweeper>> {
        match self.ctx.config.expiry_sweep_interval() {
            Some(interval) => self.overrides().spawn_expiry_sweeper(interval).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = EngineConfig {
            event_channel_capacity: 0,
            ..EngineConfig::default()
        };
        let err = AccessEngine::builder().config(config).build().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_sweeper_disabled_by_config() {
        let engine = AccessEngine::builder()
            .config(EngineConfig {
                expiry_sweep_secs: 0,
                ..EngineConfig::default()
            })
            .build()
            .unwrap();
        assert!(engine.start_expiry_sweeper().unwrap().is_none());
    }
}
