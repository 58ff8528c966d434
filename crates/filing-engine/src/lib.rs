//! # Filing Engine
//!
//! This crate assembles the access core of the filing platform: the stores
//! for organizational units, business roles, members, access rules and
//! overrides, plus the resolver that turns them into an effective access
//! level for a user on a filing cell.
//!
//! ## Overview
//!
//! - **Org units**: Parent-pointer tree with cycle-checked moves and
//!   cascading, leaf-first deletion
//! - **Business roles**: Registry with guarded (or forced) removal
//! - **Access rules**: Unit/role matrix per filing cell, arbitrated by priority
//! - **Access overrides**: One active grant per user and cell, lazy expiry
//! - **Resolution**: Bypass, override, rules, default, in that order
//!
//! Every mutation publishes a change event on the engine's
//! [`EventBus`](filing_events::EventBus).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use filing_access::{AccessLevel, NewAccessRule};
//! use filing_engine::AccessEngine;
//! use filing_org::{Member, NewOrgUnit, PlatformRole, UnitType};
//! use uuid::Uuid;
//!
//! async fn example() -> filing_engine::EngineResult<()> {
//!     let engine = AccessEngine::from_env()?;
//!     let org_id = Uuid::now_v7();
//!     let cell = Uuid::now_v7();
//!
//!     let finance = engine
//!         .org_units()
//!         .create(NewOrgUnit::new(org_id, "Finance", UnitType::Direction))
//!         .await?;
//!     engine
//!         .rules()
//!         .create_rule(NewAccessRule::new(org_id, cell, AccessLevel::Write).for_unit(finance.id))
//!         .await?;
//!     engine
//!         .members()
//!         .upsert(Member::new(org_id, "user-1", PlatformRole::Member).in_unit(finance.id))
//!         .await?;
//!
//!     let resolution = engine.resolve_user_access("user-1", cell, org_id).await;
//!     assert!(resolution.allows(AccessLevel::Write));
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`EngineConfig::from_env`] for the recognised environment variables.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::{AccessEngine, EngineBuilder, EngineContext};
pub use error::{EngineError, EngineResult};
pub use services::{
    AccessOverrideService, AccessResolver, AccessRuleService, BusinessRoleService, ExpirySweeper,
    MemberDirectory, OrgUnitService, RoleRemoval,
};
pub use store::{DataStore, Tables};
