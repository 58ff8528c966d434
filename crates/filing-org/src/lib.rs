//! # Filing Organization Model
//!
//! This crate provides the organization-side domain model of the filing
//! access platform: the hierarchy of organizational units, the business roles
//! people hold, and the member records that tie a user to both.
//!
//! ## Overview
//!
//! The filing-org crate handles:
//! - **Units**: Parent-pointer hierarchy of organizational units with an
//!   explicit unit-type seniority order
//! - **Trees**: Assembly of flat unit records into an ordered forest
//! - **Business Roles**: Named job functions, optionally scoped to a unit type
//! - **Members**: User-organization records with platform role and level
//!
//! ## Architecture
//!
//! ```text
//! Organization
//!   ├─ OrgUnit (parent_id ─→ OrgUnit)
//!   │     └─ Member.org_unit_id
//!   └─ BusinessRole
//!         └─ Member.business_role_id
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use filing_org::{build_forest, Member, OrgUnit, PlatformRole, UnitType};
//! use uuid::Uuid;
//!
//! let org_id = Uuid::now_v7();
//! let presidency = OrgUnit::new(org_id, "Presidency", UnitType::Presidency);
//! let legal = OrgUnit::new(org_id, "Legal", UnitType::Direction).with_parent(presidency.id);
//! let member = Member::new(org_id, "user-1", PlatformRole::Member).in_unit(legal.id);
//!
//! let forest = build_forest(vec![presidency, legal]);
//! assert_eq!(forest[0].children.len(), 1);
//! assert_eq!(member.platform_level, 4);
//! ```
//!
//! ## Related crates
//!
//! - `filing-access`: Access levels, rules, overrides and resolution
//! - `filing-engine`: Stores and the resolution service

pub mod business_role;
pub mod member;
pub mod unit;

// Re-export main types for convenience
pub use business_role::{BusinessRole, BusinessRoleUpdate, NewBusinessRole};
pub use member::{Member, PlatformRole};
pub use unit::{
    build_forest, sort_siblings, NewOrgUnit, OrgUnit, OrgUnitNode, OrgUnitUpdate, UnitType,
    DEFAULT_UNIT_COLOR,
};
