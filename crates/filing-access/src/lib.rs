//! # Filing Access Control
//!
//! This crate provides the access-control vocabulary of the filing platform
//! and the pure function that resolves a user's effective access on a filing
//! cell.
//!
//! ## Overview
//!
//! The filing-access crate handles:
//! - **Access Levels**: `none < read < write < manage < admin`, ordered by an
//!   explicit rank table
//! - **Role Ceilings**: The maximum level each platform role can be granted
//! - **Rules**: The declarative access matrix `(cell, unit?, role?) -> level`
//! - **Overrides**: Time-bounded per-user exceptions for one cell
//! - **Resolution**: The precedence chain combining all of the above
//!
//! ## Architecture
//!
//! ```text
//! resolve(member, override, rules)
//!   ├─ no member              → none    (source: none)
//!   ├─ platform_level <= 2    → admin   (source: bypass)
//!   ├─ effective override     → min(level, cap(role))  (source: override)
//!   ├─ best matching rule     → min(level, cap(role))  (source: rule)
//!   └─ otherwise              → none    (source: default)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use filing_access::{resolve_access, AccessLevel, AccessOverride, ResolutionInput, ResolutionPolicy};
//! use filing_org::{Member, PlatformRole};
//! use uuid::Uuid;
//!
//! let org_id = Uuid::now_v7();
//! let cell = Uuid::now_v7();
//! let member = Member::new(org_id, "user-1", PlatformRole::Member);
//! let grant = AccessOverride::new(org_id, cell, "user-1", AccessLevel::Read, Uuid::now_v7());
//!
//! let input = ResolutionInput {
//!     filing_cell_id: cell,
//!     member: Some(&member),
//!     active_override: Some(&grant),
//!     rules: &[],
//!     now: Utc::now(),
//! };
//! let resolution = resolve_access(&input, &ResolutionPolicy::default());
//! assert_eq!(resolution.effective_access, AccessLevel::Read);
//! ```
//!
//! ## Integration with filing-org
//!
//! Rules reference units and business roles from `filing-org` by id, and the
//! resolution reads the `Member` record's platform role and level.

pub mod level;
pub mod override_grant;
pub mod resolution;
pub mod rule;

// Re-export main types for convenience
pub use level::{cap_for_role, platform_role_cap, AccessLevel};
pub use override_grant::{AccessOverride, AccessOverrideUpdate, NewAccessOverride, OverrideRemoval};
pub use resolution::{
    evaluate, resolve_access, select_rule, AccessResolution, Evaluation, ResolutionInput,
    ResolutionPolicy, ResolutionSource, RuleSelection, DEFAULT_BYPASS_MAX_LEVEL,
};
pub use rule::{AccessRule, AccessRuleUpdate, NewAccessRule};
