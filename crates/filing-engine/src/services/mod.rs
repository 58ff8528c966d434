//! Stores and services of the access core.

pub mod business_roles;
pub mod members;
pub mod org_units;
pub mod overrides;
pub mod resolver;
pub mod rules;

pub use business_roles::{BusinessRoleService, RoleRemoval};
pub use members::MemberDirectory;
pub use org_units::OrgUnitService;
pub use overrides::{AccessOverrideService, ExpirySweeper};
pub use resolver::AccessResolver;
pub use rules::AccessRuleService;
