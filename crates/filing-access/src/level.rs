//! # Access Levels
//!
//! Defines the totally ordered access levels granted on filing cells and the
//! platform-role ceiling table.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use filing_org::PlatformRole;

/// Access a user holds on a filing cell.
///
/// Levels are totally ordered: `None < Read < Write < Manage < Admin`.
/// The order comes from the explicit rank table in [`AccessLevel::rank`], not
/// from the declaration order of the variants.
///
/// - **None**: No access
/// - **Read**: View documents filed in the cell
/// - **Write**: File and edit documents
/// - **Manage**: Reorganize documents and manage sharing
/// - **Admin**: Full control, including the cell's access policy
///
/// # Example
///
/// ```
/// use filing_access::AccessLevel;
///
/// assert!(AccessLevel::Manage > AccessLevel::Write);
/// assert_eq!(AccessLevel::Admin.min(AccessLevel::Read), AccessLevel::Read);
/// assert_eq!(AccessLevel::parse("write"), Some(AccessLevel::Write));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No access.
    None,

    /// Read-only access.
    Read,

    /// Read and write access.
    Write,

    /// Management access.
    Manage,

    /// Full administrative access.
    Admin,
}

impl AccessLevel {
    /// Rank of the level in the total order, `0` being no access.
    pub fn rank(&self) -> u8 {
        match self {
            AccessLevel::None => 0,
            AccessLevel::Read => 1,
            AccessLevel::Write => 2,
            AccessLevel::Manage => 3,
            AccessLevel::Admin => 4,
        }
    }

    /// Level for a rank, if the rank is in range.
    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(AccessLevel::None),
            1 => Some(AccessLevel::Read),
            2 => Some(AccessLevel::Write),
            3 => Some(AccessLevel::Manage),
            4 => Some(AccessLevel::Admin),
            _ => None,
        }
    }

    /// Get all levels, lowest first.
    pub fn all() -> [AccessLevel; 5] {
        [
            AccessLevel::None,
            AccessLevel::Read,
            AccessLevel::Write,
            AccessLevel::Manage,
            AccessLevel::Admin,
        ]
    }

    /// Check if this level grants at least `required`.
    pub fn allows(&self, required: AccessLevel) -> bool {
        *self >= required
    }

    /// Check if this level grants any access at all.
    pub fn is_granted(&self) -> bool {
        *self != AccessLevel::None
    }

    /// Get the string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::None => "none",
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Manage => "manage",
            AccessLevel::Admin => "admin",
        }
    }

    /// Parse a level from its string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(AccessLevel::None),
            "read" => Some(AccessLevel::Read),
            "write" => Some(AccessLevel::Write),
            "manage" => Some(AccessLevel::Manage),
            "admin" => Some(AccessLevel::Admin),
            _ => None,
        }
    }
}

impl PartialOrd for AccessLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccessLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        AccessLevel::None
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum access level a platform role can ever be granted.
///
/// | Platform role | Ceiling  |
/// |---------------|----------|
/// | super_admin   | admin    |
/// | org_admin     | admin    |
/// | manager       | manage   |
/// | member        | write    |
/// | viewer        | read     |
pub fn platform_role_cap(role: PlatformRole) -> AccessLevel {
    match role {
        PlatformRole::SuperAdmin => AccessLevel::Admin,
        PlatformRole::OrgAdmin => AccessLevel::Admin,
        PlatformRole::Manager => AccessLevel::Manage,
        PlatformRole::Member => AccessLevel::Write,
        PlatformRole::Viewer => AccessLevel::Read,
    }
}

/// Clamp a granted level to the role's ceiling.
///
/// Returns the effective level and whether the ceiling lowered it.
pub fn cap_for_role(granted: AccessLevel, role: PlatformRole) -> (AccessLevel, bool) {
    let cap = platform_role_cap(role);
    if granted > cap {
        (cap, true)
    } else {
        (granted, false)
    }
}
