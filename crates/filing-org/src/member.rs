//! Member domain models
//!
//! Members link a user to an organization and carry the attributes the access
//! engine consults: platform role and level, assigned unit and business role.
//! Member records are owned by the member directory; the access core only
//! reads them and clears their unit or role assignment on cascading deletes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform-wide tier of a user.
///
/// Roles are totally ordered from most to least privileged:
/// SuperAdmin > OrgAdmin > Manager > Member > Viewer.
///
/// # Examples
///
/// ```
/// use filing_org::PlatformRole;
///
/// assert!(PlatformRole::OrgAdmin.outranks(PlatformRole::Member));
/// assert_eq!(PlatformRole::Member.default_level(), 4);
/// assert_eq!(PlatformRole::parse("Viewer"), Some(PlatformRole::Viewer));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    /// Platform operator
    SuperAdmin,

    /// Organization administrator
    OrgAdmin,

    /// Organization manager
    Manager,

    /// Regular member
    Member,

    /// Read-only participant
    Viewer,
}

impl PlatformRole {
    /// Privilege rank, `0` being the most privileged.
    pub fn rank(&self) -> u8 {
        match self {
            Self::SuperAdmin => 0,
            Self::OrgAdmin => 1,
            Self::Manager => 2,
            Self::Member => 3,
            Self::Viewer => 4,
        }
    }

    /// Check if this role is strictly more privileged than another.
    pub fn outranks(&self, other: PlatformRole) -> bool {
        self.rank() < other.rank()
    }

    /// Platform level a member with this role gets when none is provided.
    ///
    /// Lower levels are more privileged.
    pub fn default_level(&self) -> i32 {
        i32::from(self.rank()) + 1
    }

    /// All platform roles, most privileged first.
    pub fn all() -> [PlatformRole; 5] {
        [
            Self::SuperAdmin,
            Self::OrgAdmin,
            Self::Manager,
            Self::Member,
            Self::Viewer,
        ]
    }

    /// Parse role from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "super_admin" | "superadmin" => Some(Self::SuperAdmin),
            "org_admin" | "orgadmin" => Some(Self::OrgAdmin),
            "manager" => Some(Self::Manager),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::OrgAdmin => "org_admin",
            Self::Manager => "manager",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

impl Default for PlatformRole {
    fn default() -> Self {
        Self::Member
    }
}

/// A user's membership in an organization.
///
/// There is at most one member per `(organization_id, user_id)`.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use filing_org::{Member, PlatformRole};
///
/// let org_id = Uuid::now_v7();
/// let unit_id = Uuid::now_v7();
/// let member = Member::new(org_id, "user-42", PlatformRole::Member).in_unit(unit_id);
///
/// assert_eq!(member.platform_level, 4);
/// assert_eq!(member.org_unit_id, Some(unit_id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Unique member ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// Identity-provider subject of the user
    pub user_id: String,

    /// Assigned organizational unit
    pub org_unit_id: Option<Uuid>,

    /// Assigned business role
    pub business_role_id: Option<Uuid>,

    /// Platform-wide role, which bounds the access the user can be granted
    pub platform_role: PlatformRole,

    /// Numeric platform tier (lower = more privileged)
    pub platform_level: i32,
}

impl Member {
    /// Creates a member with the role's default platform level and no assignments.
    pub fn new(organization_id: Uuid, user_id: impl Into<String>, platform_role: PlatformRole) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            user_id: user_id.into(),
            org_unit_id: None,
            business_role_id: None,
            platform_role,
            platform_level: platform_role.default_level(),
        }
    }

    /// Assign the member to a unit.
    pub fn in_unit(mut self, org_unit_id: Uuid) -> Self {
        self.org_unit_id = Some(org_unit_id);
        self
    }

    /// Assign a business role.
    pub fn with_business_role(mut self, business_role_id: Uuid) -> Self {
        self.business_role_id = Some(business_role_id);
        self
    }

    /// Override the platform level.
    pub fn with_level(mut self, platform_level: i32) -> Self {
        self.platform_level = platform_level;
        self
    }
}
