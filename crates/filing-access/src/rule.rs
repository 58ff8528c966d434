//! # Access Rules
//!
//! Declarative rules of the access matrix. A rule grants an access level on a
//! filing cell to the members matching an optional unit and an optional
//! business role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use filing_org::Member;

use crate::level::AccessLevel;

/// An entry of the access rule matrix.
///
/// A rule with `org_unit_id = None` matches members of any unit; the same
/// holds for `business_role_id`. Several rules may target the same
/// `(cell, unit, role)` tuple; resolution keeps the one with the highest
/// `priority`.
///
/// # Example
///
/// ```
/// use uuid::Uuid;
/// use filing_access::{AccessLevel, AccessRule};
/// use filing_org::{Member, PlatformRole};
///
/// let org_id = Uuid::now_v7();
/// let unit_id = Uuid::now_v7();
/// let rule = AccessRule::new(org_id, Uuid::now_v7(), AccessLevel::Read).for_unit(unit_id);
///
/// let inside = Member::new(org_id, "u1", PlatformRole::Member).in_unit(unit_id);
/// let outside = Member::new(org_id, "u2", PlatformRole::Member);
/// assert!(rule.matches(&inside));
/// assert!(!rule.matches(&outside));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Unique rule ID.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Filing cell the rule applies to.
    pub filing_cell_id: Uuid,
    /// Unit the member must belong to, `None` for any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_unit_id: Option<Uuid>,
    /// Business role the member must hold, `None` for any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_role_id: Option<Uuid>,
    /// Level granted to matching members.
    pub access_level: AccessLevel,
    /// Higher priorities win over lower ones.
    pub priority: i32,
    /// Inactive rules are ignored by resolution.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessRule {
    /// Create an active wildcard rule with priority `0`.
    pub fn new(organization_id: Uuid, filing_cell_id: Uuid, access_level: AccessLevel) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            filing_cell_id,
            org_unit_id: None,
            business_role_id: None,
            access_level,
            priority: 0,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restrict the rule to one unit.
    pub fn for_unit(mut self, org_unit_id: Uuid) -> Self {
        self.org_unit_id = Some(org_unit_id);
        self
    }

    /// Restrict the rule to one business role.
    pub fn for_role(mut self, business_role_id: Uuid) -> Self {
        self.business_role_id = Some(business_role_id);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check if the rule applies to a member.
    ///
    /// A rule matches if:
    /// - Its unit is unset or equals the member's unit
    /// - Its business role is unset or equals the member's business role
    ///
    /// Activity and cell are not checked here.
    pub fn matches(&self, member: &Member) -> bool {
        let unit_ok = match self.org_unit_id {
            None => true,
            Some(unit) => member.org_unit_id == Some(unit),
        };
        let role_ok = match self.business_role_id {
            None => true,
            Some(role) => member.business_role_id == Some(role),
        };
        unit_ok && role_ok
    }

    /// Check if this rule matches every unit and every role.
    pub fn is_wildcard(&self) -> bool {
        self.org_unit_id.is_none() && self.business_role_id.is_none()
    }

    /// Check if the rule references a business role.
    pub fn references_role(&self, business_role_id: Uuid) -> bool {
        self.business_role_id == Some(business_role_id)
    }

    /// Check if the rule references a unit.
    pub fn references_unit(&self, org_unit_id: Uuid) -> bool {
        self.org_unit_id == Some(org_unit_id)
    }

    /// Apply a partial update, stamping `updated_at` with `now`.
    pub fn apply(&mut self, update: AccessRuleUpdate, now: DateTime<Utc>) {
        if let Some(org_unit_id) = update.org_unit_id {
            self.org_unit_id = org_unit_id;
        }
        if let Some(business_role_id) = update.business_role_id {
            self.business_role_id = business_role_id;
        }
        if let Some(access_level) = update.access_level {
            self.access_level = access_level;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Input for creating a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccessRule {
    pub organization_id: Uuid,
    pub filing_cell_id: Uuid,
    #[serde(default)]
    pub org_unit_id: Option<Uuid>,
    #[serde(default)]
    pub business_role_id: Option<Uuid>,
    pub access_level: AccessLevel,
    /// Defaults to `0` when omitted.
    #[serde(default)]
    pub priority: Option<i32>,
}

impl NewAccessRule {
    /// Create an input for a wildcard rule.
    pub fn new(organization_id: Uuid, filing_cell_id: Uuid, access_level: AccessLevel) -> Self {
        Self {
            organization_id,
            filing_cell_id,
            org_unit_id: None,
            business_role_id: None,
            access_level,
            priority: None,
        }
    }

    /// Restrict to one unit.
    pub fn for_unit(mut self, org_unit_id: Uuid) -> Self {
        self.org_unit_id = Some(org_unit_id);
        self
    }

    /// Restrict to one business role.
    pub fn for_role(mut self, business_role_id: Uuid) -> Self {
        self.business_role_id = Some(business_role_id);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Build the rule record.
    pub fn into_rule(self, now: DateTime<Utc>) -> AccessRule {
        AccessRule {
            id: Uuid::now_v7(),
            organization_id: self.organization_id,
            filing_cell_id: self.filing_cell_id,
            org_unit_id: self.org_unit_id,
            business_role_id: self.business_role_id,
            access_level: self.access_level,
            priority: self.priority.unwrap_or(0),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a rule; unit and role can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessRuleUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub org_unit_id: Option<Option<Uuid>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub business_role_id: Option<Option<Uuid>>,
    pub access_level: Option<AccessLevel>,
    pub priority: Option<i32>,
    pub active: Option<bool>,
}

impl AccessRuleUpdate {
    /// Toggle a rule on or off, e.g. for staged rollouts.
    pub fn set_active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }
}
