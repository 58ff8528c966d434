//! Business role reference data
//!
//! Business roles name a job or function inside an organization (e.g.
//! "Archivist", "Head of Service"), optionally restricted to one unit type.
//! They are independent from platform roles and carry no permissions by
//! themselves; access rules reference them by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::unit::UnitType;

/// A named role scoped to an organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use filing_org::{BusinessRole, UnitType};
///
/// let role = BusinessRole::new(Uuid::now_v7(), "Archivist")
///     .for_unit_type(UnitType::Service)
///     .in_category("records");
/// assert!(role.applies_to(UnitType::Service));
/// assert!(!role.applies_to(UnitType::Office));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRole {
    /// Unique role ID
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// Unit type the role is meant for, `None` for any
    pub unit_type: Option<UnitType>,

    /// Role name
    pub name: String,

    /// Free-form description
    pub description: Option<String>,

    /// Grouping used for listings (e.g. "management", "records")
    pub category: Option<String>,

    /// Seniority hint within the category
    pub level: Option<i32>,

    /// UI color tag
    pub color_tag: Option<String>,

    /// Whether the role is active
    pub active: bool,

    /// When the role was created
    pub created_at: DateTime<Utc>,

    /// When the role was last updated
    pub updated_at: DateTime<Utc>,
}

impl BusinessRole {
    /// Creates an active role applicable to any unit type.
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            unit_type: None,
            name: name.into(),
            description: None,
            category: None,
            level: None,
            color_tag: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restrict the role to a unit type.
    pub fn for_unit_type(mut self, unit_type: UnitType) -> Self {
        self.unit_type = Some(unit_type);
        self
    }

    /// Set the category.
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check if the role may be held in a unit of the given type.
    pub fn applies_to(&self, unit_type: UnitType) -> bool {
        self.unit_type.map_or(true, |t| t == unit_type)
    }

    /// Apply a partial update, stamping `updated_at` with `now`.
    pub fn apply(&mut self, update: BusinessRoleUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(unit_type) = update.unit_type {
            self.unit_type = unit_type;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(color_tag) = update.color_tag {
            self.color_tag = color_tag;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Input for creating a business role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusinessRole {
    pub organization_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub unit_type: Option<UnitType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub color_tag: Option<String>,
}

impl NewBusinessRole {
    /// Creates an input with only the required fields set.
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            organization_id,
            name: name.into(),
            unit_type: None,
            description: None,
            category: None,
            level: None,
            color_tag: None,
        }
    }

    /// Restrict the role to a unit type.
    pub fn for_unit_type(mut self, unit_type: UnitType) -> Self {
        self.unit_type = Some(unit_type);
        self
    }

    /// Set the category.
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Build the role record.
    pub fn into_role(self, now: DateTime<Utc>) -> BusinessRole {
        BusinessRole {
            id: Uuid::now_v7(),
            organization_id: self.organization_id,
            unit_type: self.unit_type,
            name: self.name,
            description: self.description,
            category: self.category,
            level: self.level,
            color_tag: self.color_tag,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a business role.
///
/// Optional fields are doubly optional so they can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessRoleUpdate {
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub unit_type: Option<Option<UnitType>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub category: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub level: Option<Option<i32>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub color_tag: Option<Option<String>>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_without_unit_type_applies_everywhere() {
        let role = BusinessRole::new(Uuid::now_v7(), "Clerk");
        for t in UnitType::all() {
            assert!(role.applies_to(t));
        }
    }

    #[test]
    fn test_new_role_input() {
        let org_id = Uuid::now_v7();
        let role = NewBusinessRole::new(org_id, "Head of Service")
            .for_unit_type(UnitType::Service)
            .in_category("management")
            .into_role(Utc::now());

        assert_eq!(role.organization_id, org_id);
        assert_eq!(role.category.as_deref(), Some("management"));
        assert_eq!(role.unit_type, Some(UnitType::Service));
        assert!(role.active);
    }

    #[test]
    fn test_apply_update_clears_fields() {
        let mut role = BusinessRole::new(Uuid::now_v7(), "Clerk").in_category("records");
        role.apply(
            BusinessRoleUpdate {
                name: Some("Senior Clerk".into()),
                category: Some(None),
                active: Some(false),
                ..BusinessRoleUpdate::default()
            },
            Utc::now(),
        );
        assert_eq!(role.name, "Senior Clerk");
        assert!(role.category.is_none());
        assert!(!role.active);
    }

    #[test]
    fn test_update_clears_survive_json() {
        let decoded: BusinessRoleUpdate =
            serde_json::from_str(r#"{"unit_type": null, "category": null, "level": 2}"#).unwrap();
        assert_eq!(decoded.unit_type, Some(None));
        assert_eq!(decoded.category, Some(None));
        assert_eq!(decoded.level, Some(Some(2)));
        assert_eq!(decoded.description, None);
        assert_eq!(decoded.color_tag, None);

        let json = serde_json::to_value(&decoded).unwrap();
        assert!(json["category"].is_null());
        assert!(json.get("description").is_none());

        let mut role = BusinessRole::new(Uuid::now_v7(), "Clerk")
            .for_unit_type(UnitType::Service)
            .in_category("records");
        role.apply(serde_json::from_value(json).unwrap(), Utc::now());
        assert_eq!(role.unit_type, None);
        assert_eq!(role.category, None);
        assert_eq!(role.level, Some(2));
    }
}
