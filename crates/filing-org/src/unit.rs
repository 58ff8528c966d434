//! Organizational unit domain models
//!
//! This module provides the OrgUnit entity and the helpers used to present an
//! organization's units as an ordered forest. Units are stored as flat
//! parent-pointer records keyed by id; the tree shape is only materialized on
//! read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Color tag applied to units created without an explicit one.
pub const DEFAULT_UNIT_COLOR: &str = "#6B7280";

/// Kind of organizational unit.
///
/// Unit types form an implicit seniority order, from the presidency down to
/// the smallest cell. The order is carried by an explicit rank table
/// ([`UnitType::seniority`]) rather than by declaration order.
///
/// # Examples
///
/// ```
/// use filing_org::UnitType;
///
/// assert!(UnitType::Direction.is_senior_to(UnitType::Service));
/// assert_eq!(UnitType::parse("sub-direction"), Some(UnitType::SubDirection));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Presidency (most senior)
    Presidency,

    /// General direction
    GeneralDirection,

    /// Direction
    Direction,

    /// Sub-direction
    SubDirection,

    /// Department
    Department,

    /// Service
    Service,

    /// Office
    Office,

    /// Unit
    Unit,

    /// Cell (least senior)
    Cell,
}

impl UnitType {
    /// Seniority rank of the unit type, `0` being the most senior.
    pub fn seniority(&self) -> u8 {
        match self {
            Self::Presidency => 0,
            Self::GeneralDirection => 1,
            Self::Direction => 2,
            Self::SubDirection => 3,
            Self::Department => 4,
            Self::Service => 5,
            Self::Office => 6,
            Self::Unit => 7,
            Self::Cell => 8,
        }
    }

    /// Check if this unit type ranks strictly above another.
    pub fn is_senior_to(&self, other: UnitType) -> bool {
        self.seniority() < other.seniority()
    }

    /// All unit types, most senior first.
    pub fn all() -> [UnitType; 9] {
        [
            Self::Presidency,
            Self::GeneralDirection,
            Self::Direction,
            Self::SubDirection,
            Self::Department,
            Self::Service,
            Self::Office,
            Self::Unit,
            Self::Cell,
        ]
    }

    /// Parse a unit type from its string form.
    ///
    /// Accepts snake_case, kebab-case and any letter case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "presidency" => Some(Self::Presidency),
            "general_direction" => Some(Self::GeneralDirection),
            "direction" => Some(Self::Direction),
            "sub_direction" => Some(Self::SubDirection),
            "department" => Some(Self::Department),
            "service" => Some(Self::Service),
            "office" => Some(Self::Office),
            "unit" => Some(Self::Unit),
            "cell" => Some(Self::Cell),
            _ => None,
        }
    }

    /// Get string representation of the unit type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presidency => "presidency",
            Self::GeneralDirection => "general_direction",
            Self::Direction => "direction",
            Self::SubDirection => "sub_direction",
            Self::Department => "department",
            Self::Service => "service",
            Self::Office => "office",
            Self::Unit => "unit",
            Self::Cell => "cell",
        }
    }
}

/// A node in an organization's internal hierarchy.
///
/// The hierarchy is a forest of parent-pointer records: each unit stores the
/// id of its parent (or `None` for a root) and never embeds its children.
///
/// # Invariants
///
/// - The `parent_id` chain is acyclic
/// - Every ancestor belongs to the same `organization_id`
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use filing_org::{OrgUnit, UnitType};
///
/// let org_id = Uuid::now_v7();
/// let root = OrgUnit::new(org_id, "Presidency", UnitType::Presidency);
/// let finance = OrgUnit::new(org_id, "Finance", UnitType::Direction).with_parent(root.id);
///
/// assert!(root.is_root());
/// assert_eq!(finance.parent_id, Some(root.id));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Unique unit ID
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// Physical site, when the organization tracks several
    pub site_id: Option<Uuid>,

    /// Human-readable name
    pub name: String,

    /// Kind of unit
    pub unit_type: UnitType,

    /// Parent unit, `None` for a root
    pub parent_id: Option<Uuid>,

    /// Color used by UIs to tag the unit
    pub color_tag: String,

    /// Position among siblings
    pub display_order: i32,

    /// Whether the unit is active
    pub active: bool,

    /// When the unit was created
    pub created_at: DateTime<Utc>,

    /// When the unit was last updated
    pub updated_at: DateTime<Utc>,
}

impl OrgUnit {
    /// Creates a new active root unit with display order `0`.
    pub fn new(organization_id: Uuid, name: impl Into<String>, unit_type: UnitType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            site_id: None,
            name: name.into(),
            unit_type,
            parent_id: None,
            color_tag: DEFAULT_UNIT_COLOR.to_string(),
            display_order: 0,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the parent unit.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the site.
    pub fn with_site(mut self, site_id: Uuid) -> Self {
        self.site_id = Some(site_id);
        self
    }

    /// Set the color tag.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color_tag = color.into();
        self
    }

    /// Set the display order.
    pub fn with_display_order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }

    /// Check if this unit has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Apply a partial update, stamping `updated_at` with `now`.
    ///
    /// Relocation is not part of an update; use the hierarchy store's move
    /// operation so the cycle check runs.
    pub fn apply(&mut self, update: OrgUnitUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(unit_type) = update.unit_type {
            self.unit_type = unit_type;
        }
        if let Some(site_id) = update.site_id {
            self.site_id = site_id;
        }
        if let Some(color_tag) = update.color_tag {
            self.color_tag = color_tag;
        }
        if let Some(display_order) = update.display_order {
            self.display_order = display_order;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Input for creating an organizational unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrgUnit {
    /// Owning organization
    pub organization_id: Uuid,

    /// Site, if any
    #[serde(default)]
    pub site_id: Option<Uuid>,

    /// Unit name
    pub name: String,

    /// Kind of unit
    pub unit_type: UnitType,

    /// Parent unit, `None` for a root
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// Color tag, defaults to [`DEFAULT_UNIT_COLOR`]
    #[serde(default)]
    pub color_tag: Option<String>,

    /// Position among siblings; computed from the sibling count when omitted
    #[serde(default)]
    pub display_order: Option<i32>,
}

impl NewOrgUnit {
    /// Creates an input for a root unit.
    pub fn new(organization_id: Uuid, name: impl Into<String>, unit_type: UnitType) -> Self {
        Self {
            organization_id,
            site_id: None,
            name: name.into(),
            unit_type,
            parent_id: None,
            color_tag: None,
            display_order: None,
        }
    }

    /// Place the unit under a parent.
    pub fn under(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set an explicit display order.
    pub fn with_display_order(mut self, order: i32) -> Self {
        self.display_order = Some(order);
        self
    }

    /// Set the color tag.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color_tag = Some(color.into());
        self
    }

    /// Build the unit record, using `fallback_order` when no display order was given.
    pub fn into_unit(self, fallback_order: i32, now: DateTime<Utc>) -> OrgUnit {
        OrgUnit {
            id: Uuid::now_v7(),
            organization_id: self.organization_id,
            site_id: self.site_id,
            name: self.name,
            unit_type: self.unit_type,
            parent_id: self.parent_id,
            color_tag: self
                .color_tag
                .unwrap_or_else(|| DEFAULT_UNIT_COLOR.to_string()),
            display_order: self.display_order.unwrap_or(fallback_order),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an organizational unit.
///
/// `None` leaves a field untouched. `site_id` is doubly optional so it can be
/// cleared with `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgUnitUpdate {
    pub name: Option<String>,
    pub unit_type: Option<UnitType>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub site_id: Option<Option<Uuid>>,
    pub color_tag: Option<String>,
    pub display_order: Option<i32>,
    pub active: Option<bool>,
}

impl OrgUnitUpdate {
    /// Rename a unit.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Recolor a unit.
    pub fn recolor(color: impl Into<String>) -> Self {
        Self {
            color_tag: Some(color.into()),
            ..Self::default()
        }
    }
}

/// A unit together with its ordered children, as returned by tree reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnitNode {
    /// The unit itself
    #[serde(flatten)]
    pub unit: OrgUnit,

    /// Direct children, sorted by `display_order`
    pub children: Vec<OrgUnitNode>,
}

impl OrgUnitNode {
    /// Total number of units in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OrgUnitNode::size).sum::<usize>()
    }

    /// Find a node by unit id anywhere in this subtree.
    pub fn find(&self, unit_id: Uuid) -> Option<&OrgUnitNode> {
        if self.unit.id == unit_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(unit_id))
    }
}

/// Sort units by `display_order`, keeping the incoming order for ties.
pub fn sort_siblings(units: &mut [OrgUnit]) {
    units.sort_by_key(|u| u.display_order);
}

/// Assemble flat unit records into an ordered forest.
///
/// Siblings are sorted by `display_order` at every level. Units whose parent
/// is not part of `units` are treated as roots.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use filing_org::{build_forest, OrgUnit, UnitType};
///
/// let org_id = Uuid::now_v7();
/// let root = OrgUnit::new(org_id, "Presidency", UnitType::Presidency);
/// let b = OrgUnit::new(org_id, "B", UnitType::Direction).with_parent(root.id).with_display_order(1);
/// let a = OrgUnit::new(org_id, "A", UnitType::Direction).with_parent(root.id).with_display_order(0);
///
/// let forest = build_forest(vec![root, b, a]);
/// assert_eq!(forest.len(), 1);
/// assert_eq!(forest[0].children[0].unit.name, "A");
/// ```
pub fn build_forest(units: Vec<OrgUnit>) -> Vec<OrgUnitNode> {
    let ids: HashSet<Uuid> = units.iter().map(|u| u.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<OrgUnit>> = HashMap::new();

    for unit in units {
        let key = match unit.parent_id {
            Some(parent) if ids.contains(&parent) => Some(parent),
            _ => None,
        };
        by_parent.entry(key).or_default().push(unit);
    }
    for siblings in by_parent.values_mut() {
        sort_siblings(siblings);
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    roots
        .into_iter()
        .map(|unit| attach_children(unit, &mut by_parent))
        .collect()
}

fn attach_children(unit: OrgUnit, by_parent: &mut HashMap<Option<Uuid>, Vec<OrgUnit>>) -> OrgUnitNode {
    let children = by_parent
        .remove(&Some(unit.id))
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_children(child, by_parent))
        .collect();
    OrgUnitNode { unit, children }
}
