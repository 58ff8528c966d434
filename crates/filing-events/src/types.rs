//! Change-event types
//!
//! This module defines the envelope published for every successful mutation
//! of the access core, and the typed payloads for each entity.

use chrono::{DateTime, Utc};
use filing_access::{AccessLevel, OverrideRemoval};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Topic prefix shared by every event of the access core.
pub const TOPIC_PREFIX: &str = "filing";

/// Change-event envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing, auditing, and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "org_unit.deleted", "override.created")
    pub event_type: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organization context
    pub org_id: Option<Uuid>,

    /// Subject the event is about (e.g. the user of an override)
    pub user_id: Option<String>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event type string
    /// * `payload` - The event payload
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            org_id: None,
            user_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Set the subject user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the topic for this event.
    ///
    /// Topics are structured as: `filing.{event_type}`
    pub fn topic(&self) -> String {
        format!("{}.{}", TOPIC_PREFIX, self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Wrap a typed payload in an event; a payload that fails to serialize is
/// logged and published as `null`.
fn envelope<T: Serialize>(event_type: &str, org_id: Uuid, payload: &T) -> Event {
    let payload = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, event_type, "Failed to serialize event payload");
            serde_json::Value::Null
        }
    };
    Event::new(event_type, payload).with_org(org_id)
}

// ============================================================================
// Organizational units
// ============================================================================

/// Organizational unit lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrgUnitEvent {
    /// Unit was created
    Created {
        unit_id: Uuid,
        parent_id: Option<Uuid>,
        name: String,
    },
    /// Unit attributes changed
    Updated { unit_id: Uuid },
    /// Unit was relocated
    Moved {
        unit_id: Uuid,
        old_parent_id: Option<Uuid>,
        new_parent_id: Option<Uuid>,
    },
    /// Unit was deleted; emitted leaves first during a cascade
    Deleted {
        unit_id: Uuid,
        parent_id: Option<Uuid>,
        detached_members: usize,
    },
}

impl OrgUnitEvent {
    /// Convert to generic event.
    pub fn to_event(&self, org_id: Uuid) -> Event {
        let event_type = match self {
            OrgUnitEvent::Created { .. } => "org_unit.created",
            OrgUnitEvent::Updated { .. } => "org_unit.updated",
            OrgUnitEvent::Moved { .. } => "org_unit.moved",
            OrgUnitEvent::Deleted { .. } => "org_unit.deleted",
        };
        envelope(event_type, org_id, self)
    }
}

// ============================================================================
// Business roles
// ============================================================================

/// Business role lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusinessRoleEvent {
    /// Role was created
    Created { role_id: Uuid, name: String },
    /// Role was updated
    Updated { role_id: Uuid },
    /// Role was deleted
    Deleted {
        role_id: Uuid,
        forced: bool,
        detached_members: usize,
        deleted_rules: usize,
    },
}

impl BusinessRoleEvent {
    /// Convert to generic event.
    pub fn to_event(&self, org_id: Uuid) -> Event {
        let event_type = match self {
            BusinessRoleEvent::Created { .. } => "business_role.created",
            BusinessRoleEvent::Updated { .. } => "business_role.updated",
            BusinessRoleEvent::Deleted { .. } => "business_role.deleted",
        };
        envelope(event_type, org_id, self)
    }
}

// ============================================================================
// Access rules
// ============================================================================

/// Access rule matrix events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessRuleEvent {
    /// Rule was created
    Created {
        rule_id: Uuid,
        filing_cell_id: Uuid,
        access_level: AccessLevel,
        priority: i32,
    },
    /// Rule was updated
    Updated { rule_id: Uuid, filing_cell_id: Uuid },
    /// Rule was deleted
    Deleted { rule_id: Uuid, filing_cell_id: Uuid },
}

impl AccessRuleEvent {
    /// Convert to generic event.
    pub fn to_event(&self, org_id: Uuid) -> Event {
        let event_type = match self {
            AccessRuleEvent::Created { .. } => "access_rule.created",
            AccessRuleEvent::Updated { .. } => "access_rule.updated",
            AccessRuleEvent::Deleted { .. } => "access_rule.deleted",
        };
        envelope(event_type, org_id, self)
    }
}

// ============================================================================
// Access overrides
// ============================================================================

/// Access override events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessOverrideEvent {
    /// Override was granted, superseding any previous active one
    Granted {
        override_id: Uuid,
        filing_cell_id: Uuid,
        user_id: String,
        access_level: AccessLevel,
        granted_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
        superseded: Vec<Uuid>,
    },
    /// Level or reason changed
    Updated { override_id: Uuid },
    /// Expiry date changed
    ExpirationExtended {
        override_id: Uuid,
        expires_at: DateTime<Utc>,
    },
    /// Override was deactivated or purged
    Removed {
        override_id: Uuid,
        mode: OverrideRemoval,
    },
    /// Lapsed override was flipped inactive by the sweeper
    Expired { override_id: Uuid },
}

impl AccessOverrideEvent {
    /// Convert to generic event.
    pub fn to_event(&self, org_id: Uuid) -> Event {
        let event_type = match self {
            AccessOverrideEvent::Granted { .. } => "access_override.granted",
            AccessOverrideEvent::Updated { .. } => "access_override.updated",
            AccessOverrideEvent::ExpirationExtended { .. } => "access_override.expiration_extended",
            AccessOverrideEvent::Removed { .. } => "access_override.removed",
            AccessOverrideEvent::Expired { .. } => "access_override.expired",
        };
        let event = envelope(event_type, org_id, self);
        match self {
            AccessOverrideEvent::Granted { user_id, .. } => event.with_user(user_id.clone()),
            _ => event,
        }
    }
}
