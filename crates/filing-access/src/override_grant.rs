//! # Access Overrides
//!
//! Per-user exceptions to the rule matrix on one filing cell. An override can
//! grant more or less than the matrix would, optionally until an expiry date.
//! At most one override per `(filing_cell_id, user_id)` is active at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::AccessLevel;

/// A time-bounded, user-specific exception for one filing cell.
///
/// An override whose `expires_at` lies in the past is treated as inactive at
/// read time even while its `active` flag is still set.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
/// use filing_access::{AccessLevel, AccessOverride};
///
/// let now = Utc::now();
/// let grant = AccessOverride::new(Uuid::now_v7(), Uuid::now_v7(), "user-7", AccessLevel::Read, Uuid::now_v7())
///     .expiring_at(now + Duration::hours(1));
///
/// assert!(grant.is_effective(now));
/// assert!(!grant.is_effective(now + Duration::hours(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessOverride {
    /// Unique override ID.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Filing cell the override applies to.
    pub filing_cell_id: Uuid,
    /// User the override applies to.
    pub user_id: String,
    /// Level granted (or restricted to).
    pub access_level: AccessLevel,
    /// Why the exception was made.
    pub reason: Option<String>,
    /// Who granted it.
    pub granted_by: Uuid,
    /// When the override lapses, `None` for never.
    pub expires_at: Option<DateTime<Utc>>,
    /// Cleared when superseded or soft-removed.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessOverride {
    /// Create an active, non-expiring override.
    pub fn new(
        organization_id: Uuid,
        filing_cell_id: Uuid,
        user_id: impl Into<String>,
        access_level: AccessLevel,
        granted_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            filing_cell_id,
            user_id: user_id.into(),
            access_level,
            reason: None,
            granted_by,
            expires_at: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set an expiry date.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Check if the override has lapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Check if the override is active and not expired at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    /// Check if the override targets the given cell and user.
    pub fn targets(&self, filing_cell_id: Uuid, user_id: &str) -> bool {
        self.filing_cell_id == filing_cell_id && self.user_id == user_id
    }

    /// Mark the override inactive, stamping `updated_at`.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    /// Apply a partial update, stamping `updated_at` with `now`.
    pub fn apply(&mut self, update: AccessOverrideUpdate, now: DateTime<Utc>) {
        if let Some(access_level) = update.access_level {
            self.access_level = access_level;
        }
        if let Some(reason) = update.reason {
            self.reason = reason;
        }
        self.updated_at = now;
    }
}

/// Input for granting an override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccessOverride {
    pub organization_id: Uuid,
    pub filing_cell_id: Uuid,
    pub user_id: String,
    pub access_level: AccessLevel,
    pub granted_by: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewAccessOverride {
    /// Create an input for a non-expiring override.
    pub fn new(
        organization_id: Uuid,
        filing_cell_id: Uuid,
        user_id: impl Into<String>,
        access_level: AccessLevel,
        granted_by: Uuid,
    ) -> Self {
        Self {
            organization_id,
            filing_cell_id,
            user_id: user_id.into(),
            access_level,
            granted_by,
            reason: None,
            expires_at: None,
        }
    }

    /// Set an expiry date.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Build the active override record.
    pub fn into_override(self, now: DateTime<Utc>) -> AccessOverride {
        AccessOverride {
            id: Uuid::now_v7(),
            organization_id: self.organization_id,
            filing_cell_id: self.filing_cell_id,
            user_id: self.user_id,
            access_level: self.access_level,
            reason: self.reason,
            granted_by: self.granted_by,
            expires_at: self.expires_at,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an override. Expiry is changed through
/// `extend_expiration` only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessOverrideUpdate {
    pub access_level: Option<AccessLevel>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub reason: Option<Option<String>>,
}

/// How an override is taken out of service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRemoval {
    /// Flip `active` to false and keep the record for audit.
    Deactivate,

    /// Permanently delete the record. Administrative cleanup only.
    Purge,
}

impl OverrideRemoval {
    /// Check if the record survives the removal.
    pub fn retains_record(&self) -> bool {
        matches!(self, OverrideRemoval::Deactivate)
    }
}
