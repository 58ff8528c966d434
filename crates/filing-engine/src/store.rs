//! Organization-scoped data store.
//!
//! All tables of the access core live behind a single `RwLock`. Reads take a
//! shared snapshot and writes take an exclusive transaction, so a closure
//! passed to [`DataStore::write`] is atomic with respect to every other read
//! and write.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use filing_access::{AccessOverride, AccessRule};
use filing_org::{BusinessRole, Member, OrgUnit};

use crate::error::{EngineError, EngineResult};

/// Row storage of the access core.
#[derive(Debug, Default)]
pub struct Tables {
    pub(crate) units: HashMap<Uuid, OrgUnit>,
    pub(crate) roles: HashMap<Uuid, BusinessRole>,
    pub(crate) members: HashMap<(Uuid, String), Member>,
    pub(crate) rules: HashMap<Uuid, AccessRule>,
    pub(crate) overrides: HashMap<Uuid, AccessOverride>,
}

impl Tables {
    /// Look up a unit or fail with `NotFound`.
    pub(crate) fn unit(&self, unit_id: Uuid) -> EngineResult<&OrgUnit> {
        self.units
            .get(&unit_id)
            .ok_or_else(|| EngineError::not_found("org unit", unit_id))
    }

    /// Look up a business role or fail with `NotFound`.
    pub(crate) fn role(&self, role_id: Uuid) -> EngineResult<&BusinessRole> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| EngineError::not_found("business role", role_id))
    }

    pub(crate) fn member(&self, organization_id: Uuid, user_id: &str) -> Option<&Member> {
        self.members.get(&(organization_id, user_id.to_string()))
    }

    /// Parent chain of `unit_id`, nearest first, excluding the unit itself.
    ///
    /// Fails with `InvalidOperation` when the chain is longer than
    /// `max_depth`, which also stops the walk on corrupted (cyclic) data.
    pub(crate) fn ancestors(&self, unit_id: Uuid, max_depth: usize) -> EngineResult<Vec<&OrgUnit>> {
        let mut chain = Vec::new();
        let mut current = self.unit(unit_id)?.parent_id;

        while let Some(parent_id) = current {
            let Some(parent) = self.units.get(&parent_id) else {
                break;
            };
            chain.push(parent);
            if chain.len() >= max_depth {
                return Err(EngineError::InvalidOperation(format!(
                    "unit {} is nested deeper than {} levels",
                    unit_id, max_depth
                )));
            }
            current = parent.parent_id;
        }

        Ok(chain)
    }

    /// Direct children of `parent_id` within an organization, ordered by
    /// `display_order`. `None` selects the roots.
    pub(crate) fn children(&self, organization_id: Uuid, parent_id: Option<Uuid>) -> Vec<&OrgUnit> {
        let mut children: Vec<&OrgUnit> = self
            .units
            .values()
            .filter(|u| u.organization_id == organization_id && u.parent_id == parent_id)
            .collect();
        children.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        children
    }

    /// Number of existing siblings a new unit would join.
    pub(crate) fn sibling_count(&self, organization_id: Uuid, parent_id: Option<Uuid>) -> usize {
        self.units
            .values()
            .filter(|u| u.organization_id == organization_id && u.parent_id == parent_id)
            .count()
    }

    /// Pre-order listing of the subtree rooted at `root_id` with the depth of
    /// each unit relative to the root.
    pub(crate) fn subtree(&self, root_id: Uuid) -> EngineResult<Vec<(Uuid, usize)>> {
        let root = self.unit(root_id)?;
        let mut order = Vec::new();
        let mut stack = vec![(root.id, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            order.push((id, depth));
            let Some(unit) = self.units.get(&id) else {
                continue;
            };
            // Reverse so the first child is visited first.
            for child in self.children(unit.organization_id, Some(id)).into_iter().rev() {
                stack.push((child.id, depth + 1));
            }
        }

        Ok(order)
    }

    /// Clear `org_unit_id` on every member placed in `unit_id`.
    pub(crate) fn detach_unit_members(&mut self, unit_id: Uuid) -> usize {
        let mut detached = 0;
        for member in self.members.values_mut() {
            if member.org_unit_id == Some(unit_id) {
                member.org_unit_id = None;
                detached += 1;
            }
        }
        detached
    }

    /// Rules attached to a cell, oldest first.
    pub(crate) fn rules_for_cell(&self, filing_cell_id: Uuid, include_inactive: bool) -> Vec<AccessRule> {
        let mut rules: Vec<AccessRule> = self
            .rules
            .values()
            .filter(|r| r.filing_cell_id == filing_cell_id && (include_inactive || r.active))
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rules
    }

    /// The active override for `(cell, user)`, whether or not it has expired.
    pub(crate) fn active_override(&self, filing_cell_id: Uuid, user_id: &str) -> Option<&AccessOverride> {
        self.overrides
            .values()
            .filter(|o| o.active && o.targets(filing_cell_id, user_id))
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
    }
}

/// Shared handle to the tables.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    tables: Arc<RwLock<Tables>>,
}

impl DataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a consistent read snapshot.
    pub async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read().await;
        f(&tables)
    }

    /// Run `f` inside an exclusive write transaction.
    ///
    /// Closures validate before they mutate, so an `Err` leaves the tables
    /// untouched.
    pub async fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.write().await;
        f(&mut tables)
    }
}
