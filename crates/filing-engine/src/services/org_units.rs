//! Organizational unit hierarchy.
//!
//! Units are parent-pointer records keyed by id. Relocation walks the
//! ancestor chain of the new parent to reject cycles, and deletion cascades
//! over the whole subtree inside one write transaction.

use std::sync::Arc;

use uuid::Uuid;

use filing_events::OrgUnitEvent;
use filing_org::{build_forest, NewOrgUnit, OrgUnit, OrgUnitNode, OrgUnitUpdate};

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};

/// Store for the organizational unit tree.
#[derive(Debug, Clone)]
pub struct OrgUnitService {
    ctx: Arc<EngineContext>,
}

impl OrgUnitService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Create a unit.
    ///
    /// Without an explicit `display_order` the unit is appended after its
    /// existing siblings.
    pub async fn create(&self, input: NewOrgUnit) -> EngineResult<OrgUnit> {
        let now = self.ctx.clock.now();
        let max_depth = self.ctx.config.max_tree_depth;

        let unit = self
            .ctx
            .store
            .write(|t| -> EngineResult<OrgUnit> {
                if let Some(parent_id) = input.parent_id {
                    let parent = t.unit(parent_id)?;
                    if parent.organization_id != input.organization_id {
                        return Err(EngineError::InvalidOperation(format!(
                            "parent unit {} belongs to another organization",
                            parent_id
                        )));
                    }
                    // The new unit sits one level below the parent.
                    if t.ancestors(parent_id, max_depth)?.len() + 2 > max_depth {
                        return Err(EngineError::InvalidOperation(format!(
                            "unit tree would exceed {} levels",
                            max_depth
                        )));
                    }
                }

                let siblings = t.sibling_count(input.organization_id, input.parent_id);
                let unit = input.into_unit(siblings as i32, now);
                t.units.insert(unit.id, unit.clone());
                Ok(unit)
            })
            .await?;

        tracing::info!(
            organization_id = %unit.organization_id,
            unit_id = %unit.id,
            parent_id = ?unit.parent_id,
            "Org unit created"
        );
        self.ctx
            .publish(
                OrgUnitEvent::Created {
                    unit_id: unit.id,
                    parent_id: unit.parent_id,
                    name: unit.name.clone(),
                }
                .to_event(unit.organization_id),
            )
            .await;

        Ok(unit)
    }

    /// Update a unit's attributes. The parent is changed through [`move_unit`](Self::move_unit).
    pub async fn update(&self, unit_id: Uuid, update: OrgUnitUpdate) -> EngineResult<OrgUnit> {
        let now = self.ctx.clock.now();

        let unit = self
            .ctx
            .store
            .write(|t| -> EngineResult<OrgUnit> {
                let unit = t
                    .units
                    .get_mut(&unit_id)
                    .ok_or_else(|| EngineError::not_found("org unit", unit_id))?;
                unit.apply(update, now);
                Ok(unit.clone())
            })
            .await?;

        tracing::debug!(unit_id = %unit_id, "Org unit updated");
        self.ctx
            .publish(OrgUnitEvent::Updated { unit_id }.to_event(unit.organization_id))
            .await;

        Ok(unit)
    }

    /// Relocate a unit under `new_parent_id`, or to the root level with `None`.
    ///
    /// Only `parent_id` is rewritten; sibling display orders are left as they
    /// are. Fails with `InvalidOperation` if the unit would become its own
    /// ancestor.
    pub async fn move_unit(&self, unit_id: Uuid, new_parent_id: Option<Uuid>) -> EngineResult<OrgUnit> {
        let now = self.ctx.clock.now();
        let max_depth = self.ctx.config.max_tree_depth;

        let (unit, old_parent_id) = self
            .ctx
            .store
            .write(|t| -> EngineResult<(OrgUnit, Option<Uuid>)> {
                let organization_id = t.unit(unit_id)?.organization_id;

                if let Some(parent_id) = new_parent_id {
                    let parent = t.unit(parent_id)?;
                    if parent_id == unit_id {
                        return Err(EngineError::InvalidOperation(
                            "a unit cannot be its own parent".to_string(),
                        ));
                    }
                    if parent.organization_id != organization_id {
                        return Err(EngineError::InvalidOperation(format!(
                            "parent unit {} belongs to another organization",
                            parent_id
                        )));
                    }

                    let ancestors = t.ancestors(parent_id, max_depth)?;
                    if ancestors.iter().any(|a| a.id == unit_id) {
                        return Err(EngineError::InvalidOperation(format!(
                            "cannot move unit {} under its own descendant {}",
                            unit_id, parent_id
                        )));
                    }

                    let height = t.subtree(unit_id)?.iter().map(|(_, d)| *d).max().unwrap_or(0);
                    if ancestors.len() + 2 + height > max_depth {
                        return Err(EngineError::InvalidOperation(format!(
                            "unit tree would exceed {} levels",
                            max_depth
                        )));
                    }
                }

                let unit = t
                    .units
                    .get_mut(&unit_id)
                    .ok_or_else(|| EngineError::not_found("org unit", unit_id))?;
                let old_parent_id = unit.parent_id;
                unit.parent_id = new_parent_id;
                unit.updated_at = now;
                Ok((unit.clone(), old_parent_id))
            })
            .await?;

        tracing::info!(
            unit_id = %unit_id,
            old_parent_id = ?old_parent_id,
            new_parent_id = ?new_parent_id,
            "Org unit moved"
        );
        self.ctx
            .publish(
                OrgUnitEvent::Moved {
                    unit_id,
                    old_parent_id,
                    new_parent_id,
                }
                .to_event(unit.organization_id),
            )
            .await;

        Ok(unit)
    }

    /// Delete a unit and its whole subtree.
    ///
    /// Units are removed leaves first and members of every removed unit are
    /// detached. One `org_unit.deleted` event is published per unit in the
    /// same order. Returns the number of deleted units.
    pub async fn remove(&self, unit_id: Uuid) -> EngineResult<usize> {
        let (organization_id, removed) = self
            .ctx
            .store
            .write(|t| -> EngineResult<(Uuid, Vec<(OrgUnit, usize)>)> {
                let organization_id = t.unit(unit_id)?.organization_id;
                let order = t.subtree(unit_id)?;

                let mut removed = Vec::with_capacity(order.len());
                for (id, _) in order.into_iter().rev() {
                    if let Some(unit) = t.units.remove(&id) {
                        let detached = t.detach_unit_members(id);
                        removed.push((unit, detached));
                    }
                }
                Ok((organization_id, removed))
            })
            .await?;

        let detached_total: usize = removed.iter().map(|(_, d)| d).sum();
        tracing::info!(
            organization_id = %organization_id,
            unit_id = %unit_id,
            deleted = removed.len(),
            detached_members = detached_total,
            "Org unit subtree deleted"
        );

        let count = removed.len();
        let events = removed
            .into_iter()
            .map(|(unit, detached_members)| {
                OrgUnitEvent::Deleted {
                    unit_id: unit.id,
                    parent_id: unit.parent_id,
                    detached_members,
                }
                .to_event(organization_id)
            })
            .collect();
        self.ctx.publish_all(events).await;

        Ok(count)
    }

    /// Get a unit by id.
    pub async fn get(&self, unit_id: Uuid) -> EngineResult<OrgUnit> {
        self.ctx.store.read(|t| t.unit(unit_id).cloned()).await
    }

    /// All units of an organization, ordered by `display_order`.
    pub async fn list(&self, organization_id: Uuid) -> Vec<OrgUnit> {
        self.ctx
            .store
            .read(|t| {
                let mut units: Vec<OrgUnit> = t
                    .units
                    .values()
                    .filter(|u| u.organization_id == organization_id)
                    .cloned()
                    .collect();
                units.sort_by(|a, b| {
                    a.display_order
                        .cmp(&b.display_order)
                        .then(a.created_at.cmp(&b.created_at))
                        .then(a.id.cmp(&b.id))
                });
                units
            })
            .await
    }

    /// The organization's unit forest, siblings ordered at every level.
    pub async fn get_tree(&self, organization_id: Uuid) -> Vec<OrgUnitNode> {
        build_forest(self.list(organization_id).await)
    }

    /// Direct children of a unit, ordered by `display_order`.
    pub async fn get_children(&self, unit_id: Uuid) -> EngineResult<Vec<OrgUnit>> {
        self.ctx
            .store
            .read(|t| -> EngineResult<Vec<OrgUnit>> {
                let unit = t.unit(unit_id)?;
                Ok(t.children(unit.organization_id, Some(unit_id))
                    .into_iter()
                    .cloned()
                    .collect())
            })
            .await
    }

    /// Parent chain of a unit, nearest first.
    pub async fn ancestors(&self, unit_id: Uuid) -> EngineResult<Vec<OrgUnit>> {
        let max_depth = self.ctx.config.max_tree_depth;
        self.ctx
            .store
            .read(|t| {
                t.ancestors(unit_id, max_depth)
                    .map(|chain| chain.into_iter().cloned().collect())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AccessEngine;
    use crate::EngineConfig;
    use filing_org::{Member, PlatformRole, UnitType};

    async fn seed(engine: &AccessEngine, org_id: Uuid) -> (OrgUnit, OrgUnit, OrgUnit) {
        let units = engine.org_units();
        let root = units
            .create(NewOrgUnit::new(org_id, "Presidency", UnitType::Presidency))
            .await
            .unwrap();
        let direction = units
            .create(NewOrgUnit::new(org_id, "Finance", UnitType::Direction).under(root.id))
            .await
            .unwrap();
        let department = units
            .create(NewOrgUnit::new(org_id, "Accounting", UnitType::Department).under(direction.id))
            .await
            .unwrap();
        (root, direction, department)
    }

    #[tokio::test]
    async fn test_create_appends_display_order() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let (root, _, _) = seed(&engine, org_id).await;

        let second = engine
            .org_units()
            .create(NewOrgUnit::new(org_id, "Legal", UnitType::Direction).under(root.id))
            .await
            .unwrap();
        assert_eq!(second.display_order, 1);
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let engine = AccessEngine::builder().build().unwrap();
        let err = engine
            .org_units()
            .create(NewOrgUnit::new(Uuid::now_v7(), "Orphan", UnitType::Office).under(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_respects_max_depth() {
        let engine = AccessEngine::builder()
            .config(EngineConfig {
                max_tree_depth: 3,
                ..EngineConfig::default()
            })
            .build()
            .unwrap();
        let org_id = Uuid::now_v7();
        let (_, _, department) = seed(&engine, org_id).await;

        let err = engine
            .org_units()
            .create(NewOrgUnit::new(org_id, "Too deep", UnitType::Service).under(department.id))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_move_rejects_cycles() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let (root, direction, department) = seed(&engine, org_id).await;
        let units = engine.org_units();

        let err = units.move_unit(root.id, Some(department.id)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));

        let err = units.move_unit(direction.id, Some(direction.id)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));

        // Tree is unchanged.
        assert_eq!(units.get(root.id).await.unwrap().parent_id, None);
    }

    #[tokio::test]
    async fn test_move_to_root_and_back() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let (root, direction, department) = seed(&engine, org_id).await;
        let units = engine.org_units();

        let moved = units.move_unit(department.id, None).await.unwrap();
        assert!(moved.is_root());
        assert_eq!(units.get_tree(org_id).await.len(), 2);

        units.move_unit(department.id, Some(root.id)).await.unwrap();
        let children = units.get_children(root.id).await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(units.get_children(direction.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_cascades_and_detaches() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let (root, direction, department) = seed(&engine, org_id).await;

        engine
            .members()
            .upsert(Member::new(org_id, "alice", PlatformRole::Member).in_unit(department.id))
            .await
            .unwrap();

        let deleted = engine.org_units().remove(direction.id).await.unwrap();
        assert_eq!(deleted, 2);

        let member = engine.members().get(org_id, "alice").await.unwrap();
        assert_eq!(member.org_unit_id, None);

        let remaining = engine.org_units().list(org_id).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, root.id);
    }

    #[tokio::test]
    async fn test_ancestors_nearest_first() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let (root, direction, department) = seed(&engine, org_id).await;

        let chain: Vec<Uuid> = engine
            .org_units()
            .ancestors(department.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(chain, vec![direction.id, root.id]);
    }
}
