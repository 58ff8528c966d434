//! Business role registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use filing_events::{AccessRuleEvent, BusinessRoleEvent};
use filing_org::{BusinessRole, BusinessRoleUpdate, NewBusinessRole, UnitType};

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};

/// What a role deletion took with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRemoval {
    /// Members whose `business_role_id` was cleared.
    pub detached_members: usize,
    /// Rules referencing the role that were deleted.
    pub deleted_rules: Vec<Uuid>,
}

/// Store for business roles.
#[derive(Debug, Clone)]
pub struct BusinessRoleService {
    ctx: Arc<EngineContext>,
}

impl BusinessRoleService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Create a role.
    pub async fn create(&self, input: NewBusinessRole) -> EngineResult<BusinessRole> {
        let role = input.into_role(self.ctx.clock.now());
        let stored = role.clone();
        self.ctx
            .store
            .write(|t| t.roles.insert(stored.id, stored))
            .await;

        tracing::info!(
            organization_id = %role.organization_id,
            role_id = %role.id,
            name = %role.name,
            "Business role created"
        );
        self.ctx
            .publish(
                BusinessRoleEvent::Created {
                    role_id: role.id,
                    name: role.name.clone(),
                }
                .to_event(role.organization_id),
            )
            .await;

        Ok(role)
    }

    /// Update a role.
    pub async fn update(&self, role_id: Uuid, update: BusinessRoleUpdate) -> EngineResult<BusinessRole> {
        let now = self.ctx.clock.now();
        let role = self
            .ctx
            .store
            .write(|t| -> EngineResult<BusinessRole> {
                let role = t
                    .roles
                    .get_mut(&role_id)
                    .ok_or_else(|| EngineError::not_found("business role", role_id))?;
                role.apply(update, now);
                Ok(role.clone())
            })
            .await?;

        tracing::debug!(role_id = %role_id, "Business role updated");
        self.ctx
            .publish(BusinessRoleEvent::Updated { role_id }.to_event(role.organization_id))
            .await;

        Ok(role)
    }

    /// Delete a role.
    ///
    /// Without `force` the deletion fails with `Conflict` while any member or
    /// rule references the role. With `force` those members are detached and
    /// the rules deleted before the role itself.
    pub async fn remove(&self, role_id: Uuid, force: bool) -> EngineResult<RoleRemoval> {
        let (organization_id, removal, rule_cells) = self
            .ctx
            .store
            .write(|t| -> EngineResult<(Uuid, RoleRemoval, Vec<(Uuid, Uuid)>)> {
                let organization_id = t.role(role_id)?.organization_id;

                let member_refs = t
                    .members
                    .values()
                    .filter(|m| m.business_role_id == Some(role_id))
                    .count();
                let rule_refs: Vec<(Uuid, Uuid)> = t
                    .rules
                    .values()
                    .filter(|r| r.references_role(role_id))
                    .map(|r| (r.id, r.filing_cell_id))
                    .collect();

                if !force && (member_refs > 0 || !rule_refs.is_empty()) {
                    return Err(EngineError::Conflict(format!(
                        "business role {} is referenced by {} members and {} rules",
                        role_id,
                        member_refs,
                        rule_refs.len()
                    )));
                }

                for member in t.members.values_mut() {
                    if member.business_role_id == Some(role_id) {
                        member.business_role_id = None;
                    }
                }
                for (rule_id, _) in &rule_refs {
                    t.rules.remove(rule_id);
                }
                t.roles.remove(&role_id);

                let removal = RoleRemoval {
                    detached_members: member_refs,
                    deleted_rules: rule_refs.iter().map(|(id, _)| *id).collect(),
                };
                Ok((organization_id, removal, rule_refs))
            })
            .await?;

        tracing::info!(
            role_id = %role_id,
            forced = force,
            detached_members = removal.detached_members,
            deleted_rules = removal.deleted_rules.len(),
            "Business role deleted"
        );

        let mut events: Vec<_> = rule_cells
            .into_iter()
            .map(|(rule_id, filing_cell_id)| {
                AccessRuleEvent::Deleted {
                    rule_id,
                    filing_cell_id,
                }
                .to_event(organization_id)
            })
            .collect();
        events.push(
            BusinessRoleEvent::Deleted {
                role_id,
                forced: force,
                detached_members: removal.detached_members,
                deleted_rules: removal.deleted_rules.len(),
            }
            .to_event(organization_id),
        );
        self.ctx.publish_all(events).await;

        Ok(removal)
    }

    /// Get a role by id.
    pub async fn get(&self, role_id: Uuid) -> EngineResult<BusinessRole> {
        self.ctx.store.read(|t| t.role(role_id).cloned()).await
    }

    /// Roles of an organization that may be held in units of `unit_type`,
    /// including roles not tied to any unit type.
    pub async fn list_by_unit_type(&self, organization_id: Uuid, unit_type: UnitType) -> Vec<BusinessRole> {
        self.list_where(organization_id, |r| r.applies_to(unit_type)).await
    }

    /// Roles of an organization in a category.
    pub async fn list_by_category(&self, organization_id: Uuid, category: &str) -> Vec<BusinessRole> {
        self.list_where(organization_id, |r| r.category.as_deref() == Some(category))
            .await
    }

    async fn list_where(
        &self,
        organization_id: Uuid,
        predicate: impl Fn(&BusinessRole) -> bool,
    ) -> Vec<BusinessRole> {
        self.ctx
            .store
            .read(|t| {
                let mut roles: Vec<BusinessRole> = t
                    .roles
                    .values()
                    .filter(|r| r.organization_id == organization_id && predicate(r))
                    .cloned()
                    .collect();
                roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
                roles
            })
            .await
    }
}
