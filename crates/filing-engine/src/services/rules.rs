//! Access rule matrix.
//!
//! Rules attach an access level to a filing cell for members matching an
//! optional unit and an optional business role. There is no uniqueness
//! constraint; overlapping rules are arbitrated by priority at resolution.

use std::sync::Arc;

use uuid::Uuid;

use filing_access::{AccessRule, AccessRuleUpdate, NewAccessRule};
use filing_events::AccessRuleEvent;

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::store::Tables;

/// Store for access rules.
#[derive(Debug, Clone)]
pub struct AccessRuleService {
    ctx: Arc<EngineContext>,
}

/// Check that the unit and role a rule targets exist.
fn check_targets(t: &Tables, org_unit_id: Option<Uuid>, business_role_id: Option<Uuid>) -> EngineResult<()> {
    if let Some(unit_id) = org_unit_id {
        t.unit(unit_id)?;
    }
    if let Some(role_id) = business_role_id {
        t.role(role_id)?;
    }
    Ok(())
}

fn created_event(rule: &AccessRule) -> filing_events::Event {
    AccessRuleEvent::Created {
        rule_id: rule.id,
        filing_cell_id: rule.filing_cell_id,
        access_level: rule.access_level,
        priority: rule.priority,
    }
    .to_event(rule.organization_id)
}

impl AccessRuleService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Create a rule. Priority defaults to `0`.
    pub async fn create_rule(&self, input: NewAccessRule) -> EngineResult<AccessRule> {
        let now = self.ctx.clock.now();
        let rule = self
            .ctx
            .store
            .write(|t| -> EngineResult<AccessRule> {
                check_targets(t, input.org_unit_id, input.business_role_id)?;
                let rule = input.into_rule(now);
                t.rules.insert(rule.id, rule.clone());
                Ok(rule)
            })
            .await?;

        tracing::info!(
            rule_id = %rule.id,
            filing_cell_id = %rule.filing_cell_id,
            access_level = %rule.access_level,
            priority = rule.priority,
            "Access rule created"
        );
        self.ctx.publish(created_event(&rule)).await;

        Ok(rule)
    }

    /// Create a batch of rules.
    ///
    /// The batch is validated as a whole and inserted in one transaction: if
    /// any rule references a missing unit or role, none is inserted.
    pub async fn bulk_create_rules(&self, inputs: Vec<NewAccessRule>) -> EngineResult<Vec<AccessRule>> {
        let now = self.ctx.clock.now();
        let rules = self
            .ctx
            .store
            .write(|t| -> EngineResult<Vec<AccessRule>> {
                for input in &inputs {
                    check_targets(t, input.org_unit_id, input.business_role_id)?;
                }
                let rules: Vec<AccessRule> = inputs.into_iter().map(|i| i.into_rule(now)).collect();
                for rule in &rules {
                    t.rules.insert(rule.id, rule.clone());
                }
                Ok(rules)
            })
            .await?;

        tracing::info!(count = rules.len(), "Access rules bulk created");
        self.ctx
            .publish_all(rules.iter().map(created_event).collect())
            .await;

        Ok(rules)
    }

    /// Update a rule.
    pub async fn update_rule(&self, rule_id: Uuid, update: AccessRuleUpdate) -> EngineResult<AccessRule> {
        let now = self.ctx.clock.now();
        let rule = self
            .ctx
            .store
            .write(|t| -> EngineResult<AccessRule> {
                if !t.rules.contains_key(&rule_id) {
                    return Err(EngineError::not_found("access rule", rule_id));
                }
                check_targets(t, update.org_unit_id.flatten(), update.business_role_id.flatten())?;

                let rule = t
                    .rules
                    .get_mut(&rule_id)
                    .ok_or_else(|| EngineError::not_found("access rule", rule_id))?;
                rule.apply(update, now);
                Ok(rule.clone())
            })
            .await?;

        tracing::debug!(rule_id = %rule_id, "Access rule updated");
        self.ctx
            .publish(
                AccessRuleEvent::Updated {
                    rule_id,
                    filing_cell_id: rule.filing_cell_id,
                }
                .to_event(rule.organization_id),
            )
            .await;

        Ok(rule)
    }

    /// Delete a rule.
    pub async fn remove_rule(&self, rule_id: Uuid) -> EngineResult<AccessRule> {
        let rule = self
            .ctx
            .store
            .write(|t| t.rules.remove(&rule_id))
            .await
            .ok_or_else(|| EngineError::not_found("access rule", rule_id))?;

        tracing::info!(rule_id = %rule_id, filing_cell_id = %rule.filing_cell_id, "Access rule deleted");
        self.ctx
            .publish(
                AccessRuleEvent::Deleted {
                    rule_id,
                    filing_cell_id: rule.filing_cell_id,
                }
                .to_event(rule.organization_id),
            )
            .await;

        Ok(rule)
    }

    /// Get a rule by id.
    pub async fn get_rule(&self, rule_id: Uuid) -> EngineResult<AccessRule> {
        self.ctx
            .store
            .read(|t| t.rules.get(&rule_id).cloned())
            .await
            .ok_or_else(|| EngineError::not_found("access rule", rule_id))
    }

    /// Rules attached to a cell, oldest first.
    pub async fn list_rules_for_cell(&self, filing_cell_id: Uuid, include_inactive: bool) -> Vec<AccessRule> {
        self.ctx
            .store
            .read(|t| t.rules_for_cell(filing_cell_id, include_inactive))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AccessEngine;
    use filing_access::AccessLevel;

    #[tokio::test]
    async fn test_priority_defaults_to_zero() {
        let engine = AccessEngine::builder().build().unwrap();
        let rule = engine
            .rules()
            .create_rule(NewAccessRule::new(Uuid::now_v7(), Uuid::now_v7(), AccessLevel::Read))
            .await
            .unwrap();
        assert_eq!(rule.priority, 0);
        assert!(rule.is_wildcard());
    }

    #[tokio::test]
    async fn test_bulk_create_is_all_or_nothing() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let cell = Uuid::now_v7();

        let err = engine
            .rules()
            .bulk_create_rules(vec![
                NewAccessRule::new(org_id, cell, AccessLevel::Read),
                NewAccessRule::new(org_id, cell, AccessLevel::Write).for_unit(Uuid::now_v7()),
            ])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(engine.rules().list_rules_for_cell(cell, true).await.is_empty());

        let rules = engine
            .rules()
            .bulk_create_rules(vec![
                NewAccessRule::new(org_id, cell, AccessLevel::Read),
                NewAccessRule::new(org_id, cell, AccessLevel::Write).with_priority(5),
            ])
            .await
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(engine.rules().list_rules_for_cell(cell, false).await.len(), 2);
    }

    #[tokio::test]
    async fn test_deactivated_rule_is_hidden_from_active_listing() {
        let engine = AccessEngine::builder().build().unwrap();
        let cell = Uuid::now_v7();
        let rule = engine
            .rules()
            .create_rule(NewAccessRule::new(Uuid::now_v7(), cell, AccessLevel::Manage))
            .await
            .unwrap();

        engine
            .rules()
            .update_rule(rule.id, AccessRuleUpdate::set_active(false))
            .await
            .unwrap();

        assert!(engine.rules().list_rules_for_cell(cell, false).await.is_empty());
        assert_eq!(engine.rules().list_rules_for_cell(cell, true).await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_rule() {
        let engine = AccessEngine::builder().build().unwrap();
        let err = engine.rules().remove_rule(Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
