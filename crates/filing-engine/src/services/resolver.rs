//! Access resolution over the data store.
//!
//! Member, override and rules are read from one snapshot and handed to the
//! pure precedence function of `filing-access`. Resolution never fails: a
//! missing member or policy yields a "no access" answer.

use std::sync::Arc;

use uuid::Uuid;

use filing_access::{evaluate, AccessResolution, Evaluation, ResolutionInput};

use crate::engine::EngineContext;
use crate::store::Tables;

/// Computes effective access levels.
#[derive(Debug, Clone)]
pub struct AccessResolver {
    ctx: Arc<EngineContext>,
}

impl AccessResolver {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Effective access of `user_id` on `filing_cell_id` within `organization_id`.
    pub async fn resolve(&self, user_id: &str, filing_cell_id: Uuid, organization_id: Uuid) -> AccessResolution {
        let evaluation = self
            .ctx
            .store
            .read(|t| self.evaluate_in(t, user_id, filing_cell_id, organization_id))
            .await;
        self.report(user_id, filing_cell_id, evaluation)
    }

    /// Resolve several cells for one user from the same snapshot.
    ///
    /// Results are returned in the order of `filing_cell_ids`.
    pub async fn resolve_many(
        &self,
        user_id: &str,
        filing_cell_ids: &[Uuid],
        organization_id: Uuid,
    ) -> Vec<(Uuid, AccessResolution)> {
        let evaluations: Vec<(Uuid, Evaluation)> = self
            .ctx
            .store
            .read(|t| {
                filing_cell_ids
                    .iter()
                    .map(|cell| (*cell, self.evaluate_in(t, user_id, *cell, organization_id)))
                    .collect()
            })
            .await;

        evaluations
            .into_iter()
            .map(|(cell, evaluation)| (cell, self.report(user_id, cell, evaluation)))
            .collect()
    }

    fn evaluate_in(&self, t: &Tables, user_id: &str, filing_cell_id: Uuid, organization_id: Uuid) -> Evaluation {
        let member = t.member(organization_id, user_id);
        let active_override = t
            .active_override(filing_cell_id, user_id)
            .filter(|o| o.organization_id == organization_id);
        let rules: Vec<_> = t
            .rules_for_cell(filing_cell_id, false)
            .into_iter()
            .filter(|r| r.organization_id == organization_id)
            .collect();

        evaluate(
            &ResolutionInput {
                filing_cell_id,
                member,
                active_override,
                rules: &rules,
                now: self.ctx.clock.now(),
            },
            &self.ctx.config.resolution_policy(),
        )
    }

    fn report(&self, user_id: &str, filing_cell_id: Uuid, evaluation: Evaluation) -> AccessResolution {
        let Evaluation {
            resolution,
            tied_rule_ids,
        } = evaluation;

        if !tied_rule_ids.is_empty() && self.ctx.config.warn_on_priority_ties {
            tracing::warn!(
                filing_cell_id = %filing_cell_id,
                user_id = %user_id,
                rule_id = ?resolution.rule_id,
                tied_with = ?tied_rule_ids,
                "Matching access rules share the winning priority"
            );
        }

        tracing::debug!(
            filing_cell_id = %filing_cell_id,
            user_id = %user_id,
            effective_access = %resolution.effective_access,
            source = resolution.source.as_str(),
            capped_by = ?resolution.capped_by,
            "Access resolved"
        );

        resolution
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::AccessEngine;
    use filing_access::{AccessLevel, NewAccessRule, ResolutionSource};
    use filing_org::{Member, PlatformRole};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_unknown_user_gets_none() {
        let engine = AccessEngine::builder().build().unwrap();
        let resolution = engine
            .resolve_user_access("ghost", Uuid::now_v7(), Uuid::now_v7())
            .await;
        assert_eq!(resolution.effective_access, AccessLevel::None);
        assert_eq!(resolution.source, ResolutionSource::None);
    }

    #[tokio::test]
    async fn test_rules_of_other_organizations_are_ignored() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let cell = Uuid::now_v7();

        engine
            .members()
            .upsert(Member::new(org_id, "frank", PlatformRole::Manager))
            .await
            .unwrap();
        engine
            .rules()
            .create_rule(NewAccessRule::new(Uuid::now_v7(), cell, AccessLevel::Read))
            .await
            .unwrap();

        let resolution = engine.resolve_user_access("frank", cell, org_id).await;
        assert_eq!(resolution.source, ResolutionSource::Default);
    }

    #[tokio::test]
    async fn test_resolve_many_keeps_order() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let (open, closed) = (Uuid::now_v7(), Uuid::now_v7());

        engine
            .members()
            .upsert(Member::new(org_id, "gina", PlatformRole::Member))
            .await
            .unwrap();
        engine
            .rules()
            .create_rule(NewAccessRule::new(org_id, open, AccessLevel::Read))
            .await
            .unwrap();

        let results = engine
            .resolver()
            .resolve_many("gina", &[closed, open], org_id)
            .await;
        assert_eq!(results[0].0, closed);
        assert_eq!(results[0].1.effective_access, AccessLevel::None);
        assert_eq!(results[1].0, open);
        assert_eq!(results[1].1.effective_access, AccessLevel::Read);
    }
}
