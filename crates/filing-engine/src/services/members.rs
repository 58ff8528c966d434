//! Member directory.
//!
//! Membership records are provisioned by the identity side of the platform;
//! the access core only reads them during resolution. They live in the same
//! data store as the policy tables so a resolution sees one consistent
//! snapshot of member, override and rules.

use std::sync::Arc;

use uuid::Uuid;

use filing_org::Member;

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};

/// Lookup and provisioning of organization members.
#[derive(Debug, Clone)]
pub struct MemberDirectory {
    ctx: Arc<EngineContext>,
}

impl MemberDirectory {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Insert or replace the member record of `(organization_id, user_id)`.
    ///
    /// The referenced unit and business role must exist. A replaced record
    /// keeps its original id.
    pub async fn upsert(&self, member: Member) -> EngineResult<Member> {
        let member = self
            .ctx
            .store
            .write(|t| -> EngineResult<Member> {
                if let Some(unit_id) = member.org_unit_id {
                    t.unit(unit_id)?;
                }
                if let Some(role_id) = member.business_role_id {
                    t.role(role_id)?;
                }

                let key = (member.organization_id, member.user_id.clone());
                let mut member = member;
                if let Some(existing) = t.members.get(&key) {
                    member.id = existing.id;
                }
                t.members.insert(key, member.clone());
                Ok(member)
            })
            .await?;

        tracing::debug!(
            organization_id = %member.organization_id,
            user_id = %member.user_id,
            platform_role = %member.platform_role.as_str(),
            "Member upserted"
        );
        Ok(member)
    }

    /// Get the member record of a user, if any.
    pub async fn get(&self, organization_id: Uuid, user_id: &str) -> Option<Member> {
        self.ctx
            .store
            .read(|t| t.member(organization_id, user_id).cloned())
            .await
    }

    /// Remove a member record.
    pub async fn remove(&self, organization_id: Uuid, user_id: &str) -> EngineResult<Member> {
        let removed = self
            .ctx
            .store
            .write(|t| t.members.remove(&(organization_id, user_id.to_string())))
            .await
            .ok_or_else(|| EngineError::NotFound {
                entity: "member",
                id: user_id.to_string(),
            })?;

        tracing::debug!(organization_id = %organization_id, user_id = %user_id, "Member removed");
        Ok(removed)
    }

    /// Members placed in a unit.
    pub async fn list_by_unit(&self, org_unit_id: Uuid) -> Vec<Member> {
        self.ctx
            .store
            .read(|t| {
                let mut members: Vec<Member> = t
                    .members
                    .values()
                    .filter(|m| m.org_unit_id == Some(org_unit_id))
                    .cloned()
                    .collect();
                members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
                members
            })
            .await
    }
}
