//! Per-user access overrides.
//!
//! At most one override is active per `(filing_cell_id, user_id)`. Granting
//! a new one deactivates its predecessors in the same write transaction, so
//! concurrent grants serialize. Expiry is evaluated lazily against the clock;
//! the optional sweeper only tidies the `active` flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use filing_access::{AccessOverride, AccessOverrideUpdate, NewAccessOverride, OverrideRemoval};
use filing_events::AccessOverrideEvent;

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};

/// Store for access overrides.
#[derive(Debug, Clone)]
pub struct AccessOverrideService {
    ctx: Arc<EngineContext>,
}

impl AccessOverrideService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Grant an override, superseding any active one for the same cell and user.
    pub async fn create_override(&self, input: NewAccessOverride) -> EngineResult<AccessOverride> {
        let now = self.ctx.clock.now();
        let (grant, superseded) = self
            .ctx
            .store
            .write(|t| {
                let mut superseded = Vec::new();
                for existing in t.overrides.values_mut() {
                    if existing.active && existing.targets(input.filing_cell_id, &input.user_id) {
                        existing.deactivate(now);
                        superseded.push(existing.id);
                    }
                }

                let grant = input.into_override(now);
                t.overrides.insert(grant.id, grant.clone());
                (grant, superseded)
            })
            .await;

        tracing::info!(
            override_id = %grant.id,
            filing_cell_id = %grant.filing_cell_id,
            user_id = %grant.user_id,
            access_level = %grant.access_level,
            superseded = superseded.len(),
            "Access override granted"
        );
        self.ctx
            .publish(
                AccessOverrideEvent::Granted {
                    override_id: grant.id,
                    filing_cell_id: grant.filing_cell_id,
                    user_id: grant.user_id.clone(),
                    access_level: grant.access_level,
                    granted_by: grant.granted_by,
                    expires_at: grant.expires_at,
                    superseded,
                }
                .to_event(grant.organization_id),
            )
            .await;

        Ok(grant)
    }

    /// Change the level or reason of an override.
    pub async fn update_override(
        &self,
        override_id: Uuid,
        update: AccessOverrideUpdate,
    ) -> EngineResult<AccessOverride> {
        let now = self.ctx.clock.now();
        let grant = self
            .mutate(override_id, |grant| grant.apply(update, now))
            .await?;

        tracing::debug!(override_id = %override_id, "Access override updated");
        self.ctx
            .publish(AccessOverrideEvent::Updated { override_id }.to_event(grant.organization_id))
            .await;

        Ok(grant)
    }

    /// Set a new expiry date.
    ///
    /// Only `expires_at` changes: a superseded or removed override stays
    /// inactive.
    pub async fn extend_expiration(
        &self,
        override_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> EngineResult<AccessOverride> {
        let now = self.ctx.clock.now();
        let grant = self
            .mutate(override_id, |grant| {
                grant.expires_at = Some(expires_at);
                grant.updated_at = now;
            })
            .await?;

        tracing::debug!(override_id = %override_id, expires_at = %expires_at, "Access override expiration extended");
        self.ctx
            .publish(
                AccessOverrideEvent::ExpirationExtended {
                    override_id,
                    expires_at,
                }
                .to_event(grant.organization_id),
            )
            .await;

        Ok(grant)
    }

    /// Deactivate or purge an override.
    ///
    /// Returns the record as it was after deactivation, or as it was before
    /// being purged.
    pub async fn remove_override(
        &self,
        override_id: Uuid,
        mode: OverrideRemoval,
    ) -> EngineResult<AccessOverride> {
        let grant = match mode {
            OverrideRemoval::Deactivate => {
                let now = self.ctx.clock.now();
                self.mutate(override_id, |grant| grant.deactivate(now)).await?
            }
            OverrideRemoval::Purge => self
                .ctx
                .store
                .write(|t| t.overrides.remove(&override_id))
                .await
                .ok_or_else(|| EngineError::not_found("access override", override_id))?,
        };

        tracing::info!(override_id = %override_id, mode = ?mode, "Access override removed");
        self.ctx
            .publish(AccessOverrideEvent::Removed { override_id, mode }.to_event(grant.organization_id))
            .await;

        Ok(grant)
    }

    /// The active, unexpired override of a user on a cell.
    pub async fn get_for_cell_and_user(&self, filing_cell_id: Uuid, user_id: &str) -> Option<AccessOverride> {
        let now = self.ctx.clock.now();
        self.ctx
            .store
            .read(|t| {
                t.active_override(filing_cell_id, user_id)
                    .filter(|o| o.is_effective(now))
                    .cloned()
            })
            .await
    }

    /// Every override of a user in an organization, active or not, newest first.
    pub async fn list_for_user(&self, organization_id: Uuid, user_id: &str) -> Vec<AccessOverride> {
        self.ctx
            .store
            .read(|t| {
                let mut grants: Vec<AccessOverride> = t
                    .overrides
                    .values()
                    .filter(|o| o.organization_id == organization_id && o.user_id == user_id)
                    .cloned()
                    .collect();
                grants.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                grants
            })
            .await
    }

    /// Flip `active` off on every override that has expired.
    ///
    /// Resolution already ignores expired overrides, so this only keeps the
    /// stored flags tidy. Returns the ids of the swept overrides.
    pub async fn sweep_expired(&self) -> Vec<Uuid> {
        let now = self.ctx.clock.now();
        let swept: Vec<(Uuid, Uuid)> = self
            .ctx
            .store
            .write(|t| {
                t.overrides
                    .values_mut()
                    .filter(|o| o.active && o.is_expired(now))
                    .map(|o| {
                        o.deactivate(now);
                        (o.id, o.organization_id)
                    })
                    .collect()
            })
            .await;

        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "Expired access overrides swept");
        }
        let events = swept
            .iter()
            .map(|(override_id, org_id)| {
                AccessOverrideEvent::Expired {
                    override_id: *override_id,
                }
                .to_event(*org_id)
            })
            .collect();
        self.ctx.publish_all(events).await;

        swept.into_iter().map(|(id, _)| id).collect()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` on a
    /// background task until the returned handle is shut down.
    ///
    /// A zero interval is rejected with [`EngineError::InvalidOperation`].
    pub fn spawn_expiry_sweeper(&self, interval: Duration) -> EngineResult<ExpirySweeper> {
        if interval.is_zero() {
            return Err(EngineError::InvalidOperation(
                "expiry sweep interval must be non-zero".to_string(),
            ));
        }

        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        let service = self.clone();

        let handle = {
            let running = running.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tracing::info!(interval_secs = interval.as_secs(), "Override expiry sweeper started");
                let mut ticker = tokio::time::interval(interval);
                // The first tick completes immediately.
                ticker.tick().await;

                while running.load(Ordering::Relaxed) {
                    tokio::select! {
                        _ = ticker.tick() => {
                            service.sweep_expired().await;
                        }
                        _ = shutdown.notified() => break,
                    }
                }
                tracing::info!("Override expiry sweeper stopped");
            })
        };

        Ok(ExpirySweeper {
            running,
            shutdown,
            handle,
        })
    }

    async fn mutate(
        &self,
        override_id: Uuid,
        f: impl FnOnce(&mut AccessOverride),
    ) -> EngineResult<AccessOverride> {
        self.ctx
            .store
            .write(|t| -> EngineResult<AccessOverride> {
                let grant = t
                    .overrides
                    .get_mut(&override_id)
                    .ok_or_else(|| EngineError::not_found("access override", override_id))?;
                f(grant);
                Ok(grant.clone())
            })
            .await
    }
}

/// Handle of a running expiry sweeper.
#[derive(Debug)]
pub struct ExpirySweeper {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Check if the sweeper task is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && !self.handle.is_finished()
    }

    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(self) {
        self.running.store(false, Ordering::Relaxed);
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Override expiry sweeper task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::engine::AccessEngine;
    use filing_access::AccessLevel;

    fn engine_at(clock: Arc<FixedClock>) -> AccessEngine {
        AccessEngine::builder().clock(clock).build().unwrap()
    }

    #[tokio::test]
    async fn test_create_supersedes_previous() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let cell = Uuid::now_v7();
        let admin = Uuid::now_v7();
        let overrides = engine.overrides();

        let first = overrides
            .create_override(NewAccessOverride::new(org_id, cell, "erin", AccessLevel::Read, admin))
            .await
            .unwrap();
        let second = overrides
            .create_override(NewAccessOverride::new(org_id, cell, "erin", AccessLevel::Write, admin))
            .await
            .unwrap();

        let active = overrides.get_for_cell_and_user(cell, "erin").await.unwrap();
        assert_eq!(active.id, second.id);

        let all = overrides.list_for_user(org_id, "erin").await;
        assert_eq!(all.len(), 2);
        let old = all.iter().find(|o| o.id == first.id).unwrap();
        assert!(!old.active);
    }

    #[tokio::test]
    async fn test_extend_does_not_reactivate() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let cell = Uuid::now_v7();
        let overrides = engine.overrides();

        let grant = overrides
            .create_override(NewAccessOverride::new(org_id, cell, "erin", AccessLevel::Read, Uuid::now_v7()))
            .await
            .unwrap();
        overrides
            .remove_override(grant.id, OverrideRemoval::Deactivate)
            .await
            .unwrap();

        let extended = overrides
            .extend_expiration(grant.id, Utc::now() + chrono::Duration::days(30))
            .await
            .unwrap();
        assert!(!extended.active);
        assert!(overrides.get_for_cell_and_user(cell, "erin").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_deletes_record() {
        let engine = AccessEngine::builder().build().unwrap();
        let org_id = Uuid::now_v7();
        let overrides = engine.overrides();

        let grant = overrides
            .create_override(NewAccessOverride::new(
                org_id,
                Uuid::now_v7(),
                "erin",
                AccessLevel::Read,
                Uuid::now_v7(),
            ))
            .await
            .unwrap();
        overrides
            .remove_override(grant.id, OverrideRemoval::Purge)
            .await
            .unwrap();

        assert!(overrides.list_for_user(org_id, "erin").await.is_empty());
        let err = overrides
            .remove_override(grant.id, OverrideRemoval::Purge)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let engine = engine_at(clock.clone());
        let org_id = Uuid::now_v7();
        let cell = Uuid::now_v7();
        let overrides = engine.overrides();

        let grant = overrides
            .create_override(
                NewAccessOverride::new(org_id, cell, "erin", AccessLevel::Write, Uuid::now_v7())
                    .expiring_at(clock.now() + chrono::Duration::hours(1)),
            )
            .await
            .unwrap();
        assert!(overrides.sweep_expired().await.is_empty());

        clock.advance(chrono::Duration::hours(1));
        assert!(overrides.get_for_cell_and_user(cell, "erin").await.is_none());
        assert_eq!(overrides.sweep_expired().await, vec![grant.id]);
        assert!(!overrides.list_for_user(org_id, "erin").await[0].active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_until_shutdown() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let engine = engine_at(clock.clone());
        let org_id = Uuid::now_v7();
        let overrides = engine.overrides();

        overrides
            .create_override(
                NewAccessOverride::new(org_id, Uuid::now_v7(), "erin", AccessLevel::Read, Uuid::now_v7())
                    .expiring_at(clock.now()),
            )
            .await
            .unwrap();

        let sweeper = overrides.spawn_expiry_sweeper(Duration::from_secs(60)).unwrap();
        assert!(sweeper.is_running());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!overrides.list_for_user(org_id, "erin").await[0].active);

        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let engine = engine_at(Arc::new(FixedClock::new(Utc::now())));
        let err = engine
            .overrides()
            .spawn_expiry_sweeper(Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
    }
}
