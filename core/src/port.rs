use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use crate::local::LocalStore;
use crate::models::{Outcome, Plan, PlanDraft, Routed, Snapshot, is_server_id};

/// A place the latest calculation and the plan list can be kept.
///
/// The local store implements this directly; the CLI implements it over the
/// REST API. Everything runs on one task, so futures need not be `Send`.
#[async_trait(?Send)]
pub trait PersistencePort {
    async fn load_profile(&self) -> Result<Option<Snapshot>>;
    async fn save_profile(&self, snapshot: &Snapshot) -> Result<()>;
    async fn clear_profile(&self) -> Result<()>;
    async fn list_plans(&self) -> Result<Vec<Plan>>;
    async fn create_plan(&self, draft: &PlanDraft) -> Result<Plan>;
    async fn delete_plan(&self, id: &str) -> Result<()>;
}

/// Build a plan with a local id: the creation time in epoch milliseconds,
/// bumped until it no longer collides with an existing id.
#[must_use]
pub fn new_local_plan(draft: &PlanDraft, existing: &[Plan], now: DateTime<Utc>) -> Plan {
    let mut millis = now.timestamp_millis();
    while existing.iter().any(|p| p.id == millis.to_string()) {
        millis += 1;
    }
    Plan {
        id: millis.to_string(),
        name: draft.local_name(now.with_timezone(&Local)),
        goal: draft.goal,
        created_at: now,
        snapshot: draft.snapshot.clone(),
    }
}

pub struct LocalPort {
    store: LocalStore,
}

impl LocalPort {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Plan list for a write. An unreadable cache counts as empty so the
    /// write replaces it instead of failing.
    fn plans_for_write(&self) -> Vec<Plan> {
        self.store.plans().unwrap_or_else(|e| {
            warn!("replacing unreadable plan cache: {e:#}");
            Vec::new()
        })
    }
}

#[async_trait(?Send)]
impl PersistencePort for LocalPort {
    async fn load_profile(&self) -> Result<Option<Snapshot>> {
        self.store.snapshot()
    }

    async fn save_profile(&self, snapshot: &Snapshot) -> Result<()> {
        self.store.set_snapshot(snapshot)
    }

    async fn clear_profile(&self) -> Result<()> {
        self.store.clear_snapshot()?;
        Ok(())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        self.store.plans()
    }

    async fn create_plan(&self, draft: &PlanDraft) -> Result<Plan> {
        let mut plans = self.plans_for_write();
        let plan = new_local_plan(draft, &plans, Utc::now());
        plans.insert(0, plan.clone());
        self.store.set_plans(&plans)?;
        Ok(plan)
    }

    async fn delete_plan(&self, id: &str) -> Result<()> {
        let Ok(mut plans) = self.store.plans() else {
            warn!(id, "plan cache unreadable, nothing to delete locally");
            return Ok(());
        };
        let before = plans.len();
        plans.retain(|p| p.id != id);
        if plans.len() != before {
            self.store.set_plans(&plans)?;
        }
        Ok(())
    }
}

/// Remote first, local always.
///
/// The remote port is present only when a credential is. Remote failures are
/// logged and absorbed; local failures propagate, since the local store is
/// the one that must work.
pub struct FallbackPort<R> {
    remote: Option<R>,
    local: LocalPort,
}

impl<R: PersistencePort> FallbackPort<R> {
    #[must_use]
    pub fn new(remote: Option<R>, local: LocalPort) -> Self {
        Self { remote, local }
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    #[must_use]
    pub fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }

    #[must_use]
    pub fn local(&self) -> &LocalPort {
        &self.local
    }

    /// Remote snapshot when one exists, otherwise whatever is cached locally.
    pub async fn load_profile(&self) -> Result<Routed<Option<Snapshot>>> {
        let cached = self.local.load_profile().await;
        if let Some(remote) = &self.remote {
            match remote.load_profile().await {
                Ok(Some(snapshot)) => {
                    return Ok(Routed {
                        value: Some(snapshot),
                        outcome: Outcome::Remote,
                    });
                }
                Ok(None) => debug!("no calorie profile on server, keeping local copy"),
                Err(e) => debug!("ignoring remote calorie load failure: {e:#}"),
            }
            return Ok(Routed {
                value: cached?,
                outcome: Outcome::LocalFallback,
            });
        }
        Ok(Routed {
            value: cached?,
            outcome: Outcome::LocalOnly,
        })
    }

    /// The local copy is always written; the remote upsert is best effort.
    pub async fn save_profile(&self, snapshot: &Snapshot) -> Result<Outcome> {
        self.local.save_profile(snapshot).await?;
        let Some(remote) = &self.remote else {
            return Ok(Outcome::LocalOnly);
        };
        match remote.save_profile(snapshot).await {
            Ok(()) => Ok(Outcome::Remote),
            Err(e) => {
                warn!("remote calorie save failed, kept local copy: {e:#}");
                Ok(Outcome::LocalFallback)
            }
        }
    }

    pub async fn clear_profile(&self) -> Result<Outcome> {
        self.local.clear_profile().await?;
        let Some(remote) = &self.remote else {
            return Ok(Outcome::LocalOnly);
        };
        match remote.clear_profile().await {
            Ok(()) => Ok(Outcome::Remote),
            Err(e) => {
                warn!("remote calorie delete failed: {e:#}");
                Ok(Outcome::LocalFallback)
            }
        }
    }

    pub async fn list_plans(&self) -> Result<Routed<Vec<Plan>>> {
        if let Some(remote) = &self.remote {
            match remote.list_plans().await {
                Ok(plans) => {
                    return Ok(Routed {
                        value: plans,
                        outcome: Outcome::Remote,
                    });
                }
                Err(e) => debug!("remote plan list failed, using local plans: {e:#}"),
            }
            return Ok(Routed {
                value: self.local.list_plans().await?,
                outcome: Outcome::LocalFallback,
            });
        }
        Ok(Routed {
            value: self.local.list_plans().await?,
            outcome: Outcome::LocalOnly,
        })
    }

    /// Single attempt against the server, then a local plan. Never fails
    /// because of the remote side.
    pub async fn create_plan(&self, draft: &PlanDraft) -> Result<Routed<Plan>> {
        let outcome = if let Some(remote) = &self.remote {
            let remote_draft = PlanDraft {
                name: draft.remote_name(),
                ..draft.clone()
            };
            match remote.create_plan(&remote_draft).await {
                Ok(plan) => {
                    info!(id = %plan.id, "plan saved to server");
                    return Ok(Routed {
                        value: plan,
                        outcome: Outcome::Remote,
                    });
                }
                Err(e) => {
                    warn!("remote plan save failed, saving locally: {e:#}");
                    Outcome::LocalFallback
                }
            }
        } else {
            Outcome::LocalOnly
        };

        let plan = self.local.create_plan(draft).await?;
        info!(id = %plan.id, ?outcome, "plan saved locally");
        Ok(Routed {
            value: plan,
            outcome,
        })
    }

    /// Only server-shaped ids are sent to the server. The local copy is
    /// removed whatever the server says.
    pub async fn delete_plan(&self, id: &str) -> Result<Outcome> {
        let outcome = match &self.remote {
            Some(remote) if is_server_id(id) => match remote.delete_plan(id).await {
                Ok(()) => Outcome::Remote,
                Err(e) => {
                    warn!(id, "remote plan delete failed, removing locally anyway: {e:#}");
                    Outcome::LocalFallback
                }
            },
            _ => Outcome::LocalOnly,
        };
        self.local.delete_plan(id).await?;
        Ok(outcome)
    }
}
