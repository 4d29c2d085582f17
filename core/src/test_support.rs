//! Port doubles shared by the unit tests.

use std::cell::{Cell, RefCell};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;

use crate::error::RemoteError;
use crate::estimator::compute_result;
use crate::models::{BiometricInput, Goal, Plan, PlanDraft, Sex, Snapshot};
use crate::port::PersistencePort;

pub(crate) fn sample_input(goal: Goal) -> BiometricInput {
    BiometricInput::default()
        .with_sex(Sex::Male)
        .with_age(30)
        .with_weight_kg(80.0)
        .with_height_cm(180.0)
        .with_goal(goal)
}

pub(crate) fn sample_snapshot(goal: Goal) -> Snapshot {
    let input = sample_input(goal);
    let result = compute_result(&input).ok();
    Snapshot { input, result }
}

/// A server that is never reachable.
pub(crate) struct FailingRemote;

#[async_trait(?Send)]
impl PersistencePort for FailingRemote {
    async fn load_profile(&self) -> Result<Option<Snapshot>> {
        Err(RemoteError::Transport("connection refused".to_string()).into())
    }

    async fn save_profile(&self, _snapshot: &Snapshot) -> Result<()> {
        Err(RemoteError::Transport("connection refused".to_string()).into())
    }

    async fn clear_profile(&self) -> Result<()> {
        Err(RemoteError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        }
        .into())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        Err(RemoteError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into())
    }

    async fn create_plan(&self, _draft: &PlanDraft) -> Result<Plan> {
        Err(RemoteError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into())
    }

    async fn delete_plan(&self, _id: &str) -> Result<()> {
        Err(RemoteError::Status {
            status: 404,
            body: "not found".to_string(),
        }
        .into())
    }
}

/// A working server that issues 24-hex-character ids.
#[derive(Default)]
pub(crate) struct InMemoryRemote {
    pub profile: RefCell<Option<Snapshot>>,
    pub plans: RefCell<Vec<Plan>>,
    next_id: Cell<u64>,
}

impl InMemoryRemote {
    pub(crate) fn with_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: RefCell::new(plans),
            ..Self::default()
        }
    }
}

#[async_trait(?Send)]
impl PersistencePort for InMemoryRemote {
    async fn load_profile(&self) -> Result<Option<Snapshot>> {
        Ok(self.profile.borrow().clone())
    }

    async fn save_profile(&self, snapshot: &Snapshot) -> Result<()> {
        *self.profile.borrow_mut() = Some(snapshot.clone());
        Ok(())
    }

    async fn clear_profile(&self) -> Result<()> {
        *self.profile.borrow_mut() = None;
        Ok(())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        Ok(self.plans.borrow().clone())
    }

    async fn create_plan(&self, draft: &PlanDraft) -> Result<Plan> {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        let plan = Plan {
            id: format!("{n:024x}"),
            name: draft.name.clone(),
            goal: draft.goal,
            created_at: Utc::now(),
            snapshot: draft.snapshot.clone(),
        };
        self.plans.borrow_mut().insert(0, plan.clone());
        Ok(plan)
    }

    async fn delete_plan(&self, id: &str) -> Result<()> {
        let mut plans = self.plans.borrow_mut();
        let before = plans.len();
        plans.retain(|p| p.id != id);
        if plans.len() == before {
            bail!(RemoteError::Status {
                status: 404,
                body: "Plan not found".to_string(),
            });
        }
        Ok(())
    }
}
