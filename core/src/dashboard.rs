use anyhow::{Context, Result};
use tracing::warn;

use crate::estimator::compute_result;
use crate::local::LocalStore;
use crate::models::{
    BiometricInput, CalorieResult, Goal, Outcome, Plan, PlanDraft, Routed, Snapshot,
    is_server_id,
};
use crate::port::{FallbackPort, LocalPort, PersistencePort};

const NO_TOKEN_NOTE: &str = "No auth token found, saved plans will be local only.";
const SAVE_NEEDS_INPUT_NOTE: &str = "Provide valid Age, Weight, Height to save a plan.";

/// Form inputs and result a plan restores. Pure: the goal comes from the
/// plan itself rather than its snapshot.
#[must_use]
pub fn load_plan(plan: &Plan) -> (BiometricInput, Option<CalorieResult>) {
    let input = plan.snapshot.input.clone().with_goal(plan.goal);
    (input, plan.snapshot.result.clone())
}

/// In-memory dashboard state: the form, the last result, the plan list, and
/// the note shown to the user after each action.
///
/// The plan list is written through to the local store after every change,
/// whichever store served the change.
pub struct Dashboard<R> {
    port: FallbackPort<R>,
    input: BiometricInput,
    result: Option<CalorieResult>,
    plans: Vec<Plan>,
    notes: Option<String>,
}

impl<R: PersistencePort> Dashboard<R> {
    /// `remote` is `Some` exactly when a credential is available.
    #[must_use]
    pub fn new(local: LocalStore, remote: Option<R>) -> Self {
        Self {
            port: FallbackPort::new(remote, LocalPort::new(local)),
            input: BiometricInput::default(),
            result: None,
            plans: Vec::new(),
            notes: None,
        }
    }

    #[must_use]
    pub fn has_remote_capability(&self) -> bool {
        self.port.has_remote()
    }

    #[must_use]
    pub fn port(&self) -> &FallbackPort<R> {
        &self.port
    }

    #[must_use]
    pub fn local_store(&self) -> &LocalStore {
        self.port.local().store()
    }

    #[must_use]
    pub fn input(&self) -> &BiometricInput {
        &self.input
    }

    pub fn set_input(&mut self, input: BiometricInput) {
        self.input = input;
    }

    /// Returns true when the new goal is one the user should be offered to
    /// save as a plan.
    pub fn set_goal(&mut self, goal: Goal) -> bool {
        self.input = std::mem::take(&mut self.input).with_goal(goal);
        goal.prompts_save()
    }

    #[must_use]
    pub fn result(&self) -> Option<&CalorieResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    fn note(&mut self, message: impl Into<String>) {
        self.notes = Some(message.into());
    }

    fn mirror_plans(&self) -> Result<()> {
        self.local_store()
            .set_plans(&self.plans)
            .context("Failed to cache plan list")
    }

    /// The server list plus cached plans the server has never seen, newest
    /// first. Plans saved while offline carry local ids and would otherwise
    /// vanish when the cache is replaced.
    fn with_local_only(&self, server: Vec<Plan>) -> Vec<Plan> {
        let cached = self.local_store().plans().unwrap_or_else(|e| {
            warn!("ignoring unreadable plan cache: {e:#}");
            Vec::new()
        });
        let mut plans = server;
        plans.extend(cached.into_iter().filter(|p| !is_server_id(&p.id)));
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans
    }

    /// Restore the form and plan list. The local copy is read first and the
    /// server's data replaces it when the server answers. Nothing local is
    /// cleared here.
    pub async fn load_initial_state(&mut self) -> Result<()> {
        match self.port.load_profile().await {
            Ok(Routed {
                value: Some(snapshot),
                ..
            }) => {
                self.input = snapshot.input;
                self.result = snapshot.result;
            }
            Ok(_) => {}
            Err(e) => warn!("could not read saved calorie data: {e:#}"),
        }

        if !self.has_remote_capability() {
            self.note(NO_TOKEN_NOTE);
        }

        match self.port.list_plans().await {
            Ok(listed) if listed.outcome == Outcome::Remote => {
                self.plans = self.with_local_only(listed.value);
                self.mirror_plans()?;
            }
            Ok(listed) => self.plans = listed.value,
            Err(e) => warn!("could not read saved plans: {e:#}"),
        }
        Ok(())
    }

    /// Validate and compute from the current form, then persist the result.
    pub async fn calculate(&mut self) -> Result<CalorieResult> {
        let result = match compute_result(&self.input) {
            Ok(result) => result,
            Err(e) => {
                self.note(e.to_string());
                return Err(e.into());
            }
        };
        self.notes = None;
        self.result = Some(result.clone());
        let input = self.input.clone();
        self.save_result(&input, &result).await?;
        Ok(result)
    }

    /// Write `{input, result}` locally, and to the server when possible.
    pub async fn save_result(
        &self,
        input: &BiometricInput,
        result: &CalorieResult,
    ) -> Result<Outcome> {
        let snapshot = Snapshot {
            input: input.clone(),
            result: Some(result.clone()),
        };
        self.port.save_profile(&snapshot).await
    }

    /// Forget the saved calculation. Safe to call repeatedly.
    pub async fn clear_result(&mut self) -> Result<Outcome> {
        let outcome = self.port.clear_profile().await?;
        self.result = None;
        self.note("Saved calorie data cleared.");
        Ok(outcome)
    }

    /// Snapshot the form as a new plan, calculating first when there is no
    /// result or the result no longer matches the form.
    pub async fn save_plan(&mut self, name: &str) -> Result<Routed<Plan>> {
        let fresh = compute_result(&self.input).ok();
        let result = match (fresh, self.result.clone()) {
            (Some(fresh), Some(current)) if fresh == current => fresh,
            (None, Some(current)) => current,
            _ => match self.calculate().await {
                Ok(result) => result,
                Err(e) => {
                    self.note(SAVE_NEEDS_INPUT_NOTE);
                    return Err(e);
                }
            },
        };

        let snapshot = Snapshot {
            input: self.input.clone(),
            result: Some(result),
        };
        let draft = PlanDraft::new(name, self.input.goal, snapshot);
        let saved = self.port.create_plan(&draft).await?;

        self.plans.insert(0, saved.value.clone());
        self.mirror_plans()?;
        self.note(match saved.outcome {
            Outcome::Remote => "Plan saved to server.",
            Outcome::LocalFallback => "Plan saved locally (server error).",
            Outcome::LocalOnly => "Plan saved locally (no token).",
        });
        Ok(saved)
    }

    /// Remove a plan. An unknown id is not an error. The plan leaves the list
    /// even when the server refuses the delete.
    pub async fn delete_plan(&mut self, id: &str) -> Result<Outcome> {
        let outcome = self.port.delete_plan(id).await?;
        self.plans.retain(|p| p.id != id);
        self.mirror_plans()?;
        self.note(match outcome {
            Outcome::Remote => "Plan removed from server.",
            Outcome::LocalFallback => "Plan removed (server error or not found).",
            Outcome::LocalOnly => "Plan removed locally.",
        });
        Ok(outcome)
    }

    /// Put a saved plan's inputs and result back into the form.
    pub fn open_plan(&mut self, id: &str) -> Result<Plan> {
        let plan = self
            .plans
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .with_context(|| format!("Plan not found: {id}"))?;
        let (input, result) = load_plan(&plan);
        self.input = input;
        self.result = result;
        self.note(format!("Loaded plan: {}", plan.name));
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::local::PLANS_KEY;
    use crate::test_support::{FailingRemote, InMemoryRemote, sample_input, sample_snapshot};
    use chrono::Utc;

    fn offline() -> Dashboard<FailingRemote> {
        Dashboard::new(LocalStore::open_in_memory().unwrap(), None)
    }

    fn unreachable() -> Dashboard<FailingRemote> {
        Dashboard::new(LocalStore::open_in_memory().unwrap(), Some(FailingRemote))
    }

    fn online(remote: InMemoryRemote) -> Dashboard<InMemoryRemote> {
        Dashboard::new(LocalStore::open_in_memory().unwrap(), Some(remote))
    }

    fn server_plan(id: &str, name: &str) -> Plan {
        Plan {
            id: id.to_string(),
            name: name.to_string(),
            goal: Goal::Cut,
            created_at: Utc::now(),
            snapshot: sample_snapshot(Goal::Cut),
        }
    }

    #[tokio::test]
    async fn test_calculate_persists_locally() {
        let mut dash = offline();
        dash.set_input(sample_input(Goal::Maintain));
        let result = dash.calculate().await.unwrap();
        assert_eq!(result.suggested, 2759);
        assert!(dash.notes().is_none());

        let stored = dash.local_store().snapshot().unwrap().unwrap();
        assert_eq!(stored.input, sample_input(Goal::Maintain));
        assert_eq!(stored.result, Some(result));
    }

    #[tokio::test]
    async fn test_calculate_invalid_input_notes_error() {
        let mut dash = offline();
        let err = dash.calculate().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::InvalidMeasurements)
        );
        assert_eq!(
            dash.notes(),
            Some("Please enter valid numeric Age, Weight (kg) and Height (cm).")
        );
        assert!(dash.local_store().snapshot().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_calculate_remote_failure_is_swallowed() {
        let mut dash = unreachable();
        dash.set_input(sample_input(Goal::Cut));
        let result = dash.calculate().await.unwrap();
        assert_eq!(result.suggested, 2207);
        assert!(dash.local_store().snapshot().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_calculate_mirrors_to_server() {
        let mut dash = online(InMemoryRemote::default());
        dash.set_input(sample_input(Goal::Bulk));
        dash.calculate().await.unwrap();
        let remote = dash.port().remote().unwrap();
        assert_eq!(
            remote.profile.borrow().as_ref().map(|s| s.input.goal),
            Some(Goal::Bulk)
        );
    }

    #[tokio::test]
    async fn test_save_plan_without_token() {
        let mut dash = offline();
        dash.set_input(sample_input(Goal::Bulk));
        let saved = dash.save_plan("").await.unwrap();

        assert_eq!(saved.outcome, Outcome::LocalOnly);
        assert!(!saved.value.id.is_empty());
        assert!(saved.value.name.starts_with("BULK plan ("));
        assert_eq!(dash.notes(), Some("Plan saved locally (no token)."));
        assert_eq!(dash.plans().len(), 1);
        assert_eq!(dash.local_store().plans().unwrap(), dash.plans());
    }

    #[tokio::test]
    async fn test_save_plan_computes_missing_result() {
        let mut dash = offline();
        dash.set_input(sample_input(Goal::Cut));
        assert!(dash.result().is_none());

        let saved = dash.save_plan("Spring cut").await.unwrap();
        assert_eq!(saved.value.snapshot.result.as_ref().unwrap().suggested, 2207);
        assert_eq!(dash.result().unwrap().suggested, 2207);
    }

    #[tokio::test]
    async fn test_save_plan_recomputes_stale_result() {
        let mut dash = offline();
        dash.set_input(sample_input(Goal::Maintain));
        dash.calculate().await.unwrap();
        dash.set_goal(Goal::Cut);

        let saved = dash.save_plan("").await.unwrap();
        let result = saved.value.snapshot.result.unwrap();
        assert_eq!(result.goal, Goal::Cut);
        assert_eq!(result.suggested, 2207);
    }

    #[tokio::test]
    async fn test_save_plan_invalid_input() {
        let mut dash = offline();
        assert!(dash.save_plan("nope").await.is_err());
        assert_eq!(dash.notes(), Some(SAVE_NEEDS_INPUT_NOTE));
        assert!(dash.plans().is_empty());
    }

    #[tokio::test]
    async fn test_save_plan_remote_failure_adds_exactly_one() {
        let mut dash = unreachable();
        dash.load_initial_state().await.unwrap();
        dash.set_input(sample_input(Goal::Cut));
        let before = dash.plans().len();

        let saved = dash.save_plan("").await.unwrap();
        assert_eq!(saved.outcome, Outcome::LocalFallback);
        assert_eq!(dash.plans().len(), before + 1);
        assert_eq!(dash.plans()[0].id, saved.value.id);
        assert!(saved.value.name.starts_with("CUT plan ("));
        assert_eq!(dash.notes(), Some("Plan saved locally (server error)."));
    }

    #[tokio::test]
    async fn test_save_plan_remote_success() {
        let mut dash = online(InMemoryRemote::default());
        dash.set_input(sample_input(Goal::Bulk));
        let saved = dash.save_plan("Winter bulk").await.unwrap();

        assert_eq!(saved.outcome, Outcome::Remote);
        assert!(is_server_id(&saved.value.id));
        assert_eq!(dash.notes(), Some("Plan saved to server."));
        // Cached locally too, for the next offline start.
        assert_eq!(dash.local_store().plans().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_then_load_plan_round_trip() {
        let mut dash = offline();
        let input = sample_input(Goal::Bulk).with_weight_kg(91.5);
        dash.set_input(input.clone());
        let saved = dash.save_plan("").await.unwrap();

        let (restored, result) = load_plan(&saved.value);
        assert_eq!(restored, input);
        assert_eq!(result.unwrap().protein_grams, 183);
    }

    #[tokio::test]
    async fn test_open_plan_applies_to_form() {
        let mut dash = offline();
        dash.set_input(sample_input(Goal::Cut));
        let saved = dash.save_plan("Keep").await.unwrap();

        dash.set_input(BiometricInput::default());
        let plan = dash.open_plan(&saved.value.id).unwrap();
        assert_eq!(plan.name, "Keep");
        assert_eq!(dash.input(), &sample_input(Goal::Cut));
        assert_eq!(dash.result().unwrap().suggested, 2207);
        assert_eq!(dash.notes(), Some("Loaded plan: Keep"));

        assert!(dash.open_plan("missing").is_err());
    }

    #[test]
    fn test_load_plan_uses_plan_goal() {
        let mut plan = server_plan("65a1f0c2e4b0a1b2c3d4e5f6", "x");
        plan.goal = Goal::Bulk;
        let (input, _) = load_plan(&plan);
        assert_eq!(input.goal, Goal::Bulk);
    }

    #[tokio::test]
    async fn test_clear_result_twice() {
        let mut dash = unreachable();
        dash.set_input(sample_input(Goal::Maintain));
        dash.calculate().await.unwrap();

        dash.clear_result().await.unwrap();
        dash.clear_result().await.unwrap();
        assert!(dash.result().is_none());
        assert!(dash.local_store().snapshot().unwrap().is_none());
        assert_eq!(dash.notes(), Some("Saved calorie data cleared."));
    }

    #[tokio::test]
    async fn test_delete_plan_local() {
        let mut dash = offline();
        dash.set_input(sample_input(Goal::Cut));
        let saved = dash.save_plan("").await.unwrap();

        let outcome = dash.delete_plan(&saved.value.id).await.unwrap();
        assert_eq!(outcome, Outcome::LocalOnly);
        assert!(dash.plans().is_empty());
        assert!(dash.local_store().plans().unwrap().is_empty());
        assert_eq!(dash.notes(), Some("Plan removed locally."));
    }

    #[tokio::test]
    async fn test_delete_unknown_plan_is_noop() {
        let mut dash = offline();
        dash.delete_plan("12345").await.unwrap();
        assert!(dash.plans().is_empty());
    }

    #[tokio::test]
    async fn test_delete_plan_remote_success() {
        let id = "65a1f0c2e4b0a1b2c3d4e5f6";
        let mut dash = online(InMemoryRemote::with_plans(vec![server_plan(id, "srv")]));
        dash.load_initial_state().await.unwrap();
        assert_eq!(dash.plans().len(), 1);

        let outcome = dash.delete_plan(id).await.unwrap();
        assert_eq!(outcome, Outcome::Remote);
        assert!(dash.plans().is_empty());
        assert!(dash.port().remote().unwrap().plans.borrow().is_empty());
        assert_eq!(dash.notes(), Some("Plan removed from server."));
    }

    #[tokio::test]
    async fn test_delete_plan_remote_failure_still_removes() {
        let id = "65a1f0c2e4b0a1b2c3d4e5f6";
        let mut dash = unreachable();
        dash.local_store()
            .set_plans(&[server_plan(id, "srv")])
            .unwrap();
        dash.load_initial_state().await.unwrap();
        assert_eq!(dash.plans().len(), 1);

        let outcome = dash.delete_plan(id).await.unwrap();
        assert_eq!(outcome, Outcome::LocalFallback);
        assert!(dash.plans().is_empty());
        assert_eq!(
            dash.notes(),
            Some("Plan removed (server error or not found).")
        );
    }

    #[tokio::test]
    async fn test_load_initial_state_offline() {
        let mut dash = offline();
        dash.local_store()
            .set_snapshot(&sample_snapshot(Goal::Bulk))
            .unwrap();
        dash.local_store()
            .set_plans(&[server_plan("1718000000000", "local")])
            .unwrap();

        dash.load_initial_state().await.unwrap();
        assert_eq!(dash.input().goal, Goal::Bulk);
        assert!(dash.result().is_some());
        assert_eq!(dash.plans().len(), 1);
        assert_eq!(dash.notes(), Some(NO_TOKEN_NOTE));
    }

    #[tokio::test]
    async fn test_load_initial_state_remote_replaces_and_caches() {
        let remote = InMemoryRemote::with_plans(vec![
            server_plan("65a1f0c2e4b0a1b2c3d4e5f6", "a"),
            server_plan("65a1f0c2e4b0a1b2c3d4e5f7", "b"),
        ]);
        let mut dash = online(remote);
        dash.local_store()
            .set_plans(&[
                server_plan("65a1f0c2e4b0a1b2c3d4e5f0", "deleted on server"),
                server_plan("1718000000000", "offline"),
            ])
            .unwrap();

        dash.load_initial_state().await.unwrap();
        assert_eq!(dash.plans().len(), 3);
        assert!(dash.plans().iter().any(|p| p.name == "offline"));
        assert!(!dash.plans().iter().any(|p| p.name == "deleted on server"));
        assert_eq!(dash.local_store().plans().unwrap(), dash.plans());
        assert!(dash.notes().is_none());
    }

    #[tokio::test]
    async fn test_plan_saved_offline_survives_online_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuel.db");

        let mut dash: Dashboard<FailingRemote> =
            Dashboard::new(LocalStore::open(&path).unwrap(), Some(FailingRemote));
        dash.set_input(sample_input(Goal::Cut));
        dash.calculate().await.unwrap();
        let offline = dash.save_plan("offline").await.unwrap();
        assert!(!is_server_id(&offline.value.id));
        drop(dash);

        let remote =
            InMemoryRemote::with_plans(vec![server_plan("65a1f0c2e4b0a1b2c3d4e5f6", "server")]);
        let mut dash = Dashboard::new(LocalStore::open(&path).unwrap(), Some(remote));
        dash.load_initial_state().await.unwrap();

        let ids: Vec<&str> = dash.plans().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&offline.value.id.as_str()));
        assert!(ids.contains(&"65a1f0c2e4b0a1b2c3d4e5f6"));
        assert_eq!(dash.local_store().plans().unwrap(), dash.plans());
    }

    #[tokio::test]
    async fn test_corrupt_plan_cache_does_not_block_offline_saves() {
        let mut dash = offline();
        dash.local_store().set(PLANS_KEY, "[oops").unwrap();
        dash.load_initial_state().await.unwrap();
        assert!(dash.plans().is_empty());

        dash.set_input(sample_input(Goal::Bulk));
        dash.calculate().await.unwrap();
        let saved = dash.save_plan("x").await.unwrap();
        assert_eq!(saved.outcome, Outcome::LocalOnly);
        assert_eq!(dash.local_store().plans().unwrap().len(), 1);

        dash.delete_plan("123").await.unwrap();
        assert_eq!(dash.plans().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_plan_cache_does_not_block_fallback_saves() {
        let mut dash = unreachable();
        dash.local_store().set(PLANS_KEY, "[oops").unwrap();
        dash.load_initial_state().await.unwrap();

        dash.set_input(sample_input(Goal::Bulk));
        dash.calculate().await.unwrap();
        let saved = dash.save_plan("x").await.unwrap();
        assert_eq!(saved.outcome, Outcome::LocalFallback);
        assert_eq!(dash.local_store().plans().unwrap(), vec![saved.value.clone()]);

        dash.delete_plan(&saved.value.id).await.unwrap();
        assert!(dash.local_store().plans().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_initial_state_remote_failure_keeps_local() {
        let mut dash = unreachable();
        let snapshot = sample_snapshot(Goal::Cut);
        dash.local_store().set_snapshot(&snapshot).unwrap();
        dash.local_store()
            .set_plans(&[server_plan("1718000000000", "local")])
            .unwrap();

        dash.load_initial_state().await.unwrap();
        assert_eq!(dash.input(), &snapshot.input);
        assert_eq!(dash.plans().len(), 1);
        // Local data untouched.
        assert_eq!(dash.local_store().snapshot().unwrap(), Some(snapshot));
        assert_eq!(dash.local_store().plans().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_initial_state_corrupt_plans_is_empty() {
        let mut dash = offline();
        dash.local_store().set(PLANS_KEY, "[oops").unwrap();
        dash.load_initial_state().await.unwrap();
        assert!(dash.plans().is_empty());
    }

    #[test]
    fn test_set_goal_prompts_for_cut_and_bulk() {
        let mut dash = offline();
        assert!(dash.set_goal(Goal::Cut));
        assert_eq!(dash.input().goal, Goal::Cut);
        assert!(dash.set_goal(Goal::Bulk));
        assert!(!dash.set_goal(Goal::Maintain));
    }
}
