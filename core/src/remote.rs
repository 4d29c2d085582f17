//! Wire shapes of the plan service and their mapping onto local types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::models::{Goal, Plan, Snapshot, decode_each};

#[derive(Debug, Deserialize)]
pub struct CalorieResponse {
    #[serde(default)]
    pub calorie: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
pub struct PlansResponse {
    pub plans: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct PlanResponse {
    pub plan: Option<RemotePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePlan {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub goal: Goal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub snapshot: Snapshot,
}

impl From<RemotePlan> for Plan {
    fn from(p: RemotePlan) -> Self {
        Plan {
            id: p.id,
            name: p.name,
            goal: p.goal,
            created_at: p.created_at,
            snapshot: p.snapshot,
        }
    }
}

pub fn plans_from_response(resp: PlansResponse) -> Result<Vec<Plan>, RemoteError> {
    let items = resp
        .plans
        .ok_or(RemoteError::InvalidResponse("missing 'plans'"))?;
    Ok(decode_each::<RemotePlan>(items, "server plan")
        .into_iter()
        .map(Plan::from)
        .collect())
}

pub fn plan_from_response(resp: PlanResponse) -> Result<Plan, RemoteError> {
    resp.plan
        .map(Plan::from)
        .ok_or(RemoteError::InvalidResponse("missing 'plan'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sex;

    const PLAN_JSON: &str = r#"{
        "_id": "65a1f0c2e4b0a1b2c3d4e5f6",
        "name": "CUT plan",
        "goal": "cut",
        "createdAt": "2024-01-15T10:00:00.000Z",
        "snapshot": {
            "sex": "female", "age": 28, "weightKg": 61, "heightCm": 168,
            "activity": "active", "goal": "cut",
            "result": {"bmr": 1384, "tdee": 2387, "suggested": 1910,
                       "proteinGrams": 122, "fatGrams": 53, "carbsGrams": 238,
                       "goal": "cut", "activity": "active"}
        },
        "user": "65a1f0c2e4b0a1b2c3d4e000",
        "__v": 0
    }"#;

    #[test]
    fn test_plans_response_maps_ids() {
        let json = format!(r#"{{"plans": [{PLAN_JSON}]}}"#);
        let resp: PlansResponse = serde_json::from_str(&json).unwrap();
        let plans = plans_from_response(resp).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(plans[0].goal, Goal::Cut);
        assert_eq!(plans[0].snapshot.input.sex, Sex::Female);
        assert_eq!(plans[0].snapshot.result.as_ref().unwrap().suggested, 1910);
    }

    #[test]
    fn test_plans_response_skips_bad_record() {
        let bad = PLAN_JSON
            .replace("65a1f0c2e4b0a1b2c3d4e5f6", "65a1f0c2e4b0a1b2c3d4e5f7")
            .replacen(r#""goal": "cut""#, r#""goal": "shred""#, 1);
        let json = format!(r#"{{"plans": [{bad}, {PLAN_JSON}]}}"#);
        let resp: PlansResponse = serde_json::from_str(&json).unwrap();
        let plans = plans_from_response(resp).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn test_plans_response_missing_field() {
        let resp: PlansResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            plans_from_response(resp),
            Err(RemoteError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_plan_response() {
        let json = format!(r#"{{"plan": {PLAN_JSON}}}"#);
        let resp: PlanResponse = serde_json::from_str(&json).unwrap();
        let plan = plan_from_response(resp).unwrap();
        assert_eq!(plan.name, "CUT plan");

        let empty: PlanResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(plan_from_response(empty).is_err());
    }

    #[test]
    fn test_calorie_response_absent() {
        let resp: CalorieResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.calorie.is_none());
        let resp: CalorieResponse = serde_json::from_str(r#"{"calorie": null}"#).unwrap();
        assert!(resp.calorie.is_none());
    }
}
