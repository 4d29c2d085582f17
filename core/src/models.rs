use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl Sex {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(ValidationError::UnknownSex(s.to_string())),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const ACTIVITY_LEVELS: &[&str] = &["sedentary", "light", "moderate", "active", "very"];

/// Activity level used to scale BMR into TDEE.
///
/// The form starts out on `Moderate`. A stored value that isn't one of the
/// known names reads as `Light`, which is also the multiplier fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    Very,
}

impl ActivityLevel {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sedentary" => ActivityLevel::Sedentary,
            "moderate" => ActivityLevel::Moderate,
            "active" => ActivityLevel::Active,
            "very" => ActivityLevel::Very,
            _ => ActivityLevel::Light,
        }
    }

    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::Very => 1.9,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::Very => "very",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if name.trim().is_empty() {
            return Ok(ActivityLevel::default());
        }
        Ok(ActivityLevel::from_name(&name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    #[default]
    Maintain,
    Cut,
    Bulk,
}

impl Goal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::Maintain => "maintain",
            Goal::Cut => "cut",
            Goal::Bulk => "bulk",
        }
    }

    /// Upper-case label used in plan names, e.g. `CUT plan`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Goal::Maintain => "MAINTAIN",
            Goal::Cut => "CUT",
            Goal::Bulk => "BULK",
        }
    }

    /// Cut and bulk are the goals worth keeping as a named plan.
    #[must_use]
    pub fn prompts_save(self) -> bool {
        matches!(self, Goal::Cut | Goal::Bulk)
    }
}

impl FromStr for Goal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "maintain" => Ok(Goal::Maintain),
            "cut" => Ok(Goal::Cut),
            "bulk" => Ok(Goal::Bulk),
            _ => Err(ValidationError::UnknownGoal(s.to_string())),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Goal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if name.trim().is_empty() {
            return Ok(Goal::default());
        }
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Numeric fields in stored snapshots may be numbers, numeric strings, or
/// blank strings left behind by a half-filled form.
mod lenient {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    pub(super) fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<NumberOrText>::deserialize(d)? {
            Some(NumberOrText::Number(n)) => Some(n),
            Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
            None => None,
        })
    }

    #[allow(clippy::cast_sign_loss)]
    pub(super) fn opt_age<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(opt_number(d)?.and_then(|n| {
            if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
                Some(n as u32)
            } else {
                None
            }
        }))
    }
}

/// The dashboard form: biometric inputs plus the selected goal.
///
/// Treat it as a value. Each `with_*` call returns an updated copy; nothing
/// mutates a form in place. Measurements stay optional until validated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricInput {
    #[serde(default)]
    pub sex: Sex,
    #[serde(default, deserialize_with = "lenient::opt_age")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub activity: ActivityLevel,
    #[serde(default)]
    pub goal: Goal,
}

/// Measurements that passed validation: all present and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
}

impl BiometricInput {
    #[must_use]
    pub fn with_sex(self, sex: Sex) -> Self {
        Self { sex, ..self }
    }

    #[must_use]
    pub fn with_age(self, age: u32) -> Self {
        Self {
            age: Some(age),
            ..self
        }
    }

    #[must_use]
    pub fn with_weight_kg(self, weight_kg: f64) -> Self {
        Self {
            weight_kg: Some(weight_kg),
            ..self
        }
    }

    #[must_use]
    pub fn with_height_cm(self, height_cm: f64) -> Self {
        Self {
            height_cm: Some(height_cm),
            ..self
        }
    }

    #[must_use]
    pub fn with_activity(self, activity: ActivityLevel) -> Self {
        Self { activity, ..self }
    }

    #[must_use]
    pub fn with_goal(self, goal: Goal) -> Self {
        Self { goal, ..self }
    }

    pub fn measurements(&self) -> Result<Measurements, ValidationError> {
        let positive = |v: Option<f64>| v.filter(|n| n.is_finite() && *n > 0.0);
        match (
            self.age.filter(|a| *a > 0),
            positive(self.weight_kg),
            positive(self.height_cm),
        ) {
            (Some(age), Some(weight_kg), Some(height_cm)) => Ok(Measurements {
                age,
                weight_kg,
                height_cm,
            }),
            _ => Err(ValidationError::InvalidMeasurements),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieResult {
    pub bmr: i64,
    pub tdee: i64,
    #[serde(alias = "suggestedCalories")]
    pub suggested: i64,
    pub protein_grams: i64,
    pub fat_grams: i64,
    pub carbs_grams: i64,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default)]
    pub activity: ActivityLevel,
}

/// Inputs plus the last computed result. Stored locally under
/// `calorieTracker`, sent to `/api/calories`, and embedded in every plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub input: BiometricInput,
    #[serde(default)]
    pub result: Option<CalorieResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub goal: Goal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub snapshot: Snapshot,
}

/// A plan before a store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDraft {
    pub name: String,
    pub goal: Goal,
    pub snapshot: Snapshot,
}

impl PlanDraft {
    #[must_use]
    pub fn new(name: &str, goal: Goal, snapshot: Snapshot) -> Self {
        Self {
            name: name.trim().to_string(),
            goal,
            snapshot,
        }
    }

    /// Name sent to the server, which stamps its own creation time.
    #[must_use]
    pub fn remote_name(&self) -> String {
        if self.name.is_empty() {
            format!("{} plan", self.goal.label())
        } else {
            self.name.clone()
        }
    }

    /// Name used when the plan is kept locally.
    #[must_use]
    pub fn local_name(&self, now: DateTime<Local>) -> String {
        if self.name.is_empty() {
            default_plan_name(self.goal, now)
        } else {
            self.name.clone()
        }
    }
}

/// `"CUT plan (10/19/2026, 3:04:05 PM)"`
#[must_use]
pub fn default_plan_name(goal: Goal, now: DateTime<Local>) -> String {
    format!(
        "{} plan ({})",
        goal.label(),
        now.format("%-m/%-d/%Y, %-I:%M:%S %p")
    )
}

/// Server-issued plan ids are 24 hex characters.
#[must_use]
pub fn is_server_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decode each record of a list on its own. Records that don't parse are
/// logged and dropped; the rest are kept in order.
pub fn decode_each<T: DeserializeOwned>(items: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("skipping unreadable {what} at index {i}: {e}");
                None
            }
        })
        .collect()
}

/// Which store served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Remote,
    LocalFallback,
    LocalOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routed<T> {
    #[serde(flatten)]
    pub value: T,
    pub outcome: Outcome,
}
