//! Daily energy and macro targets from biometric inputs.
//!
//! BMR uses Mifflin-St Jeor, TDEE scales it by activity level, and the goal
//! adjusts TDEE into the suggested intake. Protein is fixed at 2 g/kg, fat
//! takes 25% of calories, and carbs get whatever is left.

use crate::error::ValidationError;
use crate::models::{ActivityLevel, BiometricInput, CalorieResult, Goal, Sex};

const PROTEIN_G_PER_KG: f64 = 2.0;
const FAT_SHARE: f64 = 0.25;
const KCAL_PER_G_PROTEIN: i64 = 4;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;
const CUT_FACTOR: f64 = 0.8;
const BULK_FACTOR: f64 = 1.15;

/// Round half up, so `2.5 -> 3` and `-2.5 -> -2`.
#[allow(clippy::cast_possible_truncation)]
fn round(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

#[must_use]
pub fn bmr(sex: Sex, weight_kg: f64, height_cm: f64, age: u32) -> i64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match sex {
        Sex::Male => round(base + 5.0),
        Sex::Female => round(base - 161.0),
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tdee(bmr: i64, activity: ActivityLevel) -> i64 {
    round(bmr as f64 * activity.multiplier())
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn suggested_calories(tdee: i64, goal: Goal) -> i64 {
    match goal {
        Goal::Maintain => tdee,
        Goal::Cut => round(tdee as f64 * CUT_FACTOR),
        Goal::Bulk => round(tdee as f64 * BULK_FACTOR),
    }
}

/// Returns `(protein_g, fat_g, carbs_g)`. A carb deficit is clamped to zero
/// and not taken back out of protein or fat.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn macro_split(suggested: i64, weight_kg: f64) -> (i64, i64, i64) {
    let protein_g = round(PROTEIN_G_PER_KG * weight_kg);
    let protein_kcal = protein_g * KCAL_PER_G_PROTEIN;
    let fat_kcal = round(suggested as f64 * FAT_SHARE);
    let fat_g = round(fat_kcal as f64 / KCAL_PER_G_FAT);
    let carbs_kcal = suggested - protein_kcal - fat_kcal;
    let carbs_g = round(carbs_kcal as f64 / KCAL_PER_G_CARBS).max(0);
    (protein_g, fat_g, carbs_g)
}

pub fn compute_result(input: &BiometricInput) -> Result<CalorieResult, ValidationError> {
    let m = input.measurements()?;

    let bmr = bmr(input.sex, m.weight_kg, m.height_cm, m.age);
    let tdee = tdee(bmr, input.activity);
    let suggested = suggested_calories(tdee, input.goal);
    let (protein_grams, fat_grams, carbs_grams) = macro_split(suggested, m.weight_kg);

    Ok(CalorieResult {
        bmr,
        tdee,
        suggested,
        protein_grams,
        fat_grams,
        carbs_grams,
        goal: input.goal,
        activity: input.activity,
    })
}
