use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::io::{self, BufRead, IsTerminal, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fuel_core::models::{ACTIVITY_LEVELS, ActivityLevel, BiometricInput, CalorieResult, Goal, Plan};

/// Resolve an activity level name, warning when an unknown name falls back to light.
pub(crate) fn resolve_activity(name: &str) -> ActivityLevel {
    let level = ActivityLevel::from_name(name);
    if level.as_str() != name.trim().to_lowercase() {
        eprintln!(
            "Note: unknown activity level '{name}', using {}. Known levels: {}",
            level.as_str(),
            ACTIVITY_LEVELS.join(", ")
        );
    }
    level
}

pub(crate) fn stdin_is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask whether to keep the current numbers as a plan. `None` means skip.
pub(crate) fn prompt_plan_name(goal: Goal) -> Result<Option<String>> {
    eprint!(
        "\nSave the {} numbers as a plan? Enter a name, leave blank for the default, or 'n' to skip: ",
        goal.label()
    );
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(parse_plan_name_answer(&line))
}

pub(crate) fn parse_plan_name_answer(line: &str) -> Option<String> {
    let answer = line.trim();
    match answer.to_lowercase().as_str() {
        "n" | "no" => None,
        _ => Some(answer.to_string()),
    }
}

pub(crate) fn format_created_at(created_at: DateTime<Utc>) -> String {
    created_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// One-line summary of the form, blanks shown as `-`.
pub(crate) fn format_inputs(input: &BiometricInput) -> String {
    let age = input.age.map_or("-".into(), |a| a.to_string());
    let weight = input.weight_kg.map_or("-".into(), |w| format!("{w} kg"));
    let height = input.height_cm.map_or("-".into(), |h| format!("{h} cm"));
    format!(
        "Sex: {}  Age: {age}  Weight: {weight}  Height: {height}  Activity: {}  Goal: {}",
        input.sex, input.activity, input.goal
    )
}

pub(crate) fn print_result_table(result: &CalorieResult) {
    #[derive(Tabled)]
    struct ResultRow {
        #[tabled(rename = "")]
        label: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows = vec![
        ResultRow {
            label: "BMR".into(),
            value: format!("{} kcal", result.bmr),
        },
        ResultRow {
            label: format!("TDEE ({})", result.activity.as_str()),
            value: format!("{} kcal", result.tdee),
        },
        ResultRow {
            label: format!("Suggested ({})", result.goal.as_str()),
            value: format!("{} kcal", result.suggested),
        },
        ResultRow {
            label: "Protein".into(),
            value: format!("{} g", result.protein_grams),
        },
        ResultRow {
            label: "Fat".into(),
            value: format!("{} g", result.fat_grams),
        },
        ResultRow {
            label: "Carbs".into(),
            value: format!("{} g", result.carbs_grams),
        },
    ];

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_plan_table(plans: &[Plan]) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Goal")]
        goal: String,
        #[tabled(rename = "kcal")]
        calories: String,
        #[tabled(rename = "P/F/C (g)")]
        macros: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| {
            let result = p.snapshot.result.as_ref();
            PlanRow {
                id: p.id.clone(),
                name: truncate(&p.name, 40),
                goal: p.goal.label().to_string(),
                calories: result.map_or("-".into(), |r| r.suggested.to_string()),
                macros: result.map_or("-".into(), |r| {
                    format!("{}/{}/{}", r.protein_grams, r.fat_grams, r.carbs_grams)
                }),
                created: format_created_at(p.created_at),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max.saturating_sub(3)).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
