use anyhow::Result;
use serde::Serialize;

use fuel_core::error::ValidationError;
use fuel_core::models::{BiometricInput, CalorieResult, Outcome, Plan};

use super::helpers::{format_inputs, json_error, print_plan_table, print_result_table};
use super::{Session, print_note};

pub(crate) async fn cmd_plan_save(session: &mut Session, name: Option<&str>, json: bool) -> Result<()> {
    let saved = match session.save_plan(name.unwrap_or("")).await {
        Ok(saved) => saved,
        Err(e) if json && e.downcast_ref::<ValidationError>().is_some() => {
            let message = session.notes().map_or_else(|| e.to_string(), str::to_string);
            println!("{}", json_error(&message));
            return Ok(());
        }
        Err(e) => {
            print_note(session);
            return Err(e);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
    } else {
        println!("Saved plan '{}' ({})", saved.value.name, saved.value.id);
        print_note(session);
    }

    Ok(())
}

pub(crate) fn cmd_plan_list(session: &Session, json: bool) -> Result<()> {
    let plans = session.plans();

    if json {
        println!("{}", serde_json::to_string_pretty(plans)?);
    } else if plans.is_empty() {
        eprintln!("No saved plans yet. Use `fuel plan save` or `fuel calc --goal cut --save` to create one.");
        print_note(session);
    } else {
        print_plan_table(plans);
        print_note(session);
    }

    Ok(())
}

/// Restore a plan into the form and keep it as the current calculation.
pub(crate) async fn cmd_plan_load(session: &mut Session, id: &str, json: bool) -> Result<()> {
    let plan = match session.open_plan(id) {
        Ok(plan) => plan,
        Err(_) if json => {
            println!("{}", json_error(&format!("Plan not found: {id}")));
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let input = session.input().clone();
    match session.result().cloned() {
        Some(result) => {
            session.save_result(&input, &result).await?;
        }
        None => {
            // Older plans may carry inputs only.
            if let Err(e) = session.calculate().await {
                tracing::debug!("plan {id} has no usable result: {e:#}");
            }
        }
    }

    if json {
        #[derive(Serialize)]
        struct Loaded<'a> {
            plan: &'a Plan,
            input: &'a BiometricInput,
            result: Option<&'a CalorieResult>,
        }
        let output = Loaded {
            plan: &plan,
            input: session.input(),
            result: session.result(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        eprintln!("Loaded plan: {}", plan.name);
        println!("{}", format_inputs(session.input()));
        if let Some(result) = session.result() {
            print_result_table(result);
        }
    }

    Ok(())
}

pub(crate) async fn cmd_plan_delete(session: &mut Session, id: &str, json: bool) -> Result<()> {
    let outcome = session.delete_plan(id).await?;

    if json {
        #[derive(Serialize)]
        struct Deleted<'a> {
            deleted: &'a str,
            outcome: Outcome,
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&Deleted {
                deleted: id,
                outcome,
            })?
        );
    } else {
        print_note(session);
    }

    Ok(())
}
