use anyhow::Result;
use clap::Args;
use serde::Serialize;

use fuel_core::error::ValidationError;
use fuel_core::models::{BiometricInput, CalorieResult, Goal, Outcome, Plan, Routed, Snapshot};

use super::Session;
use super::helpers::{
    format_inputs, json_error, print_result_table, prompt_plan_name, resolve_activity,
    stdin_is_interactive,
};
use super::print_note;

#[derive(Args, Debug, Default)]
pub(crate) struct CalcArgs {
    /// Sex: male or female
    #[arg(long)]
    pub sex: Option<String>,
    /// Age in years
    #[arg(long)]
    pub age: Option<u32>,
    /// Body weight in kilograms
    #[arg(long)]
    pub weight: Option<f64>,
    /// Height in centimetres
    #[arg(long)]
    pub height: Option<f64>,
    /// Activity level: sedentary, light, moderate, active, very
    #[arg(long)]
    pub activity: Option<String>,
    /// Goal: maintain, cut, bulk
    #[arg(long)]
    pub goal: Option<String>,
    /// Also save the result as a plan, optionally with a name
    #[arg(long, num_args = 0..=1, default_missing_value = "", value_name = "NAME")]
    pub save: Option<String>,
    /// Never ask to save a cut or bulk plan
    #[arg(long)]
    pub no_prompt: bool,
}

/// Apply command-line values over the saved form. The goal is handled separately.
pub(crate) fn apply_overrides(mut input: BiometricInput, args: &CalcArgs) -> Result<BiometricInput> {
    if let Some(sex) = &args.sex {
        input = input.with_sex(sex.parse()?);
    }
    if let Some(age) = args.age {
        input = input.with_age(age);
    }
    if let Some(weight) = args.weight {
        input = input.with_weight_kg(weight);
    }
    if let Some(height) = args.height {
        input = input.with_height_cm(height);
    }
    if let Some(activity) = &args.activity {
        input = input.with_activity(resolve_activity(activity));
    }
    Ok(input)
}

#[derive(Serialize)]
struct CalcOutput<'a> {
    input: &'a BiometricInput,
    result: &'a CalorieResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a Routed<Plan>>,
}

pub(crate) async fn cmd_calc(session: &mut Session, args: CalcArgs, json: bool) -> Result<()> {
    let input = apply_overrides(session.input().clone(), &args)?;
    session.set_input(input);

    let offer_save = match args.goal.as_deref() {
        Some(goal) => session.set_goal(goal.parse::<Goal>()?),
        None => false,
    };

    let result = match session.calculate().await {
        Ok(result) => result,
        Err(e) if json && e.downcast_ref::<ValidationError>().is_some() => {
            println!("{}", json_error(&e.to_string()));
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let explicit_save = args.save.is_some();
    let plan_name = match args.save {
        Some(name) => Some(name),
        None if offer_save && !args.no_prompt && !json && stdin_is_interactive() => {
            print_result_table(&result);
            let name = prompt_plan_name(session.input().goal)?;
            if name.is_none() {
                return Ok(());
            }
            name
        }
        None => None,
    };
    let prompted = !explicit_save && plan_name.is_some();

    let saved = match plan_name {
        Some(name) => Some(session.save_plan(&name).await?),
        None => None,
    };

    if json {
        let output = CalcOutput {
            input: session.input(),
            result: &result,
            plan: saved.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if !prompted {
            print_result_table(&result);
        }
        if let Some(saved) = &saved {
            println!("Saved plan '{}' ({})", saved.value.name, saved.value.id);
        }
        print_note(session);
    }

    Ok(())
}

pub(crate) fn cmd_show(session: &Session, json: bool) -> Result<()> {
    let input = session.input();
    let result = session.result();

    if json {
        let snapshot = Snapshot {
            input: input.clone(),
            result: result.cloned(),
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if result.is_none() && *input == BiometricInput::default() {
        eprintln!("No saved calculation. Use `fuel calc --age <N> --weight <KG> --height <CM>` to start.");
    } else {
        println!("{}", format_inputs(input));
        match result {
            Some(result) => print_result_table(result),
            None => eprintln!("No result yet. Run `fuel calc` to compute one."),
        }
    }

    Ok(())
}

pub(crate) async fn cmd_clear(session: &mut Session, json: bool) -> Result<()> {
    let outcome = session.clear_result().await?;

    if json {
        #[derive(Serialize)]
        struct Cleared {
            cleared: bool,
            outcome: Outcome,
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&Cleared {
                cleared: true,
                outcome,
            })?
        );
    } else {
        print_note(session);
        if outcome == Outcome::LocalFallback {
            eprintln!("The server copy could not be removed; it may come back on the next start.");
        }
    }

    Ok(())
}
