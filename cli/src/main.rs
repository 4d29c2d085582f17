mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::api::ApiClient;
use crate::commands::{
    CalcArgs, Session, cmd_auth_login, cmd_auth_logout, cmd_auth_status, cmd_calc, cmd_clear,
    cmd_plan_delete, cmd_plan_list, cmd_plan_load, cmd_plan_save, cmd_show,
};
use crate::config::Config;
use fuel_core::local::LocalStore;

#[derive(Parser)]
#[command(
    name = "fuel",
    version,
    about = "Calorie and macro planner with optional server sync",
    long_about = "Estimate BMR, TDEE and a macro split from your measurements, and keep \
                  cut/bulk plans locally or on your fitness tracker account."
)]
struct Cli {
    /// Show debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate calories and macros, updating the saved form
    Calc {
        #[command(flatten)]
        args: CalcArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the saved form and last result
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the saved result
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage saved plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage the server token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Save the current form and result as a plan
    Save {
        /// Plan name (default: "<GOAL> plan")
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved plans, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a plan into the form
    Load {
        /// Plan ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a plan
    Delete {
        /// Plan ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store a bearer token for the plan server
    Login {
        /// Token issued by the server
        #[arg(long)]
        token: String,
        /// Account email, shown in status
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the stored token
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether plans sync with the server
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run_auth(store: &LocalStore, config: &Config, command: AuthCommands) -> Result<()> {
    match command {
        AuthCommands::Login { token, email, json } => {
            cmd_auth_login(store, &token, email.as_deref(), &config.api_url, json)
        }
        AuthCommands::Logout { json } => cmd_auth_logout(store, json),
        AuthCommands::Status { json } => cmd_auth_status(store, &config.api_url, json),
    }
}

/// Open the plan session, talking to the server only when a token is stored.
async fn open_session(store: LocalStore, config: &Config) -> Result<Session> {
    let remote = store
        .auth_token()?
        .map(|token| ApiClient::new(&config.api_url, &token))
        .transpose()?;
    let mut session = Session::new(store, remote);
    session.load_initial_state().await?;
    Ok(session)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = LocalStore::open(&config.db_path)?;
    tracing::debug!(
        "data dir {}, database {}",
        config.data_dir.display(),
        config.db_path.display()
    );

    match cli.command {
        // Token management never needs the server.
        Commands::Auth { command } => run_auth(&store, &config, command),
        Commands::Calc { args, json } => {
            let mut session = open_session(store, &config).await?;
            cmd_calc(&mut session, args, json).await
        }
        Commands::Show { json } => cmd_show(&open_session(store, &config).await?, json),
        Commands::Clear { json } => {
            let mut session = open_session(store, &config).await?;
            cmd_clear(&mut session, json).await
        }
        Commands::Plan { command } => {
            let mut session = open_session(store, &config).await?;
            match command {
                PlanCommands::Save { name, json } => {
                    cmd_plan_save(&mut session, name.as_deref(), json).await
                }
                PlanCommands::List { json } => cmd_plan_list(&session, json),
                PlanCommands::Load { id, json } => cmd_plan_load(&mut session, &id, json).await,
                PlanCommands::Delete { id, json } => {
                    cmd_plan_delete(&mut session, &id, json).await
                }
            }
        }
    }
}
