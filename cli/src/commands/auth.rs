use anyhow::{Result, bail};
use serde::Serialize;

use fuel_core::local::LocalStore;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthStatus<'a> {
    logged_in: bool,
    email: Option<String>,
    api_url: &'a str,
}

fn print_status(store: &LocalStore, api_url: &str, json: bool) -> Result<()> {
    let status = AuthStatus {
        logged_in: store.auth_token()?.is_some(),
        email: store.user_email()?,
        api_url,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.logged_in {
        match &status.email {
            Some(email) => println!("Logged in as {email}. Plans sync with {api_url}"),
            None => println!("Logged in. Plans sync with {api_url}"),
        }
    } else {
        println!("Not logged in. Saved plans will be local only.");
    }

    Ok(())
}

pub(crate) fn cmd_auth_login(
    store: &LocalStore,
    token: &str,
    email: Option<&str>,
    api_url: &str,
    json: bool,
) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Token must not be empty");
    }

    store.set_auth_token(token)?;
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        store.set_user_email(email)?;
    }

    print_status(store, api_url, json)
}

pub(crate) fn cmd_auth_logout(store: &LocalStore, json: bool) -> Result<()> {
    let removed = store.clear_auth_token()?;

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Logout {
            logged_out: bool,
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&Logout {
                logged_out: removed,
            })?
        );
    } else if removed {
        println!("Logged out. Saved plans will be local only.");
    } else {
        eprintln!("Not logged in.");
    }

    Ok(())
}

pub(crate) fn cmd_auth_status(store: &LocalStore, api_url: &str, json: bool) -> Result<()> {
    print_status(store, api_url, json)
}
