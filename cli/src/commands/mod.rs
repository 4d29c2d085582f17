mod auth;
mod calc;
mod helpers;
mod plan;

use fuel_core::dashboard::Dashboard;

use crate::api::ApiClient;

pub(crate) use auth::{cmd_auth_login, cmd_auth_logout, cmd_auth_status};
pub(crate) use calc::{CalcArgs, cmd_calc, cmd_clear, cmd_show};
pub(crate) use plan::{cmd_plan_delete, cmd_plan_list, cmd_plan_load, cmd_plan_save};

/// Dashboard backed by the HTTP client when a token is stored.
pub(crate) type Session = Dashboard<ApiClient>;

/// Print the dashboard's status note, if any.
pub(super) fn print_note(session: &Session) {
    if let Some(note) = session.notes() {
        eprintln!("{note}");
    }
}
