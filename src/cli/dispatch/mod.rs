use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};

fn strings(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| {
            values
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let api_host = matches
        .get_one::<String>("api-host")
        .cloned()
        .context("missing required argument: --api-host")?;

    Ok(Action::Server(Args {
        port,
        api_host,
        redirect_on_failure: matches.get_one::<String>("redirect-on-failure").cloned(),
        optional_auth: matches.get_flag("optional-auth"),
        required_scopes: strings(matches, "require-scope"),
        group_roles: strings(matches, "group-role"),
    }))
}
