use crate::{
    cli::telemetry,
    server::{self, GatewayConfig},
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub api_host: String,
    pub redirect_on_failure: Option<String>,
    pub optional_auth: bool,
    pub required_scopes: Vec<String>,
    pub group_roles: Vec<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the API host is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = GatewayConfig {
        api_host: args.api_host,
        redirect_on_failure: args.redirect_on_failure,
        optional_auth: args.optional_auth,
        required_scopes: args.required_scopes,
        group_roles: args.group_roles,
    };

    let result = server::new(args.port, config).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("api_host", args.api_host.clone()),
        (
            "redirect_on_failure",
            args.redirect_on_failure
                .clone()
                .unwrap_or_else(|| "n/a".to_string()),
        ),
        ("optional_auth", args.optional_auth.to_string()),
        ("required_scopes", args.required_scopes.join(",")),
        ("group_roles", args.group_roles.join(",")),
    ];

    for (key, value) in entries {
        info!("{}: {}", key, value);
    }
}
