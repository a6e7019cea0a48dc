use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

use crate::DEFAULT_API_HOST;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("makerpass")
        .about("MakerPass authentication gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("MAKERPASS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("api-host")
                .long("api-host")
                .help("MakerPass API base URL")
                .default_value(DEFAULT_API_HOST)
                .env("MAKERPASS_API_HOST"),
        )
        .arg(
            Arg::new("redirect-on-failure")
                .long("redirect-on-failure")
                .help("Redirect session callers here when authentication fails")
                .env("MAKERPASS_REDIRECT_ON_FAILURE"),
        )
        .arg(
            Arg::new("optional-auth")
                .long("optional-auth")
                .help("Forward requests without an identity when authentication fails")
                .env("MAKERPASS_OPTIONAL_AUTH")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("require-scope")
                .long("require-scope")
                .help("Scopes required on every protected route, example: public,admin")
                .env("MAKERPASS_REQUIRE_SCOPE")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("group-role")
                .long("group-role")
                .help("Group roles allowed on /groups routes")
                .env("MAKERPASS_GROUP_ROLES")
                .default_values(["owner", "instructor"])
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("MAKERPASS_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
