use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("gardi")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("HTTP port to listen on")
                .default_value("8080")
                .env("GARDI_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .help("RPC port to listen on")
                .default_value("4000")
                .env("GARDI_RPC_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("secret")
                .short('s')
                .long("secret")
                .help("Token signing secret")
                .env("GARDI_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("PostgreSQL connection string for the user store")
                .long_help(
                    "PostgreSQL connection string for the user store. Without it users live in the in-memory store and vanish on restart.",
                )
                .env("GARDI_DSN"),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .help("Seed user in name:password form (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("grace-timeout")
                .long("grace-timeout")
                .help("Seconds to wait for in-flight requests during shutdown")
                .default_value("10")
                .env("GARDI_GRACE_TIMEOUT")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .action(ArgAction::Count),
        )
}
