use crate::cli::actions::{
    server::{Args, SeedUser},
    Action,
};
use crate::supervisor::DEFAULT_GRACE_TIMEOUT;
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// Map parsed matches to the action to execute.
///
/// # Errors
///
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let secret = matches
        .get_one::<String>("secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --secret")?;

    let seed_users = matches
        .get_many::<String>("user")
        .unwrap_or_default()
        .map(|raw| parse_seed_user(raw))
        .collect::<Result<Vec<_>>>()?;

    Ok(Action::Server(Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        rpc_port: matches.get_one::<u16>("rpc-port").copied().unwrap_or(4000),
        secret,
        dsn: matches.get_one::<String>("dsn").cloned(),
        seed_users,
        grace_timeout: matches
            .get_one::<u64>("grace-timeout")
            .copied()
            .map_or(DEFAULT_GRACE_TIMEOUT, Duration::from_secs),
    }))
}

fn parse_seed_user(raw: &str) -> Result<SeedUser> {
    let (name, password) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid --user value {raw:?}, expected name:password"))?;
    if name.is_empty() || password.is_empty() {
        return Err(anyhow!(
            "invalid --user value {raw:?}, expected name:password"
        ));
    }

    Ok(SeedUser {
        name: name.to_string(),
        password: SecretString::from(password.to_string()),
    })
}
