use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        frontend_url: matches
            .get_one("frontend-url")
            .map(|s: &String| s.to_string())
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
        admin_email: matches
            .get_one("admin-email")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --admin-email"))?,
        admin_password: matches
            .get_one("admin-password")
            .map(|s: &String| SecretString::from(s.as_str()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --admin-password"))?,
        session_ttl_seconds: matches
            .get_one::<u64>("session-ttl")
            .copied()
            .unwrap_or(43_200),
    })
}
