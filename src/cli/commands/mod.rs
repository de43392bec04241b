use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

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

    Command::new("tutela")
        .about("Authentication and abuse-prevention core")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TUTELA_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend origin allowed by CORS, example: https://school.tld")
                .default_value("http://localhost:3000")
                .env("TUTELA_FRONTEND_URL"),
        )
        .arg(
            Arg::new("admin-email")
                .long("admin-email")
                .help("Email of the super-admin account seeded at startup")
                .env("TUTELA_ADMIN_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new("admin-password")
                .long("admin-password")
                .help("Password of the super-admin account seeded at startup")
                .env("TUTELA_ADMIN_PASSWORD")
                .required(true),
        )
        .arg(
            Arg::new("session-ttl")
                .long("session-ttl")
                .help("Session lifetime in seconds")
                .default_value("43200")
                .env("TUTELA_SESSION_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TUTELA_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "tutela");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Authentication and abuse-prevention core"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_port_and_admin() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "tutela",
            "--port",
            "8080",
            "--admin-email",
            "root@school.tld",
            "--admin-password",
            "bootstrap-secret",
        ]);

        assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(8080));
        assert_eq!(
            matches
                .get_one::<String>("admin-email")
                .map(|s| s.to_string()),
            Some("root@school.tld".to_string())
        );
        assert_eq!(
            matches
                .get_one::<String>("frontend-url")
                .map(|s| s.to_string()),
            Some("http://localhost:3000".to_string())
        );
        assert_eq!(
            matches.get_one::<u64>("session-ttl").map(|s| *s),
            Some(43_200)
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("TUTELA_PORT", Some("443")),
                ("TUTELA_FRONTEND_URL", Some("https://school.tld")),
                ("TUTELA_ADMIN_EMAIL", Some("root@school.tld")),
                ("TUTELA_ADMIN_PASSWORD", Some("bootstrap-secret")),
                ("TUTELA_SESSION_TTL", Some("60")),
                ("TUTELA_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["tutela"]);
                assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(443));
                assert_eq!(
                    matches
                        .get_one::<String>("frontend-url")
                        .map(|s| s.to_string()),
                    Some("https://school.tld".to_string())
                );
                assert_eq!(matches.get_one::<u64>("session-ttl").map(|s| *s), Some(60));
                assert_eq!(matches.get_one::<u8>("verbosity").map(|s| *s), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("TUTELA_LOG_LEVEL", Some(level)),
                    ("TUTELA_ADMIN_EMAIL", Some("root@school.tld")),
                    ("TUTELA_ADMIN_PASSWORD", Some("bootstrap-secret")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["tutela"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").map(|s| *s),
                        Some(index as u8)
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("TUTELA_LOG_LEVEL", None::<String>)], || {
                let mut args = vec![
                    "tutela".to_string(),
                    "--admin-email".to_string(),
                    "root@school.tld".to_string(),
                    "--admin-password".to_string(),
                    "bootstrap-secret".to_string(),
                ];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();

                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").map(|s| *s),
                    Some(index as u8)
                );
            });
        }
    }
}
