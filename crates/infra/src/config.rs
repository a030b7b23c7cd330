use booking_rules_domain::ServerVersion;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string of the booking database. The scheme selects the
    /// database family (`postgres://` or `mysql://`).
    pub database_url: Option<String>,
    /// Server version of a MySQL / MariaDB database. When absent it is
    /// asked from the server on startup.
    pub database_server_version: Option<ServerVersion>,
    /// How often the date based rules are executed
    pub rules_job_interval_secs: u64,
    /// How often due notifications are sent
    pub notifications_job_interval_secs: u64,
    /// How long a date may lie in the past and still be picked up by a
    /// rule scan. Covers runs missed by a late or restarted job scheduler.
    pub due_tolerance_secs: i64,
}

fn parse_env<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL").ok();
        if database_url.is_none() {
            info!("Did not find DATABASE_URL environment variable.");
        }
        let database_server_version = match std::env::var("DATABASE_SERVER_VERSION") {
            Ok(version) => {
                let parsed = ServerVersion::parse(&version);
                if parsed.is_none() {
                    warn!(
                        "The given DATABASE_SERVER_VERSION: {} is not valid, it will be asked from the server.",
                        version
                    );
                }
                parsed
            }
            Err(_) => None,
        };
        Self {
            database_url,
            database_server_version,
            rules_job_interval_secs: parse_env("RULES_JOB_INTERVAL_SECS", 60 * 15),
            notifications_job_interval_secs: parse_env("NOTIFICATIONS_JOB_INTERVAL_SECS", 60),
            due_tolerance_secs: parse_env("DUE_TOLERANCE_SECS", 60 * 60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
