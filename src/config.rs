use std::{env, fmt::Display, str::FromStr};

use anyhow::Context;
use tracing::{info, warn};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub struct Config {
    database_url: Option<String>,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            max_connections: try_load("CAMPUS_EVENTS_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        })
    }

    /// Only commands that touch Postgres need a connection string.
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| {
            warn!("Invalid {key} value: {raw}");
            format!("{key} must be a valid value, got {raw:?}")
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_url_is_reported_on_use() {
        let config = Config {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        };

        let err = config.database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn unset_keys_fall_back_to_default() {
        let value: u32 = try_load("CAMPUS_EVENTS_TEST_UNSET_KEY", 7).expect("default");
        assert_eq!(value, 7);
    }
}
