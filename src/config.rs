use anyhow::{Context, Result};

use crate::leaderboard::DEFAULT_EMPLOYEE_LIMIT;

/// Runtime configuration read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub leaderboard_limit: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set to a production Postgres instance")?,
            max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            leaderboard_limit: parse_or("LEADERBOARD_LIMIT", DEFAULT_EMPLOYEE_LIMIT)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_values_use_defaults() {
        let value: u32 = parse_or("SKILLGAP_TEST_UNSET_VARIABLE", 5).unwrap();
        assert_eq!(value, 5);
    }
}
