//! Environment-driven configuration.

use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("BOT_TOKEN не найден в переменных окружения. Создайте файл .env и добавьте в него: BOT_TOKEN=your_bot_token")]
    MissingToken,
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub db_path: String,
    pub poll_timeout_secs: u64,
    pub session_ttl_minutes: i64,
}

impl Config {
    /// Read configuration from the environment. Loading `.env` is the
    /// caller's job, before this runs.
    pub fn from_env() -> Result<Config, ConfigError> {
        let bot_token = env::var("BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Config {
            bot_token,
            db_path: env::var("LIFTLOG_DB_PATH").unwrap_or_else(|_| "workout.db".to_string()),
            poll_timeout_secs: parse_var("LIFTLOG_POLL_TIMEOUT_SECS", 30)?,
            session_ttl_minutes: parse_var("LIFTLOG_SESSION_TTL_MINUTES", 30)?,
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so the env mutations cannot race each other
    #[test]
    fn test_config_from_env() {
        env::remove_var("BOT_TOKEN");
        env::remove_var("LIFTLOG_DB_PATH");
        env::remove_var("LIFTLOG_POLL_TIMEOUT_SECS");
        env::remove_var("LIFTLOG_SESSION_TTL_MINUTES");

        assert!(matches!(Config::from_env(), Err(ConfigError::MissingToken)));

        env::set_var("BOT_TOKEN", "  ");
        assert!(matches!(Config::from_env(), Err(ConfigError::MissingToken)));

        env::set_var("BOT_TOKEN", "123:abc");
        let config = Config::from_env().unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.db_path, "workout.db");
        assert_eq!(config.poll_timeout_secs, 30);
        assert_eq!(config.session_ttl_minutes, 30);

        env::set_var("LIFTLOG_DB_PATH", "/tmp/lifts.db");
        env::set_var("LIFTLOG_POLL_TIMEOUT_SECS", "5");
        env::set_var("LIFTLOG_SESSION_TTL_MINUTES", "120");
        let config = Config::from_env().unwrap();
        assert_eq!(config.db_path, "/tmp/lifts.db");
        assert_eq!(config.poll_timeout_secs, 5);
        assert_eq!(config.session_ttl_minutes, 120);

        env::set_var("LIFTLOG_POLL_TIMEOUT_SECS", "fast");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                var: "LIFTLOG_POLL_TIMEOUT_SECS",
                ..
            })
        ));

        env::remove_var("BOT_TOKEN");
        env::remove_var("LIFTLOG_DB_PATH");
        env::remove_var("LIFTLOG_POLL_TIMEOUT_SECS");
        env::remove_var("LIFTLOG_SESSION_TTL_MINUTES");
    }
}
