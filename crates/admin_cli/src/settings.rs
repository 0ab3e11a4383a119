//! Settings for the `dompet` binary.
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! `dompet.toml` (or the file passed with `--config`), `DOMPET_*` environment
//! variables, then command-line flags.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./dompet.db?mode=rwc";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub log_level: String,
}

impl Settings {
    pub fn load(config_file: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .add_source(File::with_name(config_file).required(false))
            .add_source(Environment::with_prefix("DOMPET"))
            .build()?;

        settings.try_deserialize()
    }

    /// Applies flags given on the command line.
    #[must_use]
    pub fn with_overrides(mut self, database_url: Option<String>, log_level: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load("no-such-dompet-config").unwrap();
        assert!(!settings.database_url.is_empty());
        assert!(!settings.log_level.is_empty());
    }

    #[test]
    fn flags_win() {
        let settings = Settings {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
        .with_overrides(Some("sqlite::memory:".to_string()), None);
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
    }
}
