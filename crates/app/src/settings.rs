//! Settings for the `aspire` binary, read from `settings.toml` and the
//! environment.

use engine::{Locale, SheetNames};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "settings.toml";
const ENV_PREFIX: &str = "ASPIRE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Spreadsheet {
    pub id: String,
    /// OAuth bearer token sent with every request.
    pub token: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Throttle {
    pub max_queries: usize,
    pub window_secs: u64,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            max_queries: 60,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub spreadsheet: Spreadsheet,
    #[serde(default)]
    pub sheets: SheetNames,
    #[serde(default)]
    pub throttle: Throttle,
    #[serde(default = "default_ensure_healthy")]
    pub ensure_healthy: bool,
}

fn default_ensure_healthy() -> bool {
    true
}

impl Settings {
    /// Reads the optional TOML file at `path`, then `ASPIRE__*` environment
    /// variables (e.g. `ASPIRE__SPREADSHEET__TOKEN`).
    pub fn new(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        Self::from_sources(
            config::Config::builder()
                .add_source(config::File::with_name(path).required(false))
                .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__")),
        )
    }

    fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Settings, config::ConfigError> {
        Settings::from_sources(
            config::Config::builder()
                .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let settings = parse(
            r#"
            [spreadsheet]
            id = "abc"
            token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.spreadsheet.locale, Locale::Europe);
        assert_eq!(settings.spreadsheet.base_url, None);
        assert_eq!(settings.sheets, SheetNames::default());
        assert_eq!(settings.throttle.max_queries, 60);
        assert_eq!(settings.throttle.window_secs, 60);
        assert!(settings.ensure_healthy);
    }

    #[test]
    fn overrides() {
        let settings = parse(
            r#"
            ensure_healthy = false

            [app]
            level = "debug"

            [spreadsheet]
            id = "abc"
            token = "secret"
            locale = "us"

            [sheets]
            transactions = "Spese"

            [throttle]
            max_queries = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.spreadsheet.locale, Locale::Us);
        assert_eq!(settings.sheets.transactions, "Spese");
        assert_eq!(settings.sheets.dashboard, "Dashboard");
        assert_eq!(settings.throttle.max_queries, 10);
        assert_eq!(settings.throttle.window_secs, 60);
        assert!(!settings.ensure_healthy);
    }

    #[test]
    fn spreadsheet_is_required() {
        assert!(parse("[app]\nlevel = \"warn\"\n").is_err());
    }
}
