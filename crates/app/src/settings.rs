//! Settings for the `tenant_ledger` binary.
//!
//! Sources, later ones winning: the TOML file (`config/tenant_ledger.toml`
//! unless `--config` says otherwise), `TENANT_LEDGER__*` environment
//! variables, then command-line flags.
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{cli::GlobalArgs, error::Result};

const DEFAULT_CONFIG_PATH: &str = "config/tenant_ledger.toml";

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

/// `database = "memory"` or `database = { sqlite = "<path>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Database::Sqlite("tenant_ledger.db".to_string())
    }
}

impl Database {
    /// `memory` selects an in-memory database, anything else is a file path.
    pub fn from_flag(value: &str) -> Self {
        if value.eq_ignore_ascii_case("memory") {
            Database::Memory
        } else {
            Database::Sqlite(value.to_string())
        }
    }

    pub fn url(&self) -> String {
        match self {
            Database::Memory => "sqlite::memory:".to_string(),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    /// Owner id every command runs as. `None` means signed out.
    pub user: Option<String>,
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: App::default(),
            database: Database::default(),
            user: None,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("TENANT_LEDGER").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(level) = &args.level {
            settings.app.level = level.clone();
        }
        if let Some(database) = &args.database {
            settings.database = Database::from_flag(database);
        }
        if let Some(user) = &args.user {
            settings.user = Some(user.clone());
        }
        if let Some(export_dir) = &args.export_dir {
            settings.export_dir = export_dir.clone();
        }
        settings.user = settings
            .user
            .map(|user| user.trim().to_string())
            .filter(|user| !user.is_empty());

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_flag_and_url() {
        assert_eq!(Database::from_flag("MEMORY"), Database::Memory);
        assert_eq!(Database::Memory.url(), "sqlite::memory:");
        assert_eq!(
            Database::from_flag("data/ledger.db").url(),
            "sqlite:data/ledger.db?mode=rwc"
        );
    }

    #[test]
    fn flags_override_defaults() {
        let args = GlobalArgs {
            config: Some("does/not/exist.toml".to_string()),
            level: Some("debug".to_string()),
            database: Some("memory".to_string()),
            user: Some("  alice ".to_string()),
            export_dir: None,
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.user.as_deref(), Some("alice"));
        assert_eq!(settings.export_dir, PathBuf::from("."));
    }

    #[test]
    fn blank_user_means_signed_out() {
        let args = GlobalArgs {
            config: Some("does/not/exist.toml".to_string()),
            user: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(Settings::load(&args).unwrap().user, None);
    }
}
