use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calc::Deductions;

pub const DEFAULT_API_BASE_URL: &str = "https://openexchangerates.org/api/";
pub const DEFAULT_DB_FILENAME: &str = "targeter.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tax percentage applied after the withholding, in `[0, 100)`.
    #[serde(default)]
    pub tax_rate: Decimal,

    /// Extra withholding percentage, applied first, in `[0, 100)`.
    #[serde(default)]
    pub additional_withhold: Decimal,

    /// Base URL of the rates API; `latest.json` is appended to it.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// SQLite file name inside the data directory.
    #[serde(default = "default_db_filename")]
    pub db_filename: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_db_filename() -> String {
    DEFAULT_DB_FILENAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            additional_withhold: Decimal::ZERO,
            api_base_url: default_api_base_url(),
            db_filename: default_db_filename(),
        }
    }
}

impl AppConfig {
    pub fn deductions(&self) -> crate::error::Result<Deductions> {
        Deductions::new(self.tax_rate, self.additional_withhold)
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

pub fn app_paths(override_home: Option<PathBuf>) -> Result<AppPaths> {
    if let Some(home) = override_home {
        return Ok(AppPaths {
            config_dir: home.join("config"),
            data_dir: home.join("data"),
        });
    }

    let proj = ProjectDirs::from("com", "targeter", "targeter")
        .context("Failed to resolve platform directories")?;

    Ok(AppPaths {
        config_dir: proj.config_dir().to_path_buf(),
        data_dir: proj.data_dir().to_path_buf(),
    })
}

/// Loads `config.json`, writing the defaults on first run, and validates the
/// deductions before anything else uses them.
pub fn load_or_init_config(paths: &AppPaths) -> Result<(AppConfig, Deductions, PathBuf)> {
    fs::create_dir_all(&paths.config_dir)
        .with_context(|| format!("Failed to create config dir {}", paths.config_dir.display()))?;

    let cfg_path = paths.config_dir.join("config.json");
    let cfg = if cfg_path.exists() {
        let raw = fs::read_to_string(&cfg_path)
            .with_context(|| format!("Failed to read {}", cfg_path.display()))?;
        serde_json::from_str::<AppConfig>(&raw)
            .with_context(|| format!("Failed to parse {}", cfg_path.display()))?
    } else {
        let cfg = AppConfig::default();
        write_config(&cfg_path, &cfg)?;
        cfg
    };

    let deductions = cfg.deductions()?;
    Ok((cfg, deductions, cfg_path))
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
