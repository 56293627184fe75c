use crate::dashboard::MAX_MONTHS;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DASHBOARD_MONTHS: u32 = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite file name, resolved inside the data dir.
    #[serde(default)]
    pub database_file: Option<String>,

    /// Trailing months shown by `dashboard`, the current month included.
    #[serde(default)]
    pub dashboard_months: Option<u32>,

    /// Fallback filter when `LEDGERBOOK_LOG` is unset (e.g. "warn", "ledgerbook=debug").
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_file: Some("ledgerbook.sqlite3".to_string()),
            dashboard_months: Some(DEFAULT_DASHBOARD_MONTHS),
            log_level: Some("warn".to_string()),
        }
    }
}

impl AppConfig {
    pub fn database_path(&self, paths: &AppPaths) -> PathBuf {
        let file = self
            .database_file
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or("ledgerbook.sqlite3");
        paths.data_dir.join(file)
    }

    /// Out-of-range values (0 or above [`MAX_MONTHS`]) fall back to the default.
    pub fn dashboard_months(&self) -> u32 {
        self.dashboard_months
            .filter(|m| (1..=MAX_MONTHS).contains(m))
            .unwrap_or(DEFAULT_DASHBOARD_MONTHS)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
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

    let proj = ProjectDirs::from("com", "ledgerbook", "ledgerbook")
        .context("Failed to resolve platform directories")?;

    Ok(AppPaths {
        config_dir: proj.config_dir().to_path_buf(),
        data_dir: proj.data_dir().to_path_buf(),
    })
}

pub fn load_or_init_config(paths: &AppPaths) -> Result<(AppConfig, PathBuf)> {
    fs::create_dir_all(&paths.config_dir)
        .with_context(|| format!("Failed to create config dir {}", paths.config_dir.display()))?;

    let cfg_path = paths.config_dir.join("config.json");
    if !cfg_path.exists() {
        let cfg = AppConfig::default();
        write_config(&cfg_path, &cfg)?;
        return Ok((cfg, cfg_path));
    }

    let raw = fs::read_to_string(&cfg_path)
        .with_context(|| format!("Failed to read {}", cfg_path.display()))?;
    let mut cfg: AppConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", cfg_path.display()))?;

    // Fill in keys missing from older config files.
    let defaults = AppConfig::default();
    let mut changed = false;
    if cfg.database_file.is_none() {
        cfg.database_file = defaults.database_file;
        changed = true;
    }
    if cfg.dashboard_months.is_none() {
        cfg.dashboard_months = defaults.dashboard_months;
        changed = true;
    }
    if cfg.log_level.is_none() {
        cfg.log_level = defaults.log_level;
        changed = true;
    }
    if changed {
        write_config(&cfg_path, &cfg)?;
    }

    Ok((cfg, cfg_path))
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar date used for projections and dashboard buckets.
pub fn today() -> NaiveDate {
    now_utc().date_naive()
}
