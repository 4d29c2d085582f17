use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "FUEL_DATA_DIR";
pub const API_URL_ENV: &str = "FUEL_API_URL";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            PathBuf::from(dir)
        } else {
            let proj_dirs =
                ProjectDirs::from("", "", "fuel").context("Could not determine home directory")?;
            proj_dirs.data_dir().to_path_buf()
        };
        let api_url = api_url_from(std::env::var(API_URL_ENV).ok());
        Self::in_dir(data_dir, api_url)
    }

    pub fn in_dir(data_dir: PathBuf, api_url: String) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("fuel.db");

        Ok(Config {
            db_path,
            data_dir,
            api_url,
        })
    }
}

/// Base URL without a trailing slash, falling back to the local dev server.
fn api_url_from(value: Option<String>) -> String {
    value
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}
