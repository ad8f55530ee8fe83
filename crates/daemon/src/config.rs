// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Values come from `~/.flux/config.json` (mode 0600) with environment
//! variables taking precedence. `CONVEX_URL` is the only hard requirement;
//! everything else has a default or degrades a feature.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CONVEX_URL is required (set the env var or convexUrl in config.json)")]
    MissingConvexUrl,
    #[error("no home directory available for state dir resolution")]
    NoHomeDir,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk shape of `~/.flux/config.json`. Env vars override these.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FileConfig {
    convex_url: Option<String>,
    flux_host: Option<String>,
    flux_token: Option<String>,
    flux_org_id: Option<String>,
    gateway_url: Option<String>,
    gateway_token: Option<String>,
    backend: Option<String>,
    repo_workspace_root: Option<PathBuf>,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub convex_url: String,
    pub flux_host: Option<String>,
    pub flux_token: Option<String>,
    pub flux_org_id: Option<String>,
    pub gateway_url: Option<String>,
    pub gateway_token: Option<String>,
    pub backend: Option<String>,
    pub allow_direct_cli: bool,
    pub repo_workspace_root: Option<PathBuf>,
    pub max_concurrent: usize,
    pub max_pending_review: u64,
    pub auto_pause_after_n_fails: usize,
    pub state_dir: PathBuf,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}

fn env_flag(name: &str) -> bool {
    env_var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from the environment and the config file.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = match env_var("OPENCLAW_STATE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(".flux"),
        };
        let config_path = match env_var("OPENCLAW_CONFIG_PATH") {
            Some(path) => PathBuf::from(path),
            None => state_dir.join("config.json"),
        };
        let file = Self::read_file(&config_path)?;

        let convex_url = env_var("CONVEX_URL")
            .or(file.convex_url)
            .ok_or(ConfigError::MissingConvexUrl)?;

        Ok(Self {
            convex_url,
            flux_host: env_var("FLUX_HOST").or(file.flux_host),
            flux_token: env_var("FLUX_TOKEN").or(file.flux_token),
            flux_org_id: env_var("FLUX_ORG_ID").or(file.flux_org_id),
            gateway_url: env_var("OPENCLAW_GATEWAY_URL").or(file.gateway_url),
            gateway_token: env_var("OPENCLAW_GATEWAY_TOKEN").or(file.gateway_token),
            backend: env_var("FLUX_BACKEND").or(file.backend),
            allow_direct_cli: env_flag("FLUX_ALLOW_DIRECT_CLI"),
            repo_workspace_root: env_var("OPENCLAW_REPO_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .or(file.repo_workspace_root),
            max_concurrent: env_parse("SQUAD_MAX_CONCURRENT").unwrap_or(4),
            max_pending_review: env_parse("SQUAD_MAX_PENDING_REVIEW").unwrap_or(5),
            auto_pause_after_n_fails: env_parse("SQUAD_AUTO_PAUSE_AFTER_N_FAILS").unwrap_or(5),
            log_path: state_dir.join("daemon.log"),
            lock_path: state_dir.join("fluxd.lock"),
            state_dir,
        })
    }

    /// Read the config file, tolerating its absence but not I/O failures.
    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content).unwrap_or_default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
