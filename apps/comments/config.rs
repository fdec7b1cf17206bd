use crate::dedup::DedupStrategy;
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs, path::Path};
use tracing::{info, warn};
use utils::errors::{
    CONFIG_ALREADY_INITIALIZED, CONFIG_NOT_INITIALIZED, CONFIG_PARSE_FAILED, CONFIG_READ_FAILED,
};

pub static CONFIG: OnceCell<CommentsConfig> = OnceCell::new();

pub const DEFAULT_CONFIG_PATH: &str = "comments.yaml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CommentsConfig {
    pub api: ApiConfig,
    pub dedup_strategy: DedupStrategy,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub comments_path: String,
    pub token: Option<String>,
    /// Transient-failure retries. Zero keeps the fetch single-shot.
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            comments_path: "api/v1/posts/comments/getCommentsByTimeline".to_string(),
            token: None,
            max_retries: 0,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.comments_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

pub fn load() -> Result<()> {
    let config = load_config();
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!(CONFIG_ALREADY_INITIALIZED))?;
    Ok(())
}

pub fn get_config() -> Result<&'static CommentsConfig> {
    CONFIG.get().context(CONFIG_NOT_INITIALIZED)
}

/// Reads the YAML file named by `COMMENTS_CONFIG_PATH`, falling back to
/// defaults when it is missing or invalid, then applies env overrides.
pub fn load_config() -> CommentsConfig {
    let path = env::var("COMMENTS_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = match read_config_file(Path::new(&path)) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, path = %path, "Comments config unavailable, using defaults");
            CommentsConfig::default()
        }
    };

    apply_env_overrides(&mut config);

    info!(
        endpoint = %config.api.endpoint(),
        max_retries = config.api.max_retries,
        dedup_strategy = ?config.dedup_strategy,
        listen_addr = %config.server.listen_addr,
        "Comments config loaded"
    );

    config
}

pub fn read_config_file(path: &Path) -> Result<CommentsConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("{CONFIG_READ_FAILED}: {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("{CONFIG_PARSE_FAILED}: {}", path.display()))
}

fn apply_env_overrides(config: &mut CommentsConfig) {
    if let Ok(value) = env::var("COMMENTS_API_BASE_URL") {
        config.api.base_url = value;
    }

    if let Ok(value) = env::var("COMMENTS_API_PATH") {
        config.api.comments_path = value;
    }

    if let Ok(value) = env::var("COMMENTS_API_TOKEN") {
        config.api.token = Some(value).filter(|t| !t.is_empty());
    }

    if let Ok(value) = env::var("COMMENTS_API_MAX_RETRIES") {
        match value.parse::<u32>() {
            Ok(retries) => config.api.max_retries = retries,
            Err(err) => warn!(error = %err, "Failed to parse COMMENTS_API_MAX_RETRIES override"),
        }
    }

    if let Ok(value) = env::var("COMMENTS_API_TIMEOUT_SECS") {
        match value.parse::<u64>() {
            Ok(secs) => config.api.timeout_secs = secs,
            Err(err) => warn!(error = %err, "Failed to parse COMMENTS_API_TIMEOUT_SECS override"),
        }
    }

    if let Ok(value) = env::var("COMMENTS_DEDUP_STRATEGY") {
        match value.parse::<DedupStrategy>() {
            Ok(strategy) => config.dedup_strategy = strategy,
            Err(err) => warn!(error = %err, "Failed to parse COMMENTS_DEDUP_STRATEGY override"),
        }
    }

    if let Ok(value) = env::var("COMMENTS_LISTEN_ADDR") {
        config.server.listen_addr = value;
    }
}
