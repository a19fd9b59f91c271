use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use leetcode_tracker_core::provision::{RepositorySettings, DEFAULT_DESCRIPTION, DEFAULT_REPO_NAME};
use serde::Deserialize;
use tracing::{error, info};

use crate::github::{DEFAULT_API_BASE, DEFAULT_USER_AGENT};
use crate::oauth::DEFAULT_EXCHANGE_URL;
use crate::storage::default_store_path;

/// Optional personal access token; stored as the identity token before a push.
pub const TOKEN_ENV: &str = "LEETCODE_TRACKER_TOKEN";

const DEFAULT_REVERT_SECS: u64 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct StaticConfig {
    repository: RepositorySection,
    github: GitHubSection,
    oauth: OAuthSection,
    storage: StorageSection,
    status: StatusSection,
    http: HttpSection,
}

#[derive(Deserialize)]
#[serde(default)]
struct RepositorySection {
    name: String,
    description: String,
    private: bool,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            name: DEFAULT_REPO_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            private: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct GitHubSection {
    api_base: String,
    user_agent: String,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct OAuthSection {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    exchange_url: String,
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: None,
            exchange_url: DEFAULT_EXCHANGE_URL.to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StorageSection {
    path: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(default)]
struct StatusSection {
    revert_after_secs: u64,
}

impl Default for StatusSection {
    fn default() -> Self {
        Self {
            revert_after_secs: DEFAULT_REVERT_SECS,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct HttpSection {
    timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub api_base: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub exchange_url: String,
}

/// Everything the CLI needs, merged from the YAML file and the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub repository: RepositorySettings,
    pub github: GitHubConfig,
    pub oauth: OAuthConfig,
    pub storage_path: PathBuf,
    pub status_revert: Duration,
    pub http_timeout: Duration,
    pub env_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("repository", &self.repository)
            .field("github", &self.github)
            .field("oauth", &self.oauth)
            .field("storage_path", &self.storage_path)
            .field("status_revert", &self.status_revert)
            .field("http_timeout", &self.http_timeout)
            .field("env_token", &self.env_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    fn from_static(conf: StaticConfig) -> Self {
        Self {
            repository: RepositorySettings {
                name: conf.repository.name,
                description: conf.repository.description,
                private: conf.repository.private,
            },
            github: GitHubConfig {
                api_base: conf.github.api_base,
                user_agent: conf.github.user_agent,
            },
            oauth: OAuthConfig {
                client_id: conf.oauth.client_id,
                redirect_uri: conf.oauth.redirect_uri,
                exchange_url: conf.oauth.exchange_url,
            },
            storage_path: conf.storage.path.unwrap_or_else(default_store_path),
            status_revert: Duration::from_secs(conf.status.revert_after_secs),
            http_timeout: Duration::from_secs(conf.http.timeout_secs),
            env_token: env_token(),
        }
    }

    /// Defaults for every section, plus the environment token.
    pub fn from_env() -> Self {
        info!("No config file given, using defaults");
        Self::from_static(StaticConfig::default())
    }
}

fn env_token() -> Option<String> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!("{TOKEN_ENV} found in env");
            Some(token.trim().to_string())
        }
        _ => None,
    }
}

/// Loads the YAML config file and merges in the optional token from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    // An empty file is all defaults.
    let static_conf: StaticConfig = if config_content.trim().is_empty() {
        StaticConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => conf,
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    if static_conf.repository.name.trim().is_empty() {
        anyhow::bail!("repository.name must not be empty");
    }

    let config = AppConfig::from_static(static_conf);
    info!(
        repository = %config.repository.name,
        private = config.repository.private,
        api_base = %config.github.api_base,
        storage = %config.storage_path.display(),
        "Config loaded and merged successfully"
    );
    Ok(config)
}
