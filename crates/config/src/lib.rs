use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "teamlink.toml",
    "config/teamlink.toml",
    "crates/config/teamlink.toml",
    "../teamlink.toml",
    "../config/teamlink.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OAuth2 public-client settings for the Microsoft identity platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base authority; tenant is appended as a path segment.
    #[serde(default = "AuthConfig::default_authority")]
    pub authority: String,
    #[serde(default = "AuthConfig::default_tenant")]
    pub tenant: String,
    /// Application (client) id of the registered public client.
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "AuthConfig::default_scopes")]
    pub scopes: Vec<String>,
    /// Token cache location; defaults to `~/.teamlink/token_cache.json`.
    #[serde(default)]
    pub token_cache_path: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authority: Self::default_authority(),
            tenant: Self::default_tenant(),
            client_id: String::new(),
            scopes: Self::default_scopes(),
            token_cache_path: None,
        }
    }
}

impl AuthConfig {
    fn default_authority() -> String {
        "https://login.microsoftonline.com".to_string()
    }

    fn default_tenant() -> String {
        "organizations".to_string()
    }

    fn default_scopes() -> Vec<String> {
        vec![
            "Chat.Create".to_string(),
            "Chat.ReadWrite".to_string(),
            "User.Read".to_string(),
        ]
    }
}

/// Settings for the Microsoft Graph endpoint.
///
/// ```
/// use teamlink_config::GraphConfig;
///
/// let graph = GraphConfig::default();
/// assert_eq!(graph.base_url, "https://graph.microsoft.com/beta");
/// assert_eq!(graph.request_timeout_seconds, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "GraphConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "GraphConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl GraphConfig {
    fn default_base_url() -> String {
        "https://graph.microsoft.com/beta".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Bounded retry-with-backoff applied to chat message delivery. Graph chat
/// creation is eventually consistent, so the first message send after a
/// create can fail; the delay doubles on every attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl RetryConfig {
    const fn default_max_attempts() -> u32 {
        3
    }

    const fn default_base_delay_ms() -> u64 {
        500
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_ms: Self::default_base_delay_ms(),
        }
    }
}

/// Logging sink selection. Standard output carries protocol frames, so log
/// output goes to standard error, or to `file` when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Load the application configuration by combining defaults, an optional
/// configuration file, and environment overrides.
///
/// ```
/// use teamlink_config::load;
///
/// std::env::remove_var("TEAMLINK_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.graph.base_url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("auth.authority", defaults.auth.authority.clone())
        .unwrap()
        .set_default("auth.tenant", defaults.auth.tenant.clone())
        .unwrap()
        .set_default("auth.client_id", defaults.auth.client_id.clone())
        .unwrap()
        .set_default("auth.scopes", defaults.auth.scopes.clone())
        .unwrap()
        .set_default("graph.base_url", defaults.graph.base_url.clone())
        .unwrap()
        .set_default(
            "graph.request_timeout_seconds",
            i64::try_from(defaults.graph.request_timeout_seconds).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default("retry.max_attempts", i64::from(defaults.retry.max_attempts))
        .unwrap()
        .set_default(
            "retry.base_delay_ms",
            i64::try_from(defaults.retry.base_delay_ms).unwrap_or(i64::MAX),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("TEAMLINK").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("TEAMLINK_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via TEAMLINK_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded host configuration");
    Ok(config)
}
