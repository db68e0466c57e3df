use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::devicecode::StandardDeviceAuthorizationResponse;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, ClientId, DeviceAuthorizationUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use teamlink_config::AuthConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Refuse to serve a cached token this close to its expiry.
const EXPIRY_SKEW_SECONDS: i64 = 60;

const DEFAULT_CACHE_DIR: &str = ".teamlink";
const DEFAULT_CACHE_FILE: &str = "token_cache.json";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth.client_id is not configured")]
    MissingClientId,
    #[error("invalid identity endpoint: {0}")]
    InvalidEndpoint(#[from] oauth2::url::ParseError),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("no usable credential: {0}")]
    NoCredential(String),
    #[error("token cache at {path}: {source}")]
    Cache {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Source of bearer tokens for Graph calls. Constructed once at process
/// start and shared by reference so tests can substitute a fake.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self) -> Result<String, AuthError>;
}

/// On-disk token cache. The file lives under the user's home directory and
/// is rewritten only after a non-silent acquisition; there is no locking,
/// concurrent host instances are unsupported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
}

impl TokenCache {
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(|source| AuthError::Cache {
            path: path.to_path_buf(),
            source,
        })?;
        match serde_json::from_str(&raw) {
            Ok(cache) => Ok(Some(cache)),
            Err(error) => {
                // A corrupt cache is recoverable: fall back to interactive
                // acquisition, which rewrites the file.
                warn!(path = %path.display(), %error, "ignoring malformed token cache");
                Ok(None)
            }
        }
    }

    pub fn store(&self, path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AuthError::Cache {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string(self).map_err(|source| AuthError::Cache {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
        })?;
        std::fs::write(path, raw).map_err(|source| AuthError::Cache {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_SKEW_SECONDS) > now
    }
}

/// OAuth2 public client against the Microsoft identity platform.
///
/// Silent path first: an unexpired cached access token is returned as-is; a
/// cached refresh token is exchanged next. Only when both fail does the
/// device authorization grant run, with the verification URI and user code
/// reported through the log (never standard output, which carries protocol
/// frames).
pub struct DeviceTokenProvider {
    client: BasicClient,
    scopes: Vec<Scope>,
    cache_path: PathBuf,
}

impl DeviceTokenProvider {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.client_id.is_empty() {
            return Err(AuthError::MissingClientId);
        }

        let tenant_base = format!(
            "{}/{}",
            config.authority.trim_end_matches('/'),
            config.tenant
        );
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            None,
            AuthUrl::new(format!("{tenant_base}/oauth2/v2.0/authorize"))?,
            Some(TokenUrl::new(format!("{tenant_base}/oauth2/v2.0/token"))?),
        )
        .set_device_authorization_url(DeviceAuthorizationUrl::new(format!(
            "{tenant_base}/oauth2/v2.0/devicecode"
        ))?)
        .set_auth_type(oauth2::AuthType::RequestBody);

        let cache_path = config
            .token_cache_path
            .clone()
            .unwrap_or_else(default_cache_path);

        Ok(Self {
            client,
            scopes: config.scopes.iter().cloned().map(Scope::new).collect(),
            cache_path,
        })
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenCache, AuthError> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_owned()))
            .add_scopes(self.scopes.iter().cloned())
            .request_async(async_http_client)
            .await
            .map_err(|error| AuthError::TokenExchange(error.to_string()))?;

        Ok(cache_from_response(
            response.access_token().secret().clone(),
            response.expires_in(),
            response
                .refresh_token()
                .map(|token| token.secret().clone())
                .or_else(|| Some(refresh_token.to_owned())),
        ))
    }

    async fn device_flow(&self) -> Result<TokenCache, AuthError> {
        let details: StandardDeviceAuthorizationResponse = self
            .client
            .exchange_device_code()
            .map_err(|error| AuthError::TokenExchange(error.to_string()))?
            .add_scopes(self.scopes.iter().cloned())
            .request_async(async_http_client)
            .await
            .map_err(|error| AuthError::TokenExchange(error.to_string()))?;

        info!(
            verification_uri = %details.verification_uri().as_str(),
            user_code = %details.user_code().secret(),
            "device authorization pending, complete sign-in in a browser"
        );

        let response = self
            .client
            .exchange_device_access_token(&details)
            .request_async(async_http_client, tokio::time::sleep, None)
            .await
            .map_err(|error| AuthError::NoCredential(error.to_string()))?;

        Ok(cache_from_response(
            response.access_token().secret().clone(),
            response.expires_in(),
            response.refresh_token().map(|token| token.secret().clone()),
        ))
    }
}

#[async_trait]
impl TokenProvider for DeviceTokenProvider {
    async fn get_token(&self) -> Result<String, AuthError> {
        let cached = TokenCache::load(&self.cache_path)?;

        if let Some(cache) = &cached {
            if cache.is_usable(Utc::now()) {
                debug!("serving access token from cache");
                return Ok(cache.access_token.clone());
            }

            if let Some(refresh_token) = &cache.refresh_token {
                match self.refresh(refresh_token).await {
                    Ok(renewed) => {
                        renewed.store(&self.cache_path)?;
                        debug!("access token renewed via refresh grant");
                        return Ok(renewed.access_token);
                    }
                    Err(error) => {
                        warn!(%error, "refresh grant failed, falling back to device flow");
                    }
                }
            }
        }

        let acquired = self.device_flow().await?;
        acquired.store(&self.cache_path)?;
        info!("access token acquired via device authorization grant");
        Ok(acquired.access_token)
    }
}

fn cache_from_response(
    access_token: String,
    expires_in: Option<std::time::Duration>,
    refresh_token: Option<String>,
) -> TokenCache {
    let lifetime = expires_in
        .and_then(|duration| chrono::Duration::from_std(duration).ok())
        .unwrap_or_else(|| chrono::Duration::seconds(3600));
    TokenCache {
        access_token,
        expires_at: Utc::now() + lifetime,
        refresh_token,
    }
}

fn default_cache_path() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(DEFAULT_CACHE_DIR).join(DEFAULT_CACHE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_within_skew_window_is_not_usable() {
        let now = Utc::now();
        let cache = TokenCache {
            access_token: "token".into(),
            expires_at: now + chrono::Duration::seconds(EXPIRY_SKEW_SECONDS - 5),
            refresh_token: None,
        };
        assert!(!cache.is_usable(now));
    }

    #[test]
    fn cache_with_headroom_is_usable() {
        let now = Utc::now();
        let cache = TokenCache {
            access_token: "token".into(),
            expires_at: now + chrono::Duration::seconds(EXPIRY_SKEW_SECONDS + 60),
            refresh_token: None,
        };
        assert!(cache.is_usable(now));
    }
}
