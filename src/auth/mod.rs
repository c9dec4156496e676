mod approle;
mod cache;
mod cert;
mod jwt;

pub use approle::AppRoleLogin;
pub use cache::TokenCache;
pub use cert::CertLogin;
pub use jwt::JwtLogin;

use crate::config::{AuthConfig, AuthMethod};
use crate::BrokerError;
use async_trait::async_trait;
use std::time::Duration;

/// Token and lease returned by a successful login exchange.
#[derive(Debug, Clone)]
pub struct LoginLease {
    pub client_token: String,
    pub lease_duration: Duration,
}

/// One login exchange against Vault.
#[async_trait]
pub trait LoginFlow: Send + Sync {
    async fn login(&self, config: &AuthConfig) -> Result<LoginLease, BrokerError>;
}

/// Ephemeral authenticated session used for resolver calls.
///
/// Lives for one logical resolution; the token itself may also live in the
/// authenticator's cache, but a session is never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub namespace: Option<String>,
    pub base_url: String,
    pub ca_cert_pem: Option<String>,
}

/// Resolves an [`AuthConfig`] into a [`Session`], caching AppRole tokens per
/// role identity. The cache is owned by this instance, not process-global, so
/// tests and multi-tenant callers get isolated state.
pub struct Authenticator {
    cache: TokenCache,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::with_cache(TokenCache::new())
    }

    /// Construct with a caller-provided cache, e.g. a pre-seeded one in tests.
    pub fn with_cache(cache: TokenCache) -> Self {
        Self { cache }
    }

    /// Execute the configured login flow (or reuse a cached token) and return
    /// a session for resolver calls. Never retries; retry policy belongs to
    /// the caller.
    pub async fn authenticate(&self, config: &AuthConfig) -> Result<Session, BrokerError> {
        let token = match &config.method {
            AuthMethod::Token { token } => token.clone(),
            AuthMethod::AppRole {
                role_id,
                secret_id,
                mount,
            } => {
                if let Some(token) = self.cache.get(role_id).await {
                    tracing::debug!(method = "approle", "Using cached Vault token");
                    token
                } else {
                    let flow = AppRoleLogin {
                        role_id: role_id.clone(),
                        secret_id: secret_id.clone(),
                        mount: mount.clone(),
                    };
                    let lease = flow.login(config).await?;
                    self.cache
                        .put(role_id, &lease.client_token, lease.lease_duration)
                        .await;
                    tracing::debug!(method = "approle", "Logged in to Vault");
                    lease.client_token
                }
            }
            AuthMethod::Jwt { jwt, role, mount } => {
                // JWTs are typically short-lived or single-use; never cached.
                let flow = JwtLogin {
                    jwt: jwt.clone(),
                    role: role.clone(),
                    mount: mount.clone(),
                };
                let lease = flow.login(config).await?;
                tracing::debug!(method = "jwt", "Logged in to Vault");
                lease.client_token
            }
            AuthMethod::ClientCert { cert_pem, key_pem } => {
                let flow = CertLogin {
                    cert_pem: cert_pem.clone(),
                    key_pem: key_pem.clone(),
                };
                let lease = flow.login(config).await?;
                tracing::debug!(method = "cert", "Logged in to Vault");
                lease.client_token
            }
        };

        Ok(Session {
            token,
            namespace: config.namespace.clone(),
            base_url: config.url.clone(),
            ca_cert_pem: config.ca_cert_pem.clone(),
        })
    }

    /// Evict a cached token, forcing a fresh login on the next call.
    pub async fn invalidate(&self, identity: &str) {
        self.cache.invalidate(identity).await;
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}
