use super::{LoginFlow, LoginLease};
use crate::config::AuthConfig;
use crate::{http, BrokerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JWT/OIDC authentication: presents a bearer JWT against a named role.
pub struct JwtLogin {
    pub jwt: String,
    pub role: String,
    pub mount: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    role: &'a str,
    jwt: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: AuthData,
}

#[derive(Deserialize)]
struct AuthData {
    client_token: String,
    #[serde(default)]
    lease_duration: u64,
}

#[async_trait]
impl LoginFlow for JwtLogin {
    async fn login(&self, config: &AuthConfig) -> Result<LoginLease, BrokerError> {
        let client = http::build_client(config.ca_cert_pem.as_deref(), None)?;
        let url = format!("{}/v1/auth/{}/login", config.url, self.mount);

        let mut request = client.post(&url).json(&LoginRequest {
            role: &self.role,
            jwt: &self.jwt,
        });
        if let Some(ref namespace) = config.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }

        let response = request.send().await.map_err(BrokerError::transport)?;
        let response = http::check_login_status(response).await?;

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| BrokerError::Unexpected(format!("Invalid JWT login response: {}", e)))?;

        Ok(LoginLease {
            client_token: login.auth.client_token,
            lease_duration: Duration::from_secs(login.auth.lease_duration),
        })
    }
}
