use super::{LoginFlow, LoginLease};
use crate::config::AuthConfig;
use crate::{http, BrokerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// AppRole authentication: exchanges a role_id/secret_id pair for a token.
pub struct AppRoleLogin {
    pub role_id: String,
    pub secret_id: String,
    pub mount: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    role_id: &'a str,
    secret_id: &'a str,
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
impl LoginFlow for AppRoleLogin {
    async fn login(&self, config: &AuthConfig) -> Result<LoginLease, BrokerError> {
        let client = http::build_client(config.ca_cert_pem.as_deref(), None)?;
        let url = format!("{}/v1/auth/{}/login", config.url, self.mount);

        let mut request = client.post(&url).json(&LoginRequest {
            role_id: &self.role_id,
            secret_id: &self.secret_id,
        });
        if let Some(ref namespace) = config.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }

        let response = request.send().await.map_err(BrokerError::transport)?;
        let response = http::check_login_status(response).await?;

        let login: LoginResponse = response.json().await.map_err(|e| {
            BrokerError::Unexpected(format!("Invalid AppRole login response: {}", e))
        })?;

        Ok(LoginLease {
            client_token: login.auth.client_token,
            lease_duration: Duration::from_secs(login.auth.lease_duration),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_parses_lease() {
        let json = r#"{
            "auth": {
                "client_token": "s.abc",
                "accessor": "acc",
                "lease_duration": 3600,
                "renewable": true
            }
        }"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.auth.client_token, "s.abc");
        assert_eq!(resp.auth.lease_duration, 3600);
    }

    #[test]
    fn test_login_response_missing_lease_defaults_zero() {
        let json = r#"{"auth": {"client_token": "s.abc"}}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.auth.lease_duration, 0);
    }
}
