use crate::BrokerError;
use std::collections::HashMap;

const DEFAULT_APPROLE_MOUNT: &str = "approle";
const DEFAULT_JWT_MOUNT: &str = "jwt";

/// One configured authentication method with its required material.
///
/// A configuration carries exactly one variant; ambiguity is rejected during
/// construction, never resolved by precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Token {
        token: String,
    },
    AppRole {
        role_id: String,
        secret_id: String,
        mount: String,
    },
    Jwt {
        jwt: String,
        role: String,
        mount: String,
    },
    ClientCert {
        cert_pem: String,
        key_pem: String,
    },
}

impl AuthMethod {
    /// Stable label for logging. Never includes credential material.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Token { .. } => "token",
            AuthMethod::AppRole { .. } => "approle",
            AuthMethod::Jwt { .. } => "jwt",
            AuthMethod::ClientCert { .. } => "cert",
        }
    }
}

/// Validated authentication configuration for one Vault server.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL without trailing slash, e.g. `https://vault.example.com:8200`.
    pub url: String,
    pub namespace: Option<String>,
    pub ca_cert_pem: Option<String>,
    pub method: AuthMethod,
}

/// Input keys that carry raw authentication material.
pub(crate) const AUTH_MATERIAL_KEYS: &[&str] = &[
    "token",
    "role_id",
    "secret_id",
    "jwt",
    "client_cert",
    "client_key",
];

/// Non-empty lookup into a flat input map.
pub(crate) fn non_empty<'a>(inputs: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    inputs.get(key).map(|v| v.as_str()).filter(|v| !v.is_empty())
}

impl AuthConfig {
    /// Build a validated configuration from a flat string-keyed input map.
    ///
    /// Detection groups, in documentation order only: `token`,
    /// `role_id`+`secret_id`, `jwt`+`jwt_role`, `client_cert`+`client_key`.
    /// Exactly one group must be present; a partially supplied group is an
    /// error, as is material from more than one group.
    pub fn from_inputs(inputs: &HashMap<String, String>) -> Result<Self, BrokerError> {
        let url = non_empty(inputs, "url")
            .ok_or_else(|| BrokerError::Configuration("Vault URL is required".to_string()))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BrokerError::Configuration(
                "Vault URL must start with http:// or https://".to_string(),
            ));
        }
        let url = url.trim_end_matches('/').to_string();

        let token = non_empty(inputs, "token");
        let role_id = non_empty(inputs, "role_id");
        let secret_id = non_empty(inputs, "secret_id");
        let jwt = non_empty(inputs, "jwt");
        let jwt_role = non_empty(inputs, "jwt_role");
        let client_cert = non_empty(inputs, "client_cert");
        let client_key = non_empty(inputs, "client_key");

        let has_token = token.is_some();
        let has_approle = role_id.is_some() || secret_id.is_some();
        let has_jwt = jwt.is_some() || jwt_role.is_some();
        let has_cert = client_cert.is_some() || client_key.is_some();

        let groups = [has_token, has_approle, has_jwt, has_cert]
            .iter()
            .filter(|present| **present)
            .count();

        if groups == 0 {
            return Err(BrokerError::Configuration(
                "No authentication method configured. Provide one of: token, \
                 AppRole (role_id + secret_id), JWT (jwt + jwt_role), or \
                 client certificate (client_cert + client_key)"
                    .to_string(),
            ));
        }
        if groups > 1 {
            return Err(BrokerError::Configuration(
                "Multiple authentication methods configured. Provide only one of: \
                 token, AppRole, JWT, or client certificate"
                    .to_string(),
            ));
        }

        let method = if has_token {
            AuthMethod::Token {
                token: token.unwrap_or_default().to_string(),
            }
        } else if has_approle {
            match (role_id, secret_id) {
                (Some(role_id), Some(secret_id)) => AuthMethod::AppRole {
                    role_id: role_id.to_string(),
                    secret_id: secret_id.to_string(),
                    mount: non_empty(inputs, "auth_mount")
                        .unwrap_or(DEFAULT_APPROLE_MOUNT)
                        .to_string(),
                },
                _ => {
                    return Err(BrokerError::Configuration(
                        "AppRole authentication requires both role_id and secret_id".to_string(),
                    ));
                }
            }
        } else if has_jwt {
            match (jwt, jwt_role) {
                (Some(jwt), Some(role)) => AuthMethod::Jwt {
                    jwt: jwt.to_string(),
                    role: role.to_string(),
                    mount: non_empty(inputs, "auth_mount")
                        .unwrap_or(DEFAULT_JWT_MOUNT)
                        .to_string(),
                },
                _ => {
                    return Err(BrokerError::Configuration(
                        "JWT authentication requires both jwt and jwt_role".to_string(),
                    ));
                }
            }
        } else {
            match (client_cert, client_key) {
                (Some(cert_pem), Some(key_pem)) => AuthMethod::ClientCert {
                    cert_pem: cert_pem.to_string(),
                    key_pem: key_pem.to_string(),
                },
                _ => {
                    return Err(BrokerError::Configuration(
                        "Certificate authentication requires both client_cert and client_key"
                            .to_string(),
                    ));
                }
            }
        };

        Ok(AuthConfig {
            url,
            namespace: non_empty(inputs, "namespace").map(|s| s.to_string()),
            ca_cert_pem: non_empty(inputs, "ca_cert").map(|s| s.to_string()),
            method,
        })
    }
}
