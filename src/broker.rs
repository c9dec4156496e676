use crate::auth::Authenticator;
use crate::config::{non_empty, AuthConfig, AuthMethod, AUTH_MATERIAL_KEYS};
use crate::secrets::{
    resolve_dynamic, resolve_static, DynamicSecretRequest, KvVersion, SecretsEngine,
    StaticSecretRequest,
};
use crate::BrokerError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const DEFAULT_STATIC_MOUNT: &str = "secret";
const DEFAULT_DYNAMIC_MOUNT: &str = "database";

/// Lookup collaborator for reference-credential indirection: resolves a
/// logical name to the stored authentication input map.
#[async_trait]
pub trait AuthConfigSource: Send + Sync {
    /// Return the auth inputs stored under `name`, or
    /// [`BrokerError::Configuration`] when no such credential exists.
    async fn lookup_auth(&self, name: &str) -> Result<HashMap<String, String>, BrokerError>;
}

/// Boundary facade: maps a flat string-keyed input mapping to authenticator
/// and resolver calls and returns the flat output mapping.
///
/// Owns one [`Authenticator`] (and with it the AppRole token cache) for its
/// lifetime; concurrent `resolve` calls are safe.
pub struct VaultBroker {
    authenticator: Authenticator,
    auth_source: Option<Arc<dyn AuthConfigSource>>,
}

impl VaultBroker {
    pub fn new() -> Self {
        Self {
            authenticator: Authenticator::new(),
            auth_source: None,
        }
    }

    /// Enable `auth_credential_name` indirection through the given lookup
    /// collaborator.
    pub fn with_auth_source(source: Arc<dyn AuthConfigSource>) -> Self {
        Self {
            authenticator: Authenticator::new(),
            auth_source: Some(source),
        }
    }

    /// Resolve one secret. Dispatches on `engine_type` (`static` or
    /// `dynamic`); see the crate docs for the input vocabulary.
    pub async fn resolve(
        &self,
        inputs: &HashMap<String, String>,
    ) -> Result<BTreeMap<String, String>, BrokerError> {
        let config = self.auth_config(inputs).await?;
        tracing::debug!(auth = config.method.kind(), "Resolving secret");
        let mut session = self.authenticator.authenticate(&config).await?;

        // A namespace given with the secret-access inputs replaces the
        // auth-derived one; override, not merge.
        if let Some(namespace) = non_empty(inputs, "namespace") {
            session.namespace = Some(namespace.to_string());
        }

        let result = match non_empty(inputs, "engine_type") {
            Some("static") | None => {
                let request = static_request(inputs)?;
                resolve_static(&session, &request).await
            }
            Some("dynamic") => {
                let request = dynamic_request(inputs)?;
                resolve_dynamic(&session, &request).await
            }
            Some(other) => {
                return Err(BrokerError::Configuration(format!(
                    "Unsupported engine_type: {}",
                    other
                )));
            }
        };

        match result {
            Ok(secret) => Ok(secret.into_outputs()),
            Err(err) => {
                // A policy denial on the data call means a cached token is no
                // longer trustworthy for this identity.
                if let (
                    BrokerError::Authentication { .. },
                    AuthMethod::AppRole { role_id, .. },
                ) = (&err, &config.method)
                {
                    self.authenticator.invalidate(role_id).await;
                }
                Err(err)
            }
        }
    }

    /// Authenticate only, returning the stored-auth output shape consumed by
    /// reference lookups: `vault_url`, `vault_token`, `vault_ca_cert`.
    pub async fn resolve_auth(
        &self,
        inputs: &HashMap<String, String>,
    ) -> Result<BTreeMap<String, String>, BrokerError> {
        let config = self.auth_config(inputs).await?;
        let session = self.authenticator.authenticate(&config).await?;

        let mut outputs = BTreeMap::new();
        outputs.insert("vault_url".to_string(), session.base_url);
        outputs.insert("vault_token".to_string(), session.token);
        outputs.insert(
            "vault_ca_cert".to_string(),
            session.ca_cert_pem.unwrap_or_default(),
        );
        Ok(outputs)
    }

    async fn auth_config(
        &self,
        inputs: &HashMap<String, String>,
    ) -> Result<AuthConfig, BrokerError> {
        let Some(name) = non_empty(inputs, "auth_credential_name") else {
            return AuthConfig::from_inputs(inputs);
        };

        // Secret-access configurations never carry raw auth material when
        // they reference a stored auth configuration.
        if let Some(key) = AUTH_MATERIAL_KEYS
            .iter()
            .find(|key| non_empty(inputs, key).is_some())
        {
            return Err(BrokerError::Configuration(format!(
                "'{}' must not be combined with auth_credential_name",
                key
            )));
        }

        let source = self.auth_source.as_ref().ok_or_else(|| {
            BrokerError::Configuration(
                "auth_credential_name given but no credential source is configured".to_string(),
            )
        })?;

        tracing::debug!(name = %name, "Resolving referenced auth credential");
        let auth_inputs = source.lookup_auth(name).await?;
        AuthConfig::from_inputs(&auth_inputs)
    }
}

impl Default for VaultBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn static_request(inputs: &HashMap<String, String>) -> Result<StaticSecretRequest, BrokerError> {
    let path = non_empty(inputs, "secret_path")
        .ok_or_else(|| {
            BrokerError::Configuration("secret_path is required for static secrets".to_string())
        })?
        .to_string();

    let kv_version = match non_empty(inputs, "kv_version") {
        Some(value) => KvVersion::parse(value)?,
        None => KvVersion::V2,
    };

    let version = match non_empty(inputs, "version") {
        Some(value) => Some(value.parse::<u64>().map_err(|_| {
            BrokerError::Configuration(format!("Invalid secret version: {}", value))
        })?),
        None => None,
    };

    Ok(StaticSecretRequest {
        mount: non_empty(inputs, "mount")
            .unwrap_or(DEFAULT_STATIC_MOUNT)
            .to_string(),
        path,
        kv_version,
        version,
        secret_key: non_empty(inputs, "secret_key").map(|s| s.to_string()),
    })
}

fn dynamic_request(inputs: &HashMap<String, String>) -> Result<DynamicSecretRequest, BrokerError> {
    let role = non_empty(inputs, "role_name")
        .ok_or_else(|| {
            BrokerError::Configuration("role_name is required for dynamic secrets".to_string())
        })?
        .to_string();

    let engine = match non_empty(inputs, "dynamic_engine") {
        Some(value) => SecretsEngine::parse(value)?,
        None => SecretsEngine::Generic,
    };

    Ok(DynamicSecretRequest {
        mount: non_empty(inputs, "mount")
            .unwrap_or(DEFAULT_DYNAMIC_MOUNT)
            .to_string(),
        role,
        ttl: non_empty(inputs, "ttl").map(|s| s.to_string()),
        engine,
        credential_field: non_empty(inputs, "credential_field").map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_ambiguous_config_never_reaches_network() {
        // No server exists at this address; a configuration error proves the
        // call was rejected before any connection attempt.
        let broker = VaultBroker::new();
        let err = broker
            .resolve(&inputs(&[
                ("url", "http://127.0.0.1:1"),
                ("token", "s.abc"),
                ("jwt", "eyJ"),
                ("jwt_role", "ci"),
                ("engine_type", "static"),
                ("secret_path", "app/config"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_secret_path_rejected() {
        let broker = VaultBroker::new();
        let err = broker
            .resolve(&inputs(&[
                ("url", "http://127.0.0.1:1"),
                ("token", "s.abc"),
                ("engine_type", "static"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_reference_without_source_rejected() {
        let broker = VaultBroker::new();
        let err = broker
            .resolve(&inputs(&[
                ("auth_credential_name", "prod-vault"),
                ("engine_type", "static"),
                ("secret_path", "app/config"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_reference_mixed_with_raw_material_rejected() {
        struct NoSource;
        #[async_trait]
        impl AuthConfigSource for NoSource {
            async fn lookup_auth(
                &self,
                _name: &str,
            ) -> Result<HashMap<String, String>, BrokerError> {
                unreachable!("lookup must not run for rejected input")
            }
        }

        let broker = VaultBroker::with_auth_source(Arc::new(NoSource));
        let err = broker
            .resolve(&inputs(&[
                ("auth_credential_name", "prod-vault"),
                ("token", "s.raw"),
                ("engine_type", "static"),
                ("secret_path", "app/config"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Configuration(_)));
    }

    #[test]
    fn test_static_request_defaults() {
        let request = static_request(&inputs(&[("secret_path", "app/db")])).unwrap();
        assert_eq!(request.mount, "secret");
        assert_eq!(request.kv_version, KvVersion::V2);
        assert!(request.version.is_none());
        assert!(request.secret_key.is_none());
    }

    #[test]
    fn test_dynamic_request_defaults() {
        let request = dynamic_request(&inputs(&[("role_name", "readonly")])).unwrap();
        assert_eq!(request.mount, "database");
        assert_eq!(request.engine, SecretsEngine::Generic);
        assert!(request.ttl.is_none());
    }

    #[test]
    fn test_invalid_version_rejected() {
        let err = static_request(&inputs(&[
            ("secret_path", "app/db"),
            ("version", "latest"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BrokerError::Configuration(_)));
    }
}
