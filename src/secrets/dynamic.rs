use super::{field_names, render_document, render_value, ResolvedSecret};
use crate::auth::Session;
use crate::{http, BrokerError};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Sentinel `credential_field` value returning the complete document for any
/// engine.
pub const FULL_JSON_FIELD: &str = "full_json";

/// Secrets engine family, selecting the response projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsEngine {
    Database,
    Aws,
    Azure,
    Generic,
}

impl SecretsEngine {
    pub fn parse(value: &str) -> Result<Self, BrokerError> {
        match value {
            "database" => Ok(SecretsEngine::Database),
            "aws" => Ok(SecretsEngine::Aws),
            "azure" => Ok(SecretsEngine::Azure),
            "generic" => Ok(SecretsEngine::Generic),
            other => Err(BrokerError::Configuration(format!(
                "Unsupported dynamic engine: {}",
                other
            ))),
        }
    }
}

/// Request for an on-demand credential from a dynamic secrets engine.
#[derive(Debug, Clone)]
pub struct DynamicSecretRequest {
    pub mount: String,
    pub role: String,
    /// Generation TTL, e.g. "1h" or "30m". Forces a POST, since several
    /// engines only accept generation parameters in a request body.
    pub ttl: Option<String>,
    pub engine: SecretsEngine,
    /// For the generic engine: the single field to return. `full_json`
    /// returns the whole document regardless of engine.
    pub credential_field: Option<String>,
}

#[derive(Deserialize)]
struct CredsResponse {
    data: serde_json::Map<String, serde_json::Value>,
}

/// Generate a dynamic credential and project it into normalized field names.
pub async fn resolve_dynamic(
    session: &Session,
    request: &DynamicSecretRequest,
) -> Result<ResolvedSecret, BrokerError> {
    let url = format!(
        "{}/v1/{}/creds/{}",
        session.base_url, request.mount, request.role
    );

    tracing::debug!(role = %request.role, mount = %request.mount, "Generating dynamic credentials");

    let client = http::build_client(session.ca_cert_pem.as_deref(), None)?;
    let mut http_request = match &request.ttl {
        Some(ttl) => client
            .post(&url)
            .json(&serde_json::json!({ "ttl": ttl })),
        None => client.get(&url),
    };
    http_request = http_request.header("X-Vault-Token", &session.token);
    if let Some(ref namespace) = session.namespace {
        http_request = http_request.header("X-Vault-Namespace", namespace);
    }

    let response = http_request.send().await.map_err(BrokerError::transport)?;
    let response = http::check_data_status(
        response,
        &format!("Dynamic secret role '{}'", request.role),
    )
    .await?;

    let body: CredsResponse = response
        .json()
        .await
        .map_err(|e| BrokerError::Unexpected(format!("Invalid credentials response: {}", e)))?;

    project(request.engine, request.credential_field.as_deref(), &body.data)
}

/// Project an engine response document into the normalized output fields.
fn project(
    engine: SecretsEngine,
    credential_field: Option<&str>,
    data: &serde_json::Map<String, serde_json::Value>,
) -> Result<ResolvedSecret, BrokerError> {
    if credential_field == Some(FULL_JSON_FIELD) {
        return Ok(ResolvedSecret::Fields(render_document(data)));
    }

    match engine {
        SecretsEngine::Database => {
            let mut fields = BTreeMap::new();
            fields.insert("db_username".to_string(), require(data, "username")?);
            fields.insert("db_password".to_string(), require(data, "password")?);
            Ok(ResolvedSecret::Fields(fields))
        }
        SecretsEngine::Aws => {
            let mut fields = BTreeMap::new();
            fields.insert("aws_access_key".to_string(), require(data, "access_key")?);
            fields.insert("aws_secret_key".to_string(), require(data, "secret_key")?);
            if let Some(token) = data.get("security_token") {
                if !token.is_null() {
                    fields.insert("aws_session_token".to_string(), render_value(token));
                }
            }
            Ok(ResolvedSecret::Fields(fields))
        }
        SecretsEngine::Azure => {
            let mut fields = BTreeMap::new();
            fields.insert("arm_client_id".to_string(), require(data, "client_id")?);
            fields.insert(
                "arm_client_secret".to_string(),
                require(data, "client_secret")?,
            );
            fields.insert("arm_tenant_id".to_string(), require(data, "tenant_id")?);
            fields.insert(
                "arm_subscription_id".to_string(),
                require(data, "subscription_id")?,
            );
            Ok(ResolvedSecret::Fields(fields))
        }
        SecretsEngine::Generic => match credential_field {
            Some(field) => match data.get(field) {
                Some(value) => Ok(ResolvedSecret::Value(render_value(value))),
                None => Err(missing_field(field, data)),
            },
            None => Ok(ResolvedSecret::Fields(render_document(data))),
        },
    }
}

fn require(
    data: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<String, BrokerError> {
    data.get(field)
        .map(render_value)
        .ok_or_else(|| missing_field(field, data))
}

fn missing_field(
    field: &str,
    data: &serde_json::Map<String, serde_json::Value>,
) -> BrokerError {
    BrokerError::SecretNotFound(format!(
        "Field '{}' not found. Available fields: {:?}",
        field,
        field_names(data)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn test_database_projection() {
        let data = doc(serde_json::json!({"username": "v-user", "password": "v-pass"}));
        let resolved = project(SecretsEngine::Database, None, &data).unwrap();
        let outputs = resolved.into_outputs();
        assert_eq!(outputs["db_username"], "v-user");
        assert_eq!(outputs["db_password"], "v-pass");
    }

    #[test]
    fn test_aws_projection_with_session_token() {
        let data = doc(serde_json::json!({
            "access_key": "AK",
            "secret_key": "SK",
            "security_token": "ST"
        }));
        let resolved = project(SecretsEngine::Aws, None, &data).unwrap();
        let outputs = resolved.into_outputs();
        assert_eq!(outputs["aws_access_key"], "AK");
        assert_eq!(outputs["aws_secret_key"], "SK");
        assert_eq!(outputs["aws_session_token"], "ST");
    }

    #[test]
    fn test_aws_projection_without_session_token() {
        let data = doc(serde_json::json!({"access_key": "AK", "secret_key": "SK"}));
        let resolved = project(SecretsEngine::Aws, None, &data).unwrap();
        let outputs = resolved.into_outputs();
        assert!(!outputs.contains_key("aws_session_token"));
    }

    #[test]
    fn test_azure_projection() {
        let data = doc(serde_json::json!({
            "client_id": "cid",
            "client_secret": "cs",
            "tenant_id": "tid",
            "subscription_id": "sid"
        }));
        let outputs = project(SecretsEngine::Azure, None, &data)
            .unwrap()
            .into_outputs();
        assert_eq!(outputs["arm_client_id"], "cid");
        assert_eq!(outputs["arm_client_secret"], "cs");
        assert_eq!(outputs["arm_tenant_id"], "tid");
        assert_eq!(outputs["arm_subscription_id"], "sid");
    }

    #[test]
    fn test_missing_field_lists_available_names() {
        let data = doc(serde_json::json!({"username": "u"}));
        let err = project(SecretsEngine::Generic, Some("password"), &data).unwrap_err();
        match err {
            BrokerError::SecretNotFound(message) => {
                assert!(message.contains("password"));
                assert!(message.contains("username"));
            }
            other => panic!("expected SecretNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_engine_field() {
        let data = doc(serde_json::json!({"username": "u"}));
        let err = project(SecretsEngine::Database, None, &data).unwrap_err();
        assert!(matches!(err, BrokerError::SecretNotFound(_)));
    }

    #[test]
    fn test_full_json_sentinel_overrides_engine() {
        let data = doc(serde_json::json!({"username": "u", "password": "p", "ttl": 300}));
        let outputs = project(SecretsEngine::Database, Some(FULL_JSON_FIELD), &data)
            .unwrap()
            .into_outputs();
        assert_eq!(outputs["username"], "u");
        assert_eq!(outputs["ttl"], "300");
    }

    #[test]
    fn test_generic_single_field() {
        let data = doc(serde_json::json!({"username": "u", "password": "p"}));
        let resolved = project(SecretsEngine::Generic, Some("password"), &data).unwrap();
        assert_eq!(resolved, ResolvedSecret::Value("p".to_string()));
    }

    #[test]
    fn test_generic_full_document_when_no_field() {
        let data = doc(serde_json::json!({"username": "u", "password": "p"}));
        let outputs = project(SecretsEngine::Generic, None, &data)
            .unwrap()
            .into_outputs();
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn test_engine_parse() {
        assert_eq!(SecretsEngine::parse("aws").unwrap(), SecretsEngine::Aws);
        assert!(matches!(
            SecretsEngine::parse("gcp"),
            Err(BrokerError::Configuration(_))
        ));
    }
}
