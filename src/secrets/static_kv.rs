use super::{field_names, render_document, render_value, ResolvedSecret};
use crate::auth::Session;
use crate::{http, BrokerError};
use serde::Deserialize;

/// KV engine generation. The explicit discriminator drives both path
/// construction and response normalization; response shape is never sniffed,
/// so a v1 secret that happens to contain a `data` key stays unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvVersion {
    V1,
    V2,
}

impl KvVersion {
    /// Accepts both numeric (`"1"`/`"2"`) and prefixed (`"v1"`/`"v2"`)
    /// spellings.
    pub fn parse(value: &str) -> Result<Self, BrokerError> {
        match value {
            "1" | "v1" => Ok(KvVersion::V1),
            "2" | "v2" => Ok(KvVersion::V2),
            other => Err(BrokerError::Configuration(format!(
                "Unsupported kv_version: {}",
                other
            ))),
        }
    }
}

/// Request for a static KV secret.
#[derive(Debug, Clone)]
pub struct StaticSecretRequest {
    pub mount: String,
    pub path: String,
    pub kv_version: KvVersion,
    /// Historical version to read; only meaningful for KV v2.
    pub version: Option<u64>,
    /// When present, reduce the document to this single key.
    pub secret_key: Option<String>,
}

#[derive(Deserialize)]
struct KvV2Response {
    data: KvV2Data,
}

#[derive(Deserialize)]
struct KvV2Data {
    data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct KvV1Response {
    data: serde_json::Map<String, serde_json::Value>,
}

/// Fetch and normalize a static KV secret for an authenticated session.
pub async fn resolve_static(
    session: &Session,
    request: &StaticSecretRequest,
) -> Result<ResolvedSecret, BrokerError> {
    let url = match request.kv_version {
        KvVersion::V2 => format!(
            "{}/v1/{}/data/{}",
            session.base_url, request.mount, request.path
        ),
        KvVersion::V1 => format!("{}/v1/{}/{}", session.base_url, request.mount, request.path),
    };

    tracing::debug!(path = %request.path, mount = %request.mount, "Retrieving static secret");

    let client = http::build_client(session.ca_cert_pem.as_deref(), None)?;
    let mut http_request = client.get(&url).header("X-Vault-Token", &session.token);
    if let Some(ref namespace) = session.namespace {
        http_request = http_request.header("X-Vault-Namespace", namespace);
    }
    if request.kv_version == KvVersion::V2 {
        if let Some(version) = request.version {
            http_request = http_request.query(&[("version", version)]);
        }
    }

    let response = http_request.send().await.map_err(BrokerError::transport)?;
    let response =
        http::check_data_status(response, &format!("Static secret '{}'", request.path)).await?;

    let document = match request.kv_version {
        KvVersion::V2 => {
            let body: KvV2Response = response
                .json()
                .await
                .map_err(|e| BrokerError::Unexpected(format!("Invalid KV v2 response: {}", e)))?;
            body.data.data
        }
        KvVersion::V1 => {
            let body: KvV1Response = response
                .json()
                .await
                .map_err(|e| BrokerError::Unexpected(format!("Invalid KV v1 response: {}", e)))?;
            body.data
        }
    };

    match &request.secret_key {
        Some(key) => match document.get(key) {
            Some(value) => Ok(ResolvedSecret::Value(render_value(value))),
            None => Err(BrokerError::SecretNotFound(format!(
                "Key '{}' not found in secret; available keys: {:?}",
                key,
                field_names(&document)
            ))),
        },
        None => Ok(ResolvedSecret::Fields(render_document(&document))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_spellings() {
        assert_eq!(KvVersion::parse("1").unwrap(), KvVersion::V1);
        assert_eq!(KvVersion::parse("v1").unwrap(), KvVersion::V1);
        assert_eq!(KvVersion::parse("2").unwrap(), KvVersion::V2);
        assert_eq!(KvVersion::parse("v2").unwrap(), KvVersion::V2);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            KvVersion::parse("3"),
            Err(BrokerError::Configuration(_))
        ));
    }

    #[test]
    fn test_v2_response_double_nesting() {
        let json = r#"{"data": {"data": {"user": "a"}, "metadata": {"version": 1}}}"#;
        let body: KvV2Response = serde_json::from_str(json).unwrap();
        assert_eq!(body.data.data.get("user").unwrap(), "a");
    }

    #[test]
    fn test_v1_response_single_nesting() {
        let json = r#"{"data": {"user": "a"}}"#;
        let body: KvV1Response = serde_json::from_str(json).unwrap();
        assert_eq!(body.data.get("user").unwrap(), "a");
    }
}
