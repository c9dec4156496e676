mod dynamic;
mod static_kv;

pub use dynamic::{resolve_dynamic, DynamicSecretRequest, SecretsEngine, FULL_JSON_FIELD};
pub use static_kv::{resolve_static, KvVersion, StaticSecretRequest};

use std::collections::BTreeMap;

/// A resolved secret: either one requested value or a flat field mapping.
///
/// Never carries the auth token or any material beyond what was requested.
/// The ordered map keeps repeated resolutions byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSecret {
    Value(String),
    Fields(BTreeMap<String, String>),
}

impl ResolvedSecret {
    /// Flatten to the boundary output mapping. A single value is exposed
    /// under the `secret_value` key.
    pub fn into_outputs(self) -> BTreeMap<String, String> {
        match self {
            ResolvedSecret::Value(value) => {
                let mut outputs = BTreeMap::new();
                outputs.insert("secret_value".to_string(), value);
                outputs
            }
            ResolvedSecret::Fields(fields) => fields,
        }
    }
}

/// Render a JSON value for the flat output mapping: strings verbatim,
/// anything else as compact JSON.
pub(crate) fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a secret document into ordered string fields.
pub(crate) fn render_document(
    document: &serde_json::Map<String, serde_json::Value>,
) -> BTreeMap<String, String> {
    document
        .iter()
        .map(|(k, v)| (k.clone(), render_value(v)))
        .collect()
}

/// Sorted field names of a document, for diagnostics. Values are never
/// included.
pub(crate) fn field_names(document: &serde_json::Map<String, serde_json::Value>) -> Vec<&str> {
    let mut names: Vec<&str> = document.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();
    names
}
