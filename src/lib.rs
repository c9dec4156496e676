//! vault-broker - credential broker for HashiCorp Vault
//!
//! Resolves externally stored secrets on behalf of a calling system:
//! - Pluggable authentication (static token, AppRole, JWT, client
//!   certificate) with exactly-one-method validation and per-role token
//!   caching at 90% of the granted lease.
//! - Static KV secrets with explicit v1/v2 semantics.
//! - Dynamic credentials (database, AWS, Azure, generic engines) projected
//!   into normalized field names.
//!
//! The boundary is flat: [`VaultBroker::resolve`] takes a string-keyed input
//! mapping and returns a string-keyed output mapping suitable for injection
//! into environment variables. `engine_type` selects `static` (the default)
//! or `dynamic` resolution; `auth_credential_name` switches authentication to
//! a stored configuration resolved through an [`AuthConfigSource`].
//!
//! Errors form a closed taxonomy ([`BrokerError`]); the broker never retries
//! and never logs or echoes secret values.

mod broker;
mod config;
mod error;
mod http;

pub mod auth;
pub mod secrets;

pub use broker::{AuthConfigSource, VaultBroker};
pub use config::{AuthConfig, AuthMethod};
pub use error::BrokerError;

pub use auth::{Authenticator, Session};
pub use secrets::{
    resolve_dynamic, resolve_static, DynamicSecretRequest, KvVersion, ResolvedSecret,
    SecretsEngine, StaticSecretRequest, FULL_JSON_FIELD,
};
