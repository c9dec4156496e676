use thiserror::Error;

/// Closed error taxonomy for the broker.
///
/// Every failure surfaced by this crate maps to exactly one of these kinds;
/// unexpected transport-layer failures are wrapped into [`BrokerError::Unexpected`]
/// rather than propagated raw.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Malformed, ambiguous, or incomplete input. Never reaches the network.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login rejected by Vault, or a 403 on a data call (policy denial).
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// Transport failure (timeout, DNS, TLS) or a non-auth >=400 response.
    #[error("Vault connection error: {0}")]
    Connection(String),

    /// 404 from Vault, or a requested key/field absent from the response.
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// Anything escaping the transport layer that fits no other kind.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl BrokerError {
    /// Classify a reqwest error from an outbound call.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrokerError::Connection("Vault request timed out".to_string())
        } else if err.is_connect() {
            BrokerError::Connection(format!("Cannot connect to Vault: {}", err))
        } else if err.is_decode() {
            BrokerError::Unexpected(format!("Invalid response from Vault: {}", err))
        } else {
            BrokerError::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_does_not_decorate_kind() {
        let err = BrokerError::SecretNotFound("key 'password' not found".to_string());
        assert_eq!(err.to_string(), "Secret not found: key 'password' not found");
    }

    #[test]
    fn test_authentication_carries_status() {
        let err = BrokerError::Authentication {
            status: 403,
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("403"));
    }
}
