use crate::BrokerError;
use std::time::Duration;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client for one Vault call.
///
/// CA and client-certificate material stays in memory; nothing is written to
/// disk, and the TLS identity is dropped with the client after the call.
pub(crate) fn build_client(
    ca_cert_pem: Option<&str>,
    identity_pem: Option<&[u8]>,
) -> Result<reqwest::Client, BrokerError> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

    if let Some(ca_pem) = ca_cert_pem {
        let ca = reqwest::Certificate::from_pem(ca_pem.as_bytes())
            .map_err(|e| BrokerError::Configuration(format!("Invalid CA certificate: {}", e)))?;
        builder = builder.add_root_certificate(ca);
    }

    if let Some(pem) = identity_pem {
        let identity = reqwest::Identity::from_pem(pem).map_err(|e| {
            BrokerError::Configuration(format!("Invalid client certificate or key: {}", e))
        })?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| BrokerError::Unexpected(format!("Failed to build HTTP client: {}", e)))
}

/// Map a data-call response status to the error taxonomy.
///
/// 404 means the secret (or role) does not exist, 403 is a policy denial, and
/// everything else >=400 is surfaced as a connection-class failure with the
/// raw status and body.
pub(crate) async fn check_data_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, BrokerError> {
    let status = response.status().as_u16();
    match status {
        404 => Err(BrokerError::SecretNotFound(format!("{} not found", what))),
        403 => Err(BrokerError::Authentication {
            status,
            message: "Access denied - check Vault policies".to_string(),
        }),
        s if s >= 400 => {
            let body = response.text().await.unwrap_or_default();
            Err(BrokerError::Connection(format!(
                "Vault API error {}: {}",
                s, body
            )))
        }
        _ => Ok(response),
    }
}

/// Map a login-call response status: any non-2xx is an authentication failure.
pub(crate) async fn check_login_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, BrokerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let status = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(BrokerError::Authentication {
        status,
        message: body,
    })
}
