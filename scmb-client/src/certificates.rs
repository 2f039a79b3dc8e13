//! Message-bus certificate endpoints.
//!
//! The appliance issues an internally-signed client certificate for the bus
//! on request. Generation is asynchronous (a [`Task`]); requesting a
//! certificate that already exists is not an error and simply skips the
//! task.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::task::Task;

const GENERATE_PATH: &str = "/rest/certificates/client/rabbitmq";
const CA_PATH: &str = "/rest/certificates/ca";
const KEYPAIR_PATH: &str = "/rest/certificates/client/rabbitmq/keypair/default";

/// Error code the appliance uses when the client certificate was already
/// generated.
const CERT_EXISTS_CODE: &str = "RABBITMQ_CLIENTCERT_CONFLICT";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    r#type: &'a str,
    common_name: &'a str,
}

/// Request generation of the internally-signed bus client certificate.
///
/// Returns the generation task, or `None` when the certificate already
/// exists server-side (recovered, not an error).
pub async fn generate_client_certificate(api: &ApiClient) -> Result<Option<Task>, ApiError> {
    let body = GenerateRequest {
        r#type: "RabbitMqClientCertV2",
        common_name: "default",
    };
    match api.post_json::<_, Task>(GENERATE_PATH, &body).await {
        Ok(task) => Ok(Some(task)),
        Err(e) if is_already_exists(&e) => {
            tracing::debug!("client certificate already exists, skipping generation");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn is_already_exists(e: &ApiError) -> bool {
    matches!(e, ApiError::Api { status, code, .. } if *status == 409 || code == CERT_EXISTS_CODE)
}

/// Download the appliance CA bundle as PEM text.
pub async fn fetch_ca_bundle(api: &ApiClient) -> Result<String, ApiError> {
    api.get_text(CA_PATH).await
}

/// Client certificate and private key for the bus.
///
/// The appliance returns each field either as plain PEM or as base64-encoded
/// PEM, depending on version.
#[derive(Debug, Deserialize)]
pub struct ClientKeyPair {
    #[serde(rename = "base64SSLCertData")]
    cert_data: String,
    #[serde(rename = "base64SSLKeyData")]
    key_data: String,
}

impl ClientKeyPair {
    pub fn certificate(&self) -> Result<String, ApiError> {
        decode_pem_field(&self.cert_data)
    }

    pub fn private_key(&self) -> Result<String, ApiError> {
        decode_pem_field(&self.key_data)
    }
}

/// Download the bus client certificate/key pair.
pub async fn fetch_client_keypair(api: &ApiClient) -> Result<ClientKeyPair, ApiError> {
    api.get_json(KEYPAIR_PATH).await
}

fn decode_pem_field(data: &str) -> Result<String, ApiError> {
    let trimmed = data.trim();
    if trimmed.starts_with("-----BEGIN") {
        return Ok(trimmed.to_string());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(trimmed)
        .map_err(|e| ApiError::InvalidPem(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ApiError::InvalidPem(e.to_string()))
}
