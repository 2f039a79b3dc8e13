//! Error types for the control-plane client.

use thiserror::Error;

/// Errors from the appliance REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failure (connection, TLS, decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Login rejected by the appliance.
    #[error("login rejected: {0}")]
    Auth(String),

    /// The appliance answered with a non-success status.
    #[error("appliance error ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Certificate material that is neither PEM nor valid base64.
    #[error("malformed PEM payload: {0}")]
    InvalidPem(String),
}

/// Errors from the certificate provisioning flow.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The generation task never reached a terminal state.
    #[error("timed out waiting for certificate generation after {polls} polls")]
    Timeout { polls: u32 },

    /// The generation task finished in an error state.
    #[error("certificate generation failed: {message}")]
    TaskFailed { message: String },

    /// A credential file could not be written.
    #[error("failed to save {name}: {source}")]
    ArtifactWrite {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
