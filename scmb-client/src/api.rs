//! Thin wrapper over the appliance REST API.
//!
//! Adds the `X-API-Version` header to every request and the `Auth` session
//! header once a login has completed, and maps non-success responses to
//! [`ApiError::Api`] by decoding the appliance's standard error body.

use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// REST API version sent with every request.
pub const API_VERSION: &str = "800";

/// HTTP client bound to one appliance.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    auth: Option<String>,
}

/// Standard error body returned by the appliance.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ErrorBody {
    error_code: String,
    message: String,
}

impl ApiClient {
    /// Create a client for the given appliance address.
    ///
    /// A bare hostname is addressed over HTTPS; an explicit scheme
    /// (`http://...`) is used verbatim. `insecure` skips certificate
    /// verification for appliances presenting self-signed management
    /// certificates.
    pub fn new(server: &str, insecure: bool) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()?;
        let base = if server.contains("://") {
            server.trim_end_matches('/').to_string()
        } else {
            format!("https://{server}")
        };
        Ok(Self {
            http,
            base,
            auth: None,
        })
    }

    /// Attach the session ID sent as the `Auth` header from now on.
    pub(crate) fn set_auth(&mut self, session_id: String) {
        self.auth = Some(session_id);
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base, path))
            .header("X-API-Version", API_VERSION);
        if let Some(ref auth) = self.auth {
            req = req.header("Auth", auth);
        }
        req
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.request(Method::GET, path).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get_text(&self, path: &str) -> Result<String, ApiError> {
        let resp = self.request(Method::GET, path).send().await?;
        Ok(Self::check(resp).await?.text().await?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let resp = self.request(Method::DELETE, path).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Pass through success responses, decode everything else into
    /// [`ApiError::Api`].
    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = if parsed.message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            parsed.message
        };
        Err(ApiError::Api {
            status: status.as_u16(),
            code: parsed.error_code,
            message,
        })
    }
}
