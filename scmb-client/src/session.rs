//! Control-plane login sessions.
//!
//! A [`Session`] is the exclusive owner of an authenticated [`ApiClient`].
//! It is short-lived and API-scoped: provisioning consumes it and logs out
//! before the long-lived bus connection is opened.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::ApiError;

const LOGIN_PATH: &str = "/rest/login-sessions";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionID")]
    session_id: String,
}

/// An authenticated control-plane session.
#[derive(Debug)]
pub struct Session {
    api: ApiClient,
}

impl Session {
    /// Log in to the appliance and return the authenticated session.
    ///
    /// A rejection from the appliance surfaces as [`ApiError::Auth`];
    /// transport failures keep their own variant.
    pub async fn login(
        server: &str,
        username: &str,
        password: &str,
        insecure: bool,
    ) -> Result<Self, ApiError> {
        let mut api = ApiClient::new(server, insecure)?;
        let body = LoginRequest {
            user_name: username,
            password,
        };
        let resp: LoginResponse = api.post_json(LOGIN_PATH, &body).await.map_err(|e| match e {
            ApiError::Api { message, .. } => ApiError::Auth(message),
            other => other,
        })?;
        api.set_auth(resp.session_id);
        tracing::debug!(server, "logged in to the appliance");
        Ok(Self { api })
    }

    /// The authenticated API client backing this session.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Release the session on the appliance. Consumes the handle so a
    /// session cannot be used, or logged out, twice.
    pub async fn logout(self) -> Result<(), ApiError> {
        self.api.delete(LOGIN_PATH).await
    }
}
