// src/connection/auth.rs
//
// HTTP side of the handshake: credential login and the out-of-band
// one-time-code verify endpoint. The venue hands back either a session id
// (ssid) the socket authenticates with, or a challenge token that must be
// exchanged together with the operator-supplied code.

use crate::errors::AuthError;
use crate::models::Credentials;
use crate::traits::{AuthFlow, LoginOutcome};
use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpAuth {
    http_client: reqwest::Client,
    login_url: String,
    verify_url: String,
}

impl HttpAuth {
    pub fn new(login_url: impl Into<String>, verify_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            login_url: login_url.into(),
            verify_url: verify_url.into(),
        }
    }
}

/// Login response body. Exactly one of `ssid` / `token` is present; a
/// missing ssid with `code = "verify"` means a one-time code is required.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    ssid: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    ssid: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl AuthFlow for HttpAuth {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let body = json!({
            "identifier": credentials.identifier,
            "password": credentials.secret,
        });

        let response = self
            .http_client
            .post(&self.login_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Endpoint(e.to_string()))?;

        let status = response.status();
        let parsed: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Endpoint(format!("bad login response: {e}")))?;

        if let Some(ssid) = parsed.ssid {
            info!("login accepted, session issued");
            return Ok(LoginOutcome::Session { ssid });
        }
        if let Some(token) = parsed.token {
            info!("login challenged: one-time code required");
            return Ok(LoginOutcome::CodeRequired { token });
        }
        if status.as_u16() == 401 || parsed.code.as_deref() == Some("invalid_credentials") {
            // The message from the venue never includes the submitted values.
            return Err(AuthError::CredentialsRejected(
                parsed.message.unwrap_or_else(|| "invalid credentials".into()),
            ));
        }
        Err(AuthError::Endpoint(format!(
            "unexpected login response (status {status})"
        )))
    }

    async fn verify(&self, token: &str, code: &str) -> Result<String, AuthError> {
        let body = json!({ "token": token, "code": code });

        let response = self
            .http_client
            .post(&self.verify_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Endpoint(e.to_string()))?;

        let status = response.status();
        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Endpoint(format!("bad verify response: {e}")))?;

        if let Some(ssid) = parsed.ssid {
            info!("verification code accepted");
            return Ok(ssid);
        }
        if status.as_u16() == 400 || parsed.code.as_deref() == Some("invalid_code") {
            return Err(AuthError::CodeRejected);
        }
        Err(AuthError::Endpoint(
            parsed
                .message
                .unwrap_or_else(|| format!("unexpected verify response (status {status})")),
        ))
    }
}
