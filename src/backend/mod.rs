//! Remote verifier endpoints
//!
//! The backend issues challenges and decides match / no match. The client
//! only talks to it through [`AuthBackend`]; [`http::HttpAuthBackend`] is the
//! production implementation.

pub mod http;

pub use http::HttpAuthBackend;

use crate::auth::AuthType;
use crate::platform::{CredentialDescriptor, PublicKeyCredential};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENROLLED_PATH: &str = "api/auth/biometrics/enrolled";
pub const WEBAUTHN_CHALLENGE_PATH: &str = "api/auth/webauthn/challenge";
pub const WEBAUTHN_VERIFY_PATH: &str = "api/auth/webauthn/verify";
pub const FACE_VERIFY_PATH: &str = "api/auth/face/verify";
pub const VOICE_CHALLENGE_PATH: &str = "api/auth/voice/challenge";
pub const VOICE_VERIFY_PATH: &str = "api/auth/voice/verify";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Response of `POST /api/auth/webauthn/challenge`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialChallenge {
    pub challenge: Vec<u8>,
    #[serde(default)]
    pub allow_credentials: Vec<CredentialDescriptor>,
}

/// Response of `GET /api/auth/voice/challenge`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceChallenge {
    pub passphrase: String,
}

/// Any verify endpoint's response: `{ success, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResponse {
    pub success: bool,
    /// Entire response body, `success` included
    pub body: serde_json::Value,
}

impl VerifyResponse {
    /// A missing or non-boolean `success` counts as no match
    pub fn from_body(body: serde_json::Value) -> Self {
        let success = body
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        Self { success, body }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChallengeRequest {
    pub auth_type: AuthType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialVerifyRequest<'a> {
    pub credential: &'a PublicKeyCredential,
    pub auth_type: AuthType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FaceVerifyRequest<'a> {
    pub face_data: &'a str,
    pub auth_type: AuthType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceVerifyRequest<'a> {
    pub transcript: &'a str,
    pub passphrase: &'a str,
    pub auth_type: AuthType,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Wire identifiers of the methods the user has enrolled
    async fn enrolled_methods(&self) -> Result<Vec<String>, BackendError>;

    async fn webauthn_challenge(
        &self,
        auth_type: AuthType,
    ) -> Result<CredentialChallenge, BackendError>;

    async fn webauthn_verify(
        &self,
        credential: &PublicKeyCredential,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError>;

    /// `face_data` is a `data:` URL
    async fn face_verify(
        &self,
        face_data: &str,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError>;

    async fn voice_challenge(&self) -> Result<VoiceChallenge, BackendError>;

    async fn voice_verify(
        &self,
        transcript: &str,
        passphrase: &str,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError>;
}
