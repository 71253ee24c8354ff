//! reqwest-backed [`AuthBackend`]

use super::{
    AuthBackend, BackendError, ChallengeRequest, CredentialChallenge, CredentialVerifyRequest,
    FaceVerifyRequest, VerifyResponse, VoiceChallenge, VoiceVerifyRequest, ENROLLED_PATH,
    FACE_VERIFY_PATH, VOICE_CHALLENGE_PATH, VOICE_VERIFY_PATH, WEBAUTHN_CHALLENGE_PATH,
    WEBAUTHN_VERIFY_PATH,
};
use crate::auth::AuthType;
use crate::config::BackendConfig;
use crate::platform::PublicKeyCredential;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// JSON-over-HTTP client for the auth endpoints.
///
/// The bearer token is attached to every call except the voice challenge,
/// which the backend serves unauthenticated.
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpAuthBackend {
    pub fn new(config: &BackendConfig, token: Option<String>) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(&config.base_url)?;
        // Endpoint paths are relative; keep any prefix on the base
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        log::info!(
            "Auth backend: {} (token {})",
            base_url,
            if token.is_some() { "present" } else { "absent" }
        );

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        authenticated: bool,
    ) -> Result<RequestBuilder, BackendError> {
        let url = self.base_url.join(path)?;
        let request = self.client.request(method, url);

        Ok(match (&self.token, authenticated) {
            (Some(token), true) => request.bearer_auth(token),
            _ => request,
        })
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn verify(
        &self,
        path: &str,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<VerifyResponse, BackendError> {
        let request = self.request(Method::POST, path, true)?.json(body);
        let body: serde_json::Value = Self::send(request).await?;
        Ok(VerifyResponse::from_body(body))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn enrolled_methods(&self) -> Result<Vec<String>, BackendError> {
        let request = self.request(Method::GET, ENROLLED_PATH, true)?;
        Self::send(request).await
    }

    async fn webauthn_challenge(
        &self,
        auth_type: AuthType,
    ) -> Result<CredentialChallenge, BackendError> {
        let request = self
            .request(Method::POST, WEBAUTHN_CHALLENGE_PATH, true)?
            .json(&ChallengeRequest { auth_type });
        Self::send(request).await
    }

    async fn webauthn_verify(
        &self,
        credential: &PublicKeyCredential,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError> {
        self.verify(
            WEBAUTHN_VERIFY_PATH,
            &CredentialVerifyRequest {
                credential,
                auth_type,
            },
        )
        .await
    }

    async fn face_verify(
        &self,
        face_data: &str,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError> {
        self.verify(
            FACE_VERIFY_PATH,
            &FaceVerifyRequest {
                face_data,
                auth_type,
            },
        )
        .await
    }

    async fn voice_challenge(&self) -> Result<VoiceChallenge, BackendError> {
        let request = self.request(Method::GET, VOICE_CHALLENGE_PATH, false)?;
        Self::send(request).await
    }

    async fn voice_verify(
        &self,
        transcript: &str,
        passphrase: &str,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError> {
        self.verify(
            VOICE_VERIFY_PATH,
            &VoiceVerifyRequest {
                transcript,
                passphrase,
                auth_type,
            },
        )
        .await
    }
}
