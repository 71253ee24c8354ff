use super::{CeremonyContext, CeremonyPhases};
use crate::auth::AuthError;
use crate::backend::{BackendError, CredentialChallenge, VerifyResponse};
use crate::platform::{
    AssertionRequest, PlatformAuthenticator, PublicKeyCredential, UserVerification,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const SENSOR_PROMPT: &str = "Please use your biometric sensor...";

/// Public-key credential assertion with required user verification
pub(crate) struct CredentialCeremony {
    authenticator: Arc<dyn PlatformAuthenticator>,
    timeout: Duration,
}

impl CredentialCeremony {
    pub fn new(authenticator: Arc<dyn PlatformAuthenticator>, timeout: Duration) -> Self {
        Self {
            authenticator,
            timeout,
        }
    }
}

#[async_trait]
impl CeremonyPhases for CredentialCeremony {
    type Challenge = CredentialChallenge;
    type Artifact = PublicKeyCredential;

    async fn challenge(&self, ctx: &CeremonyContext<'_>) -> Result<CredentialChallenge, AuthError> {
        ctx.backend
            .webauthn_challenge(ctx.auth_type)
            .await
            .map_err(AuthError::ChallengeUnavailable)
    }

    async fn capture(
        &self,
        ctx: &CeremonyContext<'_>,
        challenge: &CredentialChallenge,
    ) -> Result<PublicKeyCredential, AuthError> {
        ctx.session.progress(SENSOR_PROMPT);

        let request = AssertionRequest {
            challenge: challenge.challenge.clone(),
            allow_credentials: challenge.allow_credentials.clone(),
            user_verification: UserVerification::Required,
            timeout: self.timeout,
        };

        let credential = self
            .authenticator
            .get_assertion(request)
            .await
            .map_err(AuthError::CaptureCancelledOrFailed)?;
        log::debug!("Assertion received for credential {}", credential.id);
        Ok(credential)
    }

    async fn verify(
        &self,
        ctx: &CeremonyContext<'_>,
        _challenge: CredentialChallenge,
        credential: PublicKeyCredential,
    ) -> Result<VerifyResponse, BackendError> {
        ctx.backend.webauthn_verify(&credential, ctx.auth_type).await
    }
}
