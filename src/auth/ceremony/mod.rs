//! Per-method ceremonies
//!
//! Every method runs the same three phases: fetch a fresh challenge, capture
//! an artifact on the device, submit it for verification. [`Ceremony`] picks
//! the implementation for a method; [`run_phases`] sequences them.

mod credential;
mod face;
mod voice;

pub(crate) use credential::CredentialCeremony;
pub(crate) use face::FaceCeremony;
pub(crate) use voice::VoiceCeremony;

use super::session::SessionCell;
use super::{AuthError, AuthType, SupportedMethod, VerificationPayload};
use crate::backend::{AuthBackend, BackendError, VerifyResponse};
use crate::config::CeremonyConfig;
use crate::platform::Platform;
use async_trait::async_trait;

/// What a running ceremony may touch
pub(crate) struct CeremonyContext<'a> {
    pub backend: &'a dyn AuthBackend,
    pub session: &'a SessionCell,
    pub auth_type: AuthType,
}

#[async_trait]
pub(crate) trait CeremonyPhases: Send + Sync {
    /// Server value the capture is bound to
    type Challenge: Send + Sync;
    /// What the device produced
    type Artifact: Send;

    async fn challenge(&self, ctx: &CeremonyContext<'_>) -> Result<Self::Challenge, AuthError>;

    /// Hardware handles acquired here are released before returning
    async fn capture(
        &self,
        ctx: &CeremonyContext<'_>,
        challenge: &Self::Challenge,
    ) -> Result<Self::Artifact, AuthError>;

    async fn verify(
        &self,
        ctx: &CeremonyContext<'_>,
        challenge: Self::Challenge,
        artifact: Self::Artifact,
    ) -> Result<VerifyResponse, BackendError>;
}

/// Challenge → capture → verify
pub(crate) async fn run_phases<C: CeremonyPhases>(
    ceremony: &C,
    ctx: &CeremonyContext<'_>,
) -> Result<VerificationPayload, AuthError> {
    let challenge = ceremony.challenge(ctx).await?;
    let artifact = ceremony.capture(ctx, &challenge).await?;

    ctx.session.verifying();
    let response = ceremony
        .verify(ctx, challenge, artifact)
        .await
        .map_err(AuthError::TransportError)?;

    if response.success {
        Ok(VerificationPayload::new(response.body))
    } else {
        Err(AuthError::VerificationRejected)
    }
}

/// One ceremony, ready to run
pub(crate) enum Ceremony {
    Credential(CredentialCeremony),
    Face(FaceCeremony),
    Voice(VoiceCeremony),
}

impl Ceremony {
    /// Bind a method to its device collaborator. Fails if the platform does
    /// not provide one.
    pub fn for_method(
        method: SupportedMethod,
        platform: &Platform,
        config: &CeremonyConfig,
    ) -> Result<Self, AuthError> {
        let unsupported = || AuthError::CapabilityUnsupported { method };

        Ok(match method {
            SupportedMethod::PlatformCredential => {
                let authenticator = platform.authenticator.clone().ok_or_else(unsupported)?;
                Ceremony::Credential(CredentialCeremony::new(
                    authenticator,
                    config.credential_timeout(),
                ))
            }
            SupportedMethod::FaceCapture => {
                let camera = platform.camera.clone().ok_or_else(unsupported)?;
                Ceremony::Face(FaceCeremony::new(
                    camera,
                    config.face_constraints(),
                    config.face_encoding(),
                    config.face_dwell(),
                ))
            }
            SupportedMethod::VoiceCapture => {
                let recognizer = platform.recognizer.clone().ok_or_else(unsupported)?;
                Ceremony::Voice(VoiceCeremony::new(recognizer, config.recognition_options()))
            }
        })
    }

    pub fn method(&self) -> SupportedMethod {
        match self {
            Ceremony::Credential(_) => SupportedMethod::PlatformCredential,
            Ceremony::Face(_) => SupportedMethod::FaceCapture,
            Ceremony::Voice(_) => SupportedMethod::VoiceCapture,
        }
    }

    pub async fn run(&self, ctx: &CeremonyContext<'_>) -> Result<VerificationPayload, AuthError> {
        match self {
            Ceremony::Credential(ceremony) => run_phases(ceremony, ctx).await,
            Ceremony::Face(ceremony) => run_phases(ceremony, ctx).await,
            Ceremony::Voice(ceremony) => run_phases(ceremony, ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::AuthErrorKind;
    use crate::auth::AuthStatus;
    use crate::testing::{FakeAuthenticator, FakeBackend};
    use std::sync::Arc;

    #[test]
    fn test_missing_collaborator_is_unsupported() {
        let config = CeremonyConfig::default();
        for method in SupportedMethod::ALL {
            let err = Ceremony::for_method(method, &Platform::headless(), &config)
                .err()
                .unwrap();
            assert_eq!(err.kind(), AuthErrorKind::CapabilityUnsupported);
        }
    }

    #[test]
    fn test_dispatch_matches_method() {
        let platform =
            Platform::headless().with_authenticator(Arc::new(FakeAuthenticator::new()));
        let ceremony = Ceremony::for_method(
            SupportedMethod::PlatformCredential,
            &platform,
            &CeremonyConfig::default(),
        )
        .unwrap();
        assert_eq!(ceremony.method(), SupportedMethod::PlatformCredential);
    }

    #[tokio::test]
    async fn test_rejection_after_verifying() {
        let backend = FakeBackend::new().rejecting();
        let session = SessionCell::new();
        assert!(session.try_begin(SupportedMethod::PlatformCredential));

        let platform =
            Platform::headless().with_authenticator(Arc::new(FakeAuthenticator::new()));
        let ceremony = Ceremony::for_method(
            SupportedMethod::PlatformCredential,
            &platform,
            &CeremonyConfig::default(),
        )
        .unwrap();
        let ctx = CeremonyContext {
            backend: &backend,
            session: &session,
            auth_type: AuthType::Login,
        };

        let err = ceremony.run(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::VerificationRejected);
        assert_eq!(session.snapshot().status, AuthStatus::Verifying);
    }
}
