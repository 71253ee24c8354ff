use super::{CeremonyContext, CeremonyPhases};
use crate::auth::AuthError;
use crate::backend::{BackendError, VerifyResponse, VoiceChallenge};
use crate::platform::{PlatformError, RecognitionOptions, Scoped, SpeechRecognizer};
use async_trait::async_trait;
use std::sync::Arc;

/// Spoken passphrase, one final recognition result
pub(crate) struct VoiceCeremony {
    recognizer: Arc<dyn SpeechRecognizer>,
    options: RecognitionOptions,
}

impl VoiceCeremony {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, options: RecognitionOptions) -> Self {
        Self {
            recognizer,
            options,
        }
    }
}

#[async_trait]
impl CeremonyPhases for VoiceCeremony {
    type Challenge = VoiceChallenge;
    /// Top transcript
    type Artifact = String;

    async fn challenge(&self, ctx: &CeremonyContext<'_>) -> Result<VoiceChallenge, AuthError> {
        ctx.backend
            .voice_challenge()
            .await
            .map_err(AuthError::ChallengeUnavailable)
    }

    async fn capture(
        &self,
        ctx: &CeremonyContext<'_>,
        challenge: &VoiceChallenge,
    ) -> Result<String, AuthError> {
        ctx.session
            .progress(format!("Please say: \"{}\"", challenge.passphrase));

        let session = self
            .recognizer
            .start(self.options.clone())
            .await
            .map_err(AuthError::CaptureCancelledOrFailed)?;
        let mut session = Scoped::new(session, "speech recognition");

        let result = session
            .final_result()
            .await
            .map_err(AuthError::CaptureCancelledOrFailed)?;
        drop(session);

        result
            .top_transcript()
            .map(str::to_string)
            .ok_or(AuthError::CaptureCancelledOrFailed(PlatformError::NoSpeech))
    }

    async fn verify(
        &self,
        ctx: &CeremonyContext<'_>,
        challenge: VoiceChallenge,
        transcript: String,
    ) -> Result<VerifyResponse, BackendError> {
        ctx.backend
            .voice_verify(&transcript, &challenge.passphrase, ctx.auth_type)
            .await
    }
}
