use super::SupportedMethod;
use crate::backend::BackendError;
use crate::platform::PlatformError;
use serde::Serialize;
use thiserror::Error;

/// Why a ceremony did not end in success.
///
/// None of these escape the coordinator; they are logged and turned into a
/// status message, after which the session is ready for another attempt.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{method} is not supported on this device")]
    CapabilityUnsupported { method: SupportedMethod },

    #[error("Challenge unavailable: {0}")]
    ChallengeUnavailable(#[source] BackendError),

    #[error("Capture cancelled or failed: {0}")]
    CaptureCancelledOrFailed(#[source] PlatformError),

    #[error("Verification rejected by server")]
    VerificationRejected,

    #[error("Transport error during verification: {0}")]
    TransportError(#[source] BackendError),
}

/// Stable identifier for an [`AuthError`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    CapabilityUnsupported,
    ChallengeUnavailable,
    CaptureCancelledOrFailed,
    VerificationRejected,
    TransportError,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::CapabilityUnsupported { .. } => AuthErrorKind::CapabilityUnsupported,
            AuthError::ChallengeUnavailable(_) => AuthErrorKind::ChallengeUnavailable,
            AuthError::CaptureCancelledOrFailed(_) => AuthErrorKind::CaptureCancelledOrFailed,
            AuthError::VerificationRejected => AuthErrorKind::VerificationRejected,
            AuthError::TransportError(_) => AuthErrorKind::TransportError,
        }
    }

    /// Message shown to the user for this failure.
    ///
    /// Transport failures during verify read exactly like a rejection so the
    /// client never reveals whether matching ran.
    pub fn user_message(&self, method: SupportedMethod) -> &'static str {
        match self {
            AuthError::VerificationRejected | AuthError::TransportError(_) => {
                method.rejected_message()
            }
            AuthError::CapabilityUnsupported { .. }
            | AuthError::ChallengeUnavailable(_)
            | AuthError::CaptureCancelledOrFailed(_) => method.failure_message(),
        }
    }
}
