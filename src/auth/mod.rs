//! Biometric authentication flow
//!
//! This module provides the coordinator that detects device capabilities,
//! runs one challenge → capture → verify ceremony at a time and reports the
//! outcome. Matching decisions are made by the backend only.

pub mod ceremony;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod session;

pub use coordinator::{AuthProps, BiometricAuthCoordinator, CeremonyOutcome, OfferedMethod};
pub use error::AuthError;
pub use policy::RetryPolicy;
pub use session::{AuthSession, AuthStatus};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Biometric method a device can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SupportedMethod {
    /// Platform public-key credential (fingerprint / Face ID sensor)
    #[serde(rename = "webauthn")]
    PlatformCredential,
    /// Single still frame from the camera
    #[serde(rename = "face")]
    FaceCapture,
    /// Spoken passphrase
    #[serde(rename = "voice")]
    VoiceCapture,
}

impl SupportedMethod {
    /// Every method, in display order
    pub const ALL: [SupportedMethod; 3] = [
        SupportedMethod::PlatformCredential,
        SupportedMethod::FaceCapture,
        SupportedMethod::VoiceCapture,
    ];

    /// Wire identifier used by the enrollment endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "webauthn",
            SupportedMethod::FaceCapture => "face",
            SupportedMethod::VoiceCapture => "voice",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "Fingerprint / Face ID",
            SupportedMethod::FaceCapture => "Face Recognition",
            SupportedMethod::VoiceCapture => "Voice Recognition",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "Use your device's built-in biometric sensor",
            SupportedMethod::FaceCapture => "Authenticate using facial recognition",
            SupportedMethod::VoiceCapture => "Authenticate using voice verification",
        }
    }

    /// Status message shown when a ceremony for this method begins
    pub fn starting_message(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "Initializing biometric authentication...",
            SupportedMethod::FaceCapture => "Starting face recognition...",
            SupportedMethod::VoiceCapture => "Starting voice recognition...",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "Authentication successful!",
            SupportedMethod::FaceCapture => "Face recognition successful!",
            SupportedMethod::VoiceCapture => "Voice recognition successful!",
        }
    }

    /// Shown for a backend "no match" and for transport failures during verify
    pub fn rejected_message(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "Authentication failed. Please try again.",
            SupportedMethod::FaceCapture => "Face not recognized. Please try again.",
            SupportedMethod::VoiceCapture => "Voice not recognized. Please try again.",
        }
    }

    /// Shown when the challenge or capture phase fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            SupportedMethod::PlatformCredential => "Authentication failed. Please try again.",
            SupportedMethod::FaceCapture => "Face recognition failed. Please try again.",
            SupportedMethod::VoiceCapture => "Voice recognition failed. Please try again.",
        }
    }
}

impl fmt::Display for SupportedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webauthn" => Ok(SupportedMethod::PlatformCredential),
            "face" => Ok(SupportedMethod::FaceCapture),
            "voice" => Ok(SupportedMethod::VoiceCapture),
            other => Err(format!(
                "Unknown method '{}', expected 'webauthn', 'face' or 'voice'",
                other
            )),
        }
    }
}

/// Purpose of the ceremony, passed through to the backend verbatim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    #[default]
    Login,
    Enroll,
    StepUp,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Login => "login",
            AuthType::Enroll => "enroll",
            AuthType::StepUp => "step-up",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "login" => Ok(AuthType::Login),
            "enroll" => Ok(AuthType::Enroll),
            "step-up" | "stepup" => Ok(AuthType::StepUp),
            other => Err(format!(
                "Unknown auth type '{}', expected 'login', 'enroll' or 'step-up'",
                other
            )),
        }
    }
}

/// Methods the user registered with the backend (display only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentRecord {
    methods: BTreeSet<SupportedMethod>,
}

impl EnrollmentRecord {
    /// Build from the identifiers returned by the enrollment endpoint.
    /// Unknown identifiers are skipped.
    pub fn from_wire<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut methods = BTreeSet::new();
        for id in identifiers {
            match id.as_ref().parse::<SupportedMethod>() {
                Ok(method) => {
                    methods.insert(method);
                }
                Err(_) => log::debug!("Ignoring unknown enrolled method: {}", id.as_ref()),
            }
        }
        Self { methods }
    }

    pub fn contains(&self, method: SupportedMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = SupportedMethod> + '_ {
        self.methods.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Display entry for an offered method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodOption {
    pub method: SupportedMethod,
    pub label: &'static str,
    pub description: &'static str,
    pub enrolled: bool,
}

/// Body of a successful verify response, handed to the success callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VerificationPayload(serde_json::Value);

impl VerificationPayload {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_identifiers() {
        for method in SupportedMethod::ALL {
            assert_eq!(method.as_str().parse::<SupportedMethod>().unwrap(), method);
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
        assert!("fingerprint".parse::<SupportedMethod>().is_err());
    }

    #[test]
    fn test_auth_type_wire_format() {
        assert_eq!(AuthType::default(), AuthType::Login);
        assert_eq!(serde_json::to_string(&AuthType::StepUp).unwrap(), "\"step-up\"");
        assert_eq!("enroll".parse::<AuthType>().unwrap(), AuthType::Enroll);
        assert!("admin".parse::<AuthType>().is_err());
    }

    #[test]
    fn test_enrollment_record_skips_unknown() {
        let record = EnrollmentRecord::from_wire(["face", "iris", "webauthn"]);
        assert!(record.contains(SupportedMethod::FaceCapture));
        assert!(record.contains(SupportedMethod::PlatformCredential));
        assert!(!record.contains(SupportedMethod::VoiceCapture));
        assert_eq!(record.methods().count(), 2);
    }

    #[test]
    fn test_messages_non_empty() {
        for method in SupportedMethod::ALL {
            assert!(!method.starting_message().is_empty());
            assert!(!method.success_message().is_empty());
            assert!(!method.rejected_message().is_empty());
            assert!(!method.failure_message().is_empty());
        }
    }
}
