//! Device collaborators used by the ceremonies
//!
//! Each hardware-backed API sits behind a trait so the coordinator can run
//! against real devices, the console, or scripted fakes:
//! - `PlatformAuthenticator`: public-key credential assertion
//! - `Camera` / `CameraStream`: video stream and still capture
//! - `SpeechRecognizer` / `RecognitionSession`: single-shot speech capture
//!
//! Streams and recognition sessions are `Releasable` and are only ever held
//! through [`Scoped`], which releases them on drop.

pub mod console;
pub mod scoped;

pub use scoped::{Releasable, Scoped};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Operation not allowed or cancelled by the user")]
    NotAllowed,

    #[error("No matching credential on this device")]
    NoCredential,

    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("Media stream ended before capture")]
    StreamEnded,

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("No speech was recognized")]
    NoSpeech,
}

// ===== Public-key credential assertion =====

/// Credential the server allows for this assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    pub id: Vec<u8>,
    #[serde(rename = "type", default = "default_credential_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

fn default_credential_type() -> String {
    "public-key".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
}

/// Options for one assertion, bound to a server challenge
#[derive(Debug, Clone)]
pub struct AssertionRequest {
    pub challenge: Vec<u8>,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: UserVerification,
    pub timeout: Duration,
}

/// Authenticator response fields, serialized the way the verifier expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    pub authenticator_data: Vec<u8>,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// Signed assertion produced by the platform authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub response: AssertionResponse,
    #[serde(rename = "type")]
    pub kind: String,
}

#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Ask the user to sign the challenge with an enrolled credential.
    /// Cancellation and "no matching credential" are both errors.
    async fn get_assertion(
        &self,
        request: AssertionRequest,
    ) -> Result<PublicKeyCredential, PlatformError>;
}

// ===== Camera =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl VideoConstraints {
    /// Any video track will do (capability probe)
    pub fn any() -> Self {
        Self {
            width: None,
            height: None,
        }
    }

    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Lossy still-image encoding request
#[derive(Debug, Clone, PartialEq)]
pub struct StillEncoding {
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
    pub quality: f32,
}

impl StillEncoding {
    pub fn jpeg(width: u32, height: u32, quality: f32) -> Self {
        Self {
            width,
            height,
            mime: "image/jpeg",
            quality,
        }
    }
}

/// Encoded still frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[async_trait]
pub trait Camera: Send + Sync {
    /// Acquire a live video stream. Denied permission is an error.
    async fn open(&self, constraints: VideoConstraints)
        -> Result<Box<dyn CameraStream>, PlatformError>;
}

/// Open camera stream. `release` stops every track and must be idempotent.
#[async_trait]
pub trait CameraStream: Releasable + Send {
    /// False once any track has ended
    fn is_live(&self) -> bool;

    /// Grab the current frame and encode it
    async fn capture_still(&mut self, encoding: &StillEncoding)
        -> Result<EncodedImage, PlatformError>;
}

// ===== Speech recognition =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub lang: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionOptions {
    /// One final result, no interim hypotheses
    pub fn single_shot(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            continuous: false,
            interim_results: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: Option<f32>,
}

/// Final recognition result, alternatives ordered best first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecognitionResult {
    pub alternatives: Vec<RecognitionAlternative>,
}

impl RecognitionResult {
    pub fn single(transcript: impl Into<String>) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence: None,
            }],
        }
    }

    pub fn top_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|alt| alt.transcript.as_str())
    }
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn start(
        &self,
        options: RecognitionOptions,
    ) -> Result<Box<dyn RecognitionSession>, PlatformError>;
}

/// Running recognition. `release` aborts it and must be idempotent.
#[async_trait]
pub trait RecognitionSession: Releasable + Send {
    /// Wait for the one final result
    async fn final_result(&mut self) -> Result<RecognitionResult, PlatformError>;
}

// ===== Platform bundle =====

/// Device APIs available to this process. A missing entry means the API
/// does not exist here.
#[derive(Clone, Default)]
pub struct Platform {
    pub authenticator: Option<Arc<dyn PlatformAuthenticator>>,
    pub camera: Option<Arc<dyn Camera>>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
}

impl Platform {
    /// No biometric APIs at all (servers, CI, headless terminals)
    pub fn headless() -> Self {
        Self::default()
    }

    /// Terminal session: transcripts are typed on stdin
    pub fn console() -> Self {
        Self {
            recognizer: Some(Arc::new(console::ConsoleRecognizer::new())),
            ..Self::default()
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn PlatformAuthenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }
}
