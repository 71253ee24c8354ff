//! Scripted collaborators for unit tests

use crate::auth::AuthType;
use crate::backend::{
    AuthBackend, BackendError, CredentialChallenge, VerifyResponse, VoiceChallenge,
};
use crate::capability::CapabilityProbe;
use crate::platform::{
    AssertionRequest, AssertionResponse, Camera, CameraStream, CredentialDescriptor,
    EncodedImage, PlatformAuthenticator, PlatformError, PublicKeyCredential, RecognitionOptions,
    RecognitionResult, RecognitionSession, Releasable, SpeechRecognizer, StillEncoding,
    VideoConstraints,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ===== Backend =====

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Enrolled,
    WebauthnChallenge(AuthType),
    WebauthnVerify {
        credential_id: String,
        auth_type: AuthType,
    },
    FaceVerify {
        face_data: String,
        auth_type: AuthType,
    },
    VoiceChallenge,
    VoiceVerify {
        transcript: String,
        passphrase: String,
        auth_type: AuthType,
    },
}

pub struct FakeBackend {
    calls: Mutex<Vec<BackendCall>>,
    enrolled: Option<Vec<String>>,
    enrollment_stalls: bool,
    challenges_fail: bool,
    passphrases: Mutex<VecDeque<String>>,
    verify_body: Mutex<Value>,
    verify_fails: bool,
    verify_delay: Option<Duration>,
}

impl FakeBackend {
    /// Everything enrolled, every verify succeeds
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            enrolled: Some(vec![
                "webauthn".to_string(),
                "face".to_string(),
                "voice".to_string(),
            ]),
            enrollment_stalls: false,
            challenges_fail: false,
            passphrases: Mutex::new(VecDeque::new()),
            verify_body: Mutex::new(json!({"success": true, "token": "jwt-test"})),
            verify_fails: false,
            verify_delay: None,
        }
    }

    pub fn with_enrolled<const N: usize>(mut self, methods: [&str; N]) -> Self {
        self.enrolled = Some(methods.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn enrollment_unavailable(mut self) -> Self {
        self.enrolled = None;
        self
    }

    /// The enrollment endpoint never answers
    pub fn stalling_enrollment(mut self) -> Self {
        self.enrollment_stalls = true;
        self
    }

    /// Voice challenges hand these out in order
    pub fn with_passphrases<const N: usize>(self, passphrases: [&str; N]) -> Self {
        *self.passphrases.lock().unwrap() = passphrases.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn failing_challenges(mut self) -> Self {
        self.challenges_fail = true;
        self
    }

    pub fn rejecting(self) -> Self {
        self.with_verify_body(json!({"success": false}))
    }

    pub fn with_verify_body(self, body: Value) -> Self {
        self.set_verify_body(body);
        self
    }

    pub fn set_verify_body(&self, body: Value) {
        *self.verify_body.lock().unwrap() = body;
    }

    pub fn failing_verify(mut self) -> Self {
        self.verify_fails = true;
        self
    }

    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn verify_response(&self) -> Result<VerifyResponse, BackendError> {
        if let Some(delay) = self.verify_delay {
            tokio::time::sleep(delay).await;
        }
        if self.verify_fails {
            return Err(BackendError::Status(502));
        }
        Ok(VerifyResponse::from_body(
            self.verify_body.lock().unwrap().clone(),
        ))
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn enrolled_methods(&self) -> Result<Vec<String>, BackendError> {
        self.record(BackendCall::Enrolled);
        if self.enrollment_stalls {
            std::future::pending::<()>().await;
        }
        self.enrolled.clone().ok_or(BackendError::Status(500))
    }

    async fn webauthn_challenge(
        &self,
        auth_type: AuthType,
    ) -> Result<CredentialChallenge, BackendError> {
        self.record(BackendCall::WebauthnChallenge(auth_type));
        if self.challenges_fail {
            return Err(BackendError::Status(503));
        }
        Ok(CredentialChallenge {
            challenge: vec![0xC4, 0xA1, 0x1E, 0x06],
            allow_credentials: vec![CredentialDescriptor {
                id: vec![1, 2, 3],
                kind: "public-key".to_string(),
                transports: vec!["internal".to_string()],
            }],
        })
    }

    async fn webauthn_verify(
        &self,
        credential: &PublicKeyCredential,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError> {
        self.record(BackendCall::WebauthnVerify {
            credential_id: credential.id.clone(),
            auth_type,
        });
        self.verify_response().await
    }

    async fn face_verify(
        &self,
        face_data: &str,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError> {
        self.record(BackendCall::FaceVerify {
            face_data: face_data.to_string(),
            auth_type,
        });
        self.verify_response().await
    }

    async fn voice_challenge(&self) -> Result<VoiceChallenge, BackendError> {
        self.record(BackendCall::VoiceChallenge);
        if self.challenges_fail {
            return Err(BackendError::Status(503));
        }
        let passphrase = self
            .passphrases
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "blue harbor seven".to_string());
        Ok(VoiceChallenge { passphrase })
    }

    async fn voice_verify(
        &self,
        transcript: &str,
        passphrase: &str,
        auth_type: AuthType,
    ) -> Result<VerifyResponse, BackendError> {
        self.record(BackendCall::VoiceVerify {
            transcript: transcript.to_string(),
            passphrase: passphrase.to_string(),
            auth_type,
        });
        self.verify_response().await
    }
}

// ===== Platform authenticator =====

pub struct FakeAuthenticator {
    result: Result<PublicKeyCredential, PlatformError>,
    requests: Mutex<Vec<AssertionRequest>>,
}

impl FakeAuthenticator {
    pub fn new() -> Self {
        Self {
            result: Ok(PublicKeyCredential {
                id: "cred-1".to_string(),
                raw_id: vec![1, 2, 3],
                response: AssertionResponse {
                    authenticator_data: vec![0x49, 0x96],
                    client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
                    signature: vec![0x30, 0x45],
                    user_handle: Some(vec![7]),
                },
                kind: "public-key".to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: PlatformError) -> Self {
        Self {
            result: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<AssertionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformAuthenticator for FakeAuthenticator {
    async fn get_assertion(
        &self,
        request: AssertionRequest,
    ) -> Result<PublicKeyCredential, PlatformError> {
        self.requests.lock().unwrap().push(request);
        self.result.clone()
    }
}

// ===== Camera =====

#[derive(Default)]
struct CameraCounters {
    opens: AtomicUsize,
    open_tracks: AtomicUsize,
    captures: AtomicUsize,
    constraints: Mutex<Option<VideoConstraints>>,
    encoding: Mutex<Option<StillEncoding>>,
}

pub struct FakeCamera {
    counters: Arc<CameraCounters>,
    denied: bool,
    capture_error: Option<PlatformError>,
    ends: bool,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            counters: Arc::default(),
            denied: false,
            capture_error: None,
            ends: false,
        }
    }

    /// Permission refused at open
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::new()
        }
    }

    pub fn failing_capture(error: PlatformError) -> Self {
        Self {
            capture_error: Some(error),
            ..Self::new()
        }
    }

    /// Tracks end right after opening
    pub fn ending() -> Self {
        Self {
            ends: true,
            ..Self::new()
        }
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn open_tracks(&self) -> usize {
        self.counters.open_tracks.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.counters.captures.load(Ordering::SeqCst)
    }

    pub fn last_constraints(&self) -> Option<VideoConstraints> {
        *self.counters.constraints.lock().unwrap()
    }

    pub fn last_encoding(&self) -> Option<StillEncoding> {
        self.counters.encoding.lock().unwrap().clone()
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn open(
        &self,
        constraints: VideoConstraints,
    ) -> Result<Box<dyn CameraStream>, PlatformError> {
        if self.denied {
            return Err(PlatformError::NotAllowed);
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.counters.open_tracks.fetch_add(1, Ordering::SeqCst);
        *self.counters.constraints.lock().unwrap() = Some(constraints);

        Ok(Box::new(FakeStream {
            counters: self.counters.clone(),
            live: !self.ends,
            released: false,
            capture_error: self.capture_error.clone(),
        }))
    }
}

struct FakeStream {
    counters: Arc<CameraCounters>,
    live: bool,
    released: bool,
    capture_error: Option<PlatformError>,
}

impl Releasable for FakeStream {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.open_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl CameraStream for FakeStream {
    fn is_live(&self) -> bool {
        self.live && !self.released
    }

    async fn capture_still(
        &mut self,
        encoding: &StillEncoding,
    ) -> Result<EncodedImage, PlatformError> {
        self.counters.captures.fetch_add(1, Ordering::SeqCst);
        *self.counters.encoding.lock().unwrap() = Some(encoding.clone());
        if let Some(error) = &self.capture_error {
            return Err(error.clone());
        }
        Ok(EncodedImage {
            mime: encoding.mime.to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        })
    }
}

// ===== Speech recognition =====

pub struct FakeRecognizer {
    result: Option<Result<RecognitionResult, PlatformError>>,
    active: Arc<AtomicUsize>,
    options: Mutex<Option<RecognitionOptions>>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::with_result(RecognitionResult::single("blue harbor seven"))
    }

    pub fn with_result(result: RecognitionResult) -> Self {
        Self {
            result: Some(Ok(result)),
            active: Arc::default(),
            options: Mutex::new(None),
        }
    }

    pub fn failing(error: PlatformError) -> Self {
        Self {
            result: Some(Err(error)),
            ..Self::new()
        }
    }

    /// Never produces a final result
    pub fn hanging() -> Self {
        Self {
            result: None,
            ..Self::new()
        }
    }

    /// Sessions started and not yet released
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<RecognitionOptions> {
        self.options.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start(
        &self,
        options: RecognitionOptions,
    ) -> Result<Box<dyn RecognitionSession>, PlatformError> {
        *self.options.lock().unwrap() = Some(options);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRecognition {
            result: self.result.clone(),
            active: self.active.clone(),
            released: false,
        }))
    }
}

struct FakeRecognition {
    result: Option<Result<RecognitionResult, PlatformError>>,
    active: Arc<AtomicUsize>,
    released: bool,
}

impl Releasable for FakeRecognition {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RecognitionSession for FakeRecognition {
    async fn final_result(&mut self) -> Result<RecognitionResult, PlatformError> {
        match &self.result {
            Some(result) => result.clone(),
            None => std::future::pending().await,
        }
    }
}

// ===== Capability probe =====

pub struct FakeProbe {
    pub credential: Result<bool, PlatformError>,
    pub camera: Result<bool, PlatformError>,
    pub speech: Result<bool, PlatformError>,
}

#[async_trait]
impl CapabilityProbe for FakeProbe {
    async fn platform_credential(&self) -> Result<bool, PlatformError> {
        self.credential.clone()
    }

    async fn camera(&self) -> Result<bool, PlatformError> {
        self.camera.clone()
    }

    async fn speech_recognition(&self) -> Result<bool, PlatformError> {
        self.speech.clone()
    }
}
