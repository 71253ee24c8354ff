//! Device capability detection
//!
//! Probes each biometric API independently and concurrently. A failing probe
//! only removes its own method; nothing here surfaces an error to the user.

use crate::auth::SupportedMethod;
use crate::platform::{Platform, PlatformError, Scoped, VideoConstraints};
use async_trait::async_trait;
use serde::Serialize;

/// Answers "is this API usable here?" for each method
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn platform_credential(&self) -> Result<bool, PlatformError>;

    /// Must release anything it opens before returning
    async fn camera(&self) -> Result<bool, PlatformError>;

    async fn speech_recognition(&self) -> Result<bool, PlatformError>;
}

#[async_trait]
impl CapabilityProbe for Platform {
    async fn platform_credential(&self) -> Result<bool, PlatformError> {
        Ok(self.authenticator.is_some())
    }

    async fn camera(&self) -> Result<bool, PlatformError> {
        let Some(camera) = &self.camera else {
            return Ok(false);
        };
        let stream = camera.open(VideoConstraints::any()).await?;
        // Round trip only: release the tracks right away
        drop(Scoped::new(stream, "camera probe stream"));
        Ok(true)
    }

    async fn speech_recognition(&self) -> Result<bool, PlatformError> {
        Ok(self.recognizer.is_some())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Supported,
    Unsupported,
}

/// One probe's outcome
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProbeItem {
    pub method: SupportedMethod,
    pub status: ProbeStatus,
    pub message: String,
}

/// Result of capability detection, in display order
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CapabilityReport {
    pub items: Vec<ProbeItem>,
}

impl CapabilityReport {
    /// Methods that may be offered
    pub fn supported(&self) -> Vec<SupportedMethod> {
        self.items
            .iter()
            .filter(|item| item.status == ProbeStatus::Supported)
            .map(|item| item.method)
            .collect()
    }

    pub fn is_supported(&self, method: SupportedMethod) -> bool {
        self.items
            .iter()
            .any(|item| item.method == method && item.status == ProbeStatus::Supported)
    }
}

/// Run all probes concurrently
pub async fn detect_capabilities(probe: &dyn CapabilityProbe) -> CapabilityReport {
    log::info!("Detecting biometric capabilities...");

    let (credential, camera, speech) = tokio::join!(
        probe.platform_credential(),
        probe.camera(),
        probe.speech_recognition()
    );

    let items = vec![
        probe_item(SupportedMethod::PlatformCredential, credential),
        probe_item(SupportedMethod::FaceCapture, camera),
        probe_item(SupportedMethod::VoiceCapture, speech),
    ];
    let report = CapabilityReport { items };

    log::info!("Capability detection complete: {:?}", report.supported());
    report
}

fn probe_item(method: SupportedMethod, result: Result<bool, PlatformError>) -> ProbeItem {
    let (status, message) = match result {
        Ok(true) => (ProbeStatus::Supported, format!("{} available", method.label())),
        Ok(false) => (
            ProbeStatus::Unsupported,
            format!("{} not available on this device", method.label()),
        ),
        Err(e) => {
            log::debug!("{} probe failed: {}", method, e);
            (
                ProbeStatus::Unsupported,
                format!("{} unavailable: {}", method.label(), e),
            )
        }
    };

    ProbeItem {
        method,
        status,
        message,
    }
}
