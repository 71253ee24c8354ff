use crate::auth::{AuthType, RetryPolicy};
use crate::platform::{RecognitionOptions, StillEncoding, VideoConstraints};
use crate::validation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ceremony: CeremonyConfig,
    #[serde(default)]
    pub policy: RetryPolicy,
}

/// Where the verifier lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

/// Capture settings shared by all ceremonies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CeremonyConfig {
    /// Default purpose when the caller does not pass one
    pub auth_type: AuthType,
    /// How long the platform authenticator may wait for the user
    pub credential_timeout_ms: u64,
    /// Wait between opening the camera and grabbing the frame
    pub face_dwell_ms: u64,
    pub face_width: u32,
    pub face_height: u32,
    /// Lossy encoder quality (0.0, 1.0]
    pub face_quality: f32,
    pub voice_lang: String,
}

impl Default for CeremonyConfig {
    fn default() -> Self {
        Self {
            auth_type: AuthType::Login,
            credential_timeout_ms: 60_000,
            face_dwell_ms: 3_000,
            face_width: 640,
            face_height: 480,
            face_quality: 0.8,
            voice_lang: "en-US".to_string(),
        }
    }
}

impl CeremonyConfig {
    pub fn credential_timeout(&self) -> Duration {
        Duration::from_millis(self.credential_timeout_ms)
    }

    pub fn face_dwell(&self) -> Duration {
        Duration::from_millis(self.face_dwell_ms)
    }

    pub fn face_constraints(&self) -> VideoConstraints {
        VideoConstraints::sized(self.face_width, self.face_height)
    }

    pub fn face_encoding(&self) -> StillEncoding {
        StillEncoding::jpeg(self.face_width, self.face_height, self.face_quality)
    }

    pub fn recognition_options(&self) -> RecognitionOptions {
        RecognitionOptions::single_shot(self.voice_lang.clone())
    }
}

impl AppConfig {
    /// Load config from file or create default
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            config.validate()?;
            log::info!("Config loaded from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            log::info!("Default config created at: {}", path.display());
            Ok(config)
        }
    }

    /// Write config with owner-only permissions
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .context("Failed to set config file permissions")?;
        }

        Ok(())
    }

    /// Range-check every value
    pub fn validate(&self) -> Result<()> {
        validation::validate_base_url(&self.backend.base_url).context("backend.base_url")?;
        validation::validate_timeout_ms(self.backend.request_timeout_ms)
            .context("backend.request_timeout_ms")?;

        let ceremony = &self.ceremony;
        validation::validate_timeout_ms(ceremony.credential_timeout_ms)
            .context("ceremony.credential_timeout_ms")?;
        validation::validate_dwell_ms(ceremony.face_dwell_ms).context("ceremony.face_dwell_ms")?;
        validation::validate_dimension(ceremony.face_width).context("ceremony.face_width")?;
        validation::validate_dimension(ceremony.face_height).context("ceremony.face_height")?;
        validation::validate_image_quality(ceremony.face_quality)
            .context("ceremony.face_quality")?;
        validation::validate_lang_tag(&ceremony.voice_lang).context("ceremony.voice_lang")?;

        Ok(())
    }
}
