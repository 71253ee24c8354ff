/**
 * Input Validation Module
 *
 * Centralized validation for configuration values and CLI inputs.
 * Rejects malformed URLs, out-of-range capture settings, and tokens that
 * cannot be carried in an HTTP header.
 */
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Value too long: max {max}, got {actual}")]
    ValueTooLong { max: usize, actual: usize },
}

/// Validate backend base URL (http or https, with a host)
pub fn validate_base_url(raw: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl(format!(
            "Scheme must be http or https, got '{}'",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("URL has no host".to_string()));
    }

    Ok(parsed)
}

/// Validate lossy image quality (0.0 exclusive to 1.0 inclusive)
pub fn validate_image_quality(quality: f32) -> Result<f32, ValidationError> {
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(ValidationError::InvalidRange(format!(
            "Image quality must be in (0.0, 1.0], got {}",
            quality
        )));
    }
    Ok(quality)
}

/// Validate face dwell interval in milliseconds (0ms to 30000ms)
pub fn validate_dwell_ms(dwell_ms: u64) -> Result<u64, ValidationError> {
    if dwell_ms > 30_000 {
        return Err(ValidationError::InvalidRange(format!(
            "Dwell must be between 0ms and 30000ms, got {}ms",
            dwell_ms
        )));
    }
    Ok(dwell_ms)
}

/// Validate capture dimension in pixels (1 to 4096)
pub fn validate_dimension(pixels: u32) -> Result<u32, ValidationError> {
    if !(1..=4096).contains(&pixels) {
        return Err(ValidationError::InvalidRange(format!(
            "Dimension must be between 1px and 4096px, got {}px",
            pixels
        )));
    }
    Ok(pixels)
}

/// Validate a request or ceremony timeout in milliseconds (1ms to 300000ms)
pub fn validate_timeout_ms(timeout_ms: u64) -> Result<u64, ValidationError> {
    if !(1..=300_000).contains(&timeout_ms) {
        return Err(ValidationError::InvalidRange(format!(
            "Timeout must be between 1ms and 300000ms, got {}ms",
            timeout_ms
        )));
    }
    Ok(timeout_ms)
}

/// Validate a recognition language tag such as `en-US`
pub fn validate_lang_tag(tag: &str) -> Result<String, ValidationError> {
    if tag.len() < 2 || tag.len() > 35 {
        return Err(ValidationError::InvalidFormat(format!(
            "Language tag must be 2-35 characters, got '{}'",
            tag
        )));
    }

    let well_formed = tag
        .split('-')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if !well_formed {
        return Err(ValidationError::InvalidFormat(format!(
            "Language tag '{}' must be alphanumeric subtags separated by '-'",
            tag
        )));
    }

    Ok(tag.to_string())
}

/// Validate bearer token (non-empty, header-safe, max 4096 chars)
pub fn validate_bearer_token(token: &str) -> Result<String, ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::InvalidFormat(
            "Token cannot be empty".to_string(),
        ));
    }

    if token.len() > 4096 {
        return Err(ValidationError::ValueTooLong {
            max: 4096,
            actual: token.len(),
        });
    }

    if !token.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat(
            "Token contains whitespace, control or non-ASCII characters".to_string(),
        ));
    }

    Ok(token.to_string())
}
