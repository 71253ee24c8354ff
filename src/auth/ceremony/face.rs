use super::{CeremonyContext, CeremonyPhases};
use crate::auth::AuthError;
use crate::backend::{BackendError, VerifyResponse};
use crate::platform::{Camera, PlatformError, Scoped, StillEncoding, VideoConstraints};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const CAMERA_PROMPT: &str = "Please look at the camera...";

/// Single still frame after a fixed dwell. The backend issues no face
/// challenge, so that phase is empty.
pub(crate) struct FaceCeremony {
    camera: Arc<dyn Camera>,
    constraints: VideoConstraints,
    encoding: StillEncoding,
    dwell: Duration,
}

impl FaceCeremony {
    pub fn new(
        camera: Arc<dyn Camera>,
        constraints: VideoConstraints,
        encoding: StillEncoding,
        dwell: Duration,
    ) -> Self {
        Self {
            camera,
            constraints,
            encoding,
            dwell,
        }
    }
}

#[async_trait]
impl CeremonyPhases for FaceCeremony {
    type Challenge = ();
    /// `data:image/jpeg;base64,...`
    type Artifact = String;

    async fn challenge(&self, _ctx: &CeremonyContext<'_>) -> Result<(), AuthError> {
        Ok(())
    }

    async fn capture(&self, ctx: &CeremonyContext<'_>, _challenge: &()) -> Result<String, AuthError> {
        let stream = self
            .camera
            .open(self.constraints)
            .await
            .map_err(AuthError::CaptureCancelledOrFailed)?;
        let mut stream = Scoped::new(stream, "camera stream");

        ctx.session.progress(CAMERA_PROMPT);
        tokio::time::sleep(self.dwell).await;

        if !stream.is_live() {
            return Err(AuthError::CaptureCancelledOrFailed(PlatformError::StreamEnded));
        }

        let image = stream
            .capture_still(&self.encoding)
            .await
            .map_err(AuthError::CaptureCancelledOrFailed)?;
        drop(stream);

        log::debug!("Captured still: {} ({} bytes)", image.mime, image.bytes.len());
        Ok(image.to_data_url())
    }

    async fn verify(
        &self,
        ctx: &CeremonyContext<'_>,
        _challenge: (),
        face_data: String,
    ) -> Result<VerifyResponse, BackendError> {
        ctx.backend.face_verify(&face_data, ctx.auth_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::AuthErrorKind;
    use crate::auth::session::SessionCell;
    use crate::auth::{AuthType, SupportedMethod};
    use crate::testing::{FakeBackend, FakeCamera};

    fn ceremony(camera: Arc<FakeCamera>) -> FaceCeremony {
        FaceCeremony::new(
            camera,
            VideoConstraints::sized(640, 480),
            StillEncoding::jpeg(640, 480, 0.8),
            Duration::from_secs(3),
        )
    }

    fn started_session() -> SessionCell {
        let session = SessionCell::new();
        assert!(session.try_begin(SupportedMethod::FaceCapture));
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_after_dwell_releases_stream() {
        let backend = FakeBackend::new();
        let session = started_session();
        let camera = Arc::new(FakeCamera::new());
        let face = ceremony(camera.clone());
        let ctx = CeremonyContext {
            backend: &backend,
            session: &session,
            auth_type: AuthType::Login,
        };

        let started = tokio::time::Instant::now();
        let data_url = face.capture(&ctx, &()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(data_url.starts_with("data:image/jpeg;base64,"));

        assert_eq!(camera.captures(), 1);
        assert_eq!(camera.open_tracks(), 0);
        assert_eq!(camera.last_constraints(), Some(VideoConstraints::sized(640, 480)));
        assert_eq!(camera.last_encoding(), Some(StillEncoding::jpeg(640, 480, 0.8)));
        assert_eq!(session.snapshot().status_message, CAMERA_PROMPT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_error_releases_stream() {
        let backend = FakeBackend::new();
        let session = started_session();
        let camera = Arc::new(FakeCamera::failing_capture(PlatformError::Hardware(
            "encoder".to_string(),
        )));
        let ctx = CeremonyContext {
            backend: &backend,
            session: &session,
            auth_type: AuthType::Login,
        };

        let err = ceremony(camera.clone()).capture(&ctx, &()).await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::CaptureCancelledOrFailed);
        assert_eq!(camera.open_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_stream_skips_capture() {
        let backend = FakeBackend::new();
        let session = started_session();
        let camera = Arc::new(FakeCamera::ending());
        let ctx = CeremonyContext {
            backend: &backend,
            session: &session,
            auth_type: AuthType::Login,
        };

        let err = ceremony(camera.clone()).capture(&ctx, &()).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::CaptureCancelledOrFailed(PlatformError::StreamEnded)
        ));
        assert_eq!(camera.captures(), 0);
        assert_eq!(camera.open_tracks(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let backend = FakeBackend::new();
        let session = started_session();
        let camera = Arc::new(FakeCamera::denied());
        let ctx = CeremonyContext {
            backend: &backend,
            session: &session,
            auth_type: AuthType::Login,
        };

        let err = ceremony(camera.clone()).capture(&ctx, &()).await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::CaptureCancelledOrFailed);
        assert_eq!(camera.open_tracks(), 0);
    }
}
