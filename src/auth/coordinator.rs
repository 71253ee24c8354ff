//! The coordinator: capability detection, method selection, one ceremony at
//! a time, outcome reporting.

use super::ceremony::{Ceremony, CeremonyContext};
use super::error::{AuthError, AuthErrorKind};
use super::policy::{FailureTracker, RetryPolicy, LOCKOUT_MESSAGE};
use super::session::{AuthSession, SessionCell};
use super::{AuthType, EnrollmentRecord, MethodOption, SupportedMethod, VerificationPayload};
use crate::backend::AuthBackend;
use crate::capability::{detect_capabilities, CapabilityProbe, CapabilityReport};
use crate::config::CeremonyConfig;
use crate::platform::Platform;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

/// Called with the verify response body after a successful ceremony
pub type SuccessCallback = Box<dyn Fn(VerificationPayload) + Send + Sync>;

/// Caller-supplied inputs
pub struct AuthProps {
    pub auth_type: AuthType,
    pub on_auth_success: SuccessCallback,
}

impl AuthProps {
    pub fn new(on_auth_success: impl Fn(VerificationPayload) + Send + Sync + 'static) -> Self {
        Self {
            auth_type: AuthType::default(),
            on_auth_success: Box::new(on_auth_success),
        }
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }
}

/// A method this coordinator offered. Only obtainable from
/// [`BiometricAuthCoordinator::offered_methods`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferedMethod {
    method: SupportedMethod,
}

impl OfferedMethod {
    pub fn method(&self) -> SupportedMethod {
        self.method
    }
}

/// How an `authenticate` call ended
#[derive(Debug, Clone, PartialEq)]
pub enum CeremonyOutcome {
    Succeeded(VerificationPayload),
    Failed(AuthErrorKind),
    /// Failure limit reached; no ceremony ran
    LockedOut,
    /// Another ceremony or the probe is in flight, or the session already
    /// succeeded
    Ignored,
    /// Unmounted before or during the ceremony
    Cancelled,
}

pub struct BiometricAuthCoordinator {
    backend: Arc<dyn AuthBackend>,
    platform: Platform,
    probe: Arc<dyn CapabilityProbe>,
    config: CeremonyConfig,
    policy: RetryPolicy,
    auth_type: AuthType,
    on_auth_success: SuccessCallback,
    session: SessionCell,
    failures: FailureTracker,
    capabilities: OnceLock<CapabilityReport>,
    enrollment: OnceLock<EnrollmentRecord>,
    unmounted: watch::Sender<bool>,
}

impl BiometricAuthCoordinator {
    pub fn new(backend: Arc<dyn AuthBackend>, platform: Platform, props: AuthProps) -> Self {
        let (unmounted, _) = watch::channel(false);
        Self {
            backend,
            probe: Arc::new(platform.clone()),
            platform,
            config: CeremonyConfig::default(),
            policy: RetryPolicy::default(),
            auth_type: props.auth_type,
            on_auth_success: props.on_auth_success,
            session: SessionCell::new(),
            failures: FailureTracker::default(),
            capabilities: OnceLock::new(),
            enrollment: OnceLock::new(),
            unmounted,
        }
    }

    /// Replace the default probe (the platform itself)
    pub fn with_probe(mut self, probe: Arc<dyn CapabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_config(mut self, config: CeremonyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Detect capabilities and fetch enrollment concurrently. The session goes
    /// ready as soon as the probes finish; enrollment is display-only and
    /// fills in whenever the backend answers. Resolves once both have settled
    /// or on unmount. Runs once; later calls are no-ops.
    pub async fn mount(&self) {
        if self.is_unmounted() || self.capabilities.get().is_some() {
            return;
        }
        if !self.session.begin_probing() {
            log::debug!("Mount ignored: session is {:?}", self.session.snapshot().status);
            return;
        }

        let detect = async {
            let report = detect_capabilities(self.probe.as_ref()).await;
            let _ = self.capabilities.set(report);
            self.session.ready();
            log::info!(
                "Biometric auth ready: {} method(s) offered",
                self.offered_methods().len()
            );
        };
        let enroll = async {
            let record = self.fetch_enrollment().await;
            log::debug!("Enrollment record loaded: {:?}", record);
            let _ = self.enrollment.set(record);
        };

        tokio::select! {
            biased;
            _ = self.wait_unmounted() => {
                log::info!("Unmounted during mount");
            }
            _ = async { tokio::join!(detect, enroll) } => {}
        }
    }

    async fn fetch_enrollment(&self) -> EnrollmentRecord {
        match self.backend.enrolled_methods().await {
            Ok(methods) => EnrollmentRecord::from_wire(methods),
            Err(e) => {
                log::warn!("Failed to fetch enrolled methods: {}", e);
                EnrollmentRecord::default()
            }
        }
    }

    /// Methods the user may pick. Empty until mounted.
    pub fn offered_methods(&self) -> Vec<OfferedMethod> {
        self.capabilities
            .get()
            .map(|report| {
                report
                    .supported()
                    .into_iter()
                    .map(|method| OfferedMethod { method })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Display entries for the offered methods
    pub fn method_options(&self) -> Vec<MethodOption> {
        let enrollment = self.enrollment();
        self.offered_methods()
            .into_iter()
            .map(|offered| MethodOption {
                method: offered.method,
                label: offered.method.label(),
                description: offered.method.description(),
                enrolled: enrollment.map(|e| e.contains(offered.method)).unwrap_or(false),
            })
            .collect()
    }

    pub fn capability_report(&self) -> Option<&CapabilityReport> {
        self.capabilities.get()
    }

    pub fn enrollment(&self) -> Option<&EnrollmentRecord> {
        self.enrollment.get()
    }

    pub fn session(&self) -> AuthSession {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
        self.session.subscribe()
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failures.count()
    }

    fn is_offered(&self, method: SupportedMethod) -> bool {
        self.capabilities
            .get()
            .map(|report| report.is_supported(method))
            .unwrap_or(false)
    }

    /// Run one ceremony for an offered method.
    ///
    /// A start while another ceremony or the probe is in flight, or after a
    /// success, is a no-op returning [`CeremonyOutcome::Ignored`].
    pub async fn authenticate(&self, offered: OfferedMethod) -> CeremonyOutcome {
        let method = offered.method;

        if self.is_unmounted() {
            return CeremonyOutcome::Cancelled;
        }
        if !self.is_offered(method) {
            log::warn!("Ignoring start of {}: not offered by this coordinator", method);
            return CeremonyOutcome::Ignored;
        }
        if self.policy.is_locked_out(self.failures.count()) {
            log::warn!("Ignoring start of {}: too many failed attempts", method);
            return CeremonyOutcome::LockedOut;
        }
        if !self.session.try_begin(method) {
            log::debug!(
                "Ignoring start of {}: session is {:?}",
                method,
                self.session.snapshot().status
            );
            return CeremonyOutcome::Ignored;
        }

        let ceremony = match Ceremony::for_method(method, &self.platform, &self.config) {
            Ok(ceremony) => ceremony,
            Err(e) => {
                // Nothing ran, so this does not count toward the lockout
                log::warn!("Cannot start {} ceremony: {}", method, e);
                self.session.failed(e.user_message(method));
                return CeremonyOutcome::Failed(e.kind());
            }
        };
        log::info!("Starting {} ceremony ({})", ceremony.method(), self.auth_type);

        let ctx = CeremonyContext {
            backend: self.backend.as_ref(),
            session: &self.session,
            auth_type: self.auth_type,
        };

        let result = tokio::select! {
            biased;
            _ = self.wait_unmounted() => None,
            result = ceremony.run(&ctx) => Some(result),
        };

        // The callback must never run once unmounted, even if verify won the race
        let result = match result {
            Some(result) if !self.is_unmounted() => result,
            _ => {
                log::info!("{} ceremony cancelled by unmount", method);
                self.session.discard();
                return CeremonyOutcome::Cancelled;
            }
        };

        match result {
            Ok(payload) => self.succeed(method, payload),
            Err(e) => self.fail(method, e),
        }
    }

    fn succeed(&self, method: SupportedMethod, payload: VerificationPayload) -> CeremonyOutcome {
        log::info!("{} ceremony succeeded", method);
        self.failures.reset();
        self.session.succeeded(method.success_message());
        (self.on_auth_success)(payload.clone());
        CeremonyOutcome::Succeeded(payload)
    }

    fn fail(&self, method: SupportedMethod, error: AuthError) -> CeremonyOutcome {
        match &error {
            AuthError::TransportError(_) => {
                log::error!("{} verification transport failure: {}", method, error)
            }
            _ => log::warn!("{} ceremony failed: {}", method, error),
        }

        let failures = self.failures.record();
        if self.policy.is_locked_out(failures) {
            log::warn!("{} failed attempts, locking out biometric sign-in", failures);
            self.session.failed(LOCKOUT_MESSAGE);
        } else {
            self.session.failed(error.user_message(method));
        }
        CeremonyOutcome::Failed(error.kind())
    }

    fn is_unmounted(&self) -> bool {
        *self.unmounted.borrow()
    }

    async fn wait_unmounted(&self) {
        let mut rx = self.unmounted.subscribe();
        let _ = rx.wait_for(|unmounted| *unmounted).await;
    }

    /// Cancel any in-flight probe or ceremony and discard the session.
    /// Hardware held by a ceremony is released as its future is dropped.
    pub fn unmount(&self) {
        if self.unmounted.send_replace(true) {
            return;
        }
        log::info!("Biometric auth unmounted");
        self.session.discard();
    }
}

impl Drop for BiometricAuthCoordinator {
    fn drop(&mut self) {
        self.unmount();
    }
}
