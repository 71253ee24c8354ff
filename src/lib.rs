//! Biometric sign-in client for the Sprints Bank backend
//!
//! [`auth::BiometricAuthCoordinator`] detects what the device can do, runs
//! one challenge → capture → verify ceremony at a time and reports the
//! outcome. Devices sit behind the traits in [`platform`]; the verifier sits
//! behind [`backend::AuthBackend`].

pub mod auth;
pub mod backend;
pub mod capability;
pub mod config;
pub mod paths;
pub mod platform;
pub mod token_store;
pub mod validation;

#[cfg(test)]
mod testing;
