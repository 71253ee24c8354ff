//! Release-on-drop ownership for exclusive hardware handles

use std::ops::{Deref, DerefMut};

/// A handle that holds a device (camera tracks, microphone) until released
pub trait Releasable {
    /// Stop the underlying device. Called exactly once by [`Scoped`], but
    /// implementations must tolerate repeated calls.
    fn release(&mut self);
}

/// Owns a handle and releases it on every exit path, including when the
/// owning future is dropped mid-await.
pub struct Scoped<H: Releasable + ?Sized> {
    handle: Box<H>,
    label: &'static str,
}

impl<H: Releasable + ?Sized> Scoped<H> {
    pub fn new(handle: Box<H>, label: &'static str) -> Self {
        log::debug!("Acquired {}", label);
        Self { handle, label }
    }
}

impl<H: Releasable + ?Sized> Deref for Scoped<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H: Releasable + ?Sized> DerefMut for Scoped<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.handle
    }
}

impl<H: Releasable + ?Sized> Drop for Scoped<H> {
    fn drop(&mut self) {
        self.handle.release();
        log::debug!("Released {}", self.label);
    }
}
