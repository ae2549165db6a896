//! Windows with a current OpenGL context.

mod desktop;
mod headless;

use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

use crate::gl_api::{Device, LoadError};

pub use self::desktop::GlutinWindow;
pub use self::headless::HeadlessWindow;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to create window: {0}")]
    Creation(String),
    #[error("failed to make the OpenGL context current: {0}")]
    Context(String),
    #[error("failed to present frame: {0}")]
    Present(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Requested `(major, minor)` version. Creation fails rather than falling
    /// back when the driver cannot provide it.
    pub gl_version: (u8, u8),
    /// Core profile only; deprecated entry points are not available.
    pub core_profile: bool,
}

impl WindowConfig {
    pub fn new<S: Into<String>>(width: u32, height: u32, title: S) -> Self {
        WindowConfig {
            width,
            height,
            title: title.into(),
            gl_version: (3, 3),
            core_profile: true,
        }
    }
}

/// A window whose OpenGL context is current on the calling thread.
///
/// Dropping the window destroys it; implementations release the windowing
/// library after the window itself.
pub trait Window {
    type Device: Device;

    /// Resolves the GL entry points for this window's context.
    fn load_device(&self) -> Result<Self::Device, LoadError>;

    /// The close signal: set once the user or the OS asked for the window to
    /// close, and never cleared.
    fn should_close(&self) -> bool;

    fn swap_buffers(&mut self) -> Result<(), PlatformError>;

    /// Processes pending events without blocking.
    fn poll_events(&mut self);

    fn size(&self) -> (u32, u32);
}

/// Runs `f` and turns a panic into `None`. The panic hook is silenced for the
/// duration of the call, so the caller's error is the only diagnostic.
pub(crate) fn quietly<T, F: FnOnce() -> T>(f: F) -> Option<T> {
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(hook);
    result.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static REPORTED: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn quietly_swallows_the_panic_report_and_restores_the_hook() {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(|_| {
            REPORTED.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(quietly(|| 7), Some(7));
        assert_eq!(quietly(|| -> u32 { panic!("no backend") }), None);
        assert_eq!(REPORTED.load(Ordering::SeqCst), 0);

        // the counting hook is back in place
        let _ = panic::catch_unwind(|| panic!("reported"));
        assert_eq!(REPORTED.load(Ordering::SeqCst), 1);

        panic::set_hook(previous);
    }
}
