use log::debug;

use super::{PlatformError, Window, WindowConfig};
use crate::gl_api::{LoadError, SoftDevice};

/// A window that only exists in memory and renders through `SoftDevice`.
///
/// The close signal fires once a configured number of event polls happened,
/// standing in for the user clicking the close button.
#[derive(Debug)]
pub struct HeadlessWindow {
    config: WindowConfig,
    close_after: Option<usize>,
    polls: usize,
    swaps: usize,
}

impl HeadlessWindow {
    pub fn create(config: &WindowConfig) -> Result<Self, PlatformError> {
        if config.width == 0 || config.height == 0 {
            return Err(PlatformError::Creation(format!(
                "cannot create a {}x{} window",
                config.width, config.height
            )));
        }
        if config.gl_version > (3, 3) {
            return Err(PlatformError::Creation(format!(
                "OpenGL {}.{} is not supported by the software device",
                config.gl_version.0, config.gl_version.1
            )));
        }
        debug!("created headless {}x{} window {:?}", config.width, config.height, config.title);
        Ok(HeadlessWindow {
            config: config.clone(),
            close_after: None,
            polls: 0,
            swaps: 0,
        })
    }

    /// Requests a close after `polls` calls to `poll_events`. Zero means the
    /// close signal is already set.
    pub fn close_after(mut self, polls: usize) -> Self {
        self.close_after = Some(polls);
        self
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn swaps(&self) -> usize {
        self.swaps
    }
}

impl Window for HeadlessWindow {
    type Device = SoftDevice;

    fn load_device(&self) -> Result<SoftDevice, LoadError> {
        Ok(SoftDevice::new(self.config.width as usize, self.config.height as usize))
    }

    fn should_close(&self) -> bool {
        self.close_after.map_or(false, |limit| self.polls >= limit)
    }

    fn swap_buffers(&mut self) -> Result<(), PlatformError> {
        self.swaps += 1;
        Ok(())
    }

    fn poll_events(&mut self) {
        self.polls += 1;
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}
