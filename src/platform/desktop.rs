use glutin::{self, Api, GlContext, GlProfile, GlRequest};
use log::{debug, info};

use super::{quietly, PlatformError, Window, WindowConfig};
use crate::gl_api::loader::describe_driver;
use crate::gl_api::{LoadError, LoadedGl};

/// A native window backed by glutin.
pub struct GlutinWindow {
    // Field order is drop order: the window goes before the events loop that
    // owns the connection to the windowing system.
    gl_window: glutin::GlWindow,
    events_loop: glutin::EventsLoop,
    close_requested: bool,
    size: (u32, u32),
}

impl GlutinWindow {
    /// Opens the window and makes its context current. Any failure leaves
    /// nothing behind: whatever was created is dropped before returning.
    pub fn create(config: &WindowConfig) -> Result<Self, PlatformError> {
        // winit panics when no display server is reachable
        let events_loop = quietly(glutin::EventsLoop::new)
            .ok_or_else(|| PlatformError::Creation(String::from("no windowing backend is available")))?;

        let window = glutin::WindowBuilder::new()
            .with_title(config.title.clone())
            .with_dimensions(config.width, config.height);
        let profile = if config.core_profile { GlProfile::Core } else { GlProfile::Compatibility };
        let context = glutin::ContextBuilder::new()
            .with_gl(GlRequest::Specific(Api::OpenGl, config.gl_version))
            .with_gl_profile(profile);

        let gl_window = glutin::GlWindow::new(window, context, &events_loop)
            .map_err(|err| PlatformError::Creation(err.to_string()))?;

        unsafe { gl_window.make_current() }.map_err(|err| PlatformError::Context(err.to_string()))?;

        info!(
            "created {}x{} window {:?} with OpenGL {}.{} {} context",
            config.width,
            config.height,
            config.title,
            config.gl_version.0,
            config.gl_version.1,
            if config.core_profile { "core" } else { "compatibility" }
        );

        Ok(GlutinWindow {
            gl_window,
            events_loop,
            close_requested: false,
            size: (config.width, config.height),
        })
    }
}

impl Window for GlutinWindow {
    type Device = LoadedGl;

    fn load_device(&self) -> Result<LoadedGl, LoadError> {
        let gl_window = &self.gl_window;
        let gl = LoadedGl::load_with(|symbol| gl_window.get_proc_address(symbol) as *const _)?;
        info!("using {}", describe_driver(&gl));
        Ok(gl)
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn swap_buffers(&mut self) -> Result<(), PlatformError> {
        self.gl_window
            .swap_buffers()
            .map_err(|err| PlatformError::Present(err.to_string()))
    }

    fn poll_events(&mut self) {
        let mut close_requested = false;
        self.events_loop.poll_events(|event| {
            if let glutin::Event::WindowEvent { event: glutin::WindowEvent::CloseRequested, .. } = event {
                close_requested = true;
            }
        });
        if close_requested && !self.close_requested {
            info!("window close requested");
            self.close_requested = true;
        }
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Drop for GlutinWindow {
    fn drop(&mut self) {
        debug!("destroying window");
    }
}
