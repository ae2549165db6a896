//! Wiring from a `Scene` to a running window, and the process exit code.

use log::{error, info};
use thiserror::Error;

use crate::geometry::{Geometry, GeometryError};
use crate::gl_api::shader::{simple_pipeline, PipelineError};
use crate::gl_api::LoadError;
use crate::mesh::MeshError;
use crate::platform::{PlatformError, Window, WindowConfig};
use crate::render::{run_loop, LoopStats, RenderError, Renderer};
use crate::scene::{Scene, BACKGROUND, FRAGMENT_SHADER, VERTEX_SHADER};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = -1;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to upload geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Builds the scene's pipeline and geometry on `device` and renders until the
/// window closes. Everything created here is released before returning.
pub fn run_on<W: Window + ?Sized>(
    window: &mut W,
    device: &W::Device,
    scene: Scene,
) -> Result<LoopStats, AppError> {
    let mesh = scene.mesh()?;

    let mut renderer = Renderer::new(device, BACKGROUND, scene.redraw());
    if let Some(mesh) = mesh {
        let program = simple_pipeline(device, VERTEX_SHADER, FRAGMENT_SHADER)?;
        let geometry = Geometry::upload(device, &mesh)?;
        renderer = renderer.with_program(program).with_geometry(geometry);
    }

    Ok(run_loop(window, &renderer)?)
}

/// Opens the window with `create` and runs `scene` in it. Returns `None` for
/// scenes that stop once the context is current.
pub fn run<W, F>(scene: Scene, create: F) -> Result<Option<LoopStats>, AppError>
where
    W: Window,
    F: FnOnce(&WindowConfig) -> Result<W, PlatformError>,
{
    let mut window = create(&scene.window_config())?;
    if !scene.needs_device() {
        return Ok(None);
    }

    // Declared after the window so it is dropped first.
    let device = window.load_device()?;
    let stats = run_on(&mut window, &device, scene)?;
    Ok(Some(stats))
}

/// Runs `scene` and maps the outcome to an exit code. Failures are logged
/// once all resources were released.
pub fn launch<W, F>(scene: Scene, create: F) -> i32
where
    W: Window,
    F: FnOnce(&WindowConfig) -> Result<W, PlatformError>,
{
    info!("starting {} scene", scene);
    match run(scene, create) {
        Ok(_) => {
            info!("{} scene finished", scene);
            EXIT_SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            EXIT_FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::SoftDevice;
    use crate::platform::HeadlessWindow;

    fn headless(polls: usize) -> impl FnOnce(&WindowConfig) -> Result<HeadlessWindow, PlatformError> {
        move |config: &WindowConfig| HeadlessWindow::create(config).map(|window| window.close_after(polls))
    }

    /// Presenting always fails, like a window whose surface was lost.
    struct LostSurface(HeadlessWindow);

    impl Window for LostSurface {
        type Device = SoftDevice;

        fn load_device(&self) -> Result<SoftDevice, LoadError> {
            self.0.load_device()
        }

        fn should_close(&self) -> bool {
            self.0.should_close()
        }

        fn swap_buffers(&mut self) -> Result<(), PlatformError> {
            Err(PlatformError::Present(String::from("surface lost")))
        }

        fn poll_events(&mut self) {
            self.0.poll_events()
        }

        fn size(&self) -> (u32, u32) {
            self.0.size()
        }
    }

    #[test]
    fn every_scene_exits_cleanly() {
        for &scene in &Scene::ALL {
            assert_eq!(launch(scene, headless(2)), EXIT_SUCCESS, "{}", scene);
        }
    }

    #[test]
    fn bootstrap_stops_after_window_creation() {
        assert_eq!(run(Scene::Bootstrap, headless(0)).unwrap(), None);
    }

    #[test]
    fn nested_scene_reports_loop_stats() {
        let stats = run(Scene::Nested, headless(4)).unwrap().unwrap();
        assert_eq!(stats, LoopStats { iterations: 4, frames_presented: 4 });
    }

    #[test]
    fn window_creation_failure_exits_with_minus_one() {
        let code = launch(Scene::Nested, |_: &WindowConfig| -> Result<HeadlessWindow, PlatformError> {
            Err(PlatformError::Creation(String::from("no display")))
        });
        assert_eq!(code, EXIT_FAILURE);
    }

    #[test]
    fn unsupported_context_version_is_fatal() {
        let code = launch(Scene::Triangle, |config: &WindowConfig| {
            HeadlessWindow::create(&WindowConfig { gl_version: (4, 6), ..config.clone() })
        });
        assert_eq!(code, EXIT_FAILURE);
    }

    #[test]
    fn zero_sized_window_is_fatal() {
        let code = launch(Scene::Blank, |config: &WindowConfig| {
            HeadlessWindow::create(&WindowConfig { width: 0, ..config.clone() })
        });
        assert_eq!(code, EXIT_FAILURE);
    }

    #[test]
    fn presentation_failure_stops_the_loop() {
        let mut window = LostSurface(HeadlessWindow::create(&Scene::Triangle.window_config()).unwrap().close_after(3));
        let device = window.load_device().unwrap();
        match run_on(&mut window, &device, Scene::Triangle) {
            Err(AppError::Render(RenderError::Platform(PlatformError::Present(_)))) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(device.draws().len(), 1);
        assert_eq!(device.live_objects(), 0);
    }
}
