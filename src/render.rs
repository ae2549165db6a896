use cgmath::Vector4;
use gl;
use gl::types::*;
use log::debug;
use thiserror::Error;

use crate::geometry::Geometry;
use crate::gl_api::shader::program::Program;
use crate::gl_api::{Device, GlError, GlResult};
use crate::platform::{PlatformError, Window};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// The render loop's state. The only transition is `Running` to
/// `CloseRequested`, and there is no way back.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LoopState {
    Running,
    CloseRequested,
}

impl LoopState {
    fn observe<W: Window + ?Sized>(window: &W) -> Self {
        if window.should_close() {
            LoopState::CloseRequested
        } else {
            LoopState::Running
        }
    }
}

/// When the renderer draws.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Redraw {
    /// Clear, draw and present on every loop iteration.
    EveryFrame,
    /// Clear, draw and present once before the loop; the loop only handles
    /// events.
    Once,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct LoopStats {
    pub iterations: usize,
    pub frames_presented: usize,
}

pub struct Renderer<'d, D: Device + ?Sized> {
    // Field order is drop order: the geometry goes before the program.
    geometry: Option<Geometry<'d, D>>,
    program: Option<Program<'d, D>>,
    device: &'d D,
    background: Vector4<f32>,
    redraw: Redraw,
}

impl<'d, D: Device + ?Sized> Renderer<'d, D> {
    pub fn new(device: &'d D, background: Vector4<f32>, redraw: Redraw) -> Self {
        Renderer {
            geometry: None,
            program: None,
            device,
            background,
            redraw,
        }
    }

    pub fn with_program(mut self, program: Program<'d, D>) -> Self {
        self.program = Some(program);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry<'d, D>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn redraw(&self) -> Redraw {
        self.redraw
    }

    pub fn set_viewport(&self, (width, height): (u32, u32)) -> GlResult<()> {
        gl_call!(self.device, viewport(0, 0, width as GLsizei, height as GLsizei))
    }

    /// Clears to the background color and draws the geometry, if there is a
    /// program to draw it with.
    pub fn draw_frame(&self) -> GlResult<()> {
        let color = self.background;
        gl_call!(self.device, clear_color(color.x, color.y, color.z, color.w))?;
        gl_call!(self.device, clear(gl::COLOR_BUFFER_BIT))?;

        if let (Some(program), Some(geometry)) = (&self.program, &self.geometry) {
            program.bind()?;
            geometry.draw()?;
        }
        Ok(())
    }
}

fn present<W: Window + ?Sized, D: Device + ?Sized>(
    window: &mut W,
    renderer: &Renderer<D>,
    stats: &mut LoopStats,
) -> Result<(), RenderError> {
    renderer.draw_frame()?;
    window.swap_buffers()?;
    stats.frames_presented += 1;
    Ok(())
}

/// Runs until the window's close signal is set. The signal is checked at the
/// start of every iteration, before any drawing, so nothing is drawn once a
/// close was requested.
pub fn run_loop<W: Window + ?Sized, D: Device + ?Sized>(
    window: &mut W,
    renderer: &Renderer<D>,
) -> Result<LoopStats, RenderError> {
    renderer.set_viewport(window.size())?;

    let mut stats = LoopStats::default();
    if renderer.redraw() == Redraw::Once {
        present(window, renderer, &mut stats)?;
    }

    while LoopState::observe(window) == LoopState::Running {
        stats.iterations += 1;
        if renderer.redraw() == Redraw::EveryFrame {
            present(window, renderer, &mut stats)?;
        }
        window.poll_events();
    }

    debug!(
        "render loop finished after {} iterations, {} frames presented",
        stats.iterations, stats.frames_presented
    );
    Ok(stats)
}
