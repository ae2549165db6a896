use gl;
use gl::types::*;
use log::{debug, warn};
use thiserror::Error;

use super::shader::{CompiledShader, ShaderType};
use crate::gl_api::device::Device;
use crate::gl_api::error::GlError;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("could not create program object")]
    Creation,
    #[error("program failed to link:\n{0}")]
    Link(String),
    #[error(transparent)]
    Gl(#[from] GlError),
}

pub struct ProgramBuilder<'d, D: Device + ?Sized> {
    device: &'d D,
    vertex: CompiledShader<'d, D>,
    fragment: CompiledShader<'d, D>,
}

impl<'d, D: Device + ?Sized> ProgramBuilder<'d, D> {
    pub fn new(device: &'d D, vertex: CompiledShader<'d, D>, fragment: CompiledShader<'d, D>) -> Self {
        assert_eq!(vertex.shader_type(), ShaderType::Vertex);
        assert_eq!(fragment.shader_type(), ShaderType::Fragment);
        ProgramBuilder { device, vertex, fragment }
    }

    /// Creates the program, attaches the stages in pipeline order and links.
    /// The shader objects are released once the program is linked.
    pub fn build(self) -> Result<Program<'d, D>, ProgramError> {
        let ProgramBuilder { device, vertex, fragment } = self;
        let raw = RawProgram::new(device)?;
        raw.attach_shader(&vertex)?;
        raw.attach_shader(&fragment)?;
        let program = raw.link()?;
        drop((vertex, fragment));
        Ok(program)
    }
}

/// A linked program, ready to be selected for drawing.
#[derive(Debug)]
pub struct Program<'d, D: Device + ?Sized>(RawProgram<'d, D>);

impl<'d, D: Device + ?Sized> Program<'d, D> {
    pub fn bind(&self) -> Result<(), GlError> {
        self.0.bind()
    }

    pub fn id(&self) -> GLuint {
        self.0.id
    }
}

#[derive(Debug)]
pub struct RawProgram<'d, D: Device + ?Sized> {
    device: &'d D,
    id: GLuint,
    _marker: ::std::marker::PhantomData<*mut ()>,
}

impl<'d, D: Device + ?Sized> RawProgram<'d, D> {
    pub(crate) fn new(device: &'d D) -> Result<Self, ProgramError> {
        match gl_call!(device, create_program())? {
            0 => Err(ProgramError::Creation),
            id => {
                debug!("created program {}", id);
                Ok(RawProgram {
                    device,
                    id,
                    _marker: ::std::marker::PhantomData,
                })
            }
        }
    }

    pub(crate) fn bind(&self) -> Result<(), GlError> {
        gl_call!(self.device, use_program(self.id))
    }

    pub(crate) fn attach_shader(&self, shader: &CompiledShader<'d, D>) -> Result<(), GlError> {
        gl_call!(self.device, attach_shader(self.id, shader.id()))
    }

    pub(crate) fn link(self) -> Result<Program<'d, D>, ProgramError> {
        assert!(self.id != 0);
        gl_call!(self.device, link_program(self.id))?;
        check_program_status(self.device, self.id, gl::LINK_STATUS)?;
        Ok(Program(self))
    }
}

impl<'d, D: Device + ?Sized> Drop for RawProgram<'d, D> {
    fn drop(&mut self) {
        if let Err(err) = gl_call!(self.device, delete_program(self.id)) {
            warn!("failed to delete program {}: {}", self.id, err);
        }
    }
}

fn check_program_status<D: Device + ?Sized>(device: &D, id: GLuint, ty: GLenum) -> Result<(), ProgramError> {
    let status = gl_call!(device, get_program_iv(id, ty))?;

    if status == 0 {
        let log = device.program_info_log(id);
        Err(ProgramError::Link(if log.trim().is_empty() {
            String::from("<driver produced no info log>")
        } else {
            log
        }))
    } else {
        Ok(())
    }
}
