use gl;
use gl::types::*;
use log::{debug, warn};
use std::fmt;
use thiserror::Error;

use crate::gl_api::device::Device;
use crate::gl_api::error::GlError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ShaderType {
    Vertex = gl::VERTEX_SHADER,
    Fragment = gl::FRAGMENT_SHADER,
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShaderType::Vertex => write!(f, "vertex"),
            ShaderType::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("could not create {0} shader object")]
    Creation(ShaderType),
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderType, log: String },
    #[error(transparent)]
    Gl(#[from] GlError),
}

pub type ShaderResult<T> = Result<T, ShaderError>;

/// A shader object that has not been compiled yet.
#[derive(Debug)]
pub struct Shader<'d, D: Device + ?Sized> {
    device: &'d D,
    id: GLuint,
    shader_type: ShaderType,
}

impl<'d, D: Device + ?Sized> Shader<'d, D> {
    pub fn new(device: &'d D, shader_type: ShaderType) -> ShaderResult<Self> {
        match gl_call!(device, create_shader(shader_type as GLenum))? {
            0 => Err(ShaderError::Creation(shader_type)),
            id => {
                debug!("created {} shader {}", shader_type, id);
                Ok(Shader { device, id, shader_type })
            }
        }
    }

    pub fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn source(&self, source: &str) -> ShaderResult<()> {
        gl_call!(self.device, shader_source(self.id, source))?;
        Ok(())
    }

    /// Compiles the attached source and checks `COMPILE_STATUS`. On failure
    /// the driver's info log is carried by the error.
    pub fn compile(self) -> ShaderResult<CompiledShader<'d, D>> {
        gl_call!(self.device, compile_shader(self.id))?;
        let status = gl_call!(self.device, get_shader_iv(self.id, gl::COMPILE_STATUS))?;
        if status == 0 {
            let mut log = self.device.shader_info_log(self.id);
            if log.trim().is_empty() {
                log = String::from("<driver produced no info log>");
            }
            return Err(ShaderError::Compile { stage: self.shader_type, log });
        }
        Ok(CompiledShader { shader: self })
    }
}

impl<'d, D: Device + ?Sized> Drop for Shader<'d, D> {
    fn drop(&mut self) {
        // Attached shaders are only flagged for deletion; the program keeps
        // the compiled code.
        if let Err(err) = gl_call!(self.device, delete_shader(self.id)) {
            warn!("failed to delete shader {}: {}", self.id, err);
        }
    }
}

#[derive(Debug)]
pub struct CompiledShader<'d, D: Device + ?Sized> {
    pub(crate) shader: Shader<'d, D>,
}

impl<'d, D: Device + ?Sized> CompiledShader<'d, D> {
    pub fn shader_type(&self) -> ShaderType {
        self.shader.shader_type
    }

    pub fn id(&self) -> GLuint {
        self.shader.id
    }
}
