use gl;
use gl::types::GLenum;
use thiserror::Error;

use super::device::Device;

pub type GlResult<T> = Result<T, GlError>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Error)]
#[error("OpenGL error {} (0x{code:04X})", error_name(.code))]
pub struct GlError {
    code: GLenum,
}

impl GlError {
    pub fn new(code: GLenum) -> Self {
        GlError { code }
    }

    pub fn code(&self) -> GLenum {
        self.code
    }

    pub fn map_value<D: Device + ?Sized, T>(device: &D, val: T) -> GlResult<T> {
        match device.get_error() {
            gl::NO_ERROR => Ok(val),
            // GL specification states that it is undefined to issue any GL
            // calls after an out of memory error is received.
            gl::OUT_OF_MEMORY => {
                log::error!("GL reported OUT_OF_MEMORY, aborting");
                ::std::process::abort()
            }
            code => Err(GlError { code }),
        }
    }
}

fn error_name(code: &GLenum) -> &'static str {
    match *code {
        gl::INVALID_ENUM => "INVALID_ENUM",
        gl::INVALID_VALUE => "INVALID_VALUE",
        gl::INVALID_OPERATION => "INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        _ => "UNKNOWN",
    }
}

/// Calls a method on a `Device` and checks `glGetError` afterwards.
macro_rules! gl_call {
    ($device:expr, $name:ident($($args:expr),*)) => {{
        let device = $device;
        let value = device.$name($($args),*);
        $crate::gl_api::error::GlError::map_value(device, value)
    }}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_error() {
        let err = GlError::new(gl::INVALID_OPERATION);
        assert_eq!(err.to_string(), "OpenGL error INVALID_OPERATION (0x0502)");
    }
}
