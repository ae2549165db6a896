use std::ffi::CStr;
use std::marker::PhantomData;
use std::os::raw::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use gl;
use gl::types::*;
use log::info;
use thiserror::Error;

use super::device::Device;
use super::layout::AttribFormat;

static LOADED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("OpenGL function pointers were already loaded in this process")]
    AlreadyLoaded,
    #[error("failed to load OpenGL functions: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// The real driver, reached through the `gl` crate's global function table.
///
/// Only one of these can exist per process, and only on the thread whose
/// context was current when it was loaded.
#[derive(Debug)]
pub struct LoadedGl {
    _marker: PhantomData<*mut ()>,
}

macro_rules! required {
    ($($name:ident),* $(,)*) => {
        fn missing_functions() -> Vec<&'static str> {
            let mut missing = Vec::new();
            $(
                if !gl::$name::is_loaded() {
                    missing.push(concat!("gl", stringify!($name)));
                }
            )*
            missing
        }
    };
}

required! {
    GetError, GetString, Viewport, ClearColor, Clear,
    CreateShader, ShaderSource, CompileShader, GetShaderiv, GetShaderInfoLog, DeleteShader,
    CreateProgram, AttachShader, LinkProgram, GetProgramiv, GetProgramInfoLog, UseProgram, DeleteProgram,
    GenBuffers, BindBuffer, BufferData, DeleteBuffers,
    GenVertexArrays, BindVertexArray, DeleteVertexArrays,
    VertexAttribPointer, VertexAttribIPointer, EnableVertexAttribArray,
    DrawArrays, DrawElements,
}

impl LoadedGl {
    /// Resolves every GL entry point through `loader`. The context that
    /// `loader` belongs to must be current on the calling thread.
    pub fn load_with<F>(loader: F) -> Result<Self, LoadError>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        if LOADED.swap(true, Ordering::SeqCst) {
            return Err(LoadError::AlreadyLoaded);
        }

        gl::load_with(loader);

        let missing = missing_functions();
        if !missing.is_empty() {
            return Err(LoadError::Missing(missing));
        }

        info!("OpenGL functions loaded");
        Ok(LoadedGl { _marker: PhantomData })
    }
}

fn info_log(length: GLint, fill: impl FnOnce(GLsizei, *mut GLchar)) -> String {
    if length <= 0 {
        return String::new();
    }
    let mut buffer = vec![0u8; length as usize];
    fill(length, buffer.as_mut_ptr() as *mut GLchar);
    // Drop the trailing NUL the driver writes
    while buffer.last() == Some(&0) {
        buffer.pop();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

impl Device for LoadedGl {
    fn get_error(&self) -> GLenum {
        unsafe { gl::GetError() }
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { gl::Viewport(x, y, width, height) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { gl::ClearColor(r, g, b, a) }
    }

    fn clear(&self, mask: GLbitfield) {
        unsafe { gl::Clear(mask) }
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        unsafe { gl::CreateShader(kind) }
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        let ptr = source.as_ptr() as *const GLchar;
        let len = source.len() as GLint;
        unsafe { gl::ShaderSource(shader, 1, &ptr, &len) }
    }

    fn compile_shader(&self, shader: GLuint) {
        unsafe { gl::CompileShader(shader) }
    }

    fn get_shader_iv(&self, shader: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetShaderiv(shader, pname, &mut value) };
        value
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let length = self.get_shader_iv(shader, gl::INFO_LOG_LENGTH);
        info_log(length, |len, buf| unsafe {
            gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buf)
        })
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn link_program(&self, program: GLuint) {
        unsafe { gl::LinkProgram(program) }
    }

    fn get_program_iv(&self, program: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetProgramiv(program, pname, &mut value) };
        value
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let length = self.get_program_iv(program, gl::INFO_LOG_LENGTH);
        info_log(length, |len, buf| unsafe {
            gl::GetProgramInfoLog(program, len, ptr::null_mut(), buf)
        })
    }

    fn use_program(&self, program: GLuint) {
        unsafe { gl::UseProgram(program) }
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn gen_buffer(&self) -> GLuint {
        let mut id = 0;
        unsafe { gl::GenBuffers(1, &mut id) };
        id
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        unsafe { gl::BindBuffer(target, buffer) }
    }

    fn buffer_data(&self, target: GLenum, data: &[u8], usage: GLenum) {
        unsafe {
            gl::BufferData(
                target,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
                usage,
            )
        }
    }

    fn delete_buffer(&self, buffer: GLuint) {
        unsafe { gl::DeleteBuffers(1, &buffer) }
    }

    fn gen_vertex_array(&self) -> GLuint {
        let mut id = 0;
        unsafe { gl::GenVertexArrays(1, &mut id) };
        id
    }

    fn bind_vertex_array(&self, array: GLuint) {
        unsafe { gl::BindVertexArray(array) }
    }

    fn delete_vertex_array(&self, array: GLuint) {
        unsafe { gl::DeleteVertexArrays(1, &array) }
    }

    fn vertex_attrib_pointer(&self, format: &AttribFormat) {
        let offset = format.offset as *const c_void;
        unsafe {
            if format.integer {
                gl::VertexAttribIPointer(
                    format.slot,
                    format.components,
                    format.component_type,
                    format.stride,
                    offset,
                )
            } else {
                gl::VertexAttribPointer(
                    format.slot,
                    format.components,
                    format.component_type,
                    format.normalized as GLboolean,
                    format.stride,
                    offset,
                )
            }
        }
    }

    fn enable_vertex_attrib_array(&self, slot: GLuint) {
        unsafe { gl::EnableVertexAttribArray(slot) }
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        unsafe { gl::DrawArrays(mode, first, count) }
    }

    fn draw_elements(&self, mode: GLenum, count: GLsizei, index_type: GLenum, offset: usize) {
        unsafe { gl::DrawElements(mode, count, index_type, offset as *const c_void) }
    }
}

/// Human readable driver identification, logged once after loading.
pub fn describe_driver(_gl: &LoadedGl) -> String {
    unsafe {
        let read = |name| {
            let ptr = gl::GetString(name);
            if ptr.is_null() {
                String::from("<unknown>")
            } else {
                CStr::from_ptr(ptr as *const _)
                    .to_string_lossy()
                    .into_owned()
            }
        };
        let description = format!(
            "{} / {} / GL {}",
            read(gl::VENDOR),
            read(gl::RENDERER),
            read(gl::VERSION)
        );
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The function table is process-wide, so both checks share one test.
    #[test]
    fn loading_is_checked_and_happens_once() {
        match LoadedGl::load_with(|_| ptr::null()) {
            Err(LoadError::Missing(names)) => {
                assert_eq!(names[0], "glGetError");
                assert!(names.contains(&"glDrawElements"));
            }
            other => panic!("unexpected load result {:?}", other),
        }
        assert!(matches!(
            LoadedGl::load_with(|_| ptr::null()),
            Err(LoadError::AlreadyLoaded)
        ));
    }
}
