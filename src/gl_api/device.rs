use gl::types::*;

use super::layout::AttribFormat;

/// The OpenGL entry points this crate uses.
///
/// Every method maps to one GL call and has the same semantics, including the
/// "currently bound object" model: buffer uploads and attribute descriptions
/// act on whatever is bound at the time. Errors are reported through
/// `get_error`, exactly like the driver does; wrap calls in `gl_call!` to turn
/// them into `GlResult`s.
///
/// Implementations are expected to be single threaded, which is why all the
/// methods take `&self`.
pub trait Device {
    fn get_error(&self) -> GLenum;

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: GLbitfield);

    fn create_shader(&self, kind: GLenum) -> GLuint;
    fn shader_source(&self, shader: GLuint, source: &str);
    fn compile_shader(&self, shader: GLuint);
    fn get_shader_iv(&self, shader: GLuint, pname: GLenum) -> GLint;
    fn shader_info_log(&self, shader: GLuint) -> String;
    fn delete_shader(&self, shader: GLuint);

    fn create_program(&self) -> GLuint;
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn link_program(&self, program: GLuint);
    fn get_program_iv(&self, program: GLuint, pname: GLenum) -> GLint;
    fn program_info_log(&self, program: GLuint) -> String;
    fn use_program(&self, program: GLuint);
    fn delete_program(&self, program: GLuint);

    fn gen_buffer(&self) -> GLuint;
    fn bind_buffer(&self, target: GLenum, buffer: GLuint);
    fn buffer_data(&self, target: GLenum, data: &[u8], usage: GLenum);
    fn delete_buffer(&self, buffer: GLuint);

    fn gen_vertex_array(&self) -> GLuint;
    fn bind_vertex_array(&self, array: GLuint);
    fn delete_vertex_array(&self, array: GLuint);
    fn vertex_attrib_pointer(&self, format: &AttribFormat);
    fn enable_vertex_attrib_array(&self, slot: GLuint);

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei);
    /// `offset` is a byte offset into the element buffer bound to the current
    /// vertex array.
    fn draw_elements(&self, mode: GLenum, count: GLsizei, index_type: GLenum, offset: usize);
}
