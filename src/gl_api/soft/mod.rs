//! A software implementation of `Device`.
//!
//! `SoftDevice` keeps the same object and binding model as a GL 3.3 core
//! context (names, the bound array buffer, vertex arrays owning their element
//! buffer binding, the current program, first-error-wins `glGetError`) and
//! rasterizes triangles into an in-memory framebuffer. The vertex stage is
//! treated as a pass-through of the position input and the fragment stage must
//! write a constant color; see `glsl` for the accepted subset.
//!
//! Every call is appended to a trace, which is what the tests inspect.

pub mod glsl;
pub mod raster;

use gl;
use gl::types::*;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use self::glsl::Interface;
use self::raster::{Framebuffer, Viewport};
use super::device::Device;
use super::layout::AttribFormat;

pub const MAX_VERTEX_ATTRIBS: u32 = 16;

/// One entry point invocation, as recorded by `SoftDevice::trace`.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Viewport(Viewport),
    ClearColor([f32; 4]),
    Clear(GLbitfield),
    CreateShader(GLenum),
    ShaderSource(GLuint),
    CompileShader(GLuint),
    DeleteShader(GLuint),
    CreateProgram(GLuint),
    AttachShader(GLuint, GLuint),
    LinkProgram(GLuint),
    UseProgram(GLuint),
    DeleteProgram(GLuint),
    GenBuffer(GLuint),
    BindBuffer(GLenum, GLuint),
    /// Target and byte length.
    BufferData(GLenum, usize),
    DeleteBuffer(GLuint),
    GenVertexArray(GLuint),
    BindVertexArray(GLuint),
    DeleteVertexArray(GLuint),
    VertexAttribPointer(AttribFormat),
    EnableVertexAttribArray(GLuint),
    DrawArrays { first: GLint, count: GLsizei },
    DrawElements { count: GLsizei, index_type: GLenum, offset: usize },
}

/// What a successful draw call submitted to the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub program: GLuint,
    pub vertex_array: GLuint,
    /// First vertex for sequential draws, 0 for indexed draws.
    pub first: usize,
    /// Vertices submitted to the vertex stage, including repeats.
    pub vertices_submitted: usize,
    /// Reads from the element buffer. Zero for sequential draws.
    pub index_fetches: usize,
    pub max_index: Option<u32>,
    pub triangles: usize,
    pub pixels_written: usize,
}

#[derive(Clone, Debug)]
struct ShaderObject {
    kind: GLenum,
    source: String,
    compiled: Option<Result<Interface, String>>,
}

impl ShaderObject {
    fn info_log(&self) -> &str {
        match self.compiled {
            Some(Err(ref log)) => log,
            _ => "",
        }
    }
}

#[derive(Clone, Debug, Default)]
struct ProgramObject {
    /// Snapshots of the attached stages. Deleting an attached shader only
    /// flags it, so the program keeps what it needs.
    attached: Vec<(GLuint, GLenum, Option<Interface>)>,
    linked: Option<Result<LinkedProgram, String>>,
}

#[derive(Clone, Debug)]
struct LinkedProgram {
    position_slot: GLuint,
    color: [f32; 4],
}

#[derive(Clone, Debug)]
struct AttribState {
    buffer: GLuint,
    format: AttribFormat,
}

#[derive(Clone, Debug, Default)]
struct VertexArrayObject {
    element_buffer: GLuint,
    attribs: HashMap<GLuint, AttribState>,
    enabled: HashSet<GLuint>,
}

#[derive(Debug)]
struct State {
    error: GLenum,
    next_name: GLuint,
    shaders: HashMap<GLuint, ShaderObject>,
    programs: HashMap<GLuint, ProgramObject>,
    buffers: HashMap<GLuint, Vec<u8>>,
    vertex_arrays: HashMap<GLuint, VertexArrayObject>,
    /// Bindings that exist without a vertex array (name 0).
    default_vertex_array: VertexArrayObject,
    array_buffer: GLuint,
    vertex_array: GLuint,
    program: GLuint,
    clear_color: [f32; 4],
    viewport: Viewport,
    framebuffer: Framebuffer,
    trace: Vec<Call>,
    draws: Vec<DrawRecord>,
}

impl State {
    fn set_error(&mut self, code: GLenum) {
        if self.error == gl::NO_ERROR {
            self.error = code;
        }
    }

    fn name(&mut self) -> GLuint {
        self.next_name += 1;
        self.next_name
    }

    fn bound_vertex_array(&mut self) -> &mut VertexArrayObject {
        match self.vertex_array {
            0 => &mut self.default_vertex_array,
            id => self.vertex_arrays.entry(id).or_insert_with(VertexArrayObject::default),
        }
    }
}

#[derive(Debug)]
pub struct SoftDevice {
    state: RefCell<State>,
    _marker: PhantomData<*mut ()>,
}

impl SoftDevice {
    pub fn new(width: usize, height: usize) -> Self {
        SoftDevice {
            state: RefCell::new(State {
                error: gl::NO_ERROR,
                next_name: 0,
                shaders: HashMap::new(),
                programs: HashMap::new(),
                buffers: HashMap::new(),
                vertex_arrays: HashMap::new(),
                default_vertex_array: VertexArrayObject::default(),
                array_buffer: 0,
                vertex_array: 0,
                program: 0,
                clear_color: [0.0, 0.0, 0.0, 0.0],
                viewport: (0, 0, width as i32, height as i32),
                framebuffer: Framebuffer::new(width, height),
                trace: Vec::new(),
                draws: Vec::new(),
            }),
            _marker: PhantomData,
        }
    }

    pub fn trace(&self) -> Vec<Call> {
        self.state.borrow().trace.clone()
    }

    pub fn clear_trace(&self) {
        self.state.borrow_mut().trace.clear();
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn buffer_contents(&self, buffer: GLuint) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    /// The element buffer recorded in `vertex_array`.
    pub fn element_binding(&self, vertex_array: GLuint) -> Option<GLuint> {
        let state = self.state.borrow();
        match vertex_array {
            0 => Some(state.default_vertex_array.element_buffer),
            id => state.vertex_arrays.get(&id).map(|vao| vao.element_buffer),
        }
    }

    pub fn bound_vertex_array(&self) -> GLuint {
        self.state.borrow().vertex_array
    }

    pub fn bound_array_buffer(&self) -> GLuint {
        self.state.borrow().array_buffer
    }

    /// Shaders, programs, buffers and vertex arrays that were created and not
    /// deleted yet.
    pub fn live_objects(&self) -> usize {
        let state = self.state.borrow();
        state.shaders.len() + state.programs.len() + state.buffers.len() + state.vertex_arrays.len()
    }

    pub fn framebuffer(&self) -> Framebuffer {
        self.state.borrow().framebuffer.clone()
    }

    pub fn pixel(&self, x: usize, y: usize) -> [f32; 4] {
        self.state.borrow().framebuffer.pixel(x, y)
    }

    fn record(&self, call: Call) -> ::std::cell::RefMut<State> {
        let mut state = self.state.borrow_mut();
        state.trace.push(call);
        state
    }
}

fn link(attached: &[(GLuint, GLenum, Option<Interface>)]) -> Result<LinkedProgram, String> {
    let stages = |kind: GLenum| attached.iter().filter(move |(_, k, _)| *k == kind).collect::<Vec<_>>();
    let vertex = stages(gl::VERTEX_SHADER);
    let fragment = stages(gl::FRAGMENT_SHADER);

    if vertex.len() > 1 {
        return Err(String::from("error: function `main' is already defined in the vertex stage\n"));
    }
    let vertex = match vertex.first() {
        Some((_, _, Some(interface))) => interface,
        Some((id, _, None)) => return Err(format!("error: vertex shader {} is not compiled\n", id)),
        None => return Err(String::from("error: program lacks a vertex shader\n")),
    };
    if fragment.len() > 1 {
        return Err(String::from("error: function `main' is already defined in the fragment stage\n"));
    }
    let fragment = match fragment.first() {
        Some((_, _, Some(interface))) => interface,
        Some((id, _, None)) => return Err(format!("error: fragment shader {} is not compiled\n", id)),
        None => return Err(String::from("error: program lacks a fragment shader\n")),
    };

    if !vertex.writes_position {
        return Err(String::from("error: vertex shader does not write to `gl_Position'\n"));
    }
    let position_slot = vertex
        .position_slot()
        .ok_or_else(|| String::from("error: vertex shader has no position input\n"))?;
    let color = fragment
        .constant_color
        .ok_or_else(|| String::from("error: fragment shader does not write a constant vec4 output\n"))?;

    Ok(LinkedProgram { position_slot, color })
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    f32::from_ne_bytes(raw)
}

fn read_index(bytes: &[u8], at: usize, index_type: GLenum) -> u32 {
    match index_type {
        gl::UNSIGNED_BYTE => u32::from(bytes[at]),
        gl::UNSIGNED_SHORT => {
            let mut raw = [0u8; 2];
            raw.copy_from_slice(&bytes[at..at + 2]);
            u32::from(u16::from_ne_bytes(raw))
        }
        _ => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[at..at + 4]);
            u32::from_ne_bytes(raw)
        }
    }
}

/// Everything a draw needs, resolved against the current bindings.
struct DrawSetup {
    program: LinkedProgram,
    vertex_array: GLuint,
    positions: Vec<u8>,
    format: AttribFormat,
    vertex_count: usize,
}

fn draw_setup(state: &State) -> Result<DrawSetup, GLenum> {
    if state.vertex_array == 0 || state.program == 0 {
        return Err(gl::INVALID_OPERATION);
    }
    let program = match state.programs.get(&state.program).and_then(|p| p.linked.clone()) {
        Some(Ok(linked)) => linked,
        _ => return Err(gl::INVALID_OPERATION),
    };
    let vao = state.vertex_arrays.get(&state.vertex_array).ok_or(gl::INVALID_OPERATION)?;
    if !vao.enabled.contains(&program.position_slot) {
        return Err(gl::INVALID_OPERATION);
    }
    let attrib = vao.attribs.get(&program.position_slot).ok_or(gl::INVALID_OPERATION)?;
    if attrib.format.component_type != gl::FLOAT || attrib.format.integer {
        return Err(gl::INVALID_OPERATION);
    }
    let positions = state.buffers.get(&attrib.buffer).ok_or(gl::INVALID_OPERATION)?.clone();

    let format = attrib.format;
    let element = format.components as usize * 4;
    let stride = if format.stride == 0 { element } else { format.stride as usize };
    let vertex_count = if positions.len() < format.offset + element {
        0
    } else {
        (positions.len() - format.offset - element) / stride + 1
    };

    Ok(DrawSetup {
        program,
        vertex_array: state.vertex_array,
        positions,
        format,
        vertex_count,
    })
}

impl DrawSetup {
    fn position(&self, vertex: usize) -> [f32; 3] {
        let element = self.format.components as usize * 4;
        let stride = if self.format.stride == 0 { element } else { self.format.stride as usize };
        let base = self.format.offset + vertex * stride;
        let mut out = [0.0, 0.0, 0.0];
        for (c, slot) in out.iter_mut().enumerate().take(self.format.components.min(3) as usize) {
            *slot = read_f32(&self.positions, base + c * 4);
        }
        out
    }
}

fn rasterize(
    framebuffer: &mut Framebuffer,
    viewport: Viewport,
    setup: &DrawSetup,
    vertices: &[usize],
) -> (usize, usize) {
    let mut triangles = 0;
    let mut pixels = 0;
    for tri in vertices.chunks(3).filter(|tri| tri.len() == 3) {
        let ndc = [setup.position(tri[0]), setup.position(tri[1]), setup.position(tri[2])];
        pixels += framebuffer.fill_triangle(viewport, ndc, setup.program.color);
        triangles += 1;
    }
    (triangles, pixels)
}

impl Device for SoftDevice {
    fn get_error(&self) -> GLenum {
        let mut state = self.state.borrow_mut();
        ::std::mem::replace(&mut state.error, gl::NO_ERROR)
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        let mut state = self.record(Call::Viewport((x, y, width, height)));
        if width < 0 || height < 0 {
            state.set_error(gl::INVALID_VALUE);
            return;
        }
        state.viewport = (x, y, width, height);
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        let mut state = self.record(Call::ClearColor([r, g, b, a]));
        state.clear_color = [r, g, b, a];
    }

    fn clear(&self, mask: GLbitfield) {
        let mut state = self.record(Call::Clear(mask));
        let known = gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT;
        if mask & !known != 0 {
            state.set_error(gl::INVALID_VALUE);
            return;
        }
        if mask & gl::COLOR_BUFFER_BIT != 0 {
            let color = state.clear_color;
            state.framebuffer.clear(color);
        }
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        let mut state = self.record(Call::CreateShader(kind));
        if kind != gl::VERTEX_SHADER && kind != gl::FRAGMENT_SHADER {
            state.set_error(gl::INVALID_ENUM);
            return 0;
        }
        let id = state.name();
        state.shaders.insert(id, ShaderObject { kind, source: String::new(), compiled: None });
        id
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        let mut state = self.record(Call::ShaderSource(shader));
        match state.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_string(),
            None => state.set_error(gl::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: GLuint) {
        let mut state = self.record(Call::CompileShader(shader));
        match state.shaders.get_mut(&shader) {
            Some(object) => object.compiled = Some(glsl::check(object.kind, &object.source)),
            None => state.set_error(gl::INVALID_VALUE),
        }
    }

    fn get_shader_iv(&self, shader: GLuint, pname: GLenum) -> GLint {
        let mut state = self.state.borrow_mut();
        let object = match state.shaders.get(&shader) {
            Some(object) => object.clone(),
            None => {
                state.set_error(gl::INVALID_VALUE);
                return 0;
            }
        };
        match pname {
            gl::COMPILE_STATUS => match object.compiled {
                Some(Ok(_)) => gl::TRUE as GLint,
                _ => gl::FALSE as GLint,
            },
            gl::SHADER_TYPE => object.kind as GLint,
            gl::INFO_LOG_LENGTH => match object.info_log().len() {
                0 => 0,
                n => n as GLint + 1,
            },
            gl::SHADER_SOURCE_LENGTH => match object.source.len() {
                0 => 0,
                n => n as GLint + 1,
            },
            _ => {
                state.set_error(gl::INVALID_ENUM);
                0
            }
        }
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let mut state = self.state.borrow_mut();
        match state.shaders.get(&shader) {
            Some(object) => object.info_log().to_string(),
            None => {
                state.set_error(gl::INVALID_VALUE);
                String::new()
            }
        }
    }

    fn delete_shader(&self, shader: GLuint) {
        let mut state = self.record(Call::DeleteShader(shader));
        if shader != 0 && state.shaders.remove(&shader).is_none() {
            state.set_error(gl::INVALID_VALUE);
        }
    }

    fn create_program(&self) -> GLuint {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.programs.insert(id, ProgramObject::default());
        state.trace.push(Call::CreateProgram(id));
        id
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        let mut state = self.record(Call::AttachShader(program, shader));
        let snapshot = match state.shaders.get(&shader) {
            Some(object) => (
                shader,
                object.kind,
                object.compiled.as_ref().and_then(|c| c.as_ref().ok().cloned()),
            ),
            None => return state.set_error(gl::INVALID_VALUE),
        };
        let already = match state.programs.get(&program) {
            Some(object) => object.attached.iter().any(|(id, _, _)| *id == shader),
            None => return state.set_error(gl::INVALID_VALUE),
        };
        if already {
            return state.set_error(gl::INVALID_OPERATION);
        }
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.push(snapshot);
        }
    }

    fn link_program(&self, program: GLuint) {
        let mut state = self.record(Call::LinkProgram(program));
        match state.programs.get_mut(&program) {
            Some(object) => {
                let linked = link(&object.attached);
                object.linked = Some(linked);
            }
            None => state.set_error(gl::INVALID_VALUE),
        }
    }

    fn get_program_iv(&self, program: GLuint, pname: GLenum) -> GLint {
        let mut state = self.state.borrow_mut();
        let linked = match state.programs.get(&program) {
            Some(object) => object.linked.clone(),
            None => {
                state.set_error(gl::INVALID_VALUE);
                return 0;
            }
        };
        match pname {
            gl::LINK_STATUS => match linked {
                Some(Ok(_)) => gl::TRUE as GLint,
                _ => gl::FALSE as GLint,
            },
            gl::INFO_LOG_LENGTH => match linked {
                Some(Err(log)) => log.len() as GLint + 1,
                _ => 0,
            },
            gl::ATTACHED_SHADERS => state.programs[&program].attached.len() as GLint,
            _ => {
                state.set_error(gl::INVALID_ENUM);
                0
            }
        }
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let mut state = self.state.borrow_mut();
        match state.programs.get(&program) {
            Some(object) => match object.linked {
                Some(Err(ref log)) => log.clone(),
                _ => String::new(),
            },
            None => {
                state.set_error(gl::INVALID_VALUE);
                String::new()
            }
        }
    }

    fn use_program(&self, program: GLuint) {
        let mut state = self.record(Call::UseProgram(program));
        if program != 0 {
            match state.programs.get(&program).map(|p| &p.linked) {
                Some(Some(Ok(_))) => {}
                Some(_) => return state.set_error(gl::INVALID_OPERATION),
                None => return state.set_error(gl::INVALID_VALUE),
            }
        }
        state.program = program;
    }

    fn delete_program(&self, program: GLuint) {
        let mut state = self.record(Call::DeleteProgram(program));
        if program == 0 {
            return;
        }
        if state.programs.remove(&program).is_none() {
            return state.set_error(gl::INVALID_VALUE);
        }
        if state.program == program {
            state.program = 0;
        }
    }

    fn gen_buffer(&self) -> GLuint {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.buffers.insert(id, Vec::new());
        state.trace.push(Call::GenBuffer(id));
        id
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        let mut state = self.record(Call::BindBuffer(target, buffer));
        if buffer != 0 && !state.buffers.contains_key(&buffer) {
            return state.set_error(gl::INVALID_OPERATION);
        }
        match target {
            gl::ARRAY_BUFFER => state.array_buffer = buffer,
            gl::ELEMENT_ARRAY_BUFFER => state.bound_vertex_array().element_buffer = buffer,
            _ => state.set_error(gl::INVALID_ENUM),
        }
    }

    fn buffer_data(&self, target: GLenum, data: &[u8], _usage: GLenum) {
        let mut state = self.record(Call::BufferData(target, data.len()));
        let bound = match target {
            gl::ARRAY_BUFFER => state.array_buffer,
            gl::ELEMENT_ARRAY_BUFFER => state.bound_vertex_array().element_buffer,
            _ => return state.set_error(gl::INVALID_ENUM),
        };
        if bound == 0 {
            return state.set_error(gl::INVALID_OPERATION);
        }
        match state.buffers.get_mut(&bound) {
            Some(store) => *store = data.to_vec(),
            None => state.set_error(gl::INVALID_OPERATION),
        }
    }

    fn delete_buffer(&self, buffer: GLuint) {
        let mut state = self.record(Call::DeleteBuffer(buffer));
        if buffer == 0 || state.buffers.remove(&buffer).is_none() {
            return;
        }
        if state.array_buffer == buffer {
            state.array_buffer = 0;
        }
        let vao = state.bound_vertex_array();
        if vao.element_buffer == buffer {
            vao.element_buffer = 0;
        }
    }

    fn gen_vertex_array(&self) -> GLuint {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.vertex_arrays.insert(id, VertexArrayObject::default());
        state.trace.push(Call::GenVertexArray(id));
        id
    }

    fn bind_vertex_array(&self, array: GLuint) {
        let mut state = self.record(Call::BindVertexArray(array));
        if array != 0 && !state.vertex_arrays.contains_key(&array) {
            return state.set_error(gl::INVALID_OPERATION);
        }
        state.vertex_array = array;
    }

    fn delete_vertex_array(&self, array: GLuint) {
        let mut state = self.record(Call::DeleteVertexArray(array));
        if array == 0 || state.vertex_arrays.remove(&array).is_none() {
            return;
        }
        if state.vertex_array == array {
            state.vertex_array = 0;
        }
    }

    fn vertex_attrib_pointer(&self, format: &AttribFormat) {
        let mut state = self.record(Call::VertexAttribPointer(*format));
        if format.slot >= MAX_VERTEX_ATTRIBS || format.components < 1 || format.components > 4 || format.stride < 0 {
            return state.set_error(gl::INVALID_VALUE);
        }
        if state.vertex_array == 0 || state.array_buffer == 0 {
            return state.set_error(gl::INVALID_OPERATION);
        }
        let buffer = state.array_buffer;
        state
            .bound_vertex_array()
            .attribs
            .insert(format.slot, AttribState { buffer, format: *format });
    }

    fn enable_vertex_attrib_array(&self, slot: GLuint) {
        let mut state = self.record(Call::EnableVertexAttribArray(slot));
        if slot >= MAX_VERTEX_ATTRIBS {
            return state.set_error(gl::INVALID_VALUE);
        }
        if state.vertex_array == 0 {
            return state.set_error(gl::INVALID_OPERATION);
        }
        state.bound_vertex_array().enabled.insert(slot);
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        let mut state = self.record(Call::DrawArrays { first, count });
        if mode != gl::TRIANGLES {
            return state.set_error(gl::INVALID_ENUM);
        }
        if first < 0 || count < 0 {
            return state.set_error(gl::INVALID_VALUE);
        }

        let state = &mut *state;
        let record = {
            let setup = match draw_setup(state) {
                Ok(setup) => setup,
                Err(code) => return state.set_error(code),
            };
            let (first, count) = (first as usize, count as usize);
            if first + count > setup.vertex_count {
                Err(gl::INVALID_OPERATION)
            } else {
                let vertices = (first..first + count).collect::<Vec<_>>();
                let (triangles, pixels_written) = rasterize(&mut state.framebuffer, state.viewport, &setup, &vertices);
                Ok(DrawRecord {
                    program: state.program,
                    vertex_array: setup.vertex_array,
                    first,
                    vertices_submitted: count,
                    index_fetches: 0,
                    max_index: None,
                    triangles,
                    pixels_written,
                })
            }
        };
        match record {
            Ok(record) => state.draws.push(record),
            Err(code) => state.set_error(code),
        }
    }

    fn draw_elements(&self, mode: GLenum, count: GLsizei, index_type: GLenum, offset: usize) {
        let mut state = self.record(Call::DrawElements { count, index_type, offset });
        if mode != gl::TRIANGLES {
            return state.set_error(gl::INVALID_ENUM);
        }
        let index_size = match index_type {
            gl::UNSIGNED_BYTE => 1,
            gl::UNSIGNED_SHORT => 2,
            gl::UNSIGNED_INT => 4,
            _ => return state.set_error(gl::INVALID_ENUM),
        };
        if count < 0 {
            return state.set_error(gl::INVALID_VALUE);
        }

        let state = &mut *state;
        let record = {
            let setup = match draw_setup(state) {
                Ok(setup) => setup,
                Err(code) => return state.set_error(code),
            };
            let element_buffer = state.vertex_arrays[&setup.vertex_array].element_buffer;
            if element_buffer == 0 {
                return state.set_error(gl::INVALID_OPERATION);
            }
            let indices = match state.buffers.get(&element_buffer) {
                Some(bytes) => bytes,
                None => return state.set_error(gl::INVALID_OPERATION),
            };
            let count = count as usize;
            if offset + count * index_size > indices.len() {
                Err(gl::INVALID_OPERATION)
            } else {
                let vertices = (0..count)
                    .map(|i| read_index(indices, offset + i * index_size, index_type) as usize)
                    .collect::<Vec<_>>();
                if vertices.iter().any(|&v| v >= setup.vertex_count) {
                    Err(gl::INVALID_OPERATION)
                } else {
                    let (triangles, pixels_written) =
                        rasterize(&mut state.framebuffer, state.viewport, &setup, &vertices);
                    Ok(DrawRecord {
                        program: state.program,
                        vertex_array: setup.vertex_array,
                        first: 0,
                        vertices_submitted: count,
                        index_fetches: count,
                        max_index: vertices.iter().max().map(|&v| v as u32),
                        triangles,
                        pixels_written,
                    })
                }
            }
        };
        match record {
            Ok(record) => state.draws.push(record),
            Err(code) => state.set_error(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(slot: GLuint) -> AttribFormat {
        AttribFormat {
            slot,
            components: 3,
            component_type: gl::FLOAT,
            normalized: false,
            integer: false,
            stride: 12,
            offset: 0,
        }
    }

    #[test]
    fn first_error_wins_and_is_reset_by_reading() {
        let device = SoftDevice::new(4, 4);
        device.create_shader(gl::ARRAY_BUFFER);
        device.viewport(0, 0, -1, 1);
        assert_eq!(device.get_error(), gl::INVALID_ENUM);
        assert_eq!(device.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn core_profile_needs_a_vertex_array_for_layouts() {
        let device = SoftDevice::new(4, 4);
        let vbo = device.gen_buffer();
        device.bind_buffer(gl::ARRAY_BUFFER, vbo);
        device.vertex_attrib_pointer(&format(0));
        assert_eq!(device.get_error(), gl::INVALID_OPERATION);
    }

    #[test]
    fn element_binding_belongs_to_the_vertex_array() {
        let device = SoftDevice::new(4, 4);
        let vao = device.gen_vertex_array();
        let ebo = device.gen_buffer();
        device.bind_vertex_array(vao);
        device.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, ebo);
        device.bind_vertex_array(0);
        assert_eq!(device.element_binding(vao), Some(ebo));
        assert_eq!(device.element_binding(0), Some(0));

        // Unbinding while the array is bound erases the recorded binding
        device.bind_vertex_array(vao);
        device.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, 0);
        assert_eq!(device.element_binding(vao), Some(0));
        assert_eq!(device.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn draws_without_a_program_fail() {
        let device = SoftDevice::new(4, 4);
        let vao = device.gen_vertex_array();
        device.bind_vertex_array(vao);
        device.draw_arrays(gl::TRIANGLES, 0, 3);
        assert_eq!(device.get_error(), gl::INVALID_OPERATION);
        assert!(device.draws().is_empty());
    }

    #[test]
    fn clear_fills_with_the_clear_color() {
        let device = SoftDevice::new(2, 2);
        device.clear_color(0.25, 0.5, 0.75, 1.0);
        device.clear(gl::COLOR_BUFFER_BIT);
        assert!(device.framebuffer().pixels().iter().all(|p| *p == [0.25, 0.5, 0.75, 1.0]));
    }
}
