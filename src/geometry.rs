use cgmath::Vector3;
use gl;
use gl::types::*;
use log::debug;
use thiserror::Error;

use crate::gl_api::buffer::{self, Array, Buffer, ElementBuffer, UsageType, VertexBuffer};
use crate::gl_api::layout::{AttribFormat, VertexAttribute};
use crate::gl_api::vertex_array::VertexArray;
use crate::gl_api::{Device, GlError, GlResult};
use crate::mesh::{DrawCall, Mesh};

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("vertex layout {0:?} is not tightly packed")]
    Layout(AttribFormat),
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// A mesh living in GPU memory: its vertex buffer, its index buffer if it has
/// one, and the vertex array describing both.
pub struct Geometry<'d, D: Device + ?Sized> {
    // Field order is drop order.
    vertices: VertexBuffer<'d, D, Vector3<f32>>,
    indices: Option<ElementBuffer<'d, D, u32>>,
    vao: VertexArray<'d, D>,
    device: &'d D,
    draw: DrawCall,
}

impl<'d, D: Device + ?Sized> Geometry<'d, D> {
    /// Uploads `mesh` with `STATIC_DRAW`.
    ///
    /// The vertex array is bound before either buffer so that it records the
    /// element buffer binding, and unbound only after the array buffer was
    /// unbound. Nothing stays bound on success.
    pub fn upload(device: &'d D, mesh: &Mesh) -> Result<Self, GeometryError> {
        let formats = <Vector3<f32> as VertexAttribute>::formats(0, 0);
        if let Some(format) = formats.iter().find(|format| !format.is_tightly_packed()) {
            return Err(GeometryError::Layout(*format));
        }

        let mut vao = VertexArray::new(device)?;
        vao.bind()?;

        let mut vertices: VertexBuffer<'d, D, Vector3<f32>> = Buffer::new(device)?;
        vertices.upload(mesh.positions(), UsageType::StaticDraw)?;
        vao.add_buffer(&vertices)?;

        let indices = match mesh.indices() {
            Some(data) => {
                let mut indices: ElementBuffer<'d, D, u32> = Buffer::new(device)?;
                vao.set_element_buffer(&indices)?;
                indices.upload(data, UsageType::StaticDraw)?;
                Some(indices)
            }
            None => None,
        };

        buffer::unbind::<D, Array>(device)?;
        vao.unbind()?;

        debug!(
            "uploaded {} vertices and {} indices into vertex array {}",
            vertices.len(),
            indices.as_ref().map_or(0, |indices| indices.len()),
            vao.id()
        );

        Ok(Geometry {
            vertices,
            indices,
            vao,
            device,
            draw: mesh.draw_call(),
        })
    }

    /// Binds the vertex array and issues the mesh's draw call. The program to
    /// draw with must already be in use.
    pub fn draw(&self) -> GlResult<()> {
        self.vao.bind()?;
        match self.draw {
            DrawCall::Arrays { first, count } => {
                gl_call!(self.device, draw_arrays(gl::TRIANGLES, first, count))
            }
            DrawCall::Elements { count, index_type, offset } => {
                gl_call!(self.device, draw_elements(gl::TRIANGLES, count, index_type, offset))
            }
        }
    }

    pub fn draw_call(&self) -> DrawCall {
        self.draw
    }

    pub fn vertex_array_id(&self) -> GLuint {
        self.vao.id()
    }

    pub fn vertex_buffer_id(&self) -> GLuint {
        self.vertices.id()
    }

    pub fn element_buffer_id(&self) -> Option<GLuint> {
        self.indices.as_ref().map(|indices| indices.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::shader::simple_pipeline;
    use crate::gl_api::soft::{Call, SoftDevice};
    use crate::scene::{Scene, FRAGMENT_SHADER, VERTEX_SHADER};

    fn nested() -> Mesh {
        Scene::Nested.mesh().unwrap().unwrap()
    }

    fn position(trace: &[Call], call: Call) -> usize {
        trace
            .iter()
            .position(|c| *c == call)
            .unwrap_or_else(|| panic!("{:?} not in trace", call))
    }

    #[test]
    fn vertex_array_is_bound_before_the_buffers_are_filled() {
        let device = SoftDevice::new(8, 8);
        let geometry = Geometry::upload(&device, &nested()).unwrap();
        let trace = device.trace();

        let vao = geometry.vertex_array_id();
        let bind_vao = position(&trace, Call::BindVertexArray(vao));
        let fill_vbo = position(&trace, Call::BufferData(gl::ARRAY_BUFFER, 6 * 12));
        let enable = position(&trace, Call::EnableVertexAttribArray(0));
        let fill_ebo = position(&trace, Call::BufferData(gl::ELEMENT_ARRAY_BUFFER, 9 * 4));
        let unbind_vbo = position(&trace, Call::BindBuffer(gl::ARRAY_BUFFER, 0));
        let unbind_vao = position(&trace, Call::BindVertexArray(0));

        assert!(bind_vao < fill_vbo);
        assert!(fill_vbo < enable);
        assert!(enable < fill_ebo);
        assert!(fill_ebo < unbind_vbo);
        assert!(unbind_vbo < unbind_vao);
        assert!(!trace.contains(&Call::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, 0)));
    }

    #[test]
    fn element_buffer_binding_survives_unbinding() {
        let device = SoftDevice::new(8, 8);
        let geometry = Geometry::upload(&device, &nested()).unwrap();

        assert_eq!(device.element_binding(geometry.vertex_array_id()), geometry.element_buffer_id());
        assert_eq!(device.element_binding(0), Some(0));
        assert_eq!(device.bound_vertex_array(), 0);
        assert_eq!(device.bound_array_buffer(), 0);
    }

    #[test]
    fn layout_is_three_tightly_packed_floats_in_slot_zero() {
        let device = SoftDevice::new(8, 8);
        let _geometry = Geometry::upload(&device, &nested()).unwrap();
        let format = device
            .trace()
            .into_iter()
            .filter_map(|call| match call {
                Call::VertexAttribPointer(format) => Some(format),
                _ => None,
            })
            .next()
            .unwrap();

        assert_eq!(format.slot, 0);
        assert_eq!(format.components, 3);
        assert_eq!(format.component_type, gl::FLOAT);
        assert!(!format.normalized);
        assert_eq!(format.stride, 12);
        assert_eq!(format.offset, 0);
    }

    #[test]
    fn uploads_are_byte_identical() {
        let first = SoftDevice::new(8, 8);
        let second = SoftDevice::new(8, 8);
        let a = Geometry::upload(&first, &nested()).unwrap();
        let b = Geometry::upload(&second, &nested()).unwrap();

        assert_eq!(
            first.buffer_contents(a.vertex_buffer_id()),
            second.buffer_contents(b.vertex_buffer_id())
        );
        assert_eq!(
            first.buffer_contents(a.element_buffer_id().unwrap()),
            second.buffer_contents(b.element_buffer_id().unwrap())
        );
    }

    #[test]
    fn indexed_draw_fetches_every_index() {
        let device = SoftDevice::new(32, 32);
        let program = simple_pipeline(&device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        let geometry = Geometry::upload(&device, &nested()).unwrap();
        program.bind().unwrap();
        geometry.draw().unwrap();

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_fetches, 9);
        assert_eq!(draws[0].max_index, Some(5));
        assert_eq!(draws[0].triangles, 3);
    }

    #[test]
    fn sequential_draw_starts_at_vertex_zero() {
        let device = SoftDevice::new(32, 32);
        let program = simple_pipeline(&device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        let geometry = Geometry::upload(&device, &Scene::Triangle.mesh().unwrap().unwrap()).unwrap();
        program.bind().unwrap();
        geometry.draw().unwrap();

        let draws = device.draws();
        assert_eq!(draws[0].first, 0);
        assert_eq!(draws[0].vertices_submitted, 3);
        assert_eq!(draws[0].index_fetches, 0);
        assert_eq!(geometry.element_buffer_id(), None);
    }

    #[test]
    fn drop_releases_buffers_before_the_vertex_array() {
        let device = SoftDevice::new(8, 8);
        let geometry = Geometry::upload(&device, &nested()).unwrap();
        let (vao, vbo, ebo) = (
            geometry.vertex_array_id(),
            geometry.vertex_buffer_id(),
            geometry.element_buffer_id().unwrap(),
        );
        device.clear_trace();
        drop(geometry);

        assert_eq!(
            device.trace(),
            vec![Call::DeleteBuffer(vbo), Call::DeleteBuffer(ebo), Call::DeleteVertexArray(vao)]
        );
        assert_eq!(device.live_objects(), 0);
    }
}
