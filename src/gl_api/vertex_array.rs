use gl::types::*;
use log::{debug, warn};

use super::buffer::{ElementBuffer, VertexBuffer};
use super::device::Device;
use super::error::GlResult;
use super::layout::{IndexType, VertexAttribute};

#[derive(Debug)]
pub struct VertexArray<'d, D: Device + ?Sized> {
    device: &'d D,
    id: GLuint,
    index: usize,
    _marker: ::std::marker::PhantomData<*mut ()>,
}

impl<'d, D: Device + ?Sized> VertexArray<'d, D> {
    pub fn new(device: &'d D) -> GlResult<Self> {
        let id = gl_call!(device, gen_vertex_array())?;
        debug!("generated vertex array {}", id);
        Ok(VertexArray {
            device,
            id,
            index: 0,
            _marker: ::std::marker::PhantomData,
        })
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn bind(&self) -> GlResult<()> {
        gl_call!(self.device, bind_vertex_array(self.id))
    }

    pub fn unbind(&self) -> GlResult<()> {
        gl_call!(self.device, bind_vertex_array(0))
    }

    /// Binds this array, then `buffer`, and describes `T`'s layout into the
    /// next free attribute slots.
    // NOTE: need explicit lifetimes here because the buffer needs to outlive
    // `self`
    pub fn add_buffer<'s, 'b: 's, T: VertexAttribute>(
        &'s mut self,
        buffer: &'b VertexBuffer<'d, D, T>,
    ) -> GlResult<()> {
        self.bind()?;
        buffer.bind()?;

        self.index += T::define_attribs(self.device, self.index as u32, 0)? as usize;

        Ok(())
    }

    /// Records `buffer` as this array's element buffer. The array stays bound
    /// afterwards; unbinding the element buffer before the array would erase
    /// the recorded binding.
    pub fn set_element_buffer<'s, 'b: 's, I: IndexType>(
        &'s mut self,
        buffer: &'b ElementBuffer<'d, D, I>,
    ) -> GlResult<()> {
        self.bind()?;
        buffer.bind()?;
        Ok(())
    }
}

impl<'d, D: Device + ?Sized> Drop for VertexArray<'d, D> {
    fn drop(&mut self) {
        if let Err(err) = gl_call!(self.device, delete_vertex_array(self.id)) {
            warn!("failed to delete vertex array {}: {}", self.id, err);
        }
    }
}
