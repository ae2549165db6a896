use gl;
use gl::types::*;
use log::{debug, warn};
use std::marker::PhantomData;
use std::mem;
use std::slice;

use super::device::Device;
use super::error::GlResult;

mod sealed {
    pub trait Sealed {}
}

pub trait BufferTarget: sealed::Sealed {
    const TARGET: GLenum;
}

macro_rules! buffer_target {
    ($name:ident : $enum:expr) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
        pub struct $name;
        impl sealed::Sealed for $name {}
        impl BufferTarget for $name {
            const TARGET: GLenum = $enum;
        }
    };
}

buffer_target!(Array: gl::ARRAY_BUFFER);
buffer_target!(Element: gl::ELEMENT_ARRAY_BUFFER);

/// Usage type for buffers, provided as a performance hint. These values do not affect the behavior
/// of the buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum UsageType {
    /// Specified once by the application, and sourced many times.
    StaticDraw = gl::STATIC_DRAW,
}

/// A buffer object of `T`s living on `device`.
///
/// The borrow of the device keeps the buffer from outliving the context that
/// owns it; the buffer name is deleted when this is dropped.
pub struct Buffer<'d, D: Device + ?Sized, T, B: BufferTarget> {
    device: &'d D,
    id: GLuint,
    length: usize,
    _phantom: PhantomData<(*mut T, B)>,
}

impl<'d, D: Device + ?Sized, T: Copy, B: BufferTarget> Buffer<'d, D, T, B> {
    pub fn new(device: &'d D) -> GlResult<Self> {
        let id = gl_call!(device, gen_buffer())?;
        debug!("generated buffer {} (target 0x{:04X})", id, B::TARGET);
        Ok(Buffer {
            device,
            id,
            length: 0,
            _phantom: PhantomData,
        })
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn bind(&self) -> GlResult<()> {
        gl_call!(self.device, bind_buffer(B::TARGET, self.id))
    }

    /// Copies data from `data` to the gpu's memory. Binds the buffer first, so
    /// for element buffers the vertex array that should record the binding
    /// must already be bound.
    pub fn upload(&mut self, data: &[T], usage_type: UsageType) -> GlResult<()> {
        self.bind()?;
        self.length = data.len();
        // Could fail if OOM
        gl_call!(self.device, buffer_data(B::TARGET, as_bytes(data), usage_type as GLenum))
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<'d, D: Device + ?Sized, T, B: BufferTarget> Drop for Buffer<'d, D, T, B> {
    fn drop(&mut self) {
        if let Err(err) = gl_call!(self.device, delete_buffer(self.id)) {
            warn!("failed to delete buffer {}: {}", self.id, err);
        }
    }
}

/// Unbinds whatever is bound to `B`'s target.
pub fn unbind<D: Device + ?Sized, B: BufferTarget>(device: &D) -> GlResult<()> {
    gl_call!(device, bind_buffer(B::TARGET, 0))
}

fn as_bytes<T: Copy>(data: &[T]) -> &[u8] {
    // SAFETY: `T` is plain data (`Copy`, and only vertex/index types are
    // uploaded), and the length covers exactly the slice's memory.
    unsafe { slice::from_raw_parts(data.as_ptr() as *const u8, mem::size_of::<T>() * data.len()) }
}

pub type VertexBuffer<'d, D, T> = Buffer<'d, D, T, Array>;
pub type ElementBuffer<'d, D, T> = Buffer<'d, D, T, Element>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::soft::{Call, SoftDevice};

    #[test]
    fn upload_binds_then_fills() {
        let device = SoftDevice::new(4, 4);
        let mut buffer: VertexBuffer<_, f32> = Buffer::new(&device).unwrap();
        buffer.upload(&[1.0, 2.0, 3.0], UsageType::StaticDraw).unwrap();

        assert_eq!(buffer.len(), 3);
        assert_eq!(device.buffer_contents(buffer.id()).unwrap().len(), 12);
        let trace = device.trace();
        let bind = trace.iter().position(|c| *c == Call::BindBuffer(gl::ARRAY_BUFFER, buffer.id()));
        let fill = trace.iter().position(|c| *c == Call::BufferData(gl::ARRAY_BUFFER, 12));
        assert!(bind.unwrap() < fill.unwrap());
    }

    #[test]
    fn drop_deletes_the_buffer() {
        let device = SoftDevice::new(4, 4);
        let id = {
            let buffer: ElementBuffer<_, u32> = Buffer::new(&device).unwrap();
            buffer.id()
        };
        assert!(device.trace().contains(&Call::DeleteBuffer(id)));
        assert!(device.buffer_contents(id).is_none());
    }
}
