use cgmath::Vector3;
use gl;
use gl::types::*;

use super::device::Device;
use super::error::GlResult;

/// How one attribute slot reads its bytes out of the bound array buffer.
/// This is the argument list of `glVertexAttrib{I}Pointer`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AttribFormat {
    pub slot: GLuint,
    pub components: GLint,
    pub component_type: GLenum,
    pub normalized: bool,
    /// Uses `glVertexAttribIPointer`, keeping the values integral.
    pub integer: bool,
    pub stride: GLsizei,
    pub offset: usize,
}

impl AttribFormat {
    pub fn component_size(&self) -> usize {
        component_size(self.component_type)
    }

    /// Whether consecutive vertices follow each other with no padding. For a
    /// buffer holding a single attribute this must hold, or every vertex past
    /// the first is read from the wrong bytes.
    pub fn is_tightly_packed(&self) -> bool {
        self.stride as usize == self.components as usize * self.component_size()
    }
}

pub fn component_size(ty: GLenum) -> usize {
    match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 4,
        gl::DOUBLE => 8,
        _ => 0,
    }
}

pub unsafe trait VertexAttribute: Copy {
    /// The attribute formats this type occupies, starting at `base_slot`, with
    /// `offset` bytes before the first component.
    fn formats(base_slot: u32, offset: usize) -> Vec<AttribFormat>;

    /// Issue the appropriate calls to `glVertexAttrib{I}Pointer` based on the
    /// layout of this type and enable every slot. Returns the number of slots
    /// used, so the caller can compute the next free slot.
    fn define_attribs<D: Device + ?Sized>(device: &D, base_slot: u32, offset: usize) -> GlResult<u32> {
        let formats = Self::formats(base_slot, offset);
        for format in &formats {
            gl_call!(device, vertex_attrib_pointer(format))?;
            gl_call!(device, enable_vertex_attrib_array(format.slot))?;
        }
        Ok(formats.len() as u32)
    }
}

macro_rules! layout_simple {
    ($type:ty: $gl_type:ident $amount:expr) => {
        layout_simple!(@IMPL $type: $gl_type $amount, false);
    };
    ($type:ty: iptr $gl_type:ident $amount:expr) => {
        layout_simple!(@IMPL $type: $gl_type $amount, true);
    };
    (@IMPL $type:ty: $gl_type:ident $amount:expr, $integer:expr) => {
        unsafe impl VertexAttribute for $type {
            fn formats(slot: u32, offset: usize) -> Vec<AttribFormat> {
                vec![AttribFormat {
                    slot,
                    components: $amount,
                    component_type: gl::$gl_type,
                    normalized: false,
                    integer: $integer,
                    stride: ::std::mem::size_of::<Self>() as GLsizei,
                    offset,
                }]
            }
        }
    };
}

layout_simple!(Vector3<f32>: FLOAT 3);

layout_simple!(u32: iptr UNSIGNED_INT 1);

/// Types that can live in an element buffer.
pub unsafe trait IndexType: Copy {
    const GL_TYPE: GLenum;
}

unsafe impl IndexType for u32 {
    const GL_TYPE: GLenum = gl::UNSIGNED_INT;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_tightly_packed_floats() {
        let formats = <Vector3<f32> as VertexAttribute>::formats(0, 0);
        assert_eq!(formats.len(), 1);
        let format = formats[0];
        assert_eq!(format.slot, 0);
        assert_eq!(format.components, 3);
        assert_eq!(format.component_type, gl::FLOAT);
        assert_eq!(format.stride as usize, 3 * ::std::mem::size_of::<f32>());
        assert_eq!(format.offset, 0);
        assert!(!format.normalized);
        assert!(format.is_tightly_packed());
    }

    #[test]
    fn padded_stride_is_not_tightly_packed() {
        let mut format = <Vector3<f32> as VertexAttribute>::formats(0, 0)[0];
        format.stride = 16;
        assert!(!format.is_tightly_packed());
    }

    #[test]
    fn integer_layouts_use_the_integer_path() {
        let format = <u32 as VertexAttribute>::formats(2, 8)[0];
        assert!(format.integer);
        assert_eq!(format.slot, 2);
        assert_eq!(format.offset, 8);
        assert_eq!(format.component_size(), 4);
    }
}
