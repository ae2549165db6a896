#[macro_use]
pub mod error;

pub mod buffer;
pub mod device;
pub mod layout;
pub mod loader;
pub mod shader;
pub mod soft;
pub mod vertex_array;

pub use self::device::Device;
pub use self::error::{GlError, GlResult};
pub use self::loader::{LoadError, LoadedGl};
pub use self::soft::SoftDevice;
