//! OpenGL 3.3 core triangle programs: a window with a current context, a
//! vertex + fragment pipeline, static geometry and a render loop that runs
//! until the window is closed.

#[macro_use]
pub mod gl_api;

pub mod app;
pub mod geometry;
pub mod logging;
pub mod mesh;
pub mod platform;
pub mod render;
pub mod scene;
