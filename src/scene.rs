//! Compiled-in configuration for each program variant.

use cgmath::{Vector3, Vector4};
use std::fmt;

use crate::mesh::{Mesh, MeshError};
use crate::platform::WindowConfig;
use crate::render::Redraw;

pub const VERTEX_SHADER: &str = include_str!("../res/triangle.glslv");
pub const FRAGMENT_SHADER: &str = include_str!("../res/triangle.glslf");

pub const BACKGROUND: Vector4<f32> = Vector4 { x: 0.07, y: 0.13, z: 0.17, w: 1.0 };
/// The color written by `FRAGMENT_SHADER`.
pub const FRAGMENT_COLOR: Vector4<f32> = Vector4 { x: 0.8, y: 0.3, z: 0.02, w: 1.0 };

/// Corners 0-2 are the outer triangle, 3-5 the midpoints of its edges; the
/// middle triangle (3, 4, 5) is left out.
pub const NESTED_INDICES: [u32; 9] = [0, 3, 5, 3, 2, 4, 5, 4, 1];

const SQRT_3: f32 = 1.732_050_8;

/// An equilateral triangle with side 1, centered on the origin.
pub fn triangle_positions() -> Vec<Vector3<f32>> {
    vec![
        Vector3::new(-0.5, -0.5 * SQRT_3 / 3.0, 0.0),
        Vector3::new(0.5, -0.5 * SQRT_3 / 3.0, 0.0),
        Vector3::new(0.0, 0.5 * SQRT_3 * 2.0 / 3.0, 0.0),
    ]
}

/// The triangle corners followed by inner-left, inner-right and inner-down.
pub fn nested_positions() -> Vec<Vector3<f32>> {
    let mut positions = triangle_positions();
    positions.extend_from_slice(&[
        Vector3::new(-0.25, 0.5 * SQRT_3 / 6.0, 0.0),
        Vector3::new(0.25, 0.5 * SQRT_3 / 6.0, 0.0),
        Vector3::new(0.0, -0.5 * SQRT_3 / 3.0, 0.0),
    ]);
    positions
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Scene {
    /// Open a window, make its context current and exit.
    Bootstrap,
    /// Clear the window once, then wait for it to close.
    Blank,
    Triangle,
    Nested,
}

impl Scene {
    pub const ALL: [Scene; 4] = [Scene::Bootstrap, Scene::Blank, Scene::Triangle, Scene::Nested];

    pub fn window_config(self) -> WindowConfig {
        match self {
            Scene::Bootstrap => WindowConfig::new(800, 600, "LearnOpenGL"),
            _ => WindowConfig::new(800, 800, "graphics"),
        }
    }

    /// Whether the scene uses GL at all. `Bootstrap` stops after the context
    /// is current.
    pub fn needs_device(self) -> bool {
        self != Scene::Bootstrap
    }

    /// The scene's geometry, drawn with `VERTEX_SHADER` and `FRAGMENT_SHADER`.
    pub fn mesh(self) -> Result<Option<Mesh>, MeshError> {
        match self {
            Scene::Bootstrap | Scene::Blank => Ok(None),
            Scene::Triangle => Mesh::sequential(triangle_positions()).map(Some),
            Scene::Nested => Mesh::indexed(nested_positions(), NESTED_INDICES.to_vec()).map(Some),
        }
    }

    pub fn redraw(self) -> Redraw {
        match self {
            Scene::Blank => Redraw::Once,
            _ => Redraw::EveryFrame,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scene::Bootstrap => "bootstrap",
            Scene::Blank => "blank",
            Scene::Triangle => "triangle",
            Scene::Nested => "nested",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
