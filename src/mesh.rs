use cgmath::Vector3;
use gl;
use gl::types::*;
use thiserror::Error;

use crate::gl_api::layout::IndexType;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("{0} vertices or indices do not form whole triangles")]
    IncompleteTriangle(usize),
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// How a mesh is submitted to the pipeline.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DrawCall {
    /// `glDrawArrays(TRIANGLES, first, count)`
    Arrays { first: GLint, count: GLsizei },
    /// `glDrawElements(TRIANGLES, count, index_type, offset)`
    Elements {
        count: GLsizei,
        index_type: GLenum,
        offset: usize,
    },
}

/// Triangle positions, optionally shared between triangles through an index
/// list. Indices are checked against the vertex count on construction, so a
/// `Mesh` can never make the GPU read outside its vertex buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    positions: Vec<Vector3<f32>>,
    indices: Option<Vec<u32>>,
}

impl Mesh {
    /// Every three consecutive positions form a triangle.
    pub fn sequential(positions: Vec<Vector3<f32>>) -> Result<Self, MeshError> {
        if positions.is_empty() {
            return Err(MeshError::Empty);
        }
        if positions.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(positions.len()));
        }
        Ok(Mesh { positions, indices: None })
    }

    /// Every three consecutive indices name the corners of a triangle.
    pub fn indexed(positions: Vec<Vector3<f32>>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if positions.is_empty() || indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(indices.len()));
        }
        let vertex_count = positions.len();
        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange { position, index, vertex_count });
        }
        Ok(Mesh { positions, indices: Some(indices) })
    }

    pub fn positions(&self) -> &[Vector3<f32>] {
        &self.positions
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_ref().map(|indices| &indices[..])
    }

    pub fn triangle_count(&self) -> usize {
        match self.indices {
            Some(ref indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    pub fn draw_call(&self) -> DrawCall {
        match self.indices {
            Some(ref indices) => DrawCall::Elements {
                count: indices.len() as GLsizei,
                index_type: u32::GL_TYPE,
                offset: 0,
            },
            None => DrawCall::Arrays {
                first: 0,
                count: self.positions.len() as GLsizei,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{thread_rng, Rng};

    fn positions(n: usize) -> Vec<Vector3<f32>> {
        (0..n).map(|i| Vector3::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn sequential_meshes_draw_arrays_from_zero() {
        let mesh = Mesh::sequential(positions(3)).unwrap();
        assert_eq!(mesh.draw_call(), DrawCall::Arrays { first: 0, count: 3 });
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn indexed_meshes_draw_elements() {
        let mesh = Mesh::indexed(positions(6), vec![0, 3, 5, 3, 2, 4, 5, 4, 1]).unwrap();
        assert_eq!(
            mesh.draw_call(),
            DrawCall::Elements { count: 9, index_type: gl::UNSIGNED_INT, offset: 0 }
        );
        assert_eq!(mesh.triangle_count(), 3);
    }

    #[test]
    fn rejects_partial_triangles() {
        assert_eq!(Mesh::sequential(positions(4)), Err(MeshError::IncompleteTriangle(4)));
        assert_eq!(
            Mesh::indexed(positions(3), vec![0, 1]),
            Err(MeshError::IncompleteTriangle(2))
        );
        assert_eq!(Mesh::sequential(Vec::new()), Err(MeshError::Empty));
    }

    #[test]
    fn rejects_the_first_out_of_range_index() {
        let err = Mesh::indexed(positions(6), vec![0, 3, 5, 3, 6, 4, 5, 9, 1]).unwrap_err();
        assert_eq!(err, MeshError::IndexOutOfRange { position: 4, index: 6, vertex_count: 6 });
    }

    #[test]
    fn random_index_lists_are_accepted_exactly_when_in_range() {
        let mut rng = thread_rng();
        for _ in 0..200 {
            let vertex_count = rng.gen_range(1, 16);
            let triangles = rng.gen_range(1, 8);
            let indices = (0..triangles * 3)
                .map(|_| rng.gen_range(0, vertex_count as u32 + 2))
                .collect::<Vec<u32>>();
            let in_range = indices.iter().all(|&i| (i as usize) < vertex_count);

            let result = Mesh::indexed(positions(vertex_count), indices);
            assert_eq!(result.is_ok(), in_range, "{:?}", result);
        }
    }
}
