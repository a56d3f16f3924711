//! `TriangleSoup`: the flat, world-space triangle geometry consumed by the pipeline.

use crate::errors::ValidationError;
use crate::float_types::Real;
use nalgebra::{Matrix4, Point3};

/// A read-only snapshot of world-space triangle geometry.
///
/// Every three consecutive points form one triangle. No shared vertex buffer is
/// assumed; indexed meshes are expanded on ingest, so downstream stages can treat
/// the geometry as a plain triangle soup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoup {
    vertices: Vec<Point3<Real>>,
}

impl TriangleSoup {
    /// Create an empty soup.
    pub const fn new() -> Self {
        TriangleSoup { vertices: Vec::new() }
    }

    /// Append a single world-space triangle.
    pub fn push_triangle(&mut self, a: Point3<Real>, b: Point3<Real>, c: Point3<Real>) {
        self.vertices.extend_from_slice(&[a, b, c]);
    }

    /// Build a soup from a flat position buffer (x, y, z triples) and an optional
    /// triangle index buffer. Without indices, positions are consumed sequentially
    /// in triples and a trailing partial triangle is dropped.
    pub fn from_buffers(
        positions: &[Real],
        indices: Option<&[u32]>,
    ) -> Result<Self, ValidationError> {
        Self::build(positions, indices, None)
    }

    /// Like [`TriangleSoup::from_buffers`], applying `transform` to every vertex.
    /// Use this to bring each mesh instance of a scene into world space.
    pub fn from_buffers_transformed(
        positions: &[Real],
        indices: Option<&[u32]>,
        transform: &Matrix4<Real>,
    ) -> Result<Self, ValidationError> {
        Self::build(positions, indices, Some(transform))
    }

    fn build(
        positions: &[Real],
        indices: Option<&[u32]>,
        transform: Option<&Matrix4<Real>>,
    ) -> Result<Self, ValidationError> {
        if positions.len() % 3 != 0 {
            return Err(ValidationError::MismatchedPositions(positions.len()));
        }
        let mut points = Vec::with_capacity(positions.len() / 3);
        for xyz in positions.chunks_exact(3) {
            let mut point = Point3::new(xyz[0], xyz[1], xyz[2]);
            if let Some(transform) = transform {
                point = transform.transform_point(&point);
            }
            if !(point.x.is_finite() && point.y.is_finite() && point.z.is_finite()) {
                return Err(ValidationError::InvalidCoordinate(point));
            }
            points.push(point);
        }
        let vertices = match indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(ValidationError::MismatchedIndices(indices.len()));
                }
                let mut vertices = Vec::with_capacity(indices.len());
                for &index in indices {
                    let point = points.get(index as usize).copied().ok_or(
                        ValidationError::IndexOutOfBounds {
                            index,
                            vertex_count: points.len(),
                        },
                    )?;
                    vertices.push(point);
                }
                vertices
            },
            None => {
                points.truncate(points.len() - points.len() % 3);
                points
            },
        };
        Ok(TriangleSoup { vertices })
    }

    /// Create a soup from STL data using `stl_io`. Accepts ASCII and binary STL.
    #[cfg(feature = "stl-io")]
    #[allow(clippy::unnecessary_cast)]
    pub fn from_stl(stl_data: &[u8]) -> Result<Self, std::io::Error> {
        let mut cursor = std::io::Cursor::new(stl_data);
        let stl_reader = stl_io::create_stl_reader(&mut cursor)?;

        let mut soup = TriangleSoup::new();
        for tri_result in stl_reader {
            let tri = tri_result?;
            soup.push_triangle(
                Point3::new(
                    tri.vertices[0][0] as Real,
                    tri.vertices[0][1] as Real,
                    tri.vertices[0][2] as Real,
                ),
                Point3::new(
                    tri.vertices[1][0] as Real,
                    tri.vertices[1][1] as Real,
                    tri.vertices[1][2] as Real,
                ),
                Point3::new(
                    tri.vertices[2][0] as Real,
                    tri.vertices[2][1] as Real,
                    tri.vertices[2][2] as Real,
                ),
            );
        }
        Ok(soup)
    }

    /// Append another soup's triangles, accumulating a multi-mesh scene snapshot.
    pub fn append(&mut self, other: &TriangleSoup) {
        self.vertices.extend_from_slice(&other.vertices);
    }

    /// Number of whole triangles in the soup.
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The flat vertex sequence, three points per triangle.
    pub fn vertices(&self) -> &[Point3<Real>] {
        &self.vertices
    }

    /// Iterate over the triangles of the soup.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<Real>; 3]> + '_ {
        self.vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}
