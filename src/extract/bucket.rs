//! Stage one: classify triangles and bucket them by quantized plane equation.

use super::{ExtractOptions, Orientation};
use crate::float_types::{EPSILON, Real};
use crate::mesh::TriangleSoup;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

/// Composite key identifying one quantized plane equation.
///
/// Quantizing the normal and offset is the sole mechanism that merges
/// near-duplicate planes contributed by different meshes; planes differing by
/// more than the quantization step stay in separate buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaneKey {
    orientation: Orientation,
    normal: (i64, i64, i64),
    offset: i64,
}

impl PlaneKey {
    fn new(orientation: Orientation, normal: &Vector3<Real>, offset: Real, step: Real) -> Self {
        PlaneKey {
            orientation,
            normal: (
                (normal.x / step).round() as i64,
                (normal.y / step).round() as i64,
                (normal.z / step).round() as i64,
            ),
            offset: (offset / step).round() as i64,
        }
    }
}

/// All triangles hashed onto one quantized plane, as a flat vertex soup.
#[derive(Debug, Clone)]
pub struct CoplanarBucket {
    pub orientation: Orientation,
    /// Unit normal of the first triangle hashed into the bucket, representative
    /// for the whole group within quantization tolerance.
    pub normal: Vector3<Real>,
    /// Plane constant `d` such that `normal · x + d = 0` on the plane.
    pub offset: Real,
    /// Running sum of member triangle areas. Used as an early reject before the
    /// more expensive clustering stages.
    pub total_area: Real,
    /// Member triangle vertices, three per triangle in discovery order.
    pub vertices: Vec<Point3<Real>>,
}

/// Walk every triangle of the soup, classify it against the up vector, and
/// accumulate it into its plane bucket.
///
/// Degenerate triangles and triangles with an ambiguous orientation (between
/// the vertical and horizontal thresholds) are dropped; this stage never fails.
pub fn classify(
    soup: &TriangleSoup,
    options: &ExtractOptions,
) -> HashMap<PlaneKey, CoplanarBucket> {
    let up = options.up.normalize();
    let mut buckets = HashMap::new();

    for [a, b, c] in soup.triangles() {
        let cross = (b - a).cross(&(c - a));
        let double_area = cross.norm();
        let area = 0.5 * double_area;
        if area < EPSILON {
            continue;
        }
        let normal = cross / double_area;

        let dot = normal.dot(&up).abs();
        let orientation = if dot >= options.horizontal_dot {
            Orientation::Horizontal
        } else if dot <= options.vertical_dot {
            Orientation::Vertical
        } else {
            // Slanted surfaces carry no orientation label and contribute nothing.
            continue;
        };

        let offset = -normal.dot(&a.coords);
        let key = PlaneKey::new(orientation, &normal, offset, options.plane_quantization);
        let bucket = buckets.entry(key).or_insert_with(|| CoplanarBucket {
            orientation,
            normal,
            offset,
            total_area: 0.0,
            vertices: Vec::new(),
        });
        bucket.total_area += area;
        bucket.vertices.extend_from_slice(&[a, b, c]);
    }
    buckets
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Point3;

    fn soup_of(triangles: &[[[Real; 3]; 3]]) -> TriangleSoup {
        let mut soup = TriangleSoup::new();
        for t in triangles {
            soup.push_triangle(
                Point3::new(t[0][0], t[0][1], t[0][2]),
                Point3::new(t[1][0], t[1][1], t[1][2]),
                Point3::new(t[2][0], t[2][1], t[2][2]),
            );
        }
        soup
    }

    #[test]
    fn classifies_horizontal_and_vertical() {
        let soup = soup_of(&[
            // Flat on the ground, normal along ±y
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            // Upright wall in the x-y plane, normal along ±z
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let buckets = classify(&soup, &ExtractOptions::default());
        assert_eq!(buckets.len(), 2);
        let mut orientations: Vec<Orientation> =
            buckets.values().map(|b| b.orientation).collect();
        orientations.sort();
        assert_eq!(
            orientations,
            vec![Orientation::Horizontal, Orientation::Vertical]
        );
    }

    #[test]
    fn slanted_triangle_is_dropped() {
        // 45 degrees to the up vector: |normal · up| ≈ 0.707
        let soup = soup_of(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 1.0]]]);
        let buckets = classify(&soup, &ExtractOptions::default());
        assert!(buckets.is_empty());
    }

    #[test]
    fn degenerate_sliver_is_dropped() {
        let soup = soup_of(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]]);
        let buckets = classify(&soup, &ExtractOptions::default());
        assert!(buckets.is_empty());
    }

    #[test]
    fn near_coplanar_triangles_share_a_bucket() {
        // 4mm offset along the normal rounds onto the same quantized plane.
        let soup = soup_of(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            [[5.0, 0.004, 0.0], [6.0, 0.004, 0.0], [5.0, 0.004, 1.0]],
        ]);
        let buckets = classify(&soup, &ExtractOptions::default());
        assert_eq!(buckets.len(), 1);
        let bucket = buckets.values().next().unwrap();
        assert_eq!(bucket.vertices.len(), 6);
        assert!((bucket.total_area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offset_planes_stay_separate() {
        let soup = soup_of(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            [[0.0, 3.0, 0.0], [1.0, 3.0, 0.0], [0.0, 3.0, 1.0]],
        ]);
        let buckets = classify(&soup, &ExtractOptions::default());
        assert_eq!(buckets.len(), 2);
        for bucket in buckets.values() {
            assert_eq!(bucket.orientation, Orientation::Horizontal);
        }
    }
}
