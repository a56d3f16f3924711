//! The plane-extraction pipeline.
//!
//! Four stages run strictly forward over a mesh snapshot: [`bucket`] classifies
//! triangles and groups them by quantized plane equation, [`frame`] projects each
//! group into 2D plane coordinates, [`cluster`] splits a group into spatially
//! contiguous patches, and [`boundary`] traces each patch's perimeter into a
//! simplified polygon. [`PlaneExtractor::detect`] wires the stages together;
//! the stage modules are public so the pipeline can also be driven piecemeal.

use crate::errors::ValidationError;
use crate::float_types::{EPSILON, Real};
use crate::mesh::TriangleSoup;
use nalgebra::{Point2, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub mod boundary;
pub mod bucket;
pub mod cluster;
pub mod frame;

use bucket::CoplanarBucket;
use frame::LocalFrame;

/// Coarse orientation of a surface relative to the configured up vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl core::fmt::Display for Orientation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

/// Tunable parameters of the pipeline.
///
/// All tolerances are absolute and do not scale with scene size; very large or
/// very small meshes may need the quantization steps adjusted.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Planes whose simplified polygon encloses less than this area are dropped.
    /// Also applied as an early reject on whole coplanar buckets.
    pub min_area: Real,
    /// Maximum gap, in local plane units, across which two triangles still count
    /// as connected.
    pub clustering_threshold: Real,
    /// Quantization step for plane normals and offsets when bucketing. Triangles
    /// whose plane equation differs by more than this will not share a bucket,
    /// even if visually coplanar.
    pub plane_quantization: Real,
    /// Quantization step collapsing near-coincident 2D vertices during boundary
    /// tracing.
    pub vertex_quantization: Real,
    /// `|normal · up|` at or above this classifies a triangle as horizontal.
    pub horizontal_dot: Real,
    /// `|normal · up|` at or below this classifies a triangle as vertical.
    /// Triangles between the two thresholds are discarded entirely.
    pub vertical_dot: Real,
    /// Dot product of adjacent edge directions above which the shared polygon
    /// vertex is removed as collinear.
    pub collinear_dot: Real,
    /// The up vector triangles are classified against. Need not be unit length.
    pub up: Vector3<Real>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            min_area: 0.1,
            clustering_threshold: 0.2,
            plane_quantization: 0.01,
            vertex_quantization: 0.001,
            horizontal_dot: 0.9,
            vertical_dot: 0.1,
            collinear_dot: 0.999,
            up: Vector3::y(),
        }
    }
}

impl ExtractOptions {
    /// Check every parameter for the ranges the pipeline assumes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("min_area", self.min_area),
            ("clustering_threshold", self.clustering_threshold),
            ("plane_quantization", self.plane_quantization),
            ("vertex_quantization", self.vertex_quantization),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::NonPositiveOption { name, value });
            }
        }
        for (name, value) in [
            ("horizontal_dot", self.horizontal_dot),
            ("vertical_dot", self.vertical_dot),
            ("collinear_dot", self.collinear_dot),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::OptionOutOfRange { name, value });
            }
        }
        if !(self.up.x.is_finite() && self.up.y.is_finite() && self.up.z.is_finite())
            || self.up.norm_squared() < EPSILON
        {
            return Err(ValidationError::DegenerateUp);
        }
        Ok(())
    }
}

/// A planar surface reconstructed from one contiguous cluster of coplanar triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPlane {
    /// Horizontal or vertical, per the classifier thresholds.
    pub orientation: Orientation,
    /// Area enclosed by `polygon`, in world units squared.
    pub area: Real,
    /// Centroid of the cluster's vertices; the origin of the plane's local frame.
    pub position: Point3<Real>,
    /// Rotation of the plane in world space. Applying it to (0, 1, 0) yields the
    /// plane's normal.
    pub rotation: UnitQuaternion<Real>,
    /// The boundary in local plane coordinates, implicitly closed (the first point
    /// is not repeated). At least 3 points, no two consecutive collinear.
    pub polygon: Vec<Point2<Real>>,
}

impl DetectedPlane {
    /// The plane's unit normal in world space.
    pub fn normal(&self) -> Vector3<Real> {
        self.rotation * Vector3::y()
    }

    /// Lift the boundary polygon back into world space. A local point (x, y) lies
    /// at `position + rotation · (x, 0, y)`.
    pub fn world_polygon(&self) -> Vec<Point3<Real>> {
        self.polygon
            .iter()
            .map(|p| self.position + self.rotation * Vector3::new(p.x, 0.0, p.y))
            .collect()
    }

    /// The boundary as a closed [`geo`] polygon, for downstream 2D processing.
    pub fn to_geo(&self) -> geo::Polygon<Real> {
        let coords: Vec<geo::Coord<Real>> = self
            .polygon
            .iter()
            .map(|p| geo::Coord { x: p.x, y: p.y })
            .collect();
        geo::Polygon::new(geo::LineString::new(coords), Vec::new())
    }
}

/// Run the pipeline over `soup` with [`ExtractOptions::default`].
pub fn extract_planes(soup: &TriangleSoup) -> Vec<DetectedPlane> {
    PlaneExtractor::default().detect(soup)
}

/// A validated pipeline configuration.
///
/// `detect` holds no state between invocations and is safe to call from several
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct PlaneExtractor {
    options: ExtractOptions,
}

impl PlaneExtractor {
    /// Create an extractor, validating `options` once up front so that `detect`
    /// can stay infallible.
    pub fn new(options: ExtractOptions) -> Result<Self, ValidationError> {
        options.validate()?;
        Ok(PlaneExtractor { options })
    }

    pub const fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Run the full pipeline. An empty result is a valid outcome for meshes with
    /// no large flat regions, not an error.
    ///
    /// Output order is deterministic for a given soup, but carries no priority.
    pub fn detect(&self, soup: &TriangleSoup) -> Vec<DetectedPlane> {
        let mut buckets: Vec<(bucket::PlaneKey, CoplanarBucket)> =
            bucket::classify(soup, &self.options)
                .into_iter()
                .filter(|(_, b)| b.total_area >= self.options.min_area)
                .collect();
        // Hash order would leak into the output order; sort to keep repeated
        // runs identical.
        buckets.sort_by_key(|(key, _)| *key);
        let buckets: Vec<CoplanarBucket> = buckets.into_iter().map(|(_, b)| b).collect();
        self.process_buckets(&buckets)
    }

    #[cfg(not(feature = "parallel"))]
    fn process_buckets(&self, buckets: &[CoplanarBucket]) -> Vec<DetectedPlane> {
        buckets
            .iter()
            .flat_map(|bucket| self.process_bucket(bucket))
            .collect()
    }

    /// Buckets are independent; stages 3 and 4 run per bucket on the rayon pool.
    #[cfg(feature = "parallel")]
    fn process_buckets(&self, buckets: &[CoplanarBucket]) -> Vec<DetectedPlane> {
        buckets
            .par_iter()
            .flat_map(|bucket| self.process_bucket(bucket))
            .collect()
    }

    fn process_bucket(&self, bucket: &CoplanarBucket) -> Vec<DetectedPlane> {
        let Some(origin) = bucket.vertices.first().copied() else {
            return Vec::new();
        };
        let frame = LocalFrame::from_normal(&bucket.normal);
        // Project relative to the bucket's first vertex; any fixed reference keeps
        // the 2D coordinates small enough for the grid.
        let local: Vec<Point2<Real>> = bucket
            .vertices
            .iter()
            .map(|&vertex| frame.project(vertex - origin))
            .collect();
        let mut clusters =
            cluster::connected_clusters(&local, self.options.clustering_threshold);
        clusters.sort_by_key(|triangles| triangles[0]);

        let mut planes = Vec::new();
        for triangles in clusters {
            let mut vertices = Vec::with_capacity(triangles.len() * 3);
            for &triangle in &triangles {
                let base = triangle as usize * 3;
                vertices.extend_from_slice(&bucket.vertices[base..base + 3]);
            }
            if let Some(plane) =
                boundary::trace(&vertices, &frame, bucket.orientation, &self.options)
            {
                planes.push(plane);
            }
        }
        planes
    }
}
