//! Stage two: the local 2D coordinate frame of a coplanar bucket.

use crate::float_types::{PI, Real};
use nalgebra::{Point2, UnitQuaternion, Vector3};

/// Rotation aligning the canonical +Y axis with a bucket's normal, plus its
/// inverse for projecting world geometry into plane coordinates.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    /// Maps (0, 1, 0) onto the plane normal.
    pub rotation: UnitQuaternion<Real>,
    inverse: UnitQuaternion<Real>,
}

impl LocalFrame {
    /// Build the frame for a unit `normal`.
    pub fn from_normal(normal: &Vector3<Real>) -> Self {
        // rotation_between is None only for the exactly antiparallel case, where
        // any half-turn about an axis in the plane maps +Y onto -Y.
        let rotation = UnitQuaternion::rotation_between(&Vector3::y(), normal)
            .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI));
        LocalFrame {
            rotation,
            inverse: rotation.inverse(),
        }
    }

    /// Project a world-space offset into 2D plane coordinates.
    ///
    /// The rotated vector's y component lies along the normal and is ≈0 for
    /// points on the plane; it is discarded, keeping (x, z) as the 2D axes.
    pub fn project(&self, offset: Vector3<Real>) -> Point2<Real> {
        let local = self.inverse * offset;
        Point2::new(local.x, local.z)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_for_up_normal() {
        let frame = LocalFrame::from_normal(&Vector3::y());
        let p = frame.project(Vector3::new(1.0, 0.0, 2.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn antiparallel_normal_still_projects_onto_the_plane() {
        let frame = LocalFrame::from_normal(&Vector3::new(0.0, -1.0, 0.0));
        assert_relative_eq!((frame.rotation * Vector3::y()).y, -1.0, epsilon = 1e-12);
        let p = frame.project(Vector3::new(1.0, 0.0, 2.0));
        // Half-turn about x: z flips sign, x is preserved.
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn normal_component_vanishes_after_projection() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let frame = LocalFrame::from_normal(&normal);
        // A point on the plane z = 0 keeps its distance from the origin in 2D.
        let offset = Vector3::new(3.0, 4.0, 0.0);
        let local = frame.project(offset);
        assert_relative_eq!(
            (local.x * local.x + local.y * local.y).sqrt(),
            5.0,
            epsilon = 1e-12
        );
    }
}
