//! Validation errors

use crate::float_types::Real;
use nalgebra::Point3;

/// All the possible validation issues we might encounter.
///
/// The extraction pipeline itself never fails — malformed triangles are skipped — so
/// these only arise at the input edges: buffer ingestion and option construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// (MismatchedPositions) A flat position buffer's length is not a multiple of 3
    #[error("(MismatchedPositions) position buffer length {0} is not a multiple of 3")]
    MismatchedPositions(usize),
    /// (MismatchedIndices) An index buffer's length is not a multiple of 3
    #[error("(MismatchedIndices) index buffer length {0} is not a multiple of 3")]
    MismatchedIndices(usize),
    /// (IndexOutOfBounds) An index refers past the end of the position buffer
    #[error("(IndexOutOfBounds) index {index} is out of range (vertex count = {vertex_count})")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
    /// (InvalidCoordinate) The coordinate has a NaN or infinite
    #[error("(InvalidCoordinate) the coordinate ({0}) has a NaN or infinite")]
    InvalidCoordinate(Point3<Real>),
    /// (NonPositiveOption) A length-like option must be strictly positive and finite
    #[error("(NonPositiveOption) option `{name}` must be strictly positive and finite, got {value}")]
    NonPositiveOption { name: &'static str, value: Real },
    /// (OptionOutOfRange) A dot-product threshold option must lie in [0, 1]
    #[error("(OptionOutOfRange) option `{name}` must lie in [0, 1], got {value}")]
    OptionOutOfRange { name: &'static str, value: Real },
    /// (DegenerateUp) The configured up vector has near-zero length
    #[error("(DegenerateUp) the up vector has near-zero length")]
    DegenerateUp,
}
