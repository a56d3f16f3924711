//! Detection of planar surfaces in arbitrary triangle meshes: coplanar triangles are
//! bucketed by quantized plane equation, clustered into contiguous patches with a
//! grid-accelerated union-find, and reduced to simplified 2D boundary polygons.
//!
//! The pipeline is a one-shot batch pass over a [`TriangleSoup`] snapshot; see
//! [`PlaneExtractor`] for the entry point and [`extract`] for the individual stages.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//! - [**stl-io**](https://en.wikipedia.org/wiki/STL_(file_format)): build a [`TriangleSoup`] from `.stl` data
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon to process coplanar buckets concurrently

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod errors;
pub mod extract;
pub mod float_types;
pub mod mesh;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use extract::{DetectedPlane, ExtractOptions, Orientation, PlaneExtractor, extract_planes};
pub use mesh::TriangleSoup;
