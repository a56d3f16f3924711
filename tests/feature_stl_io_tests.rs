#![cfg(feature = "stl-io")]

use approx::assert_relative_eq;
use planars::{Orientation, TriangleSoup, extract_planes};

const UNIT_SQUARE_STL: &str = "\
solid square
  facet normal 0.0 1.0 0.0
    outer loop
      vertex 0.0 0.0 0.0
      vertex 1.0 0.0 1.0
      vertex 1.0 0.0 0.0
    endloop
  endfacet
  facet normal 0.0 1.0 0.0
    outer loop
      vertex 0.0 0.0 0.0
      vertex 0.0 0.0 1.0
      vertex 1.0 0.0 1.0
    endloop
  endfacet
endsolid square
";

#[test]
fn soup_from_ascii_stl() {
    let soup = TriangleSoup::from_stl(UNIT_SQUARE_STL.as_bytes()).unwrap();
    assert_eq!(soup.triangle_count(), 2);
}

#[test]
fn stl_square_extracts_one_horizontal_plane() {
    let soup = TriangleSoup::from_stl(UNIT_SQUARE_STL.as_bytes()).unwrap();
    let planes = extract_planes(&soup);
    assert_eq!(planes.len(), 1);
    assert_eq!(planes[0].orientation, Orientation::Horizontal);
    assert_relative_eq!(planes[0].area, 1.0, epsilon = 1e-6);
}
