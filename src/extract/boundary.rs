//! Stage four: boundary tracing and polygon simplification.
//!
//! A cluster's triangles are re-projected around their own centroid, their 2D
//! vertices collapsed onto a quantized grid, and every triangle edge tallied.
//! Edges referenced exactly once lie on the perimeter; walking them yields closed
//! loops, the longest of which becomes the cluster's polygon after collinear
//! vertices are removed.

use super::frame::LocalFrame;
use super::{DetectedPlane, ExtractOptions, Orientation};
use crate::float_types::Real;
use geo::{Area, Coord, LineString, Polygon as GeoPolygon};
use hashbrown::{HashMap, HashSet};
use nalgebra::{Point2, Point3, Vector3};

/// Reduce one cluster (flat triangle-vertex soup in world space) to a simplified
/// boundary polygon, or reject it.
///
/// Rejection is silent: too few boundary vertices, no closed loop, or an area
/// under `min_area` all simply contribute nothing to the output.
pub fn trace(
    vertices: &[Point3<Real>],
    frame: &LocalFrame,
    orientation: Orientation,
    options: &ExtractOptions,
) -> Option<DetectedPlane> {
    if vertices.len() < 3 {
        return None;
    }

    // Fresh projection relative to the cluster centroid keeps coordinates small
    // no matter where the cluster sits in the world.
    let mut sum = Vector3::zeros();
    for vertex in vertices {
        sum += vertex.coords;
    }
    let centroid = Point3::from(sum / vertices.len() as Real);
    let local: Vec<Point2<Real>> = vertices
        .iter()
        .map(|&vertex| frame.project(vertex - centroid))
        .collect();

    // Collapse near-coincident 2D points onto quantized ids so triangles from
    // different meshes meeting at the same physical corner share a vertex.
    let step = options.vertex_quantization;
    let mut id_by_cell: HashMap<(i64, i64), u32> = HashMap::new();
    let mut id_points: Vec<Point2<Real>> = Vec::new();
    let ids: Vec<u32> = local
        .iter()
        .map(|p| {
            let cell = (
                (p.x / step).round() as i64,
                (p.y / step).round() as i64,
            );
            *id_by_cell.entry(cell).or_insert_with(|| {
                id_points.push(Point2::new(cell.0 as Real * step, cell.1 as Real * step));
                (id_points.len() - 1) as u32
            })
        })
        .collect();

    // Tally each triangle's edges as unordered id pairs. Triangles collapsed by
    // quantization are skipped.
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();
    for triangle in ids.chunks_exact(3) {
        let (i0, i1, i2) = (triangle[0], triangle[1], triangle[2]);
        if i0 == i1 || i1 == i2 || i2 == i0 {
            continue;
        }
        for (u, v) in [(i0, i1), (i1, i2), (i2, i0)] {
            let key = if u < v { (u, v) } else { (v, u) };
            *edge_counts.entry(key).or_insert(0) += 1;
        }
    }

    // An edge referenced by exactly one triangle lies on the perimeter.
    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut boundary_edges = 0usize;
    for (&(u, v), &count) in &edge_counts {
        if count == 1 {
            adjacency.entry(u).or_default().push(v);
            adjacency.entry(v).or_default().push(u);
            boundary_edges += 1;
        }
    }
    if boundary_edges < 3 {
        return None;
    }
    // Neighbor order came from hash iteration; sort for a deterministic walk.
    for neighbors in adjacency.values_mut() {
        neighbors.sort_unstable();
    }

    let best = largest_loop(&adjacency)?;
    if best.len() < 3 {
        return None;
    }

    let ring: Vec<Point2<Real>> = best.iter().map(|&id| id_points[id as usize]).collect();
    let polygon = simplify(&ring, options.collinear_dot);
    if polygon.len() < 3 {
        return None;
    }

    let area = ring_area(&polygon);
    if area < options.min_area {
        return None;
    }

    Some(DetectedPlane {
        orientation,
        area,
        position: centroid,
        rotation: frame.rotation,
        polygon,
    })
}

/// Walk the boundary-edge adjacency into closed loops, consuming each edge at
/// most once, and keep the loop with the most vertices.
///
/// A cluster may shed several loops — a hole in the surface, or fragments where
/// the boundary walk dead-ends on open geometry. Preferring the longest favors
/// the outer perimeter without attempting a rigorous outer-versus-hole test.
fn largest_loop(adjacency: &HashMap<u32, Vec<u32>>) -> Option<Vec<u32>> {
    let mut starts: Vec<u32> = adjacency.keys().copied().collect();
    starts.sort_unstable();

    let mut visited: HashSet<(u32, u32)> = HashSet::new();
    let mut best: Option<Vec<u32>> = None;
    for start in starts {
        let Some(mut current) = take_unvisited(start, &adjacency[&start], &mut visited)
        else {
            continue;
        };
        let mut path = vec![start];
        let mut closed = false;
        loop {
            if current == start {
                closed = true;
                break;
            }
            path.push(current);
            match adjacency
                .get(&current)
                .and_then(|neighbors| take_unvisited(current, neighbors, &mut visited))
            {
                Some(next) => current = next,
                // Dead end: a boundary fragment that never closes.
                None => break,
            }
        }
        if closed && best.as_ref().is_none_or(|b| path.len() > b.len()) {
            best = Some(path);
        }
    }
    best
}

/// Pick the first neighbor of `from` whose edge has not been consumed yet, and
/// consume it.
fn take_unvisited(
    from: u32,
    neighbors: &[u32],
    visited: &mut HashSet<(u32, u32)>,
) -> Option<u32> {
    for &neighbor in neighbors {
        let key = if from < neighbor {
            (from, neighbor)
        } else {
            (neighbor, from)
        };
        if visited.insert(key) {
            return Some(neighbor);
        }
    }
    None
}

/// Remove vertices whose incoming and outgoing edge directions are parallel
/// within `collinear_dot`. Single pass over the ring, with a wrap-around check
/// for the closing edge; removals do not cascade.
fn simplify(ring: &[Point2<Real>], collinear_dot: Real) -> Vec<Point2<Real>> {
    let mut simplified: Vec<Point2<Real>> = Vec::with_capacity(ring.len());
    simplified.push(ring[0]);
    for i in 1..ring.len() {
        let previous = simplified[simplified.len() - 1];
        let current = ring[i];
        let next = ring[(i + 1) % ring.len()];
        let incoming = (current - previous).normalize();
        let outgoing = (next - current).normalize();
        if incoming.dot(&outgoing) > collinear_dot {
            continue;
        }
        simplified.push(current);
    }
    // The closing edge back to the first vertex can still make the final vertex
    // redundant.
    if simplified.len() > 2 {
        let last = simplified[simplified.len() - 1];
        let second_last = simplified[simplified.len() - 2];
        let first = simplified[0];
        let incoming = (last - second_last).normalize();
        let closing = (first - last).normalize();
        if incoming.dot(&closing) > collinear_dot {
            simplified.pop();
        }
    }
    simplified
}

/// Shoelace-area magnitude of an implicitly closed ring.
fn ring_area(points: &[Point2<Real>]) -> Real {
    let coords: Vec<Coord<Real>> = points
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    GeoPolygon::new(LineString::new(coords), Vec::new()).unsigned_area()
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    fn square_cluster() -> Vec<Point3<Real>> {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(1.0, 0.0, 1.0);
        let d = Point3::new(0.0, 0.0, 1.0);
        vec![a, b, c, a, c, d]
    }

    #[test]
    fn square_cluster_traces_four_corners() {
        let frame = LocalFrame::from_normal(&Vector3::y());
        let plane = trace(
            &square_cluster(),
            &frame,
            Orientation::Horizontal,
            &ExtractOptions::default(),
        )
        .expect("square should produce a plane");
        assert_eq!(plane.polygon.len(), 4);
        assert!((plane.area - 1.0).abs() < 1e-6);
        assert!((plane.position - Point3::new(0.5, 0.0, 0.5)).norm() < 1e-9);
    }

    #[test]
    fn undersized_polygon_is_rejected() {
        let tiny: Vec<Point3<Real>> = square_cluster()
            .into_iter()
            .map(|p| Point3::from(p.coords * 0.1))
            .collect();
        let frame = LocalFrame::from_normal(&Vector3::y());
        // 0.1 x 0.1 gives area 0.01, below the default min_area of 0.1.
        assert!(
            trace(&tiny, &frame, Orientation::Horizontal, &ExtractOptions::default())
                .is_none()
        );
    }

    #[test]
    fn simplify_removes_collinear_midpoints() {
        let ring = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let simplified = simplify(&ring, 0.999);
        assert_eq!(simplified.len(), 4);
        assert!(!simplified.contains(&Point2::new(0.5, 0.0)));
    }

    #[test]
    fn simplify_checks_the_closing_edge() {
        // The last vertex sits on the closing edge back to the first.
        let ring = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.5),
        ];
        let simplified = simplify(&ring, 0.999);
        assert_eq!(simplified.len(), 4);
    }

    #[test]
    fn shoelace_area_of_unit_square() {
        let square = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!((ring_area(&square) - 1.0).abs() < 1e-12);
    }
}
