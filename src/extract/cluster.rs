//! Stage three: group a bucket's triangles into spatially contiguous clusters.
//!
//! Triangles are atomic units; two are connected when any pair of their vertices
//! lies within the clustering threshold in the 2D projection. A uniform grid with
//! cell size equal to the threshold accelerates the proximity query, and an
//! iterative union-find collects the connected components.

use crate::float_types::Real;
use hashbrown::HashMap;
use nalgebra::Point2;

/// Disjoint-set over triangle indices, with iterative path compression so deep
/// parent chains cannot overflow the stack.
#[derive(Debug)]
pub struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        DisjointSet {
            parent: (0..len as u32).collect(),
        }
    }

    pub fn find(&mut self, index: u32) -> u32 {
        let mut root = index;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Second pass: point everything on the path straight at the root.
        let mut current = index;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    pub fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_a as usize] = root_b;
        }
    }
}

/// Pack a 2D grid cell coordinate into one map key.
const fn cell_key(kx: i32, ky: i32) -> u64 {
    ((kx as u32 as u64) << 32) | ky as u32 as u64
}

fn cell_coord(value: Real, cell_size: Real) -> i32 {
    (value / cell_size).floor() as i32
}

const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (0, 0),
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Partition the triangles of one projected bucket (three points per triangle)
/// into maximal connected groups. Returns lists of triangle indices, each list
/// in ascending order.
pub fn connected_clusters(points: &[Point2<Real>], threshold: Real) -> Vec<Vec<u32>> {
    let triangle_count = (points.len() / 3) as u32;
    let threshold_sq = threshold * threshold;
    let mut set = DisjointSet::new(triangle_count as usize);

    // A triangle registers in the cell of each of its vertices, so it can appear
    // in up to 3 cells.
    let mut grid: HashMap<u64, Vec<u32>> = HashMap::new();
    for triangle in 0..triangle_count {
        for k in 0..3 {
            let p = points[(triangle * 3 + k) as usize];
            let key = cell_key(cell_coord(p.x, threshold), cell_coord(p.y, threshold));
            grid.entry(key).or_default().push(triangle);
        }
    }

    // For every vertex, scan the 3x3 cell neighborhood; any other triangle with a
    // vertex within the threshold joins this triangle's equivalence class.
    for triangle in 0..triangle_count {
        for k in 0..3 {
            let p = points[(triangle * 3 + k) as usize];
            let kx = cell_coord(p.x, threshold);
            let ky = cell_coord(p.y, threshold);
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let Some(neighbors) = grid.get(&cell_key(kx + dx, ky + dy)) else {
                    continue;
                };
                for &other in neighbors {
                    if other == triangle || set.find(other) == set.find(triangle) {
                        continue;
                    }
                    let connected = (0..3).any(|j| {
                        let q = points[(other * 3 + j) as usize];
                        (p - q).norm_squared() <= threshold_sq
                    });
                    if connected {
                        set.union(triangle, other);
                    }
                }
            }
        }
    }

    let mut clusters: HashMap<u32, Vec<u32>> = HashMap::new();
    for triangle in 0..triangle_count {
        let root = set.find(triangle);
        clusters.entry(root).or_default().push(triangle);
    }
    clusters.into_values().collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn triangle(points: &mut Vec<Point2<Real>>, a: (Real, Real), b: (Real, Real), c: (Real, Real)) {
        points.push(Point2::new(a.0, a.1));
        points.push(Point2::new(b.0, b.1));
        points.push(Point2::new(c.0, c.1));
    }

    #[test]
    fn find_and_union_merge_classes() {
        let mut set = DisjointSet::new(4);
        set.union(0, 1);
        set.union(2, 3);
        assert_eq!(set.find(0), set.find(1));
        assert_ne!(set.find(1), set.find(2));
        set.union(1, 2);
        assert_eq!(set.find(0), set.find(3));
    }

    #[test]
    fn triangles_sharing_a_vertex_form_one_cluster() {
        let mut points = Vec::new();
        triangle(&mut points, (0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        triangle(&mut points, (1.0, 0.0), (2.0, 0.0), (1.0, 1.0));
        let clusters = connected_clusters(&points, 0.2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], vec![0, 1]);
    }

    #[test]
    fn distant_triangles_stay_separate() {
        let mut points = Vec::new();
        triangle(&mut points, (0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        triangle(&mut points, (5.0, 0.0), (6.0, 0.0), (5.0, 1.0));
        let clusters = connected_clusters(&points, 0.2);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn a_small_gap_still_connects() {
        // Nearest vertices are 0.15 apart, inside the 0.2 threshold.
        let mut points = Vec::new();
        triangle(&mut points, (0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        triangle(&mut points, (1.15, 0.0), (2.0, 0.0), (1.15, 1.0));
        let clusters = connected_clusters(&points, 0.2);
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn empty_input_produces_no_clusters() {
        let clusters = connected_clusters(&[], 0.2);
        assert!(clusters.is_empty());
    }
}
