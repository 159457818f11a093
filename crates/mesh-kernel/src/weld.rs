//! Tolerance-based vertex welding on a uniform spatial hash.

use std::collections::HashMap;

use nalgebra::Point3;

/// Deduplicates points that lie within a tolerance of each other.
///
/// Cells are one tolerance wide, so any point within tolerance of a stored
/// point lives in one of the 27 cells around it.
#[derive(Debug)]
pub struct VertexWelder {
    tolerance: f64,
    cells: HashMap<[i64; 3], Vec<u32>>,
    points: Vec<Point3<f64>>,
}

impl VertexWelder {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: if tolerance > 0.0 { tolerance } else { f64::EPSILON },
            cells: HashMap::new(),
            points: Vec::new(),
        }
    }

    /// Insert a point, returning the index of an existing point within
    /// tolerance or of the newly stored one.
    pub fn insert(&mut self, p: Point3<f64>) -> u32 {
        let cell = self.cell_of(&p);
        if let Some(existing) = self.find_near(&p, cell) {
            return existing;
        }
        let index = self.points.len() as u32;
        self.points.push(p);
        self.cells.entry(cell).or_default().push(index);
        index
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    fn cell_of(&self, p: &Point3<f64>) -> [i64; 3] {
        [
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        ]
    }

    fn find_near(&self, p: &Point3<f64>, cell: [i64; 3]) -> Option<u32> {
        let tol_sq = self.tolerance * self.tolerance;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &index in bucket {
                        if (self.points[index as usize] - p).norm_squared() <= tol_sq {
                            return Some(index);
                        }
                    }
                }
            }
        }
        None
    }
}

/// Weld a vertex list, returning the remap table (old index to welded index)
/// and the welded points.
pub fn weld_vertices(vertices: &[Point3<f64>], tolerance: f64) -> (Vec<u32>, Vec<Point3<f64>>) {
    let mut welder = VertexWelder::new(tolerance);
    let remap = vertices.iter().map(|p| welder.insert(*p)).collect();
    (remap, welder.into_points())
}
