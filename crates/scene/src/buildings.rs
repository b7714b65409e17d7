//! Building footprints extruded into a flat slab mesh.

use earcutr::earcut;
use foundation::math::{Vec2, Vec3};

use crate::model::BuildingFootprint;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ExtrusionStyle {
    /// Scene `y` of the slab's underside.
    pub base_y: f64,
    pub height: f64,
}

impl Default for ExtrusionStyle {
    fn default() -> Self {
        // A thin slab hanging just under the ground grid at y = -2.
        Self {
            base_y: -2.5,
            height: 0.5,
        }
    }
}

/// Indexed triangle mesh; triangles wind counter-clockwise seen from outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl BuildingMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Extrudes every footprint into one mesh. Degenerate rings are skipped.
pub fn extrude_buildings(footprints: &[BuildingFootprint], style: ExtrusionStyle) -> BuildingMesh {
    let mut mesh = BuildingMesh::default();
    for footprint in footprints {
        extrude_ring(&mut mesh, &footprint.ring, style);
    }
    mesh
}

fn extrude_ring(mesh: &mut BuildingMesh, ring: &[Vec2], style: ExtrusionStyle) {
    let mut ring = ring.to_vec();
    drop_closing_duplicate(&mut ring);
    if ring.len() < 3 {
        return;
    }
    let area = signed_area(&ring);
    if area.abs() <= f64::EPSILON {
        return;
    }

    let coords: Vec<f64> = ring.iter().flat_map(|p| [p.x, p.y]).collect();
    let triangles = match earcut(&coords, &[], 2) {
        Ok(ix) if !ix.is_empty() => ix,
        _ => return,
    };

    let n = ring.len();
    let first = mesh.positions.len() as u32;
    let bottom = |i: usize| first + i as u32;
    let top = |i: usize| first + (n + i) as u32;

    let bottom_y = style.base_y;
    let top_y = style.base_y + style.height;
    mesh.positions
        .extend(ring.iter().map(|p| Vec3::new(p.x, bottom_y, p.y)));
    mesh.positions
        .extend(ring.iter().map(|p| Vec3::new(p.x, top_y, p.y)));

    // A triangle with positive area in the (x, z) plane faces down (-y).
    for tri in triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let faces_down = triangle_area(ring[a], ring[b], ring[c]) > 0.0;
        if faces_down {
            mesh.indices.extend([top(a), top(c), top(b)]);
            mesh.indices.extend([bottom(a), bottom(b), bottom(c)]);
        } else {
            mesh.indices.extend([top(a), top(b), top(c)]);
            mesh.indices.extend([bottom(a), bottom(c), bottom(b)]);
        }
    }

    for i in 0..n {
        let j = (i + 1) % n;
        if area > 0.0 {
            mesh.indices.extend([bottom(i), top(j), bottom(j)]);
            mesh.indices.extend([bottom(i), top(i), top(j)]);
        } else {
            mesh.indices.extend([bottom(i), bottom(j), top(j)]);
            mesh.indices.extend([bottom(i), top(j), top(i)]);
        }
    }
}

fn drop_closing_duplicate(points: &mut Vec<Vec2>) {
    if points.len() >= 2 {
        let first = points[0];
        let last = points[points.len() - 1];
        if (first.x - last.x).abs() < 1e-12 && (first.y - last.y).abs() < 1e-12 {
            points.pop();
        }
    }
}

fn signed_area(ring: &[Vec2]) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)) * 0.5
}
