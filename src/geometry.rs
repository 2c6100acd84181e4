//! CPU mesh builders.
//!
//! Everything here produces plain [`Mesh3D`] values in meters, centered on the local
//! origin unless noted otherwise:
//! - `box_mesh`: axis-aligned box with flat per-face normals
//! - `plane_mesh`: rectangle in the XY plane facing +Z
//! - `indexed_mesh`: arbitrary triangle soup with area-weighted vertex normals
//! - `edges_mesh`: feature outline of a triangle mesh (crease and border edges)
//! - `grid_meshes`: floor grid lines on the XZ plane

use std::collections::HashMap;

use glam::Vec3;

use crate::scene::{Mesh3D, Topology};

/// Default crease threshold for [`edges_mesh`], in degrees.
pub const EDGE_THRESHOLD_DEG: f32 = 1.0;

/// Axis-aligned box of size `width` (X) x `height` (Y) x `depth` (Z).
pub fn box_mesh(width: f32, height: f32, depth: f32) -> Mesh3D {
    let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);

    // (normal, u axis, v axis) per face; corners are n + (+-u) + (+-v) in CCW order.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let half = Vec3::new(hx, hy, hz);

    let mut mesh = Mesh3D {
        positions: Vec::with_capacity(24),
        normals: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
        topology: Topology::Triangles,
    };

    for (n, u, v) in faces {
        let (n, u, v) = (Vec3::from(n), Vec3::from(u), Vec3::from(v));
        let base = mesh.positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + u * su + v * sv) * half;
            mesh.positions.push(p.to_array());
            mesh.normals.push(n.to_array());
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    mesh
}

/// Rectangle of `width` (X) x `height` (Y), facing +Z.
pub fn plane_mesh(width: f32, height: f32) -> Mesh3D {
    let (hw, hh) = (width * 0.5, height * 0.5);
    Mesh3D {
        positions: vec![
            [-hw, -hh, 0.0],
            [hw, -hh, 0.0],
            [hw, hh, 0.0],
            [-hw, hh, 0.0],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        topology: Topology::Triangles,
    }
}

/// Triangle mesh from shared vertices, with area-weighted smooth normals.
pub fn indexed_mesh(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Mesh3D {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(positions[i as usize]));
        // Unnormalized cross product: weight by face area.
        let n = (b - a).cross(c - a);
        for &i in tri {
            normals[i as usize] += n;
        }
    }

    Mesh3D {
        normals: normals
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect(),
        positions,
        indices,
        topology: Topology::Triangles,
    }
}

/// Quantized position key so coincident vertices from different faces weld.
fn weld_key(p: [f32; 3]) -> [i64; 3] {
    const SCALE: f32 = 1e4;
    p.map(|c| (c * SCALE).round() as i64)
}

/// Outline of a triangle mesh.
///
/// An edge is emitted when it borders a single triangle, or when the normals of the
/// two triangles sharing it differ by more than `threshold_deg`. Diagonals inside
/// flat quads are therefore dropped, so a box yields its 12 edges.
///
/// Output is a line list with its own vertices (no normals). Non-triangle input
/// yields an empty mesh.
pub fn edges_mesh(mesh: &Mesh3D, threshold_deg: f32) -> Mesh3D {
    let mut out = Mesh3D {
        topology: Topology::Lines,
        ..Default::default()
    };
    if mesh.topology != Topology::Triangles {
        return out;
    }

    let cos_threshold = threshold_deg.to_radians().cos();

    struct EdgeRecord {
        a: [f32; 3],
        b: [f32; 3],
        normal: Vec3,
        shared: Option<Vec3>,
    }

    // Insertion order is kept so output is deterministic.
    let mut order: Vec<([i64; 3], [i64; 3])> = Vec::new();
    let mut edges: HashMap<([i64; 3], [i64; 3]), EdgeRecord> = HashMap::new();

    for tri in mesh.indices.chunks_exact(3) {
        let pts = [tri[0], tri[1], tri[2]].map(|i| mesh.positions[i as usize]);
        let [a, b, c] = pts.map(Vec3::from);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        if normal == Vec3::ZERO {
            continue;
        }

        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            let (ka, kb) = (weld_key(pts[i]), weld_key(pts[j]));
            let key = if ka <= kb { (ka, kb) } else { (kb, ka) };
            match edges.get_mut(&key) {
                Some(rec) => {
                    if rec.shared.is_none() {
                        rec.shared = Some(normal);
                    }
                }
                None => {
                    order.push(key);
                    edges.insert(
                        key,
                        EdgeRecord {
                            a: pts[i],
                            b: pts[j],
                            normal,
                            shared: None,
                        },
                    );
                }
            }
        }
    }

    for key in order {
        let Some(rec) = edges.get(&key) else {
            continue;
        };
        let keep = match rec.shared {
            None => true,
            Some(other) => rec.normal.dot(other) <= cos_threshold,
        };
        if keep {
            let base = out.positions.len() as u32;
            out.positions.push(rec.a);
            out.positions.push(rec.b);
            out.indices.extend_from_slice(&[base, base + 1]);
        }
    }

    out
}

/// Floor grid split into the two center lines and the remaining lines, so each set
/// can carry its own color.
#[derive(Debug, Clone)]
pub struct GridMeshes {
    pub center: Mesh3D,
    pub lines: Mesh3D,
}

/// Square grid of `size` on the XZ plane, centered at the origin, with `divisions`
/// cells per side.
pub fn grid_meshes(size: f32, divisions: u32) -> GridMeshes {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    let center_index = divisions / 2;

    let mut center = Mesh3D {
        topology: Topology::Lines,
        ..Default::default()
    };
    let mut lines = Mesh3D {
        topology: Topology::Lines,
        ..Default::default()
    };

    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let target = if i == center_index && divisions % 2 == 0 {
            &mut center
        } else {
            &mut lines
        };
        let base = target.positions.len() as u32;
        // Line parallel to Z at x = k, then parallel to X at z = k.
        target.positions.push([k, 0.0, -half]);
        target.positions.push([k, 0.0, half]);
        target.positions.push([-half, 0.0, k]);
        target.positions.push([half, 0.0, k]);
        target
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 3]);
    }

    GridMeshes { center, lines }
}
