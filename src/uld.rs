//! Unit Load Device (ULD) descriptor and contour geometry.
//!
//! Only the AKC contour is modeled: a prism along Z whose cross-section has a flat
//! base, a vertical right wall, a left wall that slants outwards from the base up to
//! mid-height and is vertical above it, and a flat top that is wider than the base.
//!
//! Frame: X = width (base centered on 0), Y = height (floor at 0), Z = depth
//! (centered on 0).

use serde::Serialize;

use crate::geometry::indexed_mesh;
use crate::scene::Mesh3D;

/// Container dimensions as sent to the planning service.
///
/// `width` is the base width; `top_width` is the full width at the top.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UldDescriptor {
    pub code: String,
    /// Depth along Z, meters.
    pub length: f32,
    /// Base width along X, meters.
    pub width: f32,
    /// Height along Y, meters.
    pub height: f32,
    /// Top width along X, meters.
    pub top_width: f32,
}

impl Default for UldDescriptor {
    fn default() -> Self {
        Self::akc()
    }
}

impl UldDescriptor {
    pub const AKC_CODE: &'static str = "AKC";
    pub const AKC_LENGTH: f32 = 1.534;
    pub const AKC_BASE_WIDTH: f32 = 1.6104;
    pub const AKC_TOP_WIDTH: f32 = 2.3368;
    pub const AKC_HEIGHT: f32 = 1.6256;

    /// The LD3-45 "AKC" container used by the viewer.
    pub fn akc() -> Self {
        Self {
            code: Self::AKC_CODE.to_string(),
            length: Self::AKC_LENGTH,
            width: Self::AKC_BASE_WIDTH,
            height: Self::AKC_HEIGHT,
            top_width: Self::AKC_TOP_WIDTH,
        }
    }

    /// Height where the left wall stops slanting.
    #[inline]
    pub fn contour_break_y(&self) -> f32 {
        self.height * 0.5
    }

    /// The ten contour vertices.
    ///
    /// Index layout (b = back at -depth/2, f = front at +depth/2):
    /// 0..=3 floor (left-b, right-b, right-f, left-f),
    /// 4, 5 left wall break (b, f),
    /// 6..=9 roof (left-b, right-b, right-f, left-f).
    pub fn contour_vertices(&self) -> [[f32; 3]; 10] {
        let half_depth = self.length * 0.5;
        let left_base_x = -self.width * 0.5;
        let right_x = self.width * 0.5;
        // The overhang extends the top to its full width on the left side only.
        let left_top_x = right_x - self.top_width;
        let break_y = self.contour_break_y();
        let h = self.height;

        [
            [left_base_x, 0.0, -half_depth],
            [right_x, 0.0, -half_depth],
            [right_x, 0.0, half_depth],
            [left_base_x, 0.0, half_depth],
            [left_top_x, break_y, -half_depth],
            [left_top_x, break_y, half_depth],
            [left_top_x, h, -half_depth],
            [right_x, h, -half_depth],
            [right_x, h, half_depth],
            [left_top_x, h, half_depth],
        ]
    }

    /// Closed contour shell, CCW-outwards triangles.
    pub fn contour_mesh(&self) -> Mesh3D {
        indexed_mesh(self.contour_vertices().to_vec(), CONTOUR_INDICES.to_vec())
    }
}

/// Triangles of the closed contour shell.
///
/// Front and back are pentagons (they include the wall break), fanned from a floor
/// corner.
pub const CONTOUR_INDICES: [u32; 48] = [
    // floor
    0, 1, 2, 0, 2, 3, //
    // right wall
    1, 7, 8, 1, 8, 2, //
    // left wall, slanted lower section
    0, 3, 5, 0, 5, 4, //
    // left wall, vertical upper section
    4, 5, 9, 4, 9, 6, //
    // front
    3, 2, 8, 3, 8, 9, 3, 9, 5, //
    // back
    0, 4, 6, 0, 6, 7, 0, 7, 1, //
    // roof
    6, 9, 8, 6, 8, 7,
];

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::geometry::{EDGE_THRESHOLD_DEG, edges_mesh};

    #[test]
    fn contour_bounds_match_akc_extents() {
        let uld = UldDescriptor::akc();
        let b = uld.contour_mesh().bounds();
        let size = b.size();
        assert!((size.x - 2.3368).abs() < 1e-5);
        assert!((size.y - 1.6256).abs() < 1e-5);
        assert!((size.z - 1.534).abs() < 1e-5);
        assert_eq!(b.min.y, 0.0);
    }

    #[test]
    fn base_and_top_widths_match_descriptor() {
        let uld = UldDescriptor::akc();
        let v = uld.contour_vertices();
        assert!(((v[1][0] - v[0][0]) - 1.6104).abs() < 1e-5);
        assert!(((v[7][0] - v[6][0]) - 2.3368).abs() < 1e-5);
        // Right wall is vertical.
        assert_eq!(v[1][0], v[7][0]);
        // Left wall is vertical above the break.
        assert_eq!(v[4][0], v[6][0]);
    }

    #[test]
    fn contour_has_ten_vertices_and_closed_faces() {
        let mesh = UldDescriptor::akc().contour_mesh();
        assert_eq!(mesh.positions.len(), 10);
        assert_eq!(mesh.primitive_count(), 16);
    }

    #[test]
    fn contour_triangles_face_outwards() {
        let mesh = UldDescriptor::akc().contour_mesh();
        let centroid = mesh
            .positions
            .iter()
            .map(|p| Vec3::from(*p))
            .sum::<Vec3>()
            / mesh.positions.len() as f32;

        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.positions[i as usize]));
            let n = (b - a).cross(c - a);
            let to_face = (a + b + c) / 3.0 - centroid;
            assert!(n.dot(to_face) > 0.0, "triangle {tri:?} faces inwards");
        }
    }

    #[test]
    fn contour_outline_has_prism_edges() {
        // 5 cross-section edges front + 5 back + 5 along the depth.
        let outline = edges_mesh(&UldDescriptor::akc().contour_mesh(), EDGE_THRESHOLD_DEG);
        assert_eq!(outline.primitive_count(), 15);
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(UldDescriptor::akc()).unwrap();
        assert_eq!(json["code"], "AKC");
        assert!((json["topWidth"].as_f64().unwrap() - 2.3368).abs() < 1e-6);
        assert!((json["length"].as_f64().unwrap() - 1.534).abs() < 1e-6);
        assert!(json.get("top_width").is_none());
    }
}
