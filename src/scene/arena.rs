//! Per-view ownership of geometry and material resources.
//!
//! Every shape or material a view creates goes through its `ResourceArena`. Nodes
//! only hold the returned handles. Tearing a view down is then a single
//! [`ResourceArena::release_all`] pass, and the arena's counters make it checkable
//! that every allocation was matched by exactly one release.
//!
//! Handles are never reused: ids grow monotonically for the arena's lifetime, so a
//! stale handle resolves to `None` instead of aliasing a newer resource. Storage is
//! keyed by id and holds only live resources, so released entries cost nothing.

use std::collections::HashMap;

use log::debug;

use super::{Mesh3D, Node3D, Rgba};

/// Handle to a mesh owned by a [`ResourceArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u32);

/// Handle to a material owned by a [`ResourceArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

impl GeometryId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Shading model for a material.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaterialKind {
    /// Lit by ambient + key light, with roughness/metalness and emissive terms.
    Standard,
    /// Flat color, ignores lights.
    Basic,
    /// Flat color for line primitives.
    Line,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Rgba,
    pub opacity: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Rgba,
    pub emissive_intensity: f32,
}

impl Material {
    fn with_kind(kind: MaterialKind, color: Rgba) -> Self {
        Self {
            kind,
            color,
            opacity: 1.0,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Rgba::BLACK,
            emissive_intensity: 1.0,
        }
    }

    #[inline]
    pub fn standard(color: Rgba) -> Self {
        Self::with_kind(MaterialKind::Standard, color)
    }

    #[inline]
    pub fn basic(color: Rgba) -> Self {
        Self::with_kind(MaterialKind::Basic, color)
    }

    #[inline]
    pub fn line(color: Rgba) -> Self {
        Self::with_kind(MaterialKind::Line, color)
    }

    #[inline]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn with_emissive(mut self, emissive: Rgba, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }

    #[inline]
    pub fn is_lit(&self) -> bool {
        self.kind == MaterialKind::Standard
    }
}

/// Result of a release pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReleaseCount {
    pub geometries: usize,
    pub materials: usize,
}

impl ReleaseCount {
    #[inline]
    pub fn total(&self) -> usize {
        self.geometries + self.materials
    }
}

impl std::ops::AddAssign for ReleaseCount {
    fn add_assign(&mut self, rhs: Self) {
        self.geometries += rhs.geometries;
        self.materials += rhs.materials;
    }
}

/// Lifetime counters for an arena.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub geometries_created: usize,
    pub geometries_released: usize,
    pub materials_created: usize,
    pub materials_released: usize,
}

impl ArenaStats {
    /// True when every resource ever created has been released.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.geometries_created == self.geometries_released
            && self.materials_created == self.materials_released
    }
}

#[derive(Debug, Default)]
pub struct ResourceArena {
    geometries: HashMap<GeometryId, Mesh3D>,
    materials: HashMap<MaterialId, Material>,
    next_geometry: u32,
    next_material: u32,
    stats: ArenaStats,
}

impl ResourceArena {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, mesh: Mesh3D) -> GeometryId {
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(id, mesh);
        self.stats.geometries_created += 1;
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        self.materials.insert(id, material);
        self.stats.materials_created += 1;
        id
    }

    #[inline]
    pub fn geometry(&self, id: GeometryId) -> Option<&Mesh3D> {
        self.geometries.get(&id)
    }

    #[inline]
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    #[inline]
    pub fn is_geometry_live(&self, id: GeometryId) -> bool {
        self.geometry(id).is_some()
    }

    /// Release one geometry. Returns `false` if it was already released (or never existed).
    pub fn release_geometry(&mut self, id: GeometryId) -> bool {
        let released = self.geometries.remove(&id).is_some();
        if released {
            self.stats.geometries_released += 1;
        }
        released
    }

    /// Release one material. Returns `false` if it was already released (or never existed).
    pub fn release_material(&mut self, id: MaterialId) -> bool {
        let released = self.materials.remove(&id).is_some();
        if released {
            self.stats.materials_released += 1;
        }
        released
    }

    /// Release the node's own geometry and material (not its children).
    pub fn release_own(&mut self, node: &Node3D) -> ReleaseCount {
        let mut count = ReleaseCount::default();
        if let Some(g) = node.geometry {
            count.geometries += usize::from(self.release_geometry(g));
        }
        if let Some(m) = node.material {
            count.materials += usize::from(self.release_material(m));
        }
        count
    }

    /// Release every resource referenced by `node` and its descendants.
    ///
    /// Shared handles are released once; later references are no-ops.
    pub fn release_subtree(&mut self, node: &Node3D) -> ReleaseCount {
        let mut count = self.release_own(node);
        for child in &node.children {
            count += self.release_subtree(child);
        }
        count
    }

    /// Release everything still live, regardless of whether a node references it.
    pub fn release_all(&mut self) -> ReleaseCount {
        let count = ReleaseCount {
            geometries: self.geometries.drain().count(),
            materials: self.materials.drain().count(),
        };
        self.stats.geometries_released += count.geometries;
        self.stats.materials_released += count.materials;
        if count.total() > 0 {
            debug!(
                "arena: released {} geometries, {} materials",
                count.geometries, count.materials
            );
        }
        count
    }

    #[inline]
    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    #[inline]
    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    #[inline]
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::box_mesh;

    #[test]
    fn double_release_is_a_noop() {
        let mut arena = ResourceArena::new();
        let g = arena.add_geometry(box_mesh(1.0, 1.0, 1.0));
        assert!(arena.release_geometry(g));
        assert!(!arena.release_geometry(g));
        assert_eq!(arena.stats().geometries_released, 1);
        assert!(arena.geometry(g).is_none());
    }

    #[test]
    fn ids_are_not_reused_after_release() {
        let mut arena = ResourceArena::new();
        let a = arena.add_material(Material::basic(Rgba::WHITE));
        arena.release_material(a);
        let b = arena.add_material(Material::basic(Rgba::BLACK));
        assert_ne!(a, b);
        assert!(arena.material(a).is_none());
        assert_eq!(arena.material(b).map(|m| m.color), Some(Rgba::BLACK));
    }

    #[test]
    fn release_subtree_counts_descendants() {
        let mut arena = ResourceArena::new();
        let g0 = arena.add_geometry(box_mesh(1.0, 1.0, 1.0));
        let g1 = arena.add_geometry(box_mesh(0.5, 0.5, 0.5));
        let m0 = arena.add_material(Material::standard(Rgba::WHITE));
        let m1 = arena.add_material(Material::line(Rgba::BLACK));
        let keep = arena.add_material(Material::basic(Rgba::WHITE));

        let node = Node3D::new("parent")
            .with_geometry(g0)
            .with_material(m0)
            .with_child(Node3D::new("child").with_geometry(g1).with_material(m1));

        let released = arena.release_subtree(&node);
        assert_eq!(released, ReleaseCount { geometries: 2, materials: 2 });
        assert_eq!(arena.live_geometries(), 0);
        assert_eq!(arena.live_materials(), 1);
        assert!(arena.material(keep).is_some());
    }

    #[test]
    fn release_all_balances_stats() {
        let mut arena = ResourceArena::new();
        for _ in 0..3 {
            arena.add_geometry(box_mesh(1.0, 1.0, 1.0));
            arena.add_material(Material::standard(Rgba::WHITE));
        }
        let first = arena.add_geometry(box_mesh(1.0, 1.0, 1.0));
        arena.release_geometry(first);
        assert!(!arena.stats().is_balanced());

        let count = arena.release_all();
        assert_eq!(count, ReleaseCount { geometries: 3, materials: 3 });
        assert!(arena.stats().is_balanced());
        assert_eq!(arena.live_geometries(), 0);
    }

    #[test]
    fn storage_tracks_live_resources_only() {
        let mut arena = ResourceArena::new();
        let mut last = None;
        for _ in 0..50 {
            let g = arena.add_geometry(box_mesh(1.0, 1.0, 1.0));
            let m = arena.add_material(Material::standard(Rgba::WHITE));
            arena.release_geometry(g);
            arena.release_material(m);
            last = Some(g);
        }
        assert_eq!(arena.geometries.len(), 0);
        assert_eq!(arena.materials.len(), 0);
        assert_eq!(last.map(GeometryId::index), Some(49));

        arena.add_geometry(box_mesh(1.0, 1.0, 1.0));
        arena.add_material(Material::basic(Rgba::WHITE));
        arena.release_all();
        assert!(arena.geometries.is_empty());
        assert!(arena.materials.is_empty());
        assert!(arena.stats().is_balanced());
    }

    #[test]
    fn material_builders_clamp() {
        let m = Material::standard(Rgba::WHITE)
            .with_opacity(1.5)
            .with_roughness(-1.0)
            .with_metalness(0.2);
        assert_eq!(m.opacity, 1.0);
        assert_eq!(m.roughness, 0.0);
        assert!(!m.is_transparent());
        assert!(m.is_lit());
        assert!(!Material::line(Rgba::BLACK).is_lit());
    }
}
