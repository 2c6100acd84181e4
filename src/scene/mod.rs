//! 3D scene graph abstractions.
//!
//! The model is deliberately small:
//! - A scene owns named root nodes, a camera and a lighting rig.
//! - Nodes carry a local transform, optional geometry/material handles and children.
//! - Geometry and material payloads live in a per-view [`ResourceArena`]; nodes only
//!   hold handles, so releasing a subtree is an explicit arena operation.
//! - Renderers consume a flattened list of draw items (handles + composed transform).
//!
//! Units are meters end-to-end, Y up, right-handed (matching the planning service's
//! coordinate frame: X = container width, Y = height, Z = container depth).
//!
//! This module does not depend on wgpu; it is renderer-agnostic.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};

pub mod arena;
pub mod orbit;

pub use arena::{GeometryId, Material, MaterialId, MaterialKind, ReleaseCount, ResourceArena};
pub use orbit::OrbitControls;

/// Simple RGBA color (linear space assumed; your renderer may treat as sRGB).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Build an opaque color from a `0xRRGGBB` literal.
    #[inline]
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Pack back into `0xRRGGBB` (alpha is dropped).
    #[inline]
    pub fn to_hex(self) -> u32 {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (c(self.r) << 16) | (c(self.g) << 8) | c(self.b)
    }

    #[inline]
    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    #[inline]
    pub fn scaled(self, k: f32) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
            a: self.a,
        }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Axis-aligned bounding box in meters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb3 {
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn include_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners, used to transform a box conservatively.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }
}

/// Primitive assembly for a mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Indexed triangle list, counter-clockwise front faces.
    Triangles,
    /// Indexed line list (pairs of indices).
    Lines,
}

/// A CPU-side mesh: positions, per-vertex normals and indices.
///
/// `normals` is either empty (unlit geometry such as outlines) or has one entry per
/// position.
#[derive(Debug, Clone)]
pub struct Mesh3D {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Default for Mesh3D {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            topology: Topology::Triangles,
        }
    }
}

impl Mesh3D {
    pub fn bounds(&self) -> Aabb3 {
        let mut b = Aabb3::empty();
        for &p in &self.positions {
            b.include_point(Vec3::from(p));
        }
        b
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Number of primitives (triangles or line segments).
    #[inline]
    pub fn primitive_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => self.indices.len() / 2,
        }
    }
}

/// Translation / rotation / scale, composed as `T * R * S`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform3 {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform3 {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    #[inline]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Spin about the node's own Y axis.
    #[inline]
    pub fn rotate_y(&mut self, rad: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(rad)).normalize();
    }

    /// Heading about Y in `(-pi, pi]`.
    #[inline]
    pub fn yaw(&self) -> f32 {
        let (y, _, _) = self.rotation.to_euler(glam::EulerRot::YXZ);
        y
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A draw item produced by flattening the scene graph.
///
/// `world_from_local` is already fully composed for this item.
#[derive(Debug, Copy, Clone)]
pub struct DrawItem3D {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub world_from_local: Mat4,
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct Node3D {
    pub name: String,
    /// Free-form identity tag (placed boxes carry their package identifier here).
    pub tag: Option<String>,
    pub transform: Transform3,
    pub visible: bool,

    pub geometry: Option<GeometryId>,
    pub material: Option<MaterialId>,

    pub children: Vec<Node3D>,
}

impl Default for Node3D {
    fn default() -> Self {
        Self {
            name: "node".to_string(),
            tag: None,
            transform: Transform3::IDENTITY,
            visible: true,
            geometry: None,
            material: None,
            children: Vec::new(),
        }
    }
}

impl Node3D {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_geometry(mut self, geometry: GeometryId) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[inline]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    #[inline]
    pub fn with_transform(mut self, transform: Transform3) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[inline]
    pub fn with_child(mut self, child: Node3D) -> Self {
        self.children.push(child);
        self
    }

    #[inline]
    pub fn add_child(&mut self, child: Node3D) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&Node3D> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Detach and return every direct child matching `pred`, preserving order of the rest.
    pub fn detach_children_where<F>(&mut self, mut pred: F) -> Vec<Node3D>
    where
        F: FnMut(&Node3D) -> bool,
    {
        let mut kept = Vec::with_capacity(self.children.len());
        let mut detached = Vec::new();
        for child in self.children.drain(..) {
            if pred(&child) {
                detached.push(child);
            } else {
                kept.push(child);
            }
        }
        self.children = kept;
        detached
    }

    /// Number of nodes in this subtree (including `self`).
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node3D::subtree_len).sum::<usize>()
    }

    /// Local-space AABB of the geometry in this subtree.
    ///
    /// Child bounds are brought into this node's space by transforming all eight
    /// corners, which is conservative but not tight under rotation.
    pub fn compute_local_bounds(&self, arena: &ResourceArena) -> Aabb3 {
        let mut bounds = Aabb3::empty();

        if let Some(mesh) = self.geometry.and_then(|g| arena.geometry(g)) {
            bounds = bounds.union(mesh.bounds());
        }

        for child in &self.children {
            let child_bounds = child.compute_local_bounds(arena);
            if child_bounds.is_empty() {
                continue;
            }
            let m = child.transform.matrix();
            for c in child_bounds.corners() {
                bounds.include_point(m.transform_point3(c));
            }
        }

        bounds
    }

    /// Flatten this subtree into draw items, composing transforms.
    ///
    /// Nodes with geometry but no material are skipped (nothing to shade with).
    pub fn flatten(&self, world_from_parent: Mat4, out: &mut Vec<DrawItem3D>) {
        if !self.visible {
            return;
        }
        let world_from_local = world_from_parent * self.transform.matrix();

        if let (Some(geometry), Some(material)) = (self.geometry, self.material) {
            out.push(DrawItem3D {
                geometry,
                material,
                world_from_local,
            });
        }

        for child in &self.children {
            child.flatten(world_from_local, out);
        }
    }
}

/// A perspective camera in world space.
#[derive(Debug, Copy, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 50.0,
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
        }
    }
}

impl Camera3D {
    pub fn perspective(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_deg,
            aspect,
            near,
            far,
            ..Default::default()
        }
    }

    /// Set the viewport size in pixels to update the aspect ratio.
    #[inline]
    pub fn set_viewport_px(&mut self, width: u32, height: u32) {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        self.aspect = w / h;
    }

    #[inline]
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    #[inline]
    pub fn distance_to_target(&self) -> f32 {
        (self.position - self.target).length()
    }

    #[inline]
    pub fn view_from_world(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    #[inline]
    pub fn clip_from_view(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    #[inline]
    pub fn clip_from_world(&self) -> Mat4 {
        self.clip_from_view() * self.view_from_world()
    }
}

/// The single key light a scene may carry besides ambient.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum KeyLight {
    /// Light arriving from `position` towards the origin, everywhere.
    Directional {
        color: Rgba,
        intensity: f32,
        position: Vec3,
    },
    /// Cone light at `position` aimed at the origin.
    Spot {
        color: Rgba,
        intensity: f32,
        position: Vec3,
        /// Half-angle of the cone, radians.
        angle: f32,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: Rgba,
    pub ambient_intensity: f32,
    pub key: Option<KeyLight>,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: Rgba::WHITE,
            ambient_intensity: 1.0,
            key: None,
        }
    }
}

/// A top-level scene that holds named root nodes.
#[derive(Debug, Default)]
pub struct Scene3D {
    pub camera: Camera3D,
    pub lighting: Lighting,
    pub roots: Vec<Node3D>,
    /// A simple name index for convenience.
    pub index: BTreeMap<String, usize>,
}

impl Scene3D {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, node: Node3D) {
        let idx = self.roots.len();
        self.index.insert(node.name.clone(), idx);
        self.roots.push(node);
    }

    pub fn get(&self, name: &str) -> Option<&Node3D> {
        self.index.get(name).and_then(|&i| self.roots.get(i))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node3D> {
        let i = *self.index.get(name)?;
        self.roots.get_mut(i)
    }

    /// Detach every root, leaving an empty graph (camera and lights are kept).
    pub fn take_roots(&mut self) -> Vec<Node3D> {
        self.index.clear();
        std::mem::take(&mut self.roots)
    }

    /// Flatten the full scene into draw items.
    pub fn flatten(&self) -> Vec<DrawItem3D> {
        let mut items = Vec::new();
        for root in &self.roots {
            root.flatten(Mat4::IDENTITY, &mut items);
        }
        items
    }
}
