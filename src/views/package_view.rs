//! A single package shown as a spinning cardboard box.
//!
//! The box is sized to the package's real dimensions (length along X, height along
//! Y, width along Z) and the camera distance scales with the largest dimension, so
//! any box fits the slot. It spins about Y until the pointer enters the slot; after
//! that only drags rotate it (zoom and pan are disabled).

use glam::{Quat, Vec3};
use log::debug;

use crate::geometry::{EDGE_THRESHOLD_DEG, box_mesh, edges_mesh, plane_mesh};
use crate::package::Package;
use crate::render::gpu::Gpu;
use crate::render::mesh_renderer::{MeshRenderer, Viewport};
use crate::scene::{
    Camera3D, KeyLight, Lighting, Material, Node3D, OrbitControls, ResourceArena, Rgba, Scene3D,
    Transform3,
};

use super::{TeardownReport, TeardownStep};

/// Auto-spin per rendered frame, radians.
pub const SPIN_PER_FRAME: f32 = 0.008;
/// Camera distance as a multiple of the largest box dimension.
pub const CAMERA_DISTANCE_FACTOR: f32 = 2.3;
pub const EDGE_COLOR: u32 = 0x775533;

const FALLBACK_LENGTH: f32 = 0.4;
const FALLBACK_WIDTH: f32 = 0.3;
const FALLBACK_HEIGHT: f32 = 0.25;

/// Use `value` if it is a usable dimension, otherwise `fallback`.
fn dimension_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

pub struct PackageView {
    package_id: String,
    scene: Scene3D,
    arena: ResourceArena,
    controls: Option<OrbitControls>,
    renderer: Option<MeshRenderer>,
    hovered: bool,
    torn_down: bool,
}

impl PackageView {
    pub fn new(package: &Package) -> Self {
        let length = dimension_or(package.length, FALLBACK_LENGTH);
        let width = dimension_or(package.width, FALLBACK_WIDTH);
        let height = dimension_or(package.height, FALLBACK_HEIGHT);
        let max_dim = length.max(width).max(height);

        let mut arena = ResourceArena::new();

        let body_mesh = box_mesh(length, height, width);
        let edges = edges_mesh(&body_mesh, EDGE_THRESHOLD_DEG);
        let body = arena.add_geometry(body_mesh);
        let cardboard = arena.add_material(
            Material::standard(Rgba::from_hex(package.color))
                .with_roughness(0.9)
                .with_metalness(0.1),
        );

        let edge_geometry = arena.add_geometry(edges);
        let edge_material = arena.add_material(Material::line(Rgba::from_hex(EDGE_COLOR)));

        // Tape strip across the top face.
        let tape_geometry = arena.add_geometry(plane_mesh(width * 0.7, length * 0.12));
        let tape_material = arena.add_material(Material::basic(Rgba::from_hex(package.tape_color)));
        let tape_transform = Transform3::from_translation(Vec3::new(0.0, height * 0.5 + 0.001, 0.0))
            .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));

        let node = Node3D::new("box")
            .with_tag(package.id.clone())
            .with_geometry(body)
            .with_material(cardboard)
            .with_child(
                Node3D::new("edges")
                    .with_geometry(edge_geometry)
                    .with_material(edge_material),
            )
            .with_child(
                Node3D::new("tape")
                    .with_geometry(tape_geometry)
                    .with_material(tape_material)
                    .with_transform(tape_transform),
            );

        let mut scene = Scene3D::new();
        scene.add_root(node);
        scene.lighting = Lighting {
            ambient: Rgba::WHITE,
            ambient_intensity: 0.9,
            key: Some(KeyLight::Directional {
                color: Rgba::WHITE,
                intensity: 0.6,
                position: Vec3::new(2.0, 4.0, 2.0),
            }),
        };
        scene.camera = Camera3D::perspective(35.0, 1.0, 0.01, 10.0);
        scene.camera.position = Vec3::new(max_dim, max_dim, max_dim * CAMERA_DISTANCE_FACTOR);
        scene.camera.look_at(Vec3::ZERO);

        let mut controls = OrbitControls::rotate_only(Vec3::ZERO);
        controls.enable_damping = true;
        controls.update(&mut scene.camera);

        Self {
            package_id: package.id.clone(),
            scene,
            arena,
            controls: Some(controls),
            renderer: None,
            hovered: false,
            torn_down: false,
        }
    }

    #[inline]
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Create this view's GPU resources. No-op if attached or torn down.
    pub fn attach(&mut self, gpu: &Gpu) -> anyhow::Result<()> {
        if self.renderer.is_none() && !self.torn_down {
            self.renderer = Some(MeshRenderer::new(gpu)?);
        }
        Ok(())
    }

    #[inline]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[inline]
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn pointer_enter(&mut self) {
        self.hovered = true;
    }

    pub fn pointer_leave(&mut self) {
        self.hovered = false;
    }

    /// Rotate by a pointer drag of `(dx, dy)` pixels inside a `viewport_height` slot.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if let Some(controls) = self.controls.as_mut() {
            controls.rotate(dx, dy, viewport_height);
        }
    }

    /// Zoom input is accepted and ignored (the controls are rotate-only).
    pub fn wheel(&mut self, steps: f32) {
        if let Some(controls) = self.controls.as_mut() {
            controls.zoom(steps);
        }
    }

    /// Per-frame update: spin unless hovered, then apply orbit input.
    pub fn advance_frame(&mut self) {
        if self.torn_down {
            return;
        }
        if !self.hovered {
            if let Some(body) = self.scene.get_mut("box") {
                body.transform.rotate_y(SPIN_PER_FRAME);
            }
        }
        if let Some(controls) = self.controls.as_mut() {
            controls.update(&mut self.scene.camera);
        }
    }

    pub fn box_node(&self) -> Option<&Node3D> {
        self.scene.get("box")
    }

    /// Current spin of the box about Y, radians.
    pub fn box_yaw(&self) -> f32 {
        self.box_node().map_or(0.0, |n| n.transform.yaw())
    }

    #[inline]
    pub fn camera(&self) -> &Camera3D {
        &self.scene.camera
    }

    #[inline]
    pub fn arena(&self) -> &ResourceArena {
        &self.arena
    }

    pub fn draw(
        &mut self,
        gpu: &Gpu,
        pass: &mut wgpu::RenderPass<'_>,
        viewport: Viewport,
    ) -> anyhow::Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let (w, h) = crate::render::util::px_size(viewport.width, viewport.height);
        self.scene.camera.set_viewport_px(w, h);
        renderer.draw(gpu, pass, &self.scene, &self.arena, viewport)
    }

    /// Release everything this view owns.
    ///
    /// Order: the box's own shape and material, then each decoration (released and
    /// detached), then controls and renderer buffers, then the GPU context, then the
    /// scene itself. Returns `None` if the view was already torn down.
    pub fn teardown(&mut self) -> Option<TeardownReport> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;

        let mut report = TeardownReport::default();

        if let Some(body) = self.scene.get_mut("box") {
            report.released += self.arena.release_own(body);
            body.geometry = None;
            body.material = None;
            report.steps.push(TeardownStep::ReleaseRoot);

            for child in std::mem::take(&mut body.children) {
                report.released += self.arena.release_subtree(&child);
            }
            report.steps.push(TeardownStep::ReleaseChildren);
        }

        self.controls = None;
        if let Some(renderer) = self.renderer.as_mut() {
            report.gpu_geometries = renderer.release_geometry();
        }
        report.steps.push(TeardownStep::ReleaseControls);

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.dispose();
        }
        report.steps.push(TeardownStep::InvalidateContext);

        self.renderer = None;
        self.scene.take_roots();
        // Anything not reachable from the graph any more.
        report.released += self.arena.release_all();
        report.steps.push(TeardownStep::DropReferences);

        report.stats = self.arena.stats();
        debug!(
            "package view {}: torn down ({} geometries, {} materials released)",
            self.package_id, report.released.geometries, report.released.materials
        );
        Some(report)
    }
}

impl Drop for PackageView {
    fn drop(&mut self) {
        self.teardown();
    }
}
