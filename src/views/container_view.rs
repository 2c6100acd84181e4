//! The container view: the ULD shell, its floor grid and the placed packages.
//!
//! The view also owns the user's package list, the shelf scroll state and the
//! load-plan execution state, since all three drive what the container shows.
//!
//! Scene layout (container frame, Y up, floor at y = 0):
//!
//! ```text
//! container            lifted to y = 1, auto-spins about Y
//! ├── wireframe        contour outline
//! ├── shell            translucent contour surface
//! ├── grid             floor grid, scaled along Z to the container depth
//! │   └── grid-center
//! └── placement*       one per placed package, tagged with its id
//!     └── edges
//! ```

use std::time::Instant;

use glam::Vec3;
use log::{debug, info};

use crate::client::{LoadPlanError, LoadPlanResponse, PlacedPosition};
use crate::geometry::{EDGE_THRESHOLD_DEG, box_mesh, edges_mesh, grid_meshes};
use crate::package::Package;
use crate::render::gpu::Gpu;
use crate::render::mesh_renderer::{MeshRenderer, Viewport};
use crate::scene::{
    Camera3D, KeyLight, Lighting, Material, Node3D, OrbitControls, ResourceArena, Rgba, Scene3D,
    Transform3,
};
use crate::uld::UldDescriptor;

use super::package_view::EDGE_COLOR;
use super::plan::{PlanExecution, PlanTicket};
use super::shelf::Shelf;
use super::{TeardownReport, TeardownStep};

/// Auto-spin per rendered frame, radians.
pub const SPIN_PER_FRAME: f32 = 0.0025;

pub const WIREFRAME_COLOR: u32 = 0xffd700;
pub const SHELL_COLOR: u32 = 0xffe066;
pub const SHELL_OPACITY: f32 = 0.1;
/// World height of the container floor.
pub const GROUP_LIFT: f32 = 1.0;

pub const GRID_DIVISIONS: u32 = 10;
pub const GRID_CENTER_COLOR: u32 = 0xccccff;
pub const GRID_COLOR: u32 = 0x444466;
const GRID_LIFT: f32 = 0.01;

pub const PLACEMENT_COLOR: u32 = 0xdeb887;
pub const PLACEMENT_OPACITY: f32 = 0.92;
pub const HIGHLIGHT_COLOR: u32 = 0xff4f4f;
pub const HIGHLIGHT_EMISSIVE: u32 = 0xff4444;

pub const MIN_DISTANCE: f32 = 2.0;
pub const MAX_DISTANCE: f32 = 20.0;

const GROUP: &str = "container";
const PLACEMENT: &str = "placement";

fn placement_material() -> Material {
    Material::standard(Rgba::from_hex(PLACEMENT_COLOR))
        .with_roughness(0.9)
        .with_metalness(0.2)
        .with_opacity(PLACEMENT_OPACITY)
}

fn highlight_material() -> Material {
    Material::standard(Rgba::from_hex(HIGHLIGHT_COLOR))
        .with_emissive(Rgba::from_hex(HIGHLIGHT_EMISSIVE), 0.5)
}

fn is_placement(node: &Node3D) -> bool {
    node.name == PLACEMENT
}

pub struct ContainerView {
    uld: UldDescriptor,
    scene: Scene3D,
    arena: ResourceArena,
    controls: Option<OrbitControls>,
    renderer: Option<MeshRenderer>,
    hovered: bool,

    packages: Vec<Package>,
    selected: Option<usize>,
    shelf: Shelf,
    plan: PlanExecution,

    torn_down: bool,
}

impl ContainerView {
    pub fn new(uld: UldDescriptor, shelf_width: f32, now: Instant) -> Self {
        let mut arena = ResourceArena::new();

        let contour = uld.contour_mesh();
        let outline = edges_mesh(&contour, EDGE_THRESHOLD_DEG);

        let wireframe = Node3D::new("wireframe")
            .with_geometry(arena.add_geometry(outline))
            .with_material(arena.add_material(Material::line(Rgba::from_hex(WIREFRAME_COLOR))));

        let shell = Node3D::new("shell")
            .with_geometry(arena.add_geometry(contour))
            .with_material(arena.add_material(
                Material::basic(Rgba::from_hex(SHELL_COLOR)).with_opacity(SHELL_OPACITY),
            ));

        let grid = grid_meshes(uld.width, GRID_DIVISIONS);
        let grid = Node3D::new("grid")
            .with_transform(
                Transform3::from_translation(Vec3::new(0.0, GRID_LIFT, 0.0))
                    .with_scale(Vec3::new(1.0, 1.0, uld.length / uld.width)),
            )
            .with_geometry(arena.add_geometry(grid.lines))
            .with_material(arena.add_material(Material::line(Rgba::from_hex(GRID_COLOR))))
            .with_child(
                Node3D::new("grid-center")
                    .with_geometry(arena.add_geometry(grid.center))
                    .with_material(
                        arena.add_material(Material::line(Rgba::from_hex(GRID_CENTER_COLOR))),
                    ),
            );

        let group = Node3D::new(GROUP)
            .with_transform(Transform3::from_translation(Vec3::new(0.0, GROUP_LIFT, 0.0)))
            .with_child(wireframe)
            .with_child(shell)
            .with_child(grid);

        let mut scene = Scene3D::new();
        scene.add_root(group);
        scene.lighting = Lighting {
            ambient: Rgba::WHITE,
            ambient_intensity: 1.1,
            key: Some(KeyLight::Spot {
                color: Rgba::from_hex(0x99bbff),
                intensity: 0.6,
                position: Vec3::new(0.0, uld.height * 1.1, uld.length * 0.7),
                angle: std::f32::consts::FRAC_PI_3,
            }),
        };
        scene.camera = Camera3D::perspective(50.0, 1.0, 1.0, 500.0);
        scene.camera.position = Vec3::new(3.0, uld.height * 1.3, uld.length * 3.0);

        let mut controls = OrbitControls::new(Vec3::new(0.0, uld.height / 1.3, 0.0));
        controls.enable_damping = true;
        controls.damping_factor = 0.1;
        controls.min_distance = MIN_DISTANCE;
        controls.max_distance = MAX_DISTANCE;
        controls.max_polar_angle = std::f32::consts::PI / 1.7;
        controls.update(&mut scene.camera);

        Self {
            uld,
            scene,
            arena,
            controls: Some(controls),
            renderer: None,
            hovered: false,
            packages: Vec::new(),
            selected: None,
            shelf: Shelf::new(shelf_width, now),
            plan: PlanExecution::new(),
            torn_down: false,
        }
    }

    #[inline]
    pub fn uld(&self) -> &UldDescriptor {
        &self.uld
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

    // --- packages & shelf ---

    #[inline]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn add_package(&mut self, package: Package) {
        debug!("container: added package {}", package.id);
        self.packages.push(package);
        self.shelf.set_item_count(self.packages.len());
    }

    /// Append `package` and scroll the shelf to it once layout settles.
    pub fn add_package_and_scroll_to_end(&mut self, package: Package, now: Instant) {
        self.add_package(package);
        self.shelf.scroll_to_end_after_layout(now);
    }

    /// Remove the package at `index`. Out-of-range indices change nothing.
    pub fn remove_package(&mut self, index: usize) -> Option<Package> {
        if index >= self.packages.len() {
            return None;
        }
        let removed = self.packages.remove(index);
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        self.shelf.set_item_count(self.packages.len());
        self.shelf.check_arrow_visibility();
        debug!("container: removed package {}", removed.id);
        Some(removed)
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|&i| i < self.packages.len());
    }

    #[inline]
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_package(&self) -> Option<&Package> {
        self.selected.and_then(|i| self.packages.get(i))
    }

    #[inline]
    pub fn shelf(&self) -> &Shelf {
        &self.shelf
    }

    #[inline]
    pub fn shelf_mut(&mut self) -> &mut Shelf {
        &mut self.shelf
    }

    // --- load plan ---

    #[inline]
    pub fn plan(&self) -> &PlanExecution {
        &self.plan
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        self.plan.is_executing()
    }

    #[inline]
    pub fn last_load_plan_message(&self) -> Option<&str> {
        self.plan.last_message()
    }

    /// Start a plan execution. Returns the request to send, or `None` if the list is
    /// empty or a request is already in flight.
    pub fn execute_load_plan(&mut self) -> Option<PlanTicket> {
        if self.torn_down {
            return None;
        }
        self.plan.begin(&self.uld, &self.packages)
    }

    /// Deliver the outcome of request `token`. Returns `true` if placements changed.
    pub fn complete_load_plan(
        &mut self,
        token: u64,
        outcome: Result<LoadPlanResponse, LoadPlanError>,
    ) -> bool {
        if self.torn_down {
            debug!("container: dropping response {token} after teardown");
            return false;
        }
        match self.plan.finish(token, outcome) {
            Some(plan) => {
                self.apply_load_plan_result(&plan);
                true
            }
            None => false,
        }
    }

    /// Replace every placed box with the boxes in `plan`.
    ///
    /// Returns the number of boxes placed.
    pub fn apply_load_plan_result(&mut self, plan: &LoadPlanResponse) -> usize {
        let Some(group) = self.scene.get_mut(GROUP) else {
            return 0;
        };

        let old = group.detach_children_where(is_placement);
        let mut released = crate::scene::ReleaseCount::default();
        for node in &old {
            released += self.arena.release_subtree(node);
        }

        for pos in &plan.positions {
            let node = Self::build_placement(&mut self.arena, pos);
            group.add_child(node);
        }

        info!(
            "container: placed {} boxes (replaced {}, released {} resources)",
            plan.positions.len(),
            old.len(),
            released.total()
        );
        plan.positions.len()
    }

    fn build_placement(arena: &mut ResourceArena, pos: &PlacedPosition) -> Node3D {
        let mesh = box_mesh(pos.width, pos.height, pos.length);
        let edges = edges_mesh(&mesh, EDGE_THRESHOLD_DEG);
        Node3D::new(PLACEMENT)
            .with_tag(pos.id.clone())
            .with_transform(Transform3::from_translation(Vec3::new(pos.x, pos.y, pos.z)))
            .with_geometry(arena.add_geometry(mesh))
            .with_material(arena.add_material(placement_material()))
            .with_child(
                Node3D::new("edges")
                    .with_geometry(arena.add_geometry(edges))
                    .with_material(arena.add_material(Material::line(Rgba::from_hex(EDGE_COLOR)))),
            )
    }

    /// Placed boxes, in response order.
    pub fn placements(&self) -> impl Iterator<Item = &Node3D> + '_ {
        self.scene
            .get(GROUP)
            .into_iter()
            .flat_map(|g| g.children.iter())
            .filter(|n| is_placement(n))
    }

    pub fn placement_count(&self) -> usize {
        self.placements().count()
    }

    /// The placed box for `id`. With duplicate ids, the last one placed wins.
    pub fn placement(&self, id: &str) -> Option<&Node3D> {
        self.scene.get(GROUP).and_then(|g| {
            g.children
                .iter()
                .rev()
                .find(|n| is_placement(n) && n.tag.as_deref() == Some(id))
        })
    }

    fn placement_mut(&mut self, id: &str) -> Option<&mut Node3D> {
        self.scene.get_mut(GROUP).and_then(|g| {
            g.children
                .iter_mut()
                .rev()
                .find(|n| is_placement(n) && n.tag.as_deref() == Some(id))
        })
    }

    /// Swap the placed box for `id` to the highlight material. Unknown ids are ignored.
    pub fn highlight_package(&mut self, id: &str) -> bool {
        let Some(material) = self.placement_mut(id).and_then(|n| n.material) else {
            debug!("container: nothing placed for {id}; highlight ignored");
            return false;
        };
        self.arena.release_material(material);
        let highlight = self.arena.add_material(highlight_material());
        if let Some(node) = self.placement_mut(id) {
            node.material = Some(highlight);
        }
        true
    }

    /// Give every placed box a fresh default material.
    pub fn clear_highlight(&mut self) {
        let Some(group) = self.scene.get_mut(GROUP) else {
            return;
        };
        for node in group.children.iter_mut().filter(|n| is_placement(n)) {
            if let Some(old) = node.material {
                self.arena.release_material(old);
            }
            node.material = Some(self.arena.add_material(placement_material()));
        }
    }

    /// Material currently on the placed box for `id`.
    pub fn placement_material(&self, id: &str) -> Option<&Material> {
        self.placement(id)
            .and_then(|n| n.material)
            .and_then(|m| self.arena.material(m))
    }

    // --- interaction & frame ---

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

    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if let Some(controls) = self.controls.as_mut() {
            controls.rotate(dx, dy, viewport_height);
        }
    }

    /// Wheel input; positive steps zoom in.
    pub fn wheel(&mut self, steps: f32) {
        if let Some(controls) = self.controls.as_mut() {
            controls.zoom(steps);
        }
    }

    /// Per-frame update: spin the container unless hovered, apply orbit input and
    /// advance the shelf.
    pub fn advance_frame(&mut self, now: Instant, dt: f32) {
        if self.torn_down {
            return;
        }
        if !self.hovered {
            if let Some(group) = self.scene.get_mut(GROUP) {
                group.transform.rotate_y(SPIN_PER_FRAME);
            }
        }
        if let Some(controls) = self.controls.as_mut() {
            controls.update(&mut self.scene.camera);
        }
        self.shelf.tick(now, dt);
    }

    /// Current spin of the container group about Y, radians.
    pub fn group_yaw(&self) -> f32 {
        self.scene.get(GROUP).map_or(0.0, |g| g.transform.yaw())
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

    /// Release everything this view owns; any in-flight request is abandoned first.
    ///
    /// Returns `None` if the view was already torn down.
    pub fn teardown(&mut self) -> Option<TeardownReport> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;

        let mut report = TeardownReport::default();

        if let Some(token) = self.plan.cancel() {
            debug!("container: abandoned request {token}");
        }
        report.steps.push(TeardownStep::CancelRequest);

        if let Some(group) = self.scene.get_mut(GROUP) {
            report.released += self.arena.release_own(group);
            report.steps.push(TeardownStep::ReleaseRoot);

            for child in std::mem::take(&mut group.children) {
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
        report.released += self.arena.release_all();
        report.steps.push(TeardownStep::DropReferences);

        report.stats = self.arena.stats();
        info!(
            "container: torn down ({} geometries, {} materials released)",
            report.released.geometries, report.released.materials
        );
        Some(report)
    }
}

impl Drop for ContainerView {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::package::random_package;
    use crate::scene::MaterialKind;

    fn view() -> ContainerView {
        ContainerView::new(UldDescriptor::akc(), 800.0, Instant::now())
    }

    fn with_packages(n: usize) -> ContainerView {
        let mut v = view();
        for _ in 0..n {
            v.add_package(random_package());
        }
        v
    }

    fn plan_of(ids: &[&str]) -> LoadPlanResponse {
        let positions: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({"id": id, "x": i as f32 * 0.5, "y": 0.2, "z": -0.1,
                       "width": 0.3, "height": 0.2, "length": 0.4})
            })
            .collect();
        LoadPlanResponse::from_value(&json!({ "positions": positions }))
    }

    #[test]
    fn builds_container_group() {
        let v = view();
        let group = v.scene.get(GROUP).unwrap();
        assert_eq!(group.transform.translation.y, GROUP_LIFT);
        for name in ["wireframe", "shell", "grid"] {
            assert!(group.child(name).is_some(), "missing {name}");
        }
        let shell = group.child("shell").unwrap();
        let material = v.arena.material(shell.material.unwrap()).unwrap();
        assert_eq!(material.opacity, SHELL_OPACITY);

        let bounds = group.compute_local_bounds(&v.arena).size();
        assert!((bounds.x - 2.3368).abs() < 1e-4);
        assert!((bounds.z - 1.534).abs() < 1e-4);
        assert_eq!(v.placement_count(), 0);
    }

    #[test]
    fn camera_starts_inside_zoom_range() {
        let v = view();
        let d = v.camera().distance_to_target();
        assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&d), "distance {d}");
    }

    #[test]
    fn removing_preserves_order() {
        let mut v = with_packages(5);
        let ids: Vec<_> = v.packages().iter().map(|p| p.id.clone()).collect();
        let removed = v.remove_package(2).unwrap();
        assert_eq!(removed.id, ids[2]);
        let rest: Vec<_> = v.packages().iter().map(|p| p.id.clone()).collect();
        assert_eq!(rest, vec![ids[0].clone(), ids[1].clone(), ids[3].clone(), ids[4].clone()]);
        assert_eq!(v.shelf().item_count(), 4);

        assert!(v.remove_package(10).is_none());
        assert_eq!(v.packages().len(), 4);
    }

    #[test]
    fn removal_keeps_selection_on_the_same_package() {
        let mut v = with_packages(4);
        v.select(Some(3));
        let selected = v.selected_package().unwrap().id.clone();
        v.remove_package(1);
        assert_eq!(v.selected_package().unwrap().id, selected);
        v.remove_package(2);
        assert!(v.selected_package().is_none());
    }

    #[test]
    fn empty_list_does_not_execute() {
        let mut v = view();
        assert!(v.execute_load_plan().is_none());
        assert!(!v.is_executing());
        assert_eq!(v.placement_count(), 0);
    }

    #[test]
    fn second_trigger_while_executing_is_ignored() {
        let mut v = with_packages(2);
        assert!(v.execute_load_plan().is_some());
        assert!(v.execute_load_plan().is_none());
        assert!(v.is_executing());
    }

    #[test]
    fn single_position_is_placed_and_tagged() {
        let mut v = with_packages(1);
        let ticket = v.execute_load_plan().unwrap();
        let body = json!({"positions":[{"id":"PKG-1","x":0,"y":0.1,"z":0,"width":0.3,"height":0.2,"length":0.4}]});
        assert!(v.complete_load_plan(ticket.token, Ok(LoadPlanResponse::from_value(&body))));

        assert_eq!(v.placement_count(), 1);
        let node = v.placement("PKG-1").unwrap();
        assert_eq!(node.transform.translation, Vec3::new(0.0, 0.1, 0.0));
        let size = v.arena.geometry(node.geometry.unwrap()).unwrap().bounds().size();
        assert!((size - Vec3::new(0.3, 0.2, 0.4)).length() < 1e-6);
        assert!(node.child("edges").is_some());
        assert!(!v.is_executing());
    }

    #[test]
    fn new_result_replaces_previous_placements() {
        let mut v = with_packages(3);
        assert_eq!(v.apply_load_plan_result(&plan_of(&["A", "B", "C"])), 3);
        let live_after_first = v.arena.live_geometries();

        assert_eq!(v.apply_load_plan_result(&plan_of(&["D", "E"])), 2);
        assert_eq!(v.placement_count(), 2);
        for id in ["A", "B", "C"] {
            assert!(v.placement(id).is_none());
        }
        let tags: Vec<_> = v.placements().filter_map(|n| n.tag.clone()).collect();
        assert_eq!(tags, vec!["D".to_string(), "E".to_string()]);
        // Two geometries (box + edges) per placement.
        assert_eq!(v.arena.live_geometries(), live_after_first - 2);

        assert_eq!(v.apply_load_plan_result(&LoadPlanResponse::default()), 0);
        assert_eq!(v.placement_count(), 0);
    }

    #[test]
    fn failure_keeps_placements_and_sets_message() {
        let mut v = with_packages(2);
        v.apply_load_plan_result(&plan_of(&["A"]));
        let ticket = v.execute_load_plan().unwrap();
        let err = LoadPlanError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(!v.complete_load_plan(ticket.token, Err(err)));
        assert_eq!(
            v.last_load_plan_message(),
            Some(crate::views::plan::BACKEND_ERROR_MESSAGE)
        );
        assert!(!v.is_executing());
        assert!(v.placement("A").is_some());
    }

    #[test]
    fn highlight_and_global_clear() {
        let mut v = view();
        v.apply_load_plan_result(&plan_of(&["A", "B"]));
        let materials_before = v.arena.live_materials();

        assert!(v.highlight_package("A"));
        assert!(v.highlight_package("B"));
        let a = v.placement_material("A").unwrap();
        assert_eq!(a.color.to_hex(), HIGHLIGHT_COLOR);
        assert_eq!(a.kind, MaterialKind::Standard);
        assert!(!a.is_transparent());
        // Swapping releases the old material.
        assert_eq!(v.arena.live_materials(), materials_before);

        v.clear_highlight();
        for id in ["A", "B"] {
            let m = v.placement_material(id).unwrap();
            assert_eq!(m.color.to_hex(), PLACEMENT_COLOR);
            assert_eq!(m.opacity, PLACEMENT_OPACITY);
        }
        assert_eq!(v.arena.live_materials(), materials_before);
    }

    #[test]
    fn highlighting_unknown_id_is_a_noop() {
        let mut v = view();
        v.apply_load_plan_result(&plan_of(&["A"]));
        let stats = v.arena.stats();
        assert!(!v.highlight_package("nope"));
        assert_eq!(v.arena.stats(), stats);
    }

    #[test]
    fn spins_until_hovered() {
        let mut v = view();
        let now = Instant::now();
        for _ in 0..4 {
            v.advance_frame(now, 0.016);
        }
        assert!((v.group_yaw() - 4.0 * SPIN_PER_FRAME).abs() < 1e-5);
        v.pointer_enter();
        let yaw = v.group_yaw();
        v.advance_frame(now, 0.016);
        assert_eq!(v.group_yaw(), yaw);
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut v = view();
        let now = Instant::now();
        for _ in 0..200 {
            v.wheel(10.0);
            v.advance_frame(now, 0.016);
        }
        assert!(v.camera().distance_to_target() >= MIN_DISTANCE - 1e-4);
        for _ in 0..200 {
            v.wheel(-10.0);
            v.advance_frame(now, 0.016);
        }
        assert!(v.camera().distance_to_target() <= MAX_DISTANCE + 1e-4);
    }

    #[test]
    fn teardown_releases_everything_and_drops_late_responses() {
        let mut v = with_packages(2);
        v.apply_load_plan_result(&plan_of(&["A", "B"]));
        v.highlight_package("A");
        let ticket = v.execute_load_plan().unwrap();

        let report = v.teardown().unwrap();
        assert_eq!(report.steps.first(), Some(&TeardownStep::CancelRequest));
        assert_eq!(report.steps.last(), Some(&TeardownStep::DropReferences));
        assert!(report.stats.is_balanced());
        assert_eq!(v.arena.live_geometries(), 0);
        assert_eq!(v.arena.live_materials(), 0);

        assert!(!v.complete_load_plan(ticket.token, Ok(plan_of(&["C"]))));
        assert_eq!(v.placement_count(), 0);
        assert!(v.execute_load_plan().is_none());
        assert!(v.teardown().is_none());
    }
}
