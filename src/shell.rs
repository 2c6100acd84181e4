//! Composition root: one window showing the container view above a shelf of
//! package views.
//!
//! The shell owns the GPU context, a small tokio runtime for the planning request
//! and the event-loop proxy the request uses to hand its outcome back to the UI
//! thread. Everything else (scene state, plan state, shelf state) lives in the views.
//!
//! Layout, in logical pixels:
//!
//! ```text
//! +-------------------------------------+
//! |                                     |
//! |           container view            |
//! |                                     |
//! +------+------+------+------+---------+
//! | pkg  | pkg  | pkg  | pkg  |  ...    |  <- shelf strip, SHELF_HEIGHT tall,
//! +------+------+------+------+---------+     SLOT_WIDTH_PX per slot
//! ```

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
    event_loop::EventLoopProxy,
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::client::{DEFAULT_ENDPOINT, LoadPlanClient, LoadPlanError, LoadPlanResponse};
use crate::render::app::{AppState, Flow};
use crate::render::gpu::Gpu;
use crate::render::mesh_renderer::Viewport;
use crate::render::util::FrameClock;
use crate::package::{Package, random_package};
use crate::uld::UldDescriptor;
use crate::views::shelf::SLOT_WIDTH_PX;
use crate::views::{ContainerView, PackageView, ScrollDirection, Shelf};

/// Height of the package shelf strip, logical pixels.
pub const SHELF_HEIGHT: f32 = 160.0;
/// Shelf pixels scrolled per wheel line.
const WHEEL_LINE_PX: f32 = 40.0;
/// Wheel pixels per zoom step for touchpads reporting pixel deltas.
const PIXELS_PER_ZOOM_STEP: f32 = 50.0;

/// Shell settings that are not about the window.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Load-planning endpoint.
    pub endpoint: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Events posted back to the UI thread.
#[derive(Debug)]
pub enum ShellEvent {
    LoadPlanFinished {
        token: u64,
        outcome: Result<LoadPlanResponse, LoadPlanError>,
    },
}

/// User commands, independent of which key produced them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    AddPackage,
    RemoveSelected,
    ExecuteLoadPlan,
    Scroll(ScrollDirection),
    HighlightSelected,
    ClearHighlight,
    Close,
}

/// Map a pressed key to a command.
pub fn command_for_key(key: &Key) -> Option<Command> {
    match key {
        Key::Named(NamedKey::Delete | NamedKey::Backspace) => Some(Command::RemoveSelected),
        Key::Named(NamedKey::Enter) => Some(Command::ExecuteLoadPlan),
        Key::Named(NamedKey::ArrowLeft) => Some(Command::Scroll(ScrollDirection::Left)),
        Key::Named(NamedKey::ArrowRight) => Some(Command::Scroll(ScrollDirection::Right)),
        Key::Named(NamedKey::Escape) => Some(Command::Close),
        Key::Character(c) => match c.to_ascii_lowercase().as_str() {
            "a" => Some(Command::AddPackage),
            "e" => Some(Command::ExecuteLoadPlan),
            "h" => Some(Command::HighlightSelected),
            "c" => Some(Command::ClearHighlight),
            _ => None,
        },
        _ => None,
    }
}

/// What the pointer is over.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HoverTarget {
    Nothing,
    Container,
    Slot(usize),
}

/// Screen split, logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Layout {
    pub width: f32,
    pub container_height: f32,
    pub shelf_height: f32,
}

impl Layout {
    pub fn new(width: f32, height: f32) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let shelf_height = SHELF_HEIGHT.min(height);
        Self {
            width,
            container_height: height - shelf_height,
            shelf_height,
        }
    }

    /// Container viewport in physical pixels.
    pub fn container_viewport(&self, scale: f32) -> Viewport {
        Viewport::new(0.0, 0.0, self.width * scale, self.container_height * scale)
    }

    /// Viewport of a shelf slot starting at logical `x`, in physical pixels.
    pub fn slot_viewport(&self, x: f32, scale: f32) -> Viewport {
        Viewport::new(
            x * scale,
            self.container_height * scale,
            SLOT_WIDTH_PX * scale,
            self.shelf_height * scale,
        )
    }

    /// Hit-test a logical point.
    pub fn hit_test(&self, shelf: &Shelf, x: f32, y: f32) -> HoverTarget {
        if x < 0.0 || x > self.width || y < 0.0 {
            HoverTarget::Nothing
        } else if y < self.container_height {
            HoverTarget::Container
        } else if y <= self.container_height + self.shelf_height {
            shelf
                .slot_at(x)
                .map_or(HoverTarget::Nothing, HoverTarget::Slot)
        } else {
            HoverTarget::Nothing
        }
    }
}

/// Shelf scroll arrows as title text: `<` and `>` when there is more to see that way.
fn shelf_arrows(shelf: &Shelf) -> &'static str {
    match (shelf.can_scroll_left(), shelf.can_scroll_right()) {
        (false, false) => "",
        (true, false) => " <",
        (false, true) => " >",
        (true, true) => " < >",
    }
}

/// Title line reflecting package count, shelf arrows, placement count and plan state.
pub fn window_title(container: &ContainerView) -> String {
    let mut title = format!(
        "ULD Viewer | {} {}{} | {} placed",
        container.packages().len(),
        if container.packages().len() == 1 {
            "package"
        } else {
            "packages"
        },
        shelf_arrows(container.shelf()),
        container.placement_count()
    );
    if container.is_executing() {
        title.push_str(" | executing load plan...");
    }
    if let Some(message) = container.last_load_plan_message() {
        title.push_str(" | ");
        title.push_str(message);
    }
    title
}

/// The container view, one package view per shelf slot, and which of them the
/// pointer is over.
///
/// `package_views[i]` always shows `container.packages()[i]`. Hover flags live on
/// the views; `hover` records which one currently has it.
struct Stage {
    container: ContainerView,
    package_views: Vec<PackageView>,
    hover: HoverTarget,
}

impl Stage {
    fn new(container: ContainerView) -> Self {
        Self {
            container,
            package_views: Vec::new(),
            hover: HoverTarget::Nothing,
        }
    }

    /// Append a package with its (already attached) view and scroll to it.
    fn add_package(&mut self, package: Package, view: PackageView, now: Instant) {
        self.container.add_package_and_scroll_to_end(package, now);
        self.package_views.push(view);
    }

    /// Remove the package at `index` and its view.
    ///
    /// Views after `index` shift down, so the hover is dropped first and resolved
    /// again from `cursor` against the new layout.
    fn remove_package(
        &mut self,
        index: usize,
        layout: &Layout,
        cursor: Option<(f32, f32)>,
    ) -> bool {
        if index >= self.package_views.len() {
            return false;
        }
        self.set_hover(HoverTarget::Nothing);
        if self.container.remove_package(index).is_some() {
            // Dropping the view tears it down.
            self.package_views.remove(index);
        }
        if let Some((x, y)) = cursor {
            let target = layout.hit_test(self.container.shelf(), x, y);
            self.set_hover(target);
        }
        true
    }

    /// Move the hover to `target`, telling the view that loses it and the one that
    /// gains it.
    fn set_hover(&mut self, target: HoverTarget) {
        if target == self.hover {
            return;
        }
        match self.hover {
            HoverTarget::Container => self.container.pointer_leave(),
            HoverTarget::Slot(i) => {
                if let Some(view) = self.package_views.get_mut(i) {
                    view.pointer_leave();
                }
            }
            HoverTarget::Nothing => {}
        }
        match target {
            HoverTarget::Container => self.container.pointer_enter(),
            HoverTarget::Slot(i) => {
                if let Some(view) = self.package_views.get_mut(i) {
                    view.pointer_enter();
                }
            }
            HoverTarget::Nothing => {}
        }
        self.hover = target;
    }

    fn teardown(&mut self) {
        if let Some(report) = self.container.teardown() {
            debug!("shell: container teardown {:?}", report.steps);
        }
        for mut view in self.package_views.drain(..) {
            view.teardown();
        }
    }
}

pub struct Shell {
    window: Arc<Window>,
    gpu: Gpu,

    runtime: tokio::runtime::Runtime,
    client: LoadPlanClient,
    proxy: EventLoopProxy<ShellEvent>,
    in_flight: Option<JoinHandle<()>>,

    stage: Stage,

    layout: Layout,
    clock: FrameClock,
    cursor: Option<(f32, f32)>,
    dragging: bool,
    title: String,
}

impl Shell {
    pub async fn new(
        window: Arc<Window>,
        proxy: EventLoopProxy<ShellEvent>,
        config: ShellConfig,
    ) -> anyhow::Result<Self> {
        let gpu = Gpu::new(window.clone()).await?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("load-plan")
            .enable_all()
            .build()
            .context("tokio: failed to start runtime")?;

        let scale = window.scale_factor() as f32;
        let layout = Layout::new(
            gpu.size.width as f32 / scale,
            gpu.size.height as f32 / scale,
        );

        let mut container = ContainerView::new(UldDescriptor::akc(), layout.width, Instant::now());
        container.attach(&gpu)?;

        info!("shell: ready, planning endpoint {}", config.endpoint);

        Ok(Self {
            window,
            gpu,
            runtime,
            client: LoadPlanClient::with_endpoint(config.endpoint),
            proxy,
            in_flight: None,
            stage: Stage::new(container),
            layout,
            clock: FrameClock::new(),
            cursor: None,
            dragging: false,
            title: String::new(),
        })
    }

    #[inline]
    fn scale(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn apply(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::AddPackage => {
                let package = random_package();
                let mut view = PackageView::new(&package);
                view.attach(&self.gpu)?;
                self.stage.add_package(package, view, self.clock.last());
            }
            Command::RemoveSelected => {
                if let Some(index) = self.stage.container.selected_index() {
                    self.stage.remove_package(index, &self.layout, self.cursor);
                }
            }
            Command::ExecuteLoadPlan => self.execute_load_plan(),
            Command::Scroll(direction) => {
                let now = self.clock.last();
                let shelf = self.stage.container.shelf_mut();
                if shelf.can_scroll(direction) {
                    shelf.scroll(direction, now);
                }
            }
            Command::HighlightSelected => {
                if let Some(id) = self.stage.container.selected_package().map(|p| p.id.clone()) {
                    self.stage.container.highlight_package(&id);
                }
            }
            Command::ClearHighlight => self.stage.container.clear_highlight(),
            Command::Close => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn execute_load_plan(&mut self) {
        let Some(ticket) = self.stage.container.execute_load_plan() else {
            return;
        };

        let client = self.client.clone();
        let proxy = self.proxy.clone();
        let handle = self.runtime.spawn(async move {
            let outcome = client.execute(&ticket.uld, &ticket.packages).await;
            let event = ShellEvent::LoadPlanFinished {
                token: ticket.token,
                outcome,
            };
            if proxy.send_event(event).is_err() {
                debug!("shell: event loop closed; dropping load plan {}", ticket.token);
            }
        });
        self.in_flight = Some(handle);
    }

    fn pointer_moved(&mut self, x: f32, y: f32) {
        if let (true, Some((px, py))) = (self.dragging, self.cursor) {
            let (dx, dy) = (x - px, y - py);
            match self.stage.hover {
                HoverTarget::Container => {
                    self.stage
                        .container
                        .drag(dx, dy, self.layout.container_height)
                }
                HoverTarget::Slot(i) => {
                    if let Some(view) = self.stage.package_views.get_mut(i) {
                        view.drag(dx, dy, self.layout.shelf_height);
                    }
                }
                HoverTarget::Nothing => {}
            }
        }
        self.cursor = Some((x, y));
        // Keep the dragged view hovered even if the pointer slips off it.
        if !self.dragging {
            let target = self.layout.hit_test(self.stage.container.shelf(), x, y);
            self.stage.set_hover(target);
        }
    }

    fn wheel(&mut self, lines: f32) {
        match self.stage.hover {
            HoverTarget::Container => self.stage.container.wheel(lines),
            HoverTarget::Slot(_) => self
                .stage
                .container
                .shelf_mut()
                .scroll_by_px(-lines * WHEEL_LINE_PX),
            HoverTarget::Nothing => {}
        }
    }

    fn sync_title(&mut self) {
        let title = window_title(&self.stage.container);
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}

impl AppState for Shell {
    type UserEvent = ShellEvent;

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        let scale = self.scale();
        self.layout = Layout::new(
            new_size.width as f32 / scale,
            new_size.height as f32 / scale,
        );
        self.stage.container.shelf_mut().on_resize(self.layout.width);
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let dt = self.clock.tick();
        let now = self.clock.last();
        self.stage.container.advance_frame(now, dt);
        for view in &mut self.stage.package_views {
            view.advance_frame();
        }
        self.sync_title();

        if self.gpu.config.width == 0 || self.gpu.config.height == 0 {
            self.request_redraw();
            return Ok(());
        }

        // Acquire frame (handle recoverable surface errors).
        let (surface_texture, view) = match self.gpu.acquire_frame() {
            Ok(v) => v,
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                self.gpu.resize(self.gpu.size);
                self.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                self.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow::anyhow!("wgpu SurfaceError::OutOfMemory"));
            }
            Err(wgpu::SurfaceError::Other) => {
                self.gpu.resize(self.gpu.size);
                self.request_redraw();
                return Ok(());
            }
        };

        let gpu = &self.gpu;
        let scale = self.window.scale_factor() as f32;
        let (target_w, target_h) = (gpu.config.width, gpu.config.height);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.06,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let container_vp = self.layout.container_viewport(scale);
            if container_vp.fits(target_w, target_h) {
                self.stage.container.draw(gpu, &mut pass, container_vp)?;
            }

            // wgpu viewports must lie inside the target, so partly scrolled-out slots
            // are skipped.
            let shelf = self.stage.container.shelf();
            let slots: Vec<_> = shelf
                .fully_visible_slots()
                .map(|i| (i, shelf.slot_span(i).0))
                .collect();
            for (i, x) in slots {
                let vp = self.layout.slot_viewport(x, scale);
                if !vp.fits(target_w, target_h) {
                    continue;
                }
                if let Some(package_view) = self.stage.package_views.get_mut(i) {
                    package_view.draw(gpu, &mut pass, vp)?;
                }
            }
        }

        gpu.queue.submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        surface_texture.present();

        self.request_redraw();
        Ok(())
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }

    fn window_event(&mut self, event: &WindowEvent) -> Flow {
        let scale = self.scale();
        match event {
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let Some(command) = command_for_key(&event.logical_key) else {
                    return Flow::Continue;
                };
                match self.apply(command) {
                    Ok(flow) => {
                        self.sync_title();
                        return flow;
                    }
                    Err(err) => warn!("shell: {command:?} failed: {err:#}"),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x as f32 / scale, position.y as f32 / scale);
            }
            WindowEvent::CursorLeft { .. } => {
                if !self.dragging {
                    self.cursor = None;
                    self.stage.set_hover(HoverTarget::Nothing);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.dragging = true;
                    if let HoverTarget::Slot(i) = self.stage.hover {
                        self.stage.container.select(Some(i));
                        self.sync_title();
                    }
                }
                ElementState::Released => {
                    self.dragging = false;
                    if let Some((x, y)) = self.cursor {
                        let target = self.layout.hit_test(self.stage.container.shelf(), x, y);
                        self.stage.set_hover(target);
                    }
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_ZOOM_STEP,
                };
                self.wheel(lines);
            }
            WindowEvent::Touch(touch) => {
                let (x, y) = (
                    touch.location.x as f32 / scale,
                    touch.location.y as f32 / scale,
                );
                match touch.phase {
                    TouchPhase::Started => {
                        let target = self.layout.hit_test(self.stage.container.shelf(), x, y);
                        self.stage.set_hover(target);
                        self.cursor = Some((x, y));
                    }
                    TouchPhase::Moved => {}
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.stage.set_hover(HoverTarget::Nothing);
                    }
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    fn user_event(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::LoadPlanFinished { token, outcome } => {
                self.in_flight = None;
                self.stage.container.complete_load_plan(token, outcome);
                self.sync_title();
            }
        }
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.stage.teardown();
    }
}
