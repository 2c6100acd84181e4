//! A per-view 3D mesh renderer.
//!
//! Each view owns one `MeshRenderer`. It draws the view's flattened scene
//! (`scene::DrawItem3D`) into a viewport of the shared surface:
//! - opaque triangles first (depth write on)
//! - line primitives (outlines, grids)
//! - transparent triangles last, back to front, depth test only
//!
//! GPU vertex/index buffers are cached per `GeometryId`. Geometry that the view's
//! `ResourceArena` no longer holds is evicted (and its buffers destroyed) at the next
//! draw, so the GPU side follows the arena's allocations and releases.
//!
//! Per-item uniforms live in one buffer written once per draw; each draw call binds
//! its slice through a dynamic offset.
//!
//! [`MeshRenderer::dispose`] destroys every GPU resource the renderer owns. After
//! that, `draw` is a no-op and `is_disposed` reports `true`.

use std::{borrow::Cow, collections::HashMap, mem};

use anyhow::Context as _;
use glam::Vec3;
use log::debug;
use wgpu::util::DeviceExt;

use crate::render::gpu::{DEPTH_FORMAT, Gpu};
use crate::scene::{
    DrawItem3D, GeometryId, KeyLight, Material, Mesh3D, ResourceArena, Scene3D, Topology,
};

fn round_up_to(v: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (v + (align - 1)) & !(align - 1)
}

/// GPU vertex format for 3D meshes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex3D {
    pub const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    #[inline]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Uniforms for one draw item. Must match `Item` in `shaders/mesh3d.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct ItemUniforms {
    clip_from_local: [[f32; 4]; 4],
    world_from_local: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    ambient: [f32; 4],
    light_color: [f32; 4],
    light_position: [f32; 4],
    camera_position: [f32; 4],
    params: [f32; 4],
}

impl ItemUniforms {
    fn new(scene: &Scene3D, item: &DrawItem3D, material: &Material) -> Self {
        let camera = &scene.camera;
        let lighting = &scene.lighting;
        let clip_from_local = camera.clip_from_world() * item.world_from_local;

        let (light_color, light_position, spot_cos) = match lighting.key {
            Some(KeyLight::Directional {
                color,
                intensity,
                position,
            }) => (color.scaled(intensity), position.extend(1.0), 0.0),
            Some(KeyLight::Spot {
                color,
                intensity,
                position,
                angle,
            }) => (color.scaled(intensity), position.extend(2.0), angle.cos()),
            None => (crate::scene::Rgba::BLACK, Vec3::ZERO.extend(0.0), 0.0),
        };

        Self {
            clip_from_local: clip_from_local.to_cols_array_2d(),
            world_from_local: item.world_from_local.to_cols_array_2d(),
            color: material.color.with_alpha(material.opacity).to_array(),
            emissive: material
                .emissive
                .scaled(material.emissive_intensity)
                .to_array(),
            ambient: lighting
                .ambient
                .scaled(lighting.ambient_intensity)
                .to_array(),
            light_color: light_color.to_array(),
            light_position: light_position.to_array(),
            camera_position: camera.position.extend(1.0).to_array(),
            params: [
                if material.is_lit() { 1.0 } else { 0.0 },
                spot_cos,
                material.roughness,
                material.metalness,
            ],
        }
    }
}

/// Sub-rectangle of the render target, in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }

    /// True if the viewport lies entirely inside a `target_w x target_h` target.
    #[inline]
    pub fn fits(&self, target_w: u32, target_h: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= target_w as f32
            && self.y + self.height <= target_h as f32
    }

    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.width && py < self.y + self.height
    }
}

/// Which pipeline an item goes through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Pass {
    Opaque,
    Lines,
    Transparent,
}

fn pass_for(topology: Topology, material: &Material) -> Pass {
    match topology {
        Topology::Lines => Pass::Lines,
        Topology::Triangles if material.is_transparent() => Pass::Transparent,
        Topology::Triangles => Pass::Opaque,
    }
}

/// Draw order: opaque, then lines, then transparent items farthest first.
///
/// `entries` are `(pass, view-space depth, payload)`; depth is the distance from the
/// camera along its view direction.
fn sort_for_drawing<T>(entries: &mut [(Pass, f32, T)]) {
    entries.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            if a.0 == Pass::Transparent {
                b.1.total_cmp(&a.1)
            } else {
                std::cmp::Ordering::Equal
            }
        })
    });
}

/// Convert a scene mesh into GPU vertex data. Missing normals become zero.
fn build_vertices(mesh: &Mesh3D) -> Vec<Vertex3D> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| Vertex3D {
            position,
            normal: mesh.normals.get(i).copied().unwrap_or([0.0; 3]),
        })
        .collect()
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    topology: Topology,
}

impl GpuGeometry {
    fn upload(gpu: &Gpu, id: GeometryId, mesh: &Mesh3D) -> Self {
        let vertices = build_vertices(mesh);
        let vertex_label = format!("MeshRenderer Vertex Buffer #{}", id.index());
        let index_label = format!("MeshRenderer Index Buffer #{}", id.index());
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(vertex_label.as_str()),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(index_label.as_str()),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            topology: mesh.topology,
        }
    }

    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

pub struct MeshRenderer {
    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,

    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// Bytes between consecutive items (uniform size rounded to the offset alignment).
    uniform_stride: u64,
    /// Items the uniform buffer can hold.
    uniform_capacity: u64,

    geometry: HashMap<GeometryId, GpuGeometry>,
    disposed: bool,
}

impl MeshRenderer {
    pub fn new(gpu: &Gpu) -> anyhow::Result<Self> {
        let shader = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("MeshRenderer Shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                    "shaders/mesh3d.wgsl"
                ))),
            });

        let uniform_size = mem::size_of::<ItemUniforms>() as u64;
        let uniform_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("MeshRenderer Uniform BGL"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(uniform_size),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("MeshRenderer Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout],
                immediate_size: 0,
            });

        let opaque_pipeline = Self::create_pipeline(
            gpu,
            &pipeline_layout,
            &shader,
            wgpu::PrimitiveTopology::TriangleList,
            true,
            "MeshRenderer Opaque Pipeline",
        );
        let transparent_pipeline = Self::create_pipeline(
            gpu,
            &pipeline_layout,
            &shader,
            wgpu::PrimitiveTopology::TriangleList,
            false,
            "MeshRenderer Transparent Pipeline",
        );
        let line_pipeline = Self::create_pipeline(
            gpu,
            &pipeline_layout,
            &shader,
            wgpu::PrimitiveTopology::LineList,
            true,
            "MeshRenderer Line Pipeline",
        );

        let align = u64::from(gpu.device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = round_up_to(uniform_size, align.max(1).next_power_of_two());
        let uniform_capacity = 64;
        let (uniform_buffer, uniform_bind_group) =
            Self::create_uniforms(gpu, &uniform_layout, uniform_stride, uniform_capacity)?;

        Ok(Self {
            opaque_pipeline,
            transparent_pipeline,
            line_pipeline,
            uniform_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_capacity,
            geometry: HashMap::new(),
            disposed: false,
        })
    }

    fn create_pipeline(
        gpu: &Gpu,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        topology: wgpu::PrimitiveTopology,
        depth_write: bool,
        label: &str,
    ) -> wgpu::RenderPipeline {
        gpu.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex3D::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.view_format(),
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    front_face: wgpu::FrontFace::Ccw,
                    // Shells and planes are seen from both sides.
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
    }

    fn create_uniforms(
        gpu: &Gpu,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: u64,
    ) -> anyhow::Result<(wgpu::Buffer, wgpu::BindGroup)> {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MeshRenderer Uniform Buffer"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let binding_size = wgpu::BufferSize::new(mem::size_of::<ItemUniforms>() as u64)
            .context("uniform block has zero size")?;
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MeshRenderer Uniform BG"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: Some(binding_size),
                }),
            }],
        });
        Ok((buffer, bind_group))
    }

    /// Ensure the uniform buffer can hold `items` entries.
    fn ensure_uniform_capacity(&mut self, gpu: &Gpu, items: u64) -> anyhow::Result<()> {
        if items <= self.uniform_capacity {
            return Ok(());
        }
        let capacity = items.next_power_of_two().max(64);
        let (buffer, bind_group) =
            Self::create_uniforms(gpu, &self.uniform_layout, self.uniform_stride, capacity)?;
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        self.uniform_capacity = capacity;
        Ok(())
    }

    /// Destroy cached buffers for geometry the arena has released.
    ///
    /// Returns how many cache entries were evicted.
    pub fn evict_released(&mut self, arena: &ResourceArena) -> usize {
        let before = self.geometry.len();
        self.geometry.retain(|&id, gpu_geometry| {
            let live = arena.is_geometry_live(id);
            if !live {
                gpu_geometry.destroy();
            }
            live
        });
        before - self.geometry.len()
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Draw the scene into `viewport` of the current render pass.
    ///
    /// The caller owns the pass (and its color/depth clears). `scene.camera.aspect`
    /// should already match the viewport.
    pub fn draw(
        &mut self,
        gpu: &Gpu,
        pass: &mut wgpu::RenderPass<'_>,
        scene: &Scene3D,
        arena: &ResourceArena,
        viewport: Viewport,
    ) -> anyhow::Result<()> {
        if self.disposed || viewport.is_empty() {
            return Ok(());
        }

        let evicted = self.evict_released(arena);
        if evicted > 0 {
            debug!("mesh renderer: evicted {evicted} released geometries");
        }

        let view_from_world = scene.camera.view_from_world();
        let mut entries = Vec::new();
        for item in scene.flatten() {
            let (Some(mesh), Some(material)) =
                (arena.geometry(item.geometry), arena.material(item.material))
            else {
                continue;
            };
            if mesh.is_empty() {
                continue;
            }
            if !self.geometry.contains_key(&item.geometry) {
                self.geometry
                    .insert(item.geometry, GpuGeometry::upload(gpu, item.geometry, mesh));
            }

            let center = item.world_from_local.transform_point3(mesh.bounds().center());
            let depth = -view_from_world.transform_point3(center).z;
            let uniforms = ItemUniforms::new(scene, &item, material);
            entries.push((pass_for(mesh.topology, material), depth, (item.geometry, uniforms)));
        }

        if entries.is_empty() {
            return Ok(());
        }
        sort_for_drawing(&mut entries);

        self.ensure_uniform_capacity(gpu, entries.len() as u64)?;

        // One upload for every item, each at its own aligned offset.
        let stride = self.uniform_stride as usize;
        let mut staging = vec![0u8; stride * entries.len()];
        for (i, (_, _, (_, uniforms))) in entries.iter().enumerate() {
            let bytes = bytemuck::bytes_of(uniforms);
            staging[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
        }
        gpu.queue.write_buffer(&self.uniform_buffer, 0, &staging);

        pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            0.0,
            1.0,
        );

        let mut bound = None;
        for (i, (which, _, (geometry_id, _))) in entries.iter().enumerate() {
            let Some(geometry) = self.geometry.get(geometry_id) else {
                continue;
            };
            debug_assert_eq!(
                geometry.topology == Topology::Lines,
                *which == Pass::Lines
            );

            if bound != Some(*which) {
                pass.set_pipeline(match which {
                    Pass::Opaque => &self.opaque_pipeline,
                    Pass::Lines => &self.line_pipeline,
                    Pass::Transparent => &self.transparent_pipeline,
                });
                bound = Some(*which);
            }

            let offset = (i as u64 * self.uniform_stride) as u32;
            pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
            pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
            pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..geometry.index_count, 0, 0..1);
        }

        Ok(())
    }

    /// Destroy every cached geometry buffer. Returns how many geometries were dropped.
    pub fn release_geometry(&mut self) -> usize {
        let count = self.geometry.len();
        for (_, gpu_geometry) in self.geometry.drain() {
            gpu_geometry.destroy();
        }
        count
    }

    /// Destroy all GPU resources and stop drawing. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let geometries = self.release_geometry();
        self.uniform_buffer.destroy();
        self.disposed = true;
        debug!("mesh renderer: disposed ({geometries} geometries)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Rgba;

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        // 2 mat4 + 7 vec4, 16-byte aligned.
        assert_eq!(mem::size_of::<ItemUniforms>(), 2 * 64 + 7 * 16);
        assert_eq!(mem::size_of::<ItemUniforms>() % 16, 0);
        assert_eq!(mem::size_of::<Vertex3D>(), 24);
    }

    #[test]
    fn round_up_respects_alignment() {
        assert_eq!(round_up_to(240, 256), 256);
        assert_eq!(round_up_to(256, 256), 256);
        assert_eq!(round_up_to(5, 4), 8);
    }

    #[test]
    fn passes_follow_topology_and_opacity() {
        let solid = Material::standard(Rgba::WHITE);
        let glass = Material::basic(Rgba::WHITE).with_opacity(0.1);
        assert_eq!(pass_for(Topology::Triangles, &solid), Pass::Opaque);
        assert_eq!(pass_for(Topology::Triangles, &glass), Pass::Transparent);
        assert_eq!(pass_for(Topology::Lines, &glass), Pass::Lines);
    }

    #[test]
    fn transparent_items_draw_last_and_far_to_near() {
        let mut entries = vec![
            (Pass::Transparent, 1.0, "near glass"),
            (Pass::Lines, 3.0, "outline"),
            (Pass::Transparent, 5.0, "far glass"),
            (Pass::Opaque, 2.0, "box"),
        ];
        sort_for_drawing(&mut entries);
        let order: Vec<_> = entries.iter().map(|e| e.2).collect();
        assert_eq!(order, vec!["box", "outline", "far glass", "near glass"]);
    }

    #[test]
    fn vertices_take_normals_when_present() {
        let mesh = crate::geometry::box_mesh(1.0, 1.0, 1.0);
        let verts = build_vertices(&mesh);
        assert_eq!(verts.len(), mesh.positions.len());
        assert!(verts.iter().all(|v| v.normal != [0.0; 3]));

        let lines = crate::geometry::edges_mesh(&mesh, crate::geometry::EDGE_THRESHOLD_DEG);
        assert!(build_vertices(&lines).iter().all(|v| v.normal == [0.0; 3]));
    }

    #[test]
    fn viewport_bounds() {
        let vp = Viewport::new(10.0, 20.0, 100.0, 50.0);
        assert!(vp.fits(110, 70));
        assert!(!vp.fits(109, 70));
        assert!(vp.contains(10.0, 20.0));
        assert!(!vp.contains(110.0, 20.0));
        assert!(Viewport::new(0.0, 0.0, 0.5, 10.0).is_empty());
    }
}
