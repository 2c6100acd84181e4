use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

/// Depth format shared by every 3D pipeline.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Minimal GPU context wrapper:
/// - Owns `wgpu::Instance`, `wgpu::Adapter`, `wgpu::Device`, `wgpu::Queue`
/// - Owns the window `Surface` and the current `SurfaceConfiguration`
/// - Owns a depth target matching the surface size
///
/// All views draw into the same surface through their own viewports; each view owns
/// its pipelines and buffers (see `MeshRenderer`), not this context.
pub struct Gpu {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    /// The surface is tied to the window.
    pub surface: wgpu::Surface<'static>,
    pub surface_format: wgpu::TextureFormat,

    pub size: winit::dpi::PhysicalSize<u32>,
    pub config: wgpu::SurfaceConfiguration,

    depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
}

impl Gpu {
    /// Create a GPU context for the given window.
    ///
    /// Notes:
    /// - Chooses the first surface format from surface capabilities.
    /// - Configures the surface immediately.
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let size = window.inner_size();

        // Create a 'static surface by cloning the Arc<Window>.
        // The surface must not outlive the window; the shell keeps the window alive.
        let surface = instance
            .create_surface(window)
            .context("wgpu: failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .context("wgpu: failed to request adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .context("wgpu: failed to request device")?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .first()
            .copied()
            .context("wgpu: surface reported no supported formats")?;

        let config = Self::make_surface_config(size, surface_format);
        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &config);
        }

        let (depth_texture, depth_view) = Self::make_depth_target(&device, size);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_format,
            size,
            config,
            depth_texture,
            depth_view,
        })
    }

    /// Format views render into (SRGB variant of the surface format).
    #[inline]
    pub fn view_format(&self) -> wgpu::TextureFormat {
        self.surface_format.add_srgb_suffix()
    }

    /// Reconfigure the surface (and depth target) for a new size.
    ///
    /// You should call this on `WindowEvent::Resized`.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        // Avoid configuring 0-sized surfaces; winit can report 0 during minimize.
        if new_size.width == 0 || new_size.height == 0 {
            self.size = new_size;
            self.config.width = 0;
            self.config.height = 0;
            return;
        }

        self.size = new_size;
        self.config = Self::make_surface_config(new_size, self.surface_format);
        self.surface.configure(&self.device, &self.config);

        self.depth_texture.destroy();
        let (depth_texture, depth_view) = Self::make_depth_target(&self.device, new_size);
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    /// Acquire the next frame from the surface.
    ///
    /// Returns the surface texture and its view in the SRGB view format.
    /// `SurfaceError` is returned as-is so callers can decide whether to reconfigure,
    /// retry, or give up on the frame.
    pub fn acquire_frame(
        &self,
    ) -> Result<(wgpu::SurfaceTexture, wgpu::TextureView), wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.view_format()),
                ..Default::default()
            });

        Ok((surface_texture, view))
    }

    fn make_surface_config(
        size: winit::dpi::PhysicalSize<u32>,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            // We render into SRGB view format for correct gamma.
            view_formats: vec![surface_format.add_srgb_suffix()],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            width: size.width,
            height: size.height,
            desired_maximum_frame_latency: 2,
            present_mode: wgpu::PresentMode::AutoVsync,
        }
    }

    fn make_depth_target(
        device: &wgpu::Device,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }
}
