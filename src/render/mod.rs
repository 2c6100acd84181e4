//! Rendering module root.
//!
//! The `render` module owns the window/event-loop integration, the shared GPU
//! context and the per-view mesh renderer.
//!
//! Entrypoint: `render::app::run_with_builder()`.

pub mod app;

/// Device, queue, surface and depth target shared by all views.
pub mod gpu;

/// Frame timing and small numeric helpers.
pub mod util;

/// Lit/unlit/line renderer for 3D scene draw items.
pub mod mesh_renderer;
