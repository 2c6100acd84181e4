//! `uld_viewer` library crate root.
//!
//! A native viewer for air-cargo container (ULD) load plans: it renders the
//! container, keeps a shelf of packages, sends them to an external planning
//! service and shows the returned placement in 3D.
//!
//! The binary target stays thin and calls into [`run_app`]. Modules are public so
//! the pieces (client, views, scene) can be used and tested on their own.

pub mod client;
pub mod geometry;
pub mod package;
pub mod render;
pub mod scene;
pub mod shell;
pub mod uld;
pub mod views;

use std::sync::Arc;

use render::app::AppConfig;
use shell::{Shell, ShellConfig, ShellEvent};
use winit::{event_loop::EventLoopProxy, window::Window};

/// Run the viewer with default window and endpoint settings.
///
/// Note: This function does **not** initialize logging; callers can decide their own
/// logging setup.
pub fn run_app() -> anyhow::Result<()> {
    run_app_with(AppConfig::default(), ShellConfig::default())
}

/// Run the viewer with explicit window and shell settings.
pub fn run_app_with(app: AppConfig, shell: ShellConfig) -> anyhow::Result<()> {
    render::app::run_with_builder::<Shell, _, _>(
        app,
        move |window: Arc<Window>, proxy: EventLoopProxy<ShellEvent>| async move {
            Shell::new(window, proxy, shell).await
        },
    )
}
