//! App entrypoint for the rendering layer.
//!
//! This module owns:
//! - the winit application lifecycle + event loop
//! - creating the window
//! - delegating to an injected async state builder
//! - forwarding user events posted through an `EventLoopProxy`
//!
//! Design:
//! - The app runner is generic over a user-defined state type `S`.
//! - `S` must implement `AppState` (resize + render + input, and a way to request redraw).
//! - The builder is async and receives the created window and an event-loop proxy, so
//!   background work can wake the loop with `S::UserEvent`s.
//! - A failed builder stops the loop and surfaces as the runner's error.

use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::Context as _;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Window, WindowAttributes, WindowId},
};

/// App-facing configuration for running the winit event loop.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial inner size in logical pixels.
    pub size: (f64, f64),
    /// ControlFlow for the event loop. Default is `Poll` (continuous animation).
    pub control_flow: ControlFlow,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "ULD Viewer".to_string(),
            size: (1280.0, 800.0),
            control_flow: ControlFlow::Poll,
        }
    }
}

/// What the runner should do after a window event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Minimal trait a state must implement to be driven by the app runner.
pub trait AppState: 'static {
    /// Events posted to the loop from outside (e.g. background tasks).
    type UserEvent: 'static;

    /// Handle window resize.
    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>);

    /// Render one frame.
    fn render(&mut self) -> anyhow::Result<()>;

    /// Request a redraw on the underlying window (used for continuous animation).
    fn request_redraw(&self);

    /// Input and other window events not handled by the runner itself.
    fn window_event(&mut self, _event: &WindowEvent) -> Flow {
        Flow::Continue
    }

    fn user_event(&mut self, _event: Self::UserEvent) {}
}

/// Run the winit event loop with an injected async state builder.
///
/// Notes:
/// - The builder is called once when the app is resumed (after the window is created).
/// - The builder runs on the current thread using `pollster::block_on`.
pub fn run_with_builder<S, B, Fut>(config: AppConfig, builder: B) -> anyhow::Result<()>
where
    S: AppState,
    B: FnOnce(Arc<Window>, EventLoopProxy<S::UserEvent>) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<S>> + 'static,
{
    let event_loop = EventLoop::<S::UserEvent>::with_user_event()
        .build()
        .context("winit: failed to create EventLoop")?;
    event_loop.set_control_flow(config.control_flow);

    let proxy = event_loop.create_proxy();
    let mut app = App::<S>::new_with_builder(config, proxy, builder);
    event_loop
        .run_app(&mut app)
        .context("winit: run_app failed")?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Type-erased async builder for creating a state `S` from a created window.
///
/// We must return a **pinned** boxed future so `pollster::block_on(...)` can drive it.
type BoxedStateBuilder<S> = Box<
    dyn FnOnce(
            Arc<Window>,
            EventLoopProxy<<S as AppState>::UserEvent>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<S>> + 'static>>
        + 'static,
>;

/// Application state used by winit.
struct App<S: AppState> {
    config: AppConfig,
    proxy: Option<EventLoopProxy<S::UserEvent>>,
    builder: Option<BoxedStateBuilder<S>>,
    state: Option<S>,
    failure: Option<anyhow::Error>,
    exiting: bool,
}

impl<S: AppState> App<S> {
    fn new_with_builder<B, Fut>(
        config: AppConfig,
        proxy: EventLoopProxy<S::UserEvent>,
        builder: B,
    ) -> Self
    where
        B: FnOnce(Arc<Window>, EventLoopProxy<S::UserEvent>) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<S>> + 'static,
    {
        Self {
            config,
            proxy: Some(proxy),
            builder: Some(Box::new(|window, proxy| Box::pin(builder(window, proxy)))),
            state: None,
            failure: None,
            exiting: false,
        }
    }

    fn init_state(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (Some(builder), Some(proxy)) = (self.builder.take(), self.proxy.take()) else {
            return Ok(());
        };

        let (w, h) = self.config.size;
        let window = Arc::new(
            event_loop
                .create_window(
                    WindowAttributes::default()
                        .with_title(self.config.title.as_str())
                        .with_inner_size(winit::dpi::LogicalSize::new(w, h)),
                )
                .context("winit: failed to create window")?,
        );

        let state = pollster::block_on(builder(window, proxy))
            .context("failed to initialize renderer")?;
        state.request_redraw();
        self.state = Some(state);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        // Dropping the state tears the views down.
        self.state = None;
        event_loop.exit();
    }
}

impl<S: AppState> ApplicationHandler<S::UserEvent> for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.init_state(event_loop) {
            error!("{err:#}");
            self.failure = Some(err);
            self.shutdown(event_loop);
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: S::UserEvent) {
        if self.exiting {
            return;
        }
        if let Some(state) = self.state.as_mut() {
            state.user_event(event);
            state.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.exiting {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested; exiting");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                state.resize(size);
                state.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = state.render() {
                    info!("render error: {:#}", err);
                }
            }
            other => {
                if state.window_event(&other) == Flow::Exit {
                    info!("Exit requested; exiting");
                    self.shutdown(event_loop);
                }
            }
        }
    }
}
