//! The viewer's screens: one container view, one package view per shelf slot,
//! the shelf's scroll state and the load-plan execution state.

pub mod container_view;
pub mod package_view;
pub mod plan;
pub mod shelf;

pub use container_view::ContainerView;
pub use package_view::PackageView;
pub use plan::{PlanExecution, PlanState, PlanTicket};
pub use shelf::{ScrollDirection, Shelf};

use crate::scene::{ReleaseCount, arena::ArenaStats};

/// One stage of a view teardown, in the order they run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TeardownStep {
    /// Abandon an in-flight planning request.
    CancelRequest,
    /// The root node's own geometry and material.
    ReleaseRoot,
    /// Every decoration/child below the root, released and detached.
    ReleaseChildren,
    /// Orbit controls and the renderer's cached buffers.
    ReleaseControls,
    /// The renderer's GPU context (pipelines, uniforms).
    InvalidateContext,
    /// Scene graph and renderer handles dropped.
    DropReferences,
}

/// What a teardown did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeardownReport {
    pub steps: Vec<TeardownStep>,
    pub released: ReleaseCount,
    /// GPU geometry buffers destroyed.
    pub gpu_geometries: usize,
    /// Arena counters after the teardown.
    pub stats: ArenaStats,
}
