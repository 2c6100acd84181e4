//! Thin binary wrapper; the viewer lives in the `uld_viewer` library.
//!
//! Run:
//! - `cargo run`
//! - `RUST_LOG=uld_viewer=debug cargo run` for request and teardown logs

fn main() -> anyhow::Result<()> {
    // Keep logging setup in the binary so the library remains unopinionated.
    env_logger::init();

    uld_viewer::run_app()
}
