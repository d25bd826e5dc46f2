//! Native egui viewer for arface.
//!
//! Provides a desktop window with:
//! - Camera background and overlays rendered through wgpu
//! - Filter toggle (button or click on the viewport)
//! - Pause/resume, which releases and rebuilds GPU resources
//! - Display rotation and recent notices
//!
//! Enabled via `--features native-ui`.

mod app;
mod viewport;

pub use app::ArFaceApp;
