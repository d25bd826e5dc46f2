//! Render module
//!
//! GPU side of the engine:
//! - Quad geometry for billboards and the camera background
//! - Overlay texture loading and upload
//! - The wgpu renderer (offscreen target, blit, readback)
//! - Explicit resource lifecycle for context loss and recreation

pub mod gpu;
pub mod lifecycle;
pub mod quad;
pub mod renderer;
pub mod textures;

pub use gpu::HeadlessGpu;
pub use lifecycle::{LifecycleState, ResourceLifecycle};
pub use renderer::{GpuRenderer, RenderStats, OFFSCREEN_FORMAT};
pub use textures::{TextureImage, TextureImages, TextureStore};
