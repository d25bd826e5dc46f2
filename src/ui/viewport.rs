//! egui-wgpu `CallbackTrait` implementation for the AR viewport.
//!
//! The frame is rendered offscreen during `App::update`; `paint()` only blits
//! the result into the egui render pass.

use std::sync::{Arc, Mutex};

use eframe::egui_wgpu;
use eframe::wgpu;

use crate::render::{GpuRenderer, ResourceLifecycle};

/// Shared between the app (renders) and the paint callback (blits)
pub type SharedRenderer = Arc<Mutex<ResourceLifecycle<GpuRenderer>>>;

/// Paint callback that blits the offscreen frame into the egui render pass.
pub struct ArViewportCallback {
    pub renderer: SharedRenderer,
}

impl egui_wgpu::CallbackTrait for ArViewportCallback {
    fn paint(
        &self,
        _info: eframe::egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        _callback_resources: &egui_wgpu::CallbackResources,
    ) {
        let lifecycle = self.renderer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(renderer) = lifecycle.get() {
            renderer.blit(render_pass);
        }
    }
}
