//! Main egui application with the AR viewport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use eframe::egui;

use crate::config::Config;
use crate::driver::{FrameDriver, FrameReport, Viewport};
use crate::error::{RenderError, SessionError};
use crate::notice::{self, Notice, NoticeReceiver};
use crate::render::{GpuRenderer, RenderStats, ResourceLifecycle, TextureImages};
use crate::tracking::{DisplayRotation, SyntheticSession};

use super::viewport::{ArViewportCallback, SharedRenderer};

/// How long a notice stays on screen
const NOTICE_TTL: Duration = Duration::from_secs(3);

/// The native egui application window.
pub struct ArFaceApp {
    config: Config,
    session: SyntheticSession,
    driver: FrameDriver,
    notices: NoticeReceiver,
    /// Notices still on screen, oldest first
    visible_notices: VecDeque<(Instant, Notice)>,
    /// GPU renderer (rebuilt on resume)
    renderer: SharedRenderer,
    images: TextureImages,
    rotation: DisplayRotation,
    paused: bool,
    last_report: FrameReport,
    last_stats: RenderStats,
    /// Error message if the renderer could not be built
    render_error: Option<String>,
    /// Set when the window should close (camera permission denied)
    exit_requested: bool,
}

impl ArFaceApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        let (notifier, notices) = notice::channel();
        let session = SyntheticSession::new(&config.synthetic);
        let driver = FrameDriver::new(&config, notifier);
        let images = TextureImages::load(&config.textures);

        let mut app = Self {
            config,
            session,
            driver,
            notices,
            visible_notices: VecDeque::new(),
            renderer: Arc::new(Mutex::new(ResourceLifecycle::new())),
            images,
            rotation: DisplayRotation::Rotation0,
            paused: false,
            last_report: FrameReport::default(),
            last_stats: RenderStats::default(),
            render_error: None,
            exit_requested: false,
        };

        match cc.wgpu_render_state.as_ref() {
            Some(render_state) => app.rebuild_renderer(render_state),
            None => app.render_error = Some("wgpu render state not available".to_string()),
        }

        if let Err(SessionError::PermissionDenied) = app.driver.initialize(&mut app.session) {
            app.exit_requested = true;
        }

        app
    }

    /// Launch the native UI window. Blocks until the window is closed.
    pub fn run(config: Config) -> eframe::Result {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("arface")
                .with_inner_size([config.viewer.width as f32, config.viewer.height as f32]),
            renderer: eframe::Renderer::Wgpu,
            ..Default::default()
        };

        eframe::run_native(
            "arface",
            options,
            Box::new(move |cc| Ok(Box::new(Self::new(cc, config)))),
        )
    }

    /// Drop any existing GPU resources and build them for the current context.
    fn rebuild_renderer(&mut self, render_state: &eframe::egui_wgpu::RenderState) {
        let [width, height] = [self.config.viewer.width, self.config.viewer.height];
        let mut lifecycle = self.renderer.lock().unwrap_or_else(|e| e.into_inner());
        let result = lifecycle.reinitialize(|| {
            GpuRenderer::new(
                &render_state.device,
                &render_state.queue,
                render_state.target_format,
                width,
                height,
                &self.images,
            )
        });
        match result {
            Ok(_) => self.render_error = None,
            Err(e) => {
                tracing::error!("Failed to build renderer: {}", e);
                self.render_error = Some(e.to_string());
            }
        }
    }

    fn set_paused(&mut self, paused: bool, render_state: Option<&eframe::egui_wgpu::RenderState>) {
        self.paused = paused;
        if paused {
            self.driver.pause(&mut self.session);
            self.renderer
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .invalidate();
            return;
        }

        if let Some(render_state) = render_state {
            self.rebuild_renderer(render_state);
        }
        if let Err(SessionError::PermissionDenied) = self.driver.resume(&mut self.session) {
            self.exit_requested = true;
        }
    }

    /// Move newly posted notices on screen and expire old ones.
    fn update_notices(&mut self) {
        let now = Instant::now();
        for notice in self.notices.drain() {
            self.visible_notices.push_back((now, notice));
        }
        while let Some((posted, _)) = self.visible_notices.front() {
            if now.duration_since(*posted) < NOTICE_TTL {
                break;
            }
            self.visible_notices.pop_front();
        }
    }

    /// Drive one frame and render it offscreen at the viewport size.
    fn render_viewport(
        &mut self,
        render_state: &eframe::egui_wgpu::RenderState,
        width: u32,
        height: u32,
    ) {
        let viewport = Viewport::new(width, height).with_rotation(self.rotation);
        self.last_report = self.driver.render_frame(&mut self.session, viewport);

        let mut lifecycle = self.renderer.lock().unwrap_or_else(|e| e.into_inner());
        let Some(renderer) = lifecycle.get_mut() else {
            if self.render_error.is_none() && !self.paused {
                self.render_error = Some(RenderError::NotInitialized.to_string());
            }
            return;
        };
        renderer.resize(&render_state.device, width, height);
        self.last_stats = renderer.render(
            &render_state.device,
            &render_state.queue,
            self.driver.draw_list(),
            self.driver.mesh_arena(),
        );
    }

    fn controls(
        &mut self,
        ui: &mut egui::Ui,
        render_state: Option<&eframe::egui_wgpu::RenderState>,
    ) {
        ui.heading("Filters");
        ui.separator();

        ui.label(format!("Active: {}", self.driver.filter_mode()));
        if ui.button("Next filter").clicked() {
            self.driver.toggle_filter();
        }

        ui.separator();

        let mut paused = self.paused;
        if ui.checkbox(&mut paused, "Paused").changed() {
            self.set_paused(paused, render_state);
        }

        egui::ComboBox::from_label("Rotation")
            .selected_text(format!("{}°", self.rotation.quarter_turns() * 90))
            .show_ui(ui, |ui| {
                for rotation in [
                    DisplayRotation::Rotation0,
                    DisplayRotation::Rotation90,
                    DisplayRotation::Rotation180,
                    DisplayRotation::Rotation270,
                ] {
                    let label = format!("{}°", rotation.quarter_turns() * 90);
                    ui.selectable_value(&mut self.rotation, rotation, label);
                }
            });

        ui.separator();

        ui.label(format!("Session: {}", self.driver.state()));
        ui.horizontal(|ui| {
            ui.label("Face:");
            if self.last_report.face_tracked {
                ui.colored_label(egui::Color32::GREEN, "tracking");
            } else {
                ui.colored_label(egui::Color32::YELLOW, "not tracking");
            }
        });
        ui.label(format!("Overlay draws: {}", self.last_report.overlay_draws));
        ui.label(format!(
            "GPU draws: {} ({} skipped)",
            self.last_stats.draws, self.last_stats.skipped
        ));
        ui.label(format!("Frames: {}", self.driver.frames_rendered()));

        if let Some(ref err) = self.render_error {
            ui.separator();
            ui.colored_label(egui::Color32::RED, err);
        }
    }
}

impl eframe::App for ArFaceApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if self.exit_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        let render_state = frame.wgpu_render_state();

        egui::SidePanel::left("controls").show(ctx, |ui| {
            self.controls(ui, render_state);
        });

        self.update_notices();
        if !self.visible_notices.is_empty() {
            egui::TopBottomPanel::bottom("notices").show(ctx, |ui| {
                for (_, notice) in &self.visible_notices {
                    ui.label(notice.to_string());
                }
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let available_size = ui.available_size();
            let (rect, response) = ui.allocate_exact_size(available_size, egui::Sense::click());

            // tapping the picture cycles filters
            if response.clicked() {
                self.driver.toggle_filter();
            }

            let Some(render_state) = render_state else {
                ui.label("Waiting for GPU...");
                return;
            };

            let ppp = ctx.pixels_per_point();
            let width = ((available_size.x * ppp) as u32).max(1);
            let height = ((available_size.y * ppp) as u32).max(1);
            self.render_viewport(render_state, width, height);

            ui.painter().add(eframe::egui_wgpu::Callback::new_paint_callback(
                rect,
                ArViewportCallback {
                    renderer: self.renderer.clone(),
                },
            ));
        });

        // Repaint continuously for real-time updates
        ctx.request_repaint();
    }
}
