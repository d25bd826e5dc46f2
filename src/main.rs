//! arface - AR face filter engine
//!
//! Main entry point for the CLI application.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arface::{
    config::Config,
    driver::{DriverState, FrameDriver, FrameReport, Viewport},
    notice,
    overlay::FilterMode,
    render::{GpuRenderer, HeadlessGpu, TextureImages, OFFSCREEN_FORMAT},
    tracking::{DisplayRotation, SyntheticSession},
};

/// arface - AR face filters over a tracked face
#[derive(Parser, Debug)]
#[command(name = "arface", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initial filter (glasses_and_text, mask, face_paint_mesh)
    #[arg(short, long)]
    filter: Option<FilterMode>,

    /// Number of frames to drive in headless mode
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Advance to the next filter every N frames (0 = never)
    #[arg(long, default_value_t = 0)]
    toggle_every: u64,

    /// Display rotation in quarter turns (0-3)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..4))]
    rotation: u8,

    /// Render the last frame on the GPU and save it as a PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Launch native UI window
    #[cfg(feature = "native-ui")]
    #[arg(long)]
    ui: bool,
}

/// Totals over a headless run
#[derive(Debug, Default)]
struct RunSummary {
    frames: u64,
    tracked: u64,
    overlay_draws: u64,
    aborted: u64,
    update_failures: u64,
    notices: usize,
}

impl RunSummary {
    fn record(&mut self, report: &FrameReport) {
        if report.skipped {
            return;
        }
        self.frames += 1;
        if report.update_failed {
            self.update_failures += 1;
        }
        if report.face_tracked {
            self.tracked += 1;
        }
        if report.overlays_aborted {
            self.aborted += 1;
        }
        self.overlay_draws += report.overlay_draws as u64;
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", arface::NAME, arface::VERSION);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(filter) = args.filter {
        config.filter.initial = filter;
    }
    config.validate()?;

    #[cfg(feature = "native-ui")]
    if args.ui {
        info!("Launching native UI window");
        if let Err(e) = arface::ui::ArFaceApp::run(config) {
            tracing::error!("UI error: {}", e);
        }
        info!("UI window closed, shutting down");
        return Ok(());
    }

    run_headless(&args, &config)
}

fn run_headless(args: &Args, config: &Config) -> anyhow::Result<()> {
    let (notifier, notices) = notice::channel();
    let mut session = SyntheticSession::new(&config.synthetic);
    let mut driver = FrameDriver::new(config, notifier);

    driver
        .initialize(&mut session)
        .context("AR session could not start")?;
    if driver.state() != DriverState::SessionReady {
        warn!("AR session unavailable, nothing to render");
        return Ok(());
    }

    let rotation = match args.rotation {
        1 => DisplayRotation::Rotation90,
        2 => DisplayRotation::Rotation180,
        3 => DisplayRotation::Rotation270,
        _ => DisplayRotation::Rotation0,
    };
    let viewport = Viewport::new(config.viewer.width, config.viewer.height).with_rotation(rotation);

    let mut summary = RunSummary::default();
    for i in 0..args.frames {
        if args.toggle_every > 0 && i > 0 && i % args.toggle_every == 0 {
            driver.toggle_filter();
        }
        let report = driver.render_frame(&mut session, viewport);
        summary.record(&report);
        summary.notices += notices.drain().len();
    }

    info!(
        "Rendered {} frames ({} with a tracked face), {} overlay draws, {} aborted, \
         {} update failures, {} notices, final filter: {}",
        summary.frames,
        summary.tracked,
        summary.overlay_draws,
        summary.aborted,
        summary.update_failures,
        summary.notices,
        driver.filter_mode()
    );

    if let Some(path) = &args.snapshot {
        save_snapshot(config, &driver, path)?;
    }

    Ok(())
}

/// Render the driver's current draw list offscreen and write it to `path`.
fn save_snapshot(config: &Config, driver: &FrameDriver, path: &Path) -> anyhow::Result<()> {
    let gpu = HeadlessGpu::new()?;
    let images = TextureImages::load(&config.textures);
    let (width, height) = (config.viewer.width, config.viewer.height);

    let mut renderer =
        GpuRenderer::new(&gpu.device, &gpu.queue, OFFSCREEN_FORMAT, width, height, &images)?;
    let stats = renderer.render(&gpu.device, &gpu.queue, driver.draw_list(), driver.mesh_arena());
    let pixels = renderer.read_pixels(&gpu.device, &gpu.queue)?;

    let image = image::RgbaImage::from_raw(width, height, pixels)
        .context("readback size does not match the render target")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(
        "Snapshot saved to {} ({} draws, {} skipped)",
        path.display(),
        stats.draws,
        stats.skipped
    );
    Ok(())
}
