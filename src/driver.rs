//! Frame driver
//!
//! Owns the per-frame flow: session setup and its error taxonomy, pause and
//! resume, display geometry, the background draw, filter dispatch, and frame
//! isolation. A failure while building overlays (an error or a panic) is
//! logged and rolls the draw list back to the background; the next frame
//! starts clean.

use std::panic::{self, AssertUnwindSafe};

use crate::config::Config;
use crate::draw::{DrawCommand, DrawList};
use crate::error::{OverlayError, SessionError};
use crate::notice::{Notice, Notifier};
use crate::overlay::{
    billboard, AnchorResolver, FilterMode, FrameTransforms, MeshArena, MeshOverlay, Overlay,
    OverlaySet,
};
use crate::tracking::{ArSession, DisplayRotation, Frame};

/// Whether a running session is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No session yet (never started, install pending, or setup failed)
    AwaitingSession,
    /// Session started; frames can be rendered
    SessionReady,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverState::AwaitingSession => write!(f, "awaiting session"),
            DriverState::SessionReady => write!(f, "session ready"),
        }
    }
}

/// Render target size and orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub rotation: DisplayRotation,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotation: DisplayRotation::Rotation0,
        }
    }

    pub fn with_rotation(mut self, rotation: DisplayRotation) -> Self {
        self.rotation = rotation;
        self
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// What happened during one `render_frame`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Nothing was drawn (no session, or paused)
    pub skipped: bool,
    /// `update()` failed or panicked; only the clear was recorded
    pub update_failed: bool,
    /// The background draw was recorded
    pub background: bool,
    /// A face in `Tracking` state was found
    pub face_tracked: bool,
    /// Overlay draws that made it into the list
    pub overlay_draws: usize,
    /// An overlay error or panic discarded this frame's overlay draws
    pub overlays_aborted: bool,
}

/// Drives one `ArSession` frame by frame into a `DrawList`
pub struct FrameDriver {
    state: DriverState,
    paused: bool,
    mode: FilterMode,
    overlays: OverlaySet,
    resolver: AnchorResolver,
    mesh: MeshOverlay,
    near: f32,
    far: f32,
    list: DrawList,
    notifier: Notifier,
    last_viewport: Option<Viewport>,
    frames_rendered: u64,
}

impl FrameDriver {
    pub fn new(config: &Config, notifier: Notifier) -> Self {
        Self {
            state: DriverState::AwaitingSession,
            paused: false,
            mode: config.filter.initial,
            overlays: OverlaySet::new(&config.overlays),
            resolver: AnchorResolver::new(config.face.min_width),
            mesh: MeshOverlay::new(),
            near: config.camera.near,
            far: config.camera.far,
            list: DrawList::new(),
            notifier,
            last_viewport: None,
            frames_rendered: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.mode
    }

    /// Commands recorded by the last `render_frame`
    pub fn draw_list(&self) -> &DrawList {
        &self.list
    }

    pub fn mesh_arena(&self) -> &MeshArena {
        self.mesh.arena()
    }

    /// Frames that got past the clear
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Start the session if it is not running yet.
    ///
    /// Only a permission denial is returned; every other setup failure is
    /// reported through a notice (or silently, for a pending install) and
    /// leaves the driver waiting for the next resume.
    pub fn initialize(&mut self, session: &mut dyn ArSession) -> Result<(), SessionError> {
        if self.state == DriverState::SessionReady {
            return Ok(());
        }

        match session.start() {
            Ok(()) => {
                self.state = DriverState::SessionReady;
                self.last_viewport = None;
                tracing::info!("AR session ready (filter: {})", self.mode);
                Ok(())
            }
            Err(SessionError::InstallRequested) => {
                tracing::info!("Tracking runtime install requested, waiting for resume");
                Ok(())
            }
            Err(SessionError::PermissionDenied) => {
                tracing::warn!("Camera permission denied");
                self.notifier.post(Notice::CameraPermissionRequired);
                Err(SessionError::PermissionDenied)
            }
            Err(SessionError::Unsupported(what)) => {
                tracing::warn!("Face tracking unsupported: {}", what);
                self.notifier.post(Notice::DeviceUnsupported);
                Ok(())
            }
            Err(SessionError::Failure(kind)) | Err(SessionError::FrameUpdate(kind)) => {
                tracing::error!("AR session setup failed: {}", kind);
                self.notifier.post(Notice::ArFailure(kind));
                Ok(())
            }
        }
    }

    /// Stop rendering and pause the session.
    pub fn pause(&mut self, session: &mut dyn ArSession) {
        if self.paused {
            return;
        }
        self.paused = true;
        if self.state == DriverState::SessionReady {
            session.pause();
        }
        self.list.reset();
        tracing::info!("Frame driver paused");
    }

    /// Resume rendering, restarting the session (or retrying setup).
    pub fn resume(&mut self, session: &mut dyn ArSession) -> Result<(), SessionError> {
        self.paused = false;
        self.state = DriverState::AwaitingSession;
        tracing::info!("Frame driver resuming");
        self.initialize(session)
    }

    /// Advance to the next filter and tell the user.
    pub fn toggle_filter(&mut self) -> FilterMode {
        self.mode = self.mode.next();
        tracing::info!("Filter changed to {}", self.mode);
        self.notifier.post(Notice::FilterChanged(self.mode));
        self.mode
    }

    /// Record one frame. Never fails: problems (including panics from the
    /// session or the overlay path) are logged and reflected in the report.
    pub fn render_frame(&mut self, session: &mut dyn ArSession, viewport: Viewport) -> FrameReport {
        let mut report = FrameReport::default();
        self.list.reset();

        if self.state != DriverState::SessionReady || self.paused {
            report.skipped = true;
            return report;
        }

        if !viewport.is_empty() && self.last_viewport != Some(viewport) {
            session.set_display_geometry(viewport.rotation, viewport.width, viewport.height);
            self.last_viewport = Some(viewport);
            tracing::debug!(
                "Display geometry {}x{} ({:?})",
                viewport.width,
                viewport.height,
                viewport.rotation
            );
        }

        self.list.push(DrawCommand::Clear);
        let cleared = self.list.mark();

        // the frame borrows the session for the rest of this call
        let update = panic::catch_unwind(AssertUnwindSafe(move || {
            let session = session;
            session.update()
        }));
        let frame = match update {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                tracing::warn!("Skipping frame: {}", e);
                report.update_failed = true;
                return report;
            }
            Err(payload) => {
                tracing::warn!(
                    "Skipping frame: session update panicked: {}",
                    panic_message(&*payload)
                );
                self.list.truncate(cleared);
                report.update_failed = true;
                return report;
            }
        };

        self.list.set_background(frame.camera_image, frame.background_uvs);
        self.list.push(DrawCommand::Background);
        report.background = true;
        self.frames_rendered += 1;

        let mark = self.list.mark();
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.draw_overlays(&frame, &mut report)));
        match outcome {
            Ok(Ok(draws)) => report.overlay_draws = draws,
            Ok(Err(e)) => {
                tracing::warn!("Dropping overlays for this frame: {}", e);
                self.list.truncate(mark);
                report.overlays_aborted = true;
            }
            Err(payload) => {
                tracing::warn!(
                    "Dropping overlays for this frame: panicked: {}",
                    panic_message(&*payload)
                );
                self.list.truncate(mark);
                report.overlays_aborted = true;
            }
        }

        report
    }

    fn draw_overlays(
        &mut self,
        frame: &Frame<'_>,
        report: &mut FrameReport,
    ) -> Result<usize, OverlayError> {
        let Some(face) = frame.faces.iter().find(|face| face.is_tracking()) else {
            return Ok(0);
        };
        report.face_tracked = true;

        let transforms = FrameTransforms::from_camera(&frame.camera, self.near, self.far)?;

        let mut draws = 0;
        for overlay in self.overlays.overlays(self.mode) {
            draws += match *overlay {
                Overlay::Billboard { slot, config } => billboard::draw_anchored(
                    &self.resolver,
                    face,
                    &transforms,
                    slot,
                    &config,
                    &mut self.list,
                )?,
                Overlay::FaceMesh { slot } => {
                    self.mesh.draw(face, &transforms, slot, &mut self.list)?
                }
            };
        }
        Ok(draws)
    }
}

/// Best-effort text of a caught panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticConfig;
    use crate::notice::{self, NoticeReceiver};
    use crate::tracking::{SyntheticSession, TrackingState};

    fn driver() -> (FrameDriver, NoticeReceiver) {
        let (notifier, receiver) = notice::channel();
        (FrameDriver::new(&Config::default(), notifier), receiver)
    }

    fn session(config: SyntheticConfig) -> SyntheticSession {
        SyntheticSession::new(&config)
    }

    #[test]
    fn test_no_frames_before_initialize() {
        let (mut driver, _rx) = driver();
        let mut session = session(SyntheticConfig::default());
        let report = driver.render_frame(&mut session, Viewport::new(320, 240));
        assert!(report.skipped);
        assert!(driver.draw_list().is_empty());
    }

    #[test]
    fn test_glasses_and_text_draws_two() {
        let (mut driver, _rx) = driver();
        let mut session = session(SyntheticConfig::default());
        driver.initialize(&mut session).unwrap();

        let report = driver.render_frame(&mut session, Viewport::new(320, 240));
        assert!(report.background);
        assert!(report.face_tracked);
        assert_eq!(report.overlay_draws, 2);
        assert_eq!(driver.draw_list().commands()[0], DrawCommand::Clear);
        assert_eq!(driver.draw_list().commands()[1], DrawCommand::Background);
    }

    #[test]
    fn test_filter_dispatch() {
        let (mut driver, rx) = driver();
        let mut session = session(SyntheticConfig::default());
        driver.initialize(&mut session).unwrap();

        assert_eq!(driver.toggle_filter(), FilterMode::Mask);
        let report = driver.render_frame(&mut session, Viewport::new(320, 240));
        assert_eq!(report.overlay_draws, 1);

        assert_eq!(driver.toggle_filter(), FilterMode::FacePaintMesh);
        let report = driver.render_frame(&mut session, Viewport::new(320, 240));
        assert_eq!(report.overlay_draws, 1);
        assert!(matches!(
            driver.draw_list().commands()[2],
            DrawCommand::FaceMesh { .. }
        ));

        assert_eq!(driver.toggle_filter(), FilterMode::GlassesAndText);
        assert_eq!(
            rx.drain(),
            vec![
                Notice::FilterChanged(FilterMode::Mask),
                Notice::FilterChanged(FilterMode::FacePaintMesh),
                Notice::FilterChanged(FilterMode::GlassesAndText),
            ]
        );
    }

    #[test]
    fn test_untracked_face_draws_background_only() {
        let (mut driver, _rx) = driver();
        let mut session = session(SyntheticConfig::default());
        driver.initialize(&mut session).unwrap();
        session.override_state(0, Some(TrackingState::Paused));

        let report = driver.render_frame(&mut session, Viewport::new(320, 240));
        assert!(report.background);
        assert!(!report.face_tracked);
        assert_eq!(driver.draw_list().overlay_draw_count(), 0);
    }

    #[test]
    fn test_update_failure_leaves_clear_only() {
        let (mut driver, _rx) = driver();
        let mut session = session(SyntheticConfig::default());
        driver.initialize(&mut session).unwrap();
        session.fail_next_update("camera stalled");

        let report = driver.render_frame(&mut session, Viewport::new(320, 240));
        assert!(report.update_failed);
        assert_eq!(driver.draw_list().commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn test_display_geometry_pushed_on_change_only() {
        let (mut driver, _rx) = driver();
        let mut session = session(SyntheticConfig::default());
        driver.initialize(&mut session).unwrap();

        driver.render_frame(&mut session, Viewport::new(320, 240));
        driver.render_frame(&mut session, Viewport::new(320, 240));
        assert_eq!(session.display_geometry_calls(), 1);

        driver.render_frame(&mut session, Viewport::new(0, 240));
        assert_eq!(session.display_geometry_calls(), 1);

        let rotated = Viewport::new(320, 240).with_rotation(DisplayRotation::Rotation90);
        driver.render_frame(&mut session, rotated);
        assert_eq!(session.display_geometry_calls(), 2);
        assert_eq!(session.display_rotation(), DisplayRotation::Rotation90);
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut driver, _rx) = driver();
        let mut session = session(SyntheticConfig::default());
        driver.initialize(&mut session).unwrap();

        driver.pause(&mut session);
        assert!(!session.is_started());
        assert!(driver.render_frame(&mut session, Viewport::new(320, 240)).skipped);

        driver.resume(&mut session).unwrap();
        assert!(session.is_started());
        assert!(!driver.render_frame(&mut session, Viewport::new(320, 240)).skipped);
    }

    #[test]
    fn test_setup_error_taxonomy() {
        let (mut driver, rx) = driver();

        let mut unsupported = session(SyntheticConfig {
            supported: false,
            ..Default::default()
        });
        assert!(driver.initialize(&mut unsupported).is_ok());
        assert_eq!(driver.state(), DriverState::AwaitingSession);
        assert_eq!(rx.drain(), vec![Notice::DeviceUnsupported]);

        let mut denied = session(SyntheticConfig {
            camera_permission: false,
            ..Default::default()
        });
        assert_eq!(
            driver.initialize(&mut denied),
            Err(SessionError::PermissionDenied)
        );
        assert_eq!(rx.drain(), vec![Notice::CameraPermissionRequired]);
        assert_eq!(driver.state(), DriverState::AwaitingSession);
    }
}
