//! Configuration parsing and management for arface

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ArFaceError, ConfigError};
use crate::overlay::FilterMode;
use crate::tracking::RegionType;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub face: FaceConfig,
    pub overlays: OverlaysConfig,
    pub textures: TexturesConfig,
    pub filter: FilterConfig,
    pub synthetic: SyntheticConfig,
    pub viewer: ViewerConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArFaceError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ArFaceError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, ArFaceError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ArFaceError> {
        if !(self.camera.near > 0.0) {
            return Err(invalid("camera.near", "Near plane must be greater than 0"));
        }
        if !(self.camera.far > self.camera.near) {
            return Err(invalid("camera.far", "Far plane must be beyond the near plane"));
        }

        if !(self.face.min_width > 0.0) || !self.face.min_width.is_finite() {
            return Err(invalid("face.min_width", "Minimum face width must be a positive number"));
        }

        for (name, overlay) in [
            ("overlays.glasses", &self.overlays.glasses),
            ("overlays.text", &self.overlays.text),
            ("overlays.mask", &self.overlays.mask),
        ] {
            let [x, y, z] = overlay.offset;
            let values = [x, y, z, overlay.size_y, overlay.wide];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(invalid(name, "Offsets and scale factors must be finite"));
            }
        }

        let cells = self.synthetic.mesh_rows as u64 * self.synthetic.mesh_cols as u64;
        if self.synthetic.mesh_rows < 2 || self.synthetic.mesh_cols < 2 {
            return Err(invalid("synthetic.mesh_rows", "Mesh grid needs at least 2x2 vertices"));
        }
        if cells > u16::MAX as u64 {
            return Err(invalid("synthetic.mesh_cols", "Mesh grid exceeds 16-bit index range"));
        }
        if self.synthetic.lost_every_frames > 0
            && self.synthetic.lost_duration_frames >= self.synthetic.lost_every_frames
        {
            return Err(invalid(
                "synthetic.lost_duration_frames",
                "Tracking-loss window must be shorter than its period",
            ));
        }

        if self.viewer.width == 0 || self.viewer.height == 0 {
            return Err(invalid("viewer.width", "Viewer size must be greater than 0"));
        }

        if !self.textures.dir.exists() {
            tracing::warn!(
                "Texture directory not found: {} (overlays without a texture are skipped)",
                self.textures.dir.display()
            );
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ArFaceError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Projection clip planes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Face-width normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Lower bound for the forehead-to-forehead distance, in tracker units
    pub min_width: f32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self { min_width: 0.10 }
    }
}

/// Placement of one billboard overlay relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Landmark the overlay follows
    pub anchor: RegionType,
    /// Translation in the anchor's local frame
    pub offset: [f32; 3],
    /// Vertical scale, multiplied by face width
    pub size_y: f32,
    /// Horizontal scale, multiplied by face width
    pub wide: f32,
}

impl OverlayConfig {
    pub const fn new(anchor: RegionType, offset: [f32; 3], size_y: f32, wide: f32) -> Self {
        Self {
            anchor,
            offset,
            size_y,
            wide,
        }
    }
}

/// Per-kind billboard tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaysConfig {
    pub glasses: OverlayConfig,
    pub text: OverlayConfig,
    pub mask: OverlayConfig,
}

impl Default for OverlaysConfig {
    fn default() -> Self {
        Self {
            glasses: OverlayConfig::new(RegionType::NoseTip, [0.0, 0.01, 0.06], 1.0, 1.5),
            text: OverlayConfig::new(RegionType::NoseTip, [0.0, 0.09, 0.10], 3.0, 4.0),
            mask: OverlayConfig::new(RegionType::NoseTip, [0.0, 0.04, 0.09], 2.0, 2.1),
        }
    }
}

/// Bitmap files for each texture slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TexturesConfig {
    /// Directory the file names are resolved against
    pub dir: PathBuf,
    pub glasses: String,
    pub text: String,
    pub mask: String,
    pub face_paint: String,
}

impl Default for TexturesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./assets"),
            glasses: "glasses.png".to_string(),
            text: "text.png".to_string(),
            mask: "mask.png".to_string(),
            face_paint: "facepaint.png".to_string(),
        }
    }
}

/// Filter selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter active when the session starts
    pub initial: FilterMode,
}

/// Parameters of the built-in synthetic tracking session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Report face tracking as supported
    pub supported: bool,
    /// Report camera permission as granted
    pub camera_permission: bool,
    /// Number of faces enumerated per frame
    pub face_count: u32,
    /// Generated camera image size
    pub image_width: u32,
    pub image_height: u32,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Distance of the face in front of the camera
    pub face_distance: f32,
    /// Head sway amplitude in degrees
    pub sway_yaw_degrees: f32,
    pub sway_pitch_degrees: f32,
    /// Frames per full sway cycle
    pub period_frames: u32,
    /// Tracking is lost once per this many frames (0 = never)
    pub lost_every_frames: u32,
    /// Length of each tracking-loss window
    pub lost_duration_frames: u32,
    /// Face mesh grid resolution
    pub mesh_rows: u32,
    pub mesh_cols: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            supported: true,
            camera_permission: true,
            face_count: 1,
            image_width: 320,
            image_height: 240,
            fov_y_degrees: 60.0,
            face_distance: 0.45,
            sway_yaw_degrees: 25.0,
            sway_pitch_degrees: 10.0,
            period_frames: 240,
            lost_every_frames: 0,
            lost_duration_frames: 30,
            mesh_rows: 14,
            mesh_cols: 12,
        }
    }
}

/// Desktop viewer window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("arface");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/arface");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/arface");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("arface");
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 100.0);
        assert_eq!(config.face.min_width, 0.10);
        assert_eq!(config.filter.initial, FilterMode::GlassesAndText);
        assert_eq!(config.overlays.text.offset, [0.0, 0.09, 0.10]);
        assert_eq!(config.overlays.mask.wide, 2.1);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [camera]
            near = 0.05

            [filter]
            initial = "face_paint_mesh"

            [overlays.glasses]
            anchor = "nose_tip"
            offset = [0.0, 0.02, 0.05]
            size_y = 1.2
            wide = 1.6
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.camera.near, 0.05);
        assert_eq!(config.camera.far, 100.0);
        assert_eq!(config.filter.initial, FilterMode::FacePaintMesh);
        assert_eq!(config.overlays.glasses.offset, [0.0, 0.02, 0.05]);
        assert_eq!(config.overlays.glasses.wide, 1.6);
        // untouched sections keep their defaults
        assert_eq!(config.overlays.text.size_y, 3.0);
    }

    #[test]
    fn test_invalid_clip_planes() {
        let mut config = Config::default();
        config.camera.far = 0.05;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.camera.near = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_min_face_width() {
        let mut config = Config::default();
        config.face.min_width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_overlay_rejected() {
        let mut config = Config::default();
        config.overlays.mask.size_y = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_default_matches_builtin() {
        let shipped = Config::from_str(include_str!("../config/default.toml")).unwrap();
        let builtin = Config::default();
        assert!(shipped.validate().is_ok());
        assert_eq!(shipped.overlays.glasses, builtin.overlays.glasses);
        assert_eq!(shipped.overlays.text, builtin.overlays.text);
        assert_eq!(shipped.overlays.mask, builtin.overlays.mask);
        assert_eq!(shipped.face.min_width, builtin.face.min_width);
        assert_eq!(shipped.synthetic.mesh_rows, builtin.synthetic.mesh_rows);
    }

    #[test]
    fn test_tracking_loss_window_validation() {
        let mut config = Config::default();
        config.synthetic.lost_every_frames = 10;
        config.synthetic.lost_duration_frames = 10;
        assert!(config.validate().is_err());
        config.synthetic.lost_duration_frames = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/arface.toml").unwrap_err();
        assert!(matches!(err, ArFaceError::Config(ConfigError::ReadFile(_))));
    }
}
