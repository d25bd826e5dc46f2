//! Overlay module
//!
//! What gets drawn on a tracked face:
//! - Filter modes and the overlays each one shows
//! - Anchor resolution and face-width measurement
//! - Model/draw matrix construction
//! - Rigid billboard quads and the deforming face-paint mesh

pub mod anchor;
pub mod billboard;
pub mod mesh;
pub mod transform;

use serde::{Deserialize, Serialize};

use crate::config::{OverlayConfig, OverlaysConfig};

pub use anchor::AnchorResolver;
pub use mesh::{GeometryHandle, MeshArena, MeshOverlay};
pub use transform::{build_model_matrix, mesh_model_matrix, FrameTransforms};

/// Active filter; cycles GlassesAndText -> Mask -> FacePaintMesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Glasses billboard plus a text label above the head
    #[default]
    GlassesAndText,
    /// Single mask billboard
    Mask,
    /// Face paint textured onto the deforming face mesh
    FacePaintMesh,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [Self::GlassesAndText, Self::Mask, Self::FacePaintMesh];

    /// The mode after this one in the toggle cycle
    pub fn next(self) -> Self {
        match self {
            Self::GlassesAndText => Self::Mask,
            Self::Mask => Self::FacePaintMesh,
            Self::FacePaintMesh => Self::GlassesAndText,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::GlassesAndText => 0,
            Self::Mask => 1,
            Self::FacePaintMesh => 2,
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::GlassesAndText => write!(f, "Glasses + text"),
            FilterMode::Mask => write!(f, "Mask"),
            FilterMode::FacePaintMesh => write!(f, "Face paint"),
        }
    }
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "glasses_and_text" | "glasses" => Ok(Self::GlassesAndText),
            "mask" => Ok(Self::Mask),
            "face_paint_mesh" | "face_paint" => Ok(Self::FacePaintMesh),
            other => Err(format!(
                "unknown filter '{}' (expected glasses_and_text, mask or face_paint_mesh)",
                other
            )),
        }
    }
}

/// Texture a draw samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Glasses,
    Text,
    Mask,
    FacePaint,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 4] = [Self::Glasses, Self::Text, Self::Mask, Self::FacePaint];

    pub fn index(self) -> usize {
        match self {
            Self::Glasses => 0,
            Self::Text => 1,
            Self::Mask => 2,
            Self::FacePaint => 3,
        }
    }
}

impl std::fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureSlot::Glasses => write!(f, "glasses"),
            TextureSlot::Text => write!(f, "text"),
            TextureSlot::Mask => write!(f, "mask"),
            TextureSlot::FacePaint => write!(f, "face paint"),
        }
    }
}

/// One thing drawn on the tracked face
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    /// Rigid quad anchored to a landmark
    Billboard {
        slot: TextureSlot,
        config: OverlayConfig,
    },
    /// Deforming face mesh in the face's center frame
    FaceMesh { slot: TextureSlot },
}

/// Overlays drawn for each filter mode, in draw order
#[derive(Debug, Clone)]
pub struct OverlaySet {
    by_mode: [Vec<Overlay>; 3],
}

impl OverlaySet {
    pub fn new(config: &OverlaysConfig) -> Self {
        Self {
            by_mode: [
                vec![
                    Overlay::Billboard {
                        slot: TextureSlot::Glasses,
                        config: config.glasses,
                    },
                    Overlay::Billboard {
                        slot: TextureSlot::Text,
                        config: config.text,
                    },
                ],
                vec![Overlay::Billboard {
                    slot: TextureSlot::Mask,
                    config: config.mask,
                }],
                vec![Overlay::FaceMesh {
                    slot: TextureSlot::FacePaint,
                }],
            ],
        }
    }

    pub fn overlays(&self, mode: FilterMode) -> &[Overlay] {
        &self.by_mode[mode.index()]
    }
}
