//! Rigid billboard quads anchored to a landmark

use crate::config::OverlayConfig;
use crate::draw::{DrawCommand, DrawList};
use crate::error::OverlayError;
use crate::overlay::anchor::AnchorResolver;
use crate::overlay::transform::{build_model_matrix, FrameTransforms};
use crate::overlay::TextureSlot;
use crate::tracking::TrackedFace;

/// Record one anchored billboard for `face`. Returns the number of draws
/// recorded: 0 when the face is not tracked or a landmark it needs is
/// missing this frame.
pub fn draw_anchored(
    resolver: &AnchorResolver,
    face: &TrackedFace<'_>,
    transforms: &FrameTransforms,
    slot: TextureSlot,
    config: &OverlayConfig,
    list: &mut DrawList,
) -> Result<usize, OverlayError> {
    if !face.is_tracking() {
        return Ok(0);
    }

    let Some(anchor) = resolver.resolve(face, config.anchor) else {
        tracing::trace!("No {:?} pose this frame, skipping {} overlay", config.anchor, slot);
        return Ok(0);
    };
    let Some(face_width) = resolver.face_width(face) else {
        tracing::trace!("Forehead landmarks missing, skipping {} overlay", slot);
        return Ok(0);
    };

    let model = build_model_matrix(&anchor, config, face_width);
    let mvp = transforms.checked_draw_matrix(&model)?;
    list.push(DrawCommand::Billboard { slot, mvp });
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{FaceMesh, Pose, RegionPoses, RegionType, TrackingState};
    use glam::{Mat4, Vec3};

    fn tracked_face(regions: RegionPoses) -> TrackedFace<'static> {
        TrackedFace {
            state: TrackingState::Tracking,
            center_pose: Pose::IDENTITY,
            regions,
            mesh: FaceMesh::default(),
        }
    }

    fn full_regions() -> RegionPoses {
        RegionPoses::new()
            .with(RegionType::NoseTip, Pose::IDENTITY)
            .with(RegionType::ForeheadLeft, Pose::from_translation(Vec3::new(-0.1, 0.0, 0.0)))
            .with(RegionType::ForeheadRight, Pose::from_translation(Vec3::new(0.1, 0.0, 0.0)))
    }

    fn text_config() -> OverlayConfig {
        OverlayConfig::new(RegionType::NoseTip, [0.0, 0.09, 0.10], 3.0, 4.0)
    }

    #[test]
    fn test_records_scaled_billboard() {
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();
        let n = draw_anchored(
            &AnchorResolver::default(),
            &tracked_face(full_regions()),
            &transforms,
            TextureSlot::Text,
            &text_config(),
            &mut list,
        )
        .unwrap();
        assert_eq!(n, 1);

        let expected = Mat4::from_translation(Vec3::new(0.0, 0.09, 0.10))
            * Mat4::from_scale(Vec3::new(0.8, 0.6, 1.0));
        match list.commands() {
            [DrawCommand::Billboard { slot, mvp }] => {
                assert_eq!(*slot, TextureSlot::Text);
                assert!(mvp.abs_diff_eq(expected, 1e-6));
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn test_untracked_face_draws_nothing() {
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();
        let mut face = tracked_face(full_regions());
        face.state = TrackingState::NotTracking;
        let n = draw_anchored(
            &AnchorResolver::default(),
            &face,
            &transforms,
            TextureSlot::Glasses,
            &text_config(),
            &mut list,
        )
        .unwrap();
        assert_eq!(n, 0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_missing_anchor_skips() {
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();
        let mut regions = full_regions();
        regions.remove(RegionType::NoseTip);
        let n = draw_anchored(
            &AnchorResolver::default(),
            &tracked_face(regions),
            &transforms,
            TextureSlot::Mask,
            &text_config(),
            &mut list,
        )
        .unwrap();
        assert_eq!(n, 0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_non_finite_anchor_is_an_error() {
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();
        let regions = full_regions().with(
            RegionType::NoseTip,
            Pose::from_translation(Vec3::new(f32::INFINITY, 0.0, 0.0)),
        );
        let result = draw_anchored(
            &AnchorResolver::default(),
            &tracked_face(regions),
            &transforms,
            TextureSlot::Glasses,
            &text_config(),
            &mut list,
        );
        assert!(matches!(result, Err(OverlayError::NonFinite(_))));
        assert!(list.is_empty());
    }
}
