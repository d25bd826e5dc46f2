//! Per-frame draw list
//!
//! The frame driver records what to draw; the GPU renderer (or a test)
//! consumes it. The camera image is copied in so the list does not borrow
//! the session past its update.

use glam::Mat4;

use crate::overlay::{GeometryHandle, TextureSlot};
use crate::tracking::CameraImage;

/// One recorded draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Clear color and depth
    Clear,
    /// Full-screen camera image
    Background,
    /// Textured quad
    Billboard { slot: TextureSlot, mvp: Mat4 },
    /// Textured face mesh from the arena
    FaceMesh {
        slot: TextureSlot,
        geometry: GeometryHandle,
        mvp: Mat4,
    },
}

impl DrawCommand {
    pub fn is_overlay(&self) -> bool {
        matches!(self, Self::Billboard { .. } | Self::FaceMesh { .. })
    }
}

/// Owned copy of the latest camera image
#[derive(Debug, Clone, Default)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub uvs: [[f32; 2]; 4],
    /// Bumped each time new pixels are copied in
    pub revision: u64,
}

impl BackgroundImage {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Commands for one frame plus the background image they refer to
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
    background: BackgroundImage,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the previous frame's commands. The background image is kept.
    pub fn reset(&mut self) {
        self.commands.clear();
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Position to roll back to with `truncate`
    pub fn mark(&self) -> usize {
        self.commands.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.commands.truncate(mark);
    }

    pub fn overlay_draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_overlay()).count()
    }

    pub fn has_background(&self) -> bool {
        self.commands.contains(&DrawCommand::Background)
    }

    pub fn background(&self) -> &BackgroundImage {
        &self.background
    }

    /// Copy the camera image (reusing the allocation) and record the
    /// display-rotation texture coordinates.
    pub fn set_background(&mut self, image: Option<CameraImage<'_>>, uvs: [[f32; 2]; 4]) {
        self.background.uvs = uvs;
        if let Some(image) = image {
            let expected = image.width as usize * image.height as usize * 4;
            if image.pixels.len() < expected {
                tracing::debug!(
                    "Camera image too short ({} < {} bytes), keeping previous background",
                    image.pixels.len(),
                    expected
                );
                return;
            }
            self.background.width = image.width;
            self.background.height = image.height;
            self.background.pixels.clear();
            self.background.pixels.extend_from_slice(&image.pixels[..expected]);
            self.background.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_truncate() {
        let mut list = DrawList::new();
        list.push(DrawCommand::Clear);
        list.push(DrawCommand::Background);
        let mark = list.mark();
        list.push(DrawCommand::Billboard {
            slot: TextureSlot::Glasses,
            mvp: Mat4::IDENTITY,
        });
        assert_eq!(list.overlay_draw_count(), 1);

        list.truncate(mark);
        assert_eq!(list.commands(), &[DrawCommand::Clear, DrawCommand::Background]);
        assert_eq!(list.overlay_draw_count(), 0);
        assert!(list.has_background());
    }

    #[test]
    fn test_set_background_copies_pixels() {
        let pixels = vec![7u8; 2 * 2 * 4];
        let mut list = DrawList::new();
        list.set_background(
            Some(CameraImage {
                width: 2,
                height: 2,
                pixels: &pixels,
            }),
            [[0.0; 2]; 4],
        );
        assert_eq!(list.background().pixels, pixels);
        assert_eq!(list.background().revision, 1);

        // short buffers are ignored
        list.set_background(
            Some(CameraImage {
                width: 4,
                height: 4,
                pixels: &pixels,
            }),
            [[1.0; 2]; 4],
        );
        assert_eq!(list.background().width, 2);
        assert_eq!(list.background().revision, 1);
        assert_eq!(list.background().uvs, [[1.0; 2]; 4]);
    }

    #[test]
    fn test_reset_keeps_background() {
        let pixels = vec![1u8; 4];
        let mut list = DrawList::new();
        list.set_background(
            Some(CameraImage {
                width: 1,
                height: 1,
                pixels: &pixels,
            }),
            [[0.0; 2]; 4],
        );
        list.push(DrawCommand::Clear);
        list.reset();
        assert!(list.is_empty());
        assert!(!list.background().is_empty());
    }
}
