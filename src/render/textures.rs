//! Overlay textures: decoded on the CPU once, uploaded per GPU context

use std::path::Path;

use crate::config::TexturesConfig;
use crate::error::AssetError;
use crate::overlay::TextureSlot;

/// Decoded RGBA8 bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Decode any format the `image` crate was built with (PNG here).
    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        let rgba = image::load_from_memory(bytes)
            .map_err(|e| AssetError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path)
            .map_err(|e| AssetError::NotFound(format!("{}: {}", path.display(), e)))?;
        Self::decode(&bytes)
    }

    /// Single-color image
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: rgba.repeat((width * height) as usize),
        }
    }
}

/// CPU copies of every overlay texture; empty slots are skipped at draw time
#[derive(Debug, Clone, Default)]
pub struct TextureImages {
    slots: [Option<TextureImage>; 4],
}

impl TextureImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the configured bitmaps. Missing or broken files leave their
    /// slot empty.
    pub fn load(config: &TexturesConfig) -> Self {
        let mut images = Self::new();
        for (slot, name) in [
            (TextureSlot::Glasses, &config.glasses),
            (TextureSlot::Text, &config.text),
            (TextureSlot::Mask, &config.mask),
            (TextureSlot::FacePaint, &config.face_paint),
        ] {
            let path = config.dir.join(name);
            match TextureImage::from_file(&path) {
                Ok(image) => {
                    tracing::debug!(
                        "Loaded {} texture {}x{} from {}",
                        slot,
                        image.width,
                        image.height,
                        path.display()
                    );
                    images.set(slot, image);
                }
                Err(e) => tracing::warn!("No {} texture, overlay will be skipped: {}", slot, e),
            }
        }
        tracing::info!(
            "Loaded {}/{} overlay textures",
            images.loaded_count(),
            TextureSlot::ALL.len()
        );
        images
    }

    pub fn set(&mut self, slot: TextureSlot, image: TextureImage) {
        self.slots[slot.index()] = Some(image);
    }

    pub fn get(&self, slot: TextureSlot) -> Option<&TextureImage> {
        self.slots[slot.index()].as_ref()
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Layout shared by every sampled texture (overlays, background, blit)
pub fn texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("arface_texture_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Linear filtering, clamped to the edge
pub fn create_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("arface_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

pub fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Sampled RGBA texture plus its bind group
pub struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: [u32; 2],
}

impl GpuTexture {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        let bind_group = texture_bind_group(device, layout, &view, sampler, label);
        Self {
            texture,
            bind_group,
            size: [width.max(1), height.max(1)],
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Replace the texel data; `pixels` must be tightly packed RGBA8 of
    /// this texture's size.
    pub fn write(&self, queue: &wgpu::Queue, pixels: &[u8]) {
        let [width, height] = self.size;
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// GPU copies of the overlay textures for one context
pub struct TextureStore {
    slots: [Option<GpuTexture>; 4],
}

impl TextureStore {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        images: &TextureImages,
    ) -> Self {
        let slots = TextureSlot::ALL.map(|slot| {
            let image = images.get(slot)?;
            let expected_len = (image.width * image.height * 4) as usize;
            if image.pixels.len() != expected_len || image.width == 0 || image.height == 0 {
                tracing::warn!("Ignoring malformed {} texture", slot);
                return None;
            }
            let texture = GpuTexture::new(
                device,
                layout,
                sampler,
                image.width,
                image.height,
                &format!("arface_{}_texture", slot),
            );
            texture.write(queue, &image.pixels);
            Some(texture)
        });
        Self { slots }
    }

    pub fn bind_group(&self, slot: TextureSlot) -> Option<&wgpu::BindGroup> {
        self.slots[slot.index()].as_ref().map(GpuTexture::bind_group)
    }

    pub fn uploaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
