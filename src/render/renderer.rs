//! wgpu renderer for a frame's draw list.
//!
//! Renders offscreen into a color + depth target, then either blits the
//! result into a host render pass (the viewer) or reads it back (snapshots).
//! Per-draw matrices live in one dynamic-offset uniform buffer; face mesh
//! buffers grow to the next power of two and are never shrunk.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::quad::{background_vertices, quad_vertices, QuadVertex};
use super::textures::{
    create_sampler, texture_bind_group, texture_bind_group_layout, GpuTexture, TextureImages,
    TextureStore,
};
use crate::draw::{DrawCommand, DrawList};
use crate::error::RenderError;
use crate::overlay::{GeometryHandle, MeshArena};

/// Offscreen color format
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Smallest allocation for growable buffers
const MIN_BUFFER_BYTES: u64 = 1024;

const MESH_POSITION_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const MESH_UV_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

/// Uniform block matching the shader.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    mvp: [[f32; 4]; 4],
}

/// GPU buffer that is reallocated only when an upload no longer fits.
struct GrowableBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl GrowableBuffer {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        size: u64,
    ) -> Self {
        let capacity = size.max(MIN_BUFFER_BYTES);
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            capacity,
            usage,
            label,
        }
    }

    /// Returns true if the buffer was reallocated.
    fn ensure_capacity(&mut self, device: &wgpu::Device, bytes: u64) -> bool {
        if bytes <= self.capacity {
            return false;
        }
        let size = bytes.next_power_of_two().max(MIN_BUFFER_BYTES);
        self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size,
            usage: self.usage,
            mapped_at_creation: false,
        });
        tracing::debug!("{} grown {} -> {} bytes", self.label, self.capacity, size);
        self.capacity = size;
        true
    }

    /// Upload `bytes` at offset 0, padded to `COPY_BUFFER_ALIGNMENT`.
    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) -> bool {
        let align = wgpu::COPY_BUFFER_ALIGNMENT;
        let len = bytes.len() as u64;
        let upload = len.div_ceil(align) * align;
        let grew = self.ensure_capacity(device, upload);
        if upload == 0 {
            return grew;
        }
        if upload == len {
            queue.write_buffer(&self.buffer, 0, bytes);
        } else {
            let mut padded = Vec::<u8>::with_capacity(upload as usize);
            padded.extend_from_slice(bytes);
            padded.resize(upload as usize, 0);
            queue.write_buffer(&self.buffer, 0, &padded);
        }
        grew
    }
}

/// Offscreen render target
struct OffscreenState {
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
    size: [u32; 2],
}

/// Outcome of one `render` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Draw calls issued (background included)
    pub draws: usize,
    /// Commands skipped for lack of a texture or geometry
    pub skipped: usize,
}

/// GPU resources for one device
pub struct GpuRenderer {
    background_pipeline: wgpu::RenderPipeline,
    billboard_pipeline: wgpu::RenderPipeline,
    mesh_pipeline: wgpu::RenderPipeline,
    blit_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: GrowableBuffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_staging: Vec<u8>,
    quad_buffer: wgpu::Buffer,
    background_buffer: wgpu::Buffer,
    background: Option<GpuTexture>,
    background_revision: u64,
    textures: TextureStore,
    mesh_positions: GrowableBuffer,
    mesh_uvs: GrowableBuffer,
    mesh_indices: GrowableBuffer,
    offscreen: OffscreenState,
}

impl GpuRenderer {
    /// Build pipelines and upload textures. Shader or pipeline validation
    /// failures are returned instead of surfacing later as device errors.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        images: &TextureImages,
    ) -> Result<Self, RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("arface_scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("arface_blit_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });

        let uniform_size = std::mem::size_of::<DrawUniforms>() as u64;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("arface_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });
        let texture_layout = texture_bind_group_layout(device);
        let sampler = create_sampler(device);

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("arface_scene_pl"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let background_pipeline = create_scene_pipeline(
            device,
            &scene_layout,
            &scene_shader,
            "arface_background_pipeline",
            &[QuadVertex::layout()],
            wgpu::PrimitiveTopology::TriangleStrip,
            wgpu::BlendState::REPLACE,
            DepthMode::Off,
        );
        let billboard_pipeline = create_scene_pipeline(
            device,
            &scene_layout,
            &scene_shader,
            "arface_billboard_pipeline",
            &[QuadVertex::layout()],
            wgpu::PrimitiveTopology::TriangleStrip,
            wgpu::BlendState::ALPHA_BLENDING,
            DepthMode::Off,
        );
        let mesh_pipeline = create_scene_pipeline(
            device,
            &scene_layout,
            &scene_shader,
            "arface_mesh_pipeline",
            &[
                wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MESH_POSITION_ATTRIBS,
                },
                wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MESH_UV_ATTRIBS,
                },
            ],
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::ALPHA_BLENDING,
            DepthMode::TestAndWrite,
        );

        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("arface_blit_pl"),
            bind_group_layouts: &[&texture_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("arface_blit_pipeline"),
            layout: Some(&blit_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_blit"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_blit"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;
        let uniforms = GrowableBuffer::new(
            device,
            "arface_uniforms",
            wgpu::BufferUsages::UNIFORM,
            uniform_stride * 4,
        );
        let uniform_bind_group =
            create_uniform_bind_group(device, &uniform_layout, &uniforms.buffer);

        let quad_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("arface_quad_vb"),
            size: std::mem::size_of::<[QuadVertex; 4]>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&quad_buffer, 0, bytemuck::cast_slice(&quad_vertices()));
        let background_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("arface_background_vb"),
            size: std::mem::size_of::<[QuadVertex; 4]>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let textures = TextureStore::upload(device, queue, &texture_layout, &sampler, images);
        let offscreen =
            create_offscreen(device, &texture_layout, &sampler, width.max(1), height.max(1));

        let vertex = wgpu::BufferUsages::VERTEX;
        let mesh_positions = GrowableBuffer::new(device, "arface_mesh_positions", vertex, 0);
        let mesh_uvs = GrowableBuffer::new(device, "arface_mesh_uvs", vertex, 0);
        let mesh_indices =
            GrowableBuffer::new(device, "arface_mesh_indices", wgpu::BufferUsages::INDEX, 0);

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Pipeline(error.to_string()));
        }

        tracing::info!(
            "GPU renderer ready: {}x{}, {} overlay textures",
            offscreen.size[0],
            offscreen.size[1],
            textures.uploaded_count()
        );

        Ok(Self {
            background_pipeline,
            billboard_pipeline,
            mesh_pipeline,
            blit_pipeline,
            uniform_layout,
            texture_layout,
            sampler,
            uniforms,
            uniform_bind_group,
            uniform_stride,
            uniform_staging: Vec::new(),
            quad_buffer,
            background_buffer,
            background: None,
            background_revision: 0,
            textures,
            mesh_positions,
            mesh_uvs,
            mesh_indices,
            offscreen,
        })
    }

    pub fn size(&self) -> [u32; 2] {
        self.offscreen.size
    }

    /// Recreate the offscreen target if the viewport size changed.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 || self.offscreen.size == [width, height] {
            return;
        }
        self.offscreen =
            create_offscreen(device, &self.texture_layout, &self.sampler, width, height);
    }

    /// Encode and submit one offscreen pass for `list`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        list: &DrawList,
        arena: &MeshArena,
    ) -> RenderStats {
        let mut stats = RenderStats::default();

        self.upload_background(device, queue, list);
        self.write_uniforms(device, queue, list);
        let uploaded_mesh = self.upload_mesh(device, queue, list, arena);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("arface_offscreen_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("arface_offscreen_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.offscreen.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.offscreen.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            let mut slot = 0u64;
            for command in list.commands() {
                let offset = (slot * self.uniform_stride) as wgpu::DynamicOffset;
                match command {
                    // handled by the pass load op
                    DrawCommand::Clear => continue,
                    DrawCommand::Background => {
                        if let Some(background) = &self.background {
                            pass.set_pipeline(&self.background_pipeline);
                            pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                            pass.set_bind_group(1, background.bind_group(), &[]);
                            pass.set_vertex_buffer(0, self.background_buffer.slice(..));
                            pass.draw(0..4, 0..1);
                            stats.draws += 1;
                        } else {
                            stats.skipped += 1;
                        }
                    }
                    DrawCommand::Billboard { slot: texture, .. } => {
                        match self.textures.bind_group(*texture) {
                            Some(bind_group) => {
                                pass.set_pipeline(&self.billboard_pipeline);
                                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                                pass.set_bind_group(1, bind_group, &[]);
                                pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                                pass.draw(0..4, 0..1);
                                stats.draws += 1;
                            }
                            None => {
                                tracing::trace!("No {} texture, skipping billboard", texture);
                                stats.skipped += 1;
                            }
                        }
                    }
                    DrawCommand::FaceMesh { slot: texture, geometry, .. } => {
                        let bind_group = self.textures.bind_group(*texture);
                        match (bind_group, uploaded_mesh) {
                            (Some(bind_group), Some(uploaded)) if uploaded == *geometry => {
                                pass.set_pipeline(&self.mesh_pipeline);
                                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                                pass.set_bind_group(1, bind_group, &[]);
                                pass.set_vertex_buffer(0, self.mesh_positions.buffer.slice(..));
                                pass.set_vertex_buffer(1, self.mesh_uvs.buffer.slice(..));
                                pass.set_index_buffer(
                                    self.mesh_indices.buffer.slice(..),
                                    wgpu::IndexFormat::Uint16,
                                );
                                pass.draw_indexed(0..geometry.index_count(), 0, 0..1);
                                stats.draws += 1;
                            }
                            _ => {
                                tracing::trace!(
                                    "Skipping face mesh draw (texture or geometry unavailable)"
                                );
                                stats.skipped += 1;
                            }
                        }
                    }
                }
                slot += 1;
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        stats
    }

    /// Draw the offscreen result into the host pass.
    pub fn blit(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, Some(&self.offscreen.blit_bind_group), &[]);
        render_pass.draw(0..3, 0..1); // fullscreen triangle
    }

    /// Copy the offscreen target back as tightly packed RGBA8 rows.
    pub fn read_pixels(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<u8>, RenderError> {
        let [width, height] = self.offscreen.size;
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row =
            align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("arface_readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("arface_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.offscreen.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| RenderError::Readback("map callback never ran".to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let pixels = copy_tight_rows(&mapped, unpadded_bytes_per_row, padded_bytes_per_row, height);
        drop(mapped);
        readback.unmap();
        Ok(pixels)
    }

    fn upload_background(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, list: &DrawList) {
        let image = list.background();
        let vertices = background_vertices(&image.uvs);
        queue.write_buffer(&self.background_buffer, 0, bytemuck::cast_slice(&vertices));

        if image.is_empty() || image.revision == self.background_revision {
            return;
        }
        let needs_texture = self
            .background
            .as_ref()
            .map_or(true, |texture| texture.size() != [image.width, image.height]);
        if needs_texture {
            self.background = Some(GpuTexture::new(
                device,
                &self.texture_layout,
                &self.sampler,
                image.width,
                image.height,
                "arface_background_texture",
            ));
        }
        if let Some(texture) = &self.background {
            texture.write(queue, &image.pixels);
        }
        self.background_revision = image.revision;
    }

    /// One aligned uniform slot per non-clear command, in list order.
    fn write_uniforms(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, list: &DrawList) {
        let stride = self.uniform_stride as usize;
        self.uniform_staging.clear();
        for command in list.commands() {
            let mvp = match command {
                DrawCommand::Clear => continue,
                DrawCommand::Background => Mat4::IDENTITY,
                DrawCommand::Billboard { mvp, .. } | DrawCommand::FaceMesh { mvp, .. } => *mvp,
            };
            let start = self.uniform_staging.len();
            self.uniform_staging.resize(start + stride, 0);
            let uniforms = DrawUniforms {
                mvp: mvp.to_cols_array_2d(),
            };
            let bytes = bytemuck::bytes_of(&uniforms);
            self.uniform_staging[start..start + bytes.len()].copy_from_slice(bytes);
        }

        if self.uniforms.write(device, queue, &self.uniform_staging) {
            self.uniform_bind_group =
                create_uniform_bind_group(device, &self.uniform_layout, &self.uniforms.buffer);
        }
    }

    /// Upload the first face mesh the list refers to, if it is still live.
    fn upload_mesh(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        list: &DrawList,
        arena: &MeshArena,
    ) -> Option<GeometryHandle> {
        let handle = list.commands().iter().find_map(|command| match command {
            DrawCommand::FaceMesh { geometry, .. } => Some(*geometry),
            _ => None,
        })?;
        let Some(geometry) = arena.geometry(handle) else {
            tracing::debug!("Face mesh handle from frame {} is stale", handle.frame());
            return None;
        };

        self.mesh_positions.write(device, queue, bytemuck::cast_slice(geometry.positions));
        self.mesh_uvs.write(device, queue, bytemuck::cast_slice(geometry.uvs));
        self.mesh_indices.write(device, queue, bytemuck::cast_slice(geometry.indices));
        Some(handle)
    }
}

#[derive(Debug, Clone, Copy)]
enum DepthMode {
    /// Always pass, never write
    Off,
    /// Less-than test with depth writes
    TestAndWrite,
}

#[allow(clippy::too_many_arguments)]
fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    topology: wgpu::PrimitiveTopology,
    blend: wgpu::BlendState,
    depth: DepthMode,
) -> wgpu::RenderPipeline {
    let (depth_write_enabled, depth_compare) = match depth {
        DepthMode::Off => (false, wgpu::CompareFunction::Always),
        DepthMode::TestAndWrite => (true, wgpu::CompareFunction::Less),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: OFFSCREEN_FORMAT,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("arface_uniform_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
            }),
        }],
    })
}

fn create_offscreen(
    device: &wgpu::Device,
    texture_layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
) -> OffscreenState {
    let (color_texture, color_view) = create_color_texture(device, width, height);
    let (depth_texture, depth_view) = create_depth_texture(device, width, height);
    let blit_bind_group =
        texture_bind_group(device, texture_layout, &color_view, sampler, "arface_blit_bg");
    OffscreenState {
        color_texture,
        color_view,
        _depth_texture: depth_texture,
        depth_view,
        blit_bind_group,
        size: [width, height],
    }
}

fn create_color_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("arface_offscreen_color"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    (texture, view)
}

fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("arface_offscreen_depth"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    (texture, view)
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn copy_tight_rows(
    mapped: &[u8],
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    height: u32,
) -> Vec<u8> {
    let (unpadded, padded) = (unpadded_bytes_per_row as usize, padded_bytes_per_row as usize);
    let mut pixels = Vec::with_capacity(unpadded * height as usize);
    for row in mapped.chunks(padded).take(height as usize) {
        pixels.extend_from_slice(&row[..unpadded.min(row.len())]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(4, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }

    #[test]
    fn test_copy_tight_rows_strips_padding() {
        // 2 rows of 3 bytes padded to 4
        let mapped = [1, 2, 3, 0, 4, 5, 6, 0];
        assert_eq!(copy_tight_rows(&mapped, 3, 4, 2), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 64);
    }
}
