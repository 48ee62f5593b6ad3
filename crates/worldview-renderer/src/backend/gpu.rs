//! wgpu implementation of [`GpuBackend`].

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use worldview_core::Color;

use super::{DrawCall, GpuBackend, ProgramDescriptor, ProgramId, TextureSource, insert_slot};
use crate::camera::CameraUniform;
use crate::capabilities::Capabilities;
use crate::config::RendererConfig;
use crate::error::RenderError;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Create a depth texture and its view.
pub fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    textured: bool,
}

struct AtlasTexture {
    width: u32,
    height: u32,
    generation: Option<u64>,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct PendingDraw {
    program: usize,
    instance_buffer: wgpu::Buffer,
    vertex_count: u32,
    instance_count: u32,
    texture: Option<u64>,
}

/// Renders into either a caller-provided view (a surface texture) or an
/// offscreen texture of the current size.
///
/// Draws are queued during the frame and replayed into a single render
/// pass by [`GpuBackend::end_frame`].
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    color_format: wgpu::TextureFormat,
    capabilities: Capabilities,
    camera_buffer: wgpu::Buffer,
    camera_bind_group_layout: wgpu::BindGroupLayout,
    camera_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    programs: Vec<Option<GpuProgram>>,
    textures: HashMap<u64, AtlasTexture>,
    target: Option<wgpu::TextureView>,
    offscreen: Option<(wgpu::Texture, wgpu::TextureView)>,
    depth: Option<(wgpu::Texture, wgpu::TextureView)>,
    width: u32,
    height: u32,
    clear_color: wgpu::Color,
    pending: Vec<PendingDraw>,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        color_format: wgpu::TextureFormat,
        config: &RendererConfig,
    ) -> Self {
        let capabilities = Capabilities::from_wgpu_limits(&device.limits(), config.point_size_limits);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::bytes_of(&CameraUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Atlas Bind Group Layout"),
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
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        tracing::debug!(
            ?color_format,
            max_texture_size = capabilities.max_texture_size,
            "created wgpu backend"
        );

        Self {
            device,
            queue,
            color_format,
            capabilities,
            camera_buffer,
            camera_bind_group_layout,
            camera_bind_group,
            texture_bind_group_layout,
            sampler,
            programs: Vec::new(),
            textures: HashMap::new(),
            target: None,
            offscreen: None,
            depth: None,
            width: 0,
            height: 0,
            clear_color: wgpu::Color::BLACK,
            pending: Vec::new(),
        }
    }

    /// Requests an adapter and device without a surface.
    pub async fn headless(
        color_format: wgpu::TextureFormat,
        config: &RendererConfig,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| RenderError::Backend("no suitable GPU adapter".to_string()))?;

        tracing::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Worldview Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::Backend(e.to_string()))?;

        Ok(Self::new(Arc::new(device), Arc::new(queue), color_format, config))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Renders the next frame into `view` instead of the offscreen texture.
    pub fn set_target(&mut self, view: wgpu::TextureView) {
        self.target = Some(view);
    }

    /// Offscreen color texture, if no external target is used.
    pub fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        self.offscreen.as_ref().map(|(texture, _)| texture)
    }

    fn create_offscreen(&self, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Color Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_atlas_texture(&self, src: &TextureSource) -> AtlasTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Glyph Atlas Texture"),
            size: wgpu::Extent3d {
                width: src.width,
                height: src.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Glyph Atlas Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        AtlasTexture {
            width: src.width,
            height: src.height,
            generation: None,
            texture,
            bind_group,
        }
    }

    /// Uploads `src` unless the cached copy already has its generation.
    fn sync_texture(&mut self, src: &TextureSource) -> Result<(), RenderError> {
        if src.pixels.len() != src.width as usize * src.height as usize {
            return Err(RenderError::Backend(format!(
                "texture {} has {} bytes, expected {}x{}",
                src.key,
                src.pixels.len(),
                src.width,
                src.height
            )));
        }

        let stale = self
            .textures
            .get(&src.key)
            .is_none_or(|t| t.width != src.width || t.height != src.height);
        if stale {
            let texture = self.create_atlas_texture(src);
            self.textures.insert(src.key, texture);
        }

        if let Some(entry) = self.textures.get_mut(&src.key) {
            if entry.generation != Some(src.generation) {
                self.queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &entry.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    &src.pixels,
                    wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(src.width),
                        rows_per_image: Some(src.height),
                    },
                    wgpu::Extent3d {
                        width: src.width,
                        height: src.height,
                        depth_or_array_layers: 1,
                    },
                );
                entry.generation = Some(src.generation);
                tracing::debug!(key = src.key, generation = src.generation, "uploaded atlas texture");
            }
        }
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<ProgramId, RenderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if desc.textured {
            vec![&self.camera_bind_group_layout, &self.texture_bind_group_layout]
        } else {
            vec![&self.camera_bind_group_layout]
        };

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    desc.vertex_layout.buffer_layout(wgpu::VertexStepMode::Vertex),
                    desc.instance_layout.buffer_layout(wgpu::VertexStepMode::Instance),
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: desc.depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: desc.vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::Backend(format!(
                "failed to build program `{}`: {}",
                desc.label, error
            )));
        }

        let program = GpuProgram {
            label: desc.label.to_string(),
            pipeline,
            vertex_buffer,
            textured: desc.textured,
        };
        Ok(insert_slot(&mut self.programs, program))
    }

    fn destroy_program(&mut self, program: ProgramId) {
        self.pending.retain(|draw| draw.program != program.0);
        if let Some(slot) = self.programs.get_mut(program.0) {
            if let Some(program) = slot.take() {
                program.vertex_buffer.destroy();
                tracing::debug!(program = %program.label, "destroyed program");
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.width = width.max(1);
        self.height = height.max(1);
        self.depth = Some(create_depth_texture(&self.device, self.width, self.height));
        self.offscreen = Some(self.create_offscreen(self.width, self.height));
        tracing::debug!(width = self.width, height = self.height, "resized render targets");
        Ok(())
    }

    fn begin_frame(&mut self, camera: &CameraUniform) -> Result<(), RenderError> {
        self.pending.clear();
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<(), RenderError> {
        self.clear_color = wgpu::Color {
            r: color.r as f64,
            g: color.g as f64,
            b: color.b as f64,
            a: color.a as f64,
        };
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), RenderError> {
        let Some(program) = self.programs.get(call.program.0).and_then(Option::as_ref) else {
            return Err(RenderError::Backend(format!(
                "command `{}` uses an unknown program",
                call.command
            )));
        };
        if call.instance_count == 0 {
            return Ok(());
        }
        if program.textured && call.texture.is_none() {
            return Err(RenderError::Backend(format!(
                "program `{}` needs a texture",
                program.label
            )));
        }

        if let Some(texture) = call.texture {
            self.sync_texture(texture)?;
        }

        let instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(call.command),
            contents: call.instances,
            usage: wgpu::BufferUsages::VERTEX,
        });

        self.pending.push(PendingDraw {
            program: call.program.0,
            instance_buffer,
            vertex_count: call.vertex_count,
            instance_count: call.instance_count,
            texture: call.texture.map(|t| t.key),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let external = self.target.take();
        let color_view = match (&external, &self.offscreen) {
            (Some(view), _) => view,
            (None, Some((_, view))) => view,
            (None, None) => {
                self.pending.clear();
                return Err(RenderError::SurfaceLost);
            }
        };
        let Some((_, depth_view)) = &self.depth else {
            self.pending.clear();
            return Err(RenderError::SurfaceLost);
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Worldview Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Worldview Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            for draw in &self.pending {
                let Some(program) = self.programs.get(draw.program).and_then(Option::as_ref) else {
                    continue;
                };
                pass.set_pipeline(&program.pipeline);
                if let Some(texture) = draw.texture.and_then(|key| self.textures.get(&key)) {
                    pass.set_bind_group(1, &texture.bind_group, &[]);
                }
                pass.set_vertex_buffer(0, program.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, draw.instance_buffer.slice(..));
                pass.draw(0..draw.vertex_count, 0..draw.instance_count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.pending.clear();
        Ok(())
    }

    fn release(&mut self) {
        self.pending.clear();
        self.programs.clear();
        self.textures.clear();
        self.target = None;
    }
}
