//! wgpu backend that replays recorded frames.
//!
//! The backend does not own the event loop; the windowed runner calls
//! [`GpuRenderer::render`] with each frame's [`RenderCommand`]s. GPU state
//! mirrors the command stream:
//!
//! * one pipeline per [`ProgramKind`], sharing a single layout;
//! * one index buffer holding the indices of [`MAX_QUADS`] quads;
//! * one vertex buffer per [`BufferId`], re-uploaded only when the
//!   command's revision differs from the uploaded one;
//! * textures uploaded the first time they are bound;
//! * per-draw placement in an instance buffer.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::frame::{BufferId, ProgramKind, RenderCommand, Uniforms};
use super::texture::{Texture, TextureId};
use super::vertex::{quad_indices, Color, SpriteVertex, INDICES_PER_QUAD, MAX_QUADS};

/// Program binds per frame; each takes one uniform slot.
const MAX_PROGRAM_BINDS: usize = 256;

/// Frames a vertex buffer may go undrawn before it is released.
const BUFFER_IDLE_FRAMES: u64 = 120;

// ---------------------------------------------------------------------------
// GPU-side layouts
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
struct GpuUniforms {
    projection: [f32; 2],
    _pad: [f32; 2],
    camera: [f32; 4],
}

impl From<Uniforms> for GpuUniforms {
    fn from(u: Uniforms) -> Self {
        Self {
            projection: u.projection,
            _pad: [0.0; 2],
            camera: [u.camera[0], u.camera[1], u.camera[2], 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
struct Instance {
    offset: [f32; 2],
    rotation: f32,
}

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Unorm8x4,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        3 => Float32x2,
        4 => Float32,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRIBUTES,
    }
}

fn clear_color(color: Color) -> wgpu::Color {
    let [r, g, b, a] = color.to_f32();
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

/// An uploaded quad and the revision it was uploaded at.
struct QuadUpload {
    buffer: wgpu::Buffer,
    revision: u64,
    last_frame: u64,
}

/// A frame's commands, resolved to GPU resources.
enum Op {
    Program { kind: ProgramKind, slot: u32 },
    Texture(TextureId),
    Draw { buffer: BufferId, instance: u32 },
}

// ---------------------------------------------------------------------------
// GpuRenderer
// ---------------------------------------------------------------------------

/// Draws recorded frames into a window surface.
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    world_pipeline: wgpu::RenderPipeline,
    hud_pipeline: wgpu::RenderPipeline,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u32,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HashMap<TextureId, wgpu::BindGroup>,
    quads: HashMap<BufferId, QuadUpload>,
    frame: u64,
    window: Arc<winit::window::Window>,
}

impl GpuRenderer {
    /// Create the surface, device and pipelines for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable adapter or device is available.
    pub async fn new(
        window: Arc<winit::window::Window>,
        vsync: bool,
    ) -> Result<Self, anyhow::Error> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("no suitable GPU adapter found"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tessera_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("surface supports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        // Uniforms: one slot per program bind, addressed by dynamic offset.
        let uniform_size = std::mem::size_of::<GpuUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniforms"),
            size: uniform_stride * MAX_PROGRAM_BINDS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_layout"),
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
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(uniform_size),
                }),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_layout"),
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
            label: Some("sprite_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let pipeline = |label: &str, entry_point: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    buffers: &[vertex_layout(), instance_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let world_pipeline = pipeline("world_pipeline", "vs_world");
        let hud_pipeline = pipeline("hud_pipeline", "vs_hud");

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_indices"),
            contents: bytemuck::cast_slice(&quad_indices(MAX_QUADS)),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instances"),
            size: (MAX_QUADS * std::mem::size_of::<Instance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::info!(
            adapter = %adapter.get_info().name,
            ?format,
            vsync,
            "gpu renderer initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            world_pipeline,
            hud_pipeline,
            index_buffer,
            instance_buffer,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride: uniform_stride as u32,
            texture_layout,
            sampler,
            textures: HashMap::new(),
            quads: HashMap::new(),
            frame: 0,
            window,
        })
    }

    pub fn window(&self) -> &winit::window::Window {
        &self.window
    }

    /// Reconfigure the surface. Zero sizes (minimised windows) are ignored.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Number of vertex buffers currently held on the GPU.
    pub fn uploaded_quads(&self) -> usize {
        self.quads.len()
    }

    /// Upload what `commands` needs, then draw and present them.
    ///
    /// # Errors
    ///
    /// Returns a [`wgpu::SurfaceError`] if the surface cannot provide a
    /// frame (window minimised, surface lost).
    pub fn render(&mut self, commands: &[RenderCommand]) -> Result<(), wgpu::SurfaceError> {
        self.frame += 1;
        let (clear, ops) = self.prepare(commands);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            let mut program_bound = false;
            let mut texture_bound = false;
            for op in &ops {
                match op {
                    Op::Program { kind, slot } => {
                        let pipeline = match kind {
                            ProgramKind::World => &self.world_pipeline,
                            ProgramKind::Hud => &self.hud_pipeline,
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_bind_group(
                            0,
                            &self.uniform_bind_group,
                            &[slot * self.uniform_stride],
                        );
                        program_bound = true;
                    }
                    Op::Texture(id) => {
                        if let Some(group) = self.textures.get(id) {
                            pass.set_bind_group(1, group, &[]);
                            texture_bound = true;
                        }
                    }
                    Op::Draw { buffer, instance } => {
                        let Some(upload) = self.quads.get(buffer) else {
                            continue;
                        };
                        if !(program_bound && texture_bound) {
                            continue;
                        }
                        pass.set_vertex_buffer(0, upload.buffer.slice(..));
                        pass.draw_indexed(
                            0..INDICES_PER_QUAD as u32,
                            0,
                            *instance..instance + 1,
                        );
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        let frame = self.frame;
        self.quads
            .retain(|_, upload| frame - upload.last_frame <= BUFFER_IDLE_FRAMES);
        Ok(())
    }

    /// Upload textures, vertices, uniforms and instances for one frame.
    fn prepare(&mut self, commands: &[RenderCommand]) -> (Color, Vec<Op>) {
        let mut clear = Color::BLACK;
        let mut ops = Vec::with_capacity(commands.len());
        let mut uniforms: Vec<GpuUniforms> = Vec::new();
        let mut instances: Vec<Instance> = Vec::new();

        for command in commands {
            match command {
                RenderCommand::Clear { color } => clear = *color,
                RenderCommand::UseProgram { program, uniforms: u } => {
                    if uniforms.len() == MAX_PROGRAM_BINDS {
                        tracing::warn!("too many program binds in one frame; rest skipped");
                        break;
                    }
                    ops.push(Op::Program {
                        kind: *program,
                        slot: uniforms.len() as u32,
                    });
                    uniforms.push((*u).into());
                }
                RenderCommand::BindTexture { texture } => {
                    self.upload_texture(texture);
                    ops.push(Op::Texture(texture.id()));
                }
                RenderCommand::DrawQuad {
                    buffer,
                    revision,
                    vertices,
                    position,
                    rotation,
                } => {
                    if instances.len() == MAX_QUADS {
                        tracing::warn!(max = MAX_QUADS, "quad limit reached; rest skipped");
                        break;
                    }
                    self.upload_quad(*buffer, *revision, vertices);
                    ops.push(Op::Draw {
                        buffer: *buffer,
                        instance: instances.len() as u32,
                    });
                    instances.push(Instance {
                        offset: *position,
                        rotation: *rotation,
                    });
                }
            }
        }

        for (slot, u) in uniforms.iter().enumerate() {
            let offset = slot as u64 * self.uniform_stride as u64;
            self.queue
                .write_buffer(&self.uniform_buffer, offset, bytemuck::bytes_of(u));
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        (clear, ops)
    }

    fn upload_quad(&mut self, id: BufferId, revision: u64, vertices: &[SpriteVertex; 4]) {
        let frame = self.frame;
        match self.quads.get_mut(&id) {
            Some(upload) => {
                upload.last_frame = frame;
                if upload.revision != revision {
                    self.queue
                        .write_buffer(&upload.buffer, 0, bytemuck::cast_slice(vertices));
                    upload.revision = revision;
                }
            }
            None => {
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("quad_vertices"),
                        contents: bytemuck::cast_slice(vertices),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    });
                self.quads.insert(
                    id,
                    QuadUpload {
                        buffer,
                        revision,
                        last_frame: frame,
                    },
                );
            }
        }
    }

    fn upload_texture(&mut self, texture: &Texture) {
        if self.textures.contains_key(&texture.id()) {
            return;
        }
        // Empty images upload as a single white pixel.
        let white = [255u8; 4];
        let (data, width, height) = if texture.width() == 0 || texture.height() == 0 {
            (&white[..], 1, 1)
        } else {
            (texture.pixels().as_raw().as_slice(), texture.width(), texture.height())
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let gpu_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sprite_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &gpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_texture_bind_group"),
            layout: &self.texture_layout,
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
        tracing::debug!(texture = texture.id().to_raw(), width, height, "texture uploaded");
        self.textures.insert(texture.id(), group);
    }
}
