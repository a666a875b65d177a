use anyhow::{anyhow, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::{
    vertex_attr_array, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, Buffer, BufferBindingType, BufferUsages,
    ColorTargetState, ColorWrites, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode,
    DeviceDescriptor, FragmentState, Instance, LoadOp, MultisampleState, Operations,
    PipelineLayoutDescriptor, PresentMode, PrimitiveState, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, RequestAdapterOptions,
    ShaderModuleDescriptor, ShaderSource, SurfaceConfiguration, TextureUsages, TextureView,
    TextureViewDescriptor, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::math::{screen_projection, Vec2};

// Per-frame budget for queued shape draws. The dynamic-offset uniform buffer
// is sized from this at startup.
const MAX_SHAPES_PER_FRAME: u64 = 256;

// Segments used when tessellating an ellipse outline.
const ELLIPSE_SEGMENTS: usize = 24;

/// Wrapper around wgpu surface/device setup and simple frame management.
///
/// Draw calls queue shapes; everything is flushed in a single render pass when
/// the frame is ended.
pub struct Renderer<'window> {
    backend: WgpuBackend<'window>,
}

impl<'window> Renderer<'window> {
    pub fn new(window: &'window Window, vsync: bool) -> Result<Self> {
        let backend = WgpuBackend::new(window, vsync)?;
        Ok(Self { backend })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.backend.resize(new_size);
    }

    pub fn begin_frame(&mut self) -> Result<Frame> {
        self.backend.begin_frame()
    }

    pub fn clear(&mut self, frame: &mut Frame, color: [f32; 4]) -> Result<()> {
        self.backend.clear(frame, color)
    }

    /// Queue a filled convex polygon. Points are screen pixels, wound either
    /// way; concave outlines will fan-triangulate incorrectly.
    pub fn draw_polygon(&mut self, frame: &mut Frame, points: &[Vec2], color: [f32; 4]) -> Result<()> {
        self.backend.draw_polygon(frame, points, color)
    }

    /// Queue a filled rectangle centered at `center`, rotated by `rotation`
    /// radians about its center.
    pub fn draw_rect(
        &mut self,
        frame: &mut Frame,
        center: Vec2,
        size: Vec2,
        rotation: f32,
        color: [f32; 4],
    ) -> Result<()> {
        let half = size * 0.5;
        let corners = [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ];
        let points: Vec<Vec2> = corners
            .iter()
            .map(|&corner| center + corner.rotate(rotation))
            .collect();
        self.backend.draw_polygon(frame, &points, color)
    }

    /// Queue a filled ellipse centered at `center` with half-extents `radii`,
    /// rotated by `rotation` radians about its center.
    pub fn draw_ellipse(
        &mut self,
        frame: &mut Frame,
        center: Vec2,
        radii: Vec2,
        rotation: f32,
        color: [f32; 4],
    ) -> Result<()> {
        let mut points = Vec::with_capacity(ELLIPSE_SEGMENTS);
        for i in 0..ELLIPSE_SEGMENTS {
            let t = i as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
            let local = Vec2::new(radii.x * t.cos(), radii.y * t.sin());
            points.push(center + local.rotate(rotation));
        }
        self.backend.draw_polygon(frame, &points, color)
    }

    pub fn end_frame(&mut self, frame: Frame) -> Result<()> {
        self.backend.end_frame(frame)
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.backend.surface_size()
    }
}

/// In-flight frame: the acquired surface texture, its command encoder, and
/// the shape draws queued so far.
pub struct Frame {
    surface_texture: Option<wgpu::SurfaceTexture>,
    view: TextureView,
    encoder: Option<CommandEncoder>,
    shape_draws: Vec<ShapeDrawCommand>,
}

impl Drop for Frame {
    fn drop(&mut self) {
        // If frame wasn't properly ended, we still need to present the surface
        // texture to avoid leaking resources.
        if let Some(surface_texture) = self.surface_texture.take() {
            surface_texture.present();
        }
    }
}

/// Queued shape draw command (flushed in end_frame).
struct ShapeDrawCommand {
    vertex_buffer: Buffer,
    vertex_count: u32,
    uniform_offset: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ShapeVertex {
    position: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ShapeUniforms {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
}

struct ShapePipeline {
    pipeline: RenderPipeline,
    uniform_buffer: Buffer,
    bind_group: BindGroup,
    uniform_stride: u64,
}

struct WgpuBackend<'window> {
    surface: wgpu::Surface<'window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: SurfaceConfiguration,
    present_mode: PresentMode,
    shape_pipeline: ShapePipeline,
    uniform_write_offset: u64,
}

impl<'window> WgpuBackend<'window> {
    fn new(window: &'window Window, vsync: bool) -> Result<Self> {
        let instance = Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        log::info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("jetflyer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        }))?;

        let size = window.inner_size();
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(capabilities.formats[0]);

        let present_mode = choose_present_mode(&capabilities.present_modes, vsync);
        let alpha_mode = choose_alpha_mode(&capabilities.alpha_modes);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shape_pipeline = create_shape_pipeline(&device, format);

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            present_mode,
            shape_pipeline,
            uniform_write_offset: 0,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface_config.present_mode = self.present_mode;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn begin_frame(&mut self) -> Result<Frame> {
        // Reset uniform buffer offset at the start of each frame
        self.uniform_write_offset = 0;

        loop {
            match self.surface.get_current_texture() {
                Ok(surface_texture) => {
                    let view = surface_texture
                        .texture
                        .create_view(&TextureViewDescriptor::default());
                    let encoder = self
                        .device
                        .create_command_encoder(&CommandEncoderDescriptor {
                            label: Some("frame-encoder"),
                        });

                    return Ok(Frame {
                        surface_texture: Some(surface_texture),
                        view,
                        encoder: Some(encoder),
                        shape_draws: Vec::new(),
                    });
                }
                Err(e) => match e {
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                        log::warn!("surface lost, reconfiguring");
                        self.surface.configure(&self.device, &self.surface_config);
                        continue;
                    }
                    wgpu::SurfaceError::Timeout => {
                        continue;
                    }
                    wgpu::SurfaceError::OutOfMemory => {
                        return Err(anyhow!("Surface ran out of memory"));
                    }
                    wgpu::SurfaceError::Other => {
                        return Err(anyhow!("Surface error: Other"));
                    }
                },
            }
        }
    }

    fn clear(&mut self, frame: &mut Frame, color: [f32; 4]) -> Result<()> {
        let encoder = frame
            .encoder
            .as_mut()
            .ok_or_else(|| anyhow!("Frame already ended"))?;

        {
            let _pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("clear-pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                multiview_mask: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            drop(_pass);
        }

        Ok(())
    }

    fn draw_polygon(&mut self, frame: &mut Frame, points: &[Vec2], color: [f32; 4]) -> Result<()> {
        if points.len() < 3 {
            return Ok(()); // Need at least 3 points for a triangle
        }

        let max_offset = MAX_SHAPES_PER_FRAME * self.shape_pipeline.uniform_stride;
        if self.uniform_write_offset >= max_offset {
            return Err(anyhow!(
                "Too many shapes drawn in one frame (max: {})",
                MAX_SHAPES_PER_FRAME
            ));
        }

        // Fan triangulation around the first point.
        let vertices: Vec<ShapeVertex> = (1..points.len() - 1)
            .flat_map(|i| {
                [
                    ShapeVertex {
                        position: [points[0].x, points[0].y],
                    },
                    ShapeVertex {
                        position: [points[i].x, points[i].y],
                    },
                    ShapeVertex {
                        position: [points[i + 1].x, points[i + 1].y],
                    },
                ]
            })
            .collect();

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shape-vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: BufferUsages::VERTEX,
            });

        let mvp = screen_projection(self.surface_config.width, self.surface_config.height);
        let uniforms = ShapeUniforms {
            mvp: mvp.to_cols_array_2d(),
            color,
        };

        self.queue.write_buffer(
            &self.shape_pipeline.uniform_buffer,
            self.uniform_write_offset,
            bytemuck::bytes_of(&uniforms),
        );

        frame.shape_draws.push(ShapeDrawCommand {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            uniform_offset: self.uniform_write_offset,
        });

        self.uniform_write_offset += self.shape_pipeline.uniform_stride;

        Ok(())
    }

    fn end_frame(&mut self, mut frame: Frame) -> Result<()> {
        self.flush_shapes(&mut frame)?;

        let encoder = frame
            .encoder
            .take()
            .ok_or_else(|| anyhow!("Frame already ended"))?;
        self.queue.submit(Some(encoder.finish()));

        let surface_texture = frame
            .surface_texture
            .take()
            .ok_or_else(|| anyhow!("Frame already ended"))?;
        surface_texture.present();
        Ok(())
    }

    /// Flush all queued shape draws in a single render pass.
    fn flush_shapes(&mut self, frame: &mut Frame) -> Result<()> {
        if frame.shape_draws.is_empty() {
            return Ok(());
        }

        let encoder = frame
            .encoder
            .as_mut()
            .ok_or_else(|| anyhow!("Frame already ended"))?;

        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("shape-pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Load, // Keep the cleared background
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            multiview_mask: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_pipeline(&self.shape_pipeline.pipeline);
        for draw_cmd in &frame.shape_draws {
            pass.set_bind_group(
                0,
                &self.shape_pipeline.bind_group,
                &[draw_cmd.uniform_offset as u32],
            );
            pass.set_vertex_buffer(0, draw_cmd.vertex_buffer.slice(..));
            pass.draw(0..draw_cmd.vertex_count, 0..1);
        }

        Ok(())
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}

fn choose_present_mode(modes: &[PresentMode], vsync: bool) -> PresentMode {
    if vsync {
        modes
            .iter()
            .copied()
            .find(|mode| matches!(mode, PresentMode::Fifo | PresentMode::FifoRelaxed))
            .unwrap_or(PresentMode::Fifo)
    } else {
        modes
            .iter()
            .copied()
            .find(|mode| matches!(mode, PresentMode::Immediate | PresentMode::Mailbox))
            .unwrap_or(PresentMode::Immediate)
    }
}

fn choose_alpha_mode(modes: &[CompositeAlphaMode]) -> CompositeAlphaMode {
    modes
        .iter()
        .copied()
        .find(|mode| matches!(mode, CompositeAlphaMode::Auto))
        .unwrap_or_else(|| modes.first().copied().unwrap_or(CompositeAlphaMode::Opaque))
}

fn create_shape_pipeline(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> ShapePipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("shape-shader"),
        source: ShaderSource::Wgsl(include_str!("shape.wgsl").into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("shape-bind-group-layout"),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: true, // One buffer, per-shape offsets
                min_binding_size: std::num::NonZeroU64::new(
                    std::mem::size_of::<ShapeUniforms>() as u64
                ),
            },
            count: None,
        }],
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("shape-pipeline-layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    // Get the required uniform buffer alignment (usually 256 bytes)
    let uniform_stride = device.limits().min_uniform_buffer_offset_alignment as u64;
    let uniform_size = std::mem::size_of::<ShapeUniforms>() as u64;
    let aligned_uniform_size = (uniform_size + uniform_stride - 1) & !(uniform_stride - 1);

    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("shape-uniform-buffer"),
        size: MAX_SHAPES_PER_FRAME * aligned_uniform_size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("shape-bind-group"),
        layout: &bind_group_layout,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &uniform_buffer,
                offset: 0,
                size: std::num::NonZeroU64::new(uniform_size),
            }),
        }],
    });

    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("shape-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<ShapeVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &vertex_attr_array![0 => Float32x2],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    ShapePipeline {
        pipeline,
        uniform_buffer,
        bind_group,
        uniform_stride: aligned_uniform_size,
    }
}
