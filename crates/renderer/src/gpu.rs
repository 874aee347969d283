//! wgpu-backed [`RenderSurface`] drawing into a window.

use crate::camera::CameraUniform;
use crate::pass::{BlendMode, LayerBlend, LayerPass};
use crate::surface::{RenderError, RenderSurface};
use crate::vertex::{QuadInstance, QUAD_VERTICES};
use engine_core::TransformRaw;
use glam::Vec3;
use procgen::{TextureData, TextureId};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const INITIAL_INSTANCES: u32 = 256;

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct LayerCameraBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// One instanced draw call.
struct DrawCall {
    layer_slot: usize,
    texture: TextureId,
    blend: BlendMode,
    instances: Range<u32>,
}

/// All device state. Dropped as a whole on dispose.
struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    alpha_pipeline: wgpu::RenderPipeline,
    additive_pipeline: wgpu::RenderPipeline,
    camera_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    // Each layer gets its own camera buffer: queued writes all land before
    // the single submit, so sharing one would leave every layer with the last camera.
    cameras: Vec<LayerCameraBinding>,
    textures: HashMap<TextureId, GpuTexture>,

    instance_buffer: wgpu::Buffer,
    max_instances: u32,
}

pub struct GpuSurface {
    inner: Option<GpuContext>,
    window: Arc<Window>,
    clear_color: wgpu::Color,
}

impl GpuSurface {
    /// Create a surface for `window`. Fails when no adapter or device is available.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderError> {
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
            .ok_or(RenderError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Cloud Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoAdapter)?;
        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cloud Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!("shaders/cloud.wgsl"))),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cloud Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };
        let alpha_pipeline = create_quad_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            wgpu::BlendState::ALPHA_BLENDING,
            "Cloud Alpha Pipeline",
        );
        let additive_pipeline =
            create_quad_pipeline(&device, &pipeline_layout, &shader, surface_format, additive, "Cloud Additive Pipeline");

        let instance_buffer = create_instance_buffer(&device, INITIAL_INSTANCES);

        Ok(Self {
            inner: Some(GpuContext {
                surface,
                device,
                queue,
                config,
                alpha_pipeline,
                additive_pipeline,
                camera_layout,
                texture_layout,
                sampler,
                cameras: Vec::new(),
                textures: HashMap::new(),
                instance_buffer,
                max_instances: INITIAL_INSTANCES,
            }),
            window,
            clear_color: wgpu::Color::BLACK,
        })
    }

    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64) {
        self.clear_color = wgpu::Color { r, g, b, a: 1.0 };
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl GpuContext {
    fn ensure_camera(&mut self, slot: usize) {
        while self.cameras.len() <= slot {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Layer Camera Buffer"),
                contents: bytemuck::cast_slice(&[CameraUniform::new()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Layer Camera Bind Group"),
                layout: &self.camera_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.cameras.push(LayerCameraBinding { buffer, bind_group });
        }
    }

    fn ensure_instance_capacity(&mut self, needed: u32) {
        if needed <= self.max_instances {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("Growing instance buffer {} -> {}", self.max_instances, capacity);
        self.instance_buffer.destroy();
        self.instance_buffer = create_instance_buffer(&self.device, capacity);
        self.max_instances = capacity;
    }
}

impl RenderSurface for GpuSurface {
    fn upload_texture(&mut self, id: TextureId, data: &TextureData) -> Result<(), RenderError> {
        let ctx = self.inner.as_mut().ok_or(RenderError::Disposed)?;
        if data.is_empty() {
            return Err(RenderError::EmptyTexture(id));
        }

        let texture = ctx.device.create_texture_with_data(
            &ctx.queue,
            &wgpu::TextureDescriptor {
                label: Some("Cloud Texture"),
                size: wgpu::Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.to_bytes(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloud Texture Bind Group"),
            layout: &ctx.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&ctx.sampler),
                },
            ],
        });
        if let Some(old) = ctx.textures.insert(id, GpuTexture { texture, bind_group }) {
            old.texture.destroy();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(ctx) = self.inner.as_mut() else {
            return;
        };
        if width > 0 && height > 0 {
            ctx.config.width = width;
            ctx.config.height = height;
            ctx.surface.configure(&ctx.device, &ctx.config);
        }
    }

    fn render(&mut self, passes: &[LayerPass]) -> Result<(), RenderError> {
        let ctx = self.inner.as_mut().ok_or(RenderError::Disposed)?;

        let mut ordered: Vec<&LayerPass> = passes.iter().collect();
        ordered.sort_by_key(|p| p.composition.z_index);

        let (width, height) = (ctx.config.width, ctx.config.height);
        let mut instances: Vec<QuadInstance> = Vec::new();
        let mut draws: Vec<DrawCall> = Vec::new();

        for (slot, pass) in ordered.iter().enumerate() {
            let mut camera = pass.camera.clone();
            camera.set_aspect(width, height);
            let mut uniform = CameraUniform::new();
            uniform.update(&camera);
            ctx.ensure_camera(slot);
            ctx.queue.write_buffer(&ctx.cameras[slot].buffer, 0, bytemuck::cast_slice(&[uniform]));

            let layer_opacity = pass.composition.opacity.clamp(0.0, 1.0);
            // No screen blend on the swapchain; additive is the nearest match.
            let force_additive = pass.composition.blend == LayerBlend::Screen;
            let pick = |blend: BlendMode| if force_additive { BlendMode::Additive } else { blend };

            for quad in &pass.quads {
                let raw = TransformRaw::new(&quad.transform, quad.width, quad.height);
                let index = instances.len() as u32;
                instances.push(QuadInstance::new(raw, quad.opacity * layer_opacity));
                push_draw(&mut draws, slot, quad.texture, pick(quad.blend), index);
            }

            for batch in &pass.points {
                let start = instances.len() as u32;
                for (position, opacity, size) in batch.active() {
                    instances.push(QuadInstance::sprite(
                        Vec3::from(position),
                        size,
                        opacity * batch.opacity * layer_opacity,
                    ));
                }
                let end = instances.len() as u32;
                if end > start {
                    draws.push(DrawCall {
                        layer_slot: slot,
                        texture: batch.texture,
                        blend: pick(batch.blend),
                        instances: start..end,
                    });
                }
            }
        }

        ctx.ensure_instance_capacity(instances.len() as u32);
        if !instances.is_empty() {
            ctx.queue.write_buffer(&ctx.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let output = match ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.surface.configure(&ctx.device, &ctx.config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cloud Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Cloud Layers Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_vertex_buffer(0, ctx.instance_buffer.slice(..));
            for draw in &draws {
                let Some(texture) = ctx.textures.get(&draw.texture) else {
                    log::trace!("Skipping draw with unknown texture {:?}", draw.texture);
                    continue;
                };
                let pipeline = match draw.blend {
                    BlendMode::Alpha => &ctx.alpha_pipeline,
                    BlendMode::Additive => &ctx.additive_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &ctx.cameras[draw.layer_slot].bind_group, &[]);
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                render_pass.draw(0..QUAD_VERTICES, draw.instances.clone());
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn dispose(&mut self) {
        if let Some(ctx) = self.inner.take() {
            for texture in ctx.textures.values() {
                texture.texture.destroy();
            }
            ctx.instance_buffer.destroy();
            for camera in &ctx.cameras {
                camera.buffer.destroy();
            }
            log::info!("GPU surface disposed ({} textures released)", ctx.textures.len());
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_none()
    }

    fn size(&self) -> (u32, u32) {
        match &self.inner {
            Some(ctx) => (ctx.config.width, ctx.config.height),
            None => (0, 0),
        }
    }
}

/// Extend the previous draw when it uses the same layer, texture and blend.
fn push_draw(draws: &mut Vec<DrawCall>, layer_slot: usize, texture: TextureId, blend: BlendMode, index: u32) {
    if let Some(last) = draws.last_mut() {
        if last.layer_slot == layer_slot && last.texture == texture && last.blend == blend && last.instances.end == index {
            last.instances.end = index + 1;
            return;
        }
    }
    draws.push(DrawCall {
        layer_slot,
        texture,
        blend,
        instances: index..index + 1,
    });
}

fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Quad Instance Buffer"),
        size: (std::mem::size_of::<QuadInstance>() * capacity as usize) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_quad_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[QuadInstance::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_quads_with_same_texture_share_a_draw() {
        let mut draws = Vec::new();
        push_draw(&mut draws, 0, TextureId(1), BlendMode::Alpha, 0);
        push_draw(&mut draws, 0, TextureId(1), BlendMode::Alpha, 1);
        push_draw(&mut draws, 0, TextureId(2), BlendMode::Alpha, 2);
        push_draw(&mut draws, 1, TextureId(2), BlendMode::Alpha, 3);
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].instances, 0..2);
        assert_eq!(draws[2].layer_slot, 1);
    }
}
