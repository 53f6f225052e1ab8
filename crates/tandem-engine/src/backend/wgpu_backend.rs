use std::borrow::Cow;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{Gpu, GpuFrame, SurfaceRecovery};
use crate::params::ParamLayout;
use crate::registry::{
    Access, BufferDesc, BufferKind, FilterMode, ImageDesc, ImageFormat, IndexFormat, RegistryError,
    SamplerDesc, Topology, VertexFormat, VertexLayout, VertexStep,
};
use crate::stage::{check_local_size, DrawCall, ShaderSet};

use super::{Backend, BoundResource, BoundSlot, ComputeBuild, FrameStart, RenderBuild};

// ── objects ───────────────────────────────────────────────────────────────

pub struct WgpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: ImageFormat,
}

pub struct WgpuAttachments {
    targets: Vec<(u32, wgpu::TextureView, ImageFormat)>,
}

/// Uniform buffer + bind group (group 1) holding a stage's parameter block.
struct ParamUniform {
    buffer: wgpu::Buffer,
    group: wgpu::BindGroup,
}

pub struct WgpuCompute {
    label: String,
    pipeline: wgpu::ComputePipeline,
    resources: wgpu::BindGroup,
    params: Option<ParamUniform>,
}

pub struct WgpuRender {
    label: String,
    pipeline: wgpu::RenderPipeline,
    resources: wgpu::BindGroup,
    params: Option<ParamUniform>,
    vertex_buffers: Vec<wgpu::Buffer>,
    index: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    clear: wgpu::Color,
}

// ── backend ───────────────────────────────────────────────────────────────

/// Backend driving a wgpu device and a window surface.
///
/// Group 0 carries a stage's resource bindings at their slot numbers; group 1
/// binding 0 carries its parameter block when it has one.
pub struct WgpuBackend {
    window: Arc<Window>,
    gpu: Gpu,
    frame: Option<GpuFrame>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, gpu: Gpu) -> Self {
        Self {
            window,
            gpu,
            frame: None,
        }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    fn shader_module(
        &self,
        label: &str,
        shader: &ShaderSet,
    ) -> Result<(wgpu::ShaderModule, String), RegistryError> {
        let code = shader.wgsl.as_ref().ok_or_else(|| RegistryError::MissingShader {
            stage: label.to_string(),
            backend: self.name(),
        })?;
        let source = code.load()?.into_owned();

        let module = self.gpu.device().create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.as_str())),
        });

        let info = pollster::block_on(module.get_compilation_info());
        let mut errors = Vec::new();
        for msg in info.messages {
            match msg.message_type {
                wgpu::CompilationMessageType::Error => errors.push(msg.message),
                wgpu::CompilationMessageType::Warning => log::warn!("shader `{label}`: {}", msg.message),
                wgpu::CompilationMessageType::Info => log::debug!("shader `{label}`: {}", msg.message),
            }
        }
        if !errors.is_empty() {
            return Err(RegistryError::ShaderCompile {
                label: label.to_string(),
                message: errors.join("\n"),
            });
        }

        Ok((module, source))
    }

    fn resource_group(
        &self,
        label: &str,
        visibility: wgpu::ShaderStages,
        bindings: &[BoundSlot<'_, Self>],
        attachments: Option<&WgpuAttachments>,
    ) -> (wgpu::BindGroupLayout, wgpu::BindGroup) {
        let mut layout_entries = Vec::new();
        let mut entries = Vec::new();

        for b in bindings {
            let (ty, resource) = match b.resource {
                BoundResource::StorageBuffer { buffer, access } => (
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage {
                            read_only: access == Access::ReadOnly,
                        },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    buffer.as_entire_binding(),
                ),
                BoundResource::SampledImage(image) => (
                    wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float {
                            filterable: image.format != ImageFormat::Rgba32Float,
                        },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    wgpu::BindingResource::TextureView(&image.view),
                ),
                BoundResource::Sampler(sampler) => (
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    wgpu::BindingResource::Sampler(sampler),
                ),
            };
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: b.slot,
                visibility,
                ty,
                count: None,
            });
            entries.push(wgpu::BindGroupEntry {
                binding: b.slot,
                resource,
            });
        }

        for (slot, view, format) in attachments.map(|a| a.targets.as_slice()).unwrap_or_default() {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: *slot,
                visibility,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: texture_format(*format),
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupEntry {
                binding: *slot,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        let device = self.gpu.device();
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &layout_entries,
        });
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &entries,
        });
        (layout, group)
    }

    fn param_uniform(
        &self,
        label: &str,
        visibility: wgpu::ShaderStages,
        params: &ParamLayout,
    ) -> (wgpu::BindGroupLayout, ParamUniform) {
        let device = self.gpu.device();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: params.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(params.size() as u64),
                },
                count: None,
            }],
        });
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        (layout, ParamUniform { buffer, group })
    }

    fn upload_params(&self, uniform: Option<&ParamUniform>, bytes: Option<&[u8]>, label: &str) {
        match (uniform, bytes) {
            (Some(u), Some(bytes)) => self.gpu.queue().write_buffer(&u.buffer, 0, bytes),
            (Some(_), None) => log::warn!("stage `{label}` has a parameter block but none was supplied"),
            (None, Some(_)) => log::warn!("stage `{label}` takes no parameters; block ignored"),
            (None, None) => {}
        }
    }
}

impl Backend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Image = WgpuImage;
    type Sampler = wgpu::Sampler;
    type Attachments = WgpuAttachments;
    type ComputePipeline = WgpuCompute;
    type RenderPipeline = WgpuRender;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<wgpu::Buffer, RegistryError> {
        let usage = match desc.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index(_) => wgpu::BufferUsages::INDEX,
            BufferKind::Storage { .. } => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC
            }
        };

        let device = self.gpu.device();
        let buffer = match &desc.contents {
            Some(bytes) => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&desc.label),
                contents: bytes,
                usage,
            }),
            None => device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&desc.label),
                size: desc.size,
                usage,
                mapped_at_creation: false,
            }),
        };
        Ok(buffer)
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<WgpuImage, RegistryError> {
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING;
        if desc.storage {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        } else {
            usage |= wgpu::TextureUsages::COPY_DST;
        }

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuImage {
            texture,
            view,
            format: desc.format,
        })
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<wgpu::Sampler, RegistryError> {
        let filter = match desc.filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        Ok(self.gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&desc.label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        }))
    }

    fn create_attachments(
        &mut self,
        _label: &str,
        targets: &[(u32, &WgpuImage)],
    ) -> Result<WgpuAttachments, RegistryError> {
        Ok(WgpuAttachments {
            targets: targets
                .iter()
                .map(|&(slot, image)| (slot, image.view.clone(), image.format))
                .collect(),
        })
    }

    fn create_compute_pipeline(&mut self, build: ComputeBuild<'_, Self>) -> Result<WgpuCompute, RegistryError> {
        let (module, source) = self.shader_module(build.label, build.shader)?;
        check_local_size(build.label, &source, build.entry_point, build.local_size)?;

        let visibility = wgpu::ShaderStages::COMPUTE;
        let (resource_layout, resources) =
            self.resource_group(build.label, visibility, &build.bindings, build.attachments);
        let params = build.params.map(|p| self.param_uniform(build.label, visibility, p));

        let mut layouts = vec![&resource_layout];
        if let Some((layout, _)) = &params {
            layouts.push(layout);
        }

        let device = self.gpu.device();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(build.label),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(build.label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(build.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(WgpuCompute {
            label: build.label.to_string(),
            pipeline,
            resources,
            params: params.map(|(_, uniform)| uniform),
        })
    }

    fn create_render_pipeline(&mut self, build: RenderBuild<'_, Self>) -> Result<WgpuRender, RegistryError> {
        let (module, _) = self.shader_module(build.label, build.shader)?;

        let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let (resource_layout, resources) = self.resource_group(build.label, visibility, &build.bindings, None);
        let params = build.params.map(|p| self.param_uniform(build.label, visibility, p));

        let mut layouts = vec![&resource_layout];
        if let Some((layout, _)) = &params {
            layouts.push(layout);
        }

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = build
            .vertex_buffers
            .iter()
            .map(|(_, layout)| vertex_attributes(layout))
            .collect();
        let buffer_layouts: Vec<wgpu::VertexBufferLayout<'_>> = build
            .vertex_buffers
            .iter()
            .zip(&attributes)
            .map(|((_, layout), attrs)| wgpu::VertexBufferLayout {
                array_stride: layout.stride as u64,
                step_mode: match layout.step {
                    VertexStep::Vertex => wgpu::VertexStepMode::Vertex,
                    VertexStep::Instance => wgpu::VertexStepMode::Instance,
                },
                attributes: attrs,
            })
            .collect();

        let device = self.gpu.device();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(build.label),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(build.label),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(build.vs_entry),
                compilation_options: Default::default(),
                buffers: &buffer_layouts,
            },

            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(build.fs_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.surface_format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: match build.topology {
                    Topology::Points => wgpu::PrimitiveTopology::PointList,
                    Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
                },
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(WgpuRender {
            label: build.label.to_string(),
            pipeline,
            resources,
            params: params.map(|(_, uniform)| uniform),
            vertex_buffers: build.vertex_buffers.iter().map(|(b, _)| (*b).clone()).collect(),
            index: build.index_buffer.map(|i| {
                let format = match i.format {
                    IndexFormat::U16 => wgpu::IndexFormat::Uint16,
                    IndexFormat::U32 => wgpu::IndexFormat::Uint32,
                };
                (i.buffer.clone(), format)
            }),
            clear: build.clear_color.to_wgpu(),
        })
    }

    fn destroy_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn destroy_image(&mut self, image: WgpuImage) {
        image.texture.destroy();
    }

    fn surface_size(&self) -> (u32, u32) {
        let size = self.gpu.size();
        (size.width, size.height)
    }

    fn begin_frame(&mut self) -> FrameStart {
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return FrameStart::Skip;
        }
        if self.frame.take().is_some() {
            log::warn!("previous frame was never presented; dropping it");
        }

        match self.gpu.acquire() {
            Ok(frame) => {
                self.frame = Some(frame);
                FrameStart::Ready
            }
            Err(err) => match self.gpu.recover(err) {
                SurfaceRecovery::Reconfigured | SurfaceRecovery::SkipFrame => FrameStart::Skip,
                SurfaceRecovery::Fatal => FrameStart::Fatal,
            },
        }
    }

    fn dispatch(&mut self, pipeline: &WgpuCompute, params: Option<&[u8]>, grid: [u32; 3]) {
        self.upload_params(pipeline.params.as_ref(), params, &pipeline.label);
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("dispatch `{}` outside a frame; ignored", pipeline.label);
            return;
        };

        let mut pass = frame.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&pipeline.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &pipeline.resources, &[]);
        if let Some(uniform) = &pipeline.params {
            pass.set_bind_group(1, &uniform.group, &[]);
        }
        let [x, y, z] = grid;
        pass.dispatch_workgroups(x, y, z);
    }

    fn draw(&mut self, pipeline: &WgpuRender, params: Option<&[u8]>, call: DrawCall) {
        self.upload_params(pipeline.params.as_ref(), params, &pipeline.label);
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("draw `{}` outside a frame; ignored", pipeline.label);
            return;
        };

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&pipeline.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(pipeline.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &pipeline.resources, &[]);
        if let Some(uniform) = &pipeline.params {
            pass.set_bind_group(1, &uniform.group, &[]);
        }
        for (slot, buffer) in pipeline.vertex_buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }

        match &pipeline.index {
            Some((buffer, format)) => {
                pass.set_index_buffer(buffer.slice(..), *format);
                pass.draw_indexed(0..call.count, 0, 0..call.instances);
            }
            None => pass.draw(0..call.count, 0..call.instances),
        }
    }

    fn present(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("present without an acquired frame");
            return;
        };
        self.window.pre_present_notify();
        self.gpu.present(frame);
    }
}

fn texture_format(format: ImageFormat) -> wgpu::TextureFormat {
    match format {
        ImageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        ImageFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        ImageFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
    }
}

fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: match a.format {
                VertexFormat::Float32 => wgpu::VertexFormat::Float32,
                VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            },
            offset: a.offset as u64,
            shader_location: a.location,
        })
        .collect()
}
