//! wgpu implementation of `BakeDevice`
//!
//! Lightmaps are plain 2D textures usable as both render attachment and
//! sampled source. The two filters share one bind group layout and one
//! shader module; pipelines are built lazily per target format.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use helio_core::{
    downcast_texture, FilterMode, RenderTarget, ResourceId, Texture, TextureDesc, TextureFormat,
    TextureRef,
};
use parking_lot::Mutex;

use crate::device::{BackendKind, BakeDevice, DeviceCapabilities, FilterShader, RenderableFormats};
use crate::filters::{FilterUniforms, DENOISE_KERNEL_SIZE};
use crate::shaders;
use crate::{Error, Result};

/// GPU mirror of `FilterParams` in lightmap_filters.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct GpuFilterParams {
    pixel_offset: [f32; 2],
    sigmas: [f32; 2],
    bz_norm: f32,
    rgbm: u32,
    _pad: [f32; 2],
    kernel: [[f32; 4]; 4],
}

impl From<&FilterUniforms> for GpuFilterParams {
    fn from(uniforms: &FilterUniforms) -> Self {
        let mut kernel = [[0.0; 4]; 4];
        for i in 0..DENOISE_KERNEL_SIZE {
            kernel[i / 4][i % 4] = uniforms.kernel[i];
        }
        Self {
            pixel_offset: uniforms.pixel_offset,
            sigmas: uniforms.sigmas,
            bz_norm: uniforms.bz_norm,
            rgbm: uniforms.rgbm as u32,
            _pad: [0.0; 2],
            kernel,
        }
    }
}

fn to_wgpu_format(format: TextureFormat) -> ::wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => ::wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba16Float => ::wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Rgba32Float => ::wgpu::TextureFormat::Rgba32Float,
        TextureFormat::Depth32Float => ::wgpu::TextureFormat::Depth32Float,
    }
}

#[derive(Debug)]
pub struct WgpuTexture {
    id: ResourceId,
    desc: TextureDesc,
    filter: Mutex<FilterMode>,
    texture: ::wgpu::Texture,
    view: ::wgpu::TextureView,
}

impl WgpuTexture {
    pub fn texture(&self) -> &::wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &::wgpu::TextureView {
        &self.view
    }
}

impl Texture for WgpuTexture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn filter(&self) -> FilterMode {
        *self.filter.lock()
    }

    fn set_filter(&self, filter: FilterMode) {
        // the consuming material owns the sampler
        *self.filter.lock() = filter;
    }
}

pub struct WgpuBakeDevice {
    device: Arc<::wgpu::Device>,
    queue: Arc<::wgpu::Queue>,
    module: ::wgpu::ShaderModule,
    bind_group_layout: ::wgpu::BindGroupLayout,
    pipeline_layout: ::wgpu::PipelineLayout,
    pipelines: HashMap<(FilterShader, ::wgpu::TextureFormat), ::wgpu::RenderPipeline>,
    sampler: ::wgpu::Sampler,
    params: ::wgpu::Buffer,
    markers: Vec<String>,
}

impl WgpuBakeDevice {
    pub fn new(device: Arc<::wgpu::Device>, queue: Arc<::wgpu::Queue>) -> Self {
        let module = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("Lightmap Filters"),
            source: ::wgpu::ShaderSource::Wgsl(shaders::lightmap_filters_source().into()),
        });

        // ── Filter bind group layout (group 0) ────────────────────────────────
        let bind_group_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("Lightmap Filter Layout"),
            entries: &[
                ::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Texture {
                        sample_type: ::wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: ::wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                ::wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                ::wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Buffer {
                        ty: ::wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("Lightmap Filter Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&::wgpu::SamplerDescriptor {
            label: Some("Lightmap Filter Sampler"),
            address_mode_u: ::wgpu::AddressMode::ClampToEdge,
            address_mode_v: ::wgpu::AddressMode::ClampToEdge,
            mag_filter: ::wgpu::FilterMode::Nearest,
            min_filter: ::wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let params = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("Lightmap Filter Params"),
            size: std::mem::size_of::<GpuFilterParams>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!("wgpu bake device ready");

        Self {
            device,
            queue,
            module,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            sampler,
            params,
            markers: Vec::new(),
        }
    }

    fn pipeline(
        &mut self,
        shader: FilterShader,
        format: ::wgpu::TextureFormat,
    ) -> &::wgpu::RenderPipeline {
        let device = &self.device;
        let module = &self.module;
        let layout = &self.pipeline_layout;
        self.pipelines.entry((shader, format)).or_insert_with(|| {
            log::info!("Creating lightmap filter pipeline: {:?} / {:?}", shader, format);
            let entry_point = match shader {
                FilterShader::Dilate => "fs_dilate",
                FilterShader::Denoise => "fs_denoise",
            };
            device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
                label: Some(entry_point),
                layout: Some(layout),
                cache: None,
                vertex: ::wgpu::VertexState {
                    module,
                    entry_point: "vs_fullscreen",
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(::wgpu::FragmentState {
                    module,
                    entry_point,
                    targets: &[Some(::wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: ::wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: ::wgpu::PrimitiveState {
                    topology: ::wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: ::wgpu::MultisampleState::default(),
                multiview: None,
            })
        })
    }

    fn wgpu_texture<'a>(texture: &'a TextureRef, role: &str) -> Result<&'a WgpuTexture> {
        downcast_texture::<WgpuTexture>(texture.as_ref()).ok_or_else(|| {
            Error::Resource(format!(
                "{} texture {} was not created by the wgpu device",
                role,
                texture.name()
            ))
        })
    }
}

impl BakeDevice for WgpuBakeDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        let features = self.device.features();
        let renderable = |format: ::wgpu::TextureFormat| {
            format
                .guaranteed_format_features(features)
                .allowed_usages
                .contains(::wgpu::TextureUsages::RENDER_ATTACHMENT)
        };

        let mut renderable_formats = RenderableFormats::empty();
        renderable_formats.set(
            RenderableFormats::RGBA8,
            renderable(::wgpu::TextureFormat::Rgba8Unorm),
        );
        renderable_formats.set(
            RenderableFormats::RGBA16_FLOAT,
            renderable(::wgpu::TextureFormat::Rgba16Float),
        );
        renderable_formats.set(
            RenderableFormats::RGBA32_FLOAT,
            renderable(::wgpu::TextureFormat::Rgba32Float),
        );

        DeviceCapabilities {
            backend: BackendKind::Wgpu,
            max_texture_size: self.device.limits().max_texture_dimension_2d,
            renderable_formats,
        }
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureRef> {
        let usage = if desc.format.is_depth() {
            ::wgpu::TextureUsages::RENDER_ATTACHMENT | ::wgpu::TextureUsages::TEXTURE_BINDING
        } else {
            ::wgpu::TextureUsages::RENDER_ATTACHMENT
                | ::wgpu::TextureUsages::TEXTURE_BINDING
                | ::wgpu::TextureUsages::COPY_SRC
                | ::wgpu::TextureUsages::COPY_DST
        };

        self.device.push_error_scope(::wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&::wgpu::TextureDescriptor {
            label: Some(&desc.name),
            size: ::wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.layers.max(1),
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: to_wgpu_format(desc.format),
            usage,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Resource(format!("texture {}: {}", desc.name, err)));
        }

        let view_dimension = if desc.layers > 1 {
            ::wgpu::TextureViewDimension::D2Array
        } else {
            ::wgpu::TextureViewDimension::D2
        };
        let view = texture.create_view(&::wgpu::TextureViewDescriptor {
            label: Some(&desc.name),
            dimension: Some(view_dimension),
            ..Default::default()
        });

        log::debug!("Created texture {} ({}x{} {:?})", desc.name, desc.width, desc.height, desc.format);
        Ok(Arc::new(WgpuTexture {
            id: ResourceId::new(),
            filter: Mutex::new(desc.filter),
            desc,
            texture,
            view,
        }))
    }

    fn draw_filter(
        &mut self,
        target: &RenderTarget,
        source: &TextureRef,
        shader: FilterShader,
        uniforms: &FilterUniforms,
    ) -> Result<()> {
        let src = Self::wgpu_texture(source, "source")?;
        let dst = Self::wgpu_texture(target.color_buffer(), "target")?;
        let format = to_wgpu_format(dst.desc.format);

        self.device.push_error_scope(::wgpu::ErrorFilter::Validation);

        let params = GpuFilterParams::from(uniforms);
        self.queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&params));

        let bind_group = self.device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("Lightmap Filter Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                ::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ::wgpu::BindingResource::TextureView(&src.view),
                },
                ::wgpu::BindGroupEntry {
                    binding: 1,
                    resource: ::wgpu::BindingResource::Sampler(&self.sampler),
                },
                ::wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params.as_entire_binding(),
                },
            ],
        });

        let label = self.markers.last().cloned();
        let device = self.device.clone();
        let pipeline = self.pipeline(shader, format);

        let mut encoder = device.create_command_encoder(&::wgpu::CommandEncoderDescriptor {
            label: label.as_deref(),
        });
        {
            let mut pass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some(target.name()),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &dst.view,
                    resolve_target: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color::TRANSPARENT),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(Error::from(err)),
            None => Ok(()),
        }
    }

    fn push_marker(&mut self, label: &str) {
        self.markers.push(label.to_string());
    }

    fn pop_marker(&mut self) {
        self.markers.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_params_match_the_shader_layout() {
        assert_eq!(std::mem::size_of::<GpuFilterParams>(), 96);
    }

    #[test]
    fn kernel_is_packed_four_taps_per_vector() {
        let mut uniforms = crate::LightmapFilters::new();
        uniforms.prepare(8, 8, helio_core::TextureEncoding::Rgbm);
        uniforms.prepare_denoise(10, 0.2);
        let uniforms = uniforms.uniforms();
        let params = GpuFilterParams::from(&uniforms);
        assert_eq!(params.kernel[1][3], uniforms.kernel[7]);
        assert_eq!(params.kernel[3][2], uniforms.kernel[14]);
        assert_eq!(params.kernel[3][3], 0.0);
        assert_eq!(params.rgbm, 1);
    }
}
