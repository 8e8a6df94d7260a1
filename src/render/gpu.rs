//! wgpu backend for the mask renderer.
//!
//! Renders the scene into an offscreen canvas-sized target on every
//! submission; the UI blits that target into its viewport through a paint
//! callback holding a [`GpuTarget`].

use std::path::PathBuf;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use eframe::wgpu;
use glam::Mat4;

use super::accessory_mesh::AccessoryModel;
use super::{MaskTexture, RenderBackend, SceneView};
use crate::error::RenderError;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Interleaved accessory vertex.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct AccessoryVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

impl AccessoryVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Mask vertex streams live in separate buffers: positions and normals are
/// rewritten per frame, UVs are written once.
fn mask_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
    const NORMAL: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
    const UV: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

    let stream = |stride: usize, attributes: &'static [wgpu::VertexAttribute]| {
        wgpu::VertexBufferLayout {
            array_stride: (stride * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    };
    [stream(3, &POSITION), stream(3, &NORMAL), stream(2, &UV)]
}

/// Uniform buffer layout matching the shader.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
    specular: [f32; 4],
    base_color: [f32; 4],
}

impl Uniforms {
    fn new(scene: &SceneView<'_>, model: Mat4, base_color: [f32; 4]) -> Self {
        let lights = scene.lights;
        let material = scene.material;
        let [sr, sg, sb] = material.specular;
        Self {
            view_proj: scene.camera.view_projection().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            light_dir: lights
                .directional
                .direction
                .extend(lights.directional.intensity)
                .to_array(),
            light_color: extend(lights.directional.color, 1.0),
            sky_color: extend(lights.hemisphere.sky_color, lights.hemisphere.intensity),
            ground_color: extend(lights.hemisphere.ground_color, 1.0),
            specular: [sr, sg, sb, material.shininess],
            base_color,
        }
    }
}

fn extend(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

/// Offscreen render target plus the blit pipeline that presents it.
/// Shared between the backend and the UI paint callback.
pub struct GpuTarget {
    _color: wgpu::Texture,
    _depth: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group: wgpu::BindGroup,
    size: [u32; 2],
}

impl GpuTarget {
    fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("facepaint_blit_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("facepaint_blit_bgl"),
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

        let blit_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("facepaint_blit_pl"),
                bind_group_layouts: &[&blit_bind_group_layout],
                push_constant_ranges: &[],
            });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("facepaint_blit_pipeline"),
            layout: Some(&blit_pipeline_layout),
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
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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

        let (color, color_view) = create_texture(
            device,
            "facepaint_offscreen_color",
            width,
            height,
            OFFSCREEN_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let (depth, depth_view) = create_texture(
            device,
            "facepaint_offscreen_depth",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let sampler = linear_sampler(device);
        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("facepaint_blit_bg"),
            layout: &blit_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            _color: color,
            _depth: depth,
            color_view,
            depth_view,
            blit_pipeline,
            blit_bind_group,
            size: [width, height],
        }
    }

    /// Canvas size in pixels
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Draw the offscreen canvas into the current render pass.
    pub fn blit(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, &self.blit_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

/// One accessory primitive's GPU resources.
struct AccessoryDraw {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    num_indices: u32,
    base_color: [f32; 4],
}

/// Scene resources created in `init`.
struct SceneResources {
    mask_pipeline: wgpu::RenderPipeline,
    accessory_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    position_buffer: wgpu::Buffer,
    normal_buffer: wgpu::Buffer,
    uv_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    mask_uniforms: wgpu::Buffer,
    mask_bind_group: wgpu::BindGroup,
    /// Bound until the first mask texture arrives; also used by accessory draws
    _white: wgpu::Texture,
    white_view: wgpu::TextureView,
    _mask_texture: Option<wgpu::Texture>,
    texture_version: u64,
    accessory: Vec<AccessoryDraw>,
}

pub struct GpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target: Arc<GpuTarget>,
    accessory_path: Option<PathBuf>,
    scene: Option<SceneResources>,
    /// Clear the target on the next submission
    clear_pending: bool,
}

impl GpuBackend {
    pub fn new(
        render_state: &eframe::egui_wgpu::RenderState,
        width: u32,
        height: u32,
        accessory_path: Option<PathBuf>,
    ) -> Self {
        let target = GpuTarget::new(&render_state.device, render_state.target_format, width, height);
        Self {
            device: render_state.device.clone(),
            queue: render_state.queue.clone(),
            target: Arc::new(target),
            accessory_path,
            scene: None,
            clear_pending: true,
        }
    }

    /// Handle for the viewport paint callback
    pub fn target(&self) -> Arc<GpuTarget> {
        self.target.clone()
    }

    fn create_scene(&self, scene: &SceneView<'_>) -> Result<SceneResources, RenderError> {
        let device = &*self.device;
        let queue = &*self.queue;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("facepaint_scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("facepaint_scene_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("facepaint_scene_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let material = scene.material;
        let mask_layouts = mask_layouts();
        let mask_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("facepaint_mask_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &mask_layouts,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_mask"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OFFSCREEN_FORMAT,
                    blend: material.transparent.then_some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // The canvas camera mirrors X, so winding is not meaningful
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: material.depth_write,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: material.polygon_offset_units as i32,
                    slope_scale: 0.0,
                    clamp: 0.0,
                },
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let accessory_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("facepaint_accessory_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[AccessoryVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_accessory"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OFFSCREEN_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let mesh = scene.mesh;
        let position_buffer = vertex_buffer(device, "facepaint_positions", mesh.positions().len());
        let normal_buffer = vertex_buffer(device, "facepaint_normals", mesh.normals().len());
        let uv_buffer = vertex_buffer(device, "facepaint_uvs", mesh.uvs().len());
        queue.write_buffer(&position_buffer, 0, bytemuck::cast_slice(mesh.positions()));
        queue.write_buffer(&normal_buffer, 0, bytemuck::cast_slice(mesh.normals()));
        queue.write_buffer(&uv_buffer, 0, bytemuck::cast_slice(mesh.uvs()));

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("facepaint_indices"),
            size: std::mem::size_of_val(mesh.indices()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(mesh.indices()));

        let sampler = linear_sampler(device);
        let (white, white_view) = upload_texture(device, queue, 1, 1, &[255; 4]);
        let mask_uniforms = uniform_buffer(device, "facepaint_mask_uniforms");
        let mask_bind_group =
            scene_bind_group(device, &bind_group_layout, &mask_uniforms, &white_view, &sampler);

        let mut resources = SceneResources {
            mask_pipeline,
            accessory_pipeline,
            bind_group_layout,
            sampler,
            position_buffer,
            normal_buffer,
            uv_buffer,
            index_buffer,
            num_indices: mesh.indices().len() as u32,
            mask_uniforms,
            mask_bind_group,
            _white: white,
            white_view,
            _mask_texture: None,
            texture_version: 0,
            accessory: Vec::new(),
        };

        if let Some(path) = &self.accessory_path {
            let model = AccessoryModel::load(path)?;
            resources.accessory = self.create_accessory_draws(&resources, &model);
        }

        Ok(resources)
    }

    fn create_accessory_draws(
        &self,
        resources: &SceneResources,
        model: &AccessoryModel,
    ) -> Vec<AccessoryDraw> {
        let device = &*self.device;
        let queue = &*self.queue;

        model
            .primitives
            .iter()
            .enumerate()
            .map(|(i, prim)| {
                let vertices: Vec<AccessoryVertex> = prim
                    .positions
                    .iter()
                    .zip(prim.normals.iter())
                    .map(|(p, n)| AccessoryVertex {
                        position: p.to_array(),
                        normal: n.to_array(),
                        uv: [0.0; 2],
                    })
                    .collect();

                let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("facepaint_accessory_vb_{}", i)),
                    size: std::mem::size_of_val(vertices.as_slice()) as u64,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&vertices));

                let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("facepaint_accessory_ib_{}", i)),
                    size: std::mem::size_of_val(prim.indices.as_slice()) as u64,
                    usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&prim.indices));

                let uniform_buffer = uniform_buffer(device, "facepaint_accessory_uniforms");
                let bind_group = scene_bind_group(
                    device,
                    &resources.bind_group_layout,
                    &uniform_buffer,
                    &resources.white_view,
                    &resources.sampler,
                );

                AccessoryDraw {
                    vertex_buffer,
                    index_buffer,
                    uniform_buffer,
                    bind_group,
                    num_indices: prim.indices.len() as u32,
                    base_color: prim.base_color,
                }
            })
            .collect()
    }

    fn bind_mask_texture(&self, resources: &mut SceneResources, texture: &MaskTexture) {
        let (tex, view) = upload_texture(
            &self.device,
            &self.queue,
            texture.width,
            texture.height,
            &texture.pixels,
        );
        resources.mask_bind_group = scene_bind_group(
            &self.device,
            &resources.bind_group_layout,
            &resources.mask_uniforms,
            &view,
            &resources.sampler,
        );
        resources._mask_texture = Some(tex);
        tracing::debug!(
            "Uploaded mask texture {} ({}x{})",
            texture.path.display(),
            texture.width,
            texture.height
        );
    }
}

impl RenderBackend for GpuBackend {
    fn init(&mut self, scene: &SceneView<'_>) -> Result<(), RenderError> {
        let resources = match self.create_scene(scene) {
            Ok(resources) => resources,
            Err(RenderError::AccessoryModel(e)) => {
                tracing::warn!("Accessory model unavailable: {}", e);
                self.accessory_path = None;
                self.create_scene(scene)?
            }
            Err(e) => return Err(e),
        };
        tracing::info!(
            "GPU renderer ready: {}x{} canvas, {} indices",
            self.target.size[0],
            self.target.size[1],
            resources.num_indices
        );
        self.scene = Some(resources);
        Ok(())
    }

    fn begin_frame(&mut self) {
        self.clear_pending = true;
    }

    fn render(&mut self, scene: &SceneView<'_>) -> Result<(), RenderError> {
        let mut resources = self
            .scene
            .take()
            .ok_or_else(|| RenderError::Backend("render before init".to_string()))?;

        if scene.material.texture_version != resources.texture_version {
            if let Some(texture) = &scene.material.texture {
                self.bind_mask_texture(&mut resources, texture);
            }
            resources.texture_version = scene.material.texture_version;
        }

        let queue = &*self.queue;
        if scene.mesh.positions_dirty() {
            queue.write_buffer(
                &resources.position_buffer,
                0,
                bytemuck::cast_slice(scene.mesh.positions()),
            );
            queue.write_buffer(
                &resources.normal_buffer,
                0,
                bytemuck::cast_slice(scene.mesh.normals()),
            );
        }

        let mask_uniforms = Uniforms::new(scene, Mat4::IDENTITY, [1.0; 4]);
        queue.write_buffer(&resources.mask_uniforms, 0, bytemuck::bytes_of(&mask_uniforms));

        let accessory_matrix = scene.accessory.map(|a| a.matrix());
        if let Some(matrix) = accessory_matrix {
            for draw in &resources.accessory {
                let uniforms = Uniforms::new(scene, matrix, draw.base_color);
                queue.write_buffer(&draw.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
        }

        let (color_load, depth_load) = if std::mem::take(&mut self.clear_pending) {
            (wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT), wgpu::LoadOp::Clear(1.0))
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("facepaint_offscreen_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("facepaint_offscreen_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            // Mask first, accessory composited over it
            pass.set_pipeline(&resources.mask_pipeline);
            pass.set_bind_group(0, &resources.mask_bind_group, &[]);
            pass.set_vertex_buffer(0, resources.position_buffer.slice(..));
            pass.set_vertex_buffer(1, resources.normal_buffer.slice(..));
            pass.set_vertex_buffer(2, resources.uv_buffer.slice(..));
            pass.set_index_buffer(resources.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..resources.num_indices, 0, 0..1);

            if accessory_matrix.is_some() {
                pass.set_pipeline(&resources.accessory_pipeline);
                for draw in &resources.accessory {
                    pass.set_bind_group(0, &draw.bind_group, &[]);
                    pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                    pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..draw.num_indices, 0, 0..1);
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        self.scene = Some(resources);
        Ok(())
    }

    fn teardown(&mut self) {
        if self.scene.take().is_some() {
            tracing::info!("GPU renderer released");
        }
    }
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    (texture, view)
}

/// Upload RGBA8 sRGB pixels as a sampled texture.
fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> (wgpu::Texture, wgpu::TextureView) {
    let (texture, view) = create_texture(
        device,
        "facepaint_mask_texture",
        width,
        height,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    );
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
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
    (texture, view)
}

fn linear_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("facepaint_sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

fn vertex_buffer(device: &wgpu::Device, label: &str, floats: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (floats * std::mem::size_of::<f32>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn uniform_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<Uniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn scene_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    texture_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("facepaint_scene_bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
