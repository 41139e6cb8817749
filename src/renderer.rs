// renderer.rs — 核心渲染器 (内表面球体 + 热点标记 + egui)

use crate::camera::{Camera, CameraUniform};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::hotspot::{MarkerFrame, MarkerGeometry, MarkerInstance};
use crate::mesh::{build_ring, build_sphere, Facing, MeshVertex, SphereMesh};
use crate::tour::MAX_HOTSPOTS_PER_SCENE;
use crate::viewer::RenderSurface;
use image::{Rgba, RgbaImage};
use std::borrow::Cow;
use wgpu::util::DeviceExt;
use winit::window::Window;

const SPHERE_LAT_SEGMENTS: usize = 40;
const SPHERE_LON_SEGMENTS: usize = 60;
const MARKER_SEGMENTS: usize = 16;
const RING_SEGMENTS: usize = 32;

/// Index/vertex buffers for one static mesh.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &SphereMesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// Per-instance marker buffer. Grows when a scene carries more markers
/// than it was sized for.
struct InstanceBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

impl InstanceBuffer {
    fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            buffer: Self::allocate(device, label, capacity),
            capacity,
            count: 0,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity.max(1) * std::mem::size_of::<MarkerInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[MarkerInstance]) {
        if instances.len() > self.capacity {
            self.buffer.destroy();
            self.capacity = instances.len().next_power_of_two();
            self.buffer = Self::allocate(device, self.label, self.capacity);
            log::debug!("{} grown to {}", self.label, self.capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
        self.count = instances.len() as u32;
    }
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    // 背景球
    background_pipeline: wgpu::RenderPipeline,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    panorama_bind_group: wgpu::BindGroup,
    texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    sphere: GpuMesh,

    // 热点标记
    marker_pipeline: wgpu::RenderPipeline,
    marker_bind_group: wgpu::BindGroup,
    marker_mesh: GpuMesh,
    ring_mesh: GpuMesh,
    sphere_instances: InstanceBuffer,
    ring_instances: InstanceBuffer,

    camera_buffer: wgpu::Buffer,
    released: bool,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    // 平面编辑器用的全景图
    panorama_preview: Option<egui::TextureId>,
}

impl Renderer {
    pub async fn new(window: std::sync::Arc<Window>, viewer_config: &ViewerConfig) -> Result<Self, ViewerError> {
        let unavailable = ViewerError::RenderContextUnavailable;

        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .map_err(|e| unavailable(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| unavailable("no compatible GPU adapter".into()))?;
        log::info!("GPU adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default().using_resolution(adapter.limits())
                    },
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| unavailable("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync on
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // --- 1. Texture Setup (占位纹理，加载完成前显示深灰) ---
        let texture = create_panorama_texture(&device, 2, 1);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[26, 26, 26, 255, 26, 26, 26, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(8),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 2,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat, // 全景图水平循环
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // --- 2. Uniform Setup ---
        let camera = Camera::new(
            crate::orientation::OrientationState::with_fov(viewer_config.default_fov),
            config.width,
            config.height,
        );
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera.uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let texture_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry { // Camera Uniform
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry { // Texture
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry { // Sampler
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("texture_bind_group_layout"),
        });

        let panorama_bind_group = create_panorama_bind_group(
            &device,
            &texture_bind_group_layout,
            &camera_buffer,
            &texture,
            &sampler,
        );

        let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("camera_bind_group_layout"),
        });
        let marker_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("marker_bind_group"),
        });

        // --- 3. Pipeline Setup ---
        let background_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/panorama.wgsl"));
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&texture_bind_group_layout],
            push_constant_ranges: &[],
        });
        let background_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&background_layout),
            vertex: wgpu::VertexState {
                module: &background_shader,
                entry_point: "vs_main",
                buffers: &[MeshVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &background_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back), // 只画朝向球心的内表面
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let marker_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/hotspot.wgsl"));
        let marker_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Marker Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });
        let marker_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Marker Pipeline"),
            layout: Some(&marker_layout),
            vertex: wgpu::VertexState {
                module: &marker_shader,
                entry_point: "vs_main",
                buffers: &[MeshVertex::layout(), MarkerInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &marker_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // 圆环双面可见
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None, // 标记始终画在背景之上
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        // --- 4. Geometry ---
        let sphere = GpuMesh::upload(
            &device,
            "Background Sphere",
            &build_sphere(
                viewer_config.sphere_radius as f32,
                SPHERE_LAT_SEGMENTS,
                SPHERE_LON_SEGMENTS,
                Facing::Inward,
            ),
        );
        let geometry = MarkerGeometry::new(viewer_config.sphere_radius, viewer_config.marker_radius_ratio);
        let (ring_inner, ring_outer) = geometry.ring_radii();
        let marker_mesh = GpuMesh::upload(
            &device,
            "Marker Sphere",
            &build_sphere(1.0, MARKER_SEGMENTS, MARKER_SEGMENTS, Facing::Outward),
        );
        let ring_mesh = GpuMesh::upload(
            &device,
            "Marker Ring",
            &build_ring(ring_inner as f32, ring_outer as f32, RING_SEGMENTS),
        );
        let sphere_instances = InstanceBuffer::new(&device, "Marker Sphere Instances", MAX_HOTSPOTS_PER_SCENE);
        let ring_instances = InstanceBuffer::new(&device, "Marker Ring Instances", MAX_HOTSPOTS_PER_SCENE);

        // --- 5. Egui Setup ---
        let egui_ctx = egui::Context::default();

        // 高 DPI：显式设置 pixels_per_point (egui-winit 0.23)
        let mut egui_state = egui_winit::State::new(window.as_ref());
        egui_state.set_pixels_per_point(window.scale_factor() as f32);

        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            background_pipeline,
            texture_bind_group_layout,
            panorama_bind_group,
            texture,
            sampler,
            sphere,
            marker_pipeline,
            marker_bind_group,
            marker_mesh,
            ring_mesh,
            sphere_instances,
            ring_instances,
            camera_buffer,
            released: false,
            egui_ctx,
            egui_state,
            egui_renderer,
            panorama_preview: None,
        })
    }

    /// Re-applies the current surface configuration (after `SurfaceError::Lost`).
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn upload_panorama(&mut self, img: &RgbaImage) {
        // 超过 GPU 纹理尺寸限制时先缩小
        let max_texture_dimension = self.device.limits().max_texture_dimension_2d;
        let (src_w, src_h) = img.dimensions();

        let img: Cow<RgbaImage> = if src_w > max_texture_dimension || src_h > max_texture_dimension {
            let scale = (max_texture_dimension as f32 / src_w.max(src_h) as f32).min(1.0);
            let new_w = ((src_w as f32 * scale) as u32).max(1);
            let new_h = ((src_h as f32 * scale) as u32).max(1);
            log::warn!(
                "panorama {src_w}x{src_h} exceeds GPU limit {max_texture_dimension}, scaled to {new_w}x{new_h}"
            );
            Cow::Owned(image::imageops::resize(
                img,
                new_w,
                new_h,
                image::imageops::FilterType::Lanczos3,
            ))
        } else {
            Cow::Borrowed(img)
        };

        // 非 2:1 图片：补黑到 width/2 高度，原图贴到底部（上方空置）
        let (src_w, src_h) = img.dimensions();
        let target_h = src_w / 2;
        let img: Cow<RgbaImage> = if target_h > 0 && src_h < target_h {
            let mut canvas = RgbaImage::from_pixel(src_w, target_h, Rgba([0, 0, 0, 255]));
            let y_offset = target_h - src_h;
            image::imageops::replace(&mut canvas, &*img, 0, y_offset as i64);
            Cow::Owned(canvas)
        } else {
            img
        };

        let (width, height) = img.dimensions();
        let texture = create_panorama_texture(&self.device, width, height);
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            img.as_raw(),
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

        // 原地替换纹理，旧纹理立即释放
        let old = std::mem::replace(&mut self.texture, texture);
        old.destroy();
        self.panorama_bind_group = create_panorama_bind_group(
            &self.device,
            &self.texture_bind_group_layout,
            &self.camera_buffer,
            &self.texture,
            &self.sampler,
        );
        let view = self.texture.create_view(&wgpu::TextureViewDescriptor::default());
        if let Some(id) = self.panorama_preview.take() {
            self.egui_renderer.free_texture(&id);
        }
        self.panorama_preview =
            Some(self.egui_renderer.register_native_texture(&self.device, &view, wgpu::FilterMode::Linear));
        log::info!("panorama texture {width}x{height} uploaded");
    }

    /// The current panorama as an egui texture, once one has loaded.
    pub fn panorama_preview(&self) -> Option<egui::TextureId> {
        self.panorama_preview
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        if self.released {
            return Ok(());
        }
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // 1. Render Scene
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            render_pass.set_pipeline(&self.background_pipeline);
            render_pass.set_bind_group(0, &self.panorama_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.sphere.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.sphere.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.sphere.index_count, 0, 0..1);

            render_pass.set_pipeline(&self.marker_pipeline);
            render_pass.set_bind_group(0, &self.marker_bind_group, &[]);
            for (mesh, instances) in [
                (&self.ring_mesh, &self.ring_instances),
                (&self.marker_mesh, &self.sphere_instances),
            ] {
                if instances.count == 0 {
                    continue;
                }
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, instances.buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..instances.count);
            }
        }

        // 2. Render UI
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);

        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl RenderSurface for Renderer {
    fn set_camera(&mut self, camera: &Camera) {
        if self.released {
            return;
        }
        let uniform: CameraUniform = camera.uniform();
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    fn set_panorama(&mut self, image: &RgbaImage) {
        if !self.released {
            self.upload_panorama(image);
        }
    }

    fn set_markers(&mut self, frame: &MarkerFrame) {
        if self.released {
            return;
        }
        self.sphere_instances
            .update(&self.device, &self.queue, &frame.spheres);
        self.ring_instances
            .update(&self.device, &self.queue, &frame.rings);
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 && !self.released {
            self.size = winit::dpi::PhysicalSize::new(width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(id) = self.panorama_preview.take() {
            self.egui_renderer.free_texture(&id);
        }
        self.texture.destroy();
        self.camera_buffer.destroy();
        self.sphere.destroy();
        self.marker_mesh.destroy();
        self.ring_mesh.destroy();
        self.sphere_instances.buffer.destroy();
        self.ring_instances.buffer.destroy();
        log::info!("GPU resources released");
    }
}

fn create_panorama_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some("panorama_texture"),
        view_formats: &[],
    })
}

fn create_panorama_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    camera_buffer: &wgpu::Buffer,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("panorama_bind_group"),
    })
}
