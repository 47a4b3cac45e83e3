// Minimal 3D arcade shooter
// Game state lives in a bevy_ecs World (engine::game); this file owns the
// window, the wgpu pipeline and the frame loop.

mod engine;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use glam::{Mat4, Quat, Vec4};
use wgpu::util::DeviceExt;
use winit::{
    event::{Event as WinitEvent, WindowEvent, ElementState, KeyEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::debug_overlay::{ColliderDebugDraw, DebugOverlay, DebugStats};
use engine::error::RenderError;
use engine::input::{Action, InputState, KeyBindings};
use engine::mesh::{GpuVertex, PolyMesh, RenderMesh, triangulate_flat, triangulate_smooth};
use engine::{ColliderKind, Game, GameConfig, RenderInstance};

/// Frames longer than this are simulated as this long (window drags, breakpoints).
const MAX_FRAME_DT: f32 = 0.1;
const MAX_INSTANCES: usize = 4096;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Parser, Debug)]
#[command(about = "Minimal 3D arcade shooter")]
struct Args {
    /// JSON file overriding the default game constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for enemy spawn points (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Log every bullet, enemy and collision event at debug level
    #[arg(long)]
    log_collisions: bool,
}

// ============================================================================
// INSTANCE DATA (per-entity)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,  // One per instance, not per vertex
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn from_render(instance: &RenderInstance) -> Self {
        let hpr = instance.hpr;
        let rotation = Quat::from_rotation_z(hpr.x.to_radians())
            * Quat::from_rotation_x(hpr.y.to_radians())
            * Quat::from_rotation_y(hpr.z.to_radians());
        let model = Mat4::from_scale_rotation_translation(instance.half_extents, rotation, instance.position);
        Self {
            model: model.to_cols_array_2d(),
            color: instance.color.to_array(),
        }
    }
}

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

impl Uniforms {
    fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: Vec4::new(0.4, -0.3, 1.0, 0.0).to_array(),
        }
    }
}

// ============================================================================
// GPU MESHES
// ============================================================================

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &RenderMesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
        }
    }

    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        if instances.is_empty() {
            return;
        }
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// FRAME TIMING
// ============================================================================

/// Rolling one-second frame statistics for the overlay and the FPS log line.
struct FrameTimer {
    window_start: Instant,
    frames: u32,
    sum_ms: f32,
    min_ms: f32,
    max_ms: f32,
    // Last completed window
    fps: u32,
    avg_ms: f32,
    last_min_ms: f32,
    last_max_ms: f32,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            sum_ms: 0.0,
            min_ms: f32::MAX,
            max_ms: 0.0,
            fps: 0,
            avg_ms: 0.0,
            last_min_ms: 0.0,
            last_max_ms: 0.0,
        }
    }

    /// Returns true when a one-second window just closed.
    fn record(&mut self, dt: f32) -> bool {
        let ms = dt * 1000.0;
        self.frames += 1;
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);

        if self.window_start.elapsed().as_secs_f32() < 1.0 {
            return false;
        }
        self.fps = self.frames;
        self.avg_ms = self.sum_ms / self.frames as f32;
        self.last_min_ms = self.min_ms;
        self.last_max_ms = self.max_ms;
        self.window_start = Instant::now();
        self.frames = 0;
        self.sum_ms = 0.0;
        self.min_ms = f32::MAX;
        self.max_ms = 0.0;
        true
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    box_mesh: GpuMesh,
    sphere_mesh: GpuMesh,
    floor_mesh: GpuMesh,
    instance_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    overlay: DebugOverlay,
    show_colliders: bool,

    game: Game,
    input: InputState,
    bindings: KeyBindings,
    timer: FrameTimer,
    last_update: Instant,
}

impl State {
    async fn new(window: Arc<Window>, game: Game) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new(Mat4::IDENTITY)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],  // Vertex + Instance buffers
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let floor = &game.config().floor;
        let box_mesh = GpuMesh::upload(&device, "Box", &triangulate_flat(&PolyMesh::cuboid()));
        let sphere_mesh = GpuMesh::upload(&device, "Sphere", &triangulate_smooth(&PolyMesh::uv_sphere(12, 16)));
        let floor_mesh = GpuMesh::upload(
            &device,
            "Floor",
            &triangulate_flat(&PolyMesh::card(floor.min, floor.max, floor.z)),
        );

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let overlay = DebugOverlay::new(&window, &device, surface_format);
        let mut input = InputState::new();
        input.window_size = (size.width, size.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            box_mesh,
            sphere_mesh,
            floor_mesh,
            instance_buffer,
            uniform_buffer,
            uniform_bind_group,
            overlay,
            show_colliders: false,
            game,
            input,
            bindings: KeyBindings::default(),
            timer: FrameTimer::new(),
            last_update: Instant::now(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        let actions = self.input.actions(&self.bindings);
        if actions.just_pressed(Action::ToggleStats) {
            self.overlay.toggle();
        }
        if actions.just_pressed(Action::ToggleColliders) {
            self.show_colliders = !self.show_colliders;
        }

        self.game.step(&actions, dt.min(MAX_FRAME_DT));

        if self.timer.record(dt) {
            let stats = self.game.stats();
            log::info!(
                "FPS: {} | Entities: {} | Wave: {} | Hits: {}",
                self.timer.fps,
                self.game.entity_count(),
                stats.wave,
                stats.hits
            );
        }
    }

    fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height.max(1) as f32
    }

    fn collider_draws(&self, instances: &[RenderInstance], view_proj: Mat4) -> Vec<ColliderDebugDraw> {
        let scale = self.window.scale_factor() as f32;
        let (w, h) = (self.size.width as f32 / scale, self.size.height as f32 / scale);
        let focal = self.game.camera().projection_matrix(self.aspect()).y_axis.y;

        instances
            .iter()
            .filter_map(|instance| {
                let clip = view_proj * instance.position.extend(1.0);
                if clip.w <= 0.0 {
                    return None;
                }
                let ndc = clip.truncate() / clip.w;
                let color = match instance.kind {
                    ColliderKind::Player => egui::Color32::from_rgb(80, 160, 255),
                    ColliderKind::Bullet => egui::Color32::from_rgb(255, 220, 0),
                    ColliderKind::Hitbox => egui::Color32::from_rgb(255, 80, 80),
                };
                Some(ColliderDebugDraw {
                    pos: egui::pos2((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h),
                    radius_px: instance.bounding_radius * focal * 0.5 * h / clip.w,
                    color,
                })
            })
            .collect()
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Collect instance data from ECS BEFORE creating render pass.
        // Slot 0 is the floor, then boxes, then spheres.
        let instances = self.game.render_instances();
        let mut instance_data = vec![InstanceData {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [0.35, 0.4, 0.35, 1.0],
        }];
        instance_data.extend(
            instances
                .iter()
                .filter(|i| i.kind != ColliderKind::Bullet)
                .map(InstanceData::from_render),
        );
        let box_end = instance_data.len();
        instance_data.extend(
            instances
                .iter()
                .filter(|i| i.kind == ColliderKind::Bullet)
                .map(InstanceData::from_render),
        );
        if instance_data.len() > MAX_INSTANCES {
            log::warn!("{} instances exceed buffer capacity {}, truncating", instance_data.len(), MAX_INSTANCES);
            instance_data.truncate(MAX_INSTANCES);
        }
        let box_end = box_end.min(instance_data.len()) as u32;
        let sphere_end = instance_data.len() as u32;

        self.queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instance_data));

        let view_proj = self.game.camera().view_projection(self.aspect());
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[Uniforms::new(view_proj)]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));  // Instance data

            // One draw call per mesh kind
            self.floor_mesh.draw(&mut render_pass, 0..1);
            self.box_mesh.draw(&mut render_pass, 1..box_end);
            self.sphere_mesh.draw(&mut render_pass, box_end..sphere_end);
        }

        let stats = self.overlay.visible.then(|| {
            let game_stats = self.game.stats();
            let camera = self.game.camera();
            DebugStats {
                fps: self.timer.fps,
                frame_time_avg_ms: self.timer.avg_ms,
                frame_time_min_ms: self.timer.last_min_ms,
                frame_time_max_ms: self.timer.last_max_ms,
                entity_count: instances.len(),
                bullet_count: instances.iter().filter(|i| i.kind == ColliderKind::Bullet).count(),
                enemy_count: instances.iter().filter(|i| i.kind == ColliderKind::Hitbox).count(),
                wave: game_stats.wave,
                hits: game_stats.hits,
                bullets_fired: game_stats.bullets_fired,
                draw_calls: 3,
                resolution: (self.size.width, self.size.height),
                camera_position: camera.position.into(),
                camera_hpr: camera.hpr.into(),
                collisions: self.game.collisions().len(),
            }
        });
        let collider_draws = self
            .show_colliders
            .then(|| self.collider_draws(&instances, view_proj));

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            stats.as_ref(),
            collider_draws.as_deref(),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.log_collisions { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading game config from {}", path.display()))?,
        None => GameConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let game = Game::new(config, seed).context("invalid game config")?;

    let event_loop = EventLoop::new().context("creating event loop")?;

    let window_attributes = Window::default_attributes()
        .with_title("Skirmish")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes).context("creating window")?);

    let mut state = pollster::block_on(State::new(window.clone(), game)).context("initialising renderer")?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                if !response.consumed {
                    state.input.process_event(event);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory, exiting");
                                control_flow.exit();
                            }
                            Err(e) => log::warn!("surface error: {:?}", e),
                        }
                        state.input.end_frame();
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
