//! Hopscotch Engine -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All
//! simulation runs inside `RedrawRequested` using a **fixed-timestep** model
//! (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- consume fixed-dt slices for deterministic
//!      simulation; this frame's discrete input transitions are handed to the
//!      first step only
//!   3. Rebuild the quad mesh from obstacles + actor (+ sensor overlays)
//!   4. Upload camera uniform, issue one draw call, composite egui overlay
//!
//! The simulation core (level, sensors, collision, actor) never touches the
//! window, the GPU, or wall-clock time; everything it needs arrives through
//! `Actor::step(dt, events, obstacles)`. The driver's job is to feed it and
//! draw what comes back.
//!
//! Hot reload: the level JSON is watched via mtime polling and reloaded at
//! fixed-step boundaries (or manually with R). A failed reload logs and keeps
//! the previous level; only the initial load is allowed to abort the process.

mod actor;
mod collision;
mod geometry;
mod level;
#[cfg(test)]
mod replay;
mod sensors;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use actor::{ActionKey, Actor, InputEvent};
use geometry::Rect;
use level::{load_level_from_path, LevelWatcher, ObstacleSet};
use hop_core::input::{InputState, Key};
use hop_core::time::TimeState;
use hop_devtools::{DebugOverlay, OverlayActions, OverlayStats};
use hop_platform::window::PlatformConfig;
use hop_render::{GpuContext, QuadPipeline, QuadVertex, ScreenCamera};

const LEVEL_PATH: &str = "assets/levels/layout.json";
const WORLD_WIDTH: f32 = 800.0;
const WORLD_HEIGHT: f32 = 600.0;

const TILE_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const ACTOR_COLOR: [f32; 4] = [0.1, 0.25, 1.0, 1.0];
// Sensors draw translucent, and only when the F4 overlay is on; they are
// debug probes, not scenery.
const SENSOR_COLOR: [f32; 4] = [1.0, 0.25, 0.25, 0.35];

/// All mutable engine state lives here. Constructed lazily in
/// `ApplicationHandler::resumed` once the window and GPU surface are
/// available.
///
/// Ownership is split into three conceptual groups:
///  - **Core systems** (time, input, camera) -- updated every frame
///  - **Simulation content** (obstacle set, actor) -- loaded from disk,
///    hot-reloadable, mutated only inside fixed steps
///  - **GPU resources** (vertex/index/camera buffers) -- rebuilt when the
///    simulation advanced or content changed
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: ScreenCamera,
    quad_pipeline: QuadPipeline,
    debug_overlay: DebugOverlay,

    // --- Hot-reloadable content -------------------------------------------
    level_path: std::path::PathBuf,
    level_watcher: LevelWatcher,
    obstacles: ObstacleSet,
    actor: Actor,
    // Input transitions not yet delivered to the actor (e.g. pressed while
    // paused). The speed accumulator needs every press matched with its
    // release, so transitions are banked, never dropped.
    queued_events: Vec<InputEvent>,
    show_sensor_debug: bool,
    paused: bool,
    single_step_requested: bool,

    // --- Per-frame GPU mesh state -----------------------------------------
    // The quad mesh is rebuilt on the CPU whenever the simulation advances,
    // then streamed into these buffers. Buffers grow (power-of-two) but
    // never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    index_count: u32,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let time = TimeState::new();
        let input = InputState::new();
        let quad_pipeline = QuadPipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        // The level is required, static input: a malformed file must keep
        // the process from starting.
        let level_path = std::path::PathBuf::from(LEVEL_PATH);
        let level_watcher = LevelWatcher::new(level_path.clone());
        let level = load_level_from_path(&level_path).unwrap_or_else(|err| {
            panic!(
                "Failed to load initial level '{}': {}",
                level_path.display(),
                err
            );
        });
        let (obstacles, spawn) = ObstacleSet::build(&level).unwrap_or_else(|err| {
            panic!("Invalid level '{}': {}", level_path.display(), err);
        });
        if obstacles.is_empty() {
            log::warn!("Level '{}' has no solid tiles", level.level_id);
        }
        log::info!(
            "Level loaded: {} ({}), {} obstacles, spawn at ({}, {})",
            level.level_id,
            level.version,
            obstacles.len(),
            spawn.x,
            spawn.y
        );
        let actor = Actor::spawn_at(spawn);

        let camera = ScreenCamera::new(WORLD_WIDTH, WORLD_HEIGHT);
        let camera_uniform = camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = quad_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            time,
            input,
            camera,
            quad_pipeline,
            debug_overlay,
            level_path,
            level_watcher,
            obstacles,
            actor,
            queued_events: Vec::new(),
            show_sensor_debug: false,
            paused: false,
            single_step_requested: false,
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            index_count: 0,
        };

        state.rebuild_mesh();
        state
    }

    fn reload_level(&mut self, reason: &str) {
        let level = match load_level_from_path(&self.level_path) {
            Ok(level) => level,
            Err(err) => {
                log::error!("Level reload failed ({reason}): {err}");
                return;
            }
        };
        match ObstacleSet::build(&level) {
            Ok((obstacles, spawn)) => {
                self.obstacles = obstacles;
                // The actor keeps its position; only future respawns move.
                self.actor.set_spawn_point(spawn);
                log::info!(
                    "Level reloaded ({reason}): {} ({}), {} obstacles",
                    level.level_id,
                    level.version,
                    self.obstacles.len()
                );
            }
            Err(err) => {
                log::error!("Level reload failed ({reason}): {err}");
            }
        }
    }

    fn build_mesh(&self) -> (Vec<QuadVertex>, Vec<u32>) {
        // Obstacles + actor + up to four sensor probes.
        let quad_estimate = self.obstacles.len() + 5;
        let mut vertices = Vec::with_capacity(quad_estimate * 4);
        let mut indices = Vec::with_capacity(quad_estimate * 6);

        for obstacle in self.obstacles.iter() {
            add_quad(&mut vertices, &mut indices, obstacle, TILE_COLOR);
        }

        add_quad(&mut vertices, &mut indices, self.actor.body(), ACTOR_COLOR);

        if self.show_sensor_debug {
            let rig = self.actor.sensors();
            for probe in [&rig.left, &rig.right, &rig.ceiling, &rig.ground] {
                add_quad(&mut vertices, &mut indices, probe, SENSOR_COLOR);
            }
        }

        (vertices, indices)
    }

    fn rebuild_mesh(&mut self) {
        let (vertices, indices) = self.build_mesh();
        self.ensure_mesh_capacity(vertices.len(), indices.len());
        self.index_count = indices.len() as u32;

        if !vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        if !indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&indices));
        }
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let contacts = self.actor.contacts();
        OverlayStats {
            quad_count: self.index_count / 6,
            obstacle_count: self.obstacles.len() as u32,
            actor_pos: (self.actor.body().x, self.actor.body().y),
            actor_speed: self.actor.speed(),
            phase_label: self.actor.phase().label().to_string(),
            on_ground: contacts.on_ground,
            on_ceiling: contacts.on_ceiling,
            blocked_side: contacts.blocked_side,
            paused: self.paused,
        }
    }

    fn apply_overlay_actions(&mut self, actions: &OverlayActions) -> bool {
        let mut content_changed = false;
        if actions.toggle_pause {
            self.paused = !self.paused;
            log::info!(
                "Simulation {}",
                if self.paused { "PAUSED" } else { "RESUMED" }
            );
        }
        if actions.single_step {
            self.single_step_requested = true;
        }
        if actions.respawn {
            self.actor.respawn();
            content_changed = true;
            log::info!("Actor respawned (overlay)");
        }
        content_changed
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = hop_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(EngineState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                // Fixed-step simulation phase.
                state.time.begin_frame();
                let mut content_changed = false;

                // This frame's input transitions feed the first fixed step
                // only; later steps in the same frame see held state through
                // the actor's speed accumulator.
                let frame_events = collect_input_events(&state.input);
                let mut frame_events_consumed = false;

                while state.time.should_step() {
                    if state.input.is_just_pressed(Key::Escape) {
                        event_loop.exit();
                        return;
                    }
                    if state.input.is_just_pressed(Key::F3) {
                        state.debug_overlay.toggle();
                    }
                    if state.input.is_just_pressed(Key::F4) {
                        state.show_sensor_debug = !state.show_sensor_debug;
                        content_changed = true;
                        log::info!(
                            "Sensor debug: {}",
                            if state.show_sensor_debug { "ON" } else { "OFF" }
                        );
                    }

                    if state.input.is_just_pressed(Key::R) {
                        state.reload_level("manual trigger (R)");
                        content_changed = true;
                    } else if state.level_watcher.should_reload() {
                        state.reload_level("file watcher");
                        content_changed = true;
                    }

                    // Skip simulation when paused (unless single-step requested)
                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;

                    if !frame_events_consumed {
                        state.queued_events.extend_from_slice(&frame_events);
                        frame_events_consumed = true;
                    }
                    let events = std::mem::take(&mut state.queued_events);
                    state
                        .actor
                        .step(state.time.fixed_dt as f32, &events, &state.obstacles);
                }

                // Paused with steps elapsed: the edge flags below get cleared,
                // so bank this frame's transitions for the resume step.
                if !frame_events_consumed && state.time.steps_this_frame > 0 {
                    state.queued_events.extend_from_slice(&frame_events);
                }

                if content_changed || state.time.steps_this_frame > 0 {
                    state.rebuild_mesh();
                }

                // Render phase reads finalized simulation state from this frame.
                let camera_uniform = state.camera.build_uniform();
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[camera_uniform]),
                );

                let Some((output, view)) = state.gpu.begin_frame() else {
                    return;
                };

                let stats = state.overlay_stats();
                let (egui_primitives, egui_textures_delta, overlay_actions) =
                    state
                        .debug_overlay
                        .prepare(&state.window, &state.time, Some(stats));

                if state.apply_overlay_actions(&overlay_actions) {
                    state.rebuild_mesh();
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                {
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Scene Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });

                    render_pass.set_pipeline(&state.quad_pipeline.render_pipeline);
                    render_pass.set_bind_group(0, &state.camera_bind_group, &[]);
                    render_pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..state.index_count, 0, 0..1);
                }

                state.debug_overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();

                    state
                        .debug_overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.debug_overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                // Only clear edge-triggered input (just_pressed / just_released)
                // after at least one fixed step consumed it. Otherwise a press
                // that lands on a frame with 0 simulation steps is silently lost.
                if state.time.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<QuadVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn add_quad(vertices: &mut Vec<QuadVertex>, indices: &mut Vec<u32>, rect: &Rect, color: [f32; 4]) {
    let base_index = vertices.len() as u32;

    vertices.push(QuadVertex {
        position: [rect.left(), rect.top()],
        color,
    });
    vertices.push(QuadVertex {
        position: [rect.right(), rect.top()],
        color,
    });
    vertices.push(QuadVertex {
        position: [rect.right(), rect.bottom()],
        color,
    });
    vertices.push(QuadVertex {
        position: [rect.left(), rect.bottom()],
        color,
    });

    indices.extend_from_slice(&[
        base_index,
        base_index + 1,
        base_index + 2,
        base_index,
        base_index + 2,
        base_index + 3,
    ]);
}

/// Translate this frame's edge transitions into the discrete events the
/// motion state machine consumes. `KeyUp(Jump)` is deliberately absent: the
/// jump is edge-triggered, releases carry no meaning.
fn collect_input_events(input: &InputState) -> Vec<InputEvent> {
    let mut events = Vec::new();
    if input.is_just_pressed(Key::Left) {
        events.push(InputEvent::KeyDown(ActionKey::Left));
    }
    if input.is_just_released(Key::Left) {
        events.push(InputEvent::KeyUp(ActionKey::Left));
    }
    if input.is_just_pressed(Key::Right) {
        events.push(InputEvent::KeyDown(ActionKey::Right));
    }
    if input.is_just_released(Key::Right) {
        events.push(InputEvent::KeyUp(ActionKey::Right));
    }
    if input.is_just_pressed(Key::Jump) {
        events.push(InputEvent::KeyDown(ActionKey::Jump));
    }
    events
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft | KeyCode::KeyA => Some(Key::Left),
        KeyCode::ArrowRight | KeyCode::KeyD => Some(Key::Right),
        KeyCode::Space | KeyCode::KeyW | KeyCode::ArrowUp => Some(Key::Jump),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Hopscotch Engine starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
