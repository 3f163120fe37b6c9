use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{compile_def_database, resolve_app_paths, ContentCompileError, ContentRequest, StartupError};

use super::scene::SceneRunner;
use super::time::FrameClock;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub content_request: ContentRequest,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Questbound".to_string(),
            window_width: 960,
            window_height: 540,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(5),
            content_request: ContentRequest::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to compile content definitions: {0}")]
    Content(#[from] ContentCompileError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        base_content_dir = %app_paths.base_content_dir.display(),
        mods_dir = %app_paths.mods_dir.display(),
        "startup"
    );
    let def_database = compile_def_database(&app_paths, &config.content_request)?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    let mut runner = SceneRunner::new(scene);
    runner.set_def_database(def_database);
    runner.load();
    info!(entity_count = runner.world().entity_count(), "scene_runner_loaded");
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        "loop_config"
    );

    let mut input_collector = InputCollector::new(config.window_width, config.window_height);
    let mut clock = FrameClock::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut loop_stats = LoopStats::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let window_for_loop = Arc::clone(&window);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        input_collector.set_window_size(new_size.width, new_size.height);
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        let is_pressed = event.state == ElementState::Pressed;
                        input_collector.handle_physical_key(event.physical_key, is_pressed);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        accumulator =
                            accumulator.saturating_add(raw_frame_dt.min(max_frame_delta));
                        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                        for _ in 0..step_plan.ticks_to_run {
                            let input_snapshot = input_collector.snapshot_for_tick();
                            let frame = clock.advance(fixed_dt_seconds);
                            match runner.update(frame, &input_snapshot) {
                                SceneCommand::Reload => {
                                    runner.hard_reset();
                                    clock.reset();
                                    info!(
                                        entity_count = runner.world().entity_count(),
                                        "scene_reloaded"
                                    );
                                }
                                SceneCommand::None => {}
                            }
                            loop_stats.record_tick();
                        }
                        accumulator = step_plan.remaining_accumulator;
                        if step_plan.dropped_backlog > Duration::ZERO {
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame, "sim_clamp_triggered"
                            );
                        }

                        if let Err(error) = renderer.render_world(runner.world()) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                        let next_title = runner.debug_title();
                        if next_title != last_applied_title {
                            match &next_title {
                                Some(title) => window_for_loop.set_title(title),
                                None => window_for_loop.set_title(&config.window_title),
                            }
                            last_applied_title = next_title;
                        }

                        loop_stats.record_frame();
                        if let Some((fps, tps)) = loop_stats.maybe_rates(now) {
                            info!(
                                fps,
                                tps,
                                tick = clock.tick_count(),
                                entity_count = runner.world().entity_count(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                runner.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: super::input::ActionStates,
    jump_pressed_edge: bool,
    pickup_pressed_edge: bool,
    advance_pressed_edge: bool,
    reload_key_is_down: bool,
    reload_pressed_edge: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::MoveUp, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveDown, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space) => {
                Self::edge(
                    &mut self.action_states,
                    InputAction::Jump,
                    is_pressed,
                    &mut self.jump_pressed_edge,
                );
            }
            PhysicalKey::Code(KeyCode::KeyE) => {
                Self::edge(
                    &mut self.action_states,
                    InputAction::Pickup,
                    is_pressed,
                    &mut self.pickup_pressed_edge,
                );
            }
            PhysicalKey::Code(KeyCode::Enter) => {
                Self::edge(
                    &mut self.action_states,
                    InputAction::Advance,
                    is_pressed,
                    &mut self.advance_pressed_edge,
                );
            }
            PhysicalKey::Code(KeyCode::F5) => {
                if is_pressed && !self.reload_key_is_down {
                    self.reload_pressed_edge = true;
                }
                self.reload_key_is_down = is_pressed;
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }

    /// Key repeat reports `Pressed` again while held; only the first press counts.
    fn edge(
        states: &mut super::input::ActionStates,
        action: InputAction,
        is_pressed: bool,
        pressed_edge: &mut bool,
    ) {
        if is_pressed && !states.is_down(action) {
            *pressed_edge = true;
        }
        states.set(action, is_pressed);
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.jump_pressed_edge,
            self.pickup_pressed_edge,
            self.advance_pressed_edge,
            self.reload_pressed_edge,
            self.window_width,
            self.window_height,
        );
        self.jump_pressed_edge = false;
        self.pickup_pressed_edge = false;
        self.advance_pressed_edge = false;
        self.reload_pressed_edge = false;
        snapshot
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }
}

#[derive(Debug)]
struct LoopStats {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
}

impl LoopStats {
    fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            frames: 0,
            ticks: 0,
        }
    }

    fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    fn maybe_rates(&mut self, now: Instant) -> Option<(f32, f32)> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let rates = (self.frames as f32 / seconds, self.ticks as f32 / seconds);
        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        Some(rates)
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn movement_keys_are_level_triggered() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyA), true);

        assert!(input.snapshot_for_tick().is_down(InputAction::MoveLeft));
        assert!(input.snapshot_for_tick().is_down(InputAction::MoveLeft));

        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyA), false);
        assert!(!input.snapshot_for_tick().is_down(InputAction::MoveLeft));
    }

    #[test]
    fn jump_press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Space), true);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.jump_pressed());
        assert!(!second.jump_pressed());
    }

    #[test]
    fn held_pickup_key_does_not_repeat() {
        let mut input = InputCollector::default();

        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyE), true);
        assert!(input.snapshot_for_tick().pickup_pressed());
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyE), true);
        assert!(!input.snapshot_for_tick().pickup_pressed());
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyE), false);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyE), true);
        assert!(input.snapshot_for_tick().pickup_pressed());
    }

    #[test]
    fn advance_and_reload_edges_clear_after_snapshot() {
        let mut input = InputCollector::new(960, 540);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Enter), true);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::F5), true);

        let first = input.snapshot_for_tick();
        assert!(first.advance_pressed());
        assert!(first.reload_pressed());
        assert_eq!(first.window_size(), (960, 540));

        let second = input.snapshot_for_tick();
        assert!(!second.advance_pressed());
        assert!(!second.reload_pressed());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn loop_stats_reports_after_interval() {
        let start = Instant::now();
        let mut stats = LoopStats::new(Duration::from_millis(10));
        stats.interval_start = start;
        stats.record_frame();
        stats.record_tick();
        stats.record_tick();

        assert!(stats.maybe_rates(start).is_none());
        let (fps, tps) = stats
            .maybe_rates(start + Duration::from_secs(1))
            .expect("rates");
        assert!((fps - 1.0).abs() < 1e-3);
        assert!((tps - 2.0).abs() < 1e-3);
    }
}
