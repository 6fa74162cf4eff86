use std::time::{Duration, Instant};

use crate::{motion, renderer::Renderer, session::SessionState};

#[derive(Debug)]
pub struct Clock {
    last_frame: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
        }
    }

    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        delta_time
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct FrameStats {
    frame_count: u32,
    accumulator: Duration,
    fps: u32,
}

impl FrameStats {
    pub fn record(&mut self, dt: Duration) {
        self.accumulator += dt;
        self.frame_count += 1;

        if self.accumulator >= Duration::from_secs_f32(0.1) {
            self.fps = (self.frame_count as f32 / self.accumulator.as_secs_f32()) as u32;
            self.accumulator = Duration::ZERO;
            self.frame_count = 0;
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}

/// Drives one frame: animation, scheduled motions, camera controls, draw.
#[derive(Debug, Default)]
pub struct RenderLoop {
    clock: Clock,
    stats: FrameStats,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, state: &mut SessionState, renderer: &mut dyn Renderer) {
        let dt = self.clock.tick();
        self.tick_with(dt as f32, state, renderer);
    }

    pub fn tick_with(&mut self, dt: f32, state: &mut SessionState, renderer: &mut dyn Renderer) {
        let dt = dt.max(0.0);

        if let Some(player) = state.player.as_mut() {
            for event in player.update(dt) {
                log::debug!("Clip {} finished", event.clip);
            }
        }
        motion::advance_all(&mut state.motions, &mut state.scene, dt);

        if let Some(controls) = state.controls.as_mut() {
            controls.update(&mut state.camera, dt);
        }
        state.camera.update_matrices();

        renderer.render(&state.scene, &state.camera);

        self.stats.record(Duration::from_secs_f32(dt));
    }

    pub fn fps(&self) -> u32 {
        self.stats.fps()
    }
}
