//! The frame loop: poll, clear, draw, animate, present, until quit.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{abs::Device, scene::Pipeline, transform};

/// Keys the loop cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformEvent {
    Quit,
    KeyReleased(Key),
    Other,
}

/// The window side of the loop: an event queue and a swap chain.
pub trait Platform {
    /// Returns the next pending event without blocking.
    fn poll_event(&mut self) -> Option<PlatformEvent>;
    /// Shows the frame just drawn. May block until vertical sync.
    fn present(&mut self);
}

/// Seconds since the loop started.
pub trait Clock {
    fn elapsed(&self) -> f64;
}

/// Wall-clock time from a start instant captured once.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// When the model matrix is refreshed relative to the draw call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameOrder {
    /// Draw with last frame's matrix, then compute the next one.
    #[default]
    DrawThenUpdate,
    /// Compute this frame's matrix, then draw with it.
    UpdateThenDraw,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSettings {
    pub background: [f32; 4],
    /// Degrees per second.
    pub rotation_speed: f32,
    pub order: FrameOrder,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            background: [0.0, 0.0, 0.0, 1.0],
            rotation_speed: 180.0,
            order: FrameOrder::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// Summary returned once the loop has finished and released its resources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub elapsed: f64,
}

pub struct FrameLoop<D: Device, C: Clock> {
    pipeline: Pipeline<D>,
    clock: C,
    settings: LoopSettings,
    state: LoopState,
    frames: u64,
}

impl<D: Device, C: Clock> FrameLoop<D, C> {
    pub fn new(pipeline: Pipeline<D>, clock: C, settings: LoopSettings) -> Self {
        Self {
            pipeline,
            clock,
            settings,
            state: LoopState::Running,
            frames: 0,
        }
    }

    /// Runs one iteration. Returns the state after it; once `Terminated`, further
    /// calls do nothing.
    pub fn step<P: Platform>(&mut self, platform: &mut P) -> LoopState {
        if self.state == LoopState::Terminated {
            return self.state;
        }

        while let Some(event) = platform.poll_event() {
            if matches!(
                event,
                PlatformEvent::Quit | PlatformEvent::KeyReleased(Key::Escape)
            ) {
                log::info!("quit requested after {} frames", self.frames);
                self.state = LoopState::Terminated;
                return self.state;
            }
        }

        self.pipeline.clear(self.settings.background);
        match self.settings.order {
            FrameOrder::DrawThenUpdate => {
                self.pipeline.draw();
                self.update();
            }
            FrameOrder::UpdateThenDraw => {
                self.update();
                self.pipeline.draw();
            }
        }
        platform.present();
        self.frames += 1;
        self.state
    }

    fn update(&self) {
        if !self.pipeline.has_transform() {
            return;
        }
        let elapsed = self.clock.elapsed();
        self.pipeline
            .set_model(transform::model_rotation(elapsed, self.settings.rotation_speed));
    }

    /// Steps until a quit request, then releases every device resource of the pipeline.
    pub fn run<P: Platform>(mut self, platform: &mut P) -> FrameStats {
        while self.step(platform) == LoopState::Running {}
        let stats = FrameStats {
            frames: self.frames,
            elapsed: self.clock.elapsed(),
        };
        drop(self);
        log::info!("released device resources");
        stats
    }
}
