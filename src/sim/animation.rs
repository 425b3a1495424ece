//! Result animation sequencers
//!
//! Each sequencer advances one `ratio` from 0 to 1 over its duration and
//! derives named sub-ratios from it with [`fit`]. The renderer reads the
//! sub-ratios; the orchestrator reads the "finished" edge from `update`.

use crate::fit;
use crate::settings::Properties;

/// Common timeline behaviour
pub trait ResultSequencer {
    /// Advance by `dt` seconds. Returns true on the tick the timeline ends.
    fn update(&mut self, dt: f32) -> bool;
    fn reset(&mut self);
    fn is_active(&self) -> bool;
    fn ratio(&self) -> f32;
}

/// Shared ratio clock
#[derive(Debug, Clone, Default)]
struct Timeline {
    ratio: f32,
    duration: f32,
    is_active: bool,
}

impl Timeline {
    fn start(&mut self, duration: f32) {
        self.ratio = 0.0;
        self.duration = duration.max(f32::EPSILON);
        self.is_active = true;
    }

    /// Returns true once, when the ratio reaches 1
    fn advance(&mut self, dt: f32) -> bool {
        if !self.is_active {
            return false;
        }
        self.ratio = (self.ratio + dt / self.duration).min(1.0);
        self.ratio >= 1.0
    }
}

/// Sub-ratio windows for one success level
#[derive(Debug, Clone, Copy)]
struct CompleteWindows {
    spawn: (f32, f32),
    floating_cubes: (f32, f32),
    push_down: (f32, f32),
}

const COMPLETE_WINDOWS: [CompleteWindows; 3] = [
    CompleteWindows {
        spawn: (0.0, 0.3),
        floating_cubes: (0.3, 0.3),
        push_down: (0.3, 1.0),
    },
    CompleteWindows {
        spawn: (0.0, 0.2),
        floating_cubes: (0.2, 0.6),
        push_down: (0.6, 1.0),
    },
    CompleteWindows {
        spawn: (0.0, 0.12),
        floating_cubes: (0.12, 0.8),
        push_down: (0.8, 1.0),
    },
];

/// Success / replay celebration, three levels
#[derive(Debug, Clone, Default)]
pub struct CompleteAnimation {
    timeline: Timeline,
    /// Active level (1..=3), the animation style
    pub current_level: Option<u8>,
    pub spawn_ratio: f32,
    pub floating_cubes_ratio: f32,
    pub push_down_ratio: f32,
}

impl CompleteAnimation {
    pub fn start(&mut self, level: u8, properties: &Properties) {
        let level = level.clamp(1, 3);
        self.timeline.start(properties.complete_duration(level));
        self.current_level = Some(level);
        self.derive();
        log::info!(
            "Complete animation level {} started ({:.1}s)",
            level,
            self.timeline.duration
        );
    }

    pub fn duration(&self) -> f32 {
        self.timeline.duration
    }

    fn derive(&mut self) {
        let Some(level) = self.current_level else {
            return;
        };
        let w = COMPLETE_WINDOWS[level as usize - 1];
        let r = self.timeline.ratio;
        self.spawn_ratio = fit(r, w.spawn.0, w.spawn.1, 0.0, 1.0);
        // Level 1 has no floating phase
        self.floating_cubes_ratio = if level == 1 {
            0.0
        } else {
            fit(r, w.floating_cubes.0, w.floating_cubes.1, 0.0, 1.0)
        };
        self.push_down_ratio = fit(r, w.push_down.0, w.push_down.1, 0.0, 1.0);
    }
}

impl ResultSequencer for CompleteAnimation {
    fn update(&mut self, dt: f32) -> bool {
        let finished = self.timeline.advance(dt);
        self.derive();
        if finished {
            log::info!("Complete animation finished");
            self.reset();
        }
        finished
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_active(&self) -> bool {
        self.timeline.is_active
    }

    fn ratio(&self) -> f32 {
        self.timeline.ratio
    }
}

/// Stop: blocks are pushed down and hidden
#[derive(Debug, Clone, Default)]
pub struct StopAnimation {
    timeline: Timeline,
    pub push_down_ratio: f32,
    pub hide_ratio: f32,
}

impl StopAnimation {
    pub fn start(&mut self, properties: &Properties) {
        self.timeline.start(properties.stop_duration);
        self.derive();
        log::info!("Stop animation started");
    }

    fn derive(&mut self) {
        let r = self.timeline.ratio;
        self.push_down_ratio = fit(r, 0.0, 0.6, 0.0, 1.0);
        self.hide_ratio = fit(r, 0.4, 1.0, 0.0, 1.0);
    }
}

impl ResultSequencer for StopAnimation {
    fn update(&mut self, dt: f32) -> bool {
        let finished = self.timeline.advance(dt);
        self.derive();
        if finished {
            log::info!("Stop animation finished");
            self.reset();
        }
        finished
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_active(&self) -> bool {
        self.timeline.is_active
    }

    fn ratio(&self) -> f32 {
        self.timeline.ratio
    }
}

/// Failure: shake, flash the fail colour, drop the board
#[derive(Debug, Clone, Default)]
pub struct ErrorAnimation {
    timeline: Timeline,
    pub shake_ratio: f32,
    pub fail_color_ratio: f32,
    pub fall_ratio: f32,
}

impl ErrorAnimation {
    pub fn start(&mut self, properties: &Properties) {
        self.timeline.start(properties.error_duration);
        self.derive();
        log::info!("Error animation started");
    }

    fn derive(&mut self) {
        let r = self.timeline.ratio;
        self.shake_ratio = fit(r, 0.0, 0.3, 0.0, 1.0);
        self.fail_color_ratio = fit(r, 0.0, 0.1, 0.0, 1.0);
        self.fall_ratio = fit(r, 0.3, 1.0, 0.0, 1.0);
    }
}

impl ResultSequencer for ErrorAnimation {
    fn update(&mut self, dt: f32) -> bool {
        let finished = self.timeline.advance(dt);
        self.derive();
        if finished {
            log::info!("Error animation finished");
            self.reset();
        }
        finished
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_active(&self) -> bool {
        self.timeline.is_active
    }

    fn ratio(&self) -> f32 {
        self.timeline.ratio
    }
}
