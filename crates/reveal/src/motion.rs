use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Visual properties a reveal animates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub opacity: f32,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl MotionState {
    /// Fully visible at the layout position.
    pub const REST: MotionState = MotionState {
        opacity: 1.0,
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    pub const HIDDEN: MotionState = MotionState {
        opacity: 0.0,
        ..MotionState::REST
    };

    pub fn lerp(&self, to: &MotionState, t: f32) -> MotionState {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        MotionState {
            opacity: mix(self.opacity, to.opacity),
            x: mix(self.x, to.x),
            y: mix(self.y, to.y),
            scale: mix(self.scale, to.scale),
        }
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::REST
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    #[default]
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Maps linear progress in `0..=1` onto eased progress.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Declarative transition from `initial` to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSpec {
    pub initial: MotionState,
    pub target: MotionState,
    pub duration: Duration,
    pub delay: Duration,
    pub easing: Easing,
}

impl MotionSpec {
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(600);

    pub fn new(initial: MotionState, target: MotionState) -> Self {
        Self {
            initial,
            target,
            duration: Self::DEFAULT_DURATION,
            delay: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    pub fn fade() -> Self {
        Self::new(MotionState::HIDDEN, MotionState::REST)
    }

    /// Fades in while rising `offset` units into place.
    pub fn fade_up(offset: f32) -> Self {
        Self::new(
            MotionState {
                y: offset,
                ..MotionState::HIDDEN
            },
            MotionState::REST,
        )
    }

    /// Fades in while sliding horizontally from `offset`.
    pub fn slide_in_x(offset: f32) -> Self {
        Self::new(
            MotionState {
                x: offset,
                ..MotionState::HIDDEN
            },
            MotionState::REST,
        )
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Total time from trigger until the target state is reached.
    pub fn settle_time(&self) -> Duration {
        self.delay + self.duration
    }

    /// Linear progress in `0..=1` at `since_trigger`.
    pub fn progress(&self, since_trigger: Duration) -> f32 {
        let Some(running) = since_trigger.checked_sub(self.delay) else {
            return 0.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        (running.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    /// Visual state `since_trigger` after the animation was started.
    pub fn sample(&self, since_trigger: Duration) -> MotionState {
        let progress = self.progress(since_trigger);
        if progress <= 0.0 {
            return self.initial;
        }
        if progress >= 1.0 {
            return self.target;
        }
        self.initial.lerp(&self.target, self.easing.apply(progress))
    }
}

impl Default for MotionSpec {
    fn default() -> Self {
        Self::fade()
    }
}

#[cfg(test)]
#[path = "tests/motion_tests.rs"]
mod tests;
