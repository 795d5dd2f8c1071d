use bevy::prelude::*;
use serde::{Serialize, Deserialize};
use crate::core::follower_settings::FollowerSettings;

// Progress closer than this to 1 counts as finished.
const COMPLETION_EPSILON: f32 = 1e-4;

#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FollowMode {
    #[default]
    Normal,
    // The target is inside a closed curve and is followed directly.
    InsideClosed,
    Transitioning,
    // Frozen until the target comes back in range.
    OutOfRange,
}

// What the current tick's geometry says about the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSignal {
    Inside,
    Along,
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeStep {
    Stay,
    Enter(FollowMode),
    // Eased.
    Blend(FollowMode),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub start: Vec3,
    pub target: Vec3,
    pub progress: f32,
    pub to: FollowMode,
}

impl Transition {
    pub fn eased_position(&self) -> Vec3 {
        self.start.lerp(self.target, ease_out_quad(self.progress))
    }
}

pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[derive(Debug, Clone, Default)]
pub struct FollowStateMachine {
    mode: FollowMode,
    transition: Option<Transition>,
}

impl FollowStateMachine {
    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    // The mode the follower is in or heading to.
    pub fn settled_mode(&self) -> FollowMode {
        self.transition.map(|transition| transition.to).unwrap_or(self.mode)
    }

    pub fn reset(&mut self, mode: FollowMode) {
        self.mode = mode;
        self.transition = None;
    }

    // Transition table.
    pub fn next_step(&self, signal: ModeSignal) -> ModeStep {
        use FollowMode::*;

        match (self.settled_mode(), signal) {
            (OutOfRange, ModeSignal::OutOfRange) => ModeStep::Stay,
            (_, ModeSignal::OutOfRange) => ModeStep::Enter(OutOfRange),

            (InsideClosed, ModeSignal::Inside) => ModeStep::Stay,
            (_, ModeSignal::Inside) => ModeStep::Blend(InsideClosed),

            (Normal, ModeSignal::Along) => ModeStep::Stay,
            (InsideClosed, ModeSignal::Along) => ModeStep::Blend(Normal),
            (OutOfRange, ModeSignal::Along) => ModeStep::Enter(Normal),

            // A transition always settles on Normal or InsideClosed.
            (Transitioning, ModeSignal::Along) => ModeStep::Enter(Normal),
        }
    }

    pub fn enter(&mut self, mode: FollowMode) {
        self.mode = mode;
        self.transition = None;
    }

    pub fn begin_transition(&mut self, start: Vec3, target: Vec3, to: FollowMode) {
        self.mode = FollowMode::Transitioning;
        self.transition = Some(Transition { start, target, progress: 0.0, to });
    }

    // Replaces the blend target when candidate moved at least min_shift from it.
    pub fn refresh_target(&mut self, candidate: Vec3, min_shift: f32) {
        if let Some(transition) = self.transition.as_mut() {
            if transition.target.distance(candidate) >= min_shift {
                transition.target = candidate;
            }
        }
    }

    pub fn advance(&mut self, delta_time: f32, settings: &FollowerSettings) -> Option<Vec3> {
        let transition = self.transition.as_mut()?;

        let speed = if transition.to == FollowMode::Normal {
            settings.exit_transition_speed_multiplier
        } else {
            1.0
        };
        transition.progress = if settings.transition_duration > 0.0 {
            transition.progress + delta_time * speed / settings.transition_duration
        } else {
            1.0
        };

        if transition.progress >= 1.0 - COMPLETION_EPSILON {
            transition.progress = 1.0;
            let finished = *transition;
            self.mode = finished.to;
            self.transition = None;
            return Some(finished.target);
        }

        Some(transition.eased_position())
    }
}
