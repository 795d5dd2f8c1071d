use std::sync::Arc;
use bevy::log::{debug, info};
use bevy::math::Vec3;
use crate::core::curve::{FollowCurve, TrackedTarget};
use crate::core::follower_error::FollowerError;
use crate::core::follower_settings::FollowerSettings;
use crate::following::direction_lock::{is_equidistant, DirectionLock};
use crate::following::sleep_controller::{SleepController, SleepDecision};
use crate::following::state_machine::{FollowMode, FollowStateMachine, ModeSignal, ModeStep};
use crate::following::warning_latch::WarningLatch;
use crate::sampling::curve_sampler::{
    apply_offset, find_closest_param, is_degenerate_tangent, point_in_polygon_xz, polygon_area_xz, sample_polygon,
};

// Closed curves with less projected area than this have no usable interior.
const MIN_INTERIOR_AREA: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    // A binding or the settings are unusable; nothing changed.
    Halted(FollowerError),
    Throttled,
    Sleeping,
    // Out of range; the position is held.
    Frozen,
    Moved,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowerState {
    pub curve_param: f32,
    pub world_position: Vec3,
    pub offset_current: Vec3,
    pub offset_target: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowerSnapshot {
    pub mode: FollowMode,
    pub world_position: Vec3,
    pub curve_param: f32,
    pub sleeping: bool,
    pub direction_sign: f32,
    pub transition_progress: Option<f32>,
    pub target_position: Option<Vec3>,
    pub curve_closed: bool,
    pub curve_points: Vec<Vec3>,
}

#[derive(Debug, Clone, Default)]
struct UpdateThrottle {
    accumulated: f32,
}

impl UpdateThrottle {
    // Returns the time to simulate once the interval has elapsed.
    fn consume(&mut self, delta_time: f32, interval: Option<f32>) -> Option<f32> {
        let Some(interval) = interval else {
            self.accumulated = 0.0;
            return Some(delta_time);
        };

        self.accumulated += delta_time;
        if self.accumulated + f32::EPSILON < interval {
            return None;
        }
        Some(std::mem::take(&mut self.accumulated))
    }
}

// Per tick: sleep gate, classification, mode transition, position write.
pub struct PositionFollower {
    curve: Option<Arc<dyn FollowCurve>>,
    target: Option<Arc<dyn TrackedTarget>>,
    settings: FollowerSettings,
    settings_error: Option<FollowerError>,
    state: FollowerState,
    sleep: SleepController,
    direction: DirectionLock,
    machine: FollowStateMachine,
    throttle: UpdateThrottle,
    warnings: WarningLatch,
    clock: f32,
    resnap_pending: bool,
}

impl Default for PositionFollower {
    fn default() -> Self {
        PositionFollower::new()
    }
}

impl PositionFollower {
    pub fn new() -> Self {
        let settings = FollowerSettings::default();
        PositionFollower {
            curve: None,
            target: None,
            state: FollowerState {
                offset_current: settings.position_offset,
                offset_target: settings.position_offset,
                ..Default::default()
            },
            settings_error: settings.validate().err(),
            settings,
            sleep: SleepController::default(),
            direction: DirectionLock::default(),
            machine: FollowStateMachine::default(),
            throttle: UpdateThrottle::default(),
            warnings: WarningLatch::default(),
            clock: 0.0,
            resnap_pending: false,
        }
    }

    pub fn with_curve(curve: Arc<dyn FollowCurve>, settings: FollowerSettings) -> Self {
        let mut follower = PositionFollower::new();
        follower.initialize(curve, settings);
        follower
    }

    pub fn initialize(&mut self, curve: Arc<dyn FollowCurve>, settings: FollowerSettings) {
        self.curve = Some(curve);
        self.state = FollowerState {
            offset_current: settings.position_offset,
            offset_target: settings.position_offset,
            ..Default::default()
        };
        self.sleep.reset();
        self.direction.reset(None);
        self.machine.reset(FollowMode::Normal);
        self.throttle = UpdateThrottle::default();
        self.warnings.clear_all();
        self.clock = 0.0;
        self.set_settings(settings);

        if self.target.is_some() {
            self.restart_following();
        }
    }

    // The first binding snaps onto the curve. Later ones re-derive the curve parameter from the
    // new target but keep the position, so the follower smooths towards it.
    pub fn set_target(&mut self, target: Arc<dyn TrackedTarget>) {
        let first_binding = self.target.is_none();
        self.target = Some(target);
        self.warnings.clear(&FollowerError::MissingTarget);
        self.discard_history();

        if first_binding {
            self.restart_following();
        } else {
            self.reanchor_param();
        }
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.discard_history();
    }

    // Deferred to the next tick when the curve or target is not bound yet.
    pub fn restart_following(&mut self) {
        match (self.curve.clone(), self.target.clone()) {
            (Some(curve), Some(target)) => {
                self.resnap_pending = false;
                self.snap(curve.as_ref(), target.current_position());
            }
            _ => self.resnap_pending = true,
        }
    }

    // Snaps on the next processed tick instead.
    pub fn request_restart(&mut self) {
        self.resnap_pending = true;
    }

    pub fn set_settings(&mut self, settings: FollowerSettings) {
        self.settings_error = settings.validate().err();
        match &self.settings_error {
            Some(error) => debug!("[CurveFollow] rejected settings: {}", error),
            None => self.warnings.clear(&FollowerError::InvalidConfiguration(String::new())),
        }
        self.state.offset_target = settings.position_offset;
        self.settings = settings;
    }

    pub fn set_position_offset(&mut self, offset: Vec3) {
        self.settings.position_offset = offset;
        self.state.offset_target = offset;
    }

    pub fn tick(&mut self, delta_time: f32) -> TickOutcome {
        self.clock += delta_time;

        let (curve, target) = match self.bindings() {
            Ok(bindings) => bindings,
            Err(error) => return self.halt(error),
        };
        if let Some(error) = self.settings_error.clone() {
            return self.halt(error);
        }

        let Some(delta_time) = self.throttle.consume(delta_time, self.settings.update_interval()) else {
            return TickOutcome::Throttled;
        };

        let curve = curve.as_ref();
        let target_position = target.current_position();

        if self.resnap_pending {
            self.resnap_pending = false;
            self.snap(curve, target_position);
            return TickOutcome::Moved;
        }

        let was_sleeping = self.sleep.is_sleeping();
        let distance = match self.sleep.evaluate(curve, target_position, self.clock, &self.settings) {
            SleepDecision::Asleep => return TickOutcome::Sleeping,
            SleepDecision::Awake { distance } => distance,
        };
        if was_sleeping {
            self.direction.reset(None);
        }

        let signal = self.classify(curve, target_position, distance);
        self.apply_signal(curve, target_position, signal);

        let outcome = match self.machine.mode() {
            FollowMode::Normal => {
                self.follow_curve(curve, target_position, delta_time);
                TickOutcome::Moved
            }
            FollowMode::InsideClosed => {
                self.follow_inside(target_position, delta_time);
                TickOutcome::Moved
            }
            FollowMode::Transitioning => {
                self.follow_transition(curve, target_position, delta_time);
                TickOutcome::Moved
            }
            FollowMode::OutOfRange => TickOutcome::Frozen,
        };

        self.smooth_offset(delta_time);
        outcome
    }

    pub fn world_position(&self) -> Vec3 {
        self.state.world_position
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep.is_sleeping()
    }

    pub fn current_mode(&self) -> FollowMode {
        self.machine.mode()
    }

    pub fn curve_param(&self) -> f32 {
        self.state.curve_param
    }

    pub fn direction_sign(&self) -> f32 {
        self.direction.direction_sign()
    }

    pub fn state(&self) -> &FollowerState {
        &self.state
    }

    pub fn settings(&self) -> &FollowerSettings {
        &self.settings
    }

    pub fn settings_error(&self) -> Option<&FollowerError> {
        self.settings_error.as_ref()
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    // Simulated seconds seen by this follower.
    pub fn elapsed(&self) -> f32 {
        self.clock
    }

    // curve_samples + 1 curve positions are included for drawing.
    pub fn snapshot(&self, curve_samples: usize) -> FollowerSnapshot {
        let samples = curve_samples.max(1);
        let curve_points = self
            .curve
            .as_ref()
            .map(|curve| {
                (0..=samples)
                    .map(|i| curve.position_at(i as f32 / samples as f32))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        FollowerSnapshot {
            mode: self.machine.mode(),
            world_position: self.state.world_position,
            curve_param: self.state.curve_param,
            sleeping: self.sleep.is_sleeping(),
            direction_sign: self.direction.direction_sign(),
            transition_progress: self.machine.transition().map(|transition| transition.progress),
            target_position: self.target.as_ref().map(|target| target.current_position()),
            curve_closed: self.curve.as_ref().map(|curve| curve.is_closed()).unwrap_or(false),
            curve_points,
        }
    }

    fn bindings(&self) -> Result<(Arc<dyn FollowCurve>, Arc<dyn TrackedTarget>), FollowerError> {
        let curve = self.curve.clone().ok_or(FollowerError::MissingCurve)?;
        let target = self.target.clone().ok_or(FollowerError::MissingTarget)?;
        Ok((curve, target))
    }

    fn halt(&mut self, error: FollowerError) -> TickOutcome {
        self.warnings.warn_once(&error);
        TickOutcome::Halted(error)
    }

    // In-flight blends and travel direction refer to the previous target.
    fn discard_history(&mut self) {
        let settled = self.machine.settled_mode();
        self.machine.reset(settled);
        self.direction.reset(None);
    }

    fn reanchor_param(&mut self) {
        if let (Some(curve), Some(target)) = (self.curve.clone(), self.target.clone()) {
            let param = find_closest_param(curve.as_ref(), target.current_position(), self.settings.closest_point_samples);
            self.state.curve_param = param;
            self.direction.reset(Some(param));
        }
    }

    fn snap(&mut self, curve: &dyn FollowCurve, target: Vec3) {
        let param = find_closest_param(curve, target, self.settings.closest_point_samples);
        self.state.curve_param = param;
        self.direction.reset(Some(param));
        self.sleep.reset();

        if curve.is_closed() && self.is_inside(curve, target) {
            self.machine.reset(FollowMode::InsideClosed);
            self.state.world_position = target + self.state.offset_current;
        } else {
            self.machine.reset(FollowMode::Normal);
            self.state.world_position = self.curve_point(curve, param);
        }
        info!("[CurveFollow] snapped to t={:.3} in {:?}", param, self.machine.mode());
    }

    fn classify(&mut self, curve: &dyn FollowCurve, target: Vec3, distance: f32) -> ModeSignal {
        if curve.is_closed() {
            if self.is_inside(curve, target) {
                ModeSignal::Inside
            } else if self.settings.only_track_inside_closed {
                ModeSignal::OutOfRange
            } else {
                ModeSignal::Along
            }
        } else if distance > self.settings.proximity_threshold {
            ModeSignal::OutOfRange
        } else {
            ModeSignal::Along
        }
    }

    fn apply_signal(&mut self, curve: &dyn FollowCurve, target: Vec3, signal: ModeSignal) {
        match self.machine.next_step(signal) {
            ModeStep::Stay => {}
            ModeStep::Enter(mode) => {
                debug!("[CurveFollow] {:?} -> {:?}", self.machine.mode(), mode);
                self.machine.enter(mode);
                if mode == FollowMode::Normal {
                    self.direction.reset(None);
                }
            }
            ModeStep::Blend(to) => {
                debug!("[CurveFollow] {:?} -> Transitioning({:?})", self.machine.mode(), to);
                let destination = match to {
                    FollowMode::InsideClosed => target + self.state.offset_current,
                    _ => {
                        let param = find_closest_param(curve, target, self.settings.closest_point_samples);
                        self.curve_point(curve, param)
                    }
                };
                self.machine.begin_transition(self.state.world_position, destination, to);
            }
        }
    }

    fn follow_curve(&mut self, curve: &dyn FollowCurve, target: Vec3, delta_time: f32) {
        let raw = find_closest_param(curve, target, self.settings.closest_point_samples);
        let ambiguous = curve.is_closed() && {
            let closest = curve.position_at(raw).distance(target);
            is_equidistant(curve, target, raw, closest, self.settings.equidistant_threshold)
        };
        let param = self.direction.resolve(raw, ambiguous, delta_time, self.clock, &self.settings);
        self.state.curve_param = param;

        let desired = self.curve_point(curve, param);
        let blend = (self.settings.movement_speed * delta_time).min(1.0) * (1.0 - self.settings.smoothing);
        self.state.world_position = self.state.world_position.lerp(desired, blend);
    }

    fn follow_inside(&mut self, target: Vec3, delta_time: f32) {
        let desired = target + self.state.offset_current;
        self.state.world_position = if self.settings.direct_follow_inside_closed {
            desired
        } else {
            self.state.world_position.lerp(desired, (self.settings.movement_speed * delta_time).min(1.0))
        };
    }

    fn follow_transition(&mut self, curve: &dyn FollowCurve, target: Vec3, delta_time: f32) {
        let Some(to) = self.machine.transition().map(|transition| transition.to) else {
            return;
        };

        let mut exit_param = None;
        if to == FollowMode::Normal {
            let param = find_closest_param(curve, target, self.settings.closest_point_samples);
            let candidate = self.curve_point(curve, param);
            self.machine.refresh_target(candidate, self.settings.proximity_threshold * 0.5);
            exit_param = Some(param);
        } else {
            self.machine.refresh_target(target + self.state.offset_current, 0.0);
        }

        if let Some(position) = self.machine.advance(delta_time, &self.settings) {
            self.state.world_position = position;
        }

        if let (FollowMode::Normal, Some(param)) = (self.machine.mode(), exit_param) {
            self.state.curve_param = param;
            self.direction.reset(Some(param));
        }
    }

    fn smooth_offset(&mut self, delta_time: f32) {
        let rate = (self.settings.offset_transition_speed * delta_time).min(1.0);
        self.state.offset_current = self.state.offset_current.lerp(self.state.offset_target, rate);
    }

    fn is_inside(&mut self, curve: &dyn FollowCurve, target: Vec3) -> bool {
        let polygon = sample_polygon(curve, self.settings.interior_samples);
        if polygon_area_xz(&polygon).abs() < MIN_INTERIOR_AREA {
            self.warnings.warn_once(&FollowerError::DegenerateGeometry(
                "closed curve encloses no area when seen from above".to_string(),
            ));
            return false;
        }
        point_in_polygon_xz(&polygon, target)
    }

    fn curve_point(&mut self, curve: &dyn FollowCurve, param: f32) -> Vec3 {
        let tangent = curve.tangent_at(param);
        if is_degenerate_tangent(tangent) {
            self.warnings.warn_once(&FollowerError::DegenerateGeometry(
                format!("zero-length tangent at t={:.3}", param),
            ));
        }
        apply_offset(curve.position_at(param), tangent, self.state.offset_current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::utils::default;
    use crate::core::curve::TargetCell;
    use crate::core::paths::PathPolyline;

    fn line() -> Arc<dyn FollowCurve> {
        Arc::new(PathPolyline::open(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]))
    }

    #[test]
    fn throttle_releases_the_accumulated_time() {
        let mut throttle = UpdateThrottle::default();

        assert_eq!(throttle.consume(0.04, Some(0.1)), None);
        assert_eq!(throttle.consume(0.04, Some(0.1)), None);
        let released = throttle.consume(0.04, Some(0.1)).unwrap();
        assert_relative_eq!(released, 0.12, epsilon = 1e-6);
        assert_eq!(throttle.consume(0.04, Some(0.1)), None);
        assert_eq!(throttle.consume(0.04, None), Some(0.04));
    }

    #[test]
    fn requested_restart_uses_the_next_target_position() {
        let mut follower = PositionFollower::with_curve(line(), FollowerSettings::default());
        let cell = Arc::new(TargetCell::new(Vec3::new(1.0, 0.0, 1.0)));
        follower.set_target(cell.clone());

        follower.request_restart();
        cell.store(Vec3::new(9.0, 0.0, 1.0));

        assert_eq!(follower.tick(0.1), TickOutcome::Moved);
        assert_relative_eq!(follower.world_position().x, 9.0, epsilon = 1e-5);
    }

    #[test]
    fn unbound_followers_halt() {
        let mut follower = PositionFollower::new();
        assert_eq!(follower.tick(0.1), TickOutcome::Halted(FollowerError::MissingCurve));

        follower.initialize(line(), FollowerSettings::default());
        assert_eq!(follower.tick(0.1), TickOutcome::Halted(FollowerError::MissingTarget));
        assert_eq!(follower.world_position(), Vec3::ZERO);
    }

    #[test]
    fn first_target_snaps_onto_the_curve() {
        let mut follower = PositionFollower::with_curve(line(), FollowerSettings::default());

        follower.set_target(Arc::new(Vec3::new(4.0, 0.0, 3.0)));

        assert_relative_eq!(follower.world_position().distance(Vec3::new(4.0, 0.0, 0.0)), 0.0, epsilon = 1e-5);
        assert_relative_eq!(follower.curve_param(), 0.4, epsilon = 1e-6);
        assert_eq!(follower.current_mode(), FollowMode::Normal);
    }

    #[test]
    fn restart_before_binding_is_deferred() {
        let mut follower = PositionFollower::new();
        follower.restart_following();
        follower.initialize(line(), FollowerSettings::default());

        let cell = Arc::new(TargetCell::new(Vec3::new(7.0, 0.0, 1.0)));
        follower.set_target(cell.clone());

        assert_relative_eq!(follower.world_position().x, 7.0, epsilon = 1e-5);
    }

    #[test]
    fn later_targets_are_smoothed_towards() {
        let mut follower = PositionFollower::with_curve(line(), FollowerSettings::default());
        follower.set_target(Arc::new(Vec3::new(1.0, 0.0, 1.0)));

        follower.set_target(Arc::new(Vec3::new(9.0, 0.0, 1.0)));
        assert_relative_eq!(follower.world_position().x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(follower.curve_param(), 0.9, epsilon = 1e-6);
        assert_eq!(follower.direction_sign(), 1.0);

        follower.tick(0.1);
        let x = follower.world_position().x;
        assert!(x > 1.0 && x < 9.0, "x = {}", x);
    }

    #[test]
    fn invalid_settings_halt_until_fixed() {
        let invalid = FollowerSettings { sleep_threshold: 1.0, proximity_threshold: 2.0, ..default() };
        let mut follower = PositionFollower::with_curve(line(), invalid);
        follower.set_target(Arc::new(Vec3::new(4.0, 0.0, 3.0)));

        assert!(matches!(follower.tick(0.1), TickOutcome::Halted(FollowerError::InvalidConfiguration(_))));

        follower.set_settings(FollowerSettings::default());
        assert_eq!(follower.tick(0.1), TickOutcome::Moved);
    }

    #[test]
    fn open_curve_beyond_proximity_freezes() {
        let settings = FollowerSettings { proximity_threshold: 5.0, sleep_threshold: 20.0, ..default() };
        let mut follower = PositionFollower::with_curve(line(), settings);
        let cell = Arc::new(TargetCell::new(Vec3::new(5.0, 0.0, 2.0)));
        follower.set_target(cell.clone());
        let held = follower.world_position();

        cell.store(Vec3::new(5.0, 0.0, 12.0));
        assert_eq!(follower.tick(0.1), TickOutcome::Frozen);
        assert_eq!(follower.current_mode(), FollowMode::OutOfRange);
        assert_eq!(follower.world_position(), held);

        cell.store(Vec3::new(8.0, 0.0, 2.0));
        assert_eq!(follower.tick(0.1), TickOutcome::Moved);
        assert_eq!(follower.current_mode(), FollowMode::Normal);
    }

    #[test]
    fn offset_changes_are_eased() {
        let settings = FollowerSettings { offset_transition_speed: 2.0, ..default() };
        let mut follower = PositionFollower::with_curve(line(), settings);
        follower.set_target(Arc::new(Vec3::new(5.0, 0.0, 1.0)));

        follower.set_position_offset(Vec3::new(0.0, 4.0, 0.0));
        follower.tick(0.1);

        let applied = follower.state().offset_current;
        assert_relative_eq!(applied.y, 0.8, epsilon = 1e-5);
        assert_eq!(follower.state().offset_target, Vec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn only_inside_tracking_freezes_outside_a_loop() {
        let ring: Arc<dyn FollowCurve> = Arc::new(PathPolyline::circle(Vec3::ZERO, 10.0, 64));
        let settings = FollowerSettings { only_track_inside_closed: true, ..default() };
        let mut follower = PositionFollower::with_curve(ring, settings);
        follower.set_target(Arc::new(Vec3::new(14.0, 0.0, 0.0)));

        assert_eq!(follower.tick(0.1), TickOutcome::Frozen);
        assert_eq!(follower.current_mode(), FollowMode::OutOfRange);
    }

    #[test]
    fn flat_loops_report_no_interior() {
        let flat: Arc<dyn FollowCurve> = Arc::new(PathPolyline::closed(vec![
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 5.0, 0.0),
        ]));
        let mut follower = PositionFollower::with_curve(flat, FollowerSettings::default());
        follower.set_target(Arc::new(Vec3::new(5.0, 1.0, 0.0)));

        assert_eq!(follower.tick(0.1), TickOutcome::Moved);
        assert_eq!(follower.current_mode(), FollowMode::Normal);
    }

    #[test]
    fn snapshot_mirrors_the_state() {
        let mut follower = PositionFollower::with_curve(line(), FollowerSettings::default());
        follower.set_target(Arc::new(Vec3::new(2.0, 0.0, 1.0)));

        let snapshot = follower.snapshot(10);

        assert_eq!(snapshot.curve_points.len(), 11);
        assert_eq!(snapshot.mode, FollowMode::Normal);
        assert_eq!(snapshot.world_position, follower.world_position());
        assert_eq!(snapshot.target_position, Some(Vec3::new(2.0, 0.0, 1.0)));
        assert!(!snapshot.curve_closed);
        assert!(!snapshot.sleeping);
    }
}
