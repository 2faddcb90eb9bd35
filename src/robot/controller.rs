use super::hardware::{Drive, MotorDriver};
use super::policy::Maneuver;
use super::state::{Mode, MotorCommand, RobotState, Transition};
use crate::control::ControlAction;
use crate::lock::lock_or_recover;
use crate::mood::{DisplayFeedback, MoodIcon};
use crate::runtime::{RunFlag, MAX_SLEEP_SLICE};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Speeds (percent duty) and phase lengths for movement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MotionTuning {
    pub base_speed: u8,
    pub avoidance_speed: u8,
    pub complex_speed: u8,
    pub backward: Duration,
    pub turn: Duration,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ManeuverOutcome {
    Completed,
    /// Mode, pause state or shutdown changed mid-maneuver; motors were stopped.
    Aborted,
}

/// Shared handle to the robot: the state lock plus the hardware and display it drives.
pub struct RobotControl {
    state: Mutex<RobotState>,
    motors: Arc<dyn MotorDriver>,
    display: DisplayFeedback,
    tuning: MotionTuning,
}

impl RobotControl {
    pub fn new(
        motors: Arc<dyn MotorDriver>,
        display: DisplayFeedback,
        tuning: MotionTuning,
    ) -> Self {
        Self {
            state: Mutex::new(RobotState::new()),
            motors,
            display,
            tuning,
        }
    }

    pub fn mode(&self) -> Mode {
        self.with_state(|state| state.mode())
    }

    pub fn is_paused(&self) -> bool {
        self.with_state(|state| state.is_paused())
    }

    /// Startup: request a fresh reading and show the resting face.
    pub fn start(&self) {
        self.with_state(RobotState::request_sensor_reset);
        self.display.show(MoodIcon::Common);
        tracing::info!(mode = self.mode().label(), "robot control started");
    }

    /// Route one control action to its transition.
    pub fn apply(&self, action: ControlAction) {
        tracing::debug!(%action, "control action");
        match action {
            ControlAction::ToggleMode => self.toggle_mode(),
            ControlAction::Pause => self.pause(),
            ControlAction::Resume => self.resume(),
            ControlAction::ResetSensors => self.reset_sensors(),
            ControlAction::MoveForward
            | ControlAction::MoveBackward
            | ControlAction::TurnLeft
            | ControlAction::TurnRight
            | ControlAction::Stop => self.manual(action),
        }
    }

    pub fn toggle_mode(&self) {
        let (transition, mode, paused) = self.with_state(|state| {
            let transition = state.toggle_mode();
            (transition, state.mode(), state.is_paused())
        });
        tracing::info!(mode = mode.label(), paused, "mode toggled");
        self.actuate(transition);
    }

    pub fn pause(&self) {
        let transition = self.with_state(RobotState::pause);
        if !transition.is_noop() {
            tracing::info!("robot paused");
        }
        self.actuate(transition);
    }

    pub fn resume(&self) {
        let (was_paused, transition, mode) = self.with_state(|state| {
            let was_paused = state.is_paused();
            (was_paused, state.resume(), state.mode())
        });
        if was_paused {
            tracing::info!(mode = mode.label(), "robot resumed");
        }
        self.actuate(transition);
    }

    /// Local pause key: pause or resume depending on the current state.
    pub fn toggle_pause(&self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn reset_sensors(&self) {
        self.with_state(RobotState::request_sensor_reset);
        tracing::info!("sensor state reset, forcing update");
    }

    fn manual(&self, action: ControlAction) {
        let transition = self.with_state(|state| state.manual_command(action));
        if transition.is_noop() {
            tracing::debug!(%action, "manual command ignored outside manual mode");
            return;
        }
        self.actuate(transition);
    }

    /// Store a sensor reading; returns whether it is new to the movement worker.
    pub fn record_reading(&self, left: bool, right: bool) -> bool {
        self.with_state(|state| state.apply_reading(left, right))
    }

    pub fn next_maneuver(&self) -> Option<Maneuver> {
        self.with_state(RobotState::next_maneuver)
    }

    /// Run one maneuver to completion on the calling thread.
    ///
    /// Each phase re-checks that the robot is still autonomous and unpaused;
    /// otherwise the motors are stopped and the rest is skipped.
    pub fn execute(&self, maneuver: Maneuver, run: &RunFlag) -> ManeuverOutcome {
        tracing::debug!(maneuver = maneuver.label(), "executing maneuver");
        let tuning = self.tuning;
        let (speed, pivot, icon) = match maneuver {
            Maneuver::Forward => {
                if !self.drive_if_allowed(Drive::Forward, tuning.base_speed) {
                    return ManeuverOutcome::Aborted;
                }
                return ManeuverOutcome::Completed;
            }
            Maneuver::AvoidRight => (
                tuning.avoidance_speed,
                Drive::TurnRight,
                MoodIcon::Irritate,
            ),
            Maneuver::AvoidLeft => (
                tuning.avoidance_speed,
                Drive::TurnLeft,
                MoodIcon::Irritate,
            ),
            Maneuver::AvoidBoth => (tuning.complex_speed, Drive::TurnRight, MoodIcon::Crazy),
        };

        if !self.maneuvers_allowed() {
            return ManeuverOutcome::Aborted;
        }
        self.display.show(icon);
        for (drive, duration) in [(Drive::Backward, tuning.backward), (pivot, tuning.turn)] {
            if !self.drive_if_allowed(drive, speed) || !self.hold(duration, run) {
                return self.abort(maneuver);
            }
        }
        self.stop_motors();
        self.display.show(MoodIcon::Common);
        ManeuverOutcome::Completed
    }

    /// Stop the motors on the way out.
    pub fn shutdown(&self) {
        self.stop_motors();
    }

    fn abort(&self, maneuver: Maneuver) -> ManeuverOutcome {
        self.stop_motors();
        tracing::info!(maneuver = maneuver.label(), "maneuver aborted");
        ManeuverOutcome::Aborted
    }

    /// Sleep up to `duration`, bailing out as soon as maneuvers stop being allowed.
    fn hold(&self, duration: Duration, run: &RunFlag) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if !run.is_running() || !self.maneuvers_allowed() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(MAX_SLEEP_SLICE / 2));
        }
    }

    /// Drive only while autonomous and unpaused. A pause or mode change that
    /// lands between the check and the motor write is caught by the second
    /// check, which stops the motors again.
    fn drive_if_allowed(&self, drive: Drive, speed: u8) -> bool {
        if !self.maneuvers_allowed() {
            return false;
        }
        self.drive(drive, speed);
        if self.maneuvers_allowed() {
            return true;
        }
        self.stop_motors();
        false
    }

    fn maneuvers_allowed(&self) -> bool {
        self.with_state(|state| state.maneuvers_allowed())
    }

    fn actuate(&self, transition: Transition) {
        match transition.motors {
            Some(MotorCommand::Stop) => self.stop_motors(),
            Some(MotorCommand::Drive(drive)) => self.drive(drive, self.tuning.base_speed),
            None => {}
        }
        if let Some(icon) = transition.icon {
            self.display.show(icon);
        }
    }

    fn drive(&self, drive: Drive, speed: u8) {
        if let Err(err) = self.motors.drive(drive, speed) {
            tracing::warn!(drive = drive.label(), speed, %err, "motor command failed");
        }
    }

    fn stop_motors(&self) {
        if let Err(err) = self.motors.stop() {
            tracing::warn!(%err, "motor stop failed");
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RobotState) -> R) -> R {
        let mut state = lock_or_recover(&self.state, "robot state");
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::test_support::{recording_display, RecordingSink};
    use crate::robot::hardware::test_support::{MotorCall, RecordingMotors};
    use crate::robot::hardware::HardwareError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::thread;

    fn tuning(phase_ms: u64) -> MotionTuning {
        MotionTuning {
            base_speed: 60,
            avoidance_speed: 70,
            complex_speed: 80,
            backward: Duration::from_millis(phase_ms),
            turn: Duration::from_millis(phase_ms),
        }
    }

    fn control(phase_ms: u64) -> (Arc<RobotControl>, RecordingMotors, RecordingSink) {
        let motors = RecordingMotors::default();
        let (display, sink) = recording_display();
        let control = RobotControl::new(Arc::new(motors.clone()), display, tuning(phase_ms));
        (Arc::new(control), motors, sink)
    }

    #[test]
    fn forward_drives_at_base_speed_without_icon_change() {
        let (control, motors, sink) = control(10);
        control.start();
        let outcome = control.execute(Maneuver::Forward, &RunFlag::new());
        assert_eq!(outcome, ManeuverOutcome::Completed);
        assert_eq!(motors.snapshot(), vec![MotorCall::Drive(Drive::Forward, 60)]);
        assert_eq!(sink.snapshot(), vec![MoodIcon::Common]);
    }

    #[test]
    fn single_side_avoidance_reverses_then_pivots_away() {
        let (control, motors, sink) = control(10);
        control.start();
        let outcome = control.execute(Maneuver::AvoidRight, &RunFlag::new());
        assert_eq!(outcome, ManeuverOutcome::Completed);
        assert_eq!(
            motors.snapshot(),
            vec![
                MotorCall::Drive(Drive::Backward, 70),
                MotorCall::Drive(Drive::TurnRight, 70),
                MotorCall::Stop,
            ]
        );
        assert_eq!(
            sink.snapshot(),
            vec![MoodIcon::Common, MoodIcon::Irritate, MoodIcon::Common]
        );
    }

    #[test]
    fn both_blocked_uses_complex_speed_and_crazy_face() {
        let (control, motors, sink) = control(10);
        control.execute(Maneuver::AvoidBoth, &RunFlag::new());
        assert_eq!(
            motors.snapshot(),
            vec![
                MotorCall::Drive(Drive::Backward, 80),
                MotorCall::Drive(Drive::TurnRight, 80),
                MotorCall::Stop,
            ]
        );
        assert_eq!(sink.snapshot(), vec![MoodIcon::Crazy, MoodIcon::Common]);
    }

    #[test]
    fn pause_mid_maneuver_aborts_and_stops() {
        let (control, motors, sink) = control(400);
        let remote = Arc::clone(&control);
        let pauser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            remote.apply(ControlAction::Pause);
        });
        let started = Instant::now();
        let outcome = control.execute(Maneuver::AvoidLeft, &RunFlag::new());
        pauser.join().unwrap();
        assert_eq!(outcome, ManeuverOutcome::Aborted);
        assert!(started.elapsed() < Duration::from_millis(400));
        let calls = motors.snapshot();
        assert_eq!(calls.first(), Some(&MotorCall::Drive(Drive::Backward, 70)));
        assert_eq!(calls.last(), Some(&MotorCall::Stop));
        assert!(!calls.contains(&MotorCall::Drive(Drive::TurnLeft, 70)));
        assert_eq!(sink.snapshot(), vec![MoodIcon::Irritate, MoodIcon::Closed]);
    }

    /// Pauses the robot from inside the first `drive` call, the way a
    /// signal dispatched between the allowed check and the write would.
    struct PauseOnDrive {
        inner: RecordingMotors,
        control: OnceLock<Weak<RobotControl>>,
        fired: AtomicBool,
    }

    impl MotorDriver for PauseOnDrive {
        fn drive(&self, drive: Drive, speed: u8) -> Result<(), HardwareError> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                if let Some(control) = self.control.get().and_then(Weak::upgrade) {
                    control.apply(ControlAction::Pause);
                }
            }
            self.inner.drive(drive, speed)
        }

        fn stop(&self) -> Result<(), HardwareError> {
            self.inner.stop()
        }
    }

    #[test]
    fn pause_racing_a_forward_write_leaves_motors_stopped() {
        let recorded = RecordingMotors::default();
        let motors = Arc::new(PauseOnDrive {
            inner: recorded.clone(),
            control: OnceLock::new(),
            fired: AtomicBool::new(false),
        });
        let (display, _sink) = recording_display();
        let control = Arc::new(RobotControl::new(motors.clone(), display, tuning(10)));
        motors.control.set(Arc::downgrade(&control)).unwrap();

        let outcome = control.execute(Maneuver::Forward, &RunFlag::new());
        assert_eq!(outcome, ManeuverOutcome::Aborted);
        assert!(control.is_paused());
        assert_eq!(
            recorded.snapshot(),
            vec![
                MotorCall::Stop,
                MotorCall::Drive(Drive::Forward, 60),
                MotorCall::Stop
            ]
        );
    }

    #[test]
    fn pause_racing_an_avoidance_write_aborts_the_maneuver() {
        let recorded = RecordingMotors::default();
        let motors = Arc::new(PauseOnDrive {
            inner: recorded.clone(),
            control: OnceLock::new(),
            fired: AtomicBool::new(false),
        });
        let (display, _sink) = recording_display();
        let control = Arc::new(RobotControl::new(motors.clone(), display, tuning(200)));
        motors.control.set(Arc::downgrade(&control)).unwrap();

        let started = Instant::now();
        let outcome = control.execute(Maneuver::AvoidRight, &RunFlag::new());
        assert_eq!(outcome, ManeuverOutcome::Aborted);
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(recorded.snapshot().last(), Some(&MotorCall::Stop));
        assert!(!recorded
            .snapshot()
            .contains(&MotorCall::Drive(Drive::TurnRight, 70)));
    }

    #[test]
    fn maneuver_refused_in_manual_mode() {
        let (control, motors, _sink) = control(10);
        control.apply(ControlAction::ToggleMode);
        let before = motors.snapshot().len();
        assert_eq!(
            control.execute(Maneuver::Forward, &RunFlag::new()),
            ManeuverOutcome::Aborted
        );
        assert_eq!(motors.snapshot().len(), before);
    }

    #[test]
    fn manual_drive_ignored_until_manual_mode() {
        let (control, motors, sink) = control(10);
        control.apply(ControlAction::TurnLeft);
        assert!(motors.snapshot().is_empty());

        control.apply(ControlAction::ToggleMode);
        assert_eq!(control.mode(), Mode::Manual);
        control.apply(ControlAction::TurnLeft);
        control.apply(ControlAction::Stop);
        assert_eq!(
            motors.snapshot(),
            vec![
                MotorCall::Stop,
                MotorCall::Drive(Drive::TurnLeft, 60),
                MotorCall::Stop,
            ]
        );
        assert_eq!(sink.snapshot(), vec![MoodIcon::Evil]);

        control.apply(ControlAction::Pause);
        control.apply(ControlAction::MoveForward);
        assert_eq!(motors.snapshot().last(), Some(&MotorCall::Stop));
    }

    #[test]
    fn toggle_pause_round_trip_keeps_manual_mode() {
        let (control, _motors, sink) = control(10);
        control.apply(ControlAction::ToggleMode);
        control.toggle_pause();
        assert!(control.is_paused());
        control.toggle_pause();
        assert!(!control.is_paused());
        assert_eq!(control.mode(), Mode::Manual);
        assert_eq!(sink.snapshot(), vec![MoodIcon::Evil, MoodIcon::Closed]);
    }
}
