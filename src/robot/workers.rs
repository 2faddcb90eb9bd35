//! Long-lived robot threads: sensor polling, movement, and signal dispatch.

use super::controller::RobotControl;
use super::hardware::ObstacleSensors;
use crate::control::SignalReceiver;
use crate::runtime::RunFlag;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Poll cadence for the robot workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RobotTimings {
    pub sensor_poll: Duration,
    pub movement_poll: Duration,
    pub dispatch_poll: Duration,
    pub key_repeat: Duration,
}

/// Read the IR pair every `poll` and hand it to the control state.
/// Sensors are left alone while the robot is paused.
pub fn spawn_sensor_worker(
    mut sensors: Box<dyn ObstacleSensors>,
    control: Arc<RobotControl>,
    run: RunFlag,
    poll: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::debug!(source = %sensors.describe(), "sensor worker started");
        let mut last_reported = None;
        let mut failing = false;
        while run.is_running() {
            if control.is_paused() {
                run.sleep(poll * 2);
                continue;
            }
            match sensors.read() {
                Ok((left, right)) => {
                    if failing {
                        tracing::info!("sensor reads recovered");
                        failing = false;
                    }
                    control.record_reading(left, right);
                    if last_reported != Some((left, right)) {
                        tracing::info!(left, right, "sensors");
                        last_reported = Some((left, right));
                    }
                }
                Err(err) => {
                    if !failing {
                        tracing::warn!(%err, "sensor read failed");
                        failing = true;
                    }
                }
            }
            run.sleep(poll);
        }
        tracing::debug!("sensor worker stopped");
    })
}

/// Run whatever maneuver the latest sensor pair calls for.
pub fn spawn_movement_worker(
    control: Arc<RobotControl>,
    run: RunFlag,
    poll: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::debug!("movement worker started");
        while run.is_running() {
            match control.next_maneuver() {
                Some(maneuver) => {
                    let outcome = control.execute(maneuver, &run);
                    tracing::debug!(maneuver = maneuver.label(), ?outcome, "maneuver finished");
                }
                None => {
                    run.sleep(poll);
                }
            }
        }
        tracing::debug!("movement worker stopped");
    })
}

/// Drain actions raised by signal handlers and apply them in order.
pub fn spawn_signal_dispatcher(
    receiver: SignalReceiver,
    control: Arc<RobotControl>,
    run: RunFlag,
    poll: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while run.is_running() {
            for action in receiver.take_pending() {
                tracing::info!(%action, signal = action.signal_name(), "signal received");
                control.apply(action);
            }
            run.sleep(poll);
        }
    })
}

/// Same as [`spawn_signal_dispatcher`] but fed from an in-process channel.
pub fn spawn_channel_dispatcher(
    actions: crossbeam_channel::Receiver<crate::control::ControlAction>,
    control: Arc<RobotControl>,
    run: RunFlag,
    poll: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while run.is_running() {
            match actions.recv_timeout(poll) {
                Ok(action) => control.apply(action),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{loopback, ControlAction, ControlSink};
    use crate::mood::test_support::recording_display;
    use crate::mood::MoodIcon;
    use crate::robot::hardware::test_support::{MotorCall, RecordingMotors, ScriptedSensors};
    use crate::robot::hardware::Drive;
    use crate::robot::{MotionTuning, Mode};
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(5);

    fn tuning() -> MotionTuning {
        MotionTuning {
            base_speed: 60,
            avoidance_speed: 70,
            complex_speed: 80,
            backward: Duration::from_millis(15),
            turn: Duration::from_millis(15),
        }
    }

    fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        check()
    }

    #[test]
    fn steady_clear_then_left_blocked_scenario() {
        let motors = RecordingMotors::default();
        let (display, sink) = recording_display();
        let control = Arc::new(RobotControl::new(Arc::new(motors.clone()), display, tuning()));
        control.start();

        let mut script = vec![(true, true); 40];
        script.extend(vec![(false, true); 40]);
        let run = RunFlag::new();
        let sensors = spawn_sensor_worker(
            Box::new(ScriptedSensors::new(&script)),
            Arc::clone(&control),
            run.clone(),
            POLL,
        );
        let movement = spawn_movement_worker(Arc::clone(&control), run.clone(), POLL);

        assert!(wait_until(Duration::from_secs(3), || {
            motors.snapshot().contains(&MotorCall::Drive(Drive::TurnRight, 70))
        }));
        // Let the repeated (F,T) readings flow for a while.
        thread::sleep(Duration::from_millis(150));
        run.stop();
        sensors.join().unwrap();
        movement.join().unwrap();

        assert_eq!(
            motors.snapshot(),
            vec![
                MotorCall::Drive(Drive::Forward, 60),
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
    fn dispatcher_applies_loopback_actions() {
        let motors = RecordingMotors::default();
        let (display, _sink) = recording_display();
        let control = Arc::new(RobotControl::new(Arc::new(motors.clone()), display, tuning()));
        let (sink, rx) = loopback(8);
        let run = RunFlag::new();
        let dispatcher = spawn_channel_dispatcher(rx, Arc::clone(&control), run.clone(), POLL);

        sink.send(ControlAction::ToggleMode).unwrap();
        sink.send(ControlAction::MoveBackward).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            motors.snapshot().contains(&MotorCall::Drive(Drive::Backward, 60))
        }));
        assert_eq!(control.mode(), Mode::Manual);
        run.stop();
        dispatcher.join().unwrap();
    }

    #[test]
    fn paused_robot_ignores_sensor_changes() {
        let motors = RecordingMotors::default();
        let (display, _sink) = recording_display();
        let control = Arc::new(RobotControl::new(Arc::new(motors.clone()), display, tuning()));
        control.pause();
        let run = RunFlag::new();
        let sensors = spawn_sensor_worker(
            Box::new(ScriptedSensors::new(&[(false, false)])),
            Arc::clone(&control),
            run.clone(),
            POLL,
        );
        let movement = spawn_movement_worker(Arc::clone(&control), run.clone(), POLL);
        thread::sleep(Duration::from_millis(80));
        run.stop();
        sensors.join().unwrap();
        movement.join().unwrap();
        assert_eq!(motors.snapshot(), vec![MotorCall::Stop]);
    }
}
