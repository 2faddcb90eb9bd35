//! Remote acknowledgement gesture: the robot wiggles left-right-left when it
//! hears its name, then is handed back to autonomous driving afterwards.

use super::session::VoiceContext;
use crate::control::{ControlAction, ControlError, ControlSink};
use crate::mood::{DisplayFeedback, MoodIcon};
use crate::runtime::RunFlag;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Gesture and eye-animation durations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GestureTimings {
    pub short: Duration,
    pub medium: Duration,
    pub between: Duration,
    pub settle: Duration,
    pub eye_frame: Duration,
}

/// Symbolic hold after a gesture step, resolved through `GestureTimings`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Hold {
    None,
    Short,
    Medium,
    Between,
    Settle,
}

impl Hold {
    fn resolve(self, timings: &GestureTimings) -> Duration {
        match self {
            Hold::None => Duration::ZERO,
            Hold::Short => timings.short,
            Hold::Medium => timings.medium,
            Hold::Between => timings.between,
            Hold::Settle => timings.settle,
        }
    }
}

/// Wake choreography. The leading `ToggleMode` switches the robot to manual
/// and is skipped when it is already believed to be manual.
pub const GESTURE_SCRIPT: [(ControlAction, Hold); 9] = [
    (ControlAction::ToggleMode, Hold::Settle),
    (ControlAction::Stop, Hold::Settle),
    (ControlAction::TurnLeft, Hold::Short),
    (ControlAction::Stop, Hold::Between),
    (ControlAction::TurnRight, Hold::Medium),
    (ControlAction::Stop, Hold::Between),
    (ControlAction::TurnLeft, Hold::Short),
    (ControlAction::Stop, Hold::Between),
    (ControlAction::Stop, Hold::None),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    Completed,
    /// The robot went away or shutdown began; remaining steps were skipped.
    Aborted,
}

/// Sends gesture and return-to-auto sequences over a control sink.
pub struct GestureSequencer {
    sink: Arc<dyn ControlSink>,
    display: DisplayFeedback,
    context: VoiceContext,
    timings: GestureTimings,
    run: RunFlag,
}

enum StepError {
    Unreachable,
    Shutdown,
}

impl GestureSequencer {
    pub fn new(
        sink: Arc<dyn ControlSink>,
        display: DisplayFeedback,
        context: VoiceContext,
        timings: GestureTimings,
        run: RunFlag,
    ) -> Self {
        Self {
            sink,
            display,
            context,
            timings,
            run,
        }
    }

    pub fn timings(&self) -> GestureTimings {
        self.timings
    }

    /// Run the wake gesture. On abort the return-to-auto sequence is still
    /// attempted so the robot is not left in manual mode.
    pub fn perform_wake_gesture(&self) -> GestureOutcome {
        tracing::info!(robot = %self.sink.target(), "wake gesture started");
        for (action, hold) in GESTURE_SCRIPT {
            if let Err(err) = self.step(action, hold) {
                if matches!(err, StepError::Unreachable) {
                    tracing::warn!("robot unreachable; wake gesture aborted");
                }
                self.return_to_auto();
                return GestureOutcome::Aborted;
            }
        }
        tracing::info!("wake gesture completed");
        GestureOutcome::Completed
    }

    /// Stop, toggle back to autonomous if we switched it to manual, reset
    /// sensors, show the resting face. Safe to call repeatedly.
    pub fn return_to_auto(&self) -> GestureOutcome {
        tracing::info!("returning robot to autonomous mode");
        let outcome = match self.return_steps() {
            Ok(()) => GestureOutcome::Completed,
            Err(StepError::Unreachable) => {
                tracing::warn!("robot unreachable; return to autonomous skipped");
                self.context.set_robot_manual_believed(false);
                GestureOutcome::Aborted
            }
            Err(StepError::Shutdown) => GestureOutcome::Aborted,
        };
        self.display.show(MoodIcon::Common);
        outcome
    }

    /// Exit path: hand the robot back without settle delays, since the run
    /// flag is already cleared.
    pub fn release(&self) -> GestureOutcome {
        if !self.context.robot_manual_believed() {
            return GestureOutcome::Completed;
        }
        let sent = self
            .send(ControlAction::Stop)
            .and_then(|()| self.send(ControlAction::ToggleMode));
        self.context.set_robot_manual_believed(false);
        match sent {
            Ok(()) => {
                tracing::info!("robot released to autonomous mode");
                GestureOutcome::Completed
            }
            Err(_) => {
                tracing::warn!("robot unreachable; release skipped");
                GestureOutcome::Aborted
            }
        }
    }

    fn return_steps(&self) -> Result<(), StepError> {
        self.send(ControlAction::Stop)?;
        self.hold(self.timings.settle)?;
        if self.context.robot_manual_believed() {
            self.send(ControlAction::ToggleMode)?;
            self.context.set_robot_manual_believed(false);
            self.hold(self.timings.settle)?;
        }
        self.send(ControlAction::ResetSensors)?;
        self.hold(self.timings.settle)
    }

    fn step(&self, action: ControlAction, hold: Hold) -> Result<(), StepError> {
        if action == ControlAction::ToggleMode {
            if self.context.robot_manual_believed() {
                tracing::debug!("robot already in manual mode; toggle skipped");
            } else {
                self.send(action)?;
                self.context.set_robot_manual_believed(true);
                self.hold(hold.resolve(&self.timings))?;
            }
            self.display.show(MoodIcon::Evil);
            return Ok(());
        }
        self.send(action)?;
        self.hold(hold.resolve(&self.timings))
    }

    fn send(&self, action: ControlAction) -> Result<(), StepError> {
        match self.sink.send(action) {
            Ok(()) => Ok(()),
            Err(ControlError::NoTarget) => {
                tracing::trace!(%action, "no robot configured; action skipped");
                Ok(())
            }
            Err(err) if err.is_unreachable() => Err(StepError::Unreachable),
            Err(err) => {
                tracing::warn!(%err, "control action not delivered");
                Ok(())
            }
        }
    }

    fn hold(&self, duration: Duration) -> Result<(), StepError> {
        if duration.is_zero() || self.run.sleep(duration) {
            Ok(())
        } else {
            Err(StepError::Shutdown)
        }
    }
}

/// Eyes react to the wake phrase: irritate, pop, rolled.
pub fn animate_wake_eyes(display: DisplayFeedback, frame: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        display.show(MoodIcon::Irritate);
        thread::sleep(frame);
        display.show(MoodIcon::Pop);
        thread::sleep(frame);
        display.show(MoodIcon::Rolled);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::loopback;
    use crate::mood::test_support::recording_display;
    use std::sync::Mutex;

    fn fast_timings() -> GestureTimings {
        GestureTimings {
            short: Duration::from_millis(3),
            medium: Duration::from_millis(6),
            between: Duration::from_millis(2),
            settle: Duration::from_millis(5),
            eye_frame: Duration::from_millis(2),
        }
    }

    /// Records actions and goes away after `fail_after` successful sends.
    struct FlakySink {
        sent: Mutex<Vec<ControlAction>>,
        fail_after: usize,
    }

    impl ControlSink for FlakySink {
        fn send(&self, action: ControlAction) -> Result<(), ControlError> {
            let mut sent = self.sent.lock().unwrap();
            if sent.len() >= self.fail_after {
                return Err(ControlError::ProcessUnreachable {
                    target: "test".into(),
                });
            }
            sent.push(action);
            Ok(())
        }

        fn target(&self) -> String {
            "test".into()
        }
    }

    #[test]
    fn wake_gesture_sends_the_full_script() {
        let (sink, rx) = loopback(64);
        let (display, shown) = recording_display();
        let context = VoiceContext::new(Duration::ZERO);
        let sequencer = GestureSequencer::new(
            Arc::new(sink),
            display,
            context.clone(),
            fast_timings(),
            RunFlag::new(),
        );
        assert_eq!(sequencer.perform_wake_gesture(), GestureOutcome::Completed);
        let sent: Vec<_> = rx.try_iter().collect();
        let expected: Vec<_> = GESTURE_SCRIPT.iter().map(|(action, _)| *action).collect();
        assert_eq!(sent, expected);
        assert!(context.robot_manual_believed());
        assert_eq!(shown.snapshot(), vec![MoodIcon::Evil]);
    }

    #[test]
    fn return_to_auto_toggles_only_when_manual_believed() {
        let (sink, rx) = loopback(64);
        let (display, shown) = recording_display();
        let context = VoiceContext::new(Duration::ZERO);
        let sequencer = GestureSequencer::new(
            Arc::new(sink),
            display,
            context.clone(),
            fast_timings(),
            RunFlag::new(),
        );

        context.set_robot_manual_believed(true);
        assert_eq!(sequencer.return_to_auto(), GestureOutcome::Completed);
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![
                ControlAction::Stop,
                ControlAction::ToggleMode,
                ControlAction::ResetSensors
            ]
        );
        assert!(!context.robot_manual_believed());

        // Second call must not flip the robot back to manual.
        sequencer.return_to_auto();
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![ControlAction::Stop, ControlAction::ResetSensors]
        );
        assert_eq!(shown.snapshot(), vec![MoodIcon::Common]);
    }

    #[test]
    fn vanished_robot_aborts_the_gesture() {
        let sink = Arc::new(FlakySink {
            sent: Mutex::new(Vec::new()),
            fail_after: 3,
        });
        let (display, _shown) = recording_display();
        let context = VoiceContext::new(Duration::ZERO);
        let sequencer = GestureSequencer::new(
            sink.clone(),
            display,
            context.clone(),
            fast_timings(),
            RunFlag::new(),
        );
        assert_eq!(sequencer.perform_wake_gesture(), GestureOutcome::Aborted);
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec![
                ControlAction::ToggleMode,
                ControlAction::Stop,
                ControlAction::TurnLeft
            ]
        );
        assert!(!context.robot_manual_believed());
    }

    #[test]
    fn missing_robot_is_a_silent_no_op() {
        let sequencer = GestureSequencer::new(
            Arc::new(crate::control::SignalSender::new(None)),
            recording_display().0,
            VoiceContext::new(Duration::ZERO),
            fast_timings(),
            RunFlag::new(),
        );
        assert_eq!(sequencer.perform_wake_gesture(), GestureOutcome::Completed);
        assert_eq!(sequencer.return_to_auto(), GestureOutcome::Completed);
    }

    #[test]
    fn release_skips_holds_after_shutdown() {
        let (sink, rx) = loopback(8);
        let context = VoiceContext::new(Duration::ZERO);
        let run = RunFlag::new();
        let sequencer = GestureSequencer::new(
            Arc::new(sink),
            recording_display().0,
            context.clone(),
            fast_timings(),
            run.clone(),
        );
        assert_eq!(sequencer.release(), GestureOutcome::Completed);
        assert!(rx.try_recv().is_err());

        context.set_robot_manual_believed(true);
        run.stop();
        assert_eq!(sequencer.release(), GestureOutcome::Completed);
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![ControlAction::Stop, ControlAction::ToggleMode]
        );
        assert!(!context.robot_manual_believed());
    }

    #[test]
    fn release_reports_a_vanished_robot() {
        let sink = Arc::new(FlakySink {
            sent: Mutex::new(Vec::new()),
            fail_after: 1,
        });
        let context = VoiceContext::new(Duration::ZERO);
        context.set_robot_manual_believed(true);
        let sequencer = GestureSequencer::new(
            sink.clone(),
            recording_display().0,
            context.clone(),
            fast_timings(),
            RunFlag::new(),
        );
        assert_eq!(sequencer.release(), GestureOutcome::Aborted);
        assert_eq!(*sink.sent.lock().unwrap(), vec![ControlAction::Stop]);
        assert!(!context.robot_manual_believed());
    }

    #[test]
    fn release_skips_toggle_when_stop_is_unreachable() {
        let sink = Arc::new(FlakySink {
            sent: Mutex::new(Vec::new()),
            fail_after: 0,
        });
        let context = VoiceContext::new(Duration::ZERO);
        context.set_robot_manual_believed(true);
        let sequencer = GestureSequencer::new(
            sink.clone(),
            recording_display().0,
            context.clone(),
            fast_timings(),
            RunFlag::new(),
        );
        assert_eq!(sequencer.release(), GestureOutcome::Aborted);
        assert!(sink.sent.lock().unwrap().is_empty());
        assert!(!context.robot_manual_believed());
    }

    #[test]
    fn wake_eyes_play_three_frames() {
        let (display, shown) = recording_display();
        animate_wake_eyes(display, Duration::from_millis(1))
            .join()
            .unwrap();
        assert_eq!(
            shown.snapshot(),
            vec![MoodIcon::Irritate, MoodIcon::Pop, MoodIcon::Rolled]
        );
    }
}
