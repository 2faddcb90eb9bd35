use super::signals::decode_mask;
use super::*;
use std::collections::HashSet;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn every_action_has_a_distinct_signal() {
    let signals: HashSet<_> = ControlAction::ALL.iter().map(|a| a.signal()).collect();
    assert_eq!(signals.len(), ControlAction::ALL.len());
    for action in ControlAction::ALL {
        assert_eq!(ControlAction::from_signal(action.signal()), Some(action));
    }
    assert_eq!(ControlAction::from_signal(libc::SIGINT), None);
}

#[test]
fn decode_mask_preserves_dispatch_order() {
    let mask = ControlAction::ResetSensors.bit() | ControlAction::ToggleMode.bit();
    assert_eq!(
        decode_mask(mask),
        vec![ControlAction::ToggleMode, ControlAction::ResetSensors]
    );
    assert!(decode_mask(0).is_empty());
}

#[test]
fn loopback_drops_when_full_and_reports_gone_receiver() {
    let (sink, rx) = loopback(1);
    sink.send(ControlAction::Stop).unwrap();
    sink.send(ControlAction::Pause).unwrap();
    assert_eq!(rx.try_recv(), Ok(ControlAction::Stop));
    assert!(rx.try_recv().is_err());
    drop(rx);
    let err = sink.send(ControlAction::Stop).unwrap_err();
    assert!(err.is_unreachable());
}

#[test]
fn signal_sender_without_pid_is_a_no_target_error() {
    let sender = SignalSender::new(None);
    assert!(!sender.target_alive());
    assert!(matches!(
        sender.send(ControlAction::Stop),
        Err(ControlError::NoTarget)
    ));
}

#[test]
fn signal_sender_reports_exited_process_as_unreachable() {
    let mut child = Command::new("true").spawn().expect("spawn true");
    let pid = child.id() as i32;
    child.wait().expect("wait for true");
    let sender = SignalSender::new(Some(pid));
    // The pid could in theory be recycled; only assert when it is really gone.
    if !sender.target_alive() {
        let err = sender.send(ControlAction::ToggleMode).unwrap_err();
        assert!(matches!(err, ControlError::ProcessUnreachable { .. }));
    }
}

#[test]
fn raised_signals_reach_the_receiver() {
    let receiver = SignalReceiver::install().expect("install handlers");
    let _ = receiver.take_pending();

    let me = SignalSender::new(Some(std::process::id() as i32));
    assert!(me.target_alive());
    me.send(ControlAction::TurnLeft).unwrap();
    me.send(ControlAction::ResetSensors).unwrap();
    me.send(ControlAction::ResetSensors).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        seen.extend(receiver.take_pending());
        if seen.contains(&ControlAction::TurnLeft) && seen.contains(&ControlAction::ResetSensors)
        {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert!(seen.contains(&ControlAction::TurnLeft), "saw {seen:?}");
    assert!(seen.contains(&ControlAction::ResetSensors), "saw {seen:?}");
    assert!(seen.len() <= 3);
}
