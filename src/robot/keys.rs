//! Local manual control from the terminal the robot runs in.

use crate::control::ControlAction;
use crate::runtime::RunFlag;
use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const INPUT_POLL: Duration = Duration::from_millis(10);

/// What a key press asks the robot process to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocalCommand {
    Control(ControlAction),
    TogglePause,
    Quit,
}

pub const KEY_HELP: &str =
    "controls: w/s/a/d or arrows drive, space stop, r mode, p pause/resume, x reset sensors, q quit";

/// Map one key event to a command. Key releases and unbound keys map to `None`.
pub fn map_key(key: KeyEvent) -> Option<LocalCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(LocalCommand::Quit),
            _ => None,
        };
    }
    let command = match key.code {
        KeyCode::Up => LocalCommand::Control(ControlAction::MoveForward),
        KeyCode::Down => LocalCommand::Control(ControlAction::MoveBackward),
        KeyCode::Left => LocalCommand::Control(ControlAction::TurnLeft),
        KeyCode::Right => LocalCommand::Control(ControlAction::TurnRight),
        KeyCode::Char(ch) => match ch.to_ascii_lowercase() {
            'w' => LocalCommand::Control(ControlAction::MoveForward),
            's' => LocalCommand::Control(ControlAction::MoveBackward),
            'a' => LocalCommand::Control(ControlAction::TurnLeft),
            'd' => LocalCommand::Control(ControlAction::TurnRight),
            ' ' => LocalCommand::Control(ControlAction::Stop),
            'r' => LocalCommand::Control(ControlAction::ToggleMode),
            'p' => LocalCommand::TogglePause,
            'x' => LocalCommand::Control(ControlAction::ResetSensors),
            'q' => LocalCommand::Quit,
            _ => return None,
        },
        _ => return None,
    };
    Some(command)
}

/// Drops presses of the same key that arrive within `min_interval` of the
/// previous accepted press, so terminal auto-repeat does not flood the robot.
pub struct KeyRepeatGate {
    min_interval: Duration,
    last_accepted: HashMap<KeyCode, Instant>,
}

impl KeyRepeatGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: HashMap::new(),
        }
    }

    pub fn accept(&mut self, code: KeyCode, now: Instant) -> bool {
        if let Some(previous) = self.last_accepted.get(&code) {
            if now.saturating_duration_since(*previous) < self.min_interval {
                return false;
            }
        }
        self.last_accepted.insert(code, now);
        true
    }
}

/// Read keys until shutdown and forward mapped commands to `commands`.
/// The caller is expected to have put the terminal into raw mode.
pub fn spawn_key_reader(
    commands: Sender<LocalCommand>,
    run: RunFlag,
    key_repeat: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut gate = KeyRepeatGate::new(key_repeat);
        while run.is_running() {
            let key = match read_key(INPUT_POLL) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(%err, "keyboard input unavailable; local control disabled");
                    break;
                }
            };
            let Some(command) = map_key(key) else {
                continue;
            };
            if !gate.accept(key.code, Instant::now()) {
                tracing::trace!(code = ?key.code, "key repeat suppressed");
                continue;
            }
            tracing::debug!(?command, "local key");
            if commands.send(command).is_err() {
                break;
            }
        }
    })
}

fn read_key(timeout: Duration) -> std::io::Result<Option<KeyEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(Some(key)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn wasd_and_arrows_map_to_the_same_actions() {
        for (letter, arrow, action) in [
            ('w', KeyCode::Up, ControlAction::MoveForward),
            ('s', KeyCode::Down, ControlAction::MoveBackward),
            ('a', KeyCode::Left, ControlAction::TurnLeft),
            ('d', KeyCode::Right, ControlAction::TurnRight),
        ] {
            assert_eq!(
                map_key(press(KeyCode::Char(letter))),
                Some(LocalCommand::Control(action))
            );
            assert_eq!(map_key(press(arrow)), Some(LocalCommand::Control(action)));
        }
    }

    #[test]
    fn command_keys_map_as_documented() {
        assert_eq!(
            map_key(press(KeyCode::Char(' '))),
            Some(LocalCommand::Control(ControlAction::Stop))
        );
        assert_eq!(
            map_key(press(KeyCode::Char('R'))),
            Some(LocalCommand::Control(ControlAction::ToggleMode))
        );
        assert_eq!(
            map_key(press(KeyCode::Char('p'))),
            Some(LocalCommand::TogglePause)
        );
        assert_eq!(
            map_key(press(KeyCode::Char('x'))),
            Some(LocalCommand::Control(ControlAction::ResetSensors))
        );
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(LocalCommand::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(LocalCommand::Quit)
        );
        assert_eq!(map_key(press(KeyCode::Char('z'))), None);
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn key_release_is_ignored() {
        let mut key = press(KeyCode::Char('w'));
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
    }

    #[test]
    fn repeat_gate_is_per_key() {
        let mut gate = KeyRepeatGate::new(Duration::from_millis(150));
        let t0 = Instant::now();
        assert!(gate.accept(KeyCode::Char('w'), t0));
        assert!(!gate.accept(KeyCode::Char('w'), t0 + Duration::from_millis(100)));
        assert!(gate.accept(KeyCode::Char('a'), t0 + Duration::from_millis(100)));
        assert!(gate.accept(KeyCode::Char('w'), t0 + Duration::from_millis(150)));
    }
}
