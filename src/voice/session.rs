use super::wake::WakeGate;
use crate::lock::lock_or_recover;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoicePhase {
    WaitingForWake,
    ListeningCommand,
    ProcessingResponse,
}

impl VoicePhase {
    pub fn label(self) -> &'static str {
        match self {
            VoicePhase::WaitingForWake => "waiting_for_wake",
            VoicePhase::ListeningCommand => "listening_command",
            VoicePhase::ProcessingResponse => "processing_response",
        }
    }
}

/// Result of offering a wake phrase to the session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WakeDecision {
    Accepted,
    /// Inside the cooldown window.
    CoolingDown,
    /// The pipeline is already handling a wake.
    Busy(VoicePhase),
}

#[derive(Clone, Debug)]
pub struct VoiceSession {
    phase: VoicePhase,
    wake: WakeGate,
    robot_manual_believed: bool,
}

impl VoiceSession {
    pub fn new(wake_cooldown: Duration) -> Self {
        Self {
            phase: VoicePhase::WaitingForWake,
            wake: WakeGate::new(wake_cooldown),
            robot_manual_believed: false,
        }
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    pub fn last_wake(&self) -> Option<Instant> {
        self.wake.last_accepted()
    }

    pub fn robot_manual_believed(&self) -> bool {
        self.robot_manual_believed
    }

    /// Wake phrases only count while idle; the cooldown is checked after that.
    pub fn offer_wake(&mut self, at: Instant) -> WakeDecision {
        if self.phase != VoicePhase::WaitingForWake {
            return WakeDecision::Busy(self.phase);
        }
        if self.wake.accept(at) {
            WakeDecision::Accepted
        } else {
            WakeDecision::CoolingDown
        }
    }
}

/// The voice process's shared session, behind its single lock.
#[derive(Clone)]
pub struct VoiceContext {
    session: Arc<Mutex<VoiceSession>>,
}

impl VoiceContext {
    pub fn new(wake_cooldown: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(VoiceSession::new(wake_cooldown))),
        }
    }

    pub fn snapshot(&self) -> VoiceSession {
        self.with_session(|session| session.clone())
    }

    pub fn phase(&self) -> VoicePhase {
        self.with_session(|session| session.phase)
    }

    pub fn set_phase(&self, phase: VoicePhase) {
        let previous = self.with_session(|session| std::mem::replace(&mut session.phase, phase));
        if previous != phase {
            tracing::debug!(from = previous.label(), to = phase.label(), "voice phase");
        }
    }

    pub fn offer_wake(&self, at: Instant) -> WakeDecision {
        self.with_session(|session| session.offer_wake(at))
    }

    pub fn robot_manual_believed(&self) -> bool {
        self.with_session(|session| session.robot_manual_believed)
    }

    pub fn set_robot_manual_believed(&self, manual: bool) {
        self.with_session(|session| session.robot_manual_believed = manual);
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut VoiceSession) -> R) -> R {
        let mut session = lock_or_recover(&self.session, "voice session");
        f(&mut session)
    }
}
