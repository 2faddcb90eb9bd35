use std::time::{Duration, Instant};

/// Configured wake phrases, stored lower-cased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WakePhrases {
    phrases: Vec<String>,
}

impl WakePhrases {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|phrase| phrase.as_ref().trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { phrases }
    }

    /// Case-insensitive substring match against any configured phrase.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.phrases.iter().any(|phrase| text.contains(phrase.as_str()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.phrases
    }
}

/// Rate limit for wake events: one accepted event per cooldown window.
/// Rejected events do not extend the window.
#[derive(Clone, Debug)]
pub struct WakeGate {
    cooldown: Duration,
    last_accepted: Option<Instant>,
}

impl WakeGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if at.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_accepted = Some(at);
        true
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }
}
