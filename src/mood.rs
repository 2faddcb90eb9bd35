//! Mood icons shown on the robot's face display.
//!
//! The renderer itself lives outside this crate; we only hand it a symbolic
//! icon name. `DisplayFeedback` suppresses redundant re-sets and fans the icon
//! out to one or more sinks under its own small lock, never the state lock.

use crate::lock::lock_or_recover;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Fixed icon vocabulary understood by the renderer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MoodIcon {
    Closed,
    Common,
    Crazy,
    Cry,
    Error,
    Evil,
    Flinch,
    Happy,
    Irritate,
    Pop,
    Rolled,
    Sad,
}

impl MoodIcon {
    pub const ALL: [MoodIcon; 12] = [
        MoodIcon::Closed,
        MoodIcon::Common,
        MoodIcon::Crazy,
        MoodIcon::Cry,
        MoodIcon::Error,
        MoodIcon::Evil,
        MoodIcon::Flinch,
        MoodIcon::Happy,
        MoodIcon::Irritate,
        MoodIcon::Pop,
        MoodIcon::Rolled,
        MoodIcon::Sad,
    ];

    /// Icons the idle animations pick from.
    pub const IDLE_CYCLE: [MoodIcon; 3] = [MoodIcon::Common, MoodIcon::Happy, MoodIcon::Crazy];

    pub fn as_str(self) -> &'static str {
        match self {
            MoodIcon::Closed => "closed",
            MoodIcon::Common => "common",
            MoodIcon::Crazy => "crazy",
            MoodIcon::Cry => "cry",
            MoodIcon::Error => "error",
            MoodIcon::Evil => "evil",
            MoodIcon::Flinch => "flinch",
            MoodIcon::Happy => "happy",
            MoodIcon::Irritate => "irritate",
            MoodIcon::Pop => "pop",
            MoodIcon::Rolled => "rolled",
            MoodIcon::Sad => "sad",
        }
    }
}

impl fmt::Display for MoodIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodIcon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MoodIcon::ALL
            .into_iter()
            .find(|icon| icon.as_str() == wanted)
            .ok_or_else(|| format!("unknown mood icon '{s}'"))
    }
}

/// Something that can render (or record) a mood icon. Must return quickly.
pub trait MoodSink: Send + Sync {
    fn show(&self, icon: MoodIcon);
}

/// Logs icon changes; the default sink when no renderer is attached.
pub struct TracingMoodSink;

impl MoodSink for TracingMoodSink {
    fn show(&self, icon: MoodIcon) {
        tracing::info!(icon = icon.as_str(), "mood");
    }
}

/// Writes the current icon name to a file, replacing it atomically so a
/// renderer polling the file never sees a partial name.
pub struct IconFileSink {
    path: PathBuf,
}

impl IconFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_icon(&self, icon: MoodIcon) -> io::Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", std::process::id()));
        let tmp = PathBuf::from(tmp);
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(icon.as_str().as_bytes())?;
            file.write_all(b"\n")?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl MoodSink for IconFileSink {
    fn show(&self, icon: MoodIcon) {
        if let Err(err) = self.write_icon(icon) {
            tracing::warn!(path = %self.path.display(), %err, "failed to write mood file");
        }
    }
}

/// Shared handle used by every worker that wants to change the face.
#[derive(Clone)]
pub struct DisplayFeedback {
    current: Arc<Mutex<Option<MoodIcon>>>,
    sinks: Arc<Vec<Box<dyn MoodSink>>>,
}

impl DisplayFeedback {
    pub fn new(sinks: Vec<Box<dyn MoodSink>>) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            sinks: Arc::new(sinks),
        }
    }

    /// Log-only display, plus an icon file when `mood_file` is set.
    pub fn from_mood_file(mood_file: Option<&Path>) -> Self {
        let mut sinks: Vec<Box<dyn MoodSink>> = vec![Box::new(TracingMoodSink)];
        if let Some(path) = mood_file {
            sinks.push(Box::new(IconFileSink::new(path)));
        }
        Self::new(sinks)
    }

    /// Show `icon` unless it is already showing. Returns whether sinks were updated.
    ///
    /// The sinks are updated while the lock is held, so they always see icons
    /// in the same order as `current`.
    pub fn show(&self, icon: MoodIcon) -> bool {
        let mut current = lock_or_recover(&self.current, "mood display");
        if *current == Some(icon) {
            return false;
        }
        *current = Some(icon);
        for sink in self.sinks.iter() {
            sink.show(icon);
        }
        true
    }

    /// Icon most recently shown through this handle.
    pub fn current(&self) -> Option<MoodIcon> {
        *lock_or_recover(&self.current, "mood display")
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::recording_display;
    use super::*;

    #[test]
    fn icon_names_round_trip_through_from_str() {
        for icon in MoodIcon::ALL {
            assert_eq!(icon.as_str().parse::<MoodIcon>(), Ok(icon));
        }
        assert_eq!("  HAPPY ".parse::<MoodIcon>(), Ok(MoodIcon::Happy));
        assert!("sleepy".parse::<MoodIcon>().is_err());
    }

    #[test]
    fn redundant_sets_are_suppressed() {
        let (display, sink) = recording_display();
        assert_eq!(display.current(), None);
        assert!(display.show(MoodIcon::Common));
        assert!(!display.show(MoodIcon::Common));
        assert!(display.show(MoodIcon::Irritate));
        assert!(display.show(MoodIcon::Common));
        assert_eq!(
            sink.snapshot(),
            vec![MoodIcon::Common, MoodIcon::Irritate, MoodIcon::Common]
        );
        assert_eq!(display.current(), Some(MoodIcon::Common));
    }

    #[test]
    fn clones_share_suppression_state() {
        let (display, sink) = recording_display();
        let other = display.clone();
        display.show(MoodIcon::Evil);
        assert!(!other.show(MoodIcon::Evil));
        assert_eq!(sink.snapshot(), vec![MoodIcon::Evil]);
    }

    /// Slow to render one icon, so a second `show` races the first.
    struct SlowSink {
        slow: MoodIcon,
        last: Arc<Mutex<Option<MoodIcon>>>,
    }

    impl MoodSink for SlowSink {
        fn show(&self, icon: MoodIcon) {
            if icon == self.slow {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            *self.last.lock().unwrap() = Some(icon);
        }
    }

    #[test]
    fn concurrent_shows_reach_sinks_in_order() {
        let last = Arc::new(Mutex::new(None));
        let display = DisplayFeedback::new(vec![Box::new(SlowSink {
            slow: MoodIcon::Irritate,
            last: Arc::clone(&last),
        })]);
        let remote = display.clone();
        let slow = std::thread::spawn(move || remote.show(MoodIcon::Irritate));
        std::thread::sleep(std::time::Duration::from_millis(10));
        display.show(MoodIcon::Common);
        slow.join().unwrap();

        assert_eq!(*last.lock().unwrap(), display.current());
        if display.current() != Some(MoodIcon::Common) {
            assert!(display.show(MoodIcon::Common));
        }
        assert_eq!(*last.lock().unwrap(), Some(MoodIcon::Common));
    }

    #[test]
    fn icon_file_sink_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood");
        let sink = IconFileSink::new(&path);
        sink.show(MoodIcon::Happy);
        sink.show(MoodIcon::Sad);
        assert_eq!(fs::read_to_string(&path).unwrap(), "sad\n");
        assert_eq!(sink.path(), path.as_path());
    }
}
