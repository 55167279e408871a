use crate::config::Config;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

///
/// Level
///

#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug, // least severe
    Info,
    Ok,
    Warn,
    Error, // most severe
}

impl Level {
    #[must_use]
    pub fn enabled(self, min: Self) -> bool {
        self >= min
    }
}

///
/// Topic
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum Topic {
    Command,
    Fleet,
    Readiness,
    Rpc,
    Runner,
    Schedule,
    Snapshot,
}

#[macro_export]
macro_rules! log {
    // =========================================
    // INTERNAL
    // =========================================
    (@inner $topic:expr, $level:expr, $fmt:expr $(, $arg:expr)*) => {{
        let message = format!($fmt $(, $arg)*);
        $crate::log::__emit(env!("CARGO_PKG_NAME"), $topic, $level, &message);
    }};

    // =========================================
    // (1) With topic (normal + trailing comma)
    // =========================================
    ($topic:expr, $level:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        $crate::log!(@inner Some($topic), $crate::log::Level::$level, $fmt $(, $arg)*);
    }};

    // =========================================
    // (2) No topic (normal + trailing comma)
    // =========================================
    ($level:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        $crate::log!(@inner None::<$crate::log::Topic>, $crate::log::Level::$level, $fmt $(, $arg)*);
    }};
}

///
/// LogEntry
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogEntry {
    pub crate_name: String,
    pub created_at: u64,
    pub level: Level,
    pub topic: Option<Topic>,
    pub message: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(crate_name: &str, level: Level, topic: Option<Topic>, msg: &str) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        Self {
            crate_name: crate_name.to_string(),
            created_at,
            level,
            topic,
            message: msg.to_string(),
        }
    }
}

///
/// LogBuffer
/// Bounded in-process record of emitted entries; the oldest entry is dropped first.
///

#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

static LOG_BUFFER: Mutex<LogBuffer> = Mutex::new(LogBuffer::new());

impl LogBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, entry: LogEntry, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.entries.len() >= capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Copy of the process-wide buffer, oldest first.
    #[must_use]
    pub fn snapshot() -> Vec<LogEntry> {
        with_buffer(|buf| buf.entries.iter().cloned().collect())
    }

    pub fn clear() {
        with_buffer(|buf| buf.entries.clear());
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn with_buffer<R>(f: impl FnOnce(&mut LogBuffer) -> R) -> R {
    let mut guard = LOG_BUFFER.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

///
/// Helpers
///

#[must_use]
pub fn format_line(level: Level, topic: Option<Topic>, message: &str) -> String {
    let (color, reset) = match level {
        Level::Ok => ("\x1b[32m", "\x1b[0m"),
        Level::Info => ("\x1b[34m", "\x1b[0m"),
        Level::Warn => ("\x1b[33m", "\x1b[0m"),
        Level::Error => ("\x1b[31m", "\x1b[0m"),
        Level::Debug => ("", ""),
    };

    let topic = topic.map(|t| t.to_string()).unwrap_or_default();
    let label = format!("{color}{:^5}{reset}", level.to_string().to_uppercase());

    format!("{label}|{topic:^9}| {message}")
}

#[doc(hidden)]
pub fn __emit(crate_name: &str, topic: Option<Topic>, level: Level, message: &str) {
    let config = Config::get();
    let capacity = usize::try_from(config.log.max_entries).unwrap_or(usize::MAX);

    with_buffer(|buf| buf.push(LogEntry::new(crate_name, level, topic, message), capacity));

    if level.enabled(config.log.level) {
        eprintln!("{}", format_line(level, topic, message));
    }
}

///
/// TESTS
///
