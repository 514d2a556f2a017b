use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const LOG_MAX_BYTES: u64 = 2 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 128 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_STATE: OnceLock<Mutex<LogState>> = OnceLock::new();

/// Debug log location. The terminal is owned by the relay, so logs never go to stdout.
pub fn log_file_path() -> PathBuf {
    env::var("TTYSPY_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("ttyspy.log"))
}

/// Crash log location (panic location and, with `--log-content`, the payload).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("ttyspy_crash.log")
}

struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    fn open(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn truncate_if_full(&mut self, next_len: usize) {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return;
        }
        if let Ok(file) = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            self.file = file;
            self.bytes_written = 0;
        }
    }

    fn append(&mut self, line: &str) {
        self.truncate_if_full(line.len());
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written = self.bytes_written.saturating_add(line.len() as u64);
        }
    }
}

#[derive(Default)]
struct LogState {
    writer: Option<LogWriter>,
}

fn log_state() -> &'static Mutex<LogState> {
    LOG_STATE.get_or_init(|| Mutex::new(LogState::default()))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn set_enabled(enabled: bool, content_enabled: bool) {
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    LOG_CONTENT_ENABLED.store(enabled && content_enabled, Ordering::Relaxed);
    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    state.writer = if enabled {
        LogWriter::open(log_file_path(), LOG_MAX_BYTES)
    } else {
        None
    };
}

/// Turn file logging on or off from the parsed CLI flags.
pub fn init_logging(config: &AppConfig) {
    set_enabled(config.logging_enabled(), config.log_content);
}

/// Append a line to the debug log. Never include relay text here; use
/// [`log_debug_content`] for anything the caller or operator typed.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", unix_seconds());
    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(writer) = state.writer.as_mut() {
        writer.append(&line);
    }
}

/// Log a line carrying conversation content (only with `--log-content`).
pub fn log_debug_content(msg: &str) {
    if !LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    log_debug(msg);
}

/// Record a panic in the crash log.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        info.payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string())
    } else {
        "payload omitted (log-content disabled)".to_string()
    };
    let line = format!(
        "[{}] panic at {location}: {payload} (v{})\n",
        unix_seconds(),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(mut writer) = LogWriter::open(crash_log_path(), CRASH_LOG_MAX_BYTES) {
        writer.append(&line);
    }
}

#[cfg(test)]
pub(crate) fn set_logging_for_tests(enabled: bool, content_enabled: bool) {
    set_enabled(enabled, content_enabled);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        env::temp_dir().join(format!("ttyspy_{name}_{nanos}.log"))
    }

    #[test]
    fn log_writer_truncates_when_budget_exceeded() {
        let path = scratch_path("rotate");
        let mut writer = LogWriter::open(path.clone(), 16).expect("open log");
        writer.append("0123456789\n");
        writer.append("abcdefghij\n");
        let contents = fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "abcdefghij\n");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn log_writer_discards_oversized_file_on_open() {
        let path = scratch_path("oversized");
        fs::write(&path, "x".repeat(64)).expect("seed log");
        let writer = LogWriter::open(path.clone(), 32).expect("open log");
        assert_eq!(writer.bytes_written, 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn content_logging_requires_base_logging() {
        set_logging_for_tests(false, true);
        assert!(!LOG_CONTENT_ENABLED.load(Ordering::Relaxed));
        set_logging_for_tests(false, false);
    }
}
