//! Persistent log sink with console mirroring and fault supervision.
//!
//! Every entry becomes one line in `<directory>/<file-stem>-YYYY-MM-DD.log`
//! and is echoed to the console through `tracing`. When the directory or file
//! cannot be opened the sink keeps running in console-only mode; nothing in
//! here is allowed to take the process down.

use chrono::NaiveDate;
use std::any::Any;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

use crate::application::errors::ConfigError;
use crate::domain::entities::{LogEntry, LogLevel};

pub struct LogSink {
    directory: PathBuf,
    file_stem: String,
    state: Mutex<SinkState>,
}

#[derive(Default)]
struct SinkState {
    file: Option<File>,
    /// Day the open file belongs to
    day: Option<NaiveDate>,
    /// Day whose file could not be opened; already reported
    unavailable: Option<NaiveDate>,
    closed: bool,
}

impl LogSink {
    /// Open today's log file, falling back to console-only logging on failure
    pub fn open(directory: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        let sink = Self {
            directory: directory.into(),
            file_stem: file_stem.into(),
            state: Mutex::new(SinkState::default()),
        };

        let today = chrono::Local::now().date_naive();
        {
            let mut state = sink.lock();
            sink.switch_day(&mut state, today);
        }
        if sink.is_persistent() {
            tracing::info!("Logging to {}", sink.path_for(today).display());
        }
        sink
    }

    /// A sink that never touches the filesystem
    pub fn console_only() -> Self {
        Self {
            directory: PathBuf::new(),
            file_stem: String::new(),
            state: Mutex::new(SinkState {
                closed: true,
                ..SinkState::default()
            }),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{}-{}.log", self.file_stem, day.format("%Y-%m-%d")))
    }

    /// Whether entries currently reach a file
    pub fn is_persistent(&self) -> bool {
        self.lock().file.is_some()
    }

    pub fn log_info(&self, message: impl fmt::Display, context: &str) {
        self.append(LogEntry::new(LogLevel::Info, context, message.to_string()));
    }

    pub fn log_error(&self, err: impl fmt::Display, context: &str) {
        self.append(LogEntry::new(LogLevel::Error, context, err.to_string()));
    }

    pub fn log_panic(&self, recovered: &(dyn Any + Send), context: &str) {
        self.append(LogEntry::new(LogLevel::Panic, context, panic_message(recovered)));
    }

    /// Append one entry to the file and the console as a single unit
    pub fn append(&self, entry: LogEntry) {
        let mut state = self.lock();
        self.write_file(&mut state, &entry);
        mirror(&entry);
    }

    /// Run `unit` on its own task and recover from a panic inside it.
    ///
    /// Returns `None` when the unit panicked or was cancelled; the fault has
    /// been logged by then and the caller just carries on. Dropping the
    /// returned future aborts the unit.
    pub async fn supervise<F>(&self, context: &str, unit: F) -> Option<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut task = AbortOnDrop(tokio::spawn(unit));
        match (&mut task.0).await {
            Ok(output) => Some(output),
            Err(err) if err.is_panic() => {
                let payload = err.into_panic();
                self.log_panic(payload.as_ref(), context);
                continuation_notice();
                None
            }
            Err(err) => {
                self.log_error(format_args!("unit of work cancelled: {}", err), context);
                None
            }
        }
    }

    /// Synchronous counterpart of [`LogSink::supervise`]
    pub fn supervise_sync<T>(&self, context: &str, unit: impl FnOnce() -> T) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(unit)) {
            Ok(output) => Some(output),
            Err(payload) => {
                self.log_panic(payload.as_ref(), context);
                continuation_notice();
                None
            }
        }
    }

    /// Flush and release the log file. Safe to call more than once, and on a
    /// sink that never managed to open a file.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.lock();
        state.closed = true;
        state.day = None;
        match state.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_file(&self, state: &mut SinkState, entry: &LogEntry) {
        if state.closed {
            return;
        }

        let day = entry.timestamp.date_naive();
        if state.day != Some(day) && !self.switch_day(state, day) {
            return;
        }

        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.write_all(entry.to_line().as_bytes()) {
                tracing::error!(
                    "❌ Writing {} failed ({}); console-only until the next day",
                    self.path_for(day).display(),
                    e
                );
                state.file = None;
                state.day = None;
                state.unavailable = Some(day);
            }
        }
    }

    /// Point the sink at `day`'s file. A failure is reported once per day.
    fn switch_day(&self, state: &mut SinkState, day: NaiveDate) -> bool {
        state.file = None;
        state.day = None;
        if state.unavailable == Some(day) {
            return false;
        }

        match self.open_file(day) {
            Ok(file) => {
                state.file = Some(file);
                state.day = Some(day);
                true
            }
            Err(e) => {
                tracing::error!(
                    "❌ Log storage unavailable ({}); continuing with console-only logging",
                    e
                );
                state.unavailable = Some(day);
                false
            }
        }
    }

    fn open_file(&self, day: NaiveDate) -> Result<File, ConfigError> {
        fs::create_dir_all(&self.directory)
            .map_err(|e| ConfigError::storage(&self.directory, e))?;

        let path = self.path_for(day);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ConfigError::storage(path, e))
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Aborts a supervised task once nobody is waiting on it
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn mirror(entry: &LogEntry) {
    match entry.level {
        LogLevel::Info => tracing::info!("ℹ️ {}: {}", entry.context, entry.message),
        LogLevel::Error => tracing::error!("❌ {}: {}", entry.context, entry.message),
        LogLevel::Panic => tracing::error!("💥 PANIC in {}: {}", entry.context, entry.message),
    }
}

fn continuation_notice() {
    tracing::warn!("🔄 Bot will try to keep running...");
}

/// Render a recovered panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
