//! Log file that is opened on the first write

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

/// File names for one process's log.
///
/// The long name is unique per run; the short name is a symlink that
/// always points at the most recent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileNames {
    pub short: String,
    pub long: String,
}

impl LogFileNames {
    pub fn new(program: &str, host: &str, user: &str, started: DateTime<Local>, pid: u32) -> Self {
        let short = format!("{}.log", program);
        let long = format!(
            "{}.{}.{}.{}.{}",
            short,
            host,
            user,
            started.format("%Y%m%d-%H%M%S"),
            pid
        );
        Self { short, long }
    }

    pub fn for_current_process(program: &str) -> Self {
        let host = sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string());
        Self::new(
            program,
            &host,
            &current_user(),
            Local::now(),
            std::process::id(),
        )
    }
}

/// Login name of the user running the process
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[derive(Debug)]
struct SinkState {
    names: LogFileNames,
    output_dir: PathBuf,
    file: Option<File>,
}

impl SinkState {
    fn log_path(&self) -> PathBuf {
        self.output_dir.join(&self.names.long)
    }

    fn open(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            fs::create_dir_all(&self.output_dir)?;
            let path = self.log_path();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            link_latest(&self.output_dir.join(&self.names.short), &self.names.long);
            self.file = Some(file);
        }
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(io::Error::other("log file not open")),
        }
    }
}

// Best effort; a missing symlink never stops logging
#[cfg(unix)]
fn link_latest(link: &Path, target: &str) {
    let _ = fs::remove_file(link);
    let _ = std::os::unix::fs::symlink(target, link);
}

#[cfg(not(unix))]
fn link_latest(_link: &Path, _target: &str) {}

/// Shared writer handed to the logger backend.
///
/// Nothing touches the filesystem until the first record arrives, so the
/// output directory can still be changed after the command line is parsed.
#[derive(Debug, Clone)]
pub struct LogSink {
    state: Arc<Mutex<SinkState>>,
}

impl LogSink {
    pub fn new(names: LogFileNames, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                names,
                output_dir: output_dir.into(),
                file: None,
            })),
        }
    }

    /// Change where the log file will be created.
    ///
    /// Returns false once the file is open; an open file is never moved.
    pub fn set_output_dir(&self, dir: impl Into<PathBuf>) -> bool {
        let mut state = self.state.lock();
        if state.file.is_some() {
            return false;
        }
        state.output_dir = dir.into();
        true
    }

    pub fn output_dir(&self) -> PathBuf {
        self.state.lock().output_dir.clone()
    }

    pub fn names(&self) -> LogFileNames {
        self.state.lock().names.clone()
    }

    /// Full path of this run's log file
    pub fn log_path(&self) -> PathBuf {
        self.state.lock().log_path()
    }

    /// Path of the symlink to the latest log
    pub fn latest_path(&self) -> PathBuf {
        let state = self.state.lock();
        state.output_dir.join(&state.names.short)
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().file.is_some()
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.open()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
