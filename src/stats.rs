//! Process statistics collaborator
//!
//! Declares `--stats` and `--stats-port` under the `stats` owner and can
//! render a snapshot of the running process. Serving the snapshot is left
//! to the application.

use std::time::Instant;

use bytesize::ByteSize;
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

use crate::logging::sink::current_user;
use crate::options::{
    ComponentRegistrar, OptionDefBuilder, OptionHandle, Result, RuntimeConfig,
    ValueSource,
};

/// Owner label for the stats options
pub const STATS_OWNER: &str = "stats";

pub const DEFAULT_PORT: i64 = 8080;

/// Handles to the stats options
#[derive(Debug, Clone)]
pub struct StatsOptions {
    pub enabled: OptionHandle,
    pub port: OptionHandle,
}

impl StatsOptions {
    pub fn declare(registrar: &ComponentRegistrar) -> Result<Self> {
        let enabled = registrar.register(
            OptionDefBuilder::new("stats")
                .flag_type(false)
                .help("Collect process statistics"),
        )?;
        let port = registrar.register(
            OptionDefBuilder::new("stats-port")
                .int_type(DEFAULT_PORT, Some(1), Some(65535))
                .help("Port the statistics page would be served on"),
        )?;
        Ok(Self { enabled, port })
    }
}

/// Parsed stats settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSettings {
    pub port: u16,
}

impl StatsSettings {
    /// `Some` when `--stats` was given
    pub fn from_config(config: &RuntimeConfig, options: &StatsOptions) -> Result<Option<Self>> {
        if !config.get_bool(&options.enabled)? {
            return Ok(None);
        }
        // The declared range keeps this within u16
        let port = config.get_int(&options.port)?.clamp(1, 65535) as u16;
        Ok(Some(Self { port }))
    }
}

/// Resident memory of this process in bytes, if the platform reports it
pub fn resident_memory() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|process| process.memory())
}

/// Peak resident memory of this process in bytes
#[cfg(unix)]
pub fn peak_memory() -> Option<u64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    let res = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if res != 0 {
        return None;
    }
    // getrusage succeeded, so the struct is filled in
    let usage = unsafe { usage.assume_init() };
    let max = u64::try_from(usage.ru_maxrss).ok()?;
    // ru_maxrss is bytes on macOS and KiB elsewhere
    if cfg!(target_os = "macos") {
        Some(max)
    } else {
        Some(max.saturating_mul(1024))
    }
}

/// Without getrusage the current resident size is the best estimate
#[cfg(not(unix))]
pub fn peak_memory() -> Option<u64> {
    resident_memory()
}

/// Human-readable memory size, e.g. `12.3 MiB`
pub fn format_memory(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

/// Point-in-time view of the running process
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub program: String,
    pub command: Option<String>,
    pub pid: u32,
    pub host: String,
    pub user: String,
    pub uptime_secs: f64,
    pub memory_bytes: Option<u64>,
    pub memory: Option<String>,
    pub peak_memory_bytes: Option<u64>,
    pub option_count: usize,
    /// Options whose public id carries an owner prefix
    pub namespaced_count: usize,
    pub command_line_count: usize,
}

impl StatsSnapshot {
    pub fn collect(started: Instant, config: &RuntimeConfig) -> Self {
        let memory_bytes = resident_memory();
        Self {
            program: config.program().to_string(),
            command: (!config.command_path().is_empty()).then(|| config.command_path().join(" ")),
            pid: std::process::id(),
            host: System::host_name().unwrap_or_else(|| "localhost".to_string()),
            user: current_user(),
            uptime_secs: started.elapsed().as_secs_f64(),
            memory_bytes,
            memory: memory_bytes.map(format_memory),
            peak_memory_bytes: peak_memory(),
            option_count: config.len(),
            namespaced_count: config
                .iter()
                .filter(|option| option.public_id != option.name)
                .count(),
            command_line_count: config
                .iter()
                .filter(|option| option.source == ValueSource::CommandLine)
                .count(),
        }
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
