//! Log manager
//!
//! Records go to a per-run file through `env_logger` with a pipe target.
//! The level and directory are ordinary options owned by `log`, applied
//! after the command line is parsed.

pub mod format;
pub mod sink;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::options::{ComponentRegistrar, OptionDefBuilder, OptionHandle, RuntimeConfig};

pub use format::write_record;
pub use sink::{LogFileNames, LogSink};

/// Owner label for the log manager's options
pub const LOG_OWNER: &str = "log";

/// Accepted values for `--log-level`
pub const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Level in effect until the command line says otherwise
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

/// Handles to the log manager's options
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub level: OptionHandle,
    pub dir: OptionHandle,
}

impl LogOptions {
    pub fn declare(registrar: &ComponentRegistrar, default_dir: &Path) -> crate::options::Result<Self> {
        let level = registrar.register(
            OptionDefBuilder::new("log-level")
                .enum_type(LEVELS.to_vec(), "warn")
                .help("Minimum severity written to the log file"),
        )?;
        let dir = registrar.register(
            OptionDefBuilder::new("log-dir")
                .string_type(&default_dir.to_string_lossy())
                .help("Directory for log files"),
        )?;
        Ok(Self { level, dir })
    }
}

/// Parse a level name as accepted by `--log-level`
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.parse().ok()
}

/// File sink plus the options that steer it
#[derive(Debug, Clone)]
pub struct LogManager {
    sink: LogSink,
    options: Option<LogOptions>,
}

impl LogManager {
    /// Create a manager for `program`; nothing is installed yet
    pub fn new(program: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sink: LogSink::new(LogFileNames::for_current_process(program), output_dir),
            options: None,
        }
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn options(&self) -> Option<&LogOptions> {
        self.options.as_ref()
    }

    /// Declare `log-level` and `log-dir`, defaulting the directory to the
    /// sink's current one
    pub fn declare_options(&mut self, registrar: &ComponentRegistrar) -> crate::options::Result<&LogOptions> {
        let options = LogOptions::declare(registrar, &self.sink.output_dir())?;
        Ok(self.options.insert(options))
    }

    /// Install the sink as the process logger.
    ///
    /// The backend accepts every level; `log::max_level` does the gating so
    /// the level can change after installation.
    pub fn install(&self) -> Result<()> {
        Builder::new()
            .filter_level(LevelFilter::Trace)
            .format(|buf, record| write_record(buf, Local::now(), record))
            .target(Target::Pipe(Box::new(self.sink.clone())))
            .try_init()
            .context("A logger is already installed")?;
        log::set_max_level(DEFAULT_LEVEL);
        Ok(())
    }

    /// Apply the parsed level and directory
    pub fn apply(&self, config: &RuntimeConfig) -> Result<()> {
        let Some(options) = &self.options else {
            return Ok(());
        };

        let level_name = config.get_string(&options.level)?;
        let level = parse_level(level_name)
            .with_context(|| format!("Unknown log level '{}'", level_name))?;
        log::set_max_level(level);

        let dir = PathBuf::from(config.get_string(&options.dir)?);
        if !self.sink.set_output_dir(&dir) {
            log::warn!(
                "Log file already open in {}, ignoring --log-dir {}",
                self.sink.output_dir().display(),
                dir.display()
            );
        }
        log::debug!("Logging at {} to {}", level, self.sink.log_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{NamespaceRegistry, Owner, ParserAssembler};
    use tempfile::TempDir;

    #[test]
    fn test_level_names() {
        for name in LEVELS {
            assert!(parse_level(name).is_some(), "{} should parse", name);
        }
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_options_steer_the_sink() {
        let temp = TempDir::new().unwrap();
        let registry = NamespaceRegistry::new();
        let mut manager = LogManager::new("demo", temp.path().join("default"));
        manager
            .declare_options(&registry.registrar(Owner::new(LOG_OWNER)))
            .unwrap();

        let target = temp.path().join("chosen");
        let config = ParserAssembler::new(registry.clone(), "demo")
            .assemble([
                "demo".to_string(),
                "--log-level=info".to_string(),
                format!("--log-dir={}", target.display()),
            ])
            .unwrap();

        let options = manager.options().unwrap();
        assert_eq!(config.get_string(&options.level).unwrap(), "info");

        manager.apply(&config).unwrap();
        assert_eq!(manager.sink().output_dir(), target);
        assert!(!manager.sink().is_open());
    }

    #[test]
    fn test_default_dir_is_sink_dir() {
        let temp = TempDir::new().unwrap();
        let registry = NamespaceRegistry::new();
        let mut manager = LogManager::new("demo", temp.path());
        manager
            .declare_options(&registry.registrar(Owner::new(LOG_OWNER)))
            .unwrap();

        let config = ParserAssembler::new(registry.clone(), "demo")
            .assemble(["demo"])
            .unwrap();

        let options = manager.options().unwrap();
        assert_eq!(
            config.get_string(&options.dir).unwrap(),
            temp.path().to_string_lossy()
        );
        assert_eq!(config.get_string(&options.level).unwrap(), "warn");
    }
}
