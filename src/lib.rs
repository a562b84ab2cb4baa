pub mod app;
pub mod config;
pub mod logging;
pub mod options;
pub mod stats;

pub use app::{App, CommandSpec, Component};
pub use config::{AppDirs, HarnessSettings};
pub use options::{HarnessError, OptionHandle, OptionKind, OptionValue, RuntimeConfig};
