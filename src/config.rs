//! Harness settings and per-application directories

use std::path::PathBuf;

use crate::options::NamespaceSeparator;

/// How an [`App`](crate::app::App) is put together
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub app_name: String,
    pub about: Option<String>,
    pub version: Option<String>,
    pub separator: NamespaceSeparator,
    /// Install the log manager and declare its options
    pub use_log_mgr: bool,
    /// Declare the stats options
    pub use_stats: bool,
}

impl HarnessSettings {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            about: None,
            version: None,
            separator: NamespaceSeparator::default(),
            use_log_mgr: false,
            use_stats: false,
        }
    }

    pub fn about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn separator(mut self, separator: NamespaceSeparator) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_log_mgr(mut self) -> Self {
        self.use_log_mgr = true;
        self
    }

    pub fn with_stats(mut self) -> Self {
        self.use_stats = true;
        self
    }

    pub fn dirs(&self) -> AppDirs {
        AppDirs::new(&self.app_name)
    }
}

/// Conventional per-user directories for one application.
///
/// Nothing is created here; callers create what they write to.
#[derive(Debug, Clone)]
pub struct AppDirs {
    app_name: String,
}

impl AppDirs {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
        }
    }

    fn fallback(&self) -> PathBuf {
        std::env::temp_dir().join(&self.app_name)
    }

    /// Where the application keeps its data
    pub fn user_data_dir(&self) -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join(&self.app_name))
            .unwrap_or_else(|| self.fallback().join("data"))
    }

    /// Where the application reads its configuration
    pub fn user_config_dir(&self) -> PathBuf {
        if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .map(|dir| dir.join(&self.app_name))
                .unwrap_or_else(|| self.fallback().join("config"))
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .map(|dir| dir.join(format!(".{}", self.app_name)))
                .unwrap_or_else(|| self.fallback().join("config"))
        }
    }

    /// Where log files go by default
    pub fn user_log_dir(&self) -> PathBuf {
        let platform_dir = if cfg!(target_os = "macos") {
            dirs::home_dir().map(|home| home.join("Library").join("Logs").join(&self.app_name))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir().map(|dir| dir.join(&self.app_name).join("Logs"))
        } else {
            dirs::state_dir().map(|dir| dir.join(&self.app_name).join("log"))
        };
        platform_dir.unwrap_or_else(|| self.fallback().join("log"))
    }
}
