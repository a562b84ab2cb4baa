//! Application runner
//!
//! An [`App`] owns the namespace registry for one process. Components
//! declare options through their own registrars, commands are registered
//! as subcommands, and [`App::run`] parses once and dispatches.

pub mod command;

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;

use crate::config::HarnessSettings;
use crate::logging::{LOG_OWNER, LogManager};
use crate::options::{
    self, ComponentRegistrar, EX_USAGE, HarnessError, NamespaceRegistry, Owner, ParserAssembler,
    RuntimeConfig,
};
use crate::stats::{self, STATS_OWNER, StatsOptions, StatsSettings, StatsSnapshot};

pub use command::{CommandHandler, CommandSpec, fill, split_doc, terminal_width};

/// Runs after parsing and before the selected command
pub type AfterParseHook = Box<dyn Fn(&RuntimeConfig) -> Result<()> + Send + Sync>;

/// Something that contributes options and commands to an [`App`].
///
/// All hooks are optional. Across a batch of components, every
/// `declare_options` runs first, then every `register_shared_options`,
/// then every `register_commands`, so commands can attach option sets
/// another component shared.
pub trait Component {
    /// Label shown to users for options this component declares
    fn owner_label(&self) -> &str;

    /// Options accepted by every command
    fn declare_options(&mut self, _registrar: &ComponentRegistrar) -> options::Result<()> {
        Ok(())
    }

    /// Create option sets with [`App::new_shared_options`]
    fn register_shared_options(&mut self, _app: &mut App) -> Result<()> {
        Ok(())
    }

    fn register_commands(&mut self, _app: &mut App) -> Result<()> {
        Ok(())
    }
}

pub struct App {
    settings: HarnessSettings,
    registry: Arc<NamespaceRegistry>,
    commands: Vec<CommandSpec>,
    shared: HashMap<String, ComponentRegistrar>,
    fallback: Option<CommandHandler>,
    hooks: Vec<AfterParseHook>,
    log_manager: Option<LogManager>,
    stats: Option<StatsOptions>,
    config: OnceCell<Arc<RuntimeConfig>>,
    started: Instant,
}

impl App {
    /// Create the app and the collaborators `settings` asks for.
    ///
    /// With the log manager enabled this installs the process logger, so
    /// it may only happen once per process.
    pub fn new(settings: HarnessSettings) -> Result<Self> {
        let registry = NamespaceRegistry::with_separator(settings.separator);
        let mut app = Self {
            registry,
            commands: Vec::new(),
            shared: HashMap::new(),
            fallback: None,
            hooks: Vec::new(),
            log_manager: None,
            stats: None,
            config: OnceCell::new(),
            started: Instant::now(),
            settings,
        };

        if app.settings.use_log_mgr {
            let mut manager =
                LogManager::new(&app.settings.app_name, app.settings.dirs().user_log_dir());
            manager.declare_options(&app.registrar(LOG_OWNER))?;
            manager.install()?;

            let hook_manager = manager.clone();
            app.register_after_parse_hook(move |config| hook_manager.apply(config));
            app.log_manager = Some(manager);
        }

        if app.settings.use_stats {
            let options = StatsOptions::declare(&app.registrar(STATS_OWNER))?;
            let hook_options = options.clone();
            app.register_after_parse_hook(move |config| {
                if let Some(settings) = StatsSettings::from_config(config, &hook_options)? {
                    log::info!("Statistics enabled (port {})", settings.port);
                }
                Ok(())
            });
            app.stats = Some(options);
        }

        Ok(app)
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    pub fn log_manager(&self) -> Option<&LogManager> {
        self.log_manager.as_ref()
    }

    pub fn stats_options(&self) -> Option<&StatsOptions> {
        self.stats.as_ref()
    }

    /// Registrar for a new owner with the given label
    pub fn registrar(&self, label: &str) -> ComponentRegistrar {
        self.registry.registrar(Owner::new(label))
    }

    /// Start a named option set that several commands can accept.
    ///
    /// Returns `None` if a set with that name already exists. Attach it with
    /// [`CommandSpec::with_options`].
    pub fn new_shared_options(&mut self, name: &str) -> Option<ComponentRegistrar> {
        if self.shared.contains_key(name) {
            return None;
        }
        let registrar = self.registrar(name);
        self.shared.insert(name.to_string(), registrar.clone());
        log::debug!("Created shared options {}", name);
        Some(registrar)
    }

    /// An option set created earlier by [`new_shared_options`](Self::new_shared_options)
    pub fn shared_options(&self, name: &str) -> Option<ComponentRegistrar> {
        self.shared.get(name).cloned()
    }

    pub fn register_component(&mut self, component: &mut dyn Component) -> Result<()> {
        self.register_components(&mut [component])
    }

    pub fn register_components(&mut self, components: &mut [&mut dyn Component]) -> Result<()> {
        for component in components.iter_mut() {
            let registrar = self.registrar(component.owner_label());
            component
                .declare_options(&registrar)
                .with_context(|| format!("Failed to declare options for {}", registrar.owner()))?;
        }
        for component in components.iter_mut() {
            component.register_shared_options(self).with_context(|| {
                format!("Failed to share options for {}", component.owner_label())
            })?;
        }
        for component in components.iter_mut() {
            component.register_commands(self).with_context(|| {
                format!("Failed to register commands for {}", component.owner_label())
            })?;
        }
        Ok(())
    }

    pub fn register_command(&mut self, command: CommandSpec) {
        log::debug!("Registered command {}", command.name);
        self.commands.push(command);
    }

    /// Run `handler` when commands exist but none was given
    pub fn set_fallback<F>(&mut self, handler: F)
    where
        F: Fn(&RuntimeConfig) -> Result<i32> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(handler));
    }

    pub fn register_after_parse_hook<F>(&mut self, hook: F)
    where
        F: Fn(&RuntimeConfig) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// The parsed configuration, once [`run`](Self::run) has assembled it
    pub fn config(&self) -> Option<Arc<RuntimeConfig>> {
        self.config.get().cloned()
    }

    fn assembler(&self) -> ParserAssembler {
        let mut assembler = ParserAssembler::new(self.registry.clone(), &self.settings.app_name);
        if let Some(about) = &self.settings.about {
            assembler = assembler.about(about);
        }
        if let Some(version) = &self.settings.version {
            assembler = assembler.version(version);
        }
        for command in &self.commands {
            assembler = assembler.subcommand(command.info());
        }
        assembler
    }

    /// Full `--help` text
    pub fn render_help(&self) -> Result<String> {
        let mut command = self.assembler().build_command(&self.registry.entries())?;
        Ok(command.render_help().to_string())
    }

    /// Snapshot of the running process, if `--stats` was given
    pub fn stats_snapshot(&self) -> Result<Option<StatsSnapshot>> {
        let (Some(options), Some(config)) = (&self.stats, self.config.get()) else {
            return Ok(None);
        };
        if StatsSettings::from_config(config, options)?.is_none() {
            return Ok(None);
        }
        Ok(Some(StatsSnapshot::collect(self.started, config)))
    }

    /// Parse the process arguments and dispatch
    pub fn run_from_env(&self) -> Result<i32> {
        self.run(std::env::args_os())
    }

    /// Parse `args` once, run the after-parse hooks, then the selected
    /// command. Returns the command's exit code.
    pub fn run<I, T>(&self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Arc::new(self.assembler().assemble(args)?);
        self.config
            .set(config.clone())
            .map_err(|_| HarnessError::AlreadyAssembled)?;

        for hook in &self.hooks {
            hook(&config)?;
        }

        let Some((first, rest)) = config.command_path().split_first() else {
            if let Some(fallback) = &self.fallback {
                log::debug!("No command given, calling fallback");
                return fallback(&config);
            }
            if self.commands.is_empty() {
                return Ok(0);
            }
            print!("{}", self.render_help()?);
            return Ok(EX_USAGE);
        };

        let name = config.command_path().join(" ");
        let command = self
            .commands
            .iter()
            .find(|command| &command.name == first)
            .and_then(|command| command.find(rest))
            .ok_or_else(|| anyhow!("No handler registered for command '{}'", name))?;

        log::debug!("Calling command {}", name);
        let code = command
            .call(&config)
            .with_context(|| format!("Command '{}' failed", name))?;

        if let Some(bytes) = stats::peak_memory() {
            log::debug!("Max memory used: {}", stats::format_memory(bytes));
        }
        if let Some(snapshot) = self.stats_snapshot()? {
            log::info!("Statistics: {}", snapshot.render_json()?);
        }
        log::debug!("Command {} finished with code {}", name, code);
        Ok(code)
    }
}
