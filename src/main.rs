use anyhow::{Result, anyhow};
use colored::Colorize;

use app_harness::app::{App, CommandSpec, Component};
use app_harness::config::HarnessSettings;
use app_harness::options::{
    self, ComponentRegistrar, EX_SOFTWARE, HarnessError, OptionDefBuilder, OptionHandle,
    RuntimeConfig,
};

/// Pulls records from a remote source
#[derive(Default)]
struct Fetcher {
    retries: Option<OptionHandle>,
    timeout: Option<OptionHandle>,
    verbose: Option<OptionHandle>,
}

impl Component for Fetcher {
    fn owner_label(&self) -> &str {
        "fetch"
    }

    fn declare_options(&mut self, registrar: &ComponentRegistrar) -> options::Result<()> {
        self.retries = Some(registrar.register(
            OptionDefBuilder::new("retries")
                .int_type(3, Some(0), Some(100))
                .help("Attempts per request"),
        )?);
        self.timeout = Some(registrar.register(
            OptionDefBuilder::new("timeout")
                .float_type(2.5, Some(0.0), None)
                .help("Seconds to wait for a response"),
        )?);
        self.verbose = Some(registrar.register(
            OptionDefBuilder::new("verbose")
                .flag_type(false)
                .help("Print every record"),
        )?);
        Ok(())
    }
}

/// Writes records to local storage
#[derive(Default)]
struct Store {
    retries: Option<OptionHandle>,
    include: Option<OptionHandle>,
    mode: Option<OptionHandle>,
}

impl Component for Store {
    fn owner_label(&self) -> &str {
        "store"
    }

    fn declare_options(&mut self, registrar: &ComponentRegistrar) -> options::Result<()> {
        self.retries = Some(registrar.register(
            OptionDefBuilder::new("retries")
                .int_type(5, Some(0), None)
                .help("Attempts per write"),
        )?);
        self.include = Some(registrar.register(
            OptionDefBuilder::new("include")
                .repeated_type(&[])
                .help("Collection to write (repeatable)"),
        )?);
        self.mode = Some(registrar.register(
            OptionDefBuilder::new("mode")
                .enum_type(vec!["append", "replace"], "append")
                .help("How existing data is treated"),
        )?);
        Ok(())
    }
}

fn handle(handle: &Option<OptionHandle>) -> Result<OptionHandle> {
    handle
        .clone()
        .ok_or_else(|| anyhow!("option used before it was declared"))
}

fn info(config: &RuntimeConfig) -> Result<i32> {
    println!("{}", config.program().bold());
    for option in config.iter() {
        let marker = if option.public_id != option.name {
            "*".yellow()
        } else {
            " ".normal()
        };
        println!(
            "{} --{:<16} {:<12} {}",
            marker,
            option.public_id,
            option.owner.label().dimmed(),
            option.value
        );
    }
    Ok(0)
}

fn build_app() -> Result<App> {
    let settings = HarnessSettings::new("harness-demo")
        .about("Demonstrates per-component option namespaces")
        .version(env!("CARGO_PKG_VERSION"))
        .with_log_mgr()
        .with_stats();
    let mut app = App::new(settings)?;

    let mut fetcher = Fetcher::default();
    let mut store = Store::default();
    app.register_components(&mut [&mut fetcher, &mut store])?;

    // Accepted by both commands below, and only by them
    let output = app
        .new_shared_options("output")
        .ok_or_else(|| anyhow!("output options already shared"))?;
    let color = output.register(
        OptionDefBuilder::new("color")
            .flag_type(true)
            .help("Colour the output"),
    )?;

    let ingest_options = app.registrar("ingest");
    let batch = ingest_options.register(
        OptionDefBuilder::new("batch-size")
            .int_type(100, Some(1), None)
            .help("Records written per batch"),
    )?;

    let info_color = color.clone();
    app.register_command(
        CommandSpec::new(
            "info",
            "Show every option with its public name and value.

            Options marked with * were namespaced because another component
            declared the same name.",
            move |config| {
                colored::control::set_override(config.get_bool(&info_color)?);
                info(config)
            },
        )
        .with_options(&output),
    );

    let fetch_retries = handle(&fetcher.retries)?;
    let timeout = handle(&fetcher.timeout)?;
    let verbose = handle(&fetcher.verbose)?;
    let store_retries = handle(&store.retries)?;
    let include = handle(&store.include)?;
    let mode = handle(&store.mode)?;
    app.register_command(
        CommandSpec::new(
            "ingest",
            "Fetch records and write them to the store.",
            move |config| {
                colored::control::set_override(config.get_bool(&color)?);
                let collections = config.get_list(&include)?;
                log::info!(
                    "Ingesting {} collections ({} mode, batches of {})",
                    collections.len(),
                    config.get_string(&mode)?,
                    config.get_int(&batch)?
                );
                println!(
                    "{} fetch retries={} timeout={}s, store retries={}",
                    "→".bright_blue(),
                    config.get_int(&fetch_retries)?,
                    config.get_float(&timeout)?,
                    config.get_int(&store_retries)?
                );
                for collection in collections {
                    if config.get_bool(&verbose)? {
                        println!("  {}", collection.cyan());
                    }
                }
                println!("{} done", "✓".bright_green().bold());
                Ok(0)
            },
        )
        .with_options(&ingest_options)
        .with_options(&output),
    );

    Ok(app)
}

fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<HarnessError>() {
        Some(HarnessError::Cli(clap_err)) => {
            // help and version land here too
            let _ = clap_err.print();
            clap_err.exit_code()
        }
        Some(harness) => {
            eprintln!("{} {}", "✗".bright_red().bold(), harness);
            harness.exit_code()
        }
        None => {
            eprintln!("{} {:#}", "✗".bright_red().bold(), err);
            EX_SOFTWARE
        }
    }
}

fn main() {
    let code = match build_app().and_then(|app| app.run_from_env()) {
        Ok(code) => code,
        Err(err) => report(&err),
    };
    std::process::exit(code);
}
