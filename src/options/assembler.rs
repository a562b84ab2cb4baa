//! Builds the single process-wide parser from every registered option

use std::collections::HashSet;
use std::ffi::OsString;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};

use super::error::{HarnessError, Result};
use super::owner::Owner;
use super::registry::{NamespaceRegistry, RegisteredOption};
use super::runtime::{ResolvedOption, RuntimeConfig, ValueSource};
use super::types::{OptionKind, OptionValue};

/// Heading under which every declared option is listed in `--help`
pub const GLOBAL_FLAGS: &str = "Global flags";

/// Heading for options that only one command (or a few) accept
pub const COMMAND_FLAGS: &str = "Command flags";

/// Metadata for a subcommand the parser should accept.
///
/// Options declared by any of `owners` are accepted by this command only.
/// A command with `children` is a group: one of the children must follow it.
#[derive(Debug, Clone, Default)]
pub struct SubcommandInfo {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub owners: Vec<Owner>,
    pub children: Vec<SubcommandInfo>,
}

impl SubcommandInfo {
    pub fn new(name: &str, summary: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            summary: summary.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Scope the options of `owner` to this command
    pub fn owner(mut self, owner: Owner) -> Self {
        self.owners.push(owner);
        self
    }

    pub fn child(mut self, child: SubcommandInfo) -> Self {
        self.children.push(child);
        self
    }

    fn collect_owners(&self, into: &mut HashSet<u64>) {
        into.extend(self.owners.iter().map(Owner::id));
        for child in &self.children {
            child.collect_owners(into);
        }
    }
}

/// Merges all declarations into one clap parser and parses once.
///
/// Assembly freezes the registry; a second assembly against the same
/// registry fails with [`HarnessError::AlreadyAssembled`].
pub struct ParserAssembler {
    registry: Arc<NamespaceRegistry>,
    program: String,
    about: Option<String>,
    version: Option<String>,
    subcommands: Vec<SubcommandInfo>,
}

impl ParserAssembler {
    pub fn new(registry: Arc<NamespaceRegistry>, program: &str) -> Self {
        Self {
            registry,
            program: program.to_string(),
            about: None,
            version: None,
            subcommands: Vec::new(),
        }
    }

    /// Description shown at the top of `--help`
    pub fn about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Enable `--version`
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn subcommand(mut self, info: SubcommandInfo) -> Self {
        self.subcommands.push(info);
        self
    }

    /// Parse the process arguments
    pub fn assemble_from_env(self) -> Result<RuntimeConfig> {
        self.assemble(std::env::args_os())
    }

    /// Freeze the registry, build the parser and parse `args`.
    ///
    /// The first element of `args` is the program name, as with
    /// [`std::env::args`].
    pub fn assemble<I, T>(self, args: I) -> Result<RuntimeConfig>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let entries = self.registry.freeze()?;
        let command = self.build_command(&entries)?;
        let matches = command.try_get_matches_from(args)?;

        let mut chain = vec![&matches];
        let mut path = Vec::new();
        let mut current = &matches;
        while let Some((name, sub)) = current.subcommand() {
            path.push(name.to_string());
            chain.push(sub);
            current = sub;
        }

        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            resolved.push(resolve_entry(entry, &chain)?);
        }

        log::debug!(
            "Assembled {} options for {} (command: {:?})",
            resolved.len(),
            self.program,
            path
        );
        Ok(RuntimeConfig::new(self.program, path, resolved))
    }

    /// Build the clap command without parsing, e.g. to render help
    pub fn build_command(&self, entries: &[RegisteredOption]) -> Result<Command> {
        let mut scoped = HashSet::new();
        for info in &self.subcommands {
            info.collect_owners(&mut scoped);
        }

        let mut command = Command::new(self.program.clone())
            .args_override_self(true)
            .next_help_heading(GLOBAL_FLAGS);
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }
        if let Some(version) = &self.version {
            command = command.version(version.clone());
        }

        let global: Vec<&RegisteredOption> = entries
            .iter()
            .filter(|entry| !scoped.contains(&entry.owner().id()))
            .collect();
        Ok(build_level(command, &global, &[], &self.subcommands, entries))
    }
}

fn is_repeated(entry: &RegisteredOption) -> bool {
    matches!(entry.descriptor.kind(), OptionKind::Repeated)
}

/// Add `introduced` to `command` and recurse into `children`.
///
/// Single-valued options are placed once, global when the level has
/// children, so the deepest occurrence wins. Clap keeps only one level's
/// values for a global appending arg, so repeated options are instead
/// copied onto every level below the one that introduced them and the
/// levels are merged when resolving.
fn build_level(
    mut command: Command,
    introduced: &[&RegisteredOption],
    repeated_above: &[&RegisteredOption],
    children: &[SubcommandInfo],
    entries: &[RegisteredOption],
) -> Command {
    let has_children = !children.is_empty();
    for entry in introduced {
        command = command.arg(build_arg(entry, has_children && !is_repeated(entry)));
    }
    for entry in repeated_above {
        command = command.arg(build_arg(entry, false));
    }
    if !has_children {
        return command;
    }

    let mut repeated: Vec<&RegisteredOption> = repeated_above.to_vec();
    repeated.extend(introduced.iter().copied().filter(|entry| is_repeated(entry)));

    for info in children {
        let scoped: Vec<&RegisteredOption> = entries
            .iter()
            .filter(|entry| info.owners.contains(entry.owner()))
            .collect();
        let mut sub = Command::new(info.name.clone())
            .args_override_self(true)
            .about(info.summary.clone())
            .long_about(info.description.clone())
            .next_help_heading(COMMAND_FLAGS);
        if !info.children.is_empty() {
            sub = sub.subcommand_required(true);
        }
        command = command.subcommand(build_level(sub, &scoped, &repeated, &info.children, entries));
    }
    command
}

fn help_text(entry: &RegisteredOption) -> String {
    let descriptor = &entry.descriptor;
    let mut help = descriptor.help().to_string();

    if let OptionKind::Enum { variants } = descriptor.kind() {
        help.push_str(&format!(" [choices: {}]", variants.join(", ")));
    }

    let default = descriptor.default_value();
    let show_default = match default {
        OptionValue::Bool(v) => *v,
        OptionValue::List(v) => !v.is_empty(),
        OptionValue::String(v) => !v.is_empty(),
        _ => true,
    };
    if show_default {
        help.push_str(&format!(" [default: {}]", default));
    }

    help.trim().to_string()
}

fn build_arg(entry: &RegisteredOption, global: bool) -> Arg {
    let id = entry.public_id.clone();
    let kind = entry.descriptor.kind();

    let arg = Arg::new(id.clone())
        .long(id)
        .help(help_text(entry))
        .value_name(kind.value_name())
        .global(global);

    match kind {
        OptionKind::Flag => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .action(ArgAction::Set),
        // Hyphenated values reach conversion, which names the option in its error
        OptionKind::Repeated => arg
            .num_args(1)
            .allow_hyphen_values(true)
            .action(ArgAction::Append),
        OptionKind::Int { .. }
        | OptionKind::Float { .. }
        | OptionKind::String
        | OptionKind::Enum { .. } => arg
            .num_args(1)
            .allow_hyphen_values(true)
            .action(ArgAction::Set),
    }
}

/// Parse a boolean the way people type one
pub fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected a boolean (true/false, yes/no, on/off, 1/0)".to_string()),
    }
}

fn convert(kind: &OptionKind, raw: &str) -> std::result::Result<OptionValue, String> {
    match kind {
        OptionKind::Flag => parse_bool(raw).map(OptionValue::Bool),
        OptionKind::Int { .. } => raw
            .trim()
            .parse::<i64>()
            .map(OptionValue::Int)
            .map_err(|e| format!("expected an integer ({})", e)),
        OptionKind::Float { .. } => raw
            .trim()
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|e| format!("expected a number ({})", e)),
        OptionKind::String | OptionKind::Enum { .. } => Ok(OptionValue::String(raw.to_string())),
        OptionKind::Repeated => Ok(OptionValue::List(vec![raw.to_string()])),
    }
}

/// Find the value for `entry` along the selected command chain, root first
fn resolve_entry(entry: RegisteredOption, chain: &[&ArgMatches]) -> Result<ResolvedOption> {
    let id = entry.public_id.as_str();
    let descriptor = &entry.descriptor;

    let supplied: Option<(String, OptionValue)> = match descriptor.kind() {
        OptionKind::Repeated => {
            let values: Vec<String> = chain
                .iter()
                .filter_map(|matches| matches.try_get_many::<String>(id).ok().flatten())
                .flatten()
                .cloned()
                .collect();
            (!values.is_empty()).then(|| (values.join(","), OptionValue::List(values)))
        }
        kind => match chain
            .iter()
            .rev()
            .find_map(|matches| matches.try_get_one::<String>(id).ok().flatten())
        {
            Some(raw) => {
                let value = convert(kind, raw).map_err(|reason| invalid(&entry, raw, reason))?;
                Some((raw.clone(), value))
            }
            None => None,
        },
    };

    let (value, source) = match supplied {
        Some((raw, value)) => {
            descriptor
                .validate(&value)
                .map_err(|reason| invalid(&entry, &raw, reason))?;
            (value, ValueSource::CommandLine)
        }
        None => (descriptor.default_value().clone(), ValueSource::Default),
    };

    Ok(ResolvedOption {
        owner: descriptor.owner().clone(),
        name: descriptor.name().to_string(),
        public_id: entry.public_id,
        value,
        source,
    })
}

fn invalid(entry: &RegisteredOption, raw: &str, reason: String) -> HarnessError {
    HarnessError::InvalidOptionValue {
        public_id: entry.public_id.clone(),
        owner: entry.owner().label().to_string(),
        raw: raw.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionKind, Owner};

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("prog")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("on"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_flag_forms() {
        let registry = NamespaceRegistry::new();
        let registrar = registry.registrar(Owner::new("A"));
        let verbose = registrar
            .declare("verbose", OptionKind::Flag, false, "Talk more", None)
            .unwrap();
        let color = registrar
            .declare("color", OptionKind::Flag, true, "Use colour", None)
            .unwrap();

        let config = ParserAssembler::new(registry, "prog")
            .assemble(args(&["--verbose", "--color=false"]))
            .unwrap();

        assert!(config.get_bool(&verbose).unwrap());
        assert!(!config.get_bool(&color).unwrap());
    }

    #[test]
    fn test_last_occurrence_wins() {
        let registry = NamespaceRegistry::new();
        let depth = registry
            .registrar(Owner::new("A"))
            .declare("depth", OptionKind::int(), 0, "", None)
            .unwrap();

        let config = ParserAssembler::new(registry, "prog")
            .assemble(args(&["--depth", "1", "--depth=-2"]))
            .unwrap();

        assert_eq!(config.get_int(&depth).unwrap(), -2);
    }

    #[test]
    fn test_repeated_collects_every_occurrence() {
        let registry = NamespaceRegistry::new();
        let include = registry
            .registrar(Owner::new("A"))
            .declare(
                "include",
                OptionKind::Repeated,
                vec!["base".to_string()],
                "",
                None,
            )
            .unwrap();

        let config = ParserAssembler::new(registry, "prog")
            .assemble(args(&["--include", "x", "--include", "y"]))
            .unwrap();

        assert_eq!(
            config.get_list(&include).unwrap(),
            ["x".to_string(), "y".to_string()]
        );
        assert_eq!(config.source(&include).unwrap(), ValueSource::CommandLine);
    }

    #[test]
    fn test_enum_rejects_unknown_variant() {
        let registry = NamespaceRegistry::new();
        registry
            .registrar(Owner::new("A"))
            .declare(
                "mode",
                OptionKind::enumeration(["fast", "slow"]),
                "fast",
                "",
                None,
            )
            .unwrap();

        let result = ParserAssembler::new(registry, "prog").assemble(args(&["--mode", "warp"]));

        assert!(matches!(
            result,
            Err(HarnessError::InvalidOptionValue { ref raw, .. }) if raw == "warp"
        ));
    }

    #[test]
    fn test_unknown_argument_is_cli_error() {
        let registry = NamespaceRegistry::new();
        let result = ParserAssembler::new(registry, "prog").assemble(args(&["--nope"]));

        match result {
            Err(err @ HarnessError::Cli(_)) => assert_eq!(err.exit_code(), 2),
            other => panic!("expected a clap error, got {:?}", other),
        }
    }

    #[test]
    fn test_options_accepted_after_subcommand() {
        let registry = NamespaceRegistry::new();
        let depth = registry
            .registrar(Owner::new("A"))
            .declare("depth", OptionKind::int(), 0, "", None)
            .unwrap();

        let config = ParserAssembler::new(registry, "prog")
            .subcommand(SubcommandInfo::new("dive", "Go down", "Go down"))
            .assemble(args(&["--depth", "1", "dive", "--depth", "30"]))
            .unwrap();

        assert_eq!(config.command(), Some("dive"));
        assert_eq!(config.command_path(), ["dive".to_string()]);
        assert_eq!(config.get_int(&depth).unwrap(), 30);
    }

    #[test]
    fn test_help_lists_defaults_and_choices() {
        let registry = NamespaceRegistry::new();
        registry
            .registrar(Owner::new("A"))
            .declare(
                "mode",
                OptionKind::enumeration(["fast", "slow"]),
                "fast",
                "Speed",
                None,
            )
            .unwrap();

        let entries = registry.entries();
        let mut command = ParserAssembler::new(registry, "prog")
            .build_command(&entries)
            .unwrap();
        let help = command.render_help().to_string();

        assert!(help.contains("--mode"));
        assert!(help.contains("[choices: fast, slow]"));
        assert!(help.contains("[default: fast]"));
    }

    #[test]
    fn test_repeated_merges_across_subcommand() {
        let registry = NamespaceRegistry::new();
        let include = registry
            .registrar(Owner::new("A"))
            .declare("include", OptionKind::Repeated, Vec::<String>::new(), "", None)
            .unwrap();

        let config = ParserAssembler::new(registry, "prog")
            .subcommand(SubcommandInfo::new("go", "", ""))
            .assemble(args(&["--include", "x", "go", "--include", "y"]))
            .unwrap();

        assert_eq!(
            config.get_list(&include).unwrap(),
            ["x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn test_hyphenated_bad_value_names_option() {
        let registry = NamespaceRegistry::new();
        registry
            .registrar(Owner::new("A"))
            .declare("retries", OptionKind::int(), 0, "", None)
            .unwrap();

        let err = ParserAssembler::new(registry, "prog")
            .assemble(args(&["--retries", "-x"]))
            .unwrap_err();

        assert!(matches!(
            err,
            HarnessError::InvalidOptionValue { ref public_id, ref raw, .. }
                if public_id == "retries" && raw == "-x"
        ));
        assert_eq!(err.exit_code(), crate::options::EX_USAGE);
    }

    #[test]
    fn test_scoped_options_only_on_their_command() {
        let registry = NamespaceRegistry::new();
        let dance = Owner::new("dance");
        let now = registry
            .registrar(dance.clone())
            .declare("now", OptionKind::Flag, false, "Now or later", None)
            .unwrap();

        let build = |registry| {
            ParserAssembler::new(registry, "prog")
                .subcommand(SubcommandInfo::new("dance", "", "").owner(dance.clone()))
                .subcommand(SubcommandInfo::new("process", "", ""))
        };

        let config = build(registry.clone())
            .assemble(args(&["dance", "--now"]))
            .unwrap();
        assert!(config.get_bool(&now).unwrap());

        let other = NamespaceRegistry::new();
        other
            .registrar(dance.clone())
            .declare("now", OptionKind::Flag, false, "", None)
            .unwrap();
        let result = build(other).assemble(args(&["process", "--now"]));
        assert!(matches!(result, Err(HarnessError::Cli(_))));
    }

    #[test]
    fn test_nested_subcommands() {
        let registry = NamespaceRegistry::new();
        let change = Owner::new("change-depth");
        let registrar = registry.registrar(change.clone());
        let rate = registrar.declare("rate", OptionKind::int(), 1, "", None).unwrap();
        let depth = registrar.declare("depth", OptionKind::int(), 0, "", None).unwrap();

        let config = ParserAssembler::new(registry, "prog")
            .subcommand(
                SubcommandInfo::new("sub", "", "").child(
                    SubcommandInfo::new("marine", "", "").child(
                        SubcommandInfo::new("change-depth", "", "").owner(change),
                    ),
                ),
            )
            .assemble(args(&["sub", "marine", "change-depth", "--rate", "3", "--depth=20"]))
            .unwrap();

        assert_eq!(config.command(), Some("sub"));
        assert_eq!(
            config.command_path(),
            ["sub".to_string(), "marine".to_string(), "change-depth".to_string()]
        );
        assert_eq!(config.get_int(&rate).unwrap(), 3);
        assert_eq!(config.get_int(&depth).unwrap(), 20);
    }

    #[test]
    fn test_group_requires_a_child() {
        let registry = NamespaceRegistry::new();
        let result = ParserAssembler::new(registry, "prog")
            .subcommand(SubcommandInfo::new("sub", "", "").child(SubcommandInfo::new("atomic", "", "")))
            .assemble(args(&["sub"]));

        assert!(matches!(result, Err(HarnessError::Cli(_))));
    }
}
