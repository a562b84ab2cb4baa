//! Subcommands an [`App`](super::App) can dispatch to

use std::fmt;

use crate::options::{ComponentRegistrar, Owner, RuntimeConfig, SubcommandInfo};

/// Runs a command and returns its exit code
pub type CommandHandler = Box<dyn Fn(&RuntimeConfig) -> anyhow::Result<i32> + Send + Sync>;

/// Width used when the terminal size is unknown
pub const DEFAULT_WIDTH: usize = 80;

/// A command, or a group of nested commands.
///
/// Options from every attached registrar are accepted by this command only.
pub struct CommandSpec {
    pub name: String,
    pub summary: String,
    pub description: String,
    owners: Vec<Owner>,
    children: Vec<CommandSpec>,
    handler: Option<CommandHandler>,
}

impl CommandSpec {
    /// `name` has underscores turned into dashes. The first line of `doc`
    /// is the summary; the whole text, reflowed, is the description.
    pub fn new<F>(name: &str, doc: &str, handler: F) -> Self
    where
        F: Fn(&RuntimeConfig) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        let mut command = Self::group(name, doc);
        command.handler = Some(Box::new(handler));
        command
    }

    /// A command that only holds subcommands
    pub fn group(name: &str, doc: &str) -> Self {
        let (summary, description) = split_doc(doc, terminal_width());
        Self {
            name: name.replace('_', "-"),
            summary,
            description,
            owners: Vec::new(),
            children: Vec::new(),
            handler: None,
        }
    }

    /// Accept the options declared through `registrar` on this command
    pub fn with_options(mut self, registrar: &ComponentRegistrar) -> Self {
        self.owners.push(registrar.owner().clone());
        self
    }

    pub fn subcommand(mut self, child: CommandSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(&self) -> &[CommandSpec] {
        &self.children
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn call(&self, config: &RuntimeConfig) -> anyhow::Result<i32> {
        match &self.handler {
            Some(handler) => handler(config),
            None => anyhow::bail!("'{}' needs a subcommand", self.name),
        }
    }

    /// Follow `path` (names below this command) to the selected command
    pub fn find(&self, path: &[String]) -> Option<&CommandSpec> {
        match path.split_first() {
            None => Some(self),
            Some((next, rest)) => self
                .children
                .iter()
                .find(|child| &child.name == next)
                .and_then(|child| child.find(rest)),
        }
    }

    pub fn info(&self) -> SubcommandInfo {
        SubcommandInfo {
            name: self.name.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            owners: self.owners.clone(),
            children: self.children.iter().map(CommandSpec::info).collect(),
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Columns available for help text; `COLUMNS` wins over the terminal
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.trim().parse().ok())
        .or_else(|| terminal_size::terminal_size().map(|(terminal_size::Width(w), _)| usize::from(w)))
        .unwrap_or(DEFAULT_WIDTH)
}

/// Greedy word wrap; words longer than `width` get a line of their own
pub fn fill(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}

/// Split doc text into (summary, description).
///
/// The first line stands alone as the summary and first paragraph. Later
/// paragraphs are separated by blank lines and filled to `width`.
pub fn split_doc(doc: &str, width: usize) -> (String, String) {
    let mut lines = doc.lines().map(str::trim).skip_while(|line| line.is_empty());

    let mut paragraphs: Vec<String> = Vec::new();
    if let Some(first) = lines.next() {
        paragraphs.push(fill(first, width));
    }

    let mut current: Vec<&str> = Vec::new();
    for line in lines {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(fill(&current.join(" "), width));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(fill(&current.join(" "), width));
    }

    let summary = paragraphs.first().cloned().unwrap_or_default();
    (summary, paragraphs.join("\n\n"))
}
