//! Parsed, read-only option values

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::error::{HarnessError, Result};
use super::owner::Owner;
use super::registrar::OptionHandle;
use super::registry::OptionKey;
use super::types::OptionValue;

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Default,
    CommandLine,
}

/// Final value of one declared option
#[derive(Debug, Clone)]
pub struct ResolvedOption {
    pub public_id: String,
    pub owner: Owner,
    pub name: String,
    pub value: OptionValue,
    pub source: ValueSource,
}

/// Result of assembly: one typed value per `(owner, name)`.
///
/// Created once per run and never mutated afterwards; share it behind an
/// `Arc` with every component that declared options.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    program: String,
    command_path: Vec<String>,
    options: Vec<ResolvedOption>,
    by_key: HashMap<OptionKey, usize>,
    by_public: HashMap<String, usize>,
}

impl RuntimeConfig {
    pub(crate) fn new(
        program: String,
        command_path: Vec<String>,
        options: Vec<ResolvedOption>,
    ) -> Self {
        let mut by_key = HashMap::with_capacity(options.len());
        let mut by_public = HashMap::with_capacity(options.len());
        for (idx, option) in options.iter().enumerate() {
            by_key.insert((option.owner.id(), option.name.clone()), idx);
            by_public.insert(option.public_id.clone(), idx);
        }
        Self {
            program,
            command_path,
            options,
            by_key,
            by_public,
        }
    }

    /// Name the parser was built with
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Top-level subcommand selected on the command line, if any
    pub fn command(&self) -> Option<&str> {
        self.command_path.first().map(String::as_str)
    }

    /// Every subcommand selected, outermost first
    pub fn command_path(&self) -> &[String] {
        &self.command_path
    }

    fn resolve(&self, handle: &OptionHandle) -> Result<&ResolvedOption> {
        self.by_key
            .get(&handle.key())
            .map(|&idx| &self.options[idx])
            .ok_or_else(|| HarnessError::UnknownOption {
                owner: handle.owner().to_string(),
                name: handle.name().to_string(),
            })
    }

    /// Get the value for a handle
    pub fn get(&self, handle: &OptionHandle) -> Result<&OptionValue> {
        self.resolve(handle).map(|option| &option.value)
    }

    /// Whether the value was supplied by the user or is the default
    pub fn source(&self, handle: &OptionHandle) -> Result<ValueSource> {
        self.resolve(handle).map(|option| option.source)
    }

    /// Public identifier the handle was parsed under
    pub fn public_id(&self, handle: &OptionHandle) -> Result<&str> {
        self.resolve(handle).map(|option| option.public_id.as_str())
    }

    /// Look up a value by its public identifier
    pub fn get_public(&self, public_id: &str) -> Option<&OptionValue> {
        self.by_public
            .get(public_id)
            .map(|&idx| &self.options[idx].value)
    }

    fn typed<'a, T>(
        &'a self,
        handle: &OptionHandle,
        expected: &'static str,
        extract: impl FnOnce(&'a OptionValue) -> Option<T>,
    ) -> Result<T> {
        let option = self.resolve(handle)?;
        extract(&option.value).ok_or_else(|| HarnessError::ValueType {
            name: option.public_id.clone(),
            expected,
            actual: option.value.type_name(),
        })
    }

    /// Get bool value
    pub fn get_bool(&self, handle: &OptionHandle) -> Result<bool> {
        self.typed(handle, "bool", OptionValue::as_bool)
    }

    /// Get int value
    pub fn get_int(&self, handle: &OptionHandle) -> Result<i64> {
        self.typed(handle, "int", OptionValue::as_int)
    }

    /// Get float value
    pub fn get_float(&self, handle: &OptionHandle) -> Result<f64> {
        self.typed(handle, "float", OptionValue::as_float)
    }

    /// Get string value (string and enum options)
    pub fn get_string(&self, handle: &OptionHandle) -> Result<&str> {
        self.typed(handle, "string", OptionValue::as_str)
    }

    /// Get the collected values of a repeated option
    pub fn get_list(&self, handle: &OptionHandle) -> Result<&[String]> {
        self.typed(handle, "list", OptionValue::as_list)
    }

    /// Every resolved option in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedOption> {
        self.options.iter()
    }

    /// Values keyed by public identifier, sorted
    pub fn values(&self) -> BTreeMap<&str, &OptionValue> {
        self.options
            .iter()
            .map(|option| (option.public_id.as_str(), &option.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
