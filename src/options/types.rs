//! Core types for option declarations

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::error::{HarnessError, Result};
use super::owner::Owner;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("option name pattern is valid")
});

/// Owner labels are dot-separated names, e.g. `fetch` or `app.logging`
static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*(\.[A-Za-z][A-Za-z0-9_-]*)*$")
        .expect("owner label pattern is valid")
});

/// Extra check run against every value, including the default.
///
/// Returns a human-readable reason on rejection.
pub type OptionValidator = fn(&OptionValue) -> std::result::Result<(), String>;

/// A strongly-typed option value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
}

impl OptionValue {
    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Float(_) => "float",
            OptionValue::String(_) => "string",
            OptionValue::List(_) => "list",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::String(v) => write!(f, "{}", v),
            OptionValue::List(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        OptionValue::List(v)
    }
}

/// Kind of an option, with the constraints its values must meet
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// Boolean switch: `--name` or `--name=false`
    Flag,
    String,
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Every occurrence appends one string
    Repeated,
    /// One of a fixed set of strings
    Enum {
        variants: Vec<String>,
    },
}

impl OptionKind {
    pub fn int() -> Self {
        OptionKind::Int {
            min: None,
            max: None,
        }
    }

    pub fn float() -> Self {
        OptionKind::Float {
            min: None,
            max: None,
        }
    }

    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptionKind::Enum {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the kind takes a value on the command line
    pub fn takes_value(&self) -> bool {
        !matches!(self, OptionKind::Flag)
    }

    /// Placeholder shown in help output
    pub fn value_name(&self) -> &'static str {
        match self {
            OptionKind::Flag => "BOOL",
            OptionKind::String | OptionKind::Repeated => "VALUE",
            OptionKind::Int { .. } => "INT",
            OptionKind::Float { .. } => "FLOAT",
            OptionKind::Enum { .. } => "CHOICE",
        }
    }

    /// Check the kind itself is well-formed
    fn check(&self) -> std::result::Result<(), String> {
        match self {
            OptionKind::Int {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(format!("minimum {} is above maximum {}", min, max)),
            OptionKind::Float { min, max } => {
                if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
                    return Err("float bounds must not be NaN".to_string());
                }
                match (min, max) {
                    (Some(min), Some(max)) if min > max => {
                        Err(format!("minimum {} is above maximum {}", min, max))
                    }
                    _ => Ok(()),
                }
            }
            OptionKind::Enum { variants } if variants.is_empty() => {
                Err("enum options need at least one variant".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Coerce a value into the representation this kind stores.
    ///
    /// Integers are widened for float options; everything else must match.
    pub fn coerce(&self, value: OptionValue) -> std::result::Result<OptionValue, String> {
        match (self, value) {
            (OptionKind::Float { .. }, OptionValue::Int(v)) => Ok(OptionValue::Float(v as f64)),
            (kind, value) if kind.matches(&value) => Ok(value),
            (kind, value) => Err(format!(
                "expected {} value, got {}",
                kind.type_name(),
                value.type_name()
            )),
        }
    }

    /// Check if a value has the representation this kind stores
    pub fn matches(&self, value: &OptionValue) -> bool {
        matches!(
            (self, value),
            (OptionKind::Flag, OptionValue::Bool(_))
                | (OptionKind::String, OptionValue::String(_))
                | (OptionKind::Int { .. }, OptionValue::Int(_))
                | (OptionKind::Float { .. }, OptionValue::Float(_))
                | (OptionKind::Repeated, OptionValue::List(_))
                | (OptionKind::Enum { .. }, OptionValue::String(_))
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            OptionKind::Flag => "flag",
            OptionKind::String => "string",
            OptionKind::Int { .. } => "int",
            OptionKind::Float { .. } => "float",
            OptionKind::Repeated => "repeated",
            OptionKind::Enum { .. } => "enum",
        }
    }

    /// Validate that a value meets the constraints for this kind
    pub fn validate(&self, value: &OptionValue) -> std::result::Result<(), String> {
        if !self.matches(value) {
            return Err(format!(
                "expected {} value, got {}",
                self.type_name(),
                value.type_name()
            ));
        }

        match (self, value) {
            (OptionKind::Int { min, max }, OptionValue::Int(v)) => {
                if let Some(min) = min {
                    if v < min {
                        return Err(format!("value {} is below minimum {}", v, min));
                    }
                }
                if let Some(max) = max {
                    if v > max {
                        return Err(format!("value {} is above maximum {}", v, max));
                    }
                }
                Ok(())
            }
            (OptionKind::Float { min, max }, OptionValue::Float(v)) => {
                if v.is_nan() {
                    return Err("value is not a number".to_string());
                }
                if let Some(min) = min {
                    if v < min {
                        return Err(format!("value {} is below minimum {}", v, min));
                    }
                }
                if let Some(max) = max {
                    if v > max {
                        return Err(format!("value {} is above maximum {}", v, max));
                    }
                }
                Ok(())
            }
            (OptionKind::Enum { variants }, OptionValue::String(v)) => {
                if !variants.contains(v) {
                    return Err(format!(
                        "'{}' is not one of: {}",
                        v,
                        variants.join(", ")
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Complete, validated declaration of one option
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    owner: Owner,
    name: String,
    kind: OptionKind,
    default: OptionValue,
    help: String,
    validator: Option<OptionValidator>,
}

impl OptionDescriptor {
    /// Build a descriptor, checking every field.
    ///
    /// Fails with [`HarnessError::InvalidDescriptor`] when the name is not
    /// identifier-safe, the owner label is unusable, the kind is malformed,
    /// or the default does not fit the kind or the validator.
    pub fn new(
        owner: Owner,
        name: &str,
        kind: OptionKind,
        default: OptionValue,
        help: &str,
        validator: Option<OptionValidator>,
    ) -> Result<Self> {
        if !NAME_PATTERN.is_match(name) {
            return Err(HarnessError::invalid_descriptor(
                name,
                "names must start with a letter and contain only letters, digits, '_' or '-'",
            ));
        }
        let label = owner.label();
        if !LABEL_PATTERN.is_match(label) {
            return Err(HarnessError::invalid_descriptor(
                name,
                format!(
                    "owner label '{}' must be dot-separated names starting with a letter",
                    label
                ),
            ));
        }
        kind.check()
            .map_err(|reason| HarnessError::invalid_descriptor(name, reason))?;

        let default = kind
            .coerce(default)
            .map_err(|reason| HarnessError::invalid_descriptor(name, format!("default: {}", reason)))?;
        kind.validate(&default)
            .map_err(|reason| HarnessError::invalid_descriptor(name, format!("default: {}", reason)))?;
        if let Some(validator) = validator {
            validator(&default).map_err(|reason| {
                HarnessError::invalid_descriptor(name, format!("default rejected: {}", reason))
            })?;
        }

        Ok(Self {
            owner,
            name: name.to_string(),
            kind,
            default,
            help: help.trim().to_string(),
            validator,
        })
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Bare name, as the component chose it
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn default_value(&self) -> &OptionValue {
        &self.default
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Validate a candidate value against the kind and the validator
    pub fn validate(&self, value: &OptionValue) -> std::result::Result<(), String> {
        self.kind.validate(value)?;
        match self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}
