//! Fluent builder API for creating option descriptors

use super::error::{HarnessError, Result};
use super::owner::Owner;
use super::types::{OptionDescriptor, OptionKind, OptionValidator, OptionValue};

/// Builder for creating option descriptors with a fluent API.
///
/// The owner is supplied at [`build`](Self::build) time, normally by the
/// [`ComponentRegistrar`](super::ComponentRegistrar) doing the declaring.
#[derive(Debug, Clone)]
pub struct OptionDefBuilder {
    name: String,
    help: Option<String>,
    kind: Option<OptionKind>,
    default: Option<OptionValue>,
    validator: Option<OptionValidator>,
}

impl OptionDefBuilder {
    /// Create a new builder for a bare option name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            kind: None,
            default: None,
            validator: None,
        }
    }

    /// Set the help text
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Define as a boolean flag with default value
    pub fn flag_type(mut self, default: bool) -> Self {
        self.kind = Some(OptionKind::Flag);
        self.default = Some(OptionValue::Bool(default));
        self
    }

    /// Define as a signed integer type with default and optional constraints
    pub fn int_type(mut self, default: i64, min: Option<i64>, max: Option<i64>) -> Self {
        self.kind = Some(OptionKind::Int { min, max });
        self.default = Some(OptionValue::Int(default));
        self
    }

    /// Define as a float type with default and optional constraints
    pub fn float_type(mut self, default: f64, min: Option<f64>, max: Option<f64>) -> Self {
        self.kind = Some(OptionKind::Float { min, max });
        self.default = Some(OptionValue::Float(default));
        self
    }

    /// Define as a string type with default value
    pub fn string_type(mut self, default: &str) -> Self {
        self.kind = Some(OptionKind::String);
        self.default = Some(OptionValue::String(default.to_string()));
        self
    }

    /// Define as a repeated option; each occurrence appends a value
    pub fn repeated_type(mut self, default: &[&str]) -> Self {
        self.kind = Some(OptionKind::Repeated);
        self.default = Some(OptionValue::List(
            default.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Define as an enum type with allowed variants and default value
    pub fn enum_type(mut self, variants: Vec<&str>, default: &str) -> Self {
        self.kind = Some(OptionKind::Enum {
            variants: variants.iter().map(|s| s.to_string()).collect(),
        });
        self.default = Some(OptionValue::String(default.to_string()));
        self
    }

    /// Attach an extra validation function
    pub fn validator(mut self, validator: OptionValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Bare option name this builder declares
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the option descriptor for `owner`
    ///
    /// Returns an error if the type is missing or the descriptor is invalid
    pub fn build(self, owner: Owner) -> Result<OptionDescriptor> {
        let (kind, default) = match (self.kind, self.default) {
            (Some(kind), Some(default)) => (kind, default),
            _ => {
                return Err(HarnessError::invalid_descriptor(
                    &self.name,
                    "type is required (use flag_type, int_type, enum_type, etc.)",
                ));
            }
        };

        OptionDescriptor::new(
            owner,
            &self.name,
            kind,
            default,
            self.help.as_deref().unwrap_or_default(),
            self.validator,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_builder() {
        let def = OptionDefBuilder::new("verbose")
            .help("Talk more")
            .flag_type(false)
            .build(Owner::new("test"))
            .unwrap();

        assert_eq!(def.name(), "verbose");
        assert_eq!(def.help(), "Talk more");
        assert!(matches!(def.kind(), OptionKind::Flag));
        assert_eq!(def.default_value(), &OptionValue::Bool(false));
    }

    #[test]
    fn test_int_builder_with_constraints() {
        let def = OptionDefBuilder::new("max-attempts")
            .help("Maximum number of retries")
            .int_type(3, Some(1), Some(10))
            .build(Owner::new("net"))
            .unwrap();

        assert_eq!(def.default_value(), &OptionValue::Int(3));
        match def.kind() {
            OptionKind::Int { min, max } => {
                assert_eq!(*min, Some(1));
                assert_eq!(*max, Some(10));
            }
            _ => panic!("Expected Int kind"),
        }
    }

    #[test]
    fn test_enum_builder() {
        let def = OptionDefBuilder::new("focus")
            .enum_type(vec!["click", "hover"], "hover")
            .build(Owner::new("ui"))
            .unwrap();

        assert_eq!(def.default_value(), &OptionValue::String("hover".to_string()));
        match def.kind() {
            OptionKind::Enum { variants } => assert_eq!(variants.len(), 2),
            _ => panic!("Expected Enum kind"),
        }
    }

    #[test]
    fn test_repeated_builder() {
        let def = OptionDefBuilder::new("include")
            .repeated_type(&["base"])
            .build(Owner::new("paths"))
            .unwrap();
        assert_eq!(
            def.default_value(),
            &OptionValue::List(vec!["base".to_string()])
        );
    }

    #[test]
    fn test_missing_type() {
        let result = OptionDefBuilder::new("option")
            .help("Test")
            .build(Owner::new("test"));

        assert!(matches!(result, Err(HarnessError::InvalidDescriptor { .. })));
    }
}
