//! Per-component handle for declaring options

use std::sync::Arc;

use super::builder::OptionDefBuilder;
use super::error::Result;
use super::owner::Owner;
use super::registry::{NamespaceRegistry, OptionKey};
use super::types::{OptionDescriptor, OptionKind, OptionValidator, OptionValue};

/// Identity of one declared option: `(owner, bare name)`.
///
/// Resolve it against a [`RuntimeConfig`](super::RuntimeConfig) to read the
/// parsed value. The handle stays valid whether or not the public
/// identifier was later namespaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionHandle {
    owner: Owner,
    name: String,
}

impl OptionHandle {
    pub fn new(owner: Owner, name: &str) -> Self {
        Self {
            owner,
            name: name.to_string(),
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self) -> OptionKey {
        (self.owner.id(), self.name.clone())
    }
}

/// Handle a component uses to declare options under its own owner.
///
/// Declarations go straight into the shared registry, so collisions and
/// duplicates are reported at the declaring call site.
#[derive(Clone)]
pub struct ComponentRegistrar {
    owner: Owner,
    registry: Arc<NamespaceRegistry>,
}

impl ComponentRegistrar {
    pub(crate) fn new(owner: Owner, registry: Arc<NamespaceRegistry>) -> Self {
        Self { owner, registry }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    /// Declare one option
    pub fn declare(
        &self,
        name: &str,
        kind: OptionKind,
        default: impl Into<OptionValue>,
        help: &str,
        validator: Option<OptionValidator>,
    ) -> Result<OptionHandle> {
        let descriptor = OptionDescriptor::new(
            self.owner.clone(),
            name,
            kind,
            default.into(),
            help,
            validator,
        )?;
        self.registry.register(descriptor)
    }

    /// Declare an option described with [`OptionDefBuilder`]
    pub fn register(&self, builder: OptionDefBuilder) -> Result<OptionHandle> {
        let descriptor = builder.build(self.owner.clone())?;
        self.registry.register(descriptor)
    }

    /// Public identifier the option currently resolves to
    pub fn public_id(&self, handle: &OptionHandle) -> Option<String> {
        self.registry.public_id_of(handle)
    }
}

impl std::fmt::Debug for ComponentRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistrar")
            .field("owner", &self.owner)
            .finish()
    }
}
