//! Namespace registry: who declared what, and under which public name
//!
//! Every declaration first tries to claim its bare name. When a second owner
//! claims a bare name that is already bound, both declarations are rewritten
//! to owner-qualified identifiers (`{owner}.{name}`) and the bare name is
//! marked contested. Contested names stay contested for the life of the
//! registry, so a third owner is namespaced on arrival.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{HarnessError, Result};
use super::owner::Owner;
use super::registrar::{ComponentRegistrar, OptionHandle};
use super::types::OptionDescriptor;

/// Bare names the parser claims for itself
pub const RESERVED_NAMES: [&str; 2] = ["help", "version"];

/// Character placed between owner label and bare name in qualified identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamespaceSeparator {
    #[default]
    Dot,
    Colon,
    Slash,
}

impl NamespaceSeparator {
    pub fn as_char(self) -> char {
        match self {
            NamespaceSeparator::Dot => '.',
            NamespaceSeparator::Colon => ':',
            NamespaceSeparator::Slash => '/',
        }
    }
}

/// One declared option and the public identifier it currently resolves to
#[derive(Debug, Clone)]
pub struct RegisteredOption {
    pub public_id: String,
    pub descriptor: OptionDescriptor,
}

impl RegisteredOption {
    pub fn owner(&self) -> &Owner {
        self.descriptor.owner()
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// True when the public identifier is owner-qualified
    pub fn is_namespaced(&self) -> bool {
        self.public_id != self.descriptor.name()
    }
}

/// Key identifying a declaration independently of its public identifier
pub(crate) type OptionKey = (u64, String);

#[derive(Default)]
struct RegistryState {
    entries: Vec<RegisteredOption>,
    by_public: HashMap<String, usize>,
    by_key: HashMap<OptionKey, usize>,
    contested: HashSet<String>,
    frozen: bool,
}

impl RegistryState {
    /// Fail if `public_id` is already bound to another declaration
    fn ensure_free(&self, public_id: &str, claimant: &Owner) -> Result<()> {
        match self.by_public.get(public_id) {
            Some(&idx) => Err(HarnessError::UnresolvableCollision {
                public_id: public_id.to_string(),
                first: self.entries[idx].owner().to_string(),
                second: claimant.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn bind(&mut self, public_id: String, descriptor: OptionDescriptor) {
        let idx = self.entries.len();
        let key = (descriptor.owner().id(), descriptor.name().to_string());
        self.by_public.insert(public_id.clone(), idx);
        self.by_key.insert(key, idx);
        self.entries.push(RegisteredOption {
            public_id,
            descriptor,
        });
    }
}

/// Per-process table of every option declared by every owner.
///
/// Lifecycle: `new` → any number of declarations through registrars →
/// one assembly, which freezes the table.
pub struct NamespaceRegistry {
    separator: NamespaceSeparator,
    state: RwLock<RegistryState>,
}

impl NamespaceRegistry {
    /// Create a new empty registry using `.` between owner and name
    pub fn new() -> Arc<Self> {
        Self::with_separator(NamespaceSeparator::default())
    }

    pub fn with_separator(separator: NamespaceSeparator) -> Arc<Self> {
        Arc::new(Self {
            separator,
            state: RwLock::new(RegistryState::default()),
        })
    }

    /// Issue a registrar through which `owner` declares its options
    pub fn registrar(self: &Arc<Self>, owner: Owner) -> ComponentRegistrar {
        ComponentRegistrar::new(owner, Arc::clone(self))
    }

    pub fn separator(&self) -> NamespaceSeparator {
        self.separator
    }

    /// Owner-qualified identifier for a name
    pub fn qualify(&self, owner: &Owner, name: &str) -> String {
        format!("{}{}{}", owner.label(), self.separator.as_char(), name)
    }

    /// Register a descriptor, resolving collisions immediately
    pub fn register(&self, descriptor: OptionDescriptor) -> Result<OptionHandle> {
        let mut state = self.state.write();
        if state.frozen {
            return Err(HarnessError::AlreadyAssembled);
        }

        let owner = descriptor.owner().clone();
        let name = descriptor.name().to_string();

        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(HarnessError::UnresolvableCollision {
                public_id: name,
                first: "the built-in parser".to_string(),
                second: owner.to_string(),
            });
        }

        if state.by_key.contains_key(&(owner.id(), name.clone())) {
            return Err(HarnessError::DuplicateOption {
                owner: owner.to_string(),
                name,
            });
        }

        let public_id = if state.contested.contains(&name) {
            let qualified = self.qualify(&owner, &name);
            state.ensure_free(&qualified, &owner)?;
            qualified
        } else if let Some(&idx) = state.by_public.get(&name) {
            let existing_owner = state.entries[idx].owner().clone();
            if existing_owner == owner {
                return Err(HarnessError::DuplicateOption {
                    owner: owner.to_string(),
                    name,
                });
            }

            let existing_qualified = self.qualify(&existing_owner, &name);
            let qualified = self.qualify(&owner, &name);
            if existing_qualified == qualified {
                return Err(HarnessError::UnresolvableCollision {
                    public_id: qualified,
                    first: existing_owner.to_string(),
                    second: owner.to_string(),
                });
            }
            state.ensure_free(&existing_qualified, &existing_owner)?;
            state.ensure_free(&qualified, &owner)?;

            state.by_public.remove(&name);
            state.entries[idx].public_id = existing_qualified.clone();
            state.by_public.insert(existing_qualified.clone(), idx);
            state.contested.insert(name.clone());
            log::debug!(
                "Option '{}' declared by {} and {}; namespaced as '{}' and '{}'",
                name,
                existing_owner,
                owner,
                existing_qualified,
                qualified
            );
            qualified
        } else {
            name.clone()
        };

        log::debug!("Registered option: {} ({})", public_id, owner);
        state.bind(public_id, descriptor);
        Ok(OptionHandle::new(owner, &name))
    }

    /// Freeze the table and hand out its contents for assembly
    pub(crate) fn freeze(&self) -> Result<Vec<RegisteredOption>> {
        let mut state = self.state.write();
        if state.frozen {
            return Err(HarnessError::AlreadyAssembled);
        }
        state.frozen = true;
        log::debug!("Froze options registry with {} options", state.entries.len());
        Ok(state.entries.clone())
    }

    pub fn is_frozen(&self) -> bool {
        self.state.read().frozen
    }

    /// Current public identifier of a declaration
    pub fn public_id_of(&self, handle: &OptionHandle) -> Option<String> {
        let state = self.state.read();
        state
            .by_key
            .get(&handle.key())
            .map(|&idx| state.entries[idx].public_id.clone())
    }

    /// Look up a declaration by its public identifier
    pub fn get(&self, public_id: &str) -> Option<RegisteredOption> {
        let state = self.state.read();
        state
            .by_public
            .get(public_id)
            .map(|&idx| state.entries[idx].clone())
    }

    /// Check if a bare name has ever collided across owners
    pub fn is_contested(&self, name: &str) -> bool {
        self.state.read().contested.contains(name)
    }

    /// All contested bare names, sorted
    pub fn contested(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.read().contested.iter().cloned().collect();
        names.sort();
        names
    }

    /// All declarations in declaration order
    pub fn entries(&self) -> Vec<RegisteredOption> {
        self.state.read().entries.clone()
    }

    /// Declarations made by one owner, in declaration order
    pub fn list_owner(&self, owner: &Owner) -> Vec<RegisteredOption> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|entry| entry.owner() == owner)
            .cloned()
            .collect()
    }

    /// Map of public identifier to `(owner label, bare name)`, sorted by identifier
    pub fn public_mapping(&self) -> Vec<(String, String, String)> {
        let mut mapping: Vec<_> = self
            .state
            .read()
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.public_id.clone(),
                    entry.owner().label().to_string(),
                    entry.name().to_string(),
                )
            })
            .collect();
        mapping.sort();
        mapping
    }

    /// Every owner that declared at least one option, in first-seen order
    pub fn owners(&self) -> Vec<Owner> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        state
            .entries
            .iter()
            .filter(|entry| seen.insert(entry.owner().id()))
            .map(|entry| entry.owner().clone())
            .collect()
    }

    /// Get total number of declared options
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
