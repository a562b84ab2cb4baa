//! Owner identity for registering components

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a component that declares options.
///
/// Equality is by token, never by label: two owners created with the same
/// label are still different owners. The label is only used to build
/// qualified public identifiers (`{label}.{name}`) and error messages.
#[derive(Clone)]
pub struct Owner {
    id: u64,
    label: Arc<str>,
}

impl Owner {
    /// Allocate a fresh owner with a process-unique token
    pub fn new(label: impl Into<String>) -> Self {
        let label: String = label.into();
        Self {
            id: NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed),
            label: Arc::from(label),
        }
    }

    /// Owner for the current module, e.g. `Owner::for_module(module_path!())`.
    ///
    /// Rust paths use `::`; they are rewritten to dots so the label reads
    /// like a dotted module path on the command line.
    pub fn for_module(path: &str) -> Self {
        Self::new(path.replace("::", "."))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Owner {}

impl std::hash::Hash for Owner {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner({}#{})", self.label, self.id)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.label)
    }
}
