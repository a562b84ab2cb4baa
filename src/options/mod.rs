//! Option declaration with per-owner namespace isolation
//!
//! The options system provides:
//! - Validated, typed option descriptors
//! - A shared registry that namespaces colliding names by owner
//! - One clap parser assembled from every component's declarations
//! - A read-only runtime configuration looked up by handle

pub mod assembler;
pub mod builder;
pub mod error;
pub mod owner;
pub mod registrar;
pub mod registry;
pub mod runtime;
pub mod types;

pub use assembler::{COMMAND_FLAGS, GLOBAL_FLAGS, ParserAssembler, SubcommandInfo, parse_bool};
pub use builder::OptionDefBuilder;
pub use error::{EX_SOFTWARE, EX_USAGE, HarnessError, Result};
pub use owner::Owner;
pub use registrar::{ComponentRegistrar, OptionHandle};
pub use registry::{NamespaceRegistry, NamespaceSeparator, RESERVED_NAMES, RegisteredOption};
pub use runtime::{ResolvedOption, RuntimeConfig, ValueSource};
pub use types::{OptionDescriptor, OptionKind, OptionValidator, OptionValue};
