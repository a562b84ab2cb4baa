//! Error taxonomy for option declaration, assembly and lookup

use thiserror::Error;

/// Process exit code for bad command-line input (sysexits `EX_USAGE`).
pub const EX_USAGE: i32 = 64;

/// Process exit code for internal programming errors (sysexits `EX_SOFTWARE`).
pub const EX_SOFTWARE: i32 = 70;

/// Everything that can go wrong between `declare` and `get`
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A descriptor failed its own field validation
    #[error("invalid option descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// The same owner declared the same bare name twice
    #[error("option '{name}' is already declared by {owner}")]
    DuplicateOption { owner: String, name: String },

    /// Two distinct owners cannot be told apart after qualification
    #[error("cannot disambiguate '{public_id}': claimed by both {first} and {second}")]
    UnresolvableCollision {
        public_id: String,
        first: String,
        second: String,
    },

    /// User supplied a value that does not fit the option
    #[error("invalid value '{raw}' for --{public_id} (declared by {owner}): {reason}")]
    InvalidOptionValue {
        public_id: String,
        owner: String,
        raw: String,
        reason: String,
    },

    /// The registry was already frozen by an earlier assembly
    #[error("options have already been assembled; the registry is frozen")]
    AlreadyAssembled,

    /// A handle that the registry never issued
    #[error("unknown option '{name}' for {owner}")]
    UnknownOption { owner: String, name: String },

    /// A typed accessor was used on a value of another kind
    #[error("option '{name}' holds {actual}, not {expected}")]
    ValueType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Help, version, unknown arguments and other parser-level failures
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl HarnessError {
    /// Exit code the host program should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Cli(err) => err.exit_code(),
            HarnessError::InvalidOptionValue { .. } => EX_USAGE,
            _ => EX_SOFTWARE,
        }
    }

    /// True for errors caused by user input rather than by the program
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            HarnessError::InvalidOptionValue { .. } | HarnessError::Cli(_)
        )
    }

    pub(crate) fn invalid_descriptor(name: &str, reason: impl Into<String>) -> Self {
        HarnessError::InvalidDescriptor {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let bad_value = HarnessError::InvalidOptionValue {
            public_id: "retries".to_string(),
            owner: "net".to_string(),
            raw: "ten".to_string(),
            reason: "not an integer".to_string(),
        };
        assert_eq!(bad_value.exit_code(), EX_USAGE);
        assert!(bad_value.is_user_facing());

        assert_eq!(HarnessError::AlreadyAssembled.exit_code(), EX_SOFTWARE);
        assert!(!HarnessError::AlreadyAssembled.is_user_facing());
    }

    #[test]
    fn test_invalid_value_message_names_option_and_input() {
        let err = HarnessError::InvalidOptionValue {
            public_id: "A.retries".to_string(),
            owner: "A".to_string(),
            raw: "lots".to_string(),
            reason: "expected an integer".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("--A.retries"));
        assert!(message.contains("'lots'"));
    }
}
