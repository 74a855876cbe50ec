use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid field.")]
    InvalidField(FieldError),

    #[error("Invalid repeat count.")]
    InvalidCount(i64),

    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("Capture file not found.")]
    FileNotFound(PathBuf),

    #[error("Malformed capture file.")]
    MalformedCapture(String),

    #[error("Inconsistent layers.")]
    InconsistentLayers(String),
}

impl CaptureError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            Self::InvalidField(err) => Some(err.to_string()),
            Self::InvalidCount(count) => {
                Some(format!("Count must be a positive integer, got {count}"))
            },
            Self::IOError(err) => Some(err.to_string()),
            Self::FileNotFound(path) => Some(path.display().to_string()),
            Self::MalformedCapture(reason) => Some(reason.clone()),
            Self::InconsistentLayers(reason) => Some(reason.clone()),
        }
    }
}

impl From<FieldError> for CaptureError {
    fn from(err: FieldError) -> Self {
        Self::InvalidField(err)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Required field `{0}` is missing")]
    Missing(&'static str),

    #[error("Field `{field}` has invalid value `{value}`")]
    InvalidValue { field: &'static str, value: String },

    #[error("Payload of {0} bytes does not fit into the packet")]
    PayloadTooLarge(usize),
}

#[derive(Error, Debug)]
pub enum FirewallError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("Rules file not found.")]
    FileNotFound(PathBuf),

    #[error("Invalid rule.")]
    InvalidRule { line: usize, source: RuleError },

    #[error("Unknown chain.")]
    UnknownChain(String),

    #[error("Chain already exists.")]
    ChainExists(String),

    #[error("Rule index out of range.")]
    IndexOutOfRange { chain: String, index: usize },

    #[error("Rule not found.")]
    RuleNotFound(String),

    #[error("Too many nested jumps.")]
    JumpLoop(String),
}

impl FirewallError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            Self::IOError(err) => Some(err.to_string()),
            Self::FileNotFound(path) => Some(path.display().to_string()),
            Self::InvalidRule { line, source } => Some(format!("Line {line}: {source}")),
            Self::UnknownChain(chain) | Self::ChainExists(chain) => Some(chain.clone()),
            Self::IndexOutOfRange { chain, index } => {
                Some(format!("Chain {chain} has no rule #{index}"))
            },
            Self::RuleNotFound(rule) => Some(rule.clone()),
            Self::JumpLoop(chain) => Some(format!("Jump chain through {chain} never returns")),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Unterminated quote")]
    UnterminatedQuote,

    #[error("Unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{0}` expects an argument")]
    MissingArgument(String),

    #[error("Unknown option `{0}`")]
    UnknownOption(String),

    #[error("Option `{option}` has invalid value `{value}`")]
    InvalidValue { option: String, value: String },

    #[error("Protocol `{0}` is not decoded")]
    UnsupportedProtocol(String),
}
