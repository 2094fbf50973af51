//! Error types for the launch-description and mount model.

use std::fmt;

/// Errors raised while building or inspecting a stream configuration.
///
/// Variants map to the layer that rejected the input:
///
/// - **Launch syntax**: [`Parse`](Self::Parse), malformed launch descriptions.
/// - **Pipeline parameters**: [`InvalidBitrate`](Self::InvalidBitrate),
///   [`InvalidPayloadType`](Self::InvalidPayloadType),
///   [`MissingElement`](Self::MissingElement),
///   [`Payloader`](Self::Payloader).
/// - **Mounts**: [`InvalidMountPath`](Self::InvalidMountPath),
///   [`DuplicateMount`](Self::DuplicateMount),
///   [`NoMounts`](Self::NoMounts).
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Failed to parse a launch description.
    #[error("launch parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// Encoder bitrate outside the range x264enc accepts.
    #[error("invalid encoder bitrate: {0} kbit/s (expected 1..=2048000)")]
    InvalidBitrate(u32),

    /// RTP payload type is not in the dynamic range.
    #[error("invalid RTP payload type: {0} (expected 96..=127)")]
    InvalidPayloadType(u8),

    /// A required element slot in the description builder is empty.
    #[error("pipeline element not set: {0}")]
    MissingElement(&'static str),

    /// Payloader naming or numbering does not follow the `payN` convention.
    #[error("payloader error: {0}")]
    Payloader(String),

    /// Mount path failed validation.
    #[error("invalid mount path {path:?}: {reason}")]
    InvalidMountPath { path: String, reason: &'static str },

    /// A mount is already registered at this path.
    #[error("mount already registered: {0}")]
    DuplicateMount(String),

    /// Configuration declares no mounts at all.
    #[error("no mounts configured")]
    NoMounts,

    /// Unknown encoder preset or tune name.
    #[error("unknown {what}: {value}")]
    UnknownOption { what: &'static str, value: String },
}

/// Specific kind of launch-description parse failure.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was empty or whitespace only.
    EmptyDescription,
    /// Opening and closing parentheses do not pair up.
    UnbalancedParentheses,
    /// Two `!` links with no element between them.
    EmptyElement,
    /// A property token was not `key=value` or had an unterminated quote.
    InvalidProperty(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "empty description"),
            Self::UnbalancedParentheses => write!(f, "unbalanced parentheses"),
            Self::EmptyElement => write!(f, "empty element in link chain"),
            Self::InvalidProperty(token) => write!(f, "invalid property {token:?}"),
        }
    }
}

impl LaunchError {
    pub(crate) fn parse(kind: ParseErrorKind) -> Self {
        Self::Parse { kind }
    }
}

/// Convenience alias for `Result<T, LaunchError>`.
pub type Result<T> = std::result::Result<T, LaunchError>;
