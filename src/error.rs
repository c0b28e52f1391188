use std::fmt;

/// Failure raised by the container, the coercion engine or either bridge.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A required argument was empty or missing.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The key failed the identifier grammar under identifier-only mode.
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    /// Contradictory flags, e.g. unique-pair insertion into a unique-key list.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("duplicate key `{0}`")]
    DuplicateKey(String),

    #[error("cannot convert {from} to {to}: {cause}")]
    TypeConversion {
        from: String,
        to: String,
        cause: Cause,
    },

    #[error("`{type_name}` is missing required property `{property}`")]
    MissingProperty { type_name: String, property: String },

    #[error("member `{member}` belongs to `{expected}`, not `{actual}`")]
    PropertyClassMismatch {
        member: String,
        expected: String,
        actual: String,
    },

    /// Malformed JSON text.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Underlying reason for a failed conversion.
///
/// Either a message produced by the engine itself, or a boxed error from a
/// collaborator (number parsing, uuid parsing, serde).
#[derive(Debug)]
pub enum Cause {
    Message(String),
    Source(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Message(msg) => f.write_str(msg),
            Cause::Source(err) => write!(f, "{err}"),
        }
    }
}

impl Cause {
    pub fn msg(msg: impl Into<String>) -> Self {
        Cause::Message(msg.into())
    }

    pub fn source(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Cause::Source(Box::new(err))
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Short tag naming the error class, e.g. `"DuplicateKey"`.
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            ErrorKind::InvalidArgument { .. } => "InvalidArgument",
            ErrorKind::InvalidIdentifier(_) => "InvalidIdentifier",
            ErrorKind::InvalidConfiguration(_) => "InvalidConfiguration",
            ErrorKind::DuplicateKey(_) => "DuplicateKey",
            ErrorKind::TypeConversion { .. } => "TypeConversionError",
            ErrorKind::MissingProperty { .. } => "MissingProperty",
            ErrorKind::PropertyClassMismatch { .. } => "PropertyClassMismatch",
            ErrorKind::Json(_) => "JsonError",
        }
    }

    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument { name, reason: reason.into() }.into()
    }

    pub(crate) fn conversion(from: impl Into<String>, to: impl Into<String>, cause: Cause) -> Self {
        ErrorKind::TypeConversion {
            from: from.into(),
            to: to.into(),
            cause,
        }
        .into()
    }

    pub(crate) fn missing_property(type_name: &str, property: &str) -> Self {
        ErrorKind::MissingProperty {
            type_name: type_name.to_string(),
            property: property.to_string(),
        }
        .into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        ErrorKind::Json(err).into()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
