//! Error types for safesql.

use thiserror::Error;

/// The main error type for query assembly and filter compilation.
#[derive(Debug, Error)]
pub enum SqlError {
    /// A filter (or nested sub-filter) was not an object.
    #[error("Filter must be an object, got {0}")]
    FilterMustBeObject(&'static str),

    /// `and`/`or` was given something other than an array.
    #[error("'{0}' expects an array of filters")]
    LogicalNotArray(&'static str),

    /// `and`/`or` was given an empty array.
    #[error("'{0}' requires at least one filter")]
    EmptyLogical(&'static str),

    /// A plain field was given an array value.
    #[error("Field '{0}' cannot take an array value; use 'in'/'nin' or 'and'/'or'")]
    ArrayFieldNotAllowed(String),

    /// A filter contributed no clauses.
    #[error("Filter produced no conditions")]
    EmptyFilter,

    /// An operator object produced no clauses.
    #[error("Operator object for field '{0}' produced no conditions")]
    EmptyOperatorObject(String),

    /// An alias block was found inside another alias block.
    #[error("Alias block '${inner}' cannot be nested inside alias '${outer}'")]
    NestedAlias { outer: String, inner: String },

    /// Identifier does not match `^[A-Za-z_][A-Za-z0-9_]*$`.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Dotted field name with an empty or malformed segment.
    #[error("Invalid JSON path '{path}': {reason}")]
    InvalidJsonPath { path: String, reason: &'static str },

    /// Operator name outside the supported set.
    #[error("Unknown operator: '{0}'")]
    UnknownOperator(String),

    /// Operand of the wrong type for an operator.
    #[error("Operator '{operator}' expects {expected}")]
    TypeMismatch {
        operator: &'static str,
        expected: &'static str,
    },

    /// `in`/`nin` with an empty array.
    #[error("Operator '{0}' requires a non-empty array")]
    EmptyArrayNotAllowed(&'static str),

    /// `in`/`nin` with too many items.
    #[error("Operator '{operator}' received {len} items (max {max})")]
    ArrayTooLarge {
        operator: &'static str,
        len: usize,
        max: usize,
    },

    /// Filter nested deeper than the configured limit.
    #[error("Filter nesting exceeds maximum depth of {max}")]
    NestingTooDeep { max: usize },

    /// Filter uses more operators than the configured limit.
    #[error("Filter uses more than {max} operators")]
    TooManyOperators { max: usize },

    /// Value that cannot be bound as a parameter.
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// Binary data used where a plain placeholder is expected.
    #[error("Binary values cannot be interpolated; bind them explicitly")]
    BinaryNotAllowed,

    /// A second statement follows a `;`.
    #[error("Stacked query detected at offset {offset}")]
    StackedQuery { offset: usize },

    /// Quote or block comment left open.
    #[error("Unterminated {0} in SQL text")]
    UnterminatedLiteral(&'static str),

    /// Final SQL text exceeds the length limit.
    #[error("Query is {len} bytes long (max {max})")]
    QueryTooLong { len: usize, max: usize },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`SqlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shape of the filter is wrong.
    Structural,
    /// Column, alias or JSON path rejected.
    Identifier,
    /// Operator name or operand rejected.
    Operator,
    /// Depth or operator-count guard tripped.
    ResourceLimit,
    /// Value cannot become a parameter.
    Coercion,
    /// Final SQL text rejected.
    Assembly,
    /// Configuration or IO failure.
    Config,
}

impl SqlError {
    /// Create an invalid JSON path error.
    pub fn json_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidJsonPath {
            path: path.into(),
            reason,
        }
    }

    /// Create an operand type error.
    pub fn mismatch(operator: &'static str, expected: &'static str) -> Self {
        Self::TypeMismatch { operator, expected }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FilterMustBeObject(_)
            | Self::LogicalNotArray(_)
            | Self::EmptyLogical(_)
            | Self::ArrayFieldNotAllowed(_)
            | Self::EmptyFilter
            | Self::EmptyOperatorObject(_)
            | Self::NestedAlias { .. } => ErrorKind::Structural,
            Self::InvalidIdentifier(_) | Self::InvalidJsonPath { .. } => ErrorKind::Identifier,
            Self::UnknownOperator(_)
            | Self::TypeMismatch { .. }
            | Self::EmptyArrayNotAllowed(_)
            | Self::ArrayTooLarge { .. } => ErrorKind::Operator,
            Self::NestingTooDeep { .. } | Self::TooManyOperators { .. } => {
                ErrorKind::ResourceLimit
            }
            Self::UnsupportedValue(_) | Self::BinaryNotAllowed => ErrorKind::Coercion,
            Self::StackedQuery { .. }
            | Self::UnterminatedLiteral(_)
            | Self::QueryTooLong { .. } => ErrorKind::Assembly,
            Self::Config(_) | Self::Io(_) => ErrorKind::Config,
        }
    }

    /// Whether the error was caused by the input rather than the environment.
    ///
    /// Filters arriving from an API body map these to HTTP 400.
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Config)
    }
}

/// Result type alias for safesql operations.
pub type SqlResult<T> = Result<T, SqlError>;
