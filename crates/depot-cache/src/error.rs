/// Errors from parsing a cache spec string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheSpecError {
    /// An entry is not of the form `key=value`.
    #[error("malformed cache spec entry: {0:?}")]
    MalformedEntry(String),

    /// The key is not a recognized cache option.
    #[error("unknown cache spec key: {0}")]
    UnknownKey(String),

    /// The same key appears more than once.
    #[error("duplicate cache spec key: {0}")]
    DuplicateKey(String),

    /// The value could not be parsed for its key.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Two options that cannot be combined were both given.
    #[error("conflicting cache spec keys: {0} and {1}")]
    Conflict(&'static str, &'static str),
}

/// Result alias for cache spec parsing.
pub type CacheSpecResult<T> = Result<T, CacheSpecError>;
