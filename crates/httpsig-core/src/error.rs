//! Configuration error types.

/// Errors raised while parsing an activation property map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A user id was empty.
    #[error("User id must not be empty")]
    EmptyUserId,

    /// A property value could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// The property key.
        key: String,
        /// The rejected raw value.
        value: String,
    },

    /// The key id scheme name is not recognized.
    #[error("Unknown key id scheme: {0}")]
    UnknownKeyIdScheme(String),
}
