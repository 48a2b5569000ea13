/// Error type for cache operations.
///
/// Producer failures are never wrapped in this type; they travel through
/// [`crate::ReplayCache::run`] as the caller's own error. `CacheError` only
/// covers the conversion between typed values and the stored [`crate::Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// A replayed value could not be decoded into the caller's type.
    #[error("cache decode error for key '{key}': {message}")]
    Decode { key: String, message: String },
    /// A value could not be encoded into the cache value model.
    #[error("cache encode error: {0}")]
    Encode(String),
}

impl CacheError {
    /// Create a new decode error.
    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::Decode {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Encode(err.to_string())
    }
}
