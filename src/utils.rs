//! Shared utilities for the cache library.

/// Default prefix of request-witness keys.
pub const DEFAULT_WITNESS_PREFIX: &str = "req";

/// Build the request-witness key paired with a result key.
///
/// Format: `{prefix}{key}`
pub fn witness_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

/// Derive the keys an invalidation targets.
pub fn invalidation_targets<K: AsRef<str>>(
    prefix: &str,
    keys: &[K],
    include_witness: bool,
) -> Vec<String> {
    keys.iter()
        .map(|key| {
            if include_witness {
                witness_key(prefix, key.as_ref())
            } else {
                key.as_ref().to_string()
            }
        })
        .collect()
}
