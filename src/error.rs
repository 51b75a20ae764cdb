use thiserror::Error;

/// Errors returned by map operations.
///
/// Absence or prior expiration of a key is never an error; reads report
/// it as a missing value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The supplied TTL was below the one-second minimum.
    #[error("ttl_seconds must be at least 1, got {ttl_seconds}")]
    InvalidTtl {
        /// The rejected TTL value.
        ttl_seconds: u64,
    },

    /// An integer operation addressed a live value of another type.
    #[error("expected an integer value, got {actual}")]
    TypeMismatch {
        /// Type name of the value actually stored.
        actual: &'static str,
    },
}

impl MapError {
    /// Returns `true` if this error is an invalid TTL.
    pub fn is_invalid_ttl(&self) -> bool {
        matches!(self, MapError::InvalidTtl { .. })
    }

    /// Returns `true` if this error is a type mismatch.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, MapError::TypeMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_ttl_message_names_the_value() {
        let err = MapError::InvalidTtl { ttl_seconds: 0 };
        assert_eq!(err.to_string(), "ttl_seconds must be at least 1, got 0");
        assert!(err.is_invalid_ttl());
        assert!(!err.is_type_mismatch());
    }

    #[test]
    fn test_type_mismatch_message_names_the_stored_type() {
        let err = MapError::TypeMismatch { actual: "string" };
        assert_eq!(err.to_string(), "expected an integer value, got string");
        assert!(err.is_type_mismatch());
        assert!(!err.is_invalid_ttl());
    }
}
