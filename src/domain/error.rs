use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Transient I/O failure reported by a durable store
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Failure handing an invalidation to the cluster transport
    #[error("Invalidation bus error: {message}")]
    Bus { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn bus(message: impl Into<String>) -> Self {
        Self::Bus {
            message: message.into(),
        }
    }

    /// Whether this error reports a key absent from the durable store
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Role 'admin' not found");
        assert_eq!(error.to_string(), "Not found: Role 'admin' not found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_storage_error_is_not_not_found() {
        let error = DomainError::storage("connection reset");
        assert_eq!(error.to_string(), "Storage error: connection reset");
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_bus_error() {
        let error = DomainError::bus("publisher stopped");
        assert_eq!(error.to_string(), "Invalidation bus error: publisher stopped");
    }
}
