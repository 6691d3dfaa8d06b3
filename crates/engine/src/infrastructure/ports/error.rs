// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Error types for port operations.

/// Failure reported by a world adapter (spawning, structures, drops, titles).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    /// The host refused or could not complete the operation.
    #[error("World operation {operation} failed: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    /// A handle passed to the host no longer refers to anything.
    #[error("Stale handle: {0}")]
    StaleHandle(String),

    #[error("World unavailable")]
    Unavailable,
}

impl PortError {
    /// Create a Rejected error with operation context.
    pub fn rejected(operation: &'static str, message: impl ToString) -> Self {
        Self::Rejected {
            operation,
            message: message.to_string(),
        }
    }

    pub fn stale(handle: impl ToString) -> Self {
        Self::StaleHandle(handle.to_string())
    }
}

/// Durable despawn store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error in {operation}: {message}")]
    Io {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Create an Io error with operation context.
    pub fn io(operation: &'static str, message: impl ToString) -> Self {
        Self::Io {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Configuration source errors. Callers recover by using built-in defaults.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(String),

    #[error("Malformed config: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn io(message: impl ToString) -> Self {
        Self::Io(message.to_string())
    }

    pub fn malformed(message: impl ToString) -> Self {
        Self::Malformed(message.to_string())
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// The world context can no longer accept commands.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("World context closed")]
    Closed,

    #[error("No runtime available to defer command")]
    NoRuntime,
}
