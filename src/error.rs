//! Error types and handling for shmblock

/// Result type alias for shmblock operations
pub type Result<T> = std::result::Result<T, ShmError>;

/// Error kinds reported by a shared memory block
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// Backing directory or file could not be created, opened or mapped
    #[error("Creation error: {message}")]
    Creation {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Operation attempted outside the Bound state
    #[error("Invalid state: {operation} requires a bound block (state: {state})")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Bytes are not valid under the configured text encoding
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Serialized payload is malformed
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Structured value could not be serialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Access would fall outside the block's bounds
    #[error("Capacity error: range {offset}..{end} exceeds limit {limit}")]
    Capacity {
        offset: usize,
        end: usize,
        limit: usize,
    },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// I/O failures on an already bound region
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl ShmError {
    /// Create a creation error from a standard I/O error
    pub fn creation(source: std::io::Error, context: &str) -> Self {
        Self::Creation {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a creation error without an underlying I/O cause
    pub fn creation_msg(message: impl Into<String>) -> Self {
        Self::Creation {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Self::InvalidState { operation, state }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn capacity(offset: usize, end: usize, limit: usize) -> Self {
        Self::Capacity { offset, end, limit }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// True for the bounds violation kind
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}

impl From<std::io::Error> for ShmError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<bincode::Error> for ShmError {
    fn from(err: bincode::Error) -> Self {
        Self::decode(format!("Bincode error: {}", err))
    }
}

impl From<serde_json::Error> for ShmError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(format!("JSON error: {}", err))
    }
}
