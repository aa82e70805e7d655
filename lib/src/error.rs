use thiserror::Error;

/// Errors raised while mapping, decoding, compiling or proving a circuit
#[derive(Error, Debug)]
pub enum CircuitError {
    /// Type tag outside the closed circuit-value set
    #[error("Unknown type {0}")]
    UnknownType(String),

    /// Caller-supplied ABI blob could not be decoded against the schema
    #[error("Failed to decode circuit inputs: {0}")]
    InputDecode(String),

    /// Circuit input value does not match its declared type
    #[error("Invalid value for input `{name}`: {reason}")]
    InvalidInput { name: String, reason: String },

    /// Input schema JSON is malformed
    #[error("Invalid input schema: {0}")]
    InvalidSchema(String),

    /// Circuit definition failed to parse or validate
    #[error("Invalid circuit definition: {0}")]
    InvalidDefinition(String),

    /// Compiled circuit record is malformed or incomplete
    #[error("Invalid compiled circuit record: {0}")]
    InvalidRecord(String),

    /// Compiled circuit record does not belong to the reconstructed circuit
    #[error("Compiled circuit record mismatch: {0}")]
    RecordMismatch(String),

    /// Circuit failed while running
    #[error("Circuit execution failed: {0}")]
    Execution(String),

    /// Circuit exceeds the mock prover's limits
    #[error("Circuit too large: {0}")]
    CircuitTooLarge(String),

    /// Operation requires a compiled or loaded circuit
    #[error("Circuit has not been compiled or loaded")]
    NotCompiled,

    /// Data subquery could not be answered
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for circuit operations
pub type Result<T> = std::result::Result<T, CircuitError>;

impl CircuitError {
    /// Get error code for logging and machine-readable error output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownType(_) => "UNKNOWN_TYPE",
            Self::InputDecode(_) => "INPUT_DECODE",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidSchema(_) => "INVALID_SCHEMA",
            Self::InvalidDefinition(_) => "INVALID_DEFINITION",
            Self::InvalidRecord(_) => "INVALID_RECORD",
            Self::RecordMismatch(_) => "RECORD_MISMATCH",
            Self::Execution(_) => "EXECUTION_FAILED",
            Self::CircuitTooLarge(_) => "CIRCUIT_TOO_LARGE",
            Self::NotCompiled => "NOT_COMPILED",
            Self::DataSource(_) => "DATA_SOURCE",
            Self::Json(_) => "JSON_ERROR",
            Self::Base64(_) => "BASE64_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Process exit code reported by the command line front end
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownType(_) => 3,
            Self::InputDecode(_) | Self::InvalidInput { .. } => 4,
            Self::InvalidSchema(_)
            | Self::InvalidDefinition(_)
            | Self::InvalidRecord(_)
            | Self::RecordMismatch(_)
            | Self::Json(_)
            | Self::Base64(_) => 5,
            Self::Execution(_) | Self::CircuitTooLarge(_) | Self::NotCompiled => 6,
            Self::DataSource(_) => 7,
            Self::Io(_) => 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_message() {
        let err = CircuitError::UnknownType("bytes32".to_string());
        assert_eq!(err.to_string(), "Unknown type bytes32");
        assert_eq!(err.error_code(), "UNKNOWN_TYPE");
    }

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        assert_eq!(CircuitError::UnknownType(String::new()).exit_code(), 3);
        assert_eq!(CircuitError::InputDecode(String::new()).exit_code(), 4);
        assert_eq!(CircuitError::InvalidRecord(String::new()).exit_code(), 5);
        assert_eq!(CircuitError::NotCompiled.exit_code(), 6);
        assert_eq!(CircuitError::DataSource(String::new()).exit_code(), 7);
    }
}
