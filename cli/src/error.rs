use axiom_std_lib::CircuitError;
use ethereum_client::EthereumError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Ethereum(#[from] EthereumError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Circuit(e) => e.error_code(),
            Self::Ethereum(e) => e.error_code(),
            Self::Output(_) => "OUTPUT_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Process exit status for this failure
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Circuit(e) => e.exit_code(),
            Self::Ethereum(e) => e.exit_code(),
            Self::Output(_) | Self::Io(_) => 9,
        }
    }

    /// Machine-readable error object written to stderr
    #[must_use]
    pub fn to_json(&self) -> String {
        json!({
            "error": self.error_code(),
            "message": self.to_string(),
        })
        .to_string()
    }
}
