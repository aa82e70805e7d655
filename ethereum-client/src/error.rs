use axiom_std_lib::CircuitError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EthereumError>;

#[derive(Error, Debug)]
pub enum EthereumError {
    #[error("Provider error: {0}")]
    Provider(#[from] alloy_transport::TransportError),

    #[error("Invalid provider URI: {0}")]
    InvalidProviderUri(String),

    #[error("Block {0} not found")]
    BlockNotFound(u32),

    #[error("Header field {0} is not available for this block")]
    MissingHeaderField(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

impl EthereumError {
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::InvalidProviderUri(_) => "INVALID_PROVIDER_URI",
            Self::BlockNotFound(_) => "BLOCK_NOT_FOUND",
            Self::MissingHeaderField(_) => "MISSING_HEADER_FIELD",
            Self::Query(_) => "QUERY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Circuit(e) => e.error_code(),
        }
    }

    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Provider(_)
            | Self::InvalidProviderUri(_)
            | Self::BlockNotFound(_)
            | Self::MissingHeaderField(_) => 7,
            Self::Query(_) | Self::Config(_) => 8,
            Self::Circuit(e) => e.exit_code(),
        }
    }

    /// Provider failures surface inside a running circuit as data source errors
    #[must_use]
    pub fn into_circuit_error(self) -> CircuitError {
        match self {
            Self::Circuit(e) => e,
            other => CircuitError::DataSource(other.to_string()),
        }
    }
}
