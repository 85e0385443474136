use thiserror::Error;

/// Failures of the derivative operator. Raised before any output is written.
#[derive(Debug, Error)]
pub enum DeriveError {
    /// Derivative order other than 2 or 4.
    #[error("Order not valid: {order}")]
    InvalidConfiguration { order: u32 },
    /// Field layout, grid spacing or output buffer rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Malformed TOML configuration.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl DeriveError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T, E = DeriveError> = std::result::Result<T, E>;
