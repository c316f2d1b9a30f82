use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors raised while assembling the runtime (configuration, logging,
/// default bridge construction).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid runtime configuration: {0}")]
    Config(String),

    /// A host capability was neither injected nor available as a default.
    #[error("{capability} not provided: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Default bridge unavailable: {0}")]
    Bridge(#[from] BridgeError),
}

impl Error {
    pub(crate) fn missing(capability: &str, message: &str) -> Self {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
