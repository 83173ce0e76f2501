use enocean_transport::TransportError;
use thiserror::Error;

use crate::Eep;

pub type Result<T, E = GatewayError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid address: expected 4 bytes, got {0}")]
    InvalidAddress(usize),
    #[error("profile {profile} decode failed: {reason}")]
    ProfileDecode { profile: Eep, reason: String },
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("dongle is already running")]
    AlreadyRunning,
    #[error("config: {0}")]
    Config(String),
    #[error("metrics init error: {0}")]
    Metrics(String),
}
