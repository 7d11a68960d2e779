use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TurretError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for device")]
    Timeout,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing yaw axis")]
    MissingYaw,
    #[error("missing pitch axis")]
    MissingPitch,
    #[error("missing camera")]
    MissingCamera,
    #[error("missing hot-column extractor")]
    MissingExtractor,
    #[error("missing launcher")]
    MissingLauncher,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
