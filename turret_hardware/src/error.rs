use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("camera capture timeout")]
    Timeout,
    #[error("invalid duty cycle: {0}")]
    InvalidDuty(f64),
}

pub type Result<T> = std::result::Result<T, HwError>;
