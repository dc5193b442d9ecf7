use thiserror::Error;

/// Errors reported by the pid allocator and the service around it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PidError {
    #[error("pid map is not initialized")]
    NotInitialized,

    #[error("pid {pid} is outside of [{min}, {max}]")]
    OutOfRange { pid: u32, min: u32, max: u32 },

    #[error("no pids available")]
    PoolExhausted,

    #[error("invalid pid range: min {min} is greater than max {max}")]
    InvalidRange { min: u32, max: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed message: {0}")]
    Protocol(String),

    #[error("pid service is not running")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, PidError>;
