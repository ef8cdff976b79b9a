use thiserror::Error;

/// Fault returned by the supervisor for a failed RPC call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fault {code}: {message}")]
pub struct RemoteFault {
    pub code: i64,
    pub message: String,
}

impl RemoteFault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Main error type for the uptime watchdog
#[derive(Debug, Error)]
pub enum UptimemonError {
    // Configuration-time errors
    #[error("Unparseable duration '{0}': expected an integer optionally followed by s, m, h or d")]
    InvalidDuration(String),

    #[error("Unparseable value '{0}': expected NAME=DURATION")]
    InvalidNameTime(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    // Supervisor RPC errors
    #[error("Supervisor {0}")]
    RemoteFault(#[from] RemoteFault),

    #[error("Failed to stop process {name} (UPTIME {uptime}sec), exiting: {fault}")]
    StopFailed {
        name: String,
        uptime: u64,
        fault: RemoteFault,
    },

    #[error("Failed to start process {name} after stopping it, exiting: {fault}")]
    StartFailed { name: String, fault: RemoteFault },

    #[error("RPC transport error: {0}")]
    TransportError(String),

    #[error("XML-RPC decoding error: {0}")]
    RpcDecodeError(String),

    // Event listener protocol errors
    #[error("Event protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for watchdog operations
pub type Result<T> = std::result::Result<T, UptimemonError>;
