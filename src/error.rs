use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum RelayError {
    // Handshake errors: the upgrade request is rejected, the process continues
    Handshake(String),

    // Protocol errors: wrong opcode, fragmentation, oversized frame
    Protocol(String),

    // I/O errors: read/write failure, peer disconnect
    Io(std::io::Error),

    // Registry errors
    RegistryLock(String),

    // Configuration errors
    Config(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake(msg) => write!(f, "Handshake error: {}", msg),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::RegistryLock(msg) => write!(f, "Registry lock error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RelayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(err)
    }
}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for RelayError {
    fn from(err: PoisonError<T>) -> Self {
        RelayError::RegistryLock(format!("Mutex poisoned: {}", err))
    }
}

// Generic result type for the relay
pub type Result<T> = std::result::Result<T, RelayError>;
