use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("No response before timeout")]
    NoResponse,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DomainError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        DomainError::MalformedPacket(reason.into())
    }

    /// Timeouts, transport faults and undecodable replies all mean the same
    /// thing to a caller waiting on a peer: nothing usable came back.
    pub fn is_no_usable_response(&self) -> bool {
        matches!(
            self,
            DomainError::NoResponse | DomainError::Transport(_) | DomainError::MalformedPacket(_)
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
