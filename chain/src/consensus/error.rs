use std::fmt;

/// Errors that can occur while mining a block.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsensusError {
    /// The transaction pool is empty; nothing was changed.
    NothingToMine,
    /// A newer chain was adopted while the proof search was running.
    Aborted,
    /// Catch-all for other issues.
    Other(String),
}

impl fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusError::NothingToMine => write!(f, "transaction pool is empty"),
            ConsensusError::Aborted => write!(f, "proof-of-work search aborted"),
            ConsensusError::Other(msg) => write!(f, "consensus error: {msg}"),
        }
    }
}

impl std::error::Error for ConsensusError {}
