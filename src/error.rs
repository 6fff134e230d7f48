//! Error taxonomy shared by every layer of the chain.

use thiserror::Error;

/// Why a well-formed block was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsensusFailure {
    #[error("previous block not found")]
    PreviousBlockNotFound,
    #[error("block is earlier than previous")]
    EarlierThanPrevious,
    #[error("block violates structural limitations")]
    LimitationsViolated,
    #[error("block hash does not meet the proof-of-work target")]
    InsufficientWork,
}

/// Library errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("invalid host name: {0}")]
    InvalidHostName(String),
    #[error("consensus failed: {0}")]
    ConsensusFailed(ConsensusFailure),
    #[error("block {0} not found")]
    BlockNotFound(String),
    #[error("attribute {0} not found")]
    AttributeNotFound(String),
    #[error("database is closed")]
    DatabaseClosed,
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Lookup misses are expected control flow, everything else is not.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BlockNotFound(_) | Error::AttributeNotFound(_))
    }
}

impl From<ConsensusFailure> for Error {
    fn from(failure: ConsensusFailure) -> Self {
        Error::ConsensusFailed(failure)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
