//! Error types for the batch prover

use thiserror::Error;

/// Result type alias for prover operations
pub type Result<T> = std::result::Result<T, ProverError>;

/// Errors that can occur while generating a batch
#[derive(Debug, Error)]
pub enum ProverError {
    /// Core library error without a more specific stage
    #[error("Core error: {0}")]
    Core(#[source] vrfgen_core::Error),

    /// Input not representable in its declared encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Wrong password or corrupt key file
    #[error("Key decryption failed: {0}")]
    Decryption(String),

    /// The proof constructor rejected a seed
    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),

    /// Witness projective sum has Z ≡ 0 (mod p)
    #[error("Witness Z coordinate is zero modulo the field prime; no inverse exists")]
    NonInvertibleZ,

    /// Worker count is zero or yields more ranges than can be allocated
    #[error("Invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    /// Nonce range is empty or starts at zero
    #[error("Invalid nonce range [{start}, {end}]")]
    InvalidRange { start: u64, end: u64 },

    /// A row and the header disagree on width
    #[error("Record has {actual} fields but header has {expected}")]
    RecordShape { expected: usize, actual: usize },

    /// Merge produced the wrong number of records
    #[error("Batch incomplete: expected {expected} records, collected {actual}")]
    Incomplete { expected: u64, actual: u64 },

    /// Two records carried the same nonce
    #[error("Duplicate record for nonce {0}")]
    DuplicateNonce(u64),

    /// A worker task died without reporting a result
    #[error("Worker failed: {0}")]
    Worker(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stage failure attributed to the nonce being processed
    #[error("nonce {nonce}: {source}")]
    AtNonce {
        nonce: u64,
        #[source]
        source: Box<ProverError>,
    },
}

impl ProverError {
    /// Attach the nonce that triggered this error
    pub fn at_nonce(self, nonce: u64) -> Self {
        ProverError::AtNonce {
            nonce,
            source: Box::new(self),
        }
    }

    /// The innermost stage error
    pub fn root(&self) -> &ProverError {
        match self {
            ProverError::AtNonce { source, .. } => source.root(),
            other => other,
        }
    }

    /// The nonce that triggered this error, if known
    pub fn nonce(&self) -> Option<u64> {
        match self {
            ProverError::AtNonce { nonce, .. } => Some(*nonce),
            _ => None,
        }
    }
}

impl From<vrfgen_core::Error> for ProverError {
    fn from(e: vrfgen_core::Error) -> Self {
        match e {
            vrfgen_core::Error::Encoding(msg) => ProverError::Encoding(msg),
            vrfgen_core::Error::Decryption(msg) => ProverError::Decryption(msg),
            other => ProverError::Core(other),
        }
    }
}

impl From<serde_json::Error> for ProverError {
    fn from(e: serde_json::Error) -> Self {
        ProverError::Serialization(e.to_string())
    }
}
