//! Error types for DKIM operations.

/// Result type alias for DKIM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// DKIM error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The private or public key could not be loaded.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The signer was configured with an unusable domain or selector.
    #[error("Invalid signer configuration: {0}")]
    InvalidConfig(String),

    /// A header required for signing or verification is missing.
    #[error("Missing header: {0}")]
    MissingHeader(String),

    /// RSA signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The `DKIM-Signature` header is malformed.
    #[error("Malformed DKIM-Signature: {0}")]
    MalformedSignature(String),

    /// The signature uses an algorithm or canonicalization this crate does not support.
    #[error("Unsupported DKIM parameter: {0}")]
    Unsupported(String),

    /// The canonicalized body does not match the `bh=` tag.
    #[error("Body hash mismatch")]
    BodyHashMismatch,

    /// The signature does not verify against the public key.
    #[error("Signature verification failed")]
    BadSignature,
}
