//! MIME errors.

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while building or parsing a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `Content-Type` value that is not `type/subtype`.
    #[error("malformed content type {0:?}")]
    InvalidContentType(String),

    /// An attachment was given no file name.
    #[error("attachment has no file name")]
    MissingFilename,

    /// A Base64 body that does not decode.
    #[error("invalid base64 body: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// A multipart entity without a `boundary` parameter.
    #[error("multipart entity has no boundary")]
    MissingBoundary,

    /// Multipart structure that cannot be split into parts.
    #[error("malformed multipart body: {0}")]
    InvalidMultipart(String),
}
