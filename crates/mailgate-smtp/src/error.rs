//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, including the peer closing the socket mid-reply.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Hostname cannot be used as a TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(String),

    /// Server answered a command with a non-success reply.
    #[error("SMTP reply {code}: {message}")]
    Reply {
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Malformed or unexpected server output.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid envelope address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Server advertised no authentication mechanism this client speaks.
    #[error("No supported AUTH mechanism (server offers: {0})")]
    NoAuthMechanism(String),

    /// Message is larger than the SIZE the server advertised.
    #[error("Message of {size} bytes exceeds server limit of {limit} bytes")]
    MessageTooLarge {
        /// Message size in bytes.
        size: usize,
        /// Limit advertised through the SIZE extension.
        limit: usize,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an error from a reply code and its text.
    #[must_use]
    pub fn reply(code: u16, message: impl Into<String>) -> Self {
        Self::Reply {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent failure (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient failure (4xx) or a broken socket.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if *code >= 400 && *code < 500)
            || matches!(self, Self::Io(_) | Self::Tls(_))
    }

    /// Returns true if the server refused the supplied credentials.
    ///
    /// Covers 530 (auth required), 534 (mechanism too weak),
    /// 535 (credentials invalid) and 538 (encryption required).
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Reply { code: 530 | 534 | 535 | 538, .. })
    }
}
