//! Error types for the gateway.

use std::fmt;

use thiserror::Error;

/// Which account an operation ran for and what it was doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Account address (or login name when no account is involved).
    pub account: String,
    /// Operation name, e.g. `send` or `list_messages`.
    pub operation: &'static str,
}

impl OperationContext {
    /// Creates a context.
    #[must_use]
    pub fn new(account: impl Into<String>, operation: &'static str) -> Self {
        Self {
            account: account.into(),
            operation,
        }
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.operation, self.account)
    }
}

/// A recipient refused during the SMTP envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecipient {
    /// Envelope address.
    pub address: String,
    /// Server reply, e.g. `550 No such user`.
    pub reason: String,
}

/// How the API layer should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request or tenant configuration is at fault.
    ClientError,
    /// The mail provider failed or refused.
    UpstreamError,
    /// Some recipients succeeded and some failed.
    MultiStatus,
}

/// Errors that can occur in gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Tenant configuration or request is malformed; raised before any I/O.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider rejected the credentials.
    #[error("{context}: authentication failed: {cause}")]
    Auth {
        /// Where it happened.
        context: OperationContext,
        /// Underlying cause.
        cause: String,
    },

    /// Timeout, connection reset, TLS failure or temporary refusal.
    #[error("{context}: transient failure: {cause}")]
    Transient {
        /// Where it happened.
        context: OperationContext,
        /// Underlying cause.
        cause: String,
    },

    /// Malformed or unexpected server response.
    #[error("{context}: protocol error: {cause}")]
    Protocol {
        /// Where it happened.
        context: OperationContext,
        /// Underlying cause.
        cause: String,
    },

    /// Encoded attachments exceed the tenant limit.
    #[error("Attachments take {size} bytes encoded, limit is {limit}")]
    AttachmentTooLarge {
        /// Total encoded size.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The DKIM key or signing step failed.
    #[error("DKIM signing failed: {0}")]
    Signing(#[from] mailgate_dkim::Error),

    /// The message has no body text.
    #[error("Message has no body")]
    EmptyMessage,

    /// An attachment has no name, no content, or an unusable MIME type.
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// The message reached some recipients but not all.
    #[error("Delivered to {} recipient(s), {} rejected", delivered.len(), rejected.len())]
    PartialDelivery {
        /// Accepted recipients.
        delivered: Vec<String>,
        /// Refused recipients with the server's reason.
        rejected: Vec<RejectedRecipient>,
    },

    /// Every recipient was refused; no message data was sent.
    #[error("{context}: all {} recipient(s) rejected", rejected.len())]
    Rejected {
        /// Where it happened.
        context: OperationContext,
        /// Refused recipients with the server's reason.
        rejected: Vec<RejectedRecipient>,
    },
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Returns true when retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The user-visible class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_)
            | Self::AttachmentTooLarge { .. }
            | Self::EmptyMessage
            | Self::InvalidAttachment(_)
            | Self::Signing(_) => ErrorClass::ClientError,
            Self::Auth { .. }
            | Self::Transient { .. }
            | Self::Protocol { .. }
            | Self::Rejected { .. } => ErrorClass::UpstreamError,
            Self::PartialDelivery { .. } => ErrorClass::MultiStatus,
        }
    }

    /// Builds a transient error, e.g. for an expired timeout.
    pub(crate) fn transient(context: &OperationContext, cause: impl fmt::Display) -> Self {
        Self::Transient {
            context: context.clone(),
            cause: cause.to_string(),
        }
    }

    /// Builds a protocol error.
    pub(crate) fn protocol(context: &OperationContext, cause: impl fmt::Display) -> Self {
        Self::Protocol {
            context: context.clone(),
            cause: cause.to_string(),
        }
    }

    /// Classifies an SMTP client error.
    pub(crate) fn from_smtp(context: &OperationContext, err: &mailgate_smtp::Error) -> Self {
        use mailgate_smtp::Error as E;

        let cause = err.to_string();
        let context = context.clone();
        if err.is_auth_failure() || matches!(err, E::NoAuthMechanism(_)) {
            Self::Auth { context, cause }
        } else if err.is_transient() {
            Self::Transient { context, cause }
        } else if matches!(err, E::InvalidDnsName(_) | E::InvalidAddress(_)) {
            Self::Config(format!("{context}: {cause}"))
        } else {
            Self::Protocol { context, cause }
        }
    }

    /// Classifies an IMAP client error.
    ///
    /// `NO` is an authentication failure only in answer to LOGIN, which the
    /// client already reports as [`mailgate_imap::Error::Auth`].
    pub(crate) fn from_imap(context: &OperationContext, err: &mailgate_imap::Error) -> Self {
        use mailgate_imap::Error as E;

        let cause = err.to_string();
        let context = context.clone();
        match err {
            E::Auth(_) => Self::Auth { context, cause },
            E::InvalidDnsName(_) => Self::Config(format!("{context}: {cause}")),
            _ if err.is_transient() => Self::Transient { context, cause },
            _ => Self::Protocol { context, cause },
        }
    }
}
