//! SMTP reply types.

/// A complete (possibly multi-line) server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code.
    pub code: ReplyCode,
    /// Text of each reply line, without code and separator.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true for 2xx replies.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns all reply lines joined by newlines.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Converts a non-success reply into an error.
    #[must_use]
    pub fn into_error(self) -> crate::Error {
        crate::Error::reply(self.code.as_u16(), self.message_text())
    }
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 service ready.
    pub const SERVICE_READY: Self = Self(220);
    /// 221 closing transmission channel.
    pub const CLOSING: Self = Self(221);
    /// 235 authentication succeeded.
    pub const AUTH_OK: Self = Self(235);
    /// 250 requested action completed.
    pub const OK: Self = Self(250);
    /// 334 server challenge during AUTH.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 start mail input.
    pub const START_DATA: Self = Self(354);
    /// 421 service not available, channel closing.
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 535 authentication credentials invalid.
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 mailbox unavailable.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Creates a reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// 3xx.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// 4xx.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// 5xx.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
