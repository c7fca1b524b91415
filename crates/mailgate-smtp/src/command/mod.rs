//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// A command line sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO with the client's hostname.
    Ehlo {
        /// Client hostname.
        hostname: String,
    },
    /// STARTTLS.
    StartTls,
    /// AUTH with an optional initial response (SASL-IR).
    Auth {
        /// Mechanism.
        mechanism: AuthMechanism,
        /// Base64 initial response.
        initial_response: Option<String>,
    },
    /// A base64 line answering a 334 challenge.
    AuthResponse(String),
    /// MAIL FROM, with SIZE when the server advertised it.
    MailFrom {
        /// Envelope sender.
        from: Address,
        /// Declared message size in bytes.
        size: Option<usize>,
    },
    /// RCPT TO.
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// DATA.
    Data,
    /// RSET.
    Rset,
    /// NOOP.
    Noop,
    /// QUIT.
    Quit,
}

impl Command {
    /// Serializes the command, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(initial),
            } => format!("AUTH {} {initial}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::AuthResponse(response) => response.clone(),
            Self::MailFrom { from, size: None } => format!("MAIL FROM:<{from}>"),
            Self::MailFrom {
                from,
                size: Some(size),
            } => format!("MAIL FROM:<{from}> SIZE={size}"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
        .into_bytes();
        line.extend_from_slice(b"\r\n");
        line
    }

    /// Returns a form of the command that is safe to log.
    ///
    /// Credentials carried by AUTH lines are masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth { mechanism, .. } => format!("AUTH {} ****", mechanism.as_str()),
            Self::AuthResponse(_) => "****".to_string(),
            other => String::from_utf8_lossy(&other.serialize())
                .trim_end()
                .to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "gateway.tenant.edu".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO gateway.tenant.edu\r\n");
    }

    #[test]
    fn test_auth_plain_with_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn test_auth_login_without_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH LOGIN\r\n");
    }

    #[test]
    fn test_mail_from() {
        let from = Address::new("registrar@tenant.edu").unwrap();
        let plain = Command::MailFrom {
            from: from.clone(),
            size: None,
        };
        assert_eq!(plain.serialize(), b"MAIL FROM:<registrar@tenant.edu>\r\n");

        let sized = Command::MailFrom {
            from,
            size: Some(4096),
        };
        assert_eq!(
            sized.serialize(),
            b"MAIL FROM:<registrar@tenant.edu> SIZE=4096\r\n"
        );
    }

    #[test]
    fn test_rcpt_to() {
        let cmd = Command::RcptTo {
            to: Address::new("student@tenant.edu").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<student@tenant.edu>\r\n");
    }

    #[test]
    fn test_simple_verbs() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_redacted_hides_credentials() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("c2VjcmV0".into()),
        };
        assert_eq!(cmd.redacted(), "AUTH PLAIN ****");
        assert_eq!(Command::AuthResponse("c2VjcmV0".into()).redacted(), "****");
        assert_eq!(Command::Data.redacted(), "DATA");
    }
}
