//! Tenant mail configuration.
//!
//! The configuration-storage layer hands these plain values to every call;
//! nothing here is cached or mutated by the gateway.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Default mailbox quota: 1 GiB expressed in KiB, the unit of IMAP `STORAGE`.
pub const DEFAULT_QUOTA_KB: u64 = 1024 * 1024;

/// Default limit for the encoded size of all attachments of one message.
pub const DEFAULT_MAX_ATTACHMENT_SIZE: usize = 10 * 1024 * 1024;

/// Default socket timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[allow(clippy::expect_used)]
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{1,61}[A-Za-z0-9]\.[A-Za-z]{2,}$")
        .expect("domain pattern is valid")
});

/// Transport security for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// No encryption.
    None,
    /// Implicit TLS (connect directly with TLS).
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

/// SMTP provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name; empty means the relay accepts unauthenticated submission.
    pub username: String,
    /// Password.
    pub password: String,
    /// Upgrade with STARTTLS after connecting.
    pub use_tls: bool,
    /// Connect with implicit TLS.
    pub use_ssl: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            use_tls: true,
            use_ssl: false,
        }
    }
}

impl SmtpSettings {
    /// Implicit TLS wins over STARTTLS; neither means plaintext.
    #[must_use]
    pub const fn security(&self) -> Security {
        if self.use_ssl {
            Security::Tls
        } else if self.use_tls {
            Security::StartTls
        } else {
            Security::None
        }
    }
}

/// IMAP provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapSettings {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Connect with implicit TLS; otherwise plaintext.
    pub use_ssl: bool,
}

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 993,
            username: String::new(),
            password: String::new(),
            use_ssl: true,
        }
    }
}

impl ImapSettings {
    /// Transport security implied by the flags.
    #[must_use]
    pub const fn security(&self) -> Security {
        if self.use_ssl {
            Security::Tls
        } else {
            Security::None
        }
    }
}

/// DKIM signing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DkimSettings {
    /// Sign outgoing mail.
    pub enabled: bool,
    /// Signing domain (`d=`).
    pub domain: String,
    /// Selector (`s=`).
    pub selector: String,
    /// PEM encoded RSA private key.
    pub private_key: String,
}

/// Everything the gateway needs to know about one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantMailConfig {
    /// Mail domain of the tenant.
    pub domain: String,
    /// Outgoing server.
    pub smtp: SmtpSettings,
    /// Mailbox server.
    pub imap: ImapSettings,
    /// DKIM signing.
    pub dkim: DkimSettings,
    /// Signature used when the account has none.
    pub default_signature: Option<String>,
    /// Quota reported when the server cannot tell, in KiB.
    pub default_quota_kb: u64,
    /// Limit for the encoded size of all attachments of a message, in bytes.
    pub max_attachment_size: usize,
    /// Socket timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TenantMailConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            smtp: SmtpSettings::default(),
            imap: ImapSettings::default(),
            dkim: DkimSettings::default(),
            default_signature: None,
            default_quota_kb: DEFAULT_QUOTA_KB,
            max_attachment_size: DEFAULT_MAX_ATTACHMENT_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl TenantMailConfig {
    /// Socket timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the configuration before any network access.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !is_valid_domain(&self.domain) {
            problems.push(format!("invalid domain {:?}", self.domain));
        }

        if self.smtp.host.trim().is_empty() {
            problems.push("SMTP host is required".to_string());
        }
        if self.smtp.port == 0 {
            problems.push("SMTP port must be 1-65535".to_string());
        }

        if self.imap.host.trim().is_empty() {
            problems.push("IMAP host is required".to_string());
        }
        if self.imap.port == 0 {
            problems.push("IMAP port must be 1-65535".to_string());
        }

        if self.dkim.enabled {
            if self.dkim.domain.trim().is_empty() {
                problems.push("DKIM domain is required when signing is enabled".to_string());
            }
            if self.dkim.selector.trim().is_empty() {
                problems.push("DKIM selector is required when signing is enabled".to_string());
            }
            if self.dkim.private_key.trim().is_empty() {
                problems.push("DKIM private key is required when signing is enabled".to_string());
            }
        }

        if self.max_attachment_size == 0 {
            problems.push("max_attachment_size must be positive".to_string());
        }
        if self.timeout_secs == 0 {
            problems.push("timeout_secs must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Config(problems.join("; ")))
        }
    }
}

/// Checks a tenant mail domain such as `uni.example`.
#[must_use]
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_RE.is_match(domain)
}
