//! Mail accounts of a tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TenantMailConfig;
use crate::error::{GatewayError, Result};

/// Automatic reply settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Autoreply {
    /// Whether the autoreply is switched on.
    pub enabled: bool,
    /// Reply text.
    pub message: String,
    /// Start of the active window, if bounded.
    pub window_start: Option<DateTime<Utc>>,
    /// End of the active window, if bounded.
    pub window_end: Option<DateTime<Utc>>,
}

impl Autoreply {
    /// Returns true if enabled and `now` falls inside the window.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.window_start.is_none_or(|start| now >= start)
            && self.window_end.is_none_or(|end| now <= end)
    }
}

/// A mailbox owned by a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailAccount {
    /// Email address; its domain must be the tenant domain.
    pub address: String,
    /// Name shown in the `From` header.
    pub display_name: Option<String>,
    /// Signature appended to outgoing text.
    pub signature: Option<String>,
    /// Address incoming mail is forwarded to.
    pub forwarding_address: Option<String>,
    /// Automatic reply.
    pub autoreply: Autoreply,
}

impl MailAccount {
    /// Creates an account with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Domain part of the address.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        split_address(&self.address).map(|(_, domain)| domain)
    }

    /// Checks the address and that it belongs to the tenant domain.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] when the address is malformed or
    /// outside the tenant domain.
    pub fn validate(&self, config: &TenantMailConfig) -> Result<()> {
        let Some((_, domain)) = split_address(&self.address) else {
            return Err(GatewayError::Config(format!(
                "invalid account address {:?}",
                self.address
            )));
        };
        if !domain.eq_ignore_ascii_case(&config.domain) {
            return Err(GatewayError::Config(format!(
                "account {} is outside tenant domain {}",
                self.address, config.domain
            )));
        }
        if let Some(forward) = &self.forwarding_address
            && !is_valid_address(forward)
        {
            return Err(GatewayError::Config(format!(
                "invalid forwarding address {forward:?}"
            )));
        }
        Ok(())
    }

    /// Signature to append: the account's own, else the tenant default.
    /// A blank signature counts as none.
    #[must_use]
    pub fn effective_signature<'a>(&'a self, config: &'a TenantMailConfig) -> Option<&'a str> {
        fn usable(signature: Option<&str>) -> Option<&str> {
            signature
                .map(str::trim_end)
                .filter(|s| !s.trim().is_empty())
        }

        usable(self.signature.as_deref()).or_else(|| usable(config.default_signature.as_deref()))
    }

    /// Whether an automatic reply should be sent at `now`.
    #[must_use]
    pub fn autoreply_active_at(&self, now: DateTime<Utc>) -> bool {
        self.autoreply.is_active_at(now)
    }

    /// Address incoming mail should be forwarded to, if any.
    #[must_use]
    pub fn forward_to(&self) -> Option<&str> {
        self.forwarding_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Splits `local@domain`, rejecting empty parts, whitespace and brackets.
pub(crate) fn split_address(address: &str) -> Option<(&str, &str)> {
    let (local, domain) = address.rsplit_once('@')?;
    let bad = |s: &str| {
        s.is_empty() || s.contains(|c: char| c.is_whitespace() || "<>,;\"".contains(c))
    };
    if bad(local) || bad(domain) || !domain.contains('.') || domain.contains('@') {
        return None;
    }
    Some((local, domain))
}

/// Returns true for a plain `local@domain.tld` address.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    split_address(address).is_some()
}
