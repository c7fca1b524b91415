//! Quota data (RFC 2087, RFC 9208).

/// Usage and limit of one resource under a quota root.
///
/// `STORAGE` is measured in units of 1024 octets; other resources count items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaResource {
    /// Resource name, upper-cased (`STORAGE`, `MESSAGE`, ...).
    pub name: String,
    /// Current usage.
    pub usage: u64,
    /// Limit.
    pub limit: u64,
}

/// A quota root and its resources, from an untagged QUOTA response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Quota {
    /// Quota root name; frequently the empty string.
    pub root: String,
    /// Resources under the root.
    pub resources: Vec<QuotaResource>,
}

impl Quota {
    /// Looks up a resource by name, case-insensitively.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&QuotaResource> {
        self.resources
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// The `STORAGE` resource, in KiB.
    #[must_use]
    pub fn storage(&self) -> Option<&QuotaResource> {
        self.resource("STORAGE")
    }
}

/// Result of GETQUOTAROOT: the roots of a mailbox and the quotas reported with them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuotaRoot {
    /// Mailbox the roots belong to.
    pub mailbox: String,
    /// Root names, in server order.
    pub roots: Vec<String>,
    /// QUOTA responses that accompanied the command.
    pub quotas: Vec<Quota>,
}

impl QuotaRoot {
    /// Quota of the first root, falling back to the first QUOTA seen.
    #[must_use]
    pub fn primary(&self) -> Option<&Quota> {
        self.roots
            .first()
            .and_then(|root| self.quotas.iter().find(|q| &q.root == root))
            .or_else(|| self.quotas.first())
    }
}
