//! Mailbox quota reporting.

use tracing::{Instrument, info_span, warn};

use crate::account::MailAccount;
use crate::config::TenantMailConfig;
use crate::connection::{ConnectionManager, ImapConnector, ImapSession, NetworkConnector};
use crate::error::{GatewayError, OperationContext, Result};
use crate::model::QuotaSnapshot;

/// Folder whose quota root is reported.
const QUOTA_FOLDER: &str = "INBOX";

/// Reports mailbox usage.
///
/// Quota is advisory: a server without the QUOTA extension, or one that
/// answers with something unusable, yields the tenant default marked as
/// unverified instead of an error.
#[derive(Debug, Clone, Default)]
pub struct QuotaInspector<C = NetworkConnector> {
    manager: ConnectionManager<C>,
}

impl<C: ImapConnector> QuotaInspector<C> {
    /// Creates an inspector.
    #[must_use]
    pub const fn new(manager: ConnectionManager<C>) -> Self {
        Self { manager }
    }

    /// Usage of the account's mailbox in KiB.
    ///
    /// # Errors
    ///
    /// Configuration, authentication and transient connection errors are
    /// returned; protocol errors fall back to the default quota.
    pub async fn get_quota(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
    ) -> Result<QuotaSnapshot> {
        account.validate(config)?;
        let context = OperationContext::new(account.address.clone(), "get_quota");
        let span = info_span!("get_quota", account = %account.address, operation = "get_quota");

        let outcome = self
            .manager
            .with_imap(config, &context, async |session| {
                session.storage_quota(QUOTA_FOLDER).await
            })
            .instrument(span)
            .await;

        match outcome {
            Ok(Some((used, total))) => Ok(QuotaSnapshot::measured(used, total)),
            Ok(None) => Ok(QuotaSnapshot::unverified(config.default_quota_kb)),
            Err(e @ GatewayError::Protocol { .. }) => {
                warn!(account = %account.address, error = %e, "quota unavailable, using default");
                Ok(QuotaSnapshot::unverified(config.default_quota_kb))
            }
            Err(e) => Err(e),
        }
    }
}
