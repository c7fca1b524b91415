//! Per-call SMTP and IMAP sessions.
//!
//! Nothing is pooled: every operation connects, authenticates, does its
//! work and closes. [`ConnectionManager::with_smtp`] and
//! [`ConnectionManager::with_imap`] hand the session to an async closure and
//! call `close` exactly once afterwards, whatever the closure returned.
//! A future dropped mid-operation drops the session, which closes the socket.

mod network;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

pub use self::network::{NetworkConnector, NetworkImapSession, NetworkSmtpSession};
use crate::config::TenantMailConfig;
use crate::error::{GatewayError, OperationContext, RejectedRecipient, Result};
use crate::model::Folder;

/// Recipient split of one SMTP transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpDelivery {
    /// Recipients the server accepted.
    pub accepted: Vec<String>,
    /// Recipients the server refused.
    pub rejected: Vec<RejectedRecipient>,
}

/// An authenticated SMTP session.
#[async_trait]
pub trait SmtpSession: Send {
    /// Runs one mail transaction.
    ///
    /// Refused recipients are collected rather than failing the call. The
    /// message data is sent only if at least one recipient was accepted;
    /// otherwise the transaction is reset.
    async fn send_mail(
        &mut self,
        from: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<SmtpDelivery>;

    /// Ends the session. Failures are logged, never returned.
    async fn close(&mut self);
}

/// An authenticated IMAP session.
///
/// Message ids are sequence numbers of the currently selected folder.
#[async_trait]
pub trait ImapSession: Send {
    /// Selects a folder and returns its message count.
    async fn select(&mut self, folder: &str) -> Result<u32>;

    /// Searches the selected folder for all or only unseen messages.
    async fn search(&mut self, unseen_only: bool) -> Result<Vec<u32>>;

    /// Fetches full messages without setting `\Seen`.
    async fn fetch_raw(&mut self, ids: &[u32]) -> Result<Vec<(u32, Vec<u8>)>>;

    /// Sets `\Seen` on messages.
    async fn mark_seen(&mut self, ids: &[u32]) -> Result<()>;

    /// Sets `\Deleted` on messages.
    async fn mark_deleted(&mut self, ids: &[u32]) -> Result<()>;

    /// Copies messages to another folder.
    async fn copy(&mut self, ids: &[u32], destination: &str) -> Result<()>;

    /// Removes `\Deleted` messages from the selected folder.
    async fn expunge(&mut self) -> Result<()>;

    /// Creates a folder.
    async fn create_folder(&mut self, name: &str) -> Result<()>;

    /// Deletes a folder.
    async fn delete_folder(&mut self, name: &str) -> Result<()>;

    /// Lists every folder.
    async fn list_folders(&mut self) -> Result<Vec<Folder>>;

    /// `STORAGE` usage and limit in KiB of the quota root of `folder`,
    /// or `None` when the server has no quota extension.
    async fn storage_quota(&mut self, folder: &str) -> Result<Option<(u64, u64)>>;

    /// Ends the session. Failures are logged, never returned.
    async fn close(&mut self);
}

/// Opens authenticated SMTP sessions.
#[async_trait]
pub trait SmtpConnector: Send + Sync {
    /// Session type produced.
    type Session: SmtpSession;

    /// Connects, negotiates TLS as configured and authenticates.
    async fn connect_smtp(
        &self,
        config: &TenantMailConfig,
        context: &OperationContext,
    ) -> Result<Self::Session>;
}

/// Opens authenticated IMAP sessions.
#[async_trait]
pub trait ImapConnector: Send + Sync {
    /// Session type produced.
    type Session: ImapSession;

    /// Connects, negotiates TLS as configured and logs in.
    async fn connect_imap(
        &self,
        config: &TenantMailConfig,
        context: &OperationContext,
    ) -> Result<Self::Session>;
}

/// Scoped acquisition of sessions.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager<C = NetworkConnector> {
    connector: C,
}

impl<C> ConnectionManager<C> {
    /// Creates a manager around a connector.
    #[must_use]
    pub const fn new(connector: C) -> Self {
        Self { connector }
    }

    /// The connector in use.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs `op` on a fresh SMTP session and closes it afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid configuration, the
    /// connector's error if acquisition fails (including a timeout), or
    /// whatever `op` returned.
    pub async fn with_smtp<T, F>(
        &self,
        config: &TenantMailConfig,
        context: &OperationContext,
        op: F,
    ) -> Result<T>
    where
        C: SmtpConnector,
        F: AsyncFnOnce(&mut C::Session) -> Result<T>,
    {
        config.validate()?;
        let mut session = bounded(
            config.timeout(),
            context,
            self.connector.connect_smtp(config, context),
        )
        .await?;
        debug!(%context, "smtp session acquired");

        let outcome = op(&mut session).await;
        session.close().await;
        debug!(%context, ok = outcome.is_ok(), "smtp session released");
        outcome
    }

    /// Runs `op` on a fresh IMAP session and closes it afterwards.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionManager::with_smtp`].
    pub async fn with_imap<T, F>(
        &self,
        config: &TenantMailConfig,
        context: &OperationContext,
        op: F,
    ) -> Result<T>
    where
        C: ImapConnector,
        F: AsyncFnOnce(&mut C::Session) -> Result<T>,
    {
        config.validate()?;
        let mut session = bounded(
            config.timeout(),
            context,
            self.connector.connect_imap(config, context),
        )
        .await?;
        debug!(%context, "imap session acquired");

        let outcome = op(&mut session).await;
        session.close().await;
        debug!(%context, ok = outcome.is_ok(), "imap session released");
        outcome
    }
}

/// Awaits `fut` for at most `limit`; expiry is a transient failure.
pub(crate) async fn bounded<T>(
    limit: Duration,
    context: &OperationContext,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
        Err(GatewayError::transient(
            context,
            format!("timed out after {}s", limit.as_secs()),
        ))
    })
}
