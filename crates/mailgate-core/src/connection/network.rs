//! Sessions over real sockets, driving the `mailgate-smtp` and
//! `mailgate-imap` clients.

use std::future::Future;
use std::mem;
use std::time::Duration;

use async_trait::async_trait;
use mailgate_imap::connection::{
    connect_plain as connect_imap_plain, connect_tls as connect_imap_tls,
};
use mailgate_imap::{
    Authenticated as ImapAuthenticated, Client as ImapClient, FetchItem, FetchItems, Flag,
    ImapStream, Mailbox, MailboxAccess, Quota, SearchCriteria, Selected, SeqNum, SequenceSet,
    StoreAction,
};
use mailgate_smtp::connection::{connect, connect_tls};
use mailgate_smtp::{
    Address, Authenticated as SmtpAuthenticated, Client as SmtpClient, Connected, MailTransaction,
    RcptOutcome, RecipientAdded,
};
use tracing::{debug, warn};

use super::{ImapConnector, ImapSession, SmtpConnector, SmtpDelivery, SmtpSession, bounded};
use crate::config::{Security, TenantMailConfig};
use crate::error::{GatewayError, OperationContext, RejectedRecipient, Result};
use crate::model::Folder;

/// Connector that opens TCP/TLS connections to the tenant's providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

async fn smtp_step<T>(
    limit: Duration,
    context: &OperationContext,
    fut: impl Future<Output = mailgate_smtp::Result<T>>,
) -> Result<T> {
    bounded(limit, context, async {
        fut.await.map_err(|e| GatewayError::from_smtp(context, &e))
    })
    .await
}

async fn imap_step<T>(
    limit: Duration,
    context: &OperationContext,
    fut: impl Future<Output = mailgate_imap::Result<T>>,
) -> Result<T> {
    bounded(limit, context, async {
        fut.await.map_err(|e| GatewayError::from_imap(context, &e))
    })
    .await
}

enum SmtpState {
    Connected(SmtpClient<Connected>),
    Authenticated(SmtpClient<SmtpAuthenticated>),
    Closed,
}

/// SMTP session over a socket.
pub struct NetworkSmtpSession {
    state: SmtpState,
    timeout: Duration,
    context: OperationContext,
}

impl std::fmt::Debug for NetworkSmtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            SmtpState::Connected(_) => "connected",
            SmtpState::Authenticated(_) => "authenticated",
            SmtpState::Closed => "closed",
        };
        f.debug_struct("NetworkSmtpSession")
            .field("state", &state)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SmtpConnector for NetworkConnector {
    type Session = NetworkSmtpSession;

    async fn connect_smtp(
        &self,
        config: &TenantMailConfig,
        context: &OperationContext,
    ) -> Result<NetworkSmtpSession> {
        let settings = &config.smtp;
        let limit = config.timeout();
        let security = settings.security();
        debug!(host = %settings.host, port = settings.port, ?security, "connecting to SMTP server");

        let stream = match security {
            Security::Tls => {
                smtp_step(limit, context, connect_tls(&settings.host, settings.port)).await?
            }
            Security::StartTls | Security::None => {
                smtp_step(limit, context, connect(&settings.host, settings.port)).await?
            }
        };
        let client = smtp_step(limit, context, SmtpClient::from_stream(stream)).await?;
        let mut client = smtp_step(limit, context, client.ehlo(&config.domain)).await?;
        if security == Security::StartTls {
            client = smtp_step(limit, context, client.starttls(&settings.host)).await?;
        }

        let state = if settings.username.is_empty() {
            SmtpState::Connected(client)
        } else {
            let client = smtp_step(
                limit,
                context,
                client.login(&settings.username, &settings.password),
            )
            .await?;
            SmtpState::Authenticated(client)
        };

        Ok(NetworkSmtpSession {
            state,
            timeout: limit,
            context: context.clone(),
        })
    }
}

/// Envelope state while recipients are being proposed.
enum Envelope {
    Empty(SmtpClient<MailTransaction>),
    Open(SmtpClient<RecipientAdded>),
}

#[async_trait]
impl SmtpSession for NetworkSmtpSession {
    async fn send_mail(
        &mut self,
        from: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<SmtpDelivery> {
        let limit = self.timeout;
        let context = &self.context;
        let sender = Address::new(from).map_err(|e| GatewayError::from_smtp(context, &e))?;

        let transaction = match mem::replace(&mut self.state, SmtpState::Closed) {
            SmtpState::Connected(client) => {
                smtp_step(limit, context, client.mail_from(sender, Some(message.len()))).await?
            }
            SmtpState::Authenticated(client) => {
                smtp_step(limit, context, client.mail_from(sender, Some(message.len()))).await?
            }
            SmtpState::Closed => return Err(GatewayError::protocol(context, "session is closed")),
        };

        let mut delivery = SmtpDelivery::default();
        let mut envelope = Envelope::Empty(transaction);
        for recipient in recipients {
            let address =
                Address::new(recipient.as_str()).map_err(|e| GatewayError::from_smtp(context, &e))?;
            let (next, refusal) = match envelope {
                Envelope::Empty(client) => {
                    match smtp_step(limit, context, client.rcpt_to(address)).await? {
                        RcptOutcome::Accepted(client) => (Envelope::Open(client), None),
                        RcptOutcome::Rejected { client, reply } => {
                            (Envelope::Empty(client), Some(reply))
                        }
                    }
                }
                Envelope::Open(client) => {
                    match smtp_step(limit, context, client.rcpt_to(address)).await? {
                        RcptOutcome::Accepted(client) => (Envelope::Open(client), None),
                        RcptOutcome::Rejected { client, reply } => {
                            (Envelope::Open(client), Some(reply))
                        }
                    }
                }
            };
            envelope = next;

            match refusal {
                None => delivery.accepted.push(recipient.clone()),
                Some(reply) => {
                    let reason = format!("{} {}", reply.code, reply.message_text());
                    warn!(%context, recipient = %recipient, %reason, "recipient rejected");
                    delivery.rejected.push(RejectedRecipient {
                        address: recipient.clone(),
                        reason,
                    });
                }
            }
        }

        let client = match envelope {
            Envelope::Open(client) => {
                let data = smtp_step(limit, context, client.data()).await?;
                smtp_step(limit, context, data.send_message(message)).await?
            }
            Envelope::Empty(client) => smtp_step(limit, context, client.reset()).await?,
        };
        self.state = SmtpState::Connected(client);
        Ok(delivery)
    }

    async fn close(&mut self) {
        let result = match mem::replace(&mut self.state, SmtpState::Closed) {
            SmtpState::Connected(client) => {
                Some(smtp_step(self.timeout, &self.context, client.quit()).await)
            }
            SmtpState::Authenticated(client) => {
                Some(smtp_step(self.timeout, &self.context, client.quit()).await)
            }
            SmtpState::Closed => None,
        };
        if let Some(Err(e)) = result {
            debug!(context = %self.context, error = %e, "QUIT failed; dropping connection");
        }
    }
}

enum ImapState {
    Authenticated(ImapClient<ImapStream, ImapAuthenticated>),
    Selected(ImapClient<ImapStream, Selected>),
    Closed,
}

/// Quota of the first root of `mailbox`.
///
/// Servers may answer GETQUOTAROOT with the root names alone; the root's
/// quota is then asked for with GETQUOTA.
async fn quota_of<St: MailboxAccess>(
    client: &mut ImapClient<ImapStream, St>,
    mailbox: &Mailbox,
    limit: Duration,
    context: &OperationContext,
) -> Result<Quota> {
    let root = imap_step(limit, context, client.get_quota_root(mailbox)).await?;
    if let Some(quota) = root.primary() {
        return Ok(quota.clone());
    }
    let Some(name) = root.roots.into_iter().next() else {
        return Err(GatewayError::protocol(context, "mailbox has no quota root"));
    };
    debug!(context = %context, root = %name, "GETQUOTAROOT carried no QUOTA data");
    imap_step(limit, context, client.get_quota(&name)).await
}

/// IMAP session over a socket.
///
/// A failed SELECT loses the session; later calls report a protocol error.
pub struct NetworkImapSession {
    state: ImapState,
    timeout: Duration,
    context: OperationContext,
}

impl std::fmt::Debug for NetworkImapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            ImapState::Authenticated(_) => "authenticated".to_string(),
            ImapState::Selected(client) => format!("selected {}", client.mailbox().as_str()),
            ImapState::Closed => "closed".to_string(),
        };
        f.debug_struct("NetworkImapSession")
            .field("state", &state)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImapConnector for NetworkConnector {
    type Session = NetworkImapSession;

    async fn connect_imap(
        &self,
        config: &TenantMailConfig,
        context: &OperationContext,
    ) -> Result<NetworkImapSession> {
        let settings = &config.imap;
        let limit = config.timeout();
        debug!(
            host = %settings.host,
            port = settings.port,
            tls = settings.use_ssl,
            "connecting to IMAP server"
        );

        let stream = match settings.security() {
            Security::Tls => {
                let connecting = connect_imap_tls(&settings.host, settings.port);
                imap_step(limit, context, connecting).await?
            }
            Security::StartTls | Security::None => {
                let connecting = connect_imap_plain(&settings.host, settings.port);
                imap_step(limit, context, connecting).await?
            }
        };
        let client = imap_step(limit, context, ImapClient::from_stream(stream)).await?;
        let client = imap_step(
            limit,
            context,
            client.login(&settings.username, &settings.password),
        )
        .await?;

        Ok(NetworkImapSession {
            state: ImapState::Authenticated(client),
            timeout: limit,
            context: context.clone(),
        })
    }
}

fn sequence_set(context: &OperationContext, ids: &[u32]) -> Result<SequenceSet> {
    let numbers = ids
        .iter()
        .map(|&id| SeqNum::new(id))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| GatewayError::Config(format!("{context}: message id 0 is invalid")))?;
    SequenceSet::from_numbers(&numbers)
        .ok_or_else(|| GatewayError::Config(format!("{context}: no message ids given")))
}

impl NetworkImapSession {
    fn selected(&mut self) -> Result<&mut ImapClient<ImapStream, Selected>> {
        match &mut self.state {
            ImapState::Selected(client) => Ok(client),
            _ => Err(GatewayError::protocol(&self.context, "no folder selected")),
        }
    }
}

#[async_trait]
impl ImapSession for NetworkImapSession {
    async fn select(&mut self, folder: &str) -> Result<u32> {
        let mailbox = Mailbox::new(folder);
        let limit = self.timeout;
        let context = &self.context;
        let client = match mem::replace(&mut self.state, ImapState::Closed) {
            ImapState::Authenticated(client) => {
                imap_step(limit, context, client.select(&mailbox)).await?
            }
            ImapState::Selected(client) => {
                imap_step(limit, context, client.select(&mailbox)).await?
            }
            ImapState::Closed => return Err(GatewayError::protocol(context, "session is closed")),
        };
        let exists = client.status().exists;
        self.state = ImapState::Selected(client);
        Ok(exists)
    }

    async fn search(&mut self, unseen_only: bool) -> Result<Vec<u32>> {
        let criteria = if unseen_only {
            SearchCriteria::Unseen
        } else {
            SearchCriteria::All
        };
        let (limit, context) = (self.timeout, self.context.clone());
        let client = self.selected()?;
        let hits = imap_step(limit, &context, client.search(criteria)).await?;
        Ok(hits.into_iter().map(SeqNum::get).collect())
    }

    async fn fetch_raw(&mut self, ids: &[u32]) -> Result<Vec<(u32, Vec<u8>)>> {
        let (limit, context) = (self.timeout, self.context.clone());
        let set = sequence_set(&context, ids)?;
        let client = self.selected()?;
        let fetched =
            imap_step(limit, &context, client.fetch(&set, FetchItems::full_message())).await?;

        Ok(fetched
            .into_iter()
            .filter_map(|(seq, items)| {
                items.into_iter().find_map(|item| match item {
                    FetchItem::Body {
                        data: Some(data), ..
                    } => Some((seq.get(), data)),
                    _ => None,
                })
            })
            .collect())
    }

    async fn mark_seen(&mut self, ids: &[u32]) -> Result<()> {
        let (limit, context) = (self.timeout, self.context.clone());
        let set = sequence_set(&context, ids)?;
        let client = self.selected()?;
        let action = StoreAction::AddFlags(vec![Flag::Seen]);
        imap_step(limit, &context, client.store(&set, action)).await
    }

    async fn mark_deleted(&mut self, ids: &[u32]) -> Result<()> {
        let (limit, context) = (self.timeout, self.context.clone());
        let set = sequence_set(&context, ids)?;
        let client = self.selected()?;
        let action = StoreAction::AddFlags(vec![Flag::Deleted]);
        imap_step(limit, &context, client.store(&set, action)).await
    }

    async fn copy(&mut self, ids: &[u32], destination: &str) -> Result<()> {
        let (limit, context) = (self.timeout, self.context.clone());
        let set = sequence_set(&context, ids)?;
        let client = self.selected()?;
        imap_step(limit, &context, client.copy(&set, &Mailbox::new(destination))).await
    }

    async fn expunge(&mut self) -> Result<()> {
        let (limit, context) = (self.timeout, self.context.clone());
        let client = self.selected()?;
        imap_step(limit, &context, client.expunge()).await.map(|_| ())
    }

    async fn create_folder(&mut self, name: &str) -> Result<()> {
        let mailbox = Mailbox::new(name);
        let (limit, context) = (self.timeout, &self.context);
        match &mut self.state {
            ImapState::Authenticated(client) => {
                imap_step(limit, context, client.create(&mailbox)).await
            }
            ImapState::Selected(client) => {
                imap_step(limit, context, client.create(&mailbox)).await
            }
            ImapState::Closed => Err(GatewayError::protocol(context, "session is closed")),
        }
    }

    async fn delete_folder(&mut self, name: &str) -> Result<()> {
        let mailbox = Mailbox::new(name);
        let (limit, context) = (self.timeout, &self.context);
        match &mut self.state {
            ImapState::Authenticated(client) => {
                imap_step(limit, context, client.delete(&mailbox)).await
            }
            ImapState::Selected(client) => {
                imap_step(limit, context, client.delete(&mailbox)).await
            }
            ImapState::Closed => Err(GatewayError::protocol(context, "session is closed")),
        }
    }

    async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        let (limit, context) = (self.timeout, &self.context);
        let entries = match &mut self.state {
            ImapState::Authenticated(client) => {
                imap_step(limit, context, client.list("", "*")).await?
            }
            ImapState::Selected(client) => {
                imap_step(limit, context, client.list("", "*")).await?
            }
            ImapState::Closed => return Err(GatewayError::protocol(context, "session is closed")),
        };
        Ok(entries.into_iter().map(Folder::from).collect())
    }

    async fn storage_quota(&mut self, folder: &str) -> Result<Option<(u64, u64)>> {
        let mailbox = Mailbox::new(folder);
        let (limit, context) = (self.timeout, &self.context);
        let quota = match &mut self.state {
            ImapState::Authenticated(client) if client.supports_quota() => {
                quota_of(client, &mailbox, limit, context).await?
            }
            ImapState::Selected(client) if client.supports_quota() => {
                quota_of(client, &mailbox, limit, context).await?
            }
            ImapState::Closed => return Err(GatewayError::protocol(context, "session is closed")),
            _ => return Ok(None),
        };

        let storage = quota
            .storage()
            .ok_or_else(|| GatewayError::protocol(context, "quota root has no STORAGE resource"))?;
        Ok(Some((storage.usage, storage.limit)))
    }

    async fn close(&mut self) {
        let result = match mem::replace(&mut self.state, ImapState::Closed) {
            ImapState::Authenticated(client) => {
                Some(imap_step(self.timeout, &self.context, client.logout()).await)
            }
            ImapState::Selected(client) => {
                Some(imap_step(self.timeout, &self.context, client.logout()).await)
            }
            ImapState::Closed => None,
        };
        if let Some(Err(e)) = result {
            debug!(context = %self.context, error = %e, "LOGOUT failed; dropping connection");
        }
    }
}
