//! Reading and organizing a tenant mailbox over IMAP.
//!
//! Message ids are IMAP sequence numbers rendered as strings. They are
//! only meaningful within the folder they were listed from, and shift when
//! messages before them are expunged.

use tracing::{Instrument, debug, info_span, warn};

use crate::account::MailAccount;
use crate::config::TenantMailConfig;
use crate::connection::{ConnectionManager, ImapConnector, ImapSession, NetworkConnector};
use crate::error::{GatewayError, OperationContext, Result};
use crate::model::{Folder, InboundAttachment, InboundMessage};

/// Mailbox operations, each on its own IMAP session.
///
/// Concurrent operations on the same mailbox are not coordinated; two
/// callers deleting at once race exactly as two IMAP clients would.
#[derive(Debug, Clone, Default)]
pub struct MailboxReader<C = NetworkConnector> {
    manager: ConnectionManager<C>,
}

fn parse_ids(context: &OperationContext, ids: &[String]) -> Result<Vec<u32>> {
    ids.iter()
        .map(|id| match id.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(GatewayError::Config(format!("{context}: invalid message id {id:?}"))),
        })
        .collect()
}

/// Converts a fetched message. Parts whose encoding is broken are skipped.
fn to_inbound(id: u32, raw: &[u8]) -> std::result::Result<InboundMessage, mailgate_mime::Error> {
    let message = mailgate_mime::Message::parse(raw)?;
    let text_body = message.text_body().unwrap_or_else(|e| {
        warn!(id, error = %e, "undecodable text part");
        None
    });
    let html_body = message.html_body().unwrap_or_else(|e| {
        warn!(id, error = %e, "undecodable html part");
        None
    });

    let attachments = message
        .root()
        .leaves()
        .into_iter()
        .filter(|part| part.is_attachment())
        .filter_map(|part| {
            let name = part.filename().unwrap_or_else(|| "attachment".to_string());
            match part.decode_body() {
                Ok(data) => Some(InboundAttachment {
                    mime_type: part.content_type().mime_type(),
                    size: data.len(),
                    name,
                    data,
                }),
                Err(e) => {
                    warn!(id, attachment = %name, error = %e, "undecodable attachment");
                    None
                }
            }
        })
        .collect();

    Ok(InboundMessage {
        id: id.to_string(),
        subject: message.subject().unwrap_or_default(),
        sender: message.from().unwrap_or_default(),
        date: message.date().unwrap_or_default().to_string(),
        text_body,
        html_body,
        attachments,
    })
}

impl<C: ImapConnector> MailboxReader<C> {
    /// Creates a reader.
    #[must_use]
    pub const fn new(manager: ConnectionManager<C>) -> Self {
        Self { manager }
    }

    /// The connection manager in use.
    #[must_use]
    pub const fn manager(&self) -> &ConnectionManager<C> {
        &self.manager
    }

    fn context(
        config: &TenantMailConfig,
        account: &MailAccount,
        operation: &'static str,
    ) -> Result<OperationContext> {
        account.validate(config)?;
        Ok(OperationContext::new(account.address.clone(), operation))
    }

    /// Lists the most recent `limit` messages of `folder`, oldest first.
    ///
    /// `limit == 0` returns every match. Fetching does not set `\Seen`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid configuration or
    /// account, or the session's error.
    pub async fn list_messages(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
        folder: &str,
        unseen_only: bool,
        limit: usize,
    ) -> Result<Vec<InboundMessage>> {
        let context = Self::context(config, account, "list_messages")?;
        let span = info_span!(
            "list_messages",
            account = %account.address,
            operation = "list_messages",
            folder
        );

        self.manager
            .with_imap(config, &context, async |session| {
                session.select(folder).await?;
                let mut ids = session.search(unseen_only).await?;
                ids.sort_unstable();
                if limit > 0 && ids.len() > limit {
                    ids = ids.split_off(ids.len() - limit);
                }
                if ids.is_empty() {
                    return Ok(Vec::new());
                }

                let mut fetched = session.fetch_raw(&ids).await?;
                fetched.sort_by_key(|(id, _)| *id);
                debug!(requested = ids.len(), fetched = fetched.len(), "messages fetched");

                Ok(fetched
                    .iter()
                    .filter_map(|(id, raw)| match to_inbound(*id, raw) {
                        Ok(message) => Some(message),
                        Err(e) => {
                            warn!(id, error = %e, "skipping unparseable message");
                            None
                        }
                    })
                    .collect())
            })
            .instrument(span)
            .await
    }

    /// Sets `\Seen` on messages. Repeating the call is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for malformed ids, or the session's error.
    pub async fn mark_read(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
        folder: &str,
        ids: &[String],
    ) -> Result<()> {
        let context = Self::context(config, account, "mark_read")?;
        let ids = parse_ids(&context, ids)?;
        if ids.is_empty() {
            return Ok(());
        }
        let span = info_span!(
            "mark_read",
            account = %account.address,
            operation = "mark_read",
            folder
        );

        self.manager
            .with_imap(config, &context, async |session| {
                session.select(folder).await?;
                session.mark_seen(&ids).await
            })
            .instrument(span)
            .await
    }

    /// Deletes messages: `\Deleted` followed by EXPUNGE.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for malformed ids, or the session's error.
    pub async fn delete(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
        folder: &str,
        ids: &[String],
    ) -> Result<()> {
        let context = Self::context(config, account, "delete")?;
        let ids = parse_ids(&context, ids)?;
        if ids.is_empty() {
            return Ok(());
        }
        let span = info_span!("delete", account = %account.address, operation = "delete", folder);

        self.manager
            .with_imap(config, &context, async |session| {
                session.select(folder).await?;
                session.mark_deleted(&ids).await?;
                session.expunge().await
            })
            .instrument(span)
            .await
    }

    /// Moves messages with COPY, `\Deleted` and EXPUNGE.
    ///
    /// Not atomic: if the session dies after COPY the message exists in
    /// both folders. Callers get at-least-once semantics.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for malformed ids, or the session's error.
    pub async fn move_messages(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
        folder: &str,
        ids: &[String],
        destination: &str,
    ) -> Result<()> {
        let context = Self::context(config, account, "move")?;
        let ids = parse_ids(&context, ids)?;
        if ids.is_empty() {
            return Ok(());
        }
        let span = info_span!(
            "move",
            account = %account.address,
            operation = "move",
            folder,
            destination
        );

        self.manager
            .with_imap(config, &context, async |session| {
                session.select(folder).await?;
                session.copy(&ids, destination).await?;
                session.mark_deleted(&ids).await?;
                session.expunge().await
            })
            .instrument(span)
            .await
    }

    /// Creates a folder.
    ///
    /// # Errors
    ///
    /// Returns the session's error, e.g. when the folder exists.
    pub async fn create_folder(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
        name: &str,
    ) -> Result<()> {
        let context = Self::context(config, account, "create_folder")?;
        self.manager
            .with_imap(config, &context, async |session| session.create_folder(name).await)
            .await
    }

    /// Deletes a folder.
    ///
    /// # Errors
    ///
    /// Returns the session's error, e.g. when the folder does not exist.
    pub async fn delete_folder(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
        name: &str,
    ) -> Result<()> {
        let context = Self::context(config, account, "delete_folder")?;
        self.manager
            .with_imap(config, &context, async |session| session.delete_folder(name).await)
            .await
    }

    /// Lists every folder.
    ///
    /// # Errors
    ///
    /// Returns the session's error.
    pub async fn list_folders(
        &self,
        config: &TenantMailConfig,
        account: &MailAccount,
    ) -> Result<Vec<Folder>> {
        let context = Self::context(config, account, "list_folders")?;
        self.manager
            .with_imap(config, &context, async |session| session.list_folders().await)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, account, raw_message, valid_config};

    fn reader(connector: &FakeConnector) -> MailboxReader<FakeConnector> {
        MailboxReader::new(ConnectionManager::new(connector.clone()))
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn seeded() -> FakeConnector {
        let connector = FakeConnector::default();
        for n in 1..=5 {
            connector.add_message("INBOX", raw_message(&format!("Message {n}")));
        }
        connector.add_folder("Archive");
        connector
    }

    #[tokio::test]
    async fn lists_most_recent_messages() {
        let connector = seeded();
        let messages = reader(&connector)
            .list_messages(&valid_config(), &account(), "INBOX", false, 2)
            .await
            .unwrap();

        let subjects: Vec<_> = messages.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Message 4", "Message 5"]);
        assert_eq!(messages[0].id, "4");
        assert_eq!(messages[0].sender, "Zoë <zoe@x.example>");
        assert_eq!(messages[0].text_body.as_deref(), Some("Body of Message 4"));
        assert_eq!(messages[0].attachments.len(), 1);
        assert_eq!(messages[0].attachments[0].name, "notes.txt");
        assert_eq!(messages[0].attachments[0].mime_type, "text/plain");
        assert_eq!(messages[0].attachments[0].size, 5);
        assert_eq!(connector.imap_closes(), 1);
    }

    #[tokio::test]
    async fn zero_limit_lists_everything() {
        let connector = seeded();
        let messages = reader(&connector)
            .list_messages(&valid_config(), &account(), "INBOX", false, 0)
            .await
            .unwrap();
        assert_eq!(messages.len(), 5);
    }

    #[tokio::test]
    async fn unseen_filter_and_idempotent_mark_read() {
        let connector = seeded();
        let reader = reader(&connector);
        let (config, account) = (valid_config(), account());

        reader.mark_read(&config, &account, "INBOX", &ids(&["1", "2"])).await.unwrap();
        let after_first = connector.snapshot("INBOX");
        reader.mark_read(&config, &account, "INBOX", &ids(&["1", "2"])).await.unwrap();
        assert_eq!(connector.snapshot("INBOX"), after_first);

        let unseen = reader
            .list_messages(&config, &account, "INBOX", true, 50)
            .await
            .unwrap();
        let unseen_ids: Vec<_> = unseen.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(unseen_ids, vec!["3", "4", "5"]);
    }

    #[tokio::test]
    async fn move_leaves_source_and_reaches_destination() {
        let connector = seeded();
        let reader = reader(&connector);
        let (config, account) = (valid_config(), account());

        reader
            .move_messages(&config, &account, "INBOX", &ids(&["2"]), "Archive")
            .await
            .unwrap();

        let archived = reader.list_messages(&config, &account, "Archive", false, 0).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].subject, "Message 2");

        let inbox = reader.list_messages(&config, &account, "INBOX", false, 0).await.unwrap();
        assert!(inbox.iter().all(|m| m.subject != "Message 2"));
        assert_eq!(inbox.len(), 4);
    }

    #[tokio::test]
    async fn failed_copy_deletes_nothing() {
        let connector = seeded();
        let err = reader(&connector)
            .move_messages(&valid_config(), &account(), "INBOX", &ids(&["1"]), "Missing")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Protocol { .. }));
        assert_eq!(connector.snapshot("INBOX").len(), 5);
        assert_eq!(connector.imap_closes(), 1);
    }

    #[tokio::test]
    async fn delete_expunges() {
        let connector = seeded();
        reader(&connector)
            .delete(&valid_config(), &account(), "INBOX", &ids(&["1", "5"]))
            .await
            .unwrap();
        assert_eq!(connector.snapshot("INBOX").len(), 3);
    }

    #[tokio::test]
    async fn malformed_ids_fail_before_connecting() {
        let connector = seeded();
        let err = reader(&connector)
            .delete(&valid_config(), &account(), "INBOX", &ids(&["1", "x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));

        reader(&connector)
            .mark_read(&valid_config(), &account(), "INBOX", &[])
            .await
            .unwrap();
        assert_eq!(connector.imap_connects(), 0);
    }

    #[tokio::test]
    async fn folder_management() {
        let connector = seeded();
        let reader = reader(&connector);
        let (config, account) = (valid_config(), account());

        reader.create_folder(&config, &account, "Projects").await.unwrap();
        assert!(reader.create_folder(&config, &account, "Projects").await.is_err());

        let names: Vec<_> = reader
            .list_folders(&config, &account)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Archive", "INBOX", "Projects"]);

        reader.delete_folder(&config, &account, "Projects").await.unwrap();
        assert!(reader.delete_folder(&config, &account, "Projects").await.is_err());
        assert_eq!(connector.imap_connects(), connector.imap_closes());
    }

    #[test]
    fn broken_multipart_is_reported() {
        let raw = b"Subject: x\r\nContent-Type: multipart/mixed\r\n\r\nbody";
        assert!(to_inbound(1, raw).is_err());
    }
}
