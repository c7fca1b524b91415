//! In-memory connectors for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::account::MailAccount;
use crate::config::{ImapSettings, SmtpSettings, TenantMailConfig};
use crate::connection::{ImapConnector, ImapSession, SmtpConnector, SmtpDelivery, SmtpSession};
use crate::error::{GatewayError, OperationContext, RejectedRecipient, Result};
use crate::model::Folder;

pub fn valid_config() -> TenantMailConfig {
    TenantMailConfig {
        domain: "uni.example".into(),
        smtp: SmtpSettings {
            host: "smtp.uni.example".into(),
            username: "gateway".into(),
            password: "secret".into(),
            ..SmtpSettings::default()
        },
        imap: ImapSettings {
            host: "imap.uni.example".into(),
            username: "gateway".into(),
            password: "secret".into(),
            ..ImapSettings::default()
        },
        ..TenantMailConfig::default()
    }
}

pub fn account() -> MailAccount {
    MailAccount::new("alice@uni.example").with_display_name("Alice Martin")
}

/// A multipart message with a text body and a five byte attachment.
pub fn raw_message(subject: &str) -> Vec<u8> {
    format!(
        "From: =?utf-8?B?Wm/Dqw==?= <zoe@x.example>\r\n\
         To: alice@uni.example\r\n\
         Subject: {subject}\r\n\
         Date: Tue, 1 Oct 2024 10:00:00 +0000\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
         \r\n\
         --b1\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         Body of {subject}\r\n\
         --b1\r\n\
         Content-Type: text/plain; name=\"notes.txt\"\r\n\
         Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         aGVsbG8=\r\n\
         --b1--\r\n"
    )
    .into_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMessage {
    pub raw: Vec<u8>,
    pub seen: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub from: String,
    pub recipients: Vec<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum FakeQuota {
    #[default]
    Unsupported,
    Malformed,
    Storage { usage: u64, limit: u64 },
}

#[derive(Debug)]
struct FakeState {
    auth_fails: bool,
    smtp_connects: usize,
    smtp_closes: usize,
    imap_connects: usize,
    imap_closes: usize,
    rejections: HashMap<String, String>,
    sent: Vec<SentMail>,
    folders: BTreeMap<String, Vec<FakeMessage>>,
    quota: FakeQuota,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            auth_fails: false,
            smtp_connects: 0,
            smtp_closes: 0,
            imap_connects: 0,
            imap_closes: 0,
            rejections: HashMap::new(),
            sent: Vec::new(),
            folders: BTreeMap::from([("INBOX".to_string(), Vec::new())]),
            quota: FakeQuota::default(),
        }
    }
}

/// Connector whose clones share one in-memory server.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn fail_auth(&self) {
        self.with(|s| s.auth_fails = true);
    }

    pub fn reject(&self, address: &str, reason: &str) {
        self.with(|s| {
            s.rejections.insert(address.to_string(), reason.to_string());
        });
    }

    pub fn set_quota(&self, quota: FakeQuota) {
        self.with(|s| s.quota = quota);
    }

    pub fn add_folder(&self, name: &str) {
        self.with(|s| {
            s.folders.entry(name.to_string()).or_default();
        });
    }

    pub fn add_message(&self, folder: &str, raw: Vec<u8>) {
        self.with(|s| {
            s.folders.entry(folder.to_string()).or_default().push(FakeMessage {
                raw,
                seen: false,
                deleted: false,
            });
        });
    }

    pub fn snapshot(&self, folder: &str) -> Vec<FakeMessage> {
        self.with(|s| s.folders.get(folder).cloned().unwrap_or_default())
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.with(|s| s.sent.clone())
    }

    pub fn smtp_connects(&self) -> usize {
        self.with(|s| s.smtp_connects)
    }

    pub fn smtp_closes(&self) -> usize {
        self.with(|s| s.smtp_closes)
    }

    pub fn imap_connects(&self) -> usize {
        self.with(|s| s.imap_connects)
    }

    pub fn imap_closes(&self) -> usize {
        self.with(|s| s.imap_closes)
    }

    fn open(&self, context: &OperationContext, imap: bool) -> Result<()> {
        self.with(|s| {
            if s.auth_fails {
                return Err(GatewayError::Auth {
                    context: context.clone(),
                    cause: "invalid credentials".into(),
                });
            }
            if imap {
                s.imap_connects += 1;
            } else {
                s.smtp_connects += 1;
            }
            Ok(())
        })
    }
}

pub struct FakeSmtpSession {
    server: FakeConnector,
}

#[async_trait]
impl SmtpConnector for FakeConnector {
    type Session = FakeSmtpSession;

    async fn connect_smtp(
        &self,
        _config: &TenantMailConfig,
        context: &OperationContext,
    ) -> Result<FakeSmtpSession> {
        self.open(context, false)?;
        Ok(FakeSmtpSession {
            server: self.clone(),
        })
    }
}

#[async_trait]
impl SmtpSession for FakeSmtpSession {
    async fn send_mail(
        &mut self,
        from: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<SmtpDelivery> {
        self.server.with(|s| {
            let mut delivery = SmtpDelivery::default();
            for recipient in recipients {
                match s.rejections.get(recipient) {
                    Some(reason) => delivery.rejected.push(RejectedRecipient {
                        address: recipient.clone(),
                        reason: reason.clone(),
                    }),
                    None => delivery.accepted.push(recipient.clone()),
                }
            }
            if !delivery.accepted.is_empty() {
                s.sent.push(SentMail {
                    from: from.to_string(),
                    recipients: delivery.accepted.clone(),
                    data: message.to_vec(),
                });
            }
            Ok(delivery)
        })
    }

    async fn close(&mut self) {
        self.server.with(|s| s.smtp_closes += 1);
    }
}

pub struct FakeImapSession {
    server: FakeConnector,
    selected: Option<String>,
    context: OperationContext,
}

#[async_trait]
impl ImapConnector for FakeConnector {
    type Session = FakeImapSession;

    async fn connect_imap(
        &self,
        _config: &TenantMailConfig,
        context: &OperationContext,
    ) -> Result<FakeImapSession> {
        self.open(context, true)?;
        Ok(FakeImapSession {
            server: self.clone(),
            selected: None,
            context: context.clone(),
        })
    }
}

impl FakeImapSession {
    fn in_selected<T>(
        &self,
        f: impl FnOnce(&mut Vec<FakeMessage>, &mut BTreeMap<String, Vec<FakeMessage>>) -> Result<T>,
    ) -> Result<T> {
        let Some(name) = self.selected.clone() else {
            return Err(GatewayError::protocol(&self.context, "no folder selected"));
        };
        self.server.with(|s| {
            let mut messages = s.folders.remove(&name).unwrap_or_default();
            let result = f(&mut messages, &mut s.folders);
            s.folders.insert(name, messages);
            result
        })
    }

    fn check_ids(&self, ids: &[u32], len: usize) -> Result<()> {
        if ids.iter().any(|&id| id == 0 || id as usize > len) {
            return Err(GatewayError::protocol(
                &self.context,
                "BAD invalid message sequence number",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ImapSession for FakeImapSession {
    async fn select(&mut self, folder: &str) -> Result<u32> {
        let count = self.server.with(|s| s.folders.get(folder).map(Vec::len));
        match count {
            Some(count) => {
                self.selected = Some(folder.to_string());
                Ok(u32::try_from(count).unwrap())
            }
            None => {
                self.selected = None;
                Err(GatewayError::protocol(&self.context, "NO [NONEXISTENT] unknown mailbox"))
            }
        }
    }

    async fn search(&mut self, unseen_only: bool) -> Result<Vec<u32>> {
        self.in_selected(|messages, _| {
            Ok((1u32..)
                .zip(messages.iter())
                .filter(|(_, m)| !unseen_only || !m.seen)
                .map(|(id, _)| id)
                .collect())
        })
    }

    async fn fetch_raw(&mut self, ids: &[u32]) -> Result<Vec<(u32, Vec<u8>)>> {
        self.in_selected(|messages, _| {
            Ok(ids
                .iter()
                .filter_map(|&id| {
                    messages
                        .get((id as usize).wrapping_sub(1))
                        .map(|m| (id, m.raw.clone()))
                })
                .collect())
        })
    }

    async fn mark_seen(&mut self, ids: &[u32]) -> Result<()> {
        let checked = self.in_selected(|messages, _| Ok(messages.len()))?;
        self.check_ids(ids, checked)?;
        self.in_selected(|messages, _| {
            for &id in ids {
                messages[id as usize - 1].seen = true;
            }
            Ok(())
        })
    }

    async fn mark_deleted(&mut self, ids: &[u32]) -> Result<()> {
        let checked = self.in_selected(|messages, _| Ok(messages.len()))?;
        self.check_ids(ids, checked)?;
        self.in_selected(|messages, _| {
            for &id in ids {
                messages[id as usize - 1].deleted = true;
            }
            Ok(())
        })
    }

    async fn copy(&mut self, ids: &[u32], destination: &str) -> Result<()> {
        let checked = self.in_selected(|messages, _| Ok(messages.len()))?;
        self.check_ids(ids, checked)?;
        let context = self.context.clone();
        self.in_selected(|messages, folders| {
            let Some(target) = folders.get_mut(destination) else {
                return Err(GatewayError::protocol(&context, "NO [TRYCREATE] no such mailbox"));
            };
            for &id in ids {
                let mut copy = messages[id as usize - 1].clone();
                copy.deleted = false;
                target.push(copy);
            }
            Ok(())
        })
    }

    async fn expunge(&mut self) -> Result<()> {
        self.in_selected(|messages, _| {
            messages.retain(|m| !m.deleted);
            Ok(())
        })
    }

    async fn create_folder(&mut self, name: &str) -> Result<()> {
        let created = self.server.with(|s| {
            if s.folders.contains_key(name) {
                false
            } else {
                s.folders.insert(name.to_string(), Vec::new());
                true
            }
        });
        if created {
            Ok(())
        } else {
            Err(GatewayError::protocol(&self.context, "NO mailbox already exists"))
        }
    }

    async fn delete_folder(&mut self, name: &str) -> Result<()> {
        if self.server.with(|s| s.folders.remove(name).is_some()) {
            Ok(())
        } else {
            Err(GatewayError::protocol(&self.context, "NO no such mailbox"))
        }
    }

    async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        Ok(self.server.with(|s| {
            s.folders
                .keys()
                .map(|name| Folder {
                    name: name.clone(),
                    delimiter: Some('/'),
                    attributes: vec!["\\HasNoChildren".to_string()],
                })
                .collect()
        }))
    }

    async fn storage_quota(&mut self, _folder: &str) -> Result<Option<(u64, u64)>> {
        match self.server.with(|s| s.quota) {
            FakeQuota::Unsupported => Ok(None),
            FakeQuota::Malformed => {
                Err(GatewayError::protocol(&self.context, "unexpected QUOTA data"))
            }
            FakeQuota::Storage { usage, limit } => Ok(Some((usage, limit))),
        }
    }

    async fn close(&mut self) {
        self.server.with(|s| s.imap_closes += 1);
    }
}
