//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::states::{Authenticated, MailboxAccess, Selected};
use super::{Client, Completion};
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{ListResponse, Mailbox, MailboxStatus, Quota, QuotaRoot, ResponseCode};
use crate::{Error, Result};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    pub async fn select(mut self, mailbox: &Mailbox) -> Result<Client<S, Selected>> {
        let completion = self
            .execute(&Command::Select {
                mailbox: mailbox.clone(),
            })
            .await?;
        let status = mailbox_status(&completion);
        debug!(mailbox = %mailbox, exists = status.exists, "mailbox selected");

        Ok(self.into_state(Selected {
            mailbox: mailbox.clone(),
            status,
        }))
    }
}

/// Mailbox-level commands, valid in both authenticated and selected states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: MailboxAccess,
{
    /// Lists mailboxes matching `pattern` under `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let completion = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Create {
            mailbox: mailbox.clone(),
        })
        .await
        .map(|_| ())
    }

    /// Deletes a mailbox.
    pub async fn delete(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Delete {
            mailbox: mailbox.clone(),
        })
        .await
        .map(|_| ())
    }

    /// Issues GETQUOTAROOT for `mailbox`.
    ///
    /// The returned [`QuotaRoot`] carries every QUOTA response the server sent
    /// alongside the roots.
    pub async fn get_quota_root(&mut self, mailbox: &Mailbox) -> Result<QuotaRoot> {
        let completion = self
            .execute(&Command::GetQuotaRoot {
                mailbox: mailbox.clone(),
            })
            .await?;

        let mut result = QuotaRoot {
            mailbox: mailbox.as_str().to_string(),
            ..QuotaRoot::default()
        };
        for response in completion.untagged {
            match response {
                UntaggedResponse::QuotaRoot { mailbox, roots } => {
                    result.mailbox = mailbox;
                    result.roots = roots;
                }
                UntaggedResponse::Quota(quota) => result.quotas.push(quota),
                _ => {}
            }
        }
        Ok(result)
    }

    /// Issues GETQUOTA for a quota root.
    pub async fn get_quota(&mut self, root: &str) -> Result<Quota> {
        let completion = self
            .execute(&Command::GetQuota {
                root: root.to_string(),
            })
            .await?;

        completion
            .untagged
            .into_iter()
            .find_map(|r| match r {
                UntaggedResponse::Quota(quota) => Some(quota),
                _ => None,
            })
            .ok_or_else(|| Error::Protocol(format!("no QUOTA data for root {root:?}")))
    }
}

/// Builds the SELECT status snapshot from its untagged data.
pub(super) fn mailbox_status(completion: &Completion) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: matches!(completion.code, Some(ResponseCode::ReadOnly)),
        ..MailboxStatus::default()
    };

    for response in &completion.untagged {
        match response {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::Unseen(seq) => status.unseen = Some(*seq),
                ResponseCode::PermanentFlags(flags) => status.permanent_flags.clone_from(flags),
                _ => {}
            },
            _ => {}
        }
    }
    status
}
