//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::authenticated::mailbox_status;
use super::states::Selected;
use crate::command::{Command, FetchItems, SearchCriteria, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Mailbox, MailboxStatus, SeqNum, SequenceSet};
use crate::Result;

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        self.state.mailbox()
    }

    /// Returns the status snapshot taken at SELECT time.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        self.state.status()
    }

    /// Selects another mailbox without expunging the current one.
    pub async fn select(mut self, mailbox: &Mailbox) -> Result<Self> {
        let completion = self
            .execute(&Command::Select {
                mailbox: mailbox.clone(),
            })
            .await?;
        self.state = Selected {
            mailbox: mailbox.clone(),
            status: mailbox_status(&completion),
        };
        debug!(mailbox = %mailbox, exists = self.state.status.exists, "mailbox selected");
        Ok(self)
    }

    /// Searches the mailbox, returning matching sequence numbers in server order.
    pub async fn search(&mut self, criteria: SearchCriteria) -> Result<Vec<SeqNum>> {
        let completion = self.execute(&Command::Search { criteria }).await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Search(hits) => Some(hits),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Fetches data items for a set of messages.
    ///
    /// Each untagged FETCH is returned as its own entry; a server may send
    /// several for one message.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        let completion = self
            .execute(&Command::Fetch {
                sequence: sequence.clone(),
                items,
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Fetch { seq, items } => Some((seq, items)),
                _ => None,
            })
            .collect())
    }

    /// Changes flags with `.SILENT`, so no FETCH echo is expected.
    pub async fn store(&mut self, sequence: &SequenceSet, action: StoreAction) -> Result<()> {
        self.execute(&Command::Store {
            sequence: sequence.clone(),
            action,
            silent: true,
        })
        .await
        .map(|_| ())
    }

    /// Copies messages to another mailbox.
    pub async fn copy(&mut self, sequence: &SequenceSet, mailbox: &Mailbox) -> Result<()> {
        self.execute(&Command::Copy {
            sequence: sequence.clone(),
            mailbox: mailbox.clone(),
        })
        .await
        .map(|_| ())
    }

    /// Permanently removes `\Deleted` messages, returning the expunged
    /// sequence numbers in the order the server reported them.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        let completion = self.execute(&Command::Expunge).await?;

        let expunged: Vec<SeqNum> = completion
            .untagged
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect();
        debug!(count = expunged.len(), "messages expunged");
        Ok(expunged)
    }
}
