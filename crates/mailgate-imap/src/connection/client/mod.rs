//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state. Every
//! command runs to its tagged completion before the next one is written, so
//! exchanges on one connection never interleave.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace, warn};

pub use self::states::{Authenticated, MailboxAccess, NotAuthenticated, Selected};
use super::framed::{FramedStream, is_tagged_with};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tag_gen: TagGenerator,
    capabilities: Vec<Capability>,
    state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Outcome of a command that completed with tagged OK.
#[derive(Debug)]
pub(crate) struct Completion {
    /// Untagged data received while the command ran.
    pub(crate) untagged: Vec<UntaggedResponse>,
    /// Response code of the tagged OK.
    pub(crate) code: Option<ResponseCode>,
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server advertises the QUOTA extension (RFC 2087/9208).
    #[must_use]
    pub fn supports_quota(&self) -> bool {
        self.capabilities.iter().any(Capability::implies_quota)
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        self.execute(&Command::Capability).await?;
        Ok(self.capabilities.clone())
    }

    /// Sends LOGOUT and shuts the stream down.
    pub async fn logout(mut self) -> Result<()> {
        self.execute(&Command::Logout).await?;
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "shutdown after LOGOUT failed");
        }
        Ok(())
    }

    /// Runs one command to its tagged completion.
    ///
    /// `NO` and `BAD` completions become [`Error::No`] and [`Error::Bad`]; an
    /// untagged `BYE` outside LOGOUT aborts with [`Error::Bye`]. Capability
    /// data seen on the way refreshes the cached capability list.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tag_gen.next_tag();
        let wire = command.serialize(&tag)?;
        debug!(command = command.name(), tag = %tag, "sending IMAP command");
        self.stream.write_command(&wire).await?;

        let mut untagged = Vec::new();
        loop {
            let raw = self.stream.read_response().await?;
            trace!(len = raw.len(), "IMAP response received");

            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: done,
                    status,
                    code,
                    text,
                }) if done.as_str() == tag => {
                    if let Some(ResponseCode::Capability(caps)) = &code {
                        self.capabilities.clone_from(caps);
                    }
                    return match status {
                        Status::Ok => Ok(Completion { untagged, code }),
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::PreAuth | Status::Bye => Err(Error::Protocol(format!(
                            "unexpected tagged {status:?} completion"
                        ))),
                    };
                }
                Ok(Response::Tagged { tag: other, .. }) => {
                    warn!(tag = %other, "ignoring completion for unknown tag");
                }
                Ok(Response::Untagged(UntaggedResponse::Bye { text, .. }))
                    if !matches!(command, Command::Logout) =>
                {
                    return Err(Error::Bye(text));
                }
                Ok(Response::Untagged(UntaggedResponse::Capability(caps))) => {
                    self.capabilities.clone_from(&caps);
                    untagged.push(UntaggedResponse::Capability(caps));
                }
                Ok(Response::Untagged(response)) => untagged.push(response),
                Ok(Response::Continuation { .. }) => {
                    return Err(Error::Protocol(
                        "unexpected continuation request".to_string(),
                    ));
                }
                Err(e) if is_tagged_with(&raw, &tag) => return Err(e),
                Err(e) => warn!(error = %e, "skipping unparseable untagged response"),
            }
        }
    }

    fn into_state<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 QUOTA] ready\r\n";

    #[tokio::test]
    async fn capability_refreshes_cache() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 MOVE\r\n")
            .read(b"A0001 OK done\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();
        assert!(client.supports_quota());

        let caps = client.capability().await.unwrap();
        assert_eq!(caps, vec![Capability::Imap4Rev1, Capability::Move]);
        assert!(!client.supports_quota());
    }

    #[tokio::test]
    async fn untagged_bye_aborts_command() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* BYE idle timeout\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();

        let err = client.capability().await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "idle timeout"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn unparseable_untagged_lines_are_skipped() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* 0 EXPUNGE\r\n")
            .read(b"A0001 OK CAPABILITY completed\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();
        client.capability().await.unwrap();
    }

    #[tokio::test]
    async fn bad_completion_is_reported() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"A0001 BAD unknown command\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();
        assert!(matches!(client.capability().await, Err(Error::Bad(_))));
    }

    #[tokio::test]
    async fn logout_accepts_bye() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 LOGOUT\r\n")
            .read(b"* BYE logging out\r\n")
            .read(b"A0001 OK LOGOUT completed\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        client.logout().await.unwrap();
    }
}
