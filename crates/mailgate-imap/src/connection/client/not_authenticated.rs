//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it carries. A `BYE`
    /// greeting is refused with [`Error::Bye`].
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            _ => return Err(Error::Protocol("unexpected server greeting".to_string())),
        };
        debug!(capabilities = capabilities.len(), "IMAP greeting received");

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// A `NO` completion or an advertised `LOGINDISABLED` yields
    /// [`Error::Auth`]. Capabilities are refreshed afterwards, from the
    /// completion when the server includes them, otherwise with CAPABILITY.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::Auth(
                "server disallows LOGIN on this connection".to_string(),
            ));
        }

        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let completion = match self.execute(&command).await {
            Ok(completion) => completion,
            Err(Error::No(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        };

        let refreshed = matches!(completion.code, Some(ResponseCode::Capability(_)))
            || completion
                .untagged
                .iter()
                .any(|r| matches!(r, UntaggedResponse::Capability(_)));
        if !refreshed {
            self.capability().await?;
        }
        debug!("IMAP login succeeded");

        Ok(self.into_state(Authenticated))
    }
}
