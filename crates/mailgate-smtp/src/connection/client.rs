//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::marker::PhantomData;

/// Greeting read, EHLO possibly sent, not authenticated.
#[derive(Debug)]
pub struct Connected;

/// Credentials accepted.
#[derive(Debug)]
pub struct Authenticated;

/// `MAIL FROM` accepted, no recipient accepted yet.
#[derive(Debug)]
pub struct MailTransaction;

/// At least one `RCPT TO` accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// `DATA` accepted, server waits for the message.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Result of one `RCPT TO`.
///
/// A refused recipient does not end the session: the client comes back
/// in its previous state together with the server's reply.
#[derive(Debug)]
pub enum RcptOutcome<A, R> {
    /// Recipient accepted.
    Accepted(A),
    /// Recipient refused with a 4xx/5xx reply.
    Rejected {
        /// The session, unchanged.
        client: R,
        /// The refusal.
        reply: Reply,
    },
}

impl<T> RcptOutcome<T, T> {
    /// Returns the session regardless of the outcome.
    pub fn into_client(self) -> T {
        match self {
            Self::Accepted(client) | Self::Rejected { client, .. } => client,
        }
    }
}

/// Access shared by every state.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not 220.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %hostname, "smtp greeting");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: Vec::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        self.refresh_extensions(client_hostname).await?;
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and repeats EHLO over TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised, is refused, or the
    /// handshake fails.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(Command::StartTls).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }

        self.stream = self.stream.upgrade_to_tls(hostname).await?;
        // Extensions learned in plaintext must be discarded (RFC 3207 section 4.2).
        self.refresh_extensions(hostname).await?;
        Ok(self)
    }

    /// Authenticates with the best mechanism the server offers.
    ///
    /// PLAIN is preferred over LOGIN.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if no AUTH extension was advertised,
    /// `NoAuthMechanism` if neither PLAIN nor LOGIN is offered, or the
    /// server's refusal (see [`Error::is_auth_failure`]).
    pub async fn login(self, username: &str, password: &str) -> Result<Client<Authenticated>> {
        if !self
            .server_info
            .extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Auth(_)))
        {
            return Err(Error::NotSupported("AUTH".into()));
        }

        let offered = self.server_info.auth_mechanisms().to_vec();
        if offered.contains(&AuthMechanism::Plain) {
            self.auth_plain(username, password).await
        } else if offered.contains(&AuthMechanism::Login) {
            self.auth_login(username, password).await
        } else {
            let names: Vec<_> = offered.iter().map(|m| m.as_str()).collect();
            Err(Error::NoAuthMechanism(names.join(" ")))
        }
    }

    /// Authenticates using `AUTH PLAIN` with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(STANDARD.encode(credentials)),
            })
            .await?;

        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }

    /// Authenticates using the `AUTH LOGIN` challenge exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not issue the expected
    /// challenges or refuses the credentials.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let mut reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;

        for secret in [username, password] {
            if reply.code != ReplyCode::AUTH_CONTINUE {
                return Err(reply.into_error());
            }
            reply = self
                .send_command(Command::AuthResponse(STANDARD.encode(secret)))
                .await?;
        }

        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }

    /// Starts a mail transaction on a server that accepts unauthenticated submission.
    ///
    /// # Errors
    ///
    /// See [`Client::<Authenticated>::mail_from`].
    pub async fn mail_from(
        self,
        from: Address,
        message_size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        self.start_transaction(from, message_size).await
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// When the server advertised SIZE the declared size is sent along,
    /// and a message above the advertised limit is refused locally.
    ///
    /// # Errors
    ///
    /// Returns `MessageTooLarge` before any command is sent, or the server's
    /// refusal of `MAIL FROM`.
    pub async fn mail_from(
        self,
        from: Address,
        message_size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        self.start_transaction(from, message_size).await
    }
}

impl Client<MailTransaction> {
    /// Proposes a recipient.
    ///
    /// # Errors
    ///
    /// Only I/O failures and 421 (service closing) are errors; any other
    /// refusal is reported through [`RcptOutcome::Rejected`].
    pub async fn rcpt_to(
        mut self,
        to: Address,
    ) -> Result<RcptOutcome<Client<RecipientAdded>, Self>> {
        match self.propose_recipient(to).await? {
            None => Ok(RcptOutcome::Accepted(self.into_state())),
            Some(reply) => Ok(RcptOutcome::Rejected {
                client: self,
                reply,
            }),
        }
    }

    /// Aborts the transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        self.rset().await?;
        Ok(self.into_state())
    }
}

impl Client<RecipientAdded> {
    /// Proposes another recipient.
    ///
    /// # Errors
    ///
    /// Same as [`Client::<MailTransaction>::rcpt_to`].
    pub async fn rcpt_to(mut self, to: Address) -> Result<RcptOutcome<Self, Self>> {
        match self.propose_recipient(to).await? {
            None => Ok(RcptOutcome::Accepted(self)),
            Some(reply) => Ok(RcptOutcome::Rejected {
                client: self,
                reply,
            }),
        }
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }

    /// Aborts the transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        self.rset().await?;
        Ok(self.into_state())
    }
}

impl Client<Data> {
    /// Sends the message and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed, and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the server refuses the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        let payload = encode_data(message);
        tracing::debug!(bytes = payload.len(), "smtp message body");
        self.stream.write_all(&payload).await?;

        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }
}

impl<S> Client<S> {
    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::debug!(command = %cmd.redacted(), "smtp >");
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream).await
    }

    async fn refresh_extensions(&mut self, client_hostname: &str) -> Result<()> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        // First line is the server's greeting text, the rest are keywords.
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }

    async fn start_transaction(
        mut self,
        from: Address,
        message_size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        if let (Some(size), Some(limit)) = (message_size, self.server_info.max_message_size())
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let size = message_size.filter(|_| self.server_info.supports_size());
        let reply = self.send_command(Command::MailFrom { from, size }).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }

    /// Returns `None` when accepted, the refusal otherwise.
    async fn propose_recipient(&mut self, to: Address) -> Result<Option<Reply>> {
        let recipient = to.to_string();
        let reply = self.send_command(Command::RcptTo { to }).await?;
        if reply.is_success() {
            return Ok(None);
        }
        if reply.code == ReplyCode::SERVICE_UNAVAILABLE {
            return Err(reply.into_error());
        }
        tracing::warn!(
            recipient = %recipient,
            code = reply.code.as_u16(),
            "recipient refused"
        );
        Ok(Some(reply))
    }

    async fn rset(&mut self) -> Result<()> {
        let reply = self.send_command(Command::Rset).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(())
    }

    /// Sends QUIT and drops the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT exchange fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }
    let reply = parse_reply(&lines)?;
    tracing::trace!(code = reply.code.as_u16(), "smtp <");
    Ok(reply)
}

/// Normalizes line endings, dot-stuffs and terminates a message for DATA.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b".\r\n");
    out
}
