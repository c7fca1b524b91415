//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailgate_imap::{
    Capability, Client, Error, FetchItem, FetchItems, Flag, Mailbox, MailboxAttribute,
    SearchCriteria, SeqNum, SequenceSet, StoreAction,
};

/// Mock stream that replays a canned server transcript.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.responses.position()).unwrap();
        let data = self.responses.get_ref();
        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let to_read = (data.len() - pos).min(buf.remaining());
        buf.put_slice(&data[pos..pos + to_read]);
        self.responses.set_position((pos + to_read) as u64);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .split_terminator("\r\n")
        .map(str::to_string)
        .collect()
}

const MESSAGE: &[u8] = b"From: Bob <bob@example.org>\r\n\
Subject: Hello\r\n\
\r\n\
Hi Alice\r\n";

#[tokio::test]
async fn read_unseen_then_mark_seen() {
    let mut script = Vec::new();
    script.extend_from_slice(b"* OK [CAPABILITY IMAP4rev1 QUOTA] Dovecot ready.\r\n");
    script.extend_from_slice(b"A0001 OK [CAPABILITY IMAP4rev1 QUOTA MOVE] Logged in\r\n");
    script.extend_from_slice(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n");
    script.extend_from_slice(b"* 4 EXISTS\r\n* 0 RECENT\r\n");
    script.extend_from_slice(b"A0002 OK [READ-WRITE] Select completed\r\n");
    script.extend_from_slice(b"* SEARCH 3 4\r\nA0003 OK Search completed\r\n");
    script.extend_from_slice(format!("* 3 FETCH (BODY[] {{{}}}\r\n", MESSAGE.len()).as_bytes());
    script.extend_from_slice(MESSAGE);
    script.extend_from_slice(b")\r\nA0004 OK Fetch completed\r\n");
    script.extend_from_slice(b"A0005 OK Store completed\r\n");
    script.extend_from_slice(b"* BYE Logging out\r\nA0006 OK Logout completed\r\n");
    let (stream, sent) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("alice@example.com", "secret").await.unwrap();
    assert!(client.has_capability(&Capability::Move));

    let mut inbox = client.select(&Mailbox::inbox()).await.unwrap();
    assert_eq!(inbox.status().exists, 4);

    let unseen = inbox.search(SearchCriteria::Unseen).await.unwrap();
    let newest = SequenceSet::from_numbers(&unseen[..1]).unwrap();
    let fetched = inbox.fetch(&newest, FetchItems::full_message()).await.unwrap();
    let (seq, items) = &fetched[0];
    assert_eq!(*seq, SeqNum::new(3).unwrap());
    assert!(matches!(
        &items[0],
        FetchItem::Body { section, data: Some(body), .. } if section.is_empty() && body == MESSAGE
    ));

    inbox
        .store(&newest, StoreAction::AddFlags(vec![Flag::Seen]))
        .await
        .unwrap();
    inbox.logout().await.unwrap();

    assert_eq!(
        sent_lines(&sent),
        vec![
            "A0001 LOGIN alice@example.com secret",
            "A0002 SELECT INBOX",
            "A0003 SEARCH UNSEEN",
            "A0004 FETCH 3 BODY.PEEK[]",
            "A0005 STORE 3 +FLAGS.SILENT (\\Seen)",
            "A0006 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn folder_management_with_unicode_names() {
    let script = b"* OK ready\r\n\
A0001 OK [CAPABILITY IMAP4rev1] ok\r\n\
* LIST (\\HasNoChildren) \".\" INBOX\r\n\
* LIST (\\HasNoChildren \\Drafts) \".\" Entw&APw-rfe\r\n\
* LIST (\\Noselect \\HasChildren) NIL Projects\r\n\
A0002 OK List completed\r\n\
A0003 OK Create completed\r\n\
A0004 NO [NONEXISTENT] Mailbox doesn't exist\r\n";
    let (stream, sent) = MockStream::new(script);

    let client = Client::from_stream(stream).await.unwrap();
    let mut client = client.login("alice", "pw").await.unwrap();

    let folders = client.list("", "*").await.unwrap();
    let names: Vec<&str> = folders.iter().map(|f| f.mailbox.as_str()).collect();
    assert_eq!(names, vec!["INBOX", "Entwürfe", "Projects"]);
    assert!(folders[1].attributes.contains(&MailboxAttribute::Drafts));
    assert_eq!(folders[2].delimiter, None);

    client.create(&Mailbox::new("Größe")).await.unwrap();
    let err = client.delete(&Mailbox::new("Gone")).await.unwrap_err();
    assert!(matches!(err, Error::No(_)));

    let lines = sent_lines(&sent);
    assert_eq!(lines[2], "A0003 CREATE Gr&APYA3w-e");
}

#[tokio::test]
async fn quota_lookup() {
    let script = b"* OK [CAPABILITY IMAP4rev1 QUOTA] ready\r\n\
A0001 OK [CAPABILITY IMAP4rev1 QUOTA] ok\r\n\
* QUOTAROOT INBOX \"User quota\"\r\n\
* QUOTA \"User quota\" (STORAGE 2048 1048576 MESSAGE 12 10000)\r\n\
A0002 OK Getquotaroot completed\r\n";
    let (stream, _sent) = MockStream::new(script);

    let client = Client::from_stream(stream).await.unwrap();
    let mut client = client.login("alice", "pw").await.unwrap();
    assert!(client.supports_quota());

    let root = client.get_quota_root(&Mailbox::inbox()).await.unwrap();
    assert_eq!(root.roots, vec!["User quota".to_string()]);
    let quota = root.primary().unwrap();
    assert_eq!(quota.storage().unwrap().usage, 2048);
    assert_eq!(quota.resource("MESSAGE").unwrap().limit, 10_000);
}

#[tokio::test]
async fn server_hangup_is_transient() {
    let script = b"* OK ready\r\nA0001 OK ok\r\n";
    let (stream, _sent) = MockStream::new(script);

    let client = Client::from_stream(stream).await.unwrap();
    // LOGIN succeeds without capabilities, so the client asks for them and
    // runs into end of stream.
    let err = client.login("alice", "pw").await.unwrap_err();
    assert!(err.is_transient());
}
