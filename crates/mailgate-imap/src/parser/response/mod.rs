//! IMAP response parser.
//!
//! Parses one complete server response (including any literals) as framed by
//! [`crate::connection::FramedStream`].

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{FetchItem, UntaggedResponse};

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};

use helpers::{
    parse_capability_data, parse_flag_list, parse_list_response, parse_quota_response,
    parse_quotaroot_response, parse_response_code, parse_search_response, read_text_until_crlf,
};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer).map(Response::Untagged),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(lexer.error(&format!("Expected *, + or tag, got {token:?}"))),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
        lexer.expect_space()?;

        match lexer.next_token()? {
            Token::Atom(keyword) => Self::parse_keyword_data(lexer, keyword),
            Token::Number(n) => {
                let n = u32::try_from(n).map_err(|_| lexer.error("Message number out of range"))?;
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;

                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => Ok(UntaggedResponse::Exists(n)),
                    "RECENT" => Ok(UntaggedResponse::Recent(n)),
                    "EXPUNGE" => Ok(UntaggedResponse::Expunge(seq_num(lexer, n)?)),
                    "FETCH" => {
                        let seq = seq_num(lexer, n)?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        Ok(UntaggedResponse::Fetch { seq, items })
                    }
                    _ => Ok(UntaggedResponse::Other(keyword.to_string())),
                }
            }
            token => Err(lexer.error(&format!("Unexpected token in untagged response: {token:?}"))),
        }
    }

    fn parse_keyword_data(lexer: &mut Lexer<'_>, keyword: &str) -> Result<UntaggedResponse> {
        let upper = keyword.to_ascii_uppercase();
        let response = match upper.as_str() {
            "OK" | "NO" | "BAD" | "PREAUTH" | "BYE" => {
                let (code, text) = Self::parse_resp_text(lexer)?;
                match upper.as_str() {
                    "OK" => UntaggedResponse::Ok { code, text },
                    "NO" => UntaggedResponse::No { code, text },
                    "BAD" => UntaggedResponse::Bad { code, text },
                    "PREAUTH" => UntaggedResponse::PreAuth { code, text },
                    _ => UntaggedResponse::Bye { code, text },
                }
            }
            "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
            "FLAGS" => {
                lexer.expect_space()?;
                UntaggedResponse::Flags(parse_flag_list(lexer)?)
            }
            "LIST" => {
                lexer.expect_space()?;
                UntaggedResponse::List(parse_list_response(lexer)?)
            }
            "SEARCH" => UntaggedResponse::Search(parse_search_response(lexer)?),
            "QUOTA" => {
                lexer.expect_space()?;
                UntaggedResponse::Quota(parse_quota_response(lexer)?)
            }
            "QUOTAROOT" => {
                lexer.expect_space()?;
                let (mailbox, roots) = parse_quotaroot_response(lexer)?;
                UntaggedResponse::QuotaRoot { mailbox, roots }
            }
            _ => UntaggedResponse::Other(keyword.to_string()),
        };
        Ok(response)
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let text = read_text_until_crlf(lexer);
        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("Invalid status: {s}"))),
        }
    }

    /// Parses `[SP] ["[" code "]" SP] text`. Some servers omit the text.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Ok((code, read_text_until_crlf(lexer)))
    }
}

fn seq_num(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
    SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))
}
