//! Parser helper functions.

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Capability, Flag, ListResponse, Mailbox, MailboxAttribute, Quota, QuotaResource, ResponseCode,
    SeqNum,
};

/// Parses a bracketed response code.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "OVERQUOTA" => ResponseCode::OverQuota,
        "UIDNEXT" => {
            lexer.expect_space()?;
            ResponseCode::UidNext(lexer.read_number()?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            ResponseCode::UidValidity(lexer.read_number()?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::Unseen(
                SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))?,
            )
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?)
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Unknown codes carry arbitrary arguments.
    lexer.take_until(b']');
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses space-separated capability atoms.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Vec<Flag>> {
    lexer.expect(Token::LParen)?;

    let mut flags = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.push(Flag::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("Unexpected token in flag list: {token:?}")));
            }
        }
    }

    Ok(flags)
}

/// Parses the body of a LIST response.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("Unexpected token in LIST attributes: {token:?}")));
            }
        }
    }

    lexer.expect_space()?;
    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("Expected delimiter, got {token:?}"))),
    };

    lexer.expect_space()?;
    let name = lexer.read_astring()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::from_wire(&name),
    })
}

/// Parses the numbers of a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<SeqNum>> {
    let mut nums = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) => {
                if let Some(seq) = u32::try_from(n).ok().and_then(SeqNum::new) {
                    nums.push(seq);
                }
            }
            // CONDSTORE appends "(MODSEQ n)".
            Token::LParen => break,
            _ => {}
        }
    }

    Ok(nums)
}

/// Parses `root SP "(" *(name SP usage SP limit) ")"`.
pub fn parse_quota_response(lexer: &mut Lexer<'_>) -> Result<Quota> {
    let root = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut resources = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let usage = lexer.read_number64()?;
                lexer.expect_space()?;
                let limit = lexer.read_number64()?;
                resources.push(QuotaResource {
                    name: name.to_ascii_uppercase(),
                    usage,
                    limit,
                });
            }
            token => {
                return Err(lexer.error(&format!("Unexpected token in QUOTA list: {token:?}")));
            }
        }
    }

    Ok(Quota { root, resources })
}

/// Parses `mailbox *(SP root)`.
pub fn parse_quotaroot_response(lexer: &mut Lexer<'_>) -> Result<(String, Vec<String>)> {
    let mailbox = lexer.read_astring()?;
    let mut roots = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if matches!(lexer.peek(), Some(b'\r' | b'\n') | None) {
            break;
        }
        roots.push(lexer.read_astring()?);
    }

    Ok((mailbox, roots))
}

/// Reads the rest of the line as text and consumes the line terminator.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let text = lexer.take_until(b'\n');
    lexer.advance();
    let text = text.strip_suffix(b"\r").unwrap_or(text);
    String::from_utf8_lossy(text).into_owned()
}
