//! FETCH response parsing.

use crate::Result;
use crate::parser::lexer::{Lexer, Token};

use super::helpers::parse_flag_list;
use super::types::FetchItem;

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(&format!("Expected FETCH item, got {token:?}"))),
        };

        match name.to_ascii_uppercase().as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                items.push(FetchItem::Uid(lexer.read_number()?));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                if let Some(date) = lexer.read_nstring()? {
                    items.push(FetchItem::InternalDate(date));
                }
            }
            "BODY" if lexer.peek() == Some(b'[') => {
                let (section, origin) = parse_section_and_origin(lexer)?;
                lexer.expect_space()?;
                let data = read_nstring_bytes(lexer)?;
                items.push(FetchItem::Body {
                    section,
                    origin,
                    data,
                });
            }
            "RFC822" => {
                lexer.expect_space()?;
                let data = read_nstring_bytes(lexer)?;
                items.push(FetchItem::Body {
                    section: String::new(),
                    origin: None,
                    data,
                });
            }
            _ => {
                // ENVELOPE, BODYSTRUCTURE, MODSEQ and friends are not requested
                // by this client; skip whatever value follows.
                lexer.expect_space()?;
                skip_value(lexer)?;
            }
        }
    }

    Ok(items)
}

/// Parses `[section]` and an optional `<origin>` following `BODY`.
fn parse_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(String, Option<u32>)> {
    lexer.expect(Token::LBracket)?;
    let section = String::from_utf8_lossy(lexer.take_until(b']')).into_owned();
    lexer.expect(Token::RBracket)?;

    let origin = if lexer.peek() == Some(b'<') {
        lexer.advance();
        let digits = lexer.take_until(b'>');
        let origin = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| lexer.error("Invalid partial origin"))?;
        if lexer.advance() != Some(b'>') {
            return Err(lexer.error("Expected > after partial origin"));
        }
        Some(origin)
    } else {
        None
    };

    Ok((section, origin))
}

fn read_nstring_bytes(lexer: &mut Lexer<'_>) -> Result<Option<Vec<u8>>> {
    match lexer.next_token()? {
        Token::Literal(data) => Ok(Some(data)),
        Token::QuotedString(s) => Ok(Some(s.into_bytes())),
        Token::Nil => Ok(None),
        token => Err(lexer.error(&format!("Expected section data, got {token:?}"))),
    }
}

/// Skips one value: an atom, number, string, literal, NIL, or balanced list.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => depth -= 1,
            Token::RParen | Token::Crlf | Token::Eof => {
                return Err(lexer.error("Unexpected end of FETCH value"));
            }
            _ => {}
        }
        if depth == 0 {
            return Ok(());
        }
    }
}
