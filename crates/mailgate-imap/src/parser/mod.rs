//! Sans-I/O parser for IMAP server responses.
//!
//! The [`Lexer`] turns raw bytes into tokens; [`ResponseParser`] builds
//! structured responses from them.
//!
//! ```
//! use mailgate_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(3)));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse};
