//! # mailgate-dkim
//!
//! DKIM (RFC 6376) signatures for outgoing mail.
//!
//! Signing is a pure function of the message bytes and the key: no I/O, no
//! clock reads unless a timestamp is supplied. Verification takes the public
//! key from the caller instead of DNS, which makes both sides testable.
//!
//! ## Example
//!
//! ```no_run
//! use mailgate_dkim::{DkimSigner, SIGNATURE_HEADER};
//!
//! # fn run(pem: &str, message: &[u8]) -> mailgate_dkim::Result<()> {
//! let signer = DkimSigner::from_pem("example.com", "mail", pem)?;
//! let value = signer.sign(message, &["From", "To", "Subject"])?;
//!
//! let mut signed = format!("{SIGNATURE_HEADER}: {value}\r\n").into_bytes();
//! signed.extend_from_slice(message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod canonical;
mod error;
mod signer;
mod verify;

pub use canonical::{relaxed_body, relaxed_header};
pub use error::{Error, Result};
pub use signer::{DkimSigner, SIGNATURE_HEADER};
pub use verify::{parse_public_key, verify};
