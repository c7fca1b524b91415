//! Offline `DKIM-Signature` verification.
//!
//! The public key is supplied by the caller; no DNS lookups are made.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier as _;
use sha2::{Digest, Sha256};

use crate::canonical::{relaxed_body, split_message};
use crate::error::{Error, Result};
use crate::signer::{SIGNATURE_HEADER, signing_input};

/// Parses a public key from PEM (SPKI or PKCS#1), a DKIM TXT record
/// (`v=DKIM1; k=rsa; p=...`), or the bare Base64 `p=` value.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] if no supported form parses.
pub fn parse_public_key(text: &str) -> Result<RsaPublicKey> {
    let text = text.trim();
    if text.starts_with("-----BEGIN") {
        return RsaPublicKey::from_public_key_pem(text)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
            .map_err(|e| Error::InvalidKey(e.to_string()));
    }

    let encoded = if text.contains(';') || text.starts_with("v=") || text.starts_with("p=") {
        tag_value(text, "p").ok_or_else(|| Error::InvalidKey("record has no p= tag".into()))?
    } else {
        text.to_string()
    };
    if encoded.is_empty() {
        return Err(Error::InvalidKey("key has been revoked (empty p=)".into()));
    }

    let der = STANDARD
        .decode(encoded)
        .map_err(|e| Error::InvalidKey(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Tag values of a `DKIM-Signature` header with whitespace removed.
fn parse_tags(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|tag| {
            let (name, value) = tag.split_once('=')?;
            let value: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            Some((name.trim().to_string(), value))
        })
        .collect()
}

fn tag_value(value: &str, name: &str) -> Option<String> {
    parse_tags(value)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

/// Removes the value of the `b=` tag, keeping everything else verbatim.
fn strip_signature(value: &str) -> String {
    value
        .split(';')
        .map(|tag| match tag.split_once('=') {
            Some((name, _)) if name.trim() == "b" => format!("{name}="),
            _ => tag.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Verifies the first `DKIM-Signature` header of `message` against `public_key`.
///
/// Only `rsa-sha256` with `relaxed/relaxed` canonicalization is supported.
///
/// # Errors
///
/// Returns [`Error::MissingHeader`] when the message is unsigned,
/// [`Error::MalformedSignature`] or [`Error::Unsupported`] for bad tags,
/// [`Error::BodyHashMismatch`] when the body changed, and
/// [`Error::BadSignature`] when the header signature does not verify.
pub fn verify(message: &[u8], public_key: &RsaPublicKey) -> Result<()> {
    let (headers, body) = split_message(message);
    let signature_header = headers
        .iter()
        .find(|h| h.name.trim().eq_ignore_ascii_case(SIGNATURE_HEADER))
        .ok_or_else(|| Error::MissingHeader(SIGNATURE_HEADER.into()))?;

    let tags = parse_tags(signature_header.value);
    let tag = |name: &str| {
        tags.iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| Error::MalformedSignature(format!("missing {name}= tag")))
    };

    if tag("v")? != "1" {
        return Err(Error::Unsupported(format!("v={}", tag("v")?)));
    }
    if tag("a")? != "rsa-sha256" {
        return Err(Error::Unsupported(format!("a={}", tag("a")?)));
    }
    let canonicalization = tag("c").unwrap_or("simple/simple");
    if canonicalization != "relaxed/relaxed" {
        return Err(Error::Unsupported(format!("c={canonicalization}")));
    }
    if tags.iter().any(|(n, _)| n == "l") {
        return Err(Error::Unsupported("l= body length limit".into()));
    }

    let body_hash = STANDARD.encode(Sha256::digest(relaxed_body(body)));
    if body_hash != tag("bh")? {
        return Err(Error::BodyHashMismatch);
    }

    let signed: Vec<&str> = tag("h")?.split(':').filter(|n| !n.is_empty()).collect();
    if !signed.iter().any(|n| n.eq_ignore_ascii_case("from")) {
        return Err(Error::MalformedSignature("h= does not include From".into()));
    }
    let data = signing_input(&headers, &signed, &strip_signature(signature_header.value));

    let signature_bytes = STANDARD
        .decode(tag("b")?)
        .map_err(|e| Error::MalformedSignature(e.to_string()))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| Error::MalformedSignature(e.to_string()))?;

    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(&data, &signature)
        .map_err(|_| Error::BadSignature)
}
