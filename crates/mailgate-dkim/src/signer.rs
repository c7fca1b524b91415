//! `DKIM-Signature` generation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer as _};
use sha2::{Digest, Sha256};

use crate::canonical::{RawHeader, relaxed_body, relaxed_header, split_message};
use crate::error::{Error, Result};

/// Name of the header this crate produces.
pub const SIGNATURE_HEADER: &str = "DKIM-Signature";

/// Signs messages for one domain and selector with an RSA key.
///
/// Signatures are `rsa-sha256` with `relaxed/relaxed` canonicalization and
/// cover the whole body (no `l=` tag). PKCS#1 v1.5 signatures are
/// deterministic, so signing the same bytes twice yields the same header.
#[derive(Clone)]
pub struct DkimSigner {
    domain: String,
    selector: String,
    key: SigningKey<Sha256>,
    public_der: Vec<u8>,
    timestamp: Option<u64>,
}

impl std::fmt::Debug for DkimSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DkimSigner")
            .field("domain", &self.domain)
            .field("selector", &self.selector)
            .field("key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl DkimSigner {
    /// Loads a PEM private key (PKCS#1 `RSA PRIVATE KEY` or PKCS#8 `PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty domain or selector and
    /// [`Error::InvalidKey`] when the key cannot be parsed.
    pub fn from_pem(domain: &str, selector: &str, pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Self::new(domain, selector, key)
    }

    /// Creates a signer from an already loaded key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty domain or selector and
    /// [`Error::InvalidKey`] when the public half cannot be encoded.
    pub fn new(domain: &str, selector: &str, key: RsaPrivateKey) -> Result<Self> {
        let domain = domain.trim();
        let selector = selector.trim();
        if domain.is_empty() || selector.is_empty() {
            return Err(Error::InvalidConfig("domain and selector are required".into()));
        }
        if domain.contains([';', ' ']) || selector.contains([';', ' ']) {
            return Err(Error::InvalidConfig(format!(
                "domain {domain:?} or selector {selector:?} contains a tag separator"
            )));
        }

        let public_der = key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| Error::InvalidKey(e.to_string()))?
            .as_bytes()
            .to_vec();

        Ok(Self {
            domain: domain.to_string(),
            selector: selector.to_string(),
            key: SigningKey::<Sha256>::new(key),
            public_der,
            timestamp: None,
        })
    }

    /// Adds a `t=` signing timestamp (seconds since the Unix epoch) to
    /// every signature.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Signing domain (`d=`).
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Selector (`s=`).
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The TXT record to publish at `<selector>._domainkey.<domain>`.
    #[must_use]
    pub fn dns_record(&self) -> String {
        format!("v=DKIM1; k=rsa; p={}", STANDARD.encode(&self.public_der))
    }

    /// Computes the `DKIM-Signature` header value for `message`.
    ///
    /// Only the listed headers that are present in the message are signed;
    /// `From` must be present. The value is returned without the header
    /// name, ready to be prepended to the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if the message has no `From` header
    /// and [`Error::Signing`] if the RSA operation fails.
    pub fn sign(&self, message: &[u8], headers_to_sign: &[&str]) -> Result<String> {
        let (headers, body) = split_message(message);
        if !headers.iter().any(|h| h.name.trim().eq_ignore_ascii_case("from")) {
            return Err(Error::MissingHeader("From".into()));
        }

        let mut signed_names: Vec<String> = Vec::new();
        for name in headers_to_sign {
            let lower = name.trim().to_ascii_lowercase();
            if !signed_names.contains(&lower)
                && headers.iter().any(|h| h.name.trim().eq_ignore_ascii_case(&lower))
            {
                signed_names.push(lower);
            }
        }

        let body_hash = STANDARD.encode(Sha256::digest(relaxed_body(body)));
        let mut value = format!(
            "v=1; a=rsa-sha256; c=relaxed/relaxed; d={}; s={};",
            self.domain, self.selector
        );
        if let Some(t) = self.timestamp {
            value.push_str(&format!(" t={t};"));
        }
        value.push_str(&format!(" h={}; bh={body_hash}; b=", signed_names.join(":")));

        let names: Vec<&str> = signed_names.iter().map(String::as_str).collect();
        let data = signing_input(&headers, &names, &value);
        let signature = self
            .key
            .try_sign(&data)
            .map_err(|e| Error::Signing(e.to_string()))?;

        tracing::debug!(
            domain = %self.domain,
            selector = %self.selector,
            headers = %signed_names.join(":"),
            "DKIM signature computed"
        );

        value.push_str(&STANDARD.encode(signature.to_bytes()));
        Ok(value)
    }
}

/// Builds the data hashed by the signature: the selected headers in `h=`
/// order, each taken bottom-up when repeated, followed by the
/// `DKIM-Signature` header with an empty `b=` and no trailing CRLF.
pub(crate) fn signing_input(
    headers: &[RawHeader<'_>],
    signed: &[&str],
    signature_value: &str,
) -> Vec<u8> {
    let mut used: Vec<usize> = Vec::new();
    let mut data = String::new();

    for name in signed {
        let instance = headers
            .iter()
            .enumerate()
            .rev()
            .find(|(i, h)| !used.contains(i) && h.name.trim().eq_ignore_ascii_case(name));
        if let Some((i, header)) = instance {
            used.push(i);
            data.push_str(&relaxed_header(header.name, header.value));
        }
    }

    let own = relaxed_header(SIGNATURE_HEADER, signature_value);
    data.push_str(own.trim_end_matches("\r\n"));
    data.into_bytes()
}
