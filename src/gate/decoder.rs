//! Forwarded certificate decoding.
//!
//! Turns the opaque base64-of-DER blob forwarded by the TLS-terminating
//! proxy into a structured certificate record.  This is a purely structural
//! parse: no signature check, no chain building, no expiry enforcement and
//! no revocation check.  Cryptographic trust was already established by the
//! upstream terminator; the decoder only recovers identity attributes for
//! policy evaluation and audit display.
//!
//! # No unsafe
//!
//! `x509-parser` performs minimal `unsafe` internally for ASN.1 parsing;
//! this module itself contains no `unsafe` code and simply calls the safe
//! public API.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::objects::{oid2abbrev, oid_registry};
use x509_parser::prelude::{FromDer, X509Name};

// ─────────────────────────────────────────────────────────────────────────────
// Decode errors
// ─────────────────────────────────────────────────────────────────────────────

/// A forwarded certificate that could not be decoded.
///
/// Every decode outcome is a discriminated variant rather than a caught
/// panic, so unrelated failures can never masquerade as a bad certificate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The header was absent or empty.
    #[error("no client certificate was forwarded")]
    MissingCertificate,

    /// The header value is not valid base64.
    #[error("forwarded certificate is not valid base64")]
    MalformedEncoding,

    /// The decoded bytes are not a well-formed DER X.509 certificate.
    /// Carries the parser error text for operator diagnostics.
    #[error("forwarded bytes are not a DER-encoded X.509 certificate: {0}")]
    MalformedCertificate(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsed certificate
// ─────────────────────────────────────────────────────────────────────────────

/// One attribute/value pair of a distinguished name.
///
/// X.509 names may contain repeated attribute types, and order is
/// semantically meaningful for display, so DNs are kept as ordered pairs
/// rather than a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnAttribute {
    /// Short attribute name (`CN`, `O`, `OU`, …) or the dotted OID when the
    /// registry has no abbreviation for it.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

/// The decoded identity, derived from a successfully parsed certificate.
///
/// Immutable after construction; built once per request and discarded with
/// it.  Every field except `common_name` is present iff decoding succeeded:
/// a certificate without a CN attribute still decodes successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    /// Subject DN attributes, in encoding order.
    pub subject: Vec<DnAttribute>,

    /// Issuer DN attributes, in encoding order.
    pub issuer: Vec<DnAttribute>,

    /// Serial number, contiguous lowercase hex.
    pub serial_hex: String,

    /// Start of the validity period (UTC).
    pub not_before: OffsetDateTime,

    /// End of the validity period (UTC).
    pub not_after: OffsetDateTime,

    /// First CN in subject encoding order, if any.
    pub common_name: Option<String>,

    /// SHA-256 digest of the DER encoding, contiguous lowercase hex.
    pub thumbprint_sha256: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a forwarded header value into a [`ParsedCertificate`].
///
/// Pure function of its input: no logging, no I/O.  The raw certificate
/// bytes may be sensitive, so they never appear in the returned error;
/// only the parser's own error text does.
///
/// # Errors
///
/// Returns the matching [`DecodeError`] variant for an absent/empty value,
/// a non-base64 value, or base64 that does not decode to DER X.509.
pub fn decode(raw: Option<&str>) -> Result<ParsedCertificate, DecodeError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingCertificate)?;

    let der = BASE64
        .decode(raw)
        .map_err(|_| DecodeError::MalformedEncoding)?;

    parse_der(&der)
}

/// Parse DER bytes into a [`ParsedCertificate`].
pub fn parse_der(der: &[u8]) -> Result<ParsedCertificate, DecodeError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| DecodeError::MalformedCertificate(e.to_string()))?;

    let subject = extract_dn(cert.subject());
    let issuer = extract_dn(cert.issuer());
    let common_name = extract_cn(cert.subject());
    let serial_hex = hex::encode(cert.tbs_certificate.serial.to_bytes_be());
    let thumbprint_sha256 = hex::encode(Sha256::digest(der));

    Ok(ParsedCertificate {
        subject,
        issuer,
        serial_hex,
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
        common_name,
        thumbprint_sha256,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extract the first CN attribute from a DN, in encoding order.
fn extract_cn(name: &X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned)
}

/// Flatten a DN into ordered attribute/value pairs.
fn extract_dn(name: &X509Name<'_>) -> Vec<DnAttribute> {
    let mut attrs = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let attr_name = oid2abbrev(attr.attr_type(), oid_registry())
                .map(str::to_owned)
                .unwrap_or_else(|_| attr.attr_type().to_id_string());
            // Non-string attribute values are rare; keep the pair with a
            // placeholder rather than dropping it and breaking DN order.
            let value = attr
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|_| "<unprintable>".to_owned());
            attrs.push(DnAttribute {
                name: attr_name,
                value,
            });
        }
    }
    attrs
}

/// Render DN attributes as `CN=alice, O=example` for logs and CLI output.
pub fn format_dn(attrs: &[DnAttribute]) -> String {
    attrs
        .iter()
        .map(|a| format!("{}={}", a.name, a.value))
        .collect::<Vec<_>>()
        .join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
