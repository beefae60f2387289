//! End-to-end gate tests
//!
//! Tests the full authorization flow over the public API:
//! - forwarded-header decoding failures
//! - allow-list matching per identity attribute
//! - decision reason codes and audit-relevant fields
//! - configuration loading and resolution

use std::io::Write;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use certgate::config::{Config, GateConfig, IdentityAttribute};
use certgate::gate::{DecodeError, DenyReason, Gate, Outcome, decoder};
use pretty_assertions::assert_eq;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

// ── helpers ──────────────────────────────────────────────────────────────

/// Generate a self-signed DER cert with an optional CN.
fn make_cert_der(cn: Option<&str>) -> Vec<u8> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    if let Some(cn_str) = cn {
        dn.push(DnType::CommonName, cn_str);
    }
    params.distinguished_name = dn;

    let key_pair = KeyPair::generate().expect("key generation failed");
    let cert = params
        .self_signed(&key_pair)
        .expect("rcgen cert generation failed");
    cert.der().to_vec()
}

fn forwarded_header(cn: &str) -> String {
    BASE64.encode(make_cert_der(Some(cn)))
}

fn gate_allowing(entries: &[&str]) -> Gate {
    Gate::from_config(&GateConfig {
        allow: entries.iter().map(|s| (*s).to_owned()).collect(),
        ..GateConfig::default()
    })
}

// ── Scenario A: header absent ─────────────────────────────────────────────

#[test]
fn absent_header_is_denied_as_certificate_missing() {
    let decision = gate_allowing(&["alice"]).authorize(None);

    assert_eq!(decision.outcome, Outcome::Deny);
    assert_eq!(decision.reason, Some(DenyReason::CertificateMissing));
    assert!(decision.identity.is_none());
}

// ── Scenario B: base64 of garbage bytes ───────────────────────────────────

#[test]
fn garbage_payload_is_denied_as_certificate_invalid() {
    let blob = BASE64.encode(b"not a certificate at all");
    let decision = gate_allowing(&["alice"]).authorize(Some(&blob));

    assert_eq!(decision.outcome, Outcome::Deny);
    assert_eq!(decision.reason, Some(DenyReason::CertificateInvalid));
    // The decoder failure underneath is a structural DER failure
    assert!(matches!(
        decoder::decode(Some(&blob)),
        Err(DecodeError::MalformedCertificate(_))
    ));
}

#[test]
fn non_base64_payload_fails_decode_as_malformed_encoding() {
    assert_eq!(
        decoder::decode(Some("!!! definitely not base64 !!!")),
        Err(DecodeError::MalformedEncoding)
    );
}

// ── Scenario C: allow-listed certificate ──────────────────────────────────

#[test]
fn allow_listed_cn_is_authorized_and_identity_echoed() {
    let cn = "4f0000008fe385c0fb1076426400040000008f";
    let decision = gate_allowing(&[cn]).authorize(Some(&forwarded_header(cn)));

    assert_eq!(decision.outcome, Outcome::Allow);
    assert_eq!(decision.identity.as_deref(), Some(cn));
    assert_eq!(decision.reason, None);
    assert_eq!(decision.message, format!("authorized as {cn}"));
}

// ── Scenario D: valid certificate, empty allow-list ───────────────────────

#[test]
fn unlisted_cn_is_denied_but_identity_kept_for_audit() {
    let cn = "4f0000008fe385c0fb1076426400040000008f";
    let decision = gate_allowing(&[]).authorize(Some(&forwarded_header(cn)));

    assert_eq!(decision.outcome, Outcome::Deny);
    assert_eq!(decision.reason, Some(DenyReason::NotAuthorized));
    // The rejected identity is never silently dropped
    assert_eq!(decision.identity.as_deref(), Some(cn));
}

// ── Scenario E: certificate without a CN ──────────────────────────────────

#[test]
fn cert_without_cn_is_denied_as_identity_attribute_missing() {
    let blob = BASE64.encode(make_cert_der(None));
    let decision = gate_allowing(&["alice"]).authorize(Some(&blob));

    assert_eq!(decision.outcome, Outcome::Deny);
    assert_eq!(decision.reason, Some(DenyReason::IdentityAttributeMissing));
}

// ── Round-trip and matching semantics ─────────────────────────────────────

#[test]
fn cn_round_trips_byte_exact() {
    let cert = decoder::decode(Some(&forwarded_header("alice"))).unwrap();
    assert_eq!(cert.common_name.as_deref(), Some("alice"));
}

#[test]
fn matching_is_exact_and_case_sensitive() {
    let gate = gate_allowing(&["alice"]);

    let upper = gate.authorize(Some(&forwarded_header("Alice")));
    assert_eq!(upper.outcome, Outcome::Deny);
    assert_eq!(upper.reason, Some(DenyReason::NotAuthorized));

    let exact = gate.authorize(Some(&forwarded_header("alice")));
    assert_eq!(exact.outcome, Outcome::Allow);
}

#[test]
fn repeated_evaluation_is_idempotent() {
    let gate = gate_allowing(&["alice"]);
    let blob = forwarded_header("alice");

    let first = gate.authorize(Some(&blob));
    let second = gate.authorize(Some(&blob));
    assert_eq!(first, second);

    let missing_first = gate.authorize(None);
    let missing_second = gate.authorize(None);
    assert_eq!(missing_first, missing_second);
}

// ── Configurable identity attribute ───────────────────────────────────────

#[test]
fn thumbprint_attribute_authorizes_by_der_digest() {
    let der = make_cert_der(Some("ignored-cn"));
    let parsed = decoder::parse_der(&der).unwrap();
    let blob = BASE64.encode(&der);

    let gate = Gate::from_config(&GateConfig {
        identity_attribute: IdentityAttribute::Thumbprint,
        allow: vec![parsed.thumbprint_sha256.clone()],
        ..GateConfig::default()
    });

    let decision = gate.authorize(Some(&blob));
    assert_eq!(decision.outcome, Outcome::Allow);
    assert_eq!(decision.identity, Some(parsed.thumbprint_sha256));
}

#[test]
fn serial_attribute_authorizes_by_serial_hex() {
    let der = make_cert_der(Some("ignored-cn"));
    let parsed = decoder::parse_der(&der).unwrap();
    let blob = BASE64.encode(&der);

    let gate = Gate::from_config(&GateConfig {
        identity_attribute: IdentityAttribute::Serial,
        allow: vec![parsed.serial_hex.clone()],
        ..GateConfig::default()
    });

    assert_eq!(gate.authorize(Some(&blob)).outcome, Outcome::Allow);
}

// ── Configuration loading ─────────────────────────────────────────────────

#[test]
fn config_loads_and_gate_resolves_from_yaml() {
    let yaml = r#"
server:
  host: "0.0.0.0"
  port: 9090
gate:
  header: "X-Forwarded-Client-Cert"
  identity_attribute: thumbprint
  allow:
    - "aabbcc"
  public_paths: ["/health"]
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{yaml}").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.gate.header, "X-Forwarded-Client-Cert");
    assert_eq!(config.gate.identity_attribute, IdentityAttribute::Thumbprint);

    let gate = Gate::from_config(&config.gate);
    assert_eq!(gate.header_name(), "X-Forwarded-Client-Cert");
    assert!(!gate.is_empty());
    assert!(gate.is_public_path("/health"));
    assert!(!gate.is_public_path("/"));
}

#[test]
fn decode_failures_never_contain_certificate_bytes() {
    // The decode error text may describe the parse failure but must not
    // echo the forwarded payload back
    let payload = BASE64.encode(b"sensitive-looking-bytes");
    let decision = gate_allowing(&[]).authorize(Some(&payload));

    assert!(!decision.message.contains(&payload));
    if let Some(detail) = &decision.detail {
        assert!(!detail.contains(&payload));
        assert!(!detail.contains("sensitive-looking-bytes"));
    }
}
