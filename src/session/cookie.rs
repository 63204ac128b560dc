//! Signed cookie values: `base64url(payload).base64url(hmac_sha256(payload))`.
//!
//! The MAC covers the raw payload bytes, so editing either half of the value
//! invalidates it.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

fn keyed_mac(secret: &[u8], payload: &[u8]) -> Hmac<Sha256> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(secret).expect("HMAC key length is always valid");
    mac.update(payload);
    mac
}

pub fn sign_payload(secret: &[u8], payload: &[u8]) -> String {
    let tag = keyed_mac(secret, payload).finalize().into_bytes();
    let mut value = URL_SAFE_NO_PAD.encode(payload);
    value.push('.');
    URL_SAFE_NO_PAD.encode_string(tag, &mut value);
    value
}

/// The payload of a value produced by [`sign_payload`] with the same secret.
///
/// Comparison of the tag is constant time.
pub fn verify_payload(secret: &[u8], value: &str) -> Option<Vec<u8>> {
    let (encoded_payload, encoded_tag) = value.split_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(encoded_payload).ok()?;
    let tag = URL_SAFE_NO_PAD.decode(encoded_tag).ok()?;
    keyed_mac(secret, &payload).verify_slice(&tag).ok()?;
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"cookie-test-secret";

    fn swap_payload(value: &str, payload: &[u8]) -> String {
        let (_, tag) = value.split_once('.').unwrap();
        format!("{}.{tag}", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn signed_value_verifies() {
        let payload = br#"{"iat":1,"session":{}}"#;
        let value = sign_payload(SECRET, payload);
        assert_eq!(value.matches('.').count(), 1);
        assert_eq!(verify_payload(SECRET, &value).unwrap(), payload);
    }

    #[test]
    fn other_secret_rejected() {
        let value = sign_payload(SECRET, b"x");
        assert!(verify_payload(b"another-secret", &value).is_none());
    }

    #[test]
    fn upgraded_tier_payload_rejected() {
        let value = sign_payload(SECRET, br#"{"tier":"basic"}"#);
        let forged = swap_payload(&value, br#"{"tier":"enterprise"}"#);
        assert!(verify_payload(SECRET, &forged).is_none());
    }

    #[test]
    fn truncated_tag_rejected() {
        let mut value = sign_payload(SECRET, b"x");
        value.truncate(value.len() - 4);
        assert!(verify_payload(SECRET, &value).is_none());
    }

    #[test]
    fn malformed_values_rejected() {
        for value in ["", "no-separator", "!!!.!!!", ".", "abc."] {
            assert!(verify_payload(SECRET, value).is_none(), "{value:?}");
        }
    }
}
