//! LINE webhook signature verification.
//!
//! LINE signs every webhook body with the channel secret:
//! `X-Line-Signature = base64(HMAC-SHA256(channel_secret, body))`.
//! Verification must run on the raw body bytes, before any parsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use courier_types::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verify a base64 HMAC-SHA256 signature against `body`.
///
/// Comparison is constant-time (via the hmac crate's `verify_slice`).
pub fn verify_line_signature(
    secret: &[u8],
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::Missing)?;

    let expected = BASE64
        .decode(signature)
        .map_err(|_| SignatureError::Malformed)?;

    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Compute the signature LINE would send for `body`.
pub fn compute_line_signature(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Holds the channel secret and checks inbound requests against it.
pub struct SignatureVerifier {
    channel_secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(channel_secret: SecretString) -> Self {
        Self { channel_secret }
    }

    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        verify_line_signature(
            self.channel_secret.expose_secret().as_bytes(),
            body,
            signature,
        )
    }

    pub fn sign(&self, body: &[u8]) -> Result<String, SignatureError> {
        compute_line_signature(self.channel_secret.expose_secret().as_bytes(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"channel-secret";
    const BODY: &[u8] = br#"{"destination":"Uxxx","events":[]}"#;

    #[test]
    fn test_verify_valid_signature() {
        let sig = compute_line_signature(SECRET, BODY).unwrap();
        assert!(verify_line_signature(SECRET, BODY, Some(&sig)).is_ok());
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?"
        let sig = compute_line_signature(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_wrong_body_rejected() {
        let sig = compute_line_signature(SECRET, BODY).unwrap();
        assert_eq!(
            verify_line_signature(SECRET, b"{\"events\":[]}", Some(&sig)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = compute_line_signature(b"other-secret", BODY).unwrap();
        assert_eq!(
            verify_line_signature(SECRET, BODY, Some(&sig)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_and_malformed_signature() {
        assert_eq!(
            verify_line_signature(SECRET, BODY, None),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_line_signature(SECRET, BODY, Some("  ")),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_line_signature(SECRET, BODY, Some("not base64!!")),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_verifier_round_trip() {
        let verifier = SignatureVerifier::new(SecretString::from("channel-secret"));
        let sig = verifier.sign(BODY).unwrap();
        assert!(verifier.verify(BODY, Some(&sig)).is_ok());
        assert!(verifier.verify(b"tampered", Some(&sig)).is_err());
    }
}
