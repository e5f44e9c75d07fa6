//! Queue payload integrity
//!
//! Task payloads travel from the trigger path to the worker through the
//! message queue signed with HMAC-SHA256. Verification uses constant-time
//! comparison so signature checking leaks no timing information.

use hex::FromHex;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded payload signature
pub const SIGNATURE_HEADER: &str = "x-canary-signature";

/// Error types for payload integrity checks
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Invalid signature format: {0}")]
    InvalidFormat(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Missing signature header")]
    MissingSignature,
}

/// Sign a payload with HMAC-SHA256, returning the hex-encoded signature
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can accept keys of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the HMAC-SHA256 signature of a payload
pub fn verify_signature(
    payload: &[u8],
    signature_hex: &str,
    secret: &str,
) -> Result<(), SecurityError> {
    let signature_bytes = <Vec<u8>>::from_hex(signature_hex)
        .map_err(|e| SecurityError::InvalidFormat(format!("not valid hex: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can accept keys of any size");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if expected.ct_eq(&signature_bytes[..]).into() {
        Ok(())
    } else {
        Err(SecurityError::VerificationFailed)
    }
}

/// Pull the signature value out of the request headers
pub fn extract_signature(signature_header: Option<&str>) -> Result<&str, SecurityError> {
    signature_header.ok_or(SecurityError::MissingSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let secret = "queue-secret";
        let payload = br#"{"execution_id":"abc"}"#;

        let signature = sign_payload(payload, secret);
        assert_eq!(signature.len(), 64);
        assert!(verify_signature(payload, &signature, secret).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let secret = "queue-secret";
        let signature = sign_payload(b"original", secret);

        let result = verify_signature(b"tampered", &signature, secret);
        assert!(matches!(result, Err(SecurityError::VerificationFailed)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"payload";
        let signature = sign_payload(payload, "secret-a");

        let result = verify_signature(payload, &signature, "secret-b");
        assert!(matches!(result, Err(SecurityError::VerificationFailed)));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        let result = verify_signature(b"payload", "zz-not-hex", "secret");
        assert!(matches!(result, Err(SecurityError::InvalidFormat(_))));
    }

    #[test]
    fn test_extract_signature() {
        assert_eq!(extract_signature(Some("abc")).unwrap(), "abc");
        assert!(matches!(
            extract_signature(None),
            Err(SecurityError::MissingSignature)
        ));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let a = sign_payload(b"same", "secret");
        let b = sign_payload(b"same", "secret");
        assert_eq!(a, b);

        let c = sign_payload(b"different", "secret");
        assert_ne!(a, c);
    }
}
