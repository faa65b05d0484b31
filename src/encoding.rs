//! Binary <-> text helpers shared by the codec, factory and message layers.
//!
//! The extension message channel carries JSON only, so every buffer crosses
//! it as standard base64. Credential ids handed back to the page use the
//! WebAuthn base64url convention without padding.

use base64::alphabet;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::webauthn::WebAuthnError;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Standard alphabet, padded. Used for everything on the wire.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64, with or without padding.
pub fn from_base64(text: &str) -> Result<Vec<u8>, WebAuthnError> {
    STANDARD_LENIENT
        .decode(text)
        .map_err(|e| WebAuthnError::Encoding(format!("invalid base64: {e}")))
}

/// URL-safe alphabet, padding stripped.
pub fn to_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// URL-safe alphabet, padding kept.
pub fn to_base64url_padded(bytes: &[u8]) -> String {
    URL_SAFE.encode(bytes)
}

/// Decodes URL-safe base64, with or without padding.
pub fn from_base64url(text: &str) -> Result<Vec<u8>, WebAuthnError> {
    URL_SAFE_LENIENT
        .decode(text)
        .map_err(|e| WebAuthnError::Encoding(format!("invalid base64url: {e}")))
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// The 16 raw bytes behind a textual UUID.
pub fn uuid_to_bytes(id: &str) -> Result<[u8; 16], WebAuthnError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| WebAuthnError::MalformedData(format!("invalid credential id {id:?}: {e}")))?;
    Ok(*uuid.as_bytes())
}

/// Inverse of [`uuid_to_bytes`]; `None` when `bytes` is not 16 bytes long.
pub fn uuid_from_bytes(bytes: &[u8]) -> Option<Uuid> {
    Uuid::from_slice(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_decode_tolerates_missing_padding() {
        assert_eq!(from_base64("AQI=").unwrap(), vec![1, 2]);
        assert_eq!(from_base64("AQI").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_url_safe_variants() {
        let bytes = [0xfbu8, 0xff, 0xfe, 0x01];
        assert_eq!(to_base64(&bytes), "+//+AQ==");
        assert_eq!(to_base64url(&bytes), "-__-AQ");
        assert_eq!(to_base64url_padded(&bytes), "-__-AQ==");
        assert_eq!(from_base64url("-__-AQ").unwrap(), bytes);
        assert_eq!(from_base64url("-__-AQ==").unwrap(), bytes);
    }

    #[test]
    fn test_invalid_base64_is_encoding_error() {
        assert!(matches!(from_base64("***"), Err(WebAuthnError::Encoding(_))));
    }

    #[test]
    fn test_uuid_bytes_roundtrip() {
        let id = "6f1c2a56-0d3b-4f7e-9a41-2f5d8c3b7e10";
        let bytes = uuid_to_bytes(id).unwrap();
        assert_eq!(bytes[0], 0x6f);
        assert_eq!(bytes[15], 0x10);
        assert_eq!(uuid_from_bytes(&bytes).unwrap().to_string(), id);
        assert!(uuid_from_bytes(&bytes[..15]).is_none());
    }

    #[test]
    fn test_uuid_rejects_garbage() {
        assert!(matches!(uuid_to_bytes("not-a-uuid"), Err(WebAuthnError::MalformedData(_))));
    }
}
