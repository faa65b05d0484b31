//! Request/response protocol between the page-side interceptor and the
//! privileged extension context.

pub mod convert;
pub mod manager;
pub mod pending;
pub mod types;

pub use manager::{run_response_listener, MessageTransport, WebAuthnMessageManager, WebAuthnOutcome};
pub use types::*;

use crate::webauthn::WebAuthnError;

pub const CODE_UNKNOWN: u16 = 4000;
pub const CODE_METHOD_CANCELED: u16 = 4001;
pub const CODE_METHOD_TIMED_OUT: u16 = 4002;
pub const CODE_METHOD_NOT_SUPPORTED: u16 = 4003;
pub const CODE_MALFORMED_REQUEST: u16 = 4200;
pub const CODE_NOT_ENABLED: u16 = 4300;
pub const CODE_INVALID_PASSKEY: u16 = 4400;
pub const CODE_INVALID_PUBLIC_KEY: u16 = 4401;
pub const CODE_CREDENTIAL_EXCLUDED: u16 = 4402;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("method canceled")]
    MethodCanceled,
    #[error("method timed out")]
    MethodTimedOut,
    #[error("method not supported: {0}")]
    MethodNotSupported(String),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("passkeys are not enabled")]
    NotEnabled,
    #[error("invalid passkey: {0}")]
    InvalidPasskey(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("credential excluded: {0}")]
    CredentialExcluded(String),
    #[error("WebAuthn: {0}")]
    WebAuthn(#[from] WebAuthnError),
    #[error("transport: {0}")]
    Transport(String),
    #[error("error {code}: {message}")]
    Unknown { code: u16, message: String },
}

impl ProtocolError {
    pub fn code(&self) -> u16 {
        match self {
            Self::MethodCanceled          => CODE_METHOD_CANCELED,
            Self::MethodTimedOut          => CODE_METHOD_TIMED_OUT,
            Self::MethodNotSupported(_)   => CODE_METHOD_NOT_SUPPORTED,
            Self::MalformedRequest(_)     => CODE_MALFORMED_REQUEST,
            Self::NotEnabled              => CODE_NOT_ENABLED,
            Self::InvalidPasskey(_)       => CODE_INVALID_PASSKEY,
            Self::InvalidPublicKey(_)     => CODE_INVALID_PUBLIC_KEY,
            Self::CredentialExcluded(_)   => CODE_CREDENTIAL_EXCLUDED,
            Self::WebAuthn(e)             => e.code(),
            Self::Transport(_)            => CODE_UNKNOWN,
            Self::Unknown { code, .. }    => *code,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload { code: self.code(), message: self.to_string() }
    }

    /// Rebuilds the error a response envelope carried.
    pub fn from_payload(payload: ErrorPayload) -> Self {
        let ErrorPayload { code, message } = payload;
        match code {
            CODE_METHOD_CANCELED      => Self::MethodCanceled,
            CODE_METHOD_TIMED_OUT     => Self::MethodTimedOut,
            CODE_METHOD_NOT_SUPPORTED => Self::MethodNotSupported(message),
            CODE_MALFORMED_REQUEST    => Self::MalformedRequest(message),
            CODE_NOT_ENABLED          => Self::NotEnabled,
            CODE_INVALID_PASSKEY      => Self::InvalidPasskey(message),
            CODE_INVALID_PUBLIC_KEY   => Self::InvalidPublicKey(message),
            CODE_CREDENTIAL_EXCLUDED  => Self::CredentialExcluded(message),
            4500 => Self::WebAuthn(WebAuthnError::MalformedData(message)),
            4501 => Self::WebAuthn(WebAuthnError::UnsupportedAlgorithm(offered_algorithms(&message))),
            4502 => Self::WebAuthn(WebAuthnError::InvalidPrivateKey(message)),
            code => Self::Unknown { code, message },
        }
    }
}

/// Recovers the algorithm list from an unsupported-algorithm message, which
/// ends in `[a, b, ..]`. Empty when the message carries none.
fn offered_algorithms(message: &str) -> Vec<i64> {
    let Some(list) = message.rsplit_once('[').and_then(|(_, rest)| rest.strip_suffix(']')) else {
        return Vec::new();
    };
    list.split(',').filter_map(|id| id.trim().parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(ProtocolError::MethodCanceled.code(), 4001);
        assert_eq!(ProtocolError::MethodTimedOut.code(), 4002);
        assert_eq!(ProtocolError::MalformedRequest("x".into()).code(), 4200);
        assert_eq!(ProtocolError::NotEnabled.code(), 4300);
        assert_eq!(ProtocolError::InvalidPasskey("x".into()).code(), 4400);
        assert_eq!(ProtocolError::InvalidPublicKey("x".into()).code(), 4401);
        assert_eq!(ProtocolError::WebAuthn(WebAuthnError::Cbor("x".into())).code(), 4500);
        assert_eq!(ProtocolError::WebAuthn(WebAuthnError::UnsupportedAlgorithm(vec![])).code(), 4501);
    }

    #[test]
    fn test_payload_roundtrip_keeps_variant() {
        let cases = [
            ProtocolError::MethodCanceled,
            ProtocolError::MethodTimedOut,
            ProtocolError::NotEnabled,
            ProtocolError::InvalidPasskey("none for rp".into()),
            ProtocolError::CredentialExcluded("already registered".into()),
        ];
        for err in cases {
            let code = err.code();
            let back = ProtocolError::from_payload(err.to_payload());
            assert_eq!(back.code(), code);
        }
    }

    #[test]
    fn test_unsupported_algorithm_survives_payload() {
        let err = ProtocolError::from(WebAuthnError::UnsupportedAlgorithm(vec![-257, -35]));
        let back = ProtocolError::from_payload(err.to_payload());
        assert!(matches!(
            back,
            ProtocolError::WebAuthn(WebAuthnError::UnsupportedAlgorithm(ref algs)) if algs == &[-257, -35]
        ));
        assert_eq!(back.code(), 4501);

        let bare = ProtocolError::from_payload(ErrorPayload { code: 4501, message: "no match".into() });
        assert!(matches!(bare, ProtocolError::WebAuthn(WebAuthnError::UnsupportedAlgorithm(ref algs)) if algs.is_empty()));
    }

    #[test]
    fn test_unknown_code_preserved() {
        let err = ProtocolError::from_payload(ErrorPayload { code: 9999, message: "boom".into() });
        assert!(matches!(err, ProtocolError::Unknown { code: 9999, .. }));
    }
}
