use std::fmt;

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

pub const COSE_ALG_ED25519: i64 = -8;
pub const COSE_ALG_ES256: i64 = -7;

pub const COSE_KTY_OKP: i64 = 1;
pub const COSE_KTY_EC2: i64 = 2;

pub const COSE_CRV_P256: i64 = 1;
pub const COSE_CRV_ED25519: i64 = 6;

#[derive(Debug, thiserror::Error)]
pub enum WebAuthnError {
    #[error("malformed data: {0}")]                 MalformedData(String),
    #[error("no supported algorithm in {0:?}")]     UnsupportedAlgorithm(Vec<i64>),
    #[error("invalid private key: {0}")]            InvalidPrivateKey(String),
    #[error("cbor: {0}")]                           Cbor(String),
    #[error("encoding: {0}")]                       Encoding(String),
}

impl WebAuthnError {
    pub fn code(&self) -> u16 {
        match self {
            Self::MalformedData(_) | Self::Cbor(_) | Self::Encoding(_) => 4500,
            Self::UnsupportedAlgorithm(_) => 4501,
            Self::InvalidPrivateKey(_)    => 4502,
        }
    }
}

/// The COSE signature algorithms this bridge can hold keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum CoseAlgorithm {
    Ed25519,
    Es256,
}

impl CoseAlgorithm {
    pub const fn id(self) -> i64 {
        match self {
            Self::Ed25519 => COSE_ALG_ED25519,
            Self::Es256   => COSE_ALG_ES256,
        }
    }

    pub fn from_id(id: i64) -> Result<Self, WebAuthnError> {
        match id {
            COSE_ALG_ED25519 => Ok(Self::Ed25519),
            COSE_ALG_ES256   => Ok(Self::Es256),
            other => Err(WebAuthnError::MalformedData(format!(
                "unsupported COSE algorithm {other}"
            ))),
        }
    }

    pub const fn curve(self) -> i64 {
        match self {
            Self::Ed25519 => COSE_CRV_ED25519,
            Self::Es256   => COSE_CRV_P256,
        }
    }

    pub const fn key_type(self) -> i64 {
        match self {
            Self::Ed25519 => COSE_KTY_OKP,
            Self::Es256   => COSE_KTY_EC2,
        }
    }

    /// Raw public key length: 32 bytes for Ed25519, `0x04 || X || Y` for ES256.
    pub const fn public_key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::Es256   => 65,
        }
    }

    /// Picks an algorithm from the relying party's `pubKeyCredParams`.
    ///
    /// Ed25519 wins whenever it is offered. An empty list places no
    /// constraint and also yields Ed25519; a non-empty list without any
    /// supported entry is an error.
    pub fn negotiate(offered: &[i64]) -> Result<Self, WebAuthnError> {
        if offered.is_empty() || offered.contains(&COSE_ALG_ED25519) {
            return Ok(Self::Ed25519);
        }
        if offered.contains(&COSE_ALG_ES256) {
            return Ok(Self::Es256);
        }
        Err(WebAuthnError::UnsupportedAlgorithm(offered.to_vec()))
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = WebAuthnError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::from_id(id)
    }
}

impl From<CoseAlgorithm> for i64 {
    fn from(alg: CoseAlgorithm) -> Self {
        alg.id()
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => f.write_str("Ed25519"),
            Self::Es256   => f.write_str("ES256"),
        }
    }
}

// CBOR helpers

pub(crate) fn parse_cbor_map(data: &[u8]) -> Result<Vec<(Value, Value)>, WebAuthnError> {
    let value: Value = ciborium::from_reader(data)
        .map_err(|e| WebAuthnError::Cbor(e.to_string()))?;
    match value {
        Value::Map(map) => Ok(map),
        _ => Err(WebAuthnError::Cbor("expected map".into())),
    }
}

pub(crate) fn encode_cbor(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).expect("CBOR encoding into a Vec is infallible");
    buf
}

pub(crate) fn cbor_get(map: &[(Value, Value)], key: i64) -> Option<&Value> {
    let target = Value::Integer(key.into());
    map.iter().find(|(k, _)| k == &target).map(|(_, v)| v)
}

pub(crate) fn cbor_get_str<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

pub(crate) fn cbor_bytes(v: &Value) -> Option<&[u8]> {
    match v { Value::Bytes(b) => Some(b), _ => None }
}

pub(crate) fn cbor_text(v: &Value) -> Option<&str> {
    match v { Value::Text(s) => Some(s), _ => None }
}

pub(crate) fn cbor_map(v: &Value) -> Option<&[(Value, Value)]> {
    match v { Value::Map(m) => Some(m), _ => None }
}

pub(crate) fn cbor_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => i64::try_from(i128::from(*i)).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(i: i64) -> Value { Value::Integer(i.into()) }
    fn tv(s: &str) -> Value { Value::Text(s.to_string()) }

    #[test]
    fn test_algorithm_lookups() {
        assert_eq!(CoseAlgorithm::Ed25519.id(), -8);
        assert_eq!(CoseAlgorithm::Es256.id(), -7);
        assert_eq!(CoseAlgorithm::Ed25519.curve(), 6);
        assert_eq!(CoseAlgorithm::Es256.curve(), 1);
        assert_eq!(CoseAlgorithm::Ed25519.key_type(), 1);
        assert_eq!(CoseAlgorithm::Es256.key_type(), 2);
    }

    #[test]
    fn test_from_id_rejects_unknown() {
        let err = CoseAlgorithm::from_id(-257).unwrap_err();
        assert!(matches!(err, WebAuthnError::MalformedData(_)));
    }

    #[test]
    fn test_negotiate_prefers_ed25519() {
        assert_eq!(CoseAlgorithm::negotiate(&[-7, -8]).unwrap(), CoseAlgorithm::Ed25519);
        assert_eq!(CoseAlgorithm::negotiate(&[-257, -7]).unwrap(), CoseAlgorithm::Es256);
        assert_eq!(CoseAlgorithm::negotiate(&[]).unwrap(), CoseAlgorithm::Ed25519);
    }

    #[test]
    fn test_negotiate_no_match_is_error() {
        let err = CoseAlgorithm::negotiate(&[-257, -35]).unwrap_err();
        assert!(matches!(err, WebAuthnError::UnsupportedAlgorithm(ref algs) if algs == &[-257, -35]));
        assert_eq!(err.code(), 4501);
    }

    #[test]
    fn test_algorithm_serde_as_integer() {
        let json = serde_json::to_string(&CoseAlgorithm::Es256).unwrap();
        assert_eq!(json, "-7");
        let alg: CoseAlgorithm = serde_json::from_str("-8").unwrap();
        assert_eq!(alg, CoseAlgorithm::Ed25519);
        assert!(serde_json::from_str::<CoseAlgorithm>("-257").is_err());
    }

    #[test]
    fn test_parse_cbor_map_not_a_map() {
        let bytes = encode_cbor(&Value::Array(vec![iv(1)]));
        assert!(matches!(parse_cbor_map(&bytes), Err(WebAuthnError::Cbor(_))));
    }

    #[test]
    fn test_cbor_lookup_helpers() {
        let map = vec![(iv(-2), Value::Bytes(vec![1, 2])), (tv("fmt"), tv("packed")), (iv(3), iv(-7))];
        assert_eq!(cbor_get(&map, -2).and_then(cbor_bytes), Some(&[1u8, 2][..]));
        assert_eq!(cbor_get_str(&map, "fmt").and_then(cbor_text), Some("packed"));
        assert_eq!(cbor_get(&map, 3).and_then(cbor_integer), Some(-7));
        assert!(cbor_get(&map, 1).is_none());
    }
}
