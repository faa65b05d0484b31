//! COSE_Key encoding of credential public keys (RFC 9052 §7).
//!
//! Map labels: `1` kty, `3` alg, `-1` crv, `-2` x (the whole key for OKP),
//! `-3` y.

use ciborium::value::Value;

use super::types::{
    cbor_bytes, cbor_get, cbor_integer, encode_cbor, parse_cbor_map, CoseAlgorithm, WebAuthnError,
};

const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;

const COORDINATE_LEN: usize = 32;
const SEC1_UNCOMPRESSED: u8 = 0x04;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosePublicKey {
    algorithm: CoseAlgorithm,
    public_key: Vec<u8>,
}

impl CosePublicKey {
    pub fn new(algorithm: CoseAlgorithm, public_key: Vec<u8>) -> Result<Self, WebAuthnError> {
        let expected = algorithm.public_key_len();
        if public_key.len() != expected {
            return Err(WebAuthnError::MalformedData(format!(
                "{algorithm} public key must be {expected} bytes, got {}",
                public_key.len()
            )));
        }
        if algorithm == CoseAlgorithm::Es256 && public_key[0] != SEC1_UNCOMPRESSED {
            return Err(WebAuthnError::MalformedData(
                "ES256 public key must be an uncompressed point".into(),
            ));
        }
        Ok(Self { algorithm, public_key })
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let map = parse_cbor_map(bytes)?;
        let alg = cbor_get(&map, LABEL_ALG)
            .and_then(cbor_integer)
            .ok_or_else(|| WebAuthnError::MalformedData("COSE key has no algorithm".into()))?;
        let algorithm = CoseAlgorithm::from_id(alg)?;

        let public_key = match algorithm {
            CoseAlgorithm::Ed25519 => coordinate(&map, LABEL_X, "x")?.to_vec(),
            CoseAlgorithm::Es256 => {
                let x = coordinate(&map, LABEL_X, "x")?;
                let y = coordinate(&map, LABEL_Y, "y")?;
                let mut point = Vec::with_capacity(1 + 2 * COORDINATE_LEN);
                point.push(SEC1_UNCOMPRESSED);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                point
            }
        };
        Ok(Self { algorithm, public_key })
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        let int = |i: i64| Value::Integer(i.into());
        let mut entries = vec![
            (int(LABEL_KTY), int(self.key_type())),
            (int(LABEL_ALG), int(self.algorithm.id())),
            (int(LABEL_CRV), int(self.curve())),
        ];
        match self.algorithm {
            CoseAlgorithm::Ed25519 => {
                entries.push((int(LABEL_X), Value::Bytes(self.public_key.clone())));
            }
            CoseAlgorithm::Es256 => {
                let (x, y) = self.public_key[1..].split_at(COORDINATE_LEN);
                entries.push((int(LABEL_X), Value::Bytes(x.to_vec())));
                entries.push((int(LABEL_Y), Value::Bytes(y.to_vec())));
            }
        }
        encode_cbor(&Value::Map(entries))
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn curve(&self) -> i64 {
        self.algorithm.curve()
    }

    pub fn key_type(&self) -> i64 {
        self.algorithm.key_type()
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

fn coordinate<'a>(
    map: &'a [(Value, Value)],
    label: i64,
    name: &str,
) -> Result<&'a [u8], WebAuthnError> {
    let value = cbor_get(map, label)
        .and_then(cbor_bytes)
        .ok_or_else(|| WebAuthnError::MalformedData(format!("COSE key has no {name}")))?;
    if value.len() != COORDINATE_LEN {
        return Err(WebAuthnError::MalformedData(format!(
            "COSE {name} must be {COORDINATE_LEN} bytes, got {}",
            value.len()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(i: i64) -> Value { Value::Integer(i.into()) }
    fn bv(b: &[u8]) -> Value { Value::Bytes(b.to_vec()) }

    fn es256_point() -> Vec<u8> {
        let mut point = vec![0x04u8];
        point.extend_from_slice(&[0xAAu8; 32]);
        point.extend_from_slice(&[0xBBu8; 32]);
        point
    }

    #[test]
    fn test_ed25519_roundtrip() {
        let key = CosePublicKey::new(CoseAlgorithm::Ed25519, vec![0x42u8; 32]).unwrap();
        let decoded = CosePublicKey::from_cbor(&key.to_cbor()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_es256_roundtrip() {
        let key = CosePublicKey::new(CoseAlgorithm::Es256, es256_point()).unwrap();
        let decoded = CosePublicKey::from_cbor(&key.to_cbor()).unwrap();
        assert_eq!(decoded.algorithm(), CoseAlgorithm::Es256);
        assert_eq!(decoded.public_key(), es256_point().as_slice());
    }

    #[test]
    fn test_es256_wire_fields() {
        let key = CosePublicKey::new(CoseAlgorithm::Es256, es256_point()).unwrap();
        let map = parse_cbor_map(&key.to_cbor()).unwrap();
        assert_eq!(cbor_get(&map, 1).and_then(cbor_integer), Some(2));
        assert_eq!(cbor_get(&map, 3).and_then(cbor_integer), Some(-7));
        assert_eq!(cbor_get(&map, -1).and_then(cbor_integer), Some(1));
        assert_eq!(cbor_get(&map, -2).and_then(cbor_bytes), Some(&[0xAAu8; 32][..]));
        assert_eq!(cbor_get(&map, -3).and_then(cbor_bytes), Some(&[0xBBu8; 32][..]));
    }

    #[test]
    fn test_ed25519_wire_fields() {
        let key = CosePublicKey::new(CoseAlgorithm::Ed25519, vec![7u8; 32]).unwrap();
        let map = parse_cbor_map(&key.to_cbor()).unwrap();
        assert_eq!(map.len(), 4, "OKP key carries no y coordinate");
        assert_eq!(cbor_get(&map, 1).and_then(cbor_integer), Some(1));
        assert_eq!(cbor_get(&map, 3).and_then(cbor_integer), Some(-8));
        assert_eq!(cbor_get(&map, -1).and_then(cbor_integer), Some(6));
    }

    #[test]
    fn test_ed25519_wrong_length_rejected() {
        for len in [31usize, 33] {
            let cbor = encode_cbor(&Value::Map(vec![
                (iv(1), iv(1)),
                (iv(3), iv(-8)),
                (iv(-1), iv(6)),
                (iv(-2), bv(&vec![0u8; len])),
            ]));
            let err = CosePublicKey::from_cbor(&cbor).unwrap_err();
            assert!(matches!(err, WebAuthnError::MalformedData(_)), "len {len}");
        }
    }

    #[test]
    fn test_es256_short_coordinate_rejected() {
        let short_x = encode_cbor(&Value::Map(vec![
            (iv(3), iv(-7)),
            (iv(-2), bv(&[0u8; 31])),
            (iv(-3), bv(&[0u8; 32])),
        ]));
        let short_y = encode_cbor(&Value::Map(vec![
            (iv(3), iv(-7)),
            (iv(-2), bv(&[0u8; 32])),
            (iv(-3), bv(&[0u8; 31])),
        ]));
        assert!(matches!(CosePublicKey::from_cbor(&short_x), Err(WebAuthnError::MalformedData(_))));
        assert!(matches!(CosePublicKey::from_cbor(&short_y), Err(WebAuthnError::MalformedData(_))));
    }

    #[test]
    fn test_es256_missing_y_rejected() {
        let cbor = encode_cbor(&Value::Map(vec![(iv(3), iv(-7)), (iv(-2), bv(&[0u8; 32]))]));
        assert!(matches!(CosePublicKey::from_cbor(&cbor), Err(WebAuthnError::MalformedData(_))));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let cbor = encode_cbor(&Value::Map(vec![(iv(3), iv(-257)), (iv(-2), bv(&[0u8; 32]))]));
        assert!(matches!(CosePublicKey::from_cbor(&cbor), Err(WebAuthnError::MalformedData(_))));
    }

    #[test]
    fn test_new_validates_length() {
        assert!(CosePublicKey::new(CoseAlgorithm::Ed25519, vec![0u8; 65]).is_err());
        assert!(CosePublicKey::new(CoseAlgorithm::Es256, vec![0x04u8; 32]).is_err());
    }
}
