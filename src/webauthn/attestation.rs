use ciborium::value::Value;

use super::types::{
    cbor_bytes, cbor_get_str, cbor_integer, cbor_map, cbor_text, encode_cbor, parse_cbor_map,
    CoseAlgorithm, WebAuthnError,
};

pub const FMT_PACKED: &str = "packed";

/// Build a "packed" self-attestation object: `{fmt, attStmt: {alg, sig}, authData}`.
pub fn build_attestation_object(
    auth_data: &[u8],
    alg: CoseAlgorithm,
    sig: &[u8],
) -> Vec<u8> {
    let map = Value::Map(vec![
        (
            Value::Text("fmt".to_string()),
            Value::Text(FMT_PACKED.to_string()),
        ),
        (
            Value::Text("attStmt".to_string()),
            Value::Map(vec![
                (
                    Value::Text("alg".to_string()),
                    Value::Integer(alg.id().into()),
                ),
                (
                    Value::Text("sig".to_string()),
                    Value::Bytes(sig.to_vec()),
                ),
            ]),
        ),
        (
            Value::Text("authData".to_string()),
            Value::Bytes(auth_data.to_vec()),
        ),
    ]);
    encode_cbor(&map)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    pub fmt: String,
    pub alg: Option<i64>,
    pub sig: Option<Vec<u8>>,
    pub auth_data: Vec<u8>,
}

impl AttestationObject {
    pub fn parse(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let map = parse_cbor_map(bytes)?;
        let auth_data = cbor_get_str(&map, "authData")
            .and_then(cbor_bytes)
            .ok_or_else(|| WebAuthnError::MalformedData("attestation object has no authData".into()))?
            .to_vec();
        let fmt = cbor_get_str(&map, "fmt")
            .and_then(cbor_text)
            .unwrap_or_default()
            .to_string();
        let statement = cbor_get_str(&map, "attStmt").and_then(cbor_map).unwrap_or_default();
        let alg = cbor_get_str(statement, "alg").and_then(cbor_integer);
        let sig = cbor_get_str(statement, "sig").and_then(cbor_bytes).map(<[u8]>::to_vec);

        Ok(Self { fmt, alg, sig, auth_data })
    }
}
