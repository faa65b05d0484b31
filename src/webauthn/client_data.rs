use serde::{Deserialize, Serialize};

use super::types::WebAuthnError;
use crate::encoding::{from_base64, to_base64url, to_base64url_padded};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientDataType {
    #[serde(rename = "webauthn.create")]
    Create,
    #[serde(rename = "webauthn.get")]
    Get,
}

/// `clientDataJSON`, serialized in the field order browsers emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedClientData {
    #[serde(rename = "type")]
    pub ty: ClientDataType,
    pub challenge: String,
    pub origin: String,
}

impl CollectedClientData {
    /// Registration client data. The challenge is re-encoded as base64url with
    /// padding stripped.
    pub fn for_create(challenge_b64: &str, origin: &str) -> Result<Self, WebAuthnError> {
        Ok(Self {
            ty: ClientDataType::Create,
            challenge: to_base64url(&decode_challenge(challenge_b64)?),
            origin: origin.to_string(),
        })
    }

    /// Authentication client data. Unlike [`Self::for_create`] the base64url
    /// challenge keeps its padding.
    pub fn for_get(challenge_b64: &str, origin: &str) -> Result<Self, WebAuthnError> {
        Ok(Self {
            ty: ClientDataType::Get,
            challenge: to_base64url_padded(&decode_challenge(challenge_b64)?),
            origin: origin.to_string(),
        })
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, WebAuthnError> {
        serde_json::to_vec(self).map_err(|e| WebAuthnError::Encoding(e.to_string()))
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        serde_json::from_slice(bytes)
            .map_err(|e| WebAuthnError::MalformedData(format!("invalid clientDataJSON: {e}")))
    }
}

pub(crate) fn decode_challenge(challenge_b64: &str) -> Result<Vec<u8>, WebAuthnError> {
    let challenge = from_base64(challenge_b64)?;
    if challenge.is_empty() {
        return Err(WebAuthnError::MalformedData("challenge is empty".into()));
    }
    Ok(challenge)
}
