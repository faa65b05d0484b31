use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encoding::uuid_to_bytes;
use crate::webauthn::{CoseAlgorithm, WebAuthnError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasskeyRelyingParty {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyUser {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// A passkey registered against one wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPasskey {
    /// UUID; its 16 raw bytes are the WebAuthn credential id.
    pub id: String,
    pub alg: CoseAlgorithm,
    pub created_at: String,     // unix millis
    pub last_used_at: String,   // unix millis
    pub origin: String,
    pub rp: PasskeyRelyingParty,
    pub user: PasskeyUser,
}

impl AccountPasskey {
    pub fn new(alg: CoseAlgorithm, origin: &str, rp: PasskeyRelyingParty, user: PasskeyUser) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            alg,
            created_at: now.clone(),
            last_used_at: now,
            origin: origin.to_string(),
            rp,
            user,
        }
    }

    pub fn credential_id(&self) -> Result<[u8; 16], WebAuthnError> {
        uuid_to_bytes(&self.id)
    }

    pub fn mark_used(&mut self) {
        self.last_used_at = now_millis();
    }

    pub(crate) fn last_used_millis(&self) -> u64 {
        self.last_used_at.parse().unwrap_or_default()
    }
}

pub(crate) fn now_millis() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}
