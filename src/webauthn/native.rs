//! Buffer-carrying shapes of the browser's WebAuthn dictionaries, as the
//! interceptor receives them from the page and hands credentials back.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::types::CoseAlgorithm;

pub const PUBLIC_KEY_TYPE: &str = "public-key";
pub const PLATFORM_ATTACHMENT: &str = "platform";
pub const TRANSPORTS: [&str; 2] = ["hybrid", "internal"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelyingPartyEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub ty: String,
    pub alg: i64,
}

impl PubKeyCredParam {
    pub fn public_key(alg: i64) -> Self {
        Self { ty: PUBLIC_KEY_TYPE.to_string(), alg }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    pub ty: String,
    pub id: Vec<u8>,
    pub transports: Option<Vec<String>>,
}

impl PublicKeyCredentialDescriptor {
    pub fn public_key(id: Vec<u8>) -> Self {
        Self { ty: PUBLIC_KEY_TYPE.to_string(), id, transports: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredentialCreationOptions {
    pub challenge: Vec<u8>,
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: Option<u64>,
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub authenticator_selection: Option<AuthenticatorSelection>,
    pub attestation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredentialRequestOptions {
    pub challenge: Vec<u8>,
    pub timeout: Option<u64>,
    pub rp_id: Option<String>,
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub user_verification: Option<String>,
}

/// Argument of `navigator.credentials.create()`.
#[derive(Debug, Clone, Default)]
pub struct CredentialCreationOptions {
    pub public_key: Option<PublicKeyCredentialCreationOptions>,
    pub signal: Option<CancellationToken>,
}

/// Argument of `navigator.credentials.get()`.
#[derive(Debug, Clone, Default)]
pub struct CredentialRequestOptions {
    pub public_key: Option<PublicKeyCredentialRequestOptions>,
    pub signal: Option<CancellationToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorAttestationResponse {
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
    pub(crate) authenticator_data: Vec<u8>,
    pub(crate) public_key_algorithm: CoseAlgorithm,
}

impl AuthenticatorAttestationResponse {
    pub fn get_authenticator_data(&self) -> &[u8] {
        &self.authenticator_data
    }

    pub fn get_public_key_algorithm(&self) -> i64 {
        self.public_key_algorithm.id()
    }

    pub fn get_transports(&self) -> Vec<String> {
        TRANSPORTS.iter().map(|t| (*t).to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorAssertionResponse {
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorResponse {
    Attestation(AuthenticatorAttestationResponse),
    Assertion(AuthenticatorAssertionResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredential {
    /// base64url of `raw_id`, padding stripped.
    pub id: String,
    pub raw_id: Vec<u8>,
    pub authenticator_attachment: Option<String>,
    pub response: AuthenticatorResponse,
}

impl PublicKeyCredential {
    pub fn ty(&self) -> &'static str {
        PUBLIC_KEY_TYPE
    }

    pub fn get_client_extension_results(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    pub fn attestation(&self) -> Option<&AuthenticatorAttestationResponse> {
        match &self.response {
            AuthenticatorResponse::Attestation(r) => Some(r),
            AuthenticatorResponse::Assertion(_) => None,
        }
    }

    pub fn assertion(&self) -> Option<&AuthenticatorAssertionResponse> {
        match &self.response {
            AuthenticatorResponse::Assertion(r) => Some(r),
            AuthenticatorResponse::Attestation(_) => None,
        }
    }
}
