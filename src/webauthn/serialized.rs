//! JSON-safe mirrors of the WebAuthn dictionaries. Every buffer is standard
//! base64 text so the shapes can cross the extension message channel.

use serde::{Deserialize, Serialize};

use super::native::{AuthenticatorSelection, PubKeyCredParam, RelyingPartyEntity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedUserEntity {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedCredentialDescriptor {
    #[serde(rename = "type")]
    pub ty: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCreationOptions {
    pub challenge: String,
    pub rp: RelyingPartyEntity,
    pub user: SerializedUserEntity,
    #[serde(default)]
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<SerializedCredentialDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
}

impl SerializedCreationOptions {
    pub fn offered_algorithms(&self) -> Vec<i64> {
        self.pub_key_cred_params.iter().map(|p| p.alg).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRequestOptions {
    pub challenge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<SerializedCredentialDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAttestationResponse {
    pub attestation_object: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAssertionResponse {
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPublicKeyCredential<R> {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    pub response: R,
}

pub type SerializedAttestationCredential = SerializedPublicKeyCredential<SerializedAttestationResponse>;
pub type SerializedAssertionCredential = SerializedPublicKeyCredential<SerializedAssertionResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_options_wire_names() {
        let options = SerializedRequestOptions {
            challenge: "AQID".into(),
            timeout: Some(60_000),
            rp_id: Some("example.com".into()),
            allow_credentials: vec![SerializedCredentialDescriptor {
                ty: "public-key".into(),
                id: "AAAA".into(),
                transports: None,
            }],
            user_verification: None,
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["rpId"], "example.com");
        assert_eq!(json["allowCredentials"][0]["type"], "public-key");
        assert!(json.get("userVerification").is_none());
    }

    #[test]
    fn test_assertion_response_uses_client_data_json_name() {
        let response = SerializedAssertionResponse {
            authenticator_data: "a".into(),
            client_data_json: "b".into(),
            signature: "c".into(),
            user_handle: Some("d".into()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["clientDataJSON"], "b");
        assert_eq!(json["userHandle"], "d");
    }

    #[test]
    fn test_creation_options_defaults() {
        let json = r#"{
            "challenge": "AQID",
            "rp": {"name": "Example"},
            "user": {"id": "dXNlcg==", "name": "alice", "displayName": "Alice"}
        }"#;
        let options: SerializedCreationOptions = serde_json::from_str(json).unwrap();
        assert!(options.rp.id.is_none());
        assert!(options.offered_algorithms().is_empty());
        assert!(options.exclude_credentials.is_empty());
    }
}
