//! Synthesizes `PublicKeyCredential` responses from wallet key material, in
//! place of a hardware authenticator.

use super::attestation::build_attestation_object;
use super::authenticator_data::{build_assertion_auth_data, build_attestation_auth_data};
use super::client_data::{decode_challenge, CollectedClientData};
use super::key_pair::KeyPair;
use super::native::{PLATFORM_ATTACHMENT, PUBLIC_KEY_TYPE};
use super::serialized::{
    SerializedAssertionCredential, SerializedAssertionResponse, SerializedAttestationCredential,
    SerializedAttestationResponse, SerializedCreationOptions, SerializedPublicKeyCredential,
    SerializedRequestOptions,
};
use super::types::{CoseAlgorithm, WebAuthnError};
use crate::config::AAGUID;
use crate::encoding::{from_base64, sha256, to_base64, to_base64url};
use crate::store::{AccountPasskey, PasskeyRelyingParty, PasskeyUser};

#[derive(Debug)]
pub struct PublicKeyCredentialFactory {
    challenge: String,
    key_pair: KeyPair,
    passkey: AccountPasskey,
}

impl PublicKeyCredentialFactory {
    /// Registration: negotiates the algorithm, loads the key pair and mints a
    /// new passkey record for `origin`.
    pub fn generate(
        origin: &str,
        private_key: &[u8],
        options: &SerializedCreationOptions,
    ) -> Result<Self, WebAuthnError> {
        decode_challenge(&options.challenge)?;
        let alg = CoseAlgorithm::negotiate(&options.offered_algorithms())?;
        let key_pair = KeyPair::from_private_key(alg, private_key)?;

        let rp = PasskeyRelyingParty {
            id: options.rp.id.clone().unwrap_or_else(|| origin.to_string()),
            name: options.rp.name.clone(),
        };
        let user = PasskeyUser {
            id: user_handle_text(from_base64(&options.user.id)?)?,
            name: options.user.name.clone(),
            display_name: options.user.display_name.clone(),
        };
        let passkey = AccountPasskey::new(alg, origin, rp, user);
        tracing::debug!(passkey = %passkey.id, %alg, rp_id = %passkey.rp.id, "Passkey generated");

        Ok(Self { challenge: options.challenge.clone(), key_pair, passkey })
    }

    /// Authentication: the key pair uses the algorithm the passkey was
    /// registered with.
    pub fn init(
        passkey: AccountPasskey,
        private_key: &[u8],
        options: &SerializedRequestOptions,
    ) -> Result<Self, WebAuthnError> {
        decode_challenge(&options.challenge)?;
        let key_pair = KeyPair::from_private_key(passkey.alg, private_key)?;
        Ok(Self { challenge: options.challenge.clone(), key_pair, passkey })
    }

    pub fn passkey(&self) -> &AccountPasskey {
        &self.passkey
    }

    pub fn into_passkey(self) -> AccountPasskey {
        self.passkey
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.key_pair.algorithm()
    }

    pub fn serialized_attestation_credential(&self) -> Result<SerializedAttestationCredential, WebAuthnError> {
        let credential_id = self.passkey.credential_id()?;
        let public_key = self.key_pair.cose_public_key()?;
        let auth_data = build_attestation_auth_data(&self.passkey.rp.id, &AAGUID, &credential_id, &public_key)?;
        let client_data_json =
            CollectedClientData::for_create(&self.challenge, &self.passkey.origin)?.to_json_bytes()?;
        let sig = self.sign(&auth_data, &client_data_json);
        let attestation_object = build_attestation_object(&auth_data, self.key_pair.algorithm(), &sig);

        Ok(SerializedPublicKeyCredential {
            id: to_base64url(&credential_id),
            raw_id: to_base64(&credential_id),
            ty: PUBLIC_KEY_TYPE.to_string(),
            authenticator_attachment: Some(PLATFORM_ATTACHMENT.to_string()),
            response: SerializedAttestationResponse {
                attestation_object: to_base64(&attestation_object),
                client_data_json: to_base64(&client_data_json),
            },
        })
    }

    pub fn serialized_assertion_credential(&self) -> Result<SerializedAssertionCredential, WebAuthnError> {
        let credential_id = self.passkey.credential_id()?;
        let auth_data = build_assertion_auth_data(&self.passkey.rp.id);
        let client_data_json =
            CollectedClientData::for_get(&self.challenge, &self.passkey.origin)?.to_json_bytes()?;
        let signature = self.sign(&auth_data, &client_data_json);

        Ok(SerializedPublicKeyCredential {
            id: to_base64url(&credential_id),
            raw_id: to_base64(&credential_id),
            ty: PUBLIC_KEY_TYPE.to_string(),
            authenticator_attachment: Some(PLATFORM_ATTACHMENT.to_string()),
            response: SerializedAssertionResponse {
                authenticator_data: to_base64(&auth_data),
                client_data_json: to_base64(&client_data_json),
                signature: to_base64(&signature),
                user_handle: Some(to_base64(self.passkey.user.id.as_bytes())),
            },
        })
    }

    /// Signs `authenticatorData || SHA-256(clientDataJSON)`.
    fn sign(&self, auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let mut to_sign = auth_data.to_vec();
        to_sign.extend_from_slice(&sha256(client_data_json));
        self.key_pair.sign(&to_sign)
    }
}

/// Passkeys keep the user handle as text, and the assertion path hands back
/// its UTF-8 bytes. Any other handle could not be returned unchanged.
fn user_handle_text(handle: Vec<u8>) -> Result<String, WebAuthnError> {
    String::from_utf8(handle)
        .map_err(|e| WebAuthnError::MalformedData(format!("user handle is not UTF-8: {e}")))
}
