//! Conversions between the page's buffer-carrying dictionaries and their
//! base64 mirrors on the message channel.

use crate::encoding::{from_base64, to_base64, to_base64url};
use crate::webauthn::attestation::AttestationObject;
use crate::webauthn::authenticator_data::AuthenticatorData;
use crate::webauthn::native::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    PublicKeyCredential, PublicKeyCredentialCreationOptions, PublicKeyCredentialDescriptor,
    PublicKeyCredentialRequestOptions,
};
use crate::webauthn::serialized::{
    SerializedAssertionCredential, SerializedAttestationCredential, SerializedCreationOptions,
    SerializedCredentialDescriptor, SerializedRequestOptions, SerializedUserEntity,
};
use crate::webauthn::WebAuthnError;

fn serialize_descriptor(descriptor: &PublicKeyCredentialDescriptor) -> SerializedCredentialDescriptor {
    SerializedCredentialDescriptor {
        ty: descriptor.ty.clone(),
        id: to_base64(&descriptor.id),
        transports: descriptor.transports.clone(),
    }
}

pub fn serialize_creation_options(options: &PublicKeyCredentialCreationOptions) -> SerializedCreationOptions {
    SerializedCreationOptions {
        challenge: to_base64(&options.challenge),
        rp: options.rp.clone(),
        user: SerializedUserEntity {
            id: to_base64(&options.user.id),
            name: options.user.name.clone(),
            display_name: options.user.display_name.clone(),
        },
        pub_key_cred_params: options.pub_key_cred_params.clone(),
        timeout: options.timeout,
        exclude_credentials: options.exclude_credentials.iter().map(serialize_descriptor).collect(),
        authenticator_selection: options.authenticator_selection.clone(),
        attestation: options.attestation.clone(),
    }
}

pub fn serialize_request_options(options: &PublicKeyCredentialRequestOptions) -> SerializedRequestOptions {
    SerializedRequestOptions {
        challenge: to_base64(&options.challenge),
        timeout: options.timeout,
        rp_id: options.rp_id.clone(),
        allow_credentials: options.allow_credentials.iter().map(serialize_descriptor).collect(),
        user_verification: options.user_verification.clone(),
    }
}

/// Rebuilds a registration credential. The authenticator data and public key
/// algorithm are recovered from the attestation object.
pub fn deserialize_attestation_credential(
    credential: SerializedAttestationCredential,
) -> Result<PublicKeyCredential, WebAuthnError> {
    let raw_id = from_base64(&credential.raw_id)?;
    let attestation_object = from_base64(&credential.response.attestation_object)?;
    let client_data_json = from_base64(&credential.response.client_data_json)?;

    let object = AttestationObject::parse(&attestation_object)?;
    let auth_data = AuthenticatorData::parse(&object.auth_data)?;
    let attested = auth_data.require_attested()?;
    if attested.credential_id != raw_id {
        return Err(WebAuthnError::MalformedData(
            "attested credential id does not match rawId".into(),
        ));
    }
    let public_key = attested.public_key()?;

    Ok(PublicKeyCredential {
        id: to_base64url(&raw_id),
        raw_id,
        authenticator_attachment: credential.authenticator_attachment,
        response: AuthenticatorResponse::Attestation(AuthenticatorAttestationResponse {
            client_data_json,
            attestation_object,
            authenticator_data: object.auth_data,
            public_key_algorithm: public_key.algorithm(),
        }),
    })
}

pub fn deserialize_assertion_credential(
    credential: SerializedAssertionCredential,
) -> Result<PublicKeyCredential, WebAuthnError> {
    let raw_id = from_base64(&credential.raw_id)?;
    let response = credential.response;
    let user_handle = response.user_handle.as_deref().map(from_base64).transpose()?;

    Ok(PublicKeyCredential {
        id: to_base64url(&raw_id),
        raw_id,
        authenticator_attachment: credential.authenticator_attachment,
        response: AuthenticatorResponse::Assertion(AuthenticatorAssertionResponse {
            client_data_json: from_base64(&response.client_data_json)?,
            authenticator_data: from_base64(&response.authenticator_data)?,
            signature: from_base64(&response.signature)?,
            user_handle,
        }),
    })
}
