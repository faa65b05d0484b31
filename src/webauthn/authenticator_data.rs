use super::cose::CosePublicKey;
use super::types::WebAuthnError;
use crate::encoding::sha256;

pub const FLAG_UP: u8 = 0x01;
pub const FLAG_UV: u8 = 0x04;
pub const FLAG_BE: u8 = 0x08;
pub const FLAG_BS: u8 = 0x10;
pub const FLAG_AT: u8 = 0x40;
pub const FLAG_ED: u8 = 0x80;

/// Flags for `get`: UP, UV, BE, BS (0x1D).
pub const ASSERTION_FLAGS: u8 = FLAG_UP | FLAG_UV | FLAG_BE | FLAG_BS;
/// Flags for `create`: UP, UV, BE, AT (0x4D).
pub const ATTESTATION_FLAGS: u8 = FLAG_UP | FLAG_UV | FLAG_BE | FLAG_AT;

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = RP_ID_HASH_LEN + 1 + 4;
const AAGUID_LEN: usize = 16;

/// Build authenticatorData for a registration (AT set, attested credential data appended).
pub fn build_attestation_auth_data(
    rp_id: &str,
    aaguid: &[u8; 16],
    credential_id: &[u8],
    public_key: &CosePublicKey,
) -> Result<Vec<u8>, WebAuthnError> {
    let cred_id_len = u16::try_from(credential_id.len()).map_err(|_| {
        WebAuthnError::MalformedData(format!(
            "credential id of {} bytes does not fit a u16 length",
            credential_id.len()
        ))
    })?;
    let cose_key = public_key.to_cbor();
    let mut data = Vec::with_capacity(HEADER_LEN + AAGUID_LEN + 2 + credential_id.len() + cose_key.len());
    data.extend_from_slice(&sha256(rp_id.as_bytes()));
    data.push(ATTESTATION_FLAGS);
    data.extend_from_slice(&0u32.to_be_bytes()); // no hardware counter
    data.extend_from_slice(aaguid);
    data.extend_from_slice(&cred_id_len.to_be_bytes());
    data.extend_from_slice(credential_id);
    data.extend_from_slice(&cose_key);
    Ok(data)
}

/// Build authenticatorData for an authentication (no attested credential data).
pub fn build_assertion_auth_data(rp_id: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_LEN);
    data.extend_from_slice(&sha256(rp_id.as_bytes()));
    data.push(ASSERTION_FLAGS);
    data.extend_from_slice(&0u32.to_be_bytes());
    data
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    /// CBOR COSE_Key, kept as received.
    pub credential_public_key: Vec<u8>,
}

impl AttestedCredentialData {
    pub fn public_key(&self) -> Result<CosePublicKey, WebAuthnError> {
        CosePublicKey::from_cbor(&self.credential_public_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        if bytes.len() < HEADER_LEN {
            return Err(WebAuthnError::MalformedData(format!(
                "authenticator data is {} bytes, need at least {HEADER_LEN}",
                bytes.len()
            )));
        }
        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..RP_ID_HASH_LEN]);
        let flags = bytes[RP_ID_HASH_LEN];
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let attested_credential_data = if flags & FLAG_AT != 0 {
            Some(parse_attested(&bytes[HEADER_LEN..])?)
        } else {
            None
        };

        Ok(Self { rp_id_hash, flags, sign_count, attested_credential_data })
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }

    /// The attested credential block, which every registration response must carry.
    pub fn require_attested(&self) -> Result<&AttestedCredentialData, WebAuthnError> {
        self.attested_credential_data
            .as_ref()
            .ok_or_else(|| WebAuthnError::MalformedData("no attested credential data".into()))
    }
}

fn parse_attested(data: &[u8]) -> Result<AttestedCredentialData, WebAuthnError> {
    let truncated = |what: &str| WebAuthnError::MalformedData(format!("authenticator data truncated in {what}"));

    if data.len() < AAGUID_LEN + 2 {
        return Err(truncated("AAGUID/credential id length"));
    }
    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&data[..AAGUID_LEN]);
    let id_len = u16::from_be_bytes([data[AAGUID_LEN], data[AAGUID_LEN + 1]]) as usize;

    let rest = &data[AAGUID_LEN + 2..];
    if rest.len() < id_len {
        return Err(truncated("credential id"));
    }
    let (credential_id, public_key) = rest.split_at(id_len);
    if public_key.is_empty() {
        return Err(truncated("credential public key"));
    }

    Ok(AttestedCredentialData {
        aaguid,
        credential_id: credential_id.to_vec(),
        credential_public_key: public_key.to_vec(),
    })
}
