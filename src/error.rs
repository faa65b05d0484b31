#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("WebAuthn: {0}")]
    WebAuthn(#[from] crate::webauthn::WebAuthnError),
    #[error("Protocol: {0}")]
    Protocol(#[from] crate::messaging::ProtocolError),
    #[error("Store: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("Vault: {0}")]
    Vault(#[from] crate::vault::VaultError),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
