//! Privileged side of the bridge: answers register/authenticate requests
//! with credentials minted from vault key material.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::encoding::from_base64;
use crate::messaging::types::RequestHeader;
use crate::messaging::{
    AuthenticateRequestPayload, AuthenticateResult, MessageReference, ProtocolError, RegisterRequestPayload,
    RegisterResult, RequestMessage, RequestPayload, ResponseMessage,
};
use crate::store::{AccountInformation, AccountStore, StoreError};
use crate::vault::{KeyVault, VaultError};
use crate::webauthn::PublicKeyCredentialFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSettings {
    pub passkeys_enabled: bool,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self { passkeys_enabled: true }
    }
}

impl From<VaultError> for ProtocolError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::InvalidPublicKey(key) => ProtocolError::InvalidPublicKey(key),
            other => ProtocolError::Unknown { code: crate::messaging::CODE_UNKNOWN, message: other.to_string() },
        }
    }
}

impl From<StoreError> for ProtocolError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound(address) => ProtocolError::InvalidPublicKey(address),
            StoreError::PasskeyNotFound(id) | StoreError::InvalidId(id) => ProtocolError::InvalidPasskey(id),
            other => ProtocolError::Unknown { code: crate::messaging::CODE_UNKNOWN, message: other.to_string() },
        }
    }
}

pub struct WebAuthnHandler {
    store: Arc<Mutex<AccountStore>>,
    vault: Arc<dyn KeyVault>,
    settings: HandlerSettings,
}

impl WebAuthnHandler {
    pub fn new(store: Arc<Mutex<AccountStore>>, vault: Arc<dyn KeyVault>, settings: HandlerSettings) -> Self {
        Self { store, vault, settings }
    }

    /// Answers one request envelope. Returns `None` for anything that is not
    /// a request this handler serves.
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let header = match RequestHeader::deserialize(&message) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("Ignoring message without a request header: {e}");
                return None;
            }
        };
        let Some(reply_reference) = header.reference.response() else {
            tracing::debug!(reference = ?header.reference, "Ignoring non-request message");
            return None;
        };
        tracing::debug!(request_id = %header.id, reference = ?header.reference, "Handling request");

        match header.reference {
            MessageReference::RegisterRequest => {
                respond(header.id, reply_reference, self.register(message).await)
            }
            _ => respond(header.id, reply_reference, self.authenticate(message).await),
        }
    }

    async fn register(&self, message: Value) -> Result<RegisterResult, ProtocolError> {
        if !self.settings.passkeys_enabled {
            return Err(ProtocolError::NotEnabled);
        }
        let request: RequestMessage<RegisterRequestPayload> = parse_request(message)?;
        let RequestPayload { client_info, options } = request.payload;

        let (address, public_key) = {
            let store = self.lock_store();
            let account = store
                .active_account()
                .ok_or_else(|| ProtocolError::InvalidPublicKey("no active account".into()))?;
            for excluded in &options.exclude_credentials {
                let id = from_base64(&excluded.id)?;
                if let Some((owner, passkey)) = store.get_by_credential_id(&id) {
                    if owner.address == account.address {
                        return Err(ProtocolError::CredentialExcluded(passkey.id.clone()));
                    }
                }
            }
            (account.address.clone(), account.public_key.clone())
        };

        let private_key = self.vault.decrypt(&public_key).await?;
        let factory = PublicKeyCredentialFactory::generate(&client_info.origin, &private_key, &options)?;
        let credential = factory.serialized_attestation_credential()?;

        let mut store = self.lock_store();
        store.add_passkey(&address, factory.into_passkey())?;
        let account = store
            .account(&address)
            .map(AccountInformation::from)
            .ok_or_else(|| ProtocolError::from(StoreError::AccountNotFound(address.clone())))?;
        tracing::info!(
            request_id = %request.id,
            account = %address,
            origin = %client_info.origin,
            "Passkey registered"
        );
        Ok(RegisterResult { account, credential })
    }

    async fn authenticate(&self, message: Value) -> Result<AuthenticateResult, ProtocolError> {
        if !self.settings.passkeys_enabled {
            return Err(ProtocolError::NotEnabled);
        }
        let request: RequestMessage<AuthenticateRequestPayload> = parse_request(message)?;
        let RequestPayload { client_info, options } = request.payload;
        let rp_id = options.rp_id.clone().unwrap_or_else(|| client_info.origin.clone());

        let (account, passkey) = {
            let store = self.lock_store();
            let mut chosen = None;
            for allowed in &options.allow_credentials {
                let id = from_base64(&allowed.id)?;
                if let Some(found) = store.get_by_credential_id(&id).filter(|(_, p)| p.rp.id == rp_id) {
                    chosen = Some(found);
                    break;
                }
            }
            // An allow list that names nothing we hold falls back to the rp's
            // most recently used passkey.
            let (account, passkey) = chosen
                .or_else(|| store.get_by_rp_id(&rp_id).into_iter().next())
                .ok_or_else(|| ProtocolError::InvalidPasskey(format!("no passkey for {rp_id}")))?;
            (account.clone(), passkey.clone())
        };
        let passkey_id = Uuid::parse_str(&passkey.id).map_err(|_| StoreError::InvalidId(passkey.id.clone()))?;

        let private_key = self.vault.decrypt(&account.public_key).await?;
        let factory = PublicKeyCredentialFactory::init(passkey, &private_key, &options)?;
        let credential = factory.serialized_assertion_credential()?;

        self.lock_store().touch_passkey(&passkey_id)?;
        tracing::info!(
            request_id = %request.id,
            account = %account.address,
            passkey = %passkey_id,
            "Passkey used"
        );
        Ok(AuthenticateResult { account: AccountInformation::from(&account), credential })
    }

    fn lock_store(&self) -> MutexGuard<'_, AccountStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_request<P: DeserializeOwned>(message: Value) -> Result<RequestMessage<P>, ProtocolError> {
    serde_json::from_value(message).map_err(|e| ProtocolError::MalformedRequest(e.to_string()))
}

fn respond<R: Serialize>(
    request_id: Uuid,
    reference: MessageReference,
    outcome: Result<R, ProtocolError>,
) -> Option<Value> {
    let encoded = match outcome {
        Ok(result) => serde_json::to_value(ResponseMessage::ok(request_id, reference, Some(result))),
        Err(e) => {
            tracing::warn!(request_id = %request_id, code = e.code(), "Request failed: {e}");
            serde_json::to_value(ResponseMessage::<R>::err(request_id, reference, e.to_payload()))
        }
    };
    match encoded {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(request_id = %request_id, "Failed to encode response: {e}");
            None
        }
    }
}

/// Answers every request from `incoming` on its own task, writing responses
/// to `outgoing`.
pub async fn run_handler_loop(
    handler: Arc<WebAuthnHandler>,
    mut incoming: mpsc::Receiver<Value>,
    outgoing: mpsc::Sender<Value>,
) {
    tracing::info!("WebAuthn handler loop running");
    while let Some(message) = incoming.recv().await {
        let handler = handler.clone();
        let outgoing = outgoing.clone();
        tokio::spawn(async move {
            if let Some(response) = handler.handle(message).await {
                if outgoing.send(response).await.is_err() {
                    tracing::error!("Outgoing channel closed");
                }
            }
        });
    }
    tracing::info!("WebAuthn handler loop exiting (incoming channel closed)");
}
