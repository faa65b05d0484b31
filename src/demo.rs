//! In-process wiring of interceptor, message manager and privileged handler
//! over loopback channels.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::RngCore;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::background::{run_handler_loop, HandlerSettings, WebAuthnHandler};
use crate::config::{ConfigManager, ProviderConfig};
use crate::encoding::to_base64url;
use crate::error::{Error, Result};
use crate::interceptor::{NativeCredentials, Notification, Prompt, UiHost, UserDecision, WebAuthnInterceptor};
use crate::messaging::{run_response_listener, ClientInfo, ProtocolError, WebAuthnMessageManager};
use crate::store::{Account, AccountPasskey, AccountStore, PasskeyRelyingParty, PasskeyUser};
use crate::vault::{KeyCredentials, SealedKeyVault};
use crate::webauthn::native::{
    AuthenticatorResponse, CredentialCreationOptions, CredentialRequestOptions, PubKeyCredParam,
    PublicKeyCredential, PublicKeyCredentialCreationOptions, PublicKeyCredentialDescriptor,
    PublicKeyCredentialRequestOptions, RelyingPartyEntity, UserEntity,
};
use crate::webauthn::{CoseAlgorithm, KeyPair};

/// Stands in for the browser when no platform authenticator exists.
pub struct UnavailableNative;

#[async_trait]
impl NativeCredentials for UnavailableNative {
    async fn create(&self, _options: CredentialCreationOptions) -> Result<Option<PublicKeyCredential>, ProtocolError> {
        Err(ProtocolError::MethodNotSupported("no platform authenticator".into()))
    }

    async fn get(&self, _options: CredentialRequestOptions) -> Result<Option<PublicKeyCredential>, ProtocolError> {
        Err(ProtocolError::MethodNotSupported("no platform authenticator".into()))
    }
}

/// Confirms every prompt and logs what a real overlay would show.
pub struct AutoConfirmUi;

#[async_trait]
impl UiHost for AutoConfirmUi {
    fn mount(&self, root_id: &str) {
        tracing::debug!(root_id, "UI root mounted");
    }

    fn unmount(&self, root_id: &str) {
        tracing::debug!(root_id, "UI root unmounted");
    }

    async fn confirm(&self, root_id: &str, prompt: &Prompt) -> UserDecision {
        tracing::info!(root_id, title = %prompt.title, "{}", prompt.description);
        UserDecision::Confirm
    }

    fn notify(&self, root_id: &str, notification: Notification) {
        tracing::warn!(root_id, code = notification.code, "{}", notification.description);
    }
}

/// Host part of an origin: `https://login.example.com:8443/x` -> `login.example.com`.
pub fn host_of(origin: &str) -> &str {
    let rest = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    rest.split(['/', ':']).next().unwrap_or(rest)
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Registers (Ed25519) or seeds (ES256) a passkey for `origin`, then signs
/// in with it through the interceptor. Returns both credentials as JSON.
pub async fn run_demo(origin: &str, algorithm: CoseAlgorithm) -> Result<Value> {
    let host = host_of(origin).to_string();

    let seed: [u8; 32] = random_bytes();
    let account_key = KeyPair::from_private_key(CoseAlgorithm::Ed25519, &seed)?;
    let public_key = account_key.public_key_bytes();
    let account = Account {
        address: format!("DEMO-{}", &to_base64url(&public_key)[..8]),
        name: Some("Demo account".into()),
        public_key,
    };

    let credentials = KeyCredentials::Password { derived_key: random_bytes() };
    let vault = SealedKeyVault::new();
    vault.seal(&account.public_key, &seed, &credentials)?;
    vault.unlock(credentials);

    let mut store = AccountStore::new();
    store.add_account(account.clone());
    if algorithm == CoseAlgorithm::Es256 {
        // Registration only mints Ed25519, so an ES256 passkey has to exist already.
        let passkey = AccountPasskey::new(
            CoseAlgorithm::Es256,
            origin,
            PasskeyRelyingParty { id: host.clone(), name: host.clone() },
            PasskeyUser { id: "demo-user".into(), name: "demo".into(), display_name: "Demo User".into() },
        );
        store.add_passkey(&account.address, passkey)?;
    }
    let store = Arc::new(Mutex::new(store));

    let handler = Arc::new(WebAuthnHandler::new(store, Arc::new(vault), HandlerSettings::default()));
    let (request_tx, request_rx) = mpsc::channel(16);
    let (response_tx, response_rx) = mpsc::channel(16);
    let handler_task = tokio::spawn(run_handler_loop(handler, request_rx, response_tx));
    let manager = Arc::new(WebAuthnMessageManager::new(Arc::new(request_tx)));
    let listener_task = tokio::spawn(run_response_listener(manager.clone(), response_rx));

    let config = ConfigManager::new(ProviderConfig::default());
    config.update(|c| c.is_initialized = true);
    let client_info = ClientInfo {
        app_name: host.clone(),
        description: None,
        host: host.clone(),
        icon_url: None,
        origin: origin.to_string(),
    };
    let interceptor = WebAuthnInterceptor::new(
        config.subscribe(),
        Arc::new(UnavailableNative),
        Arc::new(AutoConfirmUi),
        manager,
        client_info,
    );

    let outcome = demo_round_trip(&interceptor, &host, algorithm).await;
    handler_task.abort();
    listener_task.abort();
    outcome
}

async fn demo_round_trip(interceptor: &WebAuthnInterceptor, host: &str, algorithm: CoseAlgorithm) -> Result<Value> {
    let mut report = serde_json::Map::new();

    let mut allow_credentials = Vec::new();
    if algorithm == CoseAlgorithm::Ed25519 {
        let options = CredentialCreationOptions {
            public_key: Some(PublicKeyCredentialCreationOptions {
                challenge: random_bytes::<32>().to_vec(),
                rp: RelyingPartyEntity { id: Some(host.to_string()), name: host.to_string() },
                user: UserEntity { id: b"demo-user".to_vec(), name: "demo".into(), display_name: "Demo User".into() },
                pub_key_cred_params: vec![PubKeyCredParam::public_key(-8), PubKeyCredParam::public_key(-7)],
                timeout: Some(60_000),
                exclude_credentials: vec![],
                authenticator_selection: None,
                attestation: Some("direct".into()),
            }),
            signal: None,
        };
        let credential = interceptor
            .create(options)
            .await?
            .ok_or_else(|| Error::Internal("registration returned no credential".into()))?;
        allow_credentials.push(PublicKeyCredentialDescriptor::public_key(credential.raw_id.clone()));
        report.insert("registration".into(), credential_json(&credential));
    }

    let options = CredentialRequestOptions {
        public_key: Some(PublicKeyCredentialRequestOptions {
            challenge: random_bytes::<32>().to_vec(),
            timeout: Some(60_000),
            rp_id: Some(host.to_string()),
            allow_credentials,
            user_verification: Some("required".into()),
        }),
        signal: None,
    };
    let credential = interceptor
        .get(options)
        .await?
        .ok_or_else(|| Error::Internal("authentication returned no credential".into()))?;
    report.insert("authentication".into(), credential_json(&credential));

    Ok(Value::Object(report))
}

/// The page-visible view of a credential, buffers as base64url.
pub fn credential_json(credential: &PublicKeyCredential) -> Value {
    let response = match &credential.response {
        AuthenticatorResponse::Attestation(r) => json!({
            "clientDataJSON": String::from_utf8_lossy(&r.client_data_json),
            "attestationObject": to_base64url(&r.attestation_object),
            "authenticatorData": to_base64url(r.get_authenticator_data()),
            "publicKeyAlgorithm": r.get_public_key_algorithm(),
            "transports": r.get_transports(),
        }),
        AuthenticatorResponse::Assertion(r) => json!({
            "clientDataJSON": String::from_utf8_lossy(&r.client_data_json),
            "authenticatorData": to_base64url(&r.authenticator_data),
            "signature": to_base64url(&r.signature),
            "userHandle": r.user_handle.as_deref().map(to_base64url),
        }),
    };
    json!({
        "id": credential.id,
        "rawId": to_base64url(&credential.raw_id),
        "type": credential.ty(),
        "authenticatorAttachment": credential.authenticator_attachment,
        "response": response,
        "clientExtensionResults": credential.get_client_extension_results(),
    })
}
