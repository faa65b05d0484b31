#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use passbridge::background::{run_handler_loop, HandlerSettings, WebAuthnHandler};
use passbridge::config::{ConfigManager, ProviderConfig};
use passbridge::interceptor::{NativeCredentials, Notification, Prompt, UiHost, UserDecision, WebAuthnInterceptor};
use passbridge::messaging::{run_response_listener, ClientInfo, ProtocolError, WebAuthnMessageManager};
use passbridge::store::{Account, AccountStore};
use passbridge::vault::{KeyCredentials, SealedKeyVault};
use passbridge::webauthn::native::{
    AuthenticatorAssertionResponse, AuthenticatorResponse, CredentialCreationOptions, CredentialRequestOptions,
    PublicKeyCredential,
};
use passbridge::webauthn::{CoseAlgorithm, KeyPair};

pub const ORIGIN: &str = "https://shop.example";
pub const RP_ID: &str = "shop.example";
pub const SEED: [u8; 32] = [0x5e; 32];
pub const ADDRESS: &str = "WALLET-ADDR-1";

/// Returned by the stubbed browser implementation.
pub fn native_marker() -> PublicKeyCredential {
    PublicKeyCredential {
        id: "native".into(),
        raw_id: b"native".to_vec(),
        authenticator_attachment: None,
        response: AuthenticatorResponse::Assertion(AuthenticatorAssertionResponse {
            client_data_json: vec![],
            authenticator_data: vec![],
            signature: vec![],
            user_handle: None,
        }),
    }
}

#[derive(Default)]
pub struct StubNative {
    pub creates: AtomicUsize,
    pub gets: AtomicUsize,
}

#[async_trait]
impl NativeCredentials for StubNative {
    async fn create(&self, _options: CredentialCreationOptions) -> Result<Option<PublicKeyCredential>, ProtocolError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(Some(native_marker()))
    }

    async fn get(&self, _options: CredentialRequestOptions) -> Result<Option<PublicKeyCredential>, ProtocolError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(Some(native_marker()))
    }
}

/// Records the overlay lifecycle. `decision: None` never answers.
pub struct RecordingUi {
    pub decision: Option<UserDecision>,
    pub mounted: Mutex<Vec<String>>,
    pub unmounted: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<Prompt>>,
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingUi {
    pub fn new(decision: Option<UserDecision>) -> Self {
        Self {
            decision,
            mounted: Mutex::new(Vec::new()),
            unmounted: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn mount_count(&self) -> usize {
        self.mounted.lock().unwrap().len()
    }

    pub fn all_unmounted(&self) -> bool {
        let mut mounted = self.mounted.lock().unwrap().clone();
        let mut unmounted = self.unmounted.lock().unwrap().clone();
        mounted.sort();
        unmounted.sort();
        mounted == unmounted
    }
}

#[async_trait]
impl UiHost for RecordingUi {
    fn mount(&self, root_id: &str) {
        self.mounted.lock().unwrap().push(root_id.to_string());
    }

    fn unmount(&self, root_id: &str) {
        self.unmounted.lock().unwrap().push(root_id.to_string());
    }

    async fn confirm(&self, _root_id: &str, prompt: &Prompt) -> UserDecision {
        self.prompts.lock().unwrap().push(prompt.clone());
        match self.decision {
            Some(decision) => decision,
            None => std::future::pending().await,
        }
    }

    fn notify(&self, _root_id: &str, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

pub fn client_info() -> ClientInfo {
    ClientInfo {
        app_name: "Shop".into(),
        description: Some("An example shop".into()),
        host: RP_ID.into(),
        icon_url: None,
        origin: ORIGIN.into(),
    }
}

pub fn account_public_key() -> Vec<u8> {
    KeyPair::from_private_key(CoseAlgorithm::Ed25519, &SEED).unwrap().public_key_bytes()
}

pub fn account_store() -> Arc<Mutex<AccountStore>> {
    let mut store = AccountStore::new();
    store.add_account(Account { address: ADDRESS.into(), name: Some("Main".into()), public_key: account_public_key() });
    Arc::new(Mutex::new(store))
}

/// A fully wired bridge: interceptor -> manager -> loopback channel ->
/// handler, and back.
pub struct Bridge {
    pub interceptor: WebAuthnInterceptor,
    pub manager: Arc<WebAuthnMessageManager>,
    pub store: Arc<Mutex<AccountStore>>,
    pub native: Arc<StubNative>,
    pub ui: Arc<RecordingUi>,
    pub config: ConfigManager,
}

pub fn bridge(decision: Option<UserDecision>, settings: HandlerSettings) -> Bridge {
    bridge_with_store(decision, settings, account_store())
}

pub fn bridge_with_store(
    decision: Option<UserDecision>,
    settings: HandlerSettings,
    store: Arc<Mutex<AccountStore>>,
) -> Bridge {
    let derived_key = [0x77; 32];
    let vault = SealedKeyVault::new();
    vault.seal(&account_public_key(), &SEED, &KeyCredentials::Passkey { derived_key }).unwrap();
    vault.unlock(KeyCredentials::Passkey { derived_key });

    let handler = Arc::new(WebAuthnHandler::new(store.clone(), Arc::new(vault), settings));
    let (request_tx, request_rx) = mpsc::channel::<Value>(16);
    let (response_tx, response_rx) = mpsc::channel::<Value>(16);
    tokio::spawn(run_handler_loop(handler, request_rx, response_tx));

    let manager = Arc::new(WebAuthnMessageManager::new(Arc::new(request_tx)));
    tokio::spawn(run_response_listener(manager.clone(), response_rx));

    let config = ConfigManager::new(ProviderConfig { is_initialized: true, ..Default::default() });
    let native = Arc::new(StubNative::default());
    let ui = Arc::new(RecordingUi::new(decision));
    let interceptor = WebAuthnInterceptor::new(
        config.subscribe(),
        native.clone(),
        ui.clone(),
        manager.clone(),
        client_info(),
    );
    Bridge { interceptor, manager, store, native, ui, config }
}
