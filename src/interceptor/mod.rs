//! Override of `navigator.credentials.create()` / `get()`: decides whether a
//! call is for the wallet and owns the confirmation UI while it runs.

pub mod prompt;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use prompt::{Notification, Prompt};

use crate::config::ProviderConfig;
use crate::messaging::{ClientInfo, ProtocolError, WebAuthnMessageManager, WebAuthnOutcome};
use crate::webauthn::native::{
    CredentialCreationOptions, CredentialRequestOptions, PublicKeyCredential, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialRequestOptions,
};
use crate::webauthn::types::COSE_ALG_ED25519;

/// The browser's own `create`/`get`, captured before the override.
#[async_trait]
pub trait NativeCredentials: Send + Sync {
    async fn create(&self, options: CredentialCreationOptions) -> Result<Option<PublicKeyCredential>, ProtocolError>;
    async fn get(&self, options: CredentialRequestOptions) -> Result<Option<PublicKeyCredential>, ProtocolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    Confirm,
    Cancel,
    /// Hand the call to the browser's own authenticator instead.
    UseNative,
}

/// Renders the confirmation overlay. Every root id passed to `mount` is
/// passed to `unmount` exactly once.
#[async_trait]
pub trait UiHost: Send + Sync {
    fn mount(&self, root_id: &str);
    fn unmount(&self, root_id: &str);
    async fn confirm(&self, root_id: &str, prompt: &Prompt) -> UserDecision;
    fn notify(&self, root_id: &str, notification: Notification);
}

/// A mounted overlay; unmounted on drop.
struct UiRoot {
    host: Arc<dyn UiHost>,
    id: String,
}

impl UiRoot {
    fn mount(host: Arc<dyn UiHost>) -> Self {
        let id = format!("passbridge-{}", Uuid::new_v4());
        host.mount(&id);
        Self { host, id }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for UiRoot {
    fn drop(&mut self) {
        self.host.unmount(&self.id);
    }
}

enum Flow {
    Credential(Option<PublicKeyCredential>),
    Native,
}

pub struct WebAuthnInterceptor {
    config: watch::Receiver<ProviderConfig>,
    native: Arc<dyn NativeCredentials>,
    ui: Arc<dyn UiHost>,
    manager: Arc<WebAuthnMessageManager>,
    client_info: ClientInfo,
}

impl WebAuthnInterceptor {
    pub fn new(
        config: watch::Receiver<ProviderConfig>,
        native: Arc<dyn NativeCredentials>,
        ui: Arc<dyn UiHost>,
        manager: Arc<WebAuthnMessageManager>,
        client_info: ClientInfo,
    ) -> Self {
        Self { config, native, ui, manager, client_info }
    }

    pub fn config(&self) -> ProviderConfig {
        self.config.borrow().clone()
    }

    pub async fn create(&self, options: CredentialCreationOptions) -> Result<Option<PublicKeyCredential>, ProtocolError> {
        let config = self.config();
        let public_key = match create_target(&config, &options) {
            Ok(public_key) => public_key.clone(),
            Err(reason) => {
                log_decision(config.debug, "create", reason);
                return self.native.create(options).await;
            }
        };
        log_decision(config.debug, "create", "intercepted");

        match race_abort(options.signal.clone(), self.confirm_register(&public_key)).await? {
            Flow::Credential(credential) => Ok(credential),
            Flow::Native => self.native.create(options).await,
        }
    }

    pub async fn get(&self, options: CredentialRequestOptions) -> Result<Option<PublicKeyCredential>, ProtocolError> {
        let config = self.config();
        let public_key = match get_target(&config, &options) {
            Ok(public_key) => public_key.clone(),
            Err(reason) => {
                log_decision(config.debug, "get", reason);
                return self.native.get(options).await;
            }
        };
        log_decision(config.debug, "get", "intercepted");

        match race_abort(options.signal.clone(), self.confirm_authenticate(&public_key)).await? {
            Flow::Credential(credential) => Ok(credential),
            Flow::Native => self.native.get(options).await,
        }
    }

    async fn confirm_register(&self, public_key: &PublicKeyCredentialCreationOptions) -> Result<Flow, ProtocolError> {
        let root = UiRoot::mount(self.ui.clone());
        let prompt = prompt::register_prompt(&self.client_info, public_key);
        match self.ui.confirm(root.id(), &prompt).await {
            UserDecision::Confirm => {}
            UserDecision::Cancel => return Err(ProtocolError::MethodCanceled),
            UserDecision::UseNative => return Ok(Flow::Native),
        }
        let result = self.manager.register(self.client_info.clone(), Some(public_key)).await;
        self.settle(&root, result)
    }

    async fn confirm_authenticate(&self, public_key: &PublicKeyCredentialRequestOptions) -> Result<Flow, ProtocolError> {
        let root = UiRoot::mount(self.ui.clone());
        let prompt = prompt::authenticate_prompt(&self.client_info, public_key);
        match self.ui.confirm(root.id(), &prompt).await {
            UserDecision::Confirm => {}
            UserDecision::Cancel => return Err(ProtocolError::MethodCanceled),
            UserDecision::UseNative => return Ok(Flow::Native),
        }
        let result = self.manager.authenticate(self.client_info.clone(), Some(public_key)).await;
        self.settle(&root, result)
    }

    /// Cancellation propagates; any other failure is shown to the user and
    /// the call falls back to the browser.
    fn settle(&self, root: &UiRoot, result: Result<Option<WebAuthnOutcome>, ProtocolError>) -> Result<Flow, ProtocolError> {
        match result {
            Ok(Some(outcome)) => {
                tracing::debug!(account = %outcome.account.address, credential = %outcome.credential.id, "Credential ready");
                Ok(Flow::Credential(Some(outcome.credential)))
            }
            Ok(None) => Ok(Flow::Credential(None)),
            Err(ProtocolError::MethodCanceled) => Err(ProtocolError::MethodCanceled),
            Err(e) => {
                tracing::warn!(code = e.code(), "Falling back to native WebAuthn: {e}");
                self.ui.notify(root.id(), prompt::error_notification(&e));
                Ok(Flow::Native)
            }
        }
    }
}

fn create_target<'a>(
    config: &ProviderConfig,
    options: &'a CredentialCreationOptions,
) -> Result<&'a PublicKeyCredentialCreationOptions, &'static str> {
    if !config.is_initialized {
        return Err("provider not initialized");
    }
    let public_key = options.public_key.as_ref().ok_or("not a public-key request")?;
    let offered = &public_key.pub_key_cred_params;
    // Registration only ever mints Ed25519 passkeys.
    if !offered.is_empty() && !offered.iter().any(|p| p.alg == COSE_ALG_ED25519) {
        return Err("Ed25519 not offered");
    }
    Ok(public_key)
}

fn get_target<'a>(
    config: &ProviderConfig,
    options: &'a CredentialRequestOptions,
) -> Result<&'a PublicKeyCredentialRequestOptions, &'static str> {
    if !config.is_initialized {
        return Err("provider not initialized");
    }
    options.public_key.as_ref().ok_or("not a public-key request")
}

fn log_decision(debug: bool, method: &'static str, decision: &'static str) {
    if debug {
        tracing::info!(method, decision, "WebAuthn call");
    } else {
        tracing::debug!(method, decision, "WebAuthn call");
    }
}

/// Runs `flow` unless `signal` fires first. An abort drops the flow, which
/// unmounts its UI root and releases any pending response listener.
async fn race_abort<F>(signal: Option<CancellationToken>, flow: F) -> Result<Flow, ProtocolError>
where
    F: Future<Output = Result<Flow, ProtocolError>>,
{
    let Some(signal) = signal else {
        return flow.await;
    };
    tokio::select! {
        biased;
        _ = signal.cancelled() => {
            tracing::debug!("WebAuthn call aborted by caller");
            Err(ProtocolError::MethodCanceled)
        }
        result = flow => result,
    }
}
