use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::convert::{
    deserialize_assertion_credential, deserialize_attestation_credential, serialize_creation_options,
    serialize_request_options,
};
use super::pending::PendingRequests;
use super::types::*;
use super::ProtocolError;
use crate::config::UPPER_REQUEST_TIMEOUT;
use crate::store::AccountInformation;
use crate::webauthn::native::{
    PublicKeyCredential, PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions,
};
use crate::webauthn::WebAuthnError;

/// Outbound half of the channel to the privileged context.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: Value) -> Result<(), ProtocolError>;
}

#[async_trait]
impl MessageTransport for mpsc::Sender<Value> {
    async fn send(&self, message: Value) -> Result<(), ProtocolError> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| ProtocolError::Transport("message channel closed".into()))
    }
}

/// A credential produced by the privileged context, with the account that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthnOutcome {
    pub account: AccountInformation,
    pub credential: PublicKeyCredential,
}

/// Page-side client of the request/response protocol.
pub struct WebAuthnMessageManager {
    transport: Arc<dyn MessageTransport>,
    pending: PendingRequests,
    timeout: Duration,
}

impl WebAuthnMessageManager {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self { transport, pending: PendingRequests::new(), timeout: UPPER_REQUEST_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Routes an inbound message to the request waiting on it. Anything that
    /// answers no live request is dropped.
    pub fn deliver(&self, message: Value) -> bool {
        let header = match ResponseHeader::deserialize(&message) {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!("Ignoring message that is not a response: {e}");
                return false;
            }
        };
        let delivered = self.pending.resolve(header.request_id, header.reference, message);
        if !delivered {
            tracing::debug!(
                request_id = %header.request_id,
                reference = ?header.reference,
                "Dropping response with no waiting request"
            );
        }
        delivered
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Asks the privileged context to register a passkey. `Ok(None)` when the
    /// reply carried no result.
    pub async fn register(
        &self,
        client_info: ClientInfo,
        options: Option<&PublicKeyCredentialCreationOptions>,
    ) -> Result<Option<WebAuthnOutcome>, ProtocolError> {
        let options = options
            .ok_or_else(|| ProtocolError::MalformedRequest("registration request has no publicKey options".into()))?;
        let request = RequestMessage::new(
            MessageReference::RegisterRequest,
            RequestPayload { client_info, options: serialize_creation_options(options) },
        );
        let response: ResponseMessage<RegisterResult> = self.round_trip(request).await?;
        let Some(result) = into_result(response)? else {
            return Ok(None);
        };
        Ok(Some(WebAuthnOutcome {
            account: result.account,
            credential: deserialize_attestation_credential(result.credential)?,
        }))
    }

    pub async fn authenticate(
        &self,
        client_info: ClientInfo,
        options: Option<&PublicKeyCredentialRequestOptions>,
    ) -> Result<Option<WebAuthnOutcome>, ProtocolError> {
        let options = options
            .ok_or_else(|| ProtocolError::MalformedRequest("authentication request has no publicKey options".into()))?;
        let request = RequestMessage::new(
            MessageReference::AuthenticateRequest,
            RequestPayload { client_info, options: serialize_request_options(options) },
        );
        let response: ResponseMessage<AuthenticateResult> = self.round_trip(request).await?;
        let Some(result) = into_result(response)? else {
            return Ok(None);
        };
        Ok(Some(WebAuthnOutcome {
            account: result.account,
            credential: deserialize_assertion_credential(result.credential)?,
        }))
    }

    async fn round_trip<P, R>(&self, request: RequestMessage<P>) -> Result<ResponseMessage<R>, ProtocolError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let (id, reference, message) = encode_request(request)?;
        let expects = reference
            .response()
            .ok_or_else(|| ProtocolError::MethodNotSupported(format!("{reference:?} is not a request")))?;

        // Registered before sending so a fast reply cannot slip past.
        let (_guard, rx) = self.pending.register(id, expects);

        // One deadline covers both the send and the reply.
        let exchange = async {
            self.transport.send(message).await?;
            tracing::debug!(request_id = %id, ?reference, "Request sent");
            rx.await.map_err(|_| ProtocolError::Transport("response sender dropped".into()))
        };
        let value = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(request_id = %id, timeout_secs = self.timeout.as_secs(), "Request timed out");
                return Err(ProtocolError::MethodTimedOut);
            }
        };
        serde_json::from_value(value)
            .map_err(|e| ProtocolError::from(WebAuthnError::MalformedData(format!("invalid response: {e}"))))
    }
}

fn encode_request<P: Serialize>(request: RequestMessage<P>) -> Result<(Uuid, MessageReference, Value), ProtocolError> {
    let message = serde_json::to_value(&request).map_err(|e| WebAuthnError::Encoding(e.to_string()))?;
    Ok((request.id, request.reference, message))
}

fn into_result<R>(response: ResponseMessage<R>) -> Result<Option<R>, ProtocolError> {
    match response.error {
        Some(error) => Err(ProtocolError::from_payload(error)),
        None => Ok(response.result),
    }
}

/// Feeds inbound messages to `manager` until the channel closes.
pub async fn run_response_listener(manager: Arc<WebAuthnMessageManager>, mut incoming: mpsc::Receiver<Value>) {
    tracing::info!("Response listener running");
    while let Some(message) = incoming.recv().await {
        manager.deliver(message);
    }
    tracing::info!("Response listener exiting (incoming channel closed)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webauthn::native::PublicKeyCredentialDescriptor;

    fn client_info() -> ClientInfo {
        ClientInfo {
            app_name: "Example".into(),
            description: None,
            host: "example.com".into(),
            icon_url: None,
            origin: "https://example.com".into(),
        }
    }

    fn request_options() -> PublicKeyCredentialRequestOptions {
        PublicKeyCredentialRequestOptions {
            challenge: vec![1, 2, 3],
            timeout: None,
            rp_id: None,
            allow_credentials: vec![PublicKeyCredentialDescriptor::public_key(vec![7; 16])],
            user_verification: None,
        }
    }

    fn manager(timeout: Duration) -> (Arc<WebAuthnMessageManager>, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(8);
        let manager = WebAuthnMessageManager::new(Arc::new(tx)).with_timeout(timeout);
        (Arc::new(manager), rx)
    }

    fn request_id(message: &Value) -> Uuid {
        serde_json::from_value(message["id"].clone()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_options_is_malformed_request() {
        let (manager, mut rx) = manager(Duration::from_secs(1));
        let err = manager.authenticate(client_info(), None).await.unwrap_err();
        assert_eq!(err.code(), 4200);
        let err = manager.register(client_info(), None).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedRequest(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_pending_and_drops_late_reply() {
        let (manager, mut rx) = manager(Duration::from_secs(5));
        let err = manager.authenticate(client_info(), Some(&request_options())).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MethodTimedOut));
        assert_eq!(manager.pending_count(), 0);

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent["reference"], "webauthn-authenticate-request");
        let late = ResponseMessage::<AuthenticateResult>::ok(
            request_id(&sent),
            MessageReference::AuthenticateResponse,
            None,
        );
        assert!(!manager.deliver(serde_json::to_value(late).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_transport_times_out() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.try_send(serde_json::json!({ "queued": true })).unwrap();
        let manager = WebAuthnMessageManager::new(Arc::new(tx)).with_timeout(Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let err = manager.authenticate(client_info(), Some(&request_options())).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MethodTimedOut));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(manager.pending_count(), 0);

        // Only the message queued beforehand ever made it in.
        assert_eq!(rx.recv().await.unwrap()["queued"], true);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_error_reply_maps_to_protocol_error() {
        let (manager, mut rx) = manager(Duration::from_secs(5));
        let responder = manager.clone();
        tokio::spawn(async move {
            let sent = rx.recv().await.unwrap();
            let reply = ResponseMessage::<AuthenticateResult>::err(
                request_id(&sent),
                MessageReference::AuthenticateResponse,
                ProtocolError::InvalidPasskey("no passkey for rp".into()).to_payload(),
            );
            assert!(responder.deliver(serde_json::to_value(reply).unwrap()));
        });

        let err = manager.authenticate(client_info(), Some(&request_options())).await.unwrap_err();
        assert_eq!(err.code(), 4400);
        assert_eq!(manager.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_is_none() {
        let (manager, mut rx) = manager(Duration::from_secs(5));
        let responder = manager.clone();
        tokio::spawn(async move {
            let sent = rx.recv().await.unwrap();
            let reply = ResponseMessage::<AuthenticateResult>::ok(
                request_id(&sent),
                MessageReference::AuthenticateResponse,
                None,
            );
            responder.deliver(serde_json::to_value(reply).unwrap());
        });
        assert!(manager.authenticate(client_info(), Some(&request_options())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_reference_not_delivered() {
        let (manager, mut rx) = manager(Duration::from_millis(50));
        let responder = manager.clone();
        let checker = tokio::spawn(async move {
            let sent = rx.recv().await.unwrap();
            let reply = ResponseMessage::<RegisterResult>::ok(
                request_id(&sent),
                MessageReference::RegisterResponse,
                None,
            );
            responder.deliver(serde_json::to_value(reply).unwrap())
        });
        let err = manager.authenticate(client_info(), Some(&request_options())).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MethodTimedOut));
        assert!(!checker.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_transport() {
        let (manager, rx) = manager(Duration::from_secs(5));
        drop(rx);
        let err = manager.authenticate(client_info(), Some(&request_options())).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(_)));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_deliver_ignores_non_response() {
        let (manager, _rx) = manager(Duration::from_secs(1));
        assert!(!manager.deliver(serde_json::json!({"hello": "world"})));
    }
}
