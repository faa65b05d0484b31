use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::AccountInformation;
use crate::webauthn::serialized::{
    SerializedAssertionCredential, SerializedAttestationCredential, SerializedCreationOptions,
    SerializedRequestOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageReference {
    #[serde(rename = "webauthn-register-request")]
    RegisterRequest,
    #[serde(rename = "webauthn-register-response")]
    RegisterResponse,
    #[serde(rename = "webauthn-authenticate-request")]
    AuthenticateRequest,
    #[serde(rename = "webauthn-authenticate-response")]
    AuthenticateResponse,
}

impl MessageReference {
    /// The reference a reply to this request carries.
    pub fn response(self) -> Option<Self> {
        match self {
            Self::RegisterRequest     => Some(Self::RegisterResponse),
            Self::AuthenticateRequest => Some(Self::AuthenticateResponse),
            Self::RegisterResponse | Self::AuthenticateResponse => None,
        }
    }
}

/// The page that issued the WebAuthn call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload<O> {
    pub client_info: ClientInfo,
    pub options: O,
}

pub type RegisterRequestPayload = RequestPayload<SerializedCreationOptions>;
pub type AuthenticateRequestPayload = RequestPayload<SerializedRequestOptions>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage<P> {
    pub id: Uuid,
    pub reference: MessageReference,
    pub payload: P,
}

impl<P> RequestMessage<P> {
    pub fn new(reference: MessageReference, payload: P) -> Self {
        Self { id: Uuid::new_v4(), reference, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage<R> {
    pub id: Uuid,
    #[serde(rename = "requestID")]
    pub request_id: Uuid,
    pub reference: MessageReference,
    pub error: Option<ErrorPayload>,
    pub result: Option<R>,
}

impl<R> ResponseMessage<R> {
    pub fn ok(request_id: Uuid, reference: MessageReference, result: Option<R>) -> Self {
        Self { id: Uuid::new_v4(), request_id, reference, error: None, result }
    }

    pub fn err(request_id: Uuid, reference: MessageReference, error: ErrorPayload) -> Self {
        Self { id: Uuid::new_v4(), request_id, reference, error: Some(error), result: None }
    }
}

/// Just enough of a response to route it to the waiting request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ResponseHeader {
    #[serde(rename = "requestID")]
    pub request_id: Uuid,
    pub reference: MessageReference,
}

/// Just enough of a request to dispatch it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct RequestHeader {
    pub id: Uuid,
    pub reference: MessageReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResult {
    pub account: AccountInformation,
    pub credential: SerializedAttestationCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResult {
    pub account: AccountInformation,
    pub credential: SerializedAssertionCredential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_wire_names() {
        assert_eq!(
            serde_json::to_value(MessageReference::RegisterRequest).unwrap(),
            "webauthn-register-request"
        );
        assert_eq!(
            serde_json::to_value(MessageReference::AuthenticateResponse).unwrap(),
            "webauthn-authenticate-response"
        );
        assert_eq!(
            MessageReference::RegisterRequest.response(),
            Some(MessageReference::RegisterResponse)
        );
        assert_eq!(MessageReference::RegisterResponse.response(), None);
    }

    #[test]
    fn test_response_envelope_shape() {
        let request_id = Uuid::new_v4();
        let msg: ResponseMessage<()> = ResponseMessage::err(
            request_id,
            MessageReference::RegisterResponse,
            ErrorPayload { code: 4300, message: "passkeys are not enabled".into() },
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["requestID"], json!(request_id.to_string()));
        assert_eq!(value["reference"], "webauthn-register-response");
        assert_eq!(value["error"]["code"], 4300);
        assert!(value["result"].is_null());

        let header: ResponseHeader = serde_json::from_value(value).unwrap();
        assert_eq!(header.request_id, request_id);
    }

    #[test]
    fn test_null_result_and_error_parse() {
        let value = json!({
            "id": Uuid::new_v4(),
            "requestID": Uuid::new_v4(),
            "reference": "webauthn-authenticate-response",
            "error": null,
            "result": null,
        });
        let msg: ResponseMessage<AuthenticateResult> = serde_json::from_value(value).unwrap();
        assert!(msg.error.is_none());
        assert!(msg.result.is_none());
    }
}
