//! WebAuthn wire formats and credential synthesis.

pub mod attestation;
pub mod authenticator_data;
pub mod client_data;
pub mod cose;
pub mod credential;
pub mod key_pair;
pub mod native;
pub mod serialized;
pub mod types;

pub use cose::CosePublicKey;
pub use credential::PublicKeyCredentialFactory;
pub use key_pair::KeyPair;
pub use types::{CoseAlgorithm, WebAuthnError};
