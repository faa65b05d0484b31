use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::webauthn::CoseAlgorithm;

/// Written into every attested credential block in place of a hardware model id.
pub const AAGUID: [u8; 16] = [
    0x9b, 0x2c, 0x41, 0x7e, 0x5d, 0x03, 0x4a, 0x1f, 0xa6, 0x58, 0x0e, 0xc7, 0x31, 0xb4, 0x62, 0xd9,
];

/// Upper bound for one request/response round trip with the privileged context.
pub const UPPER_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "passbridge", version, about)]
pub struct Config {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Decode a base64 authenticatorData blob.
    DecodeAuthData { data: String },
    /// Decode a base64 CBOR COSE_Key.
    DecodeCoseKey { data: String },
    /// Register and then authenticate a passkey in-process, printing both credentials.
    Demo {
        #[arg(long, default_value = "https://demo.passbridge.dev")]
        origin: String,
        #[arg(long, value_enum, default_value_t = DemoAlgorithm::Ed25519)]
        algorithm: DemoAlgorithm,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoAlgorithm {
    Ed25519,
    Es256,
}

impl From<DemoAlgorithm> for CoseAlgorithm {
    fn from(alg: DemoAlgorithm) -> Self {
        match alg {
            DemoAlgorithm::Ed25519 => CoseAlgorithm::Ed25519,
            DemoAlgorithm::Es256   => CoseAlgorithm::Es256,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Light,
    Dark,
}

/// Extension-wide settings the page-side interceptor observes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub is_initialized: bool,
    pub debug: bool,
    pub theme: ColorMode,
}

/// Sole writer of [`ProviderConfig`]; everyone else holds a receiver.
#[derive(Debug)]
pub struct ConfigManager {
    tx: watch::Sender<ProviderConfig>,
}

impl ConfigManager {
    pub fn new(initial: ProviderConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProviderConfig> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ProviderConfig {
        self.tx.borrow().clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut ProviderConfig)) {
        self.tx.send_modify(apply);
        tracing::debug!(config = ?*self.tx.borrow(), "Provider config updated");
    }
}
