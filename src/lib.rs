pub mod background;
pub mod config;
pub mod demo;
pub mod encoding;
pub mod error;
pub mod interceptor;
pub mod messaging;
pub mod store;
pub mod vault;
pub mod webauthn;

pub use error::{Error, Result};

use webauthn::authenticator_data::{AuthenticatorData, FLAG_AT, FLAG_BE, FLAG_BS, FLAG_ED, FLAG_UP, FLAG_UV};
use webauthn::CosePublicKey;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Accepts standard or URL-safe base64, padded or not.
fn decode_input(data: &str) -> Result<Vec<u8>> {
    match encoding::from_base64(data) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(encoding::from_base64url(data)?),
    }
}

/// Human-readable dump of an authenticatorData blob.
pub fn describe_auth_data(data: &str) -> Result<String> {
    let auth_data = AuthenticatorData::parse(&decode_input(data)?)?;

    let names: Vec<&str> = [
        (FLAG_UP, "UP"),
        (FLAG_UV, "UV"),
        (FLAG_BE, "BE"),
        (FLAG_BS, "BS"),
        (FLAG_AT, "AT"),
        (FLAG_ED, "ED"),
    ]
    .into_iter()
    .filter(|(flag, _)| auth_data.has_flag(*flag))
    .map(|(_, name)| name)
    .collect();

    let mut lines = vec![
        format!("rpIdHash:     {}", hex(&auth_data.rp_id_hash)),
        format!("flags:        {:#04x} [{}]", auth_data.flags, names.join(" ")),
        format!("signCount:    {}", auth_data.sign_count),
    ];
    if let Some(attested) = &auth_data.attested_credential_data {
        let aaguid = encoding::uuid_from_bytes(&attested.aaguid)
            .map(|u| u.to_string())
            .unwrap_or_else(|| hex(&attested.aaguid));
        lines.push(format!("aaguid:       {aaguid}"));
        lines.push(format!("credentialId: {}", hex(&attested.credential_id)));
        let key = attested.public_key()?;
        lines.push(format!("algorithm:    {} ({})", key.algorithm(), key.algorithm().id()));
    }
    Ok(lines.join("\n"))
}

/// Human-readable dump of a CBOR COSE_Key.
pub fn describe_cose_key(data: &str) -> Result<String> {
    let key = CosePublicKey::from_cbor(&decode_input(data)?)?;
    Ok([
        format!("algorithm: {} ({})", key.algorithm(), key.algorithm().id()),
        format!("curve:     {}", key.curve()),
        format!("keyType:   {}", key.key_type()),
        format!("publicKey: {}", hex(key.public_key())),
    ]
    .join("\n"))
}

pub async fn run(cfg: config::Config) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    let level = match cfg.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();

    match cfg.command {
        config::Command::DecodeAuthData { data } => println!("{}", describe_auth_data(&data)?),
        config::Command::DecodeCoseKey { data } => println!("{}", describe_cose_key(&data)?),
        config::Command::Demo { origin, algorithm } => {
            tracing::info!(%origin, ?algorithm, "Running in-process demo");
            let report = demo::run_demo(&origin, algorithm.into()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
