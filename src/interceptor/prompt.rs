use crate::messaging::ClientInfo;
use crate::messaging::ProtocolError;
use crate::webauthn::native::{PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions};

/// Text the UI host shows when asking the user to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub description: String,
}

/// Shown after a failed round trip. Only the code and a fixed description,
/// never the error's own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub code: u16,
    pub title: String,
    pub description: String,
}

fn site(client: &ClientInfo, rp_id: Option<&str>) -> String {
    let rp_id = rp_id.unwrap_or(&client.host);
    if client.app_name.is_empty() {
        rp_id.to_string()
    } else {
        format!("{} ({rp_id})", client.app_name)
    }
}

pub(crate) fn register_prompt(client: &ClientInfo, options: &PublicKeyCredentialCreationOptions) -> Prompt {
    let site = site(client, options.rp.id.as_deref());
    let account = if options.user.display_name.is_empty() {
        options.user.name.as_str()
    } else {
        options.user.display_name.as_str()
    };
    Prompt {
        title: "passbridge".to_string(),
        description: format!(
            "Register new passkey\n\nSite: {site}\nUser: {account}\n\nConfirm to create it with your wallet account, or Cancel to deny."
        ),
    }
}

pub(crate) fn authenticate_prompt(client: &ClientInfo, options: &PublicKeyCredentialRequestOptions) -> Prompt {
    let site = site(client, options.rp_id.as_deref());
    Prompt {
        title: "passbridge".to_string(),
        description: format!("Sign in with passkey\n\nSite: {site}\n\nConfirm to sign in, or Cancel to deny."),
    }
}

pub(crate) fn error_notification(err: &ProtocolError) -> Notification {
    let code = err.code();
    let description = match code {
        4001 => "The request was canceled.",
        4002 => "The wallet did not answer in time.",
        4003 => "This request is not supported.",
        4200 => "The site sent an invalid request.",
        4300 => "Passkeys are not enabled in the wallet.",
        4400 => "No passkey for this site was found.",
        4401 => "The account key could not be unlocked.",
        4402 => "A passkey for this account is already registered with this site.",
        4500..=4599 => "The passkey data could not be processed.",
        _ => "Something went wrong.",
    };
    Notification {
        code,
        title: "Passkey request failed".to_string(),
        description: format!("{description} Falling back to the browser."),
    }
}
