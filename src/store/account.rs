use serde::{Deserialize, Serialize};

use crate::encoding::to_base64;

/// A wallet account. `public_key` is the account's raw Ed25519 public key,
/// the handle under which its private key is sealed in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: String,
    pub name: Option<String>,
    pub public_key: Vec<u8>,
}

/// What the page learns about the account that answered a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformation {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub public_key: String,
}

impl From<&Account> for AccountInformation {
    fn from(account: &Account) -> Self {
        Self {
            address: account.address.clone(),
            name: account.name.clone(),
            public_key: to_base64(&account.public_key),
        }
    }
}
