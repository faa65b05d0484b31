pub mod account;
pub mod index;
pub mod passkey;

pub use account::{Account, AccountInformation};
pub use index::AccountStore;
pub use passkey::{AccountPasskey, PasskeyRelyingParty, PasskeyUser};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("passkey not found: {0}")]
    PasskeyNotFound(String),
    #[error("duplicate passkey: {0}")]
    Duplicate(String),
    #[error("invalid passkey id: {0}")]
    InvalidId(String),
}
