use std::collections::HashMap;

use uuid::Uuid;

use super::{Account, AccountPasskey, StoreError};

/// In-memory index of wallet accounts and the passkeys bound to them.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
    passkeys: HashMap<Uuid, (String, AccountPasskey)>,
    by_rp: HashMap<String, Vec<Uuid>>,
    active: Option<String>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account. The first account added becomes the active one.
    pub fn add_account(&mut self, account: Account) {
        if self.active.is_none() {
            self.active = Some(account.address.clone());
        }
        self.accounts.insert(account.address.clone(), account);
    }

    pub fn set_active(&mut self, address: &str) -> Result<(), StoreError> {
        if !self.accounts.contains_key(address) {
            return Err(StoreError::AccountNotFound(address.to_string()));
        }
        self.active = Some(address.to_string());
        Ok(())
    }

    pub fn active_account(&self) -> Option<&Account> {
        self.active.as_ref().and_then(|a| self.accounts.get(a))
    }

    pub fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Bind a new passkey to `address` and index it by rp id.
    pub fn add_passkey(&mut self, address: &str, passkey: AccountPasskey) -> Result<(), StoreError> {
        if !self.accounts.contains_key(address) {
            return Err(StoreError::AccountNotFound(address.to_string()));
        }
        let id = parse_id(&passkey.id)?;
        if self.passkeys.contains_key(&id) {
            return Err(StoreError::Duplicate(passkey.id));
        }
        self.by_rp.entry(passkey.rp.id.clone()).or_default().push(id);
        self.passkeys.insert(id, (address.to_string(), passkey));
        Ok(())
    }

    /// Look up by credential id (the passkey UUID's raw bytes).
    pub fn get_by_credential_id(&self, credential_id: &[u8]) -> Option<(&Account, &AccountPasskey)> {
        let id = Uuid::from_slice(credential_id).ok()?;
        self.get(&id)
    }

    pub fn get(&self, id: &Uuid) -> Option<(&Account, &AccountPasskey)> {
        let (address, passkey) = self.passkeys.get(id)?;
        Some((self.accounts.get(address)?, passkey))
    }

    /// All passkeys for an rp id, most recently used first.
    pub fn get_by_rp_id(&self, rp_id: &str) -> Vec<(&Account, &AccountPasskey)> {
        let Some(ids) = self.by_rp.get(rp_id) else {
            return Vec::new();
        };
        let mut found: Vec<(&Account, &AccountPasskey)> =
            ids.iter().filter_map(|id| self.get(id)).collect();
        found.sort_by_key(|(_, p)| std::cmp::Reverse(p.last_used_millis()));
        found
    }

    pub fn passkeys_for_account(&self, address: &str) -> Vec<&AccountPasskey> {
        self.passkeys
            .values()
            .filter(|(owner, _)| owner == address)
            .map(|(_, p)| p)
            .collect()
    }

    /// Record a successful authentication.
    pub fn touch_passkey(&mut self, id: &Uuid) -> Result<(), StoreError> {
        let (_, passkey) = self
            .passkeys
            .get_mut(id)
            .ok_or_else(|| StoreError::PasskeyNotFound(id.to_string()))?;
        passkey.mark_used();
        Ok(())
    }

    pub fn remove_passkey(&mut self, id: &Uuid) -> bool {
        let Some((_, passkey)) = self.passkeys.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_rp.get_mut(&passkey.rp.id) {
            ids.retain(|i| i != id);
            if ids.is_empty() {
                self.by_rp.remove(&passkey.rp.id);
            }
        }
        true
    }

    pub fn passkey_count(&self) -> usize {
        self.passkeys.len()
    }
}

fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}
