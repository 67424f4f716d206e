//! Signing keys held by this process, looked up by account address.

use crate::ecdsa::SigningAccount;
use crate::CryptoError;
use parking_lot::RwLock;
use shared_types::Address;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Keyring {
    accounts: RwLock<HashMap<Address, Arc<SigningAccount>>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a keyring from hex-encoded secret keys.
    pub fn from_hex_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self, CryptoError> {
        let ring = Self::new();
        for key in keys {
            ring.insert(SigningAccount::from_hex(key.as_ref())?);
        }
        Ok(ring)
    }

    /// Adds an account, returning its address.
    pub fn insert(&self, account: SigningAccount) -> Address {
        let address = account.address();
        self.accounts.write().insert(address, Arc::new(account));
        address
    }

    pub fn get(&self, address: &Address) -> Option<Arc<SigningAccount>> {
        self.accounts.read().get(address).cloned()
    }

    pub fn addresses(&self) -> Vec<Address> {
        let mut out: Vec<_> = self.accounts.read().keys().copied().collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}
