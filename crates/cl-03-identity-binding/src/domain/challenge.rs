//! # Challenge Store
//!
//! One live challenge per address. Issuing again overwrites the previous
//! nonce. Consumption is a check-and-delete under a single lock, so two
//! concurrent verifications of the same nonce cannot both succeed.
//!
//! Expired challenges for addresses that never come back are swept by
//! `issue`, at most once per [`GC_INTERVAL_SECS`].

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::Serialize;
use shared_types::Address;
use std::collections::HashMap;

/// Nonce length in characters.
pub const NONCE_LEN: usize = 32;

/// Default challenge lifetime in seconds.
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 300;

/// Minimum spacing between sweeps of expired challenges.
pub const GC_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
    pub address: Address,
    pub nonce: String,
    pub issued_at: u64,
    pub ttl_secs: u64,
}

impl Challenge {
    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.ttl_secs)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at()
    }
}

/// 32 characters from `[A-Za-z0-9]`, drawn from the OS RNG.
pub fn generate_nonce() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Default)]
struct Entries {
    by_address: HashMap<Address, Challenge>,
    last_gc: u64,
}

impl Entries {
    fn garbage_collect(&mut self, now: u64) {
        self.by_address.retain(|_, c| !c.is_expired(now));
        self.last_gc = now;
    }
}

#[derive(Debug, Default)]
pub struct ChallengeStore {
    entries: Mutex<Entries>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, address: Address, nonce: String, now: u64, ttl_secs: u64) -> Challenge {
        let challenge = Challenge {
            address,
            nonce,
            issued_at: now,
            ttl_secs,
        };
        let mut entries = self.entries.lock();
        if now.saturating_sub(entries.last_gc) >= GC_INTERVAL_SECS {
            entries.garbage_collect(now);
        }
        entries.by_address.insert(address, challenge.clone());
        challenge
    }

    /// The live challenge for `address`. Expired entries are dropped.
    pub fn live(&self, address: &Address, now: u64) -> Option<Challenge> {
        let mut entries = self.entries.lock();
        match entries.by_address.get(address) {
            Some(c) if c.is_expired(now) => {
                entries.by_address.remove(address);
                None
            }
            Some(c) => Some(c.clone()),
            None => None,
        }
    }

    /// Removes the challenge only if it is still live and still carries
    /// `nonce`. Returns whether this call consumed it.
    pub fn consume(&self, address: &Address, nonce: &str, now: u64) -> bool {
        let mut entries = self.entries.lock();
        let matches = entries
            .by_address
            .get(address)
            .map(|c| c.nonce == nonce && !c.is_expired(now))
            .unwrap_or(false);
        if matches {
            entries.by_address.remove(address);
        }
        matches
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
