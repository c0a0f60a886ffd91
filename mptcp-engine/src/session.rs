//! Component C: session state. A pure data holder for the one pair of keys
//! and the values derived from them exactly once.

use crate::crypto::idsn64;
use crate::error::{EngineError, Result};

/// Which key slot a binding refers to: a binding never back-points into
/// `SessionState` directly, it tags which slot and dereferences through
/// the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    Local,
    Peer,
}

/// One MPTCP connection's session-level state: the two 64-bit keys, the
/// values derived from them, and the address-ID counter handed out to new
/// subflows.
///
/// Invariant: once `local_key`/`peer_key` is set it is immutable for the
/// rest of the connection — the setters are idempotent no-ops on a second
/// call. `initial_dsn`/`initial_dack` are derived exactly once, at the
/// first point both keys are known.
#[derive(Debug, Default)]
pub struct SessionState {
    local_key: Option<u64>,
    peer_key: Option<u64>,
    initial_dsn: Option<u64>,
    initial_dack: Option<u64>,
    next_local_addr_id: u8,
}

impl SessionState {
    pub fn local_key(&self) -> Option<u64> {
        self.local_key
    }

    pub fn peer_key(&self) -> Option<u64> {
        self.peer_key
    }

    pub fn key(&self, slot: KeySlot) -> Option<u64> {
        match slot {
            KeySlot::Local => self.local_key,
            KeySlot::Peer => self.peer_key,
        }
    }

    /// Idempotent: a second call with any value is a no-op once set.
    pub fn set_local_key(&mut self, key: u64) {
        if self.local_key.is_none() {
            self.local_key = Some(key);
            tracing::debug!(local_key = format_args!("{key:#x}"), "local key set");
        }
        self.maybe_derive();
    }

    /// Idempotent: a second call with any value is a no-op once set.
    pub fn set_peer_key(&mut self, key: u64) {
        if self.peer_key.is_none() {
            self.peer_key = Some(key);
            tracing::debug!(peer_key = format_args!("{key:#x}"), "peer key set");
        }
        self.maybe_derive();
    }

    fn maybe_derive(&mut self) {
        let (Some(local), Some(peer)) = (self.local_key, self.peer_key) else {
            return;
        };
        if self.initial_dsn.is_none() {
            self.initial_dsn = Some(idsn64(local));
        }
        if self.initial_dack.is_none() {
            self.initial_dack = Some(idsn64(peer));
        }
    }

    /// Errors with `StateError` if consulted before both keys are set.
    pub fn initial_dsn(&self) -> Result<u64> {
        self.initial_dsn
            .ok_or_else(|| EngineError::state("initial_dsn read before both session keys are known"))
    }

    /// Errors with `StateError` if consulted before both keys are set.
    pub fn initial_dack(&self) -> Result<u64> {
        self.initial_dack
            .ok_or_else(|| EngineError::state("initial_dack read before both session keys are known"))
    }

    /// Hands out the next local address-ID and advances the counter.
    pub fn next_local_addr_id(&mut self) -> u8 {
        let id = self.next_local_addr_id;
        self.next_local_addr_id = self.next_local_addr_id.wrapping_add(1);
        id
    }
}
