//! Component A: the variable-binding store.
//!
//! The script parser cannot know the numeric value behind a symbolic name
//! at parse time — it only knows a key is expected. It emits the name into
//! a FIFO (`enqueue`); the first packet whose option needs a key drains a
//! name (`pop`) and binds it. A plain hash map from owned name to owned
//! binding backs a bounded FIFO where `peek` and `pop` are kept distinct —
//! peek when an option may or may not consume the name, pop when it
//! definitely does.

use std::collections::{HashMap, VecDeque};

use crate::error::{EngineError, Result};
use crate::session::{KeySlot, SessionState};

/// The MPTCP option subtype a binding's value belongs to. Only
/// `MpCapable` is produced today; the tag exists so a future binding kind
/// doesn't have to change the store's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtype {
    MpCapable,
}

/// Where a binding's value came from, for the tie-break rule:
/// a script-defined value always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Script,
    Engine,
}

/// A binding's value: either bytes the script supplied directly, or a tag
/// saying which session key slot to read. Never a back-pointer into
/// `SessionState` — dereferencing always goes through the session, since a
/// binding can be created before the key slot it names is ever set.
#[derive(Debug, Clone)]
pub enum BindingValue {
    Owned(Vec<u8>),
    SessionKeyRef(KeySlot),
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub subtype: Subtype,
    pub value: BindingValue,
    pub source: Source,
}

impl Binding {
    /// Reads this binding's value as a `u64`, dereferencing a
    /// `SessionKeyRef` through `session` and big-endian-decoding an
    /// `Owned` buffer of exactly 8 bytes.
    pub fn as_u64(&self, session: &SessionState) -> Result<u64> {
        match &self.value {
            BindingValue::SessionKeyRef(slot) => session
                .key(*slot)
                .ok_or_else(|| EngineError::state("binding references an unset session key slot")),
            BindingValue::Owned(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| EngineError::state("script-defined key binding is not 8 bytes"))?;
                Ok(u64::from_be_bytes(arr))
            }
        }
    }
}

/// The FIFO of pending names plus the name → binding map.
#[derive(Debug, Default)]
pub struct BindingStore {
    vars_pending: VecDeque<String>,
    vars: HashMap<String, Binding>,
    max_pending: Option<usize>,
}

impl BindingStore {
    pub fn new(max_pending: Option<usize>) -> Self {
        Self { vars_pending: VecDeque::new(), vars: HashMap::new(), max_pending }
    }

    /// Pushes a copy of `name` onto the pending queue. Fails with
    /// `ResourceError` if the store is bounded and already at capacity.
    pub fn enqueue(&mut self, name: &str) -> Result<()> {
        if let Some(max) = self.max_pending {
            if self.vars_pending.len() >= max {
                return Err(EngineError::resource(format!(
                    "pending variable queue is full (capacity {max})"
                )));
            }
        }
        tracing::debug!(name, "enqueued pending mptcp variable");
        self.vars_pending.push_back(name.to_string());
        Ok(())
    }

    /// Returns the front of the queue without removing it.
    pub fn peek(&self) -> Option<&str> {
        self.vars_pending.front().map(String::as_str)
    }

    /// Dequeues and returns the front name.
    pub fn pop(&mut self) -> Option<String> {
        self.vars_pending.pop_front()
    }

    /// Inserts a binding whose value is a reference into session state.
    pub fn bind_key_ref(&mut self, name: &str, subtype: Subtype, slot: KeySlot) {
        tracing::debug!(name, ?slot, "binding name to session key slot");
        self.vars.insert(
            name.to_string(),
            Binding { subtype, value: BindingValue::SessionKeyRef(slot), source: Source::Engine },
        );
    }

    /// Inserts an owned binding supplied by the script.
    pub fn bind_script_value(&mut self, name: &str, subtype: Subtype, bytes: Vec<u8>) {
        tracing::debug!(name, "binding name to script-defined value");
        self.vars.insert(
            name.to_string(),
            Binding { subtype, value: BindingValue::Owned(bytes), source: Source::Script },
        );
    }

    /// Exact-match lookup.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.vars.get(name)
    }

    /// Convenience: pops the front name, looks it up, requires
    /// `subtype == MpCapable`, and returns the `u64` it points at.
    pub fn consume_next_key(&mut self, session: &SessionState) -> Result<u64> {
        let name = self
            .pop()
            .ok_or_else(|| EngineError::state("consume_next_key called with no pending name"))?;
        let binding = self
            .lookup(&name)
            .ok_or_else(|| EngineError::state(format!("no binding for pending name '{name}'")))?;
        if binding.subtype != Subtype::MpCapable {
            return Err(EngineError::state(format!("binding for '{name}' is not MP_CAPABLE")));
        }
        binding.as_u64(session)
    }
}
