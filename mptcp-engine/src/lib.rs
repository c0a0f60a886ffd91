#![forbid(unsafe_code)]

//! MPTCP option-rewriting and state-tracking engine.
//!
//! This crate fills in and verifies the cryptographic and stateful fields of
//! MPTCP TCP options (MP_CAPABLE, MP_JOIN, DSS) on behalf of a scripted
//! network-stack testing tool. It does not implement MPTCP itself: data
//! forwarding, subflow teardown, and validation of the kernel's own HMAC are
//! all out of scope. See `packet` for the boundary this crate expects its
//! host to provide.

pub mod bindings;
pub mod crypto;
pub mod error;
pub mod options;
pub mod packet;
pub mod rand;
pub mod session;
pub mod subflow;

pub use bindings::{Binding, BindingStore, BindingValue, Source, Subtype};
pub use error::{EngineError, Result};
pub use options::process;
pub use packet::{Direction, FourTuple, PacketView, RawOption, TcpOptionView};
pub use rand::{RngSource, ThreadRng};
pub use session::{KeySlot, SessionState};
pub use subflow::{Subflow, SubflowTable};

/// Tunables for the engine that have no natural home on any single
/// component. Constructed once per session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on the number of names the binding store will queue
    /// before `enqueue` starts returning `EngineError::ResourceError`.
    /// `None` means unbounded, matching a test harness that never needs
    /// back-pressure.
    pub max_pending_vars: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_pending_vars: None }
    }
}

/// Everything the engine owns for one MPTCP connection under test.
#[derive(Debug)]
pub struct Session<R: RngSource> {
    pub state: SessionState,
    pub subflows: SubflowTable,
    pub vars: BindingStore,
    pub rng: R,
}

impl<R: RngSource> Session<R> {
    pub fn new(rng: R, config: EngineConfig) -> Self {
        tracing::debug!(max_pending_vars = ?config.max_pending_vars, "creating mptcp session");
        Self {
            state: SessionState::default(),
            subflows: SubflowTable::default(),
            vars: BindingStore::new(config.max_pending_vars),
            rng,
        }
    }
}

impl Session<ThreadRng> {
    /// Convenience constructor for hosts that don't need a deterministic RNG.
    pub fn with_default_rng(config: EngineConfig) -> Self {
        Self::new(ThreadRng::default(), config)
    }
}

impl<R: RngSource> Session<R> {
    /// Rewrites every MPTCP option on `pkt`, the script-derived packet about
    /// to cross the tool/kernel boundary in `direction`.
    ///
    /// `live_pkt` is the packet actually captured off the wire, used to read
    /// fields the kernel generated that the script never specified (a peer's
    /// key, nonce, or address-id). `live_pkt` is the same packet as `pkt`
    /// for `Direction::Inbound` and the kernel's reply for
    /// `Direction::Outbound`.
    pub fn process_packet(
        &mut self,
        pkt: &mut impl PacketView,
        live_pkt: Option<&impl PacketView>,
        direction: Direction,
    ) -> Result<()> {
        options::process(self, pkt, live_pkt, direction)
    }
}
