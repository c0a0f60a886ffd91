//! The MP_CAPABLE subroutine: key exchange and handshake finalization.

use crate::bindings::{BindingStore, Source, Subtype};
use crate::error::{EngineError, Result};
use crate::options::layout::{self, CAPABLE, CAPABLE_SYN};
use crate::packet::{Direction, FourTuple, RawOption, TcpOptionView};
use crate::rand::RngSource;
use crate::session::{KeySlot, SessionState};
use crate::subflow::SubflowTable;

/// `gen_local_key_if_unset` (§4.E.1): a script-defined key always wins; only
/// absent a script binding does the engine draw a random key of its own.
///
/// Idempotent: a second call with `local_key` already set returns
/// immediately, before touching the pending-name queue at all — so calling
/// this twice never consumes a second name for the same key.
fn gen_local_key_if_unset(
    session: &mut SessionState,
    vars: &mut BindingStore,
    rng: &mut impl RngSource,
) -> Result<()> {
    if session.local_key().is_some() {
        return Ok(());
    }
    let name = vars
        .pop()
        .ok_or_else(|| EngineError::state("gen_local_key_if_unset: no pending variable name to bind a key to"))?;
    if let Some(binding) = vars.lookup(&name) {
        if binding.subtype == Subtype::MpCapable && binding.source == Source::Script {
            let key = binding.as_u64(session)?;
            session.set_local_key(key);
            return Ok(());
        }
    }
    let key = rng.rand_u64();
    session.set_local_key(key);
    vars.bind_key_ref(&name, Subtype::MpCapable, KeySlot::Local);
    tracing::debug!(key = format_args!("{key:#x}"), "drew local MP_CAPABLE key");
    Ok(())
}

/// `extract_peer_key` (§4.E.1): same script-override precedence, but the
/// fallback is the observed key from the live kernel option rather than a
/// fresh draw. Idempotent for the same reason as `gen_local_key_if_unset`.
fn extract_peer_key(session: &mut SessionState, vars: &mut BindingStore, observed: u64) -> Result<()> {
    if session.peer_key().is_some() {
        return Ok(());
    }
    let Some(name) = vars.pop() else {
        session.set_peer_key(observed);
        return Ok(());
    };
    if let Some(binding) = vars.lookup(&name) {
        if binding.subtype == Subtype::MpCapable && binding.source == Source::Script {
            let key = binding.as_u64(session)?;
            session.set_peer_key(key);
            return Ok(());
        }
    }
    session.set_peer_key(observed);
    vars.bind_key_ref(&name, Subtype::MpCapable, KeySlot::Peer);
    Ok(())
}

/// Dispatch table for MP_CAPABLE, keyed on option length, SYN/ACK flags,
/// and direction.
#[allow(clippy::too_many_arguments)]
pub fn process(
    opt: &mut TcpOptionView,
    live_opt: Option<&RawOption>,
    direction: Direction,
    syn: bool,
    ack: bool,
    tuple: FourTuple,
    session: &mut SessionState,
    subflows: &mut SubflowTable,
    vars: &mut BindingStore,
    rng: &mut impl RngSource,
) -> Result<()> {
    match (opt.len(), syn, ack, direction) {
        (CAPABLE_SYN, true, _, Direction::Inbound) => {
            gen_local_key_if_unset(session, vars, rng)?;
            let key = session
                .local_key()
                .ok_or_else(|| EngineError::state("local key still unset after gen_local_key_if_unset"))?;
            layout::write_u64(opt.bytes, 4, key)
        }
        (CAPABLE_SYN, true, false, Direction::Outbound) => {
            let live = live_opt
                .ok_or_else(|| EngineError::option("outbound MP_CAPABLE SYN has no live packet to read"))?;
            layout::require_len(&live.bytes, CAPABLE_SYN, "outbound MP_CAPABLE SYN")?;
            let observed = layout::read_u64(&live.bytes, 4)?;
            extract_peer_key(session, vars, observed)?;
            let key = session
                .local_key()
                .ok_or_else(|| EngineError::state("local key unset while writing outbound MP_CAPABLE SYN"))?;
            layout::write_u64(opt.bytes, 4, key)
        }
        (CAPABLE, false, true, Direction::Inbound) => {
            let (local, peer) = finalize_capable(session)?;
            layout::write_u64(opt.bytes, 4, local)?;
            layout::write_u64(opt.bytes, 12, peer)?;
            session.initial_dsn()?;
            // The primary subflow never authenticates via MP_JOIN, but
            // `create_inbound` still hands it a nonce and address-id so it
            // shares one shape with subflows created later.
            let local_rand = rng.rand_u32();
            let local_addr_id = session.next_local_addr_id();
            subflows.create_inbound(tuple, local_rand, local_addr_id);
            Ok(())
        }
        (CAPABLE, false, true, Direction::Outbound) => {
            let (local, peer) = finalize_capable(session)?;
            layout::write_u64(opt.bytes, 4, local)?;
            layout::write_u64(opt.bytes, 12, peer)?;
            session.initial_dsn()?;
            // No MP_JOIN SYN exists to extract a peer nonce/address-id from
            // for the primary subflow; they're not applicable here and are
            // left unset (`create_outbound`'s own fields stay `None`).
            subflows.create_outbound(tuple, None, None);
            Ok(())
        }
        (len, syn, ack, dir) => Err(EngineError::option(format!(
            "unrecognized MP_CAPABLE case: len={len}, syn={syn}, ack={ack}, direction={dir:?}"
        ))),
    }
}

fn finalize_capable(session: &SessionState) -> Result<(u64, u64)> {
    let local = session.local_key().ok_or_else(|| EngineError::state("local key unset at MP_CAPABLE ACK"))?;
    let peer = session.peer_key().ok_or_else(|| EngineError::state("peer key unset at MP_CAPABLE ACK"))?;
    Ok((local, peer))
}
