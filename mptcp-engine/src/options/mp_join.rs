//! The MP_JOIN subroutine. Six cases dispatched on
//! `(direction, SYN, ACK, option length)`; any other combination is an
//! `OptionError`.

use crate::crypto::{hmac160, hmac64, token32};
use crate::error::{EngineError, Result};
use crate::options::layout::{self, JOIN_ACK, JOIN_SYN, JOIN_SYN_ACK};
use crate::packet::{Direction, FourTuple, RawOption, TcpOptionView};
use crate::rand::RngSource;
use crate::session::SessionState;
use crate::subflow::SubflowTable;

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
    rng: &mut impl RngSource,
) -> Result<()> {
    match (direction, syn, ack, opt.len()) {
        // Case 1: IN, SYN, !ACK, len=JOIN_SYN — open a new inbound subflow.
        (Direction::Inbound, true, false, JOIN_SYN) => {
            let peer_key = require_peer_key(session)?;
            let local_rand = rng.rand_u32();
            let local_addr_id = session.next_local_addr_id();
            subflows.create_inbound(tuple, local_rand, local_addr_id);
            let receiver_token = token32(peer_key);
            layout::write_u8(opt.bytes, 3, local_addr_id)?;
            layout::write_u32(opt.bytes, 4, receiver_token)?;
            layout::write_u32(opt.bytes, 8, local_rand)
        }

        // Case 2: OUT, SYN, ACK, len=JOIN_SYN_ACK — answer to a
        // tool-initiated join: absorb the kernel's nonce/address-id, write
        // a truncated HMAC authenticating the tool's side.
        (Direction::Outbound, true, true, JOIN_SYN_ACK) => {
            let live = live_opt
                .ok_or_else(|| EngineError::option("outbound MP_JOIN SYN/ACK has no live packet to read"))?;
            layout::require_len(&live.bytes, JOIN_SYN_ACK, "outbound MP_JOIN SYN/ACK")?;
            let peer_addr_id = layout::read_u8(&live.bytes, 3)?;
            let peer_rand = layout::read_u32(&live.bytes, 12)?;

            let subflow = subflows
                .find_by_outbound(&tuple)
                .ok_or_else(|| EngineError::state("no subflow matches outbound MP_JOIN SYN/ACK"))?;
            let local_rand = subflow
                .local_rand()
                .ok_or_else(|| EngineError::state("subflow has no local_rand for outbound MP_JOIN SYN/ACK"))?;

            let peer_key = require_peer_key(session)?;
            let local_key = require_local_key(session)?;
            let truncated = hmac64(peer_key, local_key, peer_rand, local_rand);

            layout::write_u8(opt.bytes, 3, peer_addr_id)?;
            layout::write_u64(opt.bytes, 4, truncated)?;
            layout::write_u32(opt.bytes, 12, peer_rand)
        }

        // Case 3: IN, ACK, !SYN, len=JOIN_ACK — tool's own join ACK.
        (Direction::Inbound, false, true, JOIN_ACK) => {
            let subflow = subflows
                .find_by_inbound(&tuple)
                .ok_or_else(|| EngineError::state("no subflow matches inbound MP_JOIN ACK"))?;
            let local_rand = subflow
                .local_rand()
                .ok_or_else(|| EngineError::state("subflow has no local_rand for inbound MP_JOIN ACK"))?;
            let peer_rand = subflow
                .peer_rand()
                .ok_or_else(|| EngineError::state("subflow has no peer_rand for inbound MP_JOIN ACK"))?;

            let local_key = require_local_key(session)?;
            let peer_key = require_peer_key(session)?;
            let tag = hmac160(local_key, peer_key, local_rand, peer_rand);
            layout::write_bytes(opt.bytes, 4, &tag)
        }

        // Case 4: OUT, SYN, !ACK, len=JOIN_SYN — the kernel opens a subflow.
        (Direction::Outbound, true, false, JOIN_SYN) => {
            let live = live_opt
                .ok_or_else(|| EngineError::option("outbound MP_JOIN SYN has no live packet to read"))?;
            layout::require_len(&live.bytes, JOIN_SYN, "outbound MP_JOIN SYN")?;
            let peer_addr_id = layout::read_u8(&live.bytes, 3)?;
            let peer_rand = layout::read_u32(&live.bytes, 8)?;

            subflows.create_outbound(tuple, Some(peer_rand), Some(peer_addr_id));

            let peer_key = require_peer_key(session)?;
            layout::write_u8(opt.bytes, 3, peer_addr_id)?;
            layout::write_u32(opt.bytes, 4, token32(peer_key))?;
            layout::write_u32(opt.bytes, 8, peer_rand)
        }

        // Case 5: IN, SYN, ACK, len=JOIN_SYN_ACK — tool answers a
        // kernel-initiated join with its own nonce/address-id and HMAC.
        (Direction::Inbound, true, true, JOIN_SYN_ACK) => {
            let local_rand = rng.rand_u32();
            let local_addr_id = session.next_local_addr_id();

            let subflow = subflows
                .find_by_inbound(&tuple)
                .ok_or_else(|| EngineError::state("no subflow matches inbound MP_JOIN SYN/ACK"))?;
            subflow.set_local_nonce(local_rand, local_addr_id);
            let local_rand = subflow
                .local_rand()
                .ok_or_else(|| EngineError::state("subflow has no local_rand for inbound MP_JOIN SYN/ACK"))?;
            let local_addr_id = subflow
                .local_addr_id()
                .ok_or_else(|| EngineError::state("subflow has no local_addr_id for inbound MP_JOIN SYN/ACK"))?;
            let peer_rand = subflow
                .peer_rand()
                .ok_or_else(|| EngineError::state("subflow has no peer_rand for inbound MP_JOIN SYN/ACK"))?;

            let local_key = require_local_key(session)?;
            let peer_key = require_peer_key(session)?;
            let truncated = hmac64(local_key, peer_key, local_rand, peer_rand);

            layout::write_u8(opt.bytes, 3, local_addr_id)?;
            layout::write_u64(opt.bytes, 4, truncated)?;
            layout::write_u32(opt.bytes, 12, local_rand)
        }

        // Case 6: OUT, ACK, !SYN, len=JOIN_ACK — kernel's join ACK.
        (Direction::Outbound, false, true, JOIN_ACK) => {
            let subflow = subflows
                .find_by_outbound(&tuple)
                .ok_or_else(|| EngineError::state("no subflow matches outbound MP_JOIN ACK"))?;
            let local_rand = subflow
                .local_rand()
                .ok_or_else(|| EngineError::state("subflow has no local_rand for outbound MP_JOIN ACK"))?;
            let peer_rand = subflow
                .peer_rand()
                .ok_or_else(|| EngineError::state("subflow has no peer_rand for outbound MP_JOIN ACK"))?;

            let peer_key = require_peer_key(session)?;
            let local_key = require_local_key(session)?;
            let tag = hmac160(peer_key, local_key, peer_rand, local_rand);
            layout::write_bytes(opt.bytes, 4, &tag)
        }

        (dir, syn, ack, len) => Err(EngineError::option(format!(
            "unrecognized MP_JOIN case: direction={dir:?}, syn={syn}, ack={ack}, len={len}"
        ))),
    }
}

fn require_local_key(session: &SessionState) -> Result<u64> {
    session.local_key().ok_or_else(|| EngineError::state("local key unset during MP_JOIN processing"))
}

fn require_peer_key(session: &SessionState) -> Result<u64> {
    session.peer_key().ok_or_else(|| EngineError::state("peer key unset during MP_JOIN processing"))
}
