//! Component E: the per-packet dispatcher. Walks a packet's TCP options,
//! finds the MPTCP one, and routes it to the subroutine for its subtype —
//! MP_CAPABLE, MP_JOIN, or DSS.

mod dss;
mod layout;
mod mp_capable;
mod mp_join;

use crate::error::{EngineError, Result};
use crate::packet::{Direction, PacketView};
use crate::rand::RngSource;
use crate::Session;

/// Rewrites the MPTCP option on `pkt`, if it has one.
///
/// `live_pkt` supplies fields the script never specified but the kernel
/// did — a peer's key, nonce, or address-id — and is only read for
/// `Direction::Outbound`; no inbound case ever looks at it, so `None` is
/// always a valid argument for an inbound packet.
pub fn process<R: RngSource>(
    session: &mut Session<R>,
    pkt: &mut impl PacketView,
    live_pkt: Option<&impl PacketView>,
    direction: Direction,
) -> Result<()> {
    let tuple = pkt.four_tuple();
    let syn = pkt.tcp_syn();
    let ack = pkt.tcp_ack();
    let payload_len = pkt.tcp_payload_len();
    let live_options = live_pkt.map(|lp| lp.options()).unwrap_or_default();

    let mut pending_checksum = None;
    {
        let mut options = pkt.options_mut();
        let opt = match options.iter_mut().find(|o| o.kind == layout::KIND_MPTCP) {
            Some(opt) => opt,
            None => return Ok(()),
        };
        let subtype = layout::subtype(opt.bytes)?;
        let live_opt = live_options.iter().find(|o| o.kind == layout::KIND_MPTCP);

        match subtype {
            layout::SUBTYPE_CAPABLE => mp_capable::process(
                opt,
                live_opt,
                direction,
                syn,
                ack,
                tuple,
                &mut session.state,
                &mut session.subflows,
                &mut session.vars,
                &mut session.rng,
            )?,
            layout::SUBTYPE_JOIN => mp_join::process(
                opt,
                live_opt,
                direction,
                syn,
                ack,
                tuple,
                &mut session.state,
                &mut session.subflows,
                &mut session.rng,
            )?,
            layout::SUBTYPE_DSS => {
                let outcome =
                    dss::process(opt, direction, tuple, payload_len, &session.state, &mut session.subflows)?;
                if let dss::DssOutcome::NeedsChecksum { dsn, ssn, dll } = outcome {
                    pending_checksum = Some((dsn, ssn, dll));
                }
            }
            other => return Err(EngineError::option(format!("unrecognized MPTCP subtype: {other}"))),
        }
    }

    // The DSS checksum pass needs `&pkt` for the whole segment, which the
    // option rewrite above was still mutably borrowing; run it now that
    // borrow has ended, then reopen the option just to drop in the result.
    if let Some((dsn, ssn, dll)) = pending_checksum {
        let checksum = pkt.dss_checksum(dsn, ssn, dll);
        let mut options = pkt.options_mut();
        let opt = options
            .iter_mut()
            .find(|o| o.kind == layout::KIND_MPTCP)
            .ok_or_else(|| EngineError::state("MPTCP option disappeared between DSS passes"))?;
        layout::write_u16(opt.bytes, 18, checksum)?;
    }

    Ok(())
}
