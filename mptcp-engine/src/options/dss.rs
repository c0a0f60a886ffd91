//! The DSS subroutine. Only the inbound path is validated; outbound DSS is
//! a documented no-op.

use crate::error::{EngineError, Result};
use crate::options::layout::{self, DSS_DACK_ONLY, DSS_DSN_CHECKSUM, DSS_DSN_NO_CHECKSUM};
use crate::packet::{Direction, FourTuple, TcpOptionView};
use crate::session::SessionState;
use crate::subflow::SubflowTable;

/// What's left to do once `process` returns. Checksum computation reads the
/// whole segment, which needs `&PacketView`, not just the option's own
/// bytes — and the caller is already holding those bytes mutably borrowed
/// out of the same packet. So `process` only fills in the fields it can from
/// the option bytes alone, and hands back what a checksum pass still needs;
/// the caller runs that pass once its mutable borrow of the packet's options
/// has ended.
pub enum DssOutcome {
    Done,
    NeedsChecksum { dsn: u64, ssn: u32, dll: u16 },
}

pub fn process(
    opt: &mut TcpOptionView,
    direction: Direction,
    tuple: FourTuple,
    payload_len: u16,
    session: &SessionState,
    subflows: &mut SubflowTable,
) -> Result<DssOutcome> {
    if direction == Direction::Outbound {
        // Outbound DSS fields are left unvalidated rather than checked
        // against expected derivations. Documented, not silently skipped.
        tracing::debug!("outbound DSS left unvalidated");
        return Ok(DssOutcome::Done);
    }

    match opt.len() {
        DSS_DSN_CHECKSUM | DSS_DSN_NO_CHECKSUM => {
            process_dsn(opt, tuple, payload_len, session, subflows)
        }
        DSS_DACK_ONLY => {
            process_dack(opt, session)?;
            Ok(DssOutcome::Done)
        }
        len => Err(EngineError::option(format!("unrecognized inbound DSS option length: {len}"))),
    }
}

fn process_dsn(
    opt: &mut TcpOptionView,
    tuple: FourTuple,
    payload_len: u16,
    session: &SessionState,
    subflows: &mut SubflowTable,
) -> Result<DssOutcome> {
    let with_checksum = opt.len() == DSS_DSN_CHECKSUM;

    // The script wrote a small literal (e.g. 0, 1000) where the real DSN
    // belongs; that literal is the offset from `initial_dsn`.
    let raw_dsn = layout::read_u64(opt.bytes, 4)?;
    let dsn = if with_checksum {
        session.initial_dsn()?.wrapping_add(raw_dsn)
    } else {
        // No-checksum DSS variant: the +1 accounts for MPTCP's FIN/
        // zero-payload convention.
        session.initial_dsn()?.wrapping_add(raw_dsn).wrapping_add(1)
    };
    layout::write_u64(opt.bytes, 4, dsn)?;
    layout::write_u16(opt.bytes, 16, payload_len)?;

    let subflow = subflows
        .find_by_inbound(&tuple)
        .ok_or_else(|| EngineError::state("no subflow matches inbound DSS"))?;
    let ssn = subflow.subflow_seq();
    layout::write_u32(opt.bytes, 12, ssn)?;
    subflow.advance_seq(u32::from(payload_len));

    if with_checksum {
        layout::write_u16(opt.bytes, 18, 0)?;
        Ok(DssOutcome::NeedsChecksum { dsn, ssn, dll: payload_len })
    } else {
        Ok(DssOutcome::Done)
    }
}

fn process_dack(opt: &mut TcpOptionView, session: &SessionState) -> Result<()> {
    let raw_dack = layout::read_u64(opt.bytes, 4)?;
    let dack = session.initial_dack()?.wrapping_add(raw_dack);
    layout::write_u64(opt.bytes, 4, dack)
}
