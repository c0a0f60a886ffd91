//! The boundary between this engine and the host tool's packet layer.
//!
//! The script parser, TCP-option iteration primitives, IP/TCP header
//! plumbing, and packet capture all live on the host side as black boxes
//! the engine consumes. This module is the minimal, test-friendly shape of
//! that boundary: a host adapts its real packet representation into
//! [`PacketView`] and [`TcpOptionView`] rather than this crate depending on
//! any particular packet library.

use std::net::IpAddr;

/// Which side of the exchange a packet travels: tool → kernel or
/// kernel → tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Tool → kernel: a packet the engine is about to hand to the kernel.
    Inbound,
    /// Kernel → tool: a packet the engine captured from the kernel.
    Outbound,
}

/// The tool-perspective 4-tuple: source = tool side, destination = kernel
/// side, ports in host byte order. Used to key subflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourTuple {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FourTuple {
    /// Flips source and destination — converts a tuple read off a live,
    /// kernel-perspective packet into the tool-perspective tuple
    /// `Subflow`s are keyed by, or vice versa.
    pub fn swapped(&self) -> FourTuple {
        FourTuple {
            src_ip: self.dst_ip,
            dst_ip: self.src_ip,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }
}

/// One TCP option's raw bytes, addressable for in-place rewriting.
///
/// `kind` is the TCP option kind byte (30 for MPTCP, per RFC 6824 §3).
/// `bytes` is the *entire* option including its `kind`/`length` header
/// bytes, mirroring how `huginn-proxy-lib`'s
/// `fingerprinting::tcp_syn_extractor` treats raw TCP option bytes as one
/// contiguous slice rather than a pre-decoded struct.
pub struct TcpOptionView<'a> {
    pub kind: u8,
    pub bytes: &'a mut [u8],
}

impl<'a> TcpOptionView<'a> {
    pub fn new(kind: u8, bytes: &'a mut [u8]) -> Self {
        Self { kind, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A read-only, owned copy of one TCP option's bytes.
///
/// Used for `live_pkt`: the engine never rewrites a live, captured packet,
/// only reads it, so there's no need for `live_pkt` to hand out the same
/// mutable, borrow-checked view `pkt` does — and a plain owned copy avoids
/// holding two live borrows of the same packet for the inbound direction,
/// where `live_pkt` and `pkt` are the same underlying packet.
#[derive(Debug, Clone)]
pub struct RawOption {
    pub kind: u8,
    pub bytes: Vec<u8>,
}

/// The per-packet facts the engine needs, in the host's own representation.
///
/// The engine never owns or allocates packet bytes outside of an option
/// it's rewriting; it reads header geometry through this trait and mutates
/// option bytes through the `[TcpOptionView]` it returns.
pub trait PacketView {
    fn four_tuple(&self) -> FourTuple;

    fn tcp_syn(&self) -> bool;
    fn tcp_ack(&self) -> bool;

    /// Total IP datagram length in bytes.
    fn ip_total_len(&self) -> u16;
    /// IP header length in bytes (20 plus any IP options).
    fn ip_header_len(&self) -> u16;
    /// TCP header length in bytes (20 plus any TCP options) — the full
    /// header, not just the options region.
    fn tcp_header_len(&self) -> u16;

    /// TCP payload length, in bytes: everything after the TCP header.
    ///
    /// Equal to `ip_total_bytes − ip_header_len − tcp_header_len`: the full
    /// TCP header (mandatory 20 bytes plus any TCP options) contributes no
    /// payload, so it's subtracted whole rather than double-counted against
    /// the mandatory 20 bytes separately.
    fn tcp_payload_len(&self) -> u16 {
        self.ip_total_len()
            .saturating_sub(self.ip_header_len())
            .saturating_sub(self.tcp_header_len())
    }

    /// All TCP options on this packet, in header order, as mutable views
    /// this engine can rewrite in place. The engine filters these down to
    /// the MPTCP one(s) via [`TcpOptionView::kind`].
    fn options_mut(&mut self) -> Vec<TcpOptionView<'_>>;

    /// All TCP options on this packet, as read-only owned copies.
    ///
    /// Used to inspect `live_pkt` — the packet captured off the kernel,
    /// never itself rewritten — without taking the mutable borrow
    /// [`options_mut`](PacketView::options_mut) requires. That distinction
    /// matters for the inbound direction, where `live_pkt` and `pkt` are the
    /// same packet: were `live_pkt` inspected through `options_mut` too, the
    /// engine would need two simultaneous mutable views of it.
    fn options(&self) -> Vec<RawOption>;

    /// Computes the TCP checksum over this segment (header + payload) with
    /// its checksum field treated as zero, folded with the MPTCP-DSS
    /// pseudo-header `(dsn, ssn, dll, 0)` per RFC 6824 §3.3.
    ///
    /// IP/TCP header plumbing lives on the host side as a black box this
    /// engine consumes; checksum computation over raw segment bytes is
    /// exactly that plumbing, so implementations delegate to whatever
    /// TCP/IP checksum routine the host already has.
    fn dss_checksum(&self, dsn: u64, ssn: u32, dll: u16) -> u16;
}
