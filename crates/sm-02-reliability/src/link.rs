//! One peer's reliability state.
//!
//! Sequence window layout: `recv_highest` is the highest sequence received
//! from the peer; bit k of `recv_bits` records receipt of sequence
//! `recv_highest - 1 - k`. Sequences older than the 64-entry window are
//! considered already-delivered and only re-acknowledged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ReliabilityConfig;

/// The `ack`/`ack_bits` pair piggybacked on every outbound envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckSnapshot {
    pub ack: u64,
    pub ack_bits: u64,
}

/// Classification of an inbound sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// First sighting; deliver to higher layers.
    Fresh,
    /// Seen before (or below the window); re-acknowledge, do not redeliver.
    Duplicate,
}

/// A reliable message awaiting acknowledgment.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub seq: u64,
    /// The exact datagram bytes, retransmitted verbatim.
    pub bytes: Vec<u8>,
    pub msg_type: &'static str,
    pub first_sent_ms: u64,
    pub last_sent_ms: u64,
    /// Retransmissions so far (the initial send is not counted).
    pub attempts: u32,
}

/// Result of one retransmit scan over a link.
#[derive(Debug, Default)]
pub struct RetransmitScan {
    /// Messages due for another send.
    pub resend: Vec<(u64, Vec<u8>)>,
    /// Messages that exceeded the retry ceiling and were dropped.
    pub abandoned: Vec<PendingMessage>,
}

/// Per-peer reliability state machine.
#[derive(Debug, Default)]
pub struct ReliableLink {
    next_send_seq: u64,
    recv_highest: u64,
    recv_bits: u64,
    pending: BTreeMap<u64, PendingMessage>,
    ack_owed_since_ms: Option<u64>,
}

impl ReliableLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next outbound sequence number (monotonic, from 1).
    pub fn next_seq(&mut self) -> u64 {
        self.next_send_seq += 1;
        self.next_send_seq
    }

    /// Current acknowledgment state to piggyback on outbound traffic.
    pub fn ack_snapshot(&self) -> AckSnapshot {
        AckSnapshot {
            ack: self.recv_highest,
            ack_bits: self.recv_bits,
        }
    }

    /// Record an inbound sequence and classify it.
    pub fn observe_incoming(&mut self, seq: u64) -> Receipt {
        if seq > self.recv_highest {
            let shift = seq - self.recv_highest;
            self.recv_bits = if self.recv_highest == 0 || shift > 64 {
                // Nothing received yet, or the whole window scrolled out.
                0
            } else if shift == 64 {
                1u64 << 63
            } else {
                (self.recv_bits << shift) | (1u64 << (shift - 1))
            };
            self.recv_highest = seq;
            return Receipt::Fresh;
        }
        if seq == self.recv_highest {
            return Receipt::Duplicate;
        }
        let diff = self.recv_highest - seq;
        if diff > 64 {
            return Receipt::Duplicate;
        }
        let bit = 1u64 << (diff - 1);
        if self.recv_bits & bit != 0 {
            Receipt::Duplicate
        } else {
            self.recv_bits |= bit;
            Receipt::Fresh
        }
    }

    /// Apply a peer's `ack`/`ack_bits` to the pending outbox. Returns the
    /// sequences the peer has now covered.
    pub fn apply_ack(&mut self, ack: u64, ack_bits: u64) -> Vec<u64> {
        let covered: Vec<u64> = self
            .pending
            .keys()
            .copied()
            .filter(|&seq| {
                if seq == ack {
                    return true;
                }
                if seq < ack {
                    let delta = ack - seq;
                    return delta <= 64 && (ack_bits >> (delta - 1)) & 1 == 1;
                }
                false
            })
            .collect();
        for seq in &covered {
            self.pending.remove(seq);
            trace!(seq, "reliable message acknowledged");
        }
        covered
    }

    /// Start tracking a reliable message that was just sent.
    pub fn track_pending(
        &mut self,
        seq: u64,
        bytes: Vec<u8>,
        msg_type: &'static str,
        now_ms: u64,
    ) {
        self.pending.insert(
            seq,
            PendingMessage {
                seq,
                bytes,
                msg_type,
                first_sent_ms: now_ms,
                last_sent_ms: now_ms,
                attempts: 0,
            },
        );
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Note that the peer sent something worth acknowledging.
    pub fn mark_ack_owed(&mut self, now_ms: u64) {
        self.ack_owed_since_ms.get_or_insert(now_ms);
    }

    /// Any outbound envelope to the peer carries the snapshot, settling
    /// the debt.
    pub fn clear_ack_owed(&mut self) {
        self.ack_owed_since_ms = None;
    }

    /// Whether the owed ACK is old enough to deserve a dedicated
    /// `ack_only` envelope.
    pub fn ack_flush_due(&self, now_ms: u64, cfg: &ReliabilityConfig) -> bool {
        self.ack_owed_since_ms
            .is_some_and(|since| now_ms.saturating_sub(since) >= cfg.silent_ack_after_ms)
    }

    /// Scan the outbox against the backoff schedule. Due messages get
    /// their attempt counter bumped; over-ceiling messages are removed and
    /// returned as abandoned.
    pub fn scan_retransmits(&mut self, now_ms: u64, cfg: &ReliabilityConfig) -> RetransmitScan {
        let mut scan = RetransmitScan::default();
        let mut drop_seqs = Vec::new();

        for (&seq, msg) in &mut self.pending {
            let rto = cfg.rto_for_attempt(msg.attempts);
            if now_ms.saturating_sub(msg.last_sent_ms) < rto {
                continue;
            }
            if msg.attempts >= cfg.max_attempts {
                drop_seqs.push(seq);
                continue;
            }
            msg.attempts += 1;
            msg.last_sent_ms = now_ms;
            scan.resend.push((seq, msg.bytes.clone()));
        }

        for seq in drop_seqs {
            if let Some(msg) = self.pending.remove(&seq) {
                debug!(
                    seq,
                    attempts = msg.attempts,
                    msg_type = msg.msg_type,
                    "reliable message abandoned"
                );
                scan.abandoned.push(msg);
            }
        }
        scan
    }
}
