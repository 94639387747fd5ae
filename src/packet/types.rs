use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Routing and sequencing metadata carried by a simulated packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpHeader {
    pub ssrc: u32,
    pub sequence_number: u16,
    pub timestamp: u32,
    /// 24-bit 6.18 fixed point seconds
    pub absolute_send_time: u32,
    pub transmission_time_offset: i32,
}

/// A simulated packet. Only the payload size is modelled, no bytes are carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Time the packet left the last processor touching it
    send_time_us: i64,
    payload_size: u32,
    header: RtpHeader,
}

impl Packet {
    pub fn new(send_time_us: i64, payload_size: u32, header: RtpHeader) -> Self {
        Self {
            send_time_us,
            payload_size,
            header,
        }
    }

    /// Minimal packet for tests that only care about ordering
    pub fn with_sequence_number(send_time_us: i64, sequence_number: u16) -> Self {
        Self {
            send_time_us,
            payload_size: 0,
            header: RtpHeader {
                sequence_number,
                ..Default::default()
            },
        }
    }

    pub fn send_time_us(&self) -> i64 {
        self.send_time_us
    }

    pub fn set_send_time_us(&mut self, send_time_us: i64) {
        self.send_time_us = send_time_us;
    }

    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    pub fn header(&self) -> &RtpHeader {
        &self.header
    }
}

/// Packet sequence handed from stage to stage
pub type Packets = VecDeque<Packet>;

/// Returns true when send times never decrease along the sequence
pub fn is_time_sorted(packets: &Packets) -> bool {
    packets
        .iter()
        .zip(packets.iter().skip(1))
        .all(|(prev, next)| prev.send_time_us() <= next.send_time_us())
}

/// Merge `incoming` into `in_out`, both sorted by send time.
///
/// Equal send times keep packets already in `in_out` ahead of incoming ones.
pub fn merge_sorted(in_out: &mut Packets, mut incoming: Packets) {
    if incoming.is_empty() {
        return;
    }
    if in_out.is_empty() {
        *in_out = incoming;
        return;
    }

    let mut merged = Packets::with_capacity(in_out.len() + incoming.len());
    let mut existing = std::mem::take(in_out);
    loop {
        let take_existing = match (existing.front(), incoming.front()) {
            (Some(a), Some(b)) => a.send_time_us() <= b.send_time_us(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_existing {
            existing.pop_front()
        } else {
            incoming.pop_front()
        };
        if let Some(packet) = next {
            merged.push_back(packet);
        }
    }
    *in_out = merged;
}
