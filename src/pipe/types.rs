use bytes::Bytes;

/// Destination for packets leaving the pipe
pub trait PacketReceiver: Send + Sync {
    fn incoming_packet(&self, data: &[u8]);
}

/// A packet travelling through the pipe.
///
/// Owns a private copy of the payload, released when the packet is
/// delivered or dropped.
#[derive(Debug, Clone)]
pub struct NetworkPacket {
    data: Bytes,
    /// Time the packet entered the pipe
    send_time_ms: i64,
    /// Scheduled exit from the current stage
    arrival_time_ms: i64,
}

impl NetworkPacket {
    pub fn new(data: &[u8], send_time_ms: i64, arrival_time_ms: i64) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
            send_time_ms,
            arrival_time_ms,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    pub fn send_time_ms(&self) -> i64 {
        self.send_time_ms
    }

    pub fn arrival_time_ms(&self) -> i64 {
        self.arrival_time_ms
    }

    pub fn increment_arrival_time(&mut self, extra_delay_ms: i64) {
        self.arrival_time_ms += extra_delay_ms;
    }
}
