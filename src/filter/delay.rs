use crate::filter::{FilterError, FilterResult};
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};

/// Adds a fixed delay to every packet
#[derive(Debug)]
pub struct DelayFilter {
    handle: ProcessorHandle,
    delay_us: i64,
    last_send_time_us: i64,
}

impl DelayFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "DelayFilter"),
            delay_us: 0,
            last_send_time_us: 0,
        }
    }

    pub fn set_delay(&mut self, delay_ms: i64) -> FilterResult<()> {
        if delay_ms < 0 {
            return Err(FilterError::NegativeDelay(delay_ms));
        }
        self.delay_us = delay_ms * 1000;
        Ok(())
    }
}

impl PacketProcessor for DelayFilter {
    fn run_for(&mut self, _time_ms: i64, in_out: &mut Packets) {
        for packet in in_out.iter_mut() {
            // A shorter delay set mid-run must not let packets overtake
            let new_send_time_us = packet.send_time_us() + self.delay_us;
            self.last_send_time_us = self.last_send_time_us.max(new_send_time_us);
            packet.set_send_time_us(self.last_send_time_us);
        }
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}
