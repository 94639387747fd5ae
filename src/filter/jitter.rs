use crate::filter::{FilterError, FilterResult};
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};
use crate::stats::Random;

const JITTER_SEED: u32 = 0x8967_4523;

/// Adds a random extra delay per packet without ever reordering.
///
/// Each send time moves by a zero-mean Gaussian sample, earlier or later,
/// and is then clamped to the previous adjusted time like a FIFO jitter
/// buffer. The clamp only adds delay when jitter is large next to the
/// packet spacing.
#[derive(Debug)]
pub struct JitterFilter {
    handle: ProcessorHandle,
    random: Random,
    stddev_jitter_us: i64,
    last_send_time_us: i64,
}

impl JitterFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "JitterFilter"),
            random: Random::new(JITTER_SEED),
            stddev_jitter_us: 0,
            last_send_time_us: 0,
        }
    }

    pub fn set_jitter(&mut self, stddev_jitter_ms: i64) -> FilterResult<()> {
        if stddev_jitter_ms < 0 {
            return Err(FilterError::NegativeDelay(stddev_jitter_ms));
        }
        self.stddev_jitter_us = stddev_jitter_ms * 1000;
        Ok(())
    }
}

impl PacketProcessor for JitterFilter {
    fn run_for(&mut self, _time_ms: i64, in_out: &mut Packets) {
        for packet in in_out.iter_mut() {
            let jitter_us = self.random.gaussian(0, self.stddev_jitter_us);
            let new_send_time_us = packet.send_time_us() + jitter_us;
            self.last_send_time_us = self.last_send_time_us.max(new_send_time_us);
            packet.set_send_time_us(self.last_send_time_us);
        }
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}
