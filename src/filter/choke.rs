use crate::filter::{FilterError, FilterResult};
use crate::metrics;
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};

const DEFAULT_CAPACITY_KBPS: u32 = 1200;

/// Bottleneck link with an unbounded packet queue bounded in time.
///
/// A packet leaves at `max(send_time, previous departure) + size / capacity`.
/// Packets whose delay through the choke would exceed the max delay are
/// dropped and do not occupy the link.
#[derive(Debug)]
pub struct ChokeFilter {
    handle: ProcessorHandle,
    kbps: u32,
    max_delay_us: Option<i64>,
    last_send_time_us: i64,
}

impl ChokeFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "ChokeFilter"),
            kbps: DEFAULT_CAPACITY_KBPS,
            max_delay_us: None,
            last_send_time_us: 0,
        }
    }

    pub fn set_capacity(&mut self, kbps: u32) -> FilterResult<()> {
        if kbps == 0 {
            return Err(FilterError::InvalidCapacity(kbps));
        }
        self.kbps = kbps;
        Ok(())
    }

    /// 0 disables the bound
    pub fn set_max_delay(&mut self, max_delay_ms: i64) -> FilterResult<()> {
        if max_delay_ms < 0 {
            return Err(FilterError::NegativeDelay(max_delay_ms));
        }
        self.max_delay_us = (max_delay_ms > 0).then_some(max_delay_ms * 1000);
        Ok(())
    }

    pub fn capacity_kbps(&self) -> u32 {
        self.kbps
    }

    fn transmission_time_us(&self, payload_size: u32) -> i64 {
        let kbps = i64::from(self.kbps);
        (i64::from(payload_size) * 8 * 1000 + kbps / 2) / kbps
    }
}

impl PacketProcessor for ChokeFilter {
    fn run_for(&mut self, _time_ms: i64, in_out: &mut Packets) {
        let before = in_out.len();
        in_out.retain_mut(|packet| {
            let start_us = packet.send_time_us().max(self.last_send_time_us);
            let new_send_time_us = start_us + self.transmission_time_us(packet.payload_size());
            let delay_us = new_send_time_us - packet.send_time_us();

            match self.max_delay_us {
                Some(max_delay_us) if delay_us > max_delay_us => {
                    tracing::debug!(delay_us, max_delay_us, "choke filter dropped packet");
                    false
                }
                _ => {
                    packet.set_send_time_us(new_send_time_us);
                    self.last_send_time_us = new_send_time_us;
                    true
                }
            }
        });

        let dropped = before - in_out.len();
        if dropped > 0 {
            metrics::record_filter_drops(self.handle.info().name, dropped);
        }
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}
