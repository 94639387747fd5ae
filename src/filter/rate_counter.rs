use crate::metrics;
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};
use crate::stats::Stats;

const WINDOW_SIZE_US: i64 = 1_000_000;

/// Passes packets through untouched while measuring rate over a sliding window
#[derive(Debug)]
pub struct RateCounterFilter {
    handle: ProcessorHandle,
    window_size_us: i64,
    packets_per_second: u32,
    bytes_per_second: u32,
    last_accumulated_us: i64,
    window: Packets,
    pps_stats: Stats<f64>,
    kbps_stats: Stats<f64>,
}

impl RateCounterFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self::with_window(listener, WINDOW_SIZE_US)
    }

    pub fn with_window(listener: Option<ListenerRef>, window_size_us: i64) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "RateCounterFilter"),
            window_size_us,
            packets_per_second: 0,
            bytes_per_second: 0,
            last_accumulated_us: 0,
            window: Packets::new(),
            pps_stats: Stats::new(),
            kbps_stats: Stats::new(),
        }
    }

    pub fn packets_per_second(&self) -> u32 {
        self.packets_per_second
    }

    pub fn bits_per_second(&self) -> u32 {
        self.bytes_per_second * 8
    }

    pub fn pps_stats(&mut self) -> &mut Stats<f64> {
        &mut self.pps_stats
    }

    pub fn kbps_stats(&mut self) -> &mut Stats<f64> {
        &mut self.kbps_stats
    }

    pub fn log_stats(&mut self) {
        let span = tracing::info_span!("RateCounterFilter", id = self.handle.info().id.value());
        let _enter = span.enter();
        self.pps_stats.log("pps");
        self.kbps_stats.log("kbps");
    }
}

impl PacketProcessor for RateCounterFilter {
    fn run_for(&mut self, _time_ms: i64, in_out: &mut Packets) {
        for packet in in_out.iter() {
            self.packets_per_second += 1;
            self.bytes_per_second += packet.payload_size();
            self.last_accumulated_us = packet.send_time_us();
        }
        self.window.extend(in_out.iter().cloned());

        while let Some(packet) = self.window.front() {
            if packet.send_time_us() > self.last_accumulated_us - self.window_size_us {
                break;
            }
            self.packets_per_second -= 1;
            self.bytes_per_second -= packet.payload_size();
            self.window.pop_front();
        }

        let kbps = f64::from(self.bytes_per_second) * 8.0 / 1000.0;
        self.pps_stats.push(f64::from(self.packets_per_second));
        self.kbps_stats.push(kbps);
        metrics::record_rate(f64::from(self.packets_per_second), kbps);
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, RtpHeader};

    fn packets(times_us: &[i64], size: u32) -> Packets {
        times_us
            .iter()
            .map(|&t| Packet::new(t, size, RtpHeader::default()))
            .collect()
    }

    #[test]
    fn test_counts_packets_within_window() {
        let mut filter = RateCounterFilter::new(None);
        let mut in_out = packets(&[0, 100_000, 200_000, 300_000], 1000);
        let input = in_out.clone();

        filter.run_for(300, &mut in_out);

        assert_eq!(in_out, input);
        assert_eq!(filter.packets_per_second(), 4);
        assert_eq!(filter.bits_per_second(), 32_000);
    }

    #[test]
    fn test_evicts_packets_older_than_window() {
        let mut filter = RateCounterFilter::new(None);
        let mut first = packets(&[0, 500_000], 100);
        filter.run_for(500, &mut first);
        assert_eq!(filter.packets_per_second(), 2);

        // At t=1.0 s the packet from t=0 falls out of the window
        let mut second = packets(&[1_000_000], 100);
        filter.run_for(500, &mut second);
        assert_eq!(filter.packets_per_second(), 2);
        assert_eq!(filter.bits_per_second(), 1600);

        let mut third = packets(&[2_200_000], 100);
        filter.run_for(1200, &mut third);
        assert_eq!(filter.packets_per_second(), 1);
    }

    #[test]
    fn test_pushes_one_sample_per_call() {
        let mut filter = RateCounterFilter::new(None);
        for i in 0..5 {
            let mut in_out = packets(&[i * 100_000], 125);
            filter.run_for(100, &mut in_out);
        }
        assert_eq!(filter.pps_stats().len(), 5);
        assert_eq!(filter.pps_stats().max(), 5.0);
        assert_eq!(filter.kbps_stats().max(), 5.0);
        filter.log_stats();
    }

    #[test]
    fn test_empty_input_keeps_rate() {
        let mut filter = RateCounterFilter::new(None);
        let mut in_out = packets(&[0, 10_000], 500);
        filter.run_for(10, &mut in_out);

        let mut empty = Packets::new();
        filter.run_for(10, &mut empty);
        assert_eq!(filter.packets_per_second(), 2);
        assert_eq!(filter.pps_stats().len(), 2);
    }
}
