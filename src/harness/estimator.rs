use crate::packet::Packets;
use crate::sender::{BandwidthEstimator, Feedback};
use std::collections::{HashMap, VecDeque};

const WINDOW_MS: i64 = 1000;

/// One delivered packet: send time after the link, sequence number, size
type Arrival = (i64, u16, u32);

/// Per-stream delivered rate over a sliding window of link output.
///
/// The rate is the mean delivered packet size times the packet rate implied
/// by the sequence number span, so random loss does not read as congestion
/// while a bottleneck that spaces packets out does.
#[derive(Debug)]
pub struct DeliveredRateEstimator {
    window_us: i64,
    streams: HashMap<u32, VecDeque<Arrival>>,
}

impl Default for DeliveredRateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveredRateEstimator {
    pub fn new() -> Self {
        Self::with_window(WINDOW_MS)
    }

    pub fn with_window(window_ms: i64) -> Self {
        Self {
            window_us: window_ms.max(1) * 1000,
            streams: HashMap::new(),
        }
    }

    fn evict(&mut self, now_ms: i64) {
        let oldest_us = now_ms * 1000 - self.window_us;
        for arrivals in self.streams.values_mut() {
            while arrivals
                .front()
                .is_some_and(|&(send_time_us, _, _)| send_time_us <= oldest_us)
            {
                arrivals.pop_front();
            }
        }
        self.streams.retain(|_, arrivals| !arrivals.is_empty());
    }
}

impl BandwidthEstimator for DeliveredRateEstimator {
    fn on_delivered(&mut self, now_ms: i64, delivered: &Packets) {
        for packet in delivered.iter() {
            let header = packet.header();
            self.streams.entry(header.ssrc).or_default().push_back((
                packet.send_time_us(),
                header.sequence_number,
                packet.payload_size(),
            ));
        }
        self.evict(now_ms);
    }

    fn estimate(&mut self, now_ms: i64, ssrc: u32) -> Option<Feedback> {
        if now_ms * 1000 < self.window_us {
            return None;
        }
        let arrivals = self.streams.get(&ssrc)?;
        let &(first_us, first_seq, _) = arrivals.front()?;
        let &(last_us, _, _) = arrivals.back()?;
        let span_us = last_us - first_us;
        if arrivals.len() < 2 || span_us <= 0 {
            return None;
        }

        // Reordering can put a lower sequence number after the first arrival
        let (low, high) = arrivals.iter().fold((0i32, 0i32), |(low, high), &(_, seq, _)| {
            let offset = i32::from(seq.wrapping_sub(first_seq) as i16);
            (low.min(offset), high.max(offset))
        });
        let intervals = f64::from(high - low);
        let bytes: u64 = arrivals.iter().map(|&(_, _, size)| u64::from(size)).sum();
        let mean_size = bytes as f64 / arrivals.len() as f64;

        let bps = mean_size * intervals * 8.0 * 1e6 / span_us as f64;
        let estimated_bps = bps.round().min(f64::from(u32::MAX)) as u32;
        (estimated_bps > 0).then_some(Feedback { estimated_bps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, RtpHeader};

    /// Frames of `size` bytes every `period_us`, skipping the listed indices
    fn stream(ssrc: u32, count: u16, period_us: i64, size: u32, lost: &[u16]) -> Packets {
        (0..count)
            .filter(|i| !lost.contains(i))
            .map(|i| {
                let header = RtpHeader {
                    ssrc,
                    sequence_number: 0xfffau16.wrapping_add(i),
                    ..Default::default()
                };
                Packet::new(i64::from(i) * period_us, size, header)
            })
            .collect()
    }

    #[test]
    fn test_no_estimate_before_window_fills() {
        let mut estimator = DeliveredRateEstimator::new();
        estimator.on_delivered(500, &stream(1, 6, 100_000, 1000, &[]));
        assert_eq!(estimator.estimate(500, 1), None);
        assert_eq!(estimator.estimate(1000, 7), None);
    }

    #[test]
    fn test_rate_of_a_steady_stream() {
        let mut estimator = DeliveredRateEstimator::new();
        // 10 frames/s of 1000 bytes is 80 kbps, across a sequence wrap
        estimator.on_delivered(1500, &stream(1, 16, 100_000, 1000, &[]));

        let feedback = estimator.estimate(1500, 1).unwrap();
        assert_eq!(feedback.estimated_bps, 80_000);
    }

    #[test]
    fn test_streams_are_estimated_separately() {
        let mut delivered = stream(1, 20, 50_000, 500, &[]);
        delivered.extend(stream(2, 20, 50_000, 2000, &[]));
        let mut estimator = DeliveredRateEstimator::new();
        estimator.on_delivered(1000, &delivered);

        assert_eq!(estimator.estimate(1000, 1).unwrap().estimated_bps, 80_000);
        assert_eq!(estimator.estimate(1000, 2).unwrap().estimated_bps, 320_000);
    }

    #[test]
    fn test_random_loss_does_not_lower_estimate() {
        let mut estimator = DeliveredRateEstimator::new();
        estimator.on_delivered(1000, &stream(1, 11, 100_000, 1000, &[2, 3, 7]));
        assert_eq!(estimator.estimate(1000, 1).unwrap().estimated_bps, 80_000);
    }

    #[test]
    fn test_spread_out_arrivals_lower_estimate() {
        // Same frames, delivered at half the pace
        let mut estimator = DeliveredRateEstimator::new();
        estimator.on_delivered(1000, &stream(1, 6, 200_000, 1000, &[]));
        assert_eq!(estimator.estimate(1000, 1).unwrap().estimated_bps, 40_000);
    }

    #[test]
    fn test_old_arrivals_leave_the_window() {
        let mut estimator = DeliveredRateEstimator::new();
        estimator.on_delivered(1000, &stream(1, 11, 100_000, 1000, &[]));
        assert!(estimator.estimate(1000, 1).is_some());

        estimator.on_delivered(3000, &Packets::new());
        assert_eq!(estimator.estimate(3000, 1), None);
    }
}
