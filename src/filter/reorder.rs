use crate::filter::{percent_to_fraction, FilterResult};
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};
use crate::stats::Random;

const REORDER_SEED: u32 = 0x2745_2389;

/// Swaps packets with their predecessor at random.
///
/// Swapped packets trade places but each position keeps its send time, so
/// downstream stages see sequence numbers out of order.
#[derive(Debug)]
pub struct ReorderFilter {
    handle: ProcessorHandle,
    random: Random,
    reorder_fraction: f32,
}

impl ReorderFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "ReorderFilter"),
            random: Random::new(REORDER_SEED),
            reorder_fraction: 0.0,
        }
    }

    pub fn set_reorder(&mut self, reorder_percent: f32) -> FilterResult<()> {
        self.reorder_fraction = percent_to_fraction(reorder_percent)?;
        Ok(())
    }
}

impl PacketProcessor for ReorderFilter {
    fn run_for(&mut self, _time_ms: i64, in_out: &mut Packets) {
        if in_out.len() < 2 || self.reorder_fraction <= 0.0 {
            return;
        }
        for i in 1..in_out.len() {
            if self.random.rand() <= self.reorder_fraction {
                let t1 = in_out[i - 1].send_time_us();
                let t2 = in_out[i].send_time_us();
                in_out.swap(i - 1, i);
                in_out[i - 1].set_send_time_us(t1);
                in_out[i].set_send_time_us(t2);
            }
        }
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }

    fn preserves_order(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    fn packets(count: usize) -> Packets {
        (0..count)
            .map(|i| Packet::with_sequence_number(i as i64 * 1000, i as u16))
            .collect()
    }

    fn sequence_numbers(packets: &Packets) -> Vec<u16> {
        packets.iter().map(|p| p.header().sequence_number).collect()
    }

    #[test]
    fn test_zero_reorder_is_identity() {
        let mut filter = ReorderFilter::new(None);
        let input = packets(100);
        let mut in_out = input.clone();
        filter.run_for(100, &mut in_out);
        assert_eq!(in_out, input);
    }

    #[test]
    fn test_full_reorder_rotates_first_packet_to_end() {
        let mut filter = ReorderFilter::new(None);
        filter.set_reorder(100.0).unwrap();

        let mut in_out = packets(4);
        filter.run_for(100, &mut in_out);

        // Every neighbour swap carries packet 0 one step further back
        assert_eq!(sequence_numbers(&in_out), vec![1, 2, 3, 0]);
        let times: Vec<i64> = in_out.iter().map(|p| p.send_time_us()).collect();
        assert_eq!(times, vec![0, 1000, 2000, 3000]);
    }

    #[test]
    fn test_partial_reorder_is_a_permutation() {
        let mut filter = ReorderFilter::new(None);
        filter.set_reorder(30.0).unwrap();

        let mut in_out = packets(200);
        filter.run_for(100, &mut in_out);

        let mut seqs = sequence_numbers(&in_out);
        assert_ne!(seqs, (0..200).collect::<Vec<u16>>());
        seqs.sort_unstable();
        assert_eq!(seqs, (0..200).collect::<Vec<u16>>());
        assert!(!filter.preserves_order());
    }
}
