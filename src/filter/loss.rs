use crate::filter::{percent_to_fraction, FilterResult};
use crate::metrics;
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};
use crate::stats::Random;

const LOSS_SEED: u32 = 0x1234_5678;

/// Drops each packet independently with a fixed probability
#[derive(Debug)]
pub struct LossFilter {
    handle: ProcessorHandle,
    random: Random,
    loss_fraction: f32,
}

impl LossFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "LossFilter"),
            random: Random::new(LOSS_SEED),
            loss_fraction: 0.0,
        }
    }

    pub fn set_loss(&mut self, loss_percent: f32) -> FilterResult<()> {
        self.loss_fraction = percent_to_fraction(loss_percent)?;
        Ok(())
    }

    pub fn loss_fraction(&self) -> f32 {
        self.loss_fraction
    }
}

impl PacketProcessor for LossFilter {
    fn run_for(&mut self, _time_ms: i64, in_out: &mut Packets) {
        if self.loss_fraction <= 0.0 {
            return;
        }
        let before = in_out.len();
        let loss_fraction = self.loss_fraction;
        let random = &mut self.random;
        in_out.retain(|_| random.rand() > loss_fraction);

        let dropped = before - in_out.len();
        if dropped > 0 {
            tracing::debug!(dropped, "loss filter dropped packets");
            metrics::record_filter_drops(self.handle.info().name, dropped);
        }
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterError;
    use crate::packet::{is_time_sorted, Packet};

    fn packets(count: usize) -> Packets {
        (0..count)
            .map(|i| Packet::with_sequence_number(i as i64 * 1000, i as u16))
            .collect()
    }

    #[test]
    fn test_zero_loss_is_identity() {
        let mut filter = LossFilter::new(None);
        filter.set_loss(0.0).unwrap();

        let input = packets(100);
        let mut in_out = input.clone();
        filter.run_for(100, &mut in_out);
        assert_eq!(in_out, input);
    }

    #[test]
    fn test_full_loss_drops_everything() {
        let mut filter = LossFilter::new(None);
        filter.set_loss(100.0).unwrap();

        let mut in_out = packets(1000);
        filter.run_for(100, &mut in_out);
        assert!(in_out.is_empty());
    }

    #[test]
    fn test_partial_loss_keeps_order() {
        let mut filter = LossFilter::new(None);
        filter.set_loss(50.0).unwrap();

        let mut in_out = packets(1000);
        filter.run_for(100, &mut in_out);

        assert!(in_out.len() > 400 && in_out.len() < 600, "kept {}", in_out.len());
        assert!(is_time_sorted(&in_out));
    }

    #[test]
    fn test_deterministic_across_instances() {
        let mut first = LossFilter::new(None);
        let mut second = LossFilter::new(None);
        first.set_loss(25.0).unwrap();
        second.set_loss(25.0).unwrap();

        let mut a = packets(500);
        let mut b = packets(500);
        first.run_for(100, &mut a);
        second.run_for(100, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_out_of_range_loss() {
        let mut filter = LossFilter::new(None);
        assert!(matches!(
            filter.set_loss(101.0),
            Err(FilterError::InvalidPercentage(_))
        ));
        assert!(filter.set_loss(-1.0).is_err());
        assert_eq!(filter.loss_fraction(), 0.0);
    }
}
