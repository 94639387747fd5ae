use crate::packet::{is_time_sorted, Packets};
use crate::processor::PacketProcessor;
use crate::sender::{BandwidthEstimator, PacketSender};
use crate::stats::Stats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Totals of a chain run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub elapsed_ms: i64,
    pub packets_generated: u64,
    pub packets_delivered: u64,
    pub loss_fraction: f64,
    pub mean_delay_ms: f64,
    pub delay_std_dev_ms: f64,
    pub max_delay_ms: f64,
}

/// Drives senders and then filters, in insertion order, one step at a time.
///
/// Delay is measured per packet from the send time a sender stamped to the
/// send time leaving the last filter.
pub struct ProcessorChain {
    senders: Vec<Box<dyn PacketSender>>,
    filters: Vec<Box<dyn PacketProcessor>>,
    next_feedback_ms: Vec<i64>,
    now_ms: i64,
    packets_generated: u64,
    packets_delivered: u64,
    generated_at_us: HashMap<(u32, u16), i64>,
    delay_ms: Stats<f64>,
}

impl Default for ProcessorChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self {
            senders: Vec::new(),
            filters: Vec::new(),
            next_feedback_ms: Vec::new(),
            now_ms: 0,
            packets_generated: 0,
            packets_delivered: 0,
            generated_at_us: HashMap::new(),
            delay_ms: Stats::new(),
        }
    }

    pub fn add_sender(&mut self, sender: Box<dyn PacketSender>) {
        self.next_feedback_ms
            .push(self.now_ms + sender.feedback_interval_ms());
        self.senders.push(sender);
    }

    pub fn add_filter(&mut self, filter: Box<dyn PacketProcessor>) {
        self.filters.push(filter);
    }

    pub fn senders(&self) -> &[Box<dyn PacketSender>] {
        &self.senders
    }

    pub fn filters(&self) -> &[Box<dyn PacketProcessor>] {
        &self.filters
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// Run every stage for `time_ms` and return what left the last filter
    pub fn step(&mut self, time_ms: i64) -> Packets {
        let mut in_out = Packets::new();

        for sender in self.senders.iter_mut() {
            sender.run_for(time_ms, &mut in_out);
            check_order(sender.as_ref(), &in_out);
        }
        self.packets_generated += in_out.len() as u64;
        for packet in in_out.iter() {
            let header = packet.header();
            self.generated_at_us
                .insert((header.ssrc, header.sequence_number), packet.send_time_us());
        }

        for filter in self.filters.iter_mut() {
            filter.run_for(time_ms, &mut in_out);
            check_order(filter.as_ref(), &in_out);
        }

        self.packets_delivered += in_out.len() as u64;
        for packet in in_out.iter() {
            let header = packet.header();
            if let Some(sent_us) = self
                .generated_at_us
                .remove(&(header.ssrc, header.sequence_number))
            {
                self.delay_ms
                    .push((packet.send_time_us() - sent_us) as f64 / 1000.0);
            }
        }

        self.now_ms += time_ms;
        in_out
    }

    /// Step open loop until `duration_ms` has elapsed
    pub fn run(&mut self, duration_ms: i64, step_ms: i64) -> ChainSummary {
        let step_ms = step_ms.max(1);
        let end_ms = self.now_ms + duration_ms;
        while self.now_ms < end_ms {
            self.step(step_ms.min(end_ms - self.now_ms));
        }
        self.summary()
    }

    /// Step until `duration_ms` has elapsed, closing the loop through
    /// `estimator` after every step.
    pub fn run_with_feedback(
        &mut self,
        duration_ms: i64,
        step_ms: i64,
        estimator: &mut dyn BandwidthEstimator,
    ) -> ChainSummary {
        let step_ms = step_ms.max(1);
        let end_ms = self.now_ms + duration_ms;
        while self.now_ms < end_ms {
            let delivered = self.step(step_ms.min(end_ms - self.now_ms));
            estimator.on_delivered(self.now_ms, &delivered);
            self.deliver_feedback(estimator);
        }
        self.summary()
    }

    /// Hand each sender whose feedback interval has passed the estimate
    /// for its own stream. Senders without an estimate yet are retried on
    /// the next call.
    pub fn deliver_feedback(&mut self, estimator: &mut dyn BandwidthEstimator) {
        let now_ms = self.now_ms;
        for (sender, next_ms) in self
            .senders
            .iter_mut()
            .zip(self.next_feedback_ms.iter_mut())
        {
            if now_ms < *next_ms {
                continue;
            }
            let Some(ssrc) = sender.ssrc() else {
                continue;
            };
            if let Some(feedback) = estimator.estimate(now_ms, ssrc) {
                sender.give_feedback(&feedback);
                *next_ms = now_ms + sender.feedback_interval_ms();
            }
        }
    }

    pub fn summary(&mut self) -> ChainSummary {
        let loss_fraction = if self.packets_generated == 0 {
            0.0
        } else {
            1.0 - self.packets_delivered as f64 / self.packets_generated as f64
        };
        let (mean_delay_ms, delay_std_dev_ms) = if self.delay_ms.is_empty() {
            (0.0, 0.0)
        } else {
            (self.delay_ms.mean(), self.delay_ms.std_dev())
        };
        ChainSummary {
            elapsed_ms: self.now_ms,
            packets_generated: self.packets_generated,
            packets_delivered: self.packets_delivered,
            loss_fraction: loss_fraction.max(0.0),
            mean_delay_ms,
            delay_std_dev_ms,
            max_delay_ms: self.delay_ms.max(),
        }
    }
}

fn check_order<P: PacketProcessor + ?Sized>(stage: &P, packets: &Packets) {
    if stage.preserves_order() && !is_time_sorted(packets) {
        tracing::debug!(
            id = stage.info().id.value(),
            name = stage.info().name,
            "stage left packets out of send time order"
        );
    }
}
