use crate::config::{ConfigResult, ScenarioConfig};
use crate::filter::RateCounterFilter;
use crate::harness::estimator::DeliveredRateEstimator;
use crate::harness::types::{PipeReport, SimulationReport, ThroughputReport};
use crate::pipe::{Clock, FakeNetworkPipe, PacketReceiver, SimulatedClock};
use crate::processor::{ListenerRef, PacketProcessor, ProcessorChain, ProcessorRegistry};
use crate::sender::BandwidthEstimator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct DeliveryCounter {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl PacketReceiver for DeliveryCounter {
    fn incoming_packet(&self, data: &[u8]) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(data.len() as u64, Ordering::Relaxed);
    }
}

/// Run a scenario to completion on simulated time.
///
/// Each adaptive sender is fed the delivered rate of its own stream,
/// measured after the last filter, so it settles on what the link
/// actually carries for it.
pub fn run_scenario(config: &ScenarioConfig) -> ConfigResult<SimulationReport> {
    config.validate()?;

    let registry = Arc::new(ProcessorRegistry::new());
    let listener: ListenerRef = registry.clone();

    let mut chain = ProcessorChain::new();
    for sender in &config.senders {
        chain.add_sender(sender.build(Some(listener.clone()))?);
    }
    for filter in config.link.build_filters(Some(listener.clone()))? {
        chain.add_filter(filter);
    }
    let mut rate_counter = RateCounterFilter::new(Some(listener));

    let clock = Arc::new(SimulatedClock::new(0));
    let receiver = Arc::new(DeliveryCounter::default());
    let pipe = match &config.pipe {
        Some(pipe_config) => Some(FakeNetworkPipe::new(
            receiver.clone(),
            clock.clone(),
            pipe_config,
        )?),
        None => None,
    };

    let processors = registry.len();
    tracing::info!(
        scenario = %config.name,
        senders = registry.senders().len(),
        processors,
        duration_ms = config.duration_ms,
        "running scenario"
    );

    let mut estimator = DeliveredRateEstimator::new();
    let mut payload: Vec<u8> = Vec::new();
    let end_ms = config.duration_ms;
    while chain.now_ms() < end_ms {
        let time_ms = config.step_ms.min(end_ms - chain.now_ms());
        let mut delivered = chain.step(time_ms);
        let now_ms = chain.now_ms();

        if let Some(pipe) = &pipe {
            clock.advance_ms(now_ms - clock.now_ms());
            for packet in delivered.iter() {
                payload.resize(packet.payload_size() as usize, 0);
                pipe.send_packet(&payload);
            }
            pipe.network_process();
        }

        estimator.on_delivered(now_ms, &delivered);
        chain.deliver_feedback(&mut estimator);
        rate_counter.run_for(time_ms, &mut delivered);
    }
    let summary = chain.summary();

    let pipe_report = pipe.as_ref().map(|pipe| {
        // Let everything already on the link arrive
        while pipe.queued_packets() > 0 {
            clock.advance_ms(pipe.time_until_next_process().max(1));
            pipe.network_process();
        }
        PipeReport {
            sent_packets: pipe.sent_packets(),
            dropped_packets: pipe.dropped_packets(),
            received_packets: receiver.packets.load(Ordering::Relaxed),
            received_bytes: receiver.bytes.load(Ordering::Relaxed),
            loss_fraction: pipe.percentage_loss(),
            average_delay_ms: pipe.average_delay(),
        }
    });

    rate_counter.log_stats();
    let throughput = if rate_counter.pps_stats().is_empty() {
        ThroughputReport::default()
    } else {
        ThroughputReport {
            mean_pps: rate_counter.pps_stats().mean(),
            mean_kbps: rate_counter.kbps_stats().mean(),
            peak_kbps: rate_counter.kbps_stats().max(),
        }
    };

    tracing::info!(
        scenario = %config.name,
        generated = summary.packets_generated,
        delivered = summary.packets_delivered,
        mean_delay_ms = summary.mean_delay_ms,
        "scenario finished"
    );

    Ok(SimulationReport {
        scenario: config.name.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        processors,
        chain: summary,
        throughput,
        pipe: pipe_report,
    })
}
