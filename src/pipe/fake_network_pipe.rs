use crate::config::PipeConfig;
use crate::metrics::{self, DropReason};
use crate::pipe::clock::Clock;
use crate::pipe::error::{PipeError, PipeResult};
use crate::pipe::types::{NetworkPacket, PacketReceiver};
use crate::stats::Random;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Longest a poller should wait between two `network_process` calls
pub const NETWORK_PROCESS_MAX_WAIT_MS: i64 = 10;

struct PipeState {
    /// Packets still being serialized onto the link
    capacity_link: VecDeque<NetworkPacket>,
    /// Packets waiting out the extra queue delay
    delay_link: VecDeque<NetworkPacket>,
    random: Random,
    dropped_packets: u64,
    sent_packets: u64,
    total_packet_delay_ms: i64,
}

/// Emulates one capacity- and delay-bounded link in front of a receiver.
///
/// `send_packet` (producer) and `network_process` (poller) may run on
/// different threads; both take the same lock. The receiver is called with
/// the lock held and must not call back into the pipe.
pub struct FakeNetworkPipe {
    packet_receiver: Arc<dyn PacketReceiver>,
    clock: Arc<dyn Clock>,
    queue_length: usize,
    queue_delay_ms: i64,
    link_capacity_bytes_per_ms: i64,
    loss_fraction: f32,
    state: Mutex<PipeState>,
}

impl FakeNetworkPipe {
    pub fn new(
        packet_receiver: Arc<dyn PacketReceiver>,
        clock: Arc<dyn Clock>,
        config: &PipeConfig,
    ) -> PipeResult<Self> {
        let link_capacity_bytes_per_ms = i64::from(config.link_capacity_kbps / 8);
        if link_capacity_bytes_per_ms <= 0 {
            return Err(PipeError::InvalidLinkCapacity(config.link_capacity_kbps));
        }
        if !(0.0..=100.0).contains(&config.loss_percent) {
            return Err(PipeError::InvalidLossPercent(config.loss_percent));
        }
        if config.queue_delay_ms < 0 {
            return Err(PipeError::NegativeQueueDelay(config.queue_delay_ms));
        }

        tracing::debug!(
            queue_length = config.queue_length,
            queue_delay_ms = config.queue_delay_ms,
            link_capacity_kbps = config.link_capacity_kbps,
            loss_percent = config.loss_percent,
            "fake network pipe created"
        );

        Ok(Self {
            packet_receiver,
            clock,
            queue_length: config.queue_length,
            queue_delay_ms: config.queue_delay_ms,
            link_capacity_bytes_per_ms,
            loss_fraction: config.loss_percent * 0.01,
            state: Mutex::new(PipeState {
                capacity_link: VecDeque::new(),
                delay_link: VecDeque::new(),
                random: Random::new(config.seed),
                dropped_packets: 0,
                sent_packets: 0,
                total_packet_delay_ms: 0,
            }),
        })
    }

    /// Copy `data` onto the link, or drop it when the link queue is full or
    /// random loss hits.
    pub fn send_packet(&self, data: &[u8]) {
        let mut state = self.state.lock();
        if state.capacity_link.len() >= self.queue_length {
            state.dropped_packets += 1;
            tracing::debug!(
                queued = state.capacity_link.len(),
                "link queue full, packet dropped"
            );
            metrics::record_pipe_drop(DropReason::QueueFull);
            return;
        }
        if self.loss_fraction > 0.0 && state.random.rand() <= self.loss_fraction {
            state.dropped_packets += 1;
            tracing::debug!("packet lost on link");
            metrics::record_pipe_drop(DropReason::RandomLoss);
            return;
        }

        let time_now = self.clock.now_ms();

        // Delay introduced by the link capacity
        let capacity_delay_ms = data.len() as i64 / self.link_capacity_bytes_per_ms;

        // A packet cannot start before the one ahead of it is on the wire
        let network_start_time = state
            .capacity_link
            .back()
            .map_or(time_now, |last| last.arrival_time_ms().max(time_now));

        let arrival_time = network_start_time + capacity_delay_ms;
        state
            .capacity_link
            .push_back(NetworkPacket::new(data, time_now, arrival_time));
        metrics::set_queue_depth("capacity", state.capacity_link.len());
    }

    /// Move packets between stages and deliver everything that is due
    pub fn network_process(&self) {
        let mut state = self.state.lock();
        if state.capacity_link.is_empty() && state.delay_link.is_empty() {
            return;
        }

        let time_now = self.clock.now_ms();

        while state
            .capacity_link
            .front()
            .is_some_and(|p| time_now >= p.arrival_time_ms())
        {
            if let Some(mut packet) = state.capacity_link.pop_front() {
                packet.increment_arrival_time(self.queue_delay_ms);
                state.delay_link.push_back(packet);
            }
        }

        while state
            .delay_link
            .front()
            .is_some_and(|p| time_now >= p.arrival_time_ms())
        {
            if let Some(packet) = state.delay_link.pop_front() {
                self.packet_receiver.incoming_packet(packet.data());
                state.sent_packets += 1;

                // Use the scheduled arrival, not when this poll happened to run
                let delay_ms = packet.arrival_time_ms() - packet.send_time_ms();
                state.total_packet_delay_ms += delay_ms;
                metrics::record_pipe_delivery(packet.data_length(), delay_ms);
            }
        }

        metrics::set_queue_depth("capacity", state.capacity_link.len());
        metrics::set_queue_depth("delay", state.delay_link.len());
    }

    /// Milliseconds until the next packet is due, capped at
    /// [`NETWORK_PROCESS_MAX_WAIT_MS`]
    pub fn time_until_next_process(&self) -> i64 {
        let state = self.state.lock();
        let next_due = [state.capacity_link.front(), state.delay_link.front()]
            .into_iter()
            .flatten()
            .map(NetworkPacket::arrival_time_ms)
            .min();
        match next_due {
            Some(due) => (due - self.clock.now_ms()).clamp(0, NETWORK_PROCESS_MAX_WAIT_MS),
            None => NETWORK_PROCESS_MAX_WAIT_MS,
        }
    }

    /// Fraction of packets dropped, 0 until something was delivered
    pub fn percentage_loss(&self) -> f32 {
        let state = self.state.lock();
        if state.sent_packets == 0 {
            return 0.0;
        }
        state.dropped_packets as f32 / (state.sent_packets + state.dropped_packets) as f32
    }

    /// Mean scheduled delay in milliseconds, 0 until something was delivered
    pub fn average_delay(&self) -> i64 {
        let state = self.state.lock();
        if state.sent_packets == 0 {
            return 0;
        }
        state.total_packet_delay_ms / state.sent_packets as i64
    }

    pub fn dropped_packets(&self) -> u64 {
        self.state.lock().dropped_packets
    }

    pub fn sent_packets(&self) -> u64 {
        self.state.lock().sent_packets
    }

    /// Packets in either stage
    pub fn queued_packets(&self) -> usize {
        let state = self.state.lock();
        state.capacity_link.len() + state.delay_link.len()
    }
}

impl std::fmt::Debug for FakeNetworkPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeNetworkPipe")
            .field("queue_length", &self.queue_length)
            .field("queue_delay_ms", &self.queue_delay_ms)
            .field("link_capacity_bytes_per_ms", &self.link_capacity_bytes_per_ms)
            .field("loss_fraction", &self.loss_fraction)
            .finish()
    }
}
