//! Synthetic traffic sources
//!
//! A sender is a stage that manufactures packets instead of forwarding
//! them. An external bandwidth estimator closes the loop by calling
//! [`PacketSender::give_feedback`] at the interval the sender advertises.

pub mod error;
pub mod video;

pub use error::{SenderError, SenderResult};
pub use video::{AdaptiveVideoSender, VideoSender};

use crate::packet::Packets;
use crate::processor::PacketProcessor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub estimated_bps: u32,
}

/// Receive-side rate estimation, one estimate per stream
pub trait BandwidthEstimator {
    /// Observe what left the link during the step ending at `now_ms`
    fn on_delivered(&mut self, now_ms: i64, delivered: &Packets);

    /// Current estimate for the stream `ssrc`, if there is one yet
    fn estimate(&mut self, now_ms: i64, ssrc: u32) -> Option<Feedback>;
}

pub trait PacketSender: PacketProcessor {
    /// Target send rate, 0 when unconstrained
    fn capacity_kbps(&self) -> u32 {
        0
    }

    /// Stream this sender stamps on its packets, if it has exactly one
    fn ssrc(&self) -> Option<u32> {
        None
    }

    fn feedback_interval_ms(&self) -> i64 {
        1000
    }

    fn give_feedback(&mut self, _feedback: &Feedback) {}
}
