//! Pipeline stage contract
//!
//! A stage consumes, produces or reschedules packets for a simulated time
//! step. Stages do not own each other; a driver calls them in chain order.
//! Stages can announce themselves to a [`PacketProcessorListener`], which
//! only keeps bookkeeping and never owns the stage.

pub mod chain;
pub mod registry;
pub mod types;

pub use chain::{ChainSummary, ProcessorChain};
pub use registry::ProcessorRegistry;
pub use types::{ListenerRef, ProcessorHandle, ProcessorId, ProcessorInfo, ProcessorKind};

use crate::packet::Packets;

pub trait PacketProcessor: Send {
    /// Run the stage for `time_ms` of simulated time.
    ///
    /// The outgoing sequence must be sorted by send time unless
    /// [`PacketProcessor::preserves_order`] returns false.
    fn run_for(&mut self, time_ms: i64, in_out: &mut Packets);

    fn info(&self) -> &ProcessorInfo;

    fn preserves_order(&self) -> bool {
        true
    }
}

/// Registry capability for stages that need external visibility
pub trait PacketProcessorListener: Send + Sync {
    fn add_packet_processor(&self, processor: &ProcessorInfo);
    fn remove_packet_processor(&self, processor: &ProcessorInfo);
}
