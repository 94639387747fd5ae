//! Scenario runner
//!
//! Wires the configured senders and filters into a [`ProcessorChain`],
//! closes the loop for adaptive senders with a per-stream
//! [`DeliveredRateEstimator`], optionally feeds the chain output through a
//! [`FakeNetworkPipe`] on a simulated clock, and summarizes the run as a
//! [`SimulationReport`].
//!
//! [`ProcessorChain`]: crate::processor::ProcessorChain
//! [`FakeNetworkPipe`]: crate::pipe::FakeNetworkPipe

pub mod estimator;
pub mod scenario;
pub mod types;

pub use estimator::DeliveredRateEstimator;
pub use scenario::run_scenario;
pub use types::{PipeReport, SimulationReport, ThroughputReport};
