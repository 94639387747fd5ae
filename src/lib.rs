//! Deterministic network-condition emulation for bandwidth estimation work
//!
//! Two engines share the packet and statistics primitives:
//!
//! - a single-threaded [`processor::ProcessorChain`] of senders and
//!   [`filter`]s operating on simulated time, and
//! - a thread-safe [`pipe::FakeNetworkPipe`] that delays byte payloads
//!   through a bounded, capacity-limited link.

pub mod config;
pub mod filter;
pub mod harness;
pub mod metrics;
pub mod packet;
pub mod pipe;
pub mod processor;
pub mod sender;
pub mod stats;
