//! Deterministic randomness and lazily computed sample statistics
//!
//! Both are owned by a single filter or harness for the lifetime of one
//! simulation run and are never shared across runs.

pub mod random;
pub mod sample_stats;

pub use random::Random;
pub use sample_stats::{Sample, Stats};
