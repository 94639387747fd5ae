//! Metrics and observability module
//!
//! Emits through the `metrics` facade; without an installed recorder every
//! call is a no-op.
//!
//! Key metrics exposed:
//! - Pipe drops (queue full or random loss) and deliveries
//! - Per-packet pipe delay
//! - Queue depths of the capacity and extra-delay stages
//! - Filter drops and rate-counter samples

pub mod recorder;

pub use recorder::{
    init_metrics, record_filter_drops, record_pipe_delivery, record_pipe_drop, record_rate,
    set_queue_depth, DropReason,
};
