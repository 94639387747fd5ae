//! Link impairment stages for the single-threaded filter chain
//!
//! Every filter except [`ReorderFilter`] leaves its output sorted by send
//! time when its input was sorted.

pub mod choke;
pub mod delay;
pub mod error;
pub mod jitter;
pub mod loss;
pub mod rate_counter;
pub mod reorder;
pub mod trace;

pub use choke::ChokeFilter;
pub use delay::DelayFilter;
pub use error::{FilterError, FilterResult};
pub use jitter::JitterFilter;
pub use loss::LossFilter;
pub use rate_counter::RateCounterFilter;
pub use reorder::ReorderFilter;
pub use trace::TraceBasedDeliveryFilter;

fn percent_to_fraction(percent: f32) -> FilterResult<f32> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(FilterError::InvalidPercentage(percent));
    }
    Ok(percent * 0.01)
}
