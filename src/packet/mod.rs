pub mod types;

pub use types::{is_time_sorted, merge_sorted, Packet, Packets, RtpHeader};
