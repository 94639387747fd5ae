//! Thread-safe two-stage link emulator
//!
//! Packets first serialize through a capacity-bounded queue, then wait out
//! a fixed extra delay before they are handed to a [`PacketReceiver`]. The
//! pipe has no thread of its own; a caller or the poller drives it.

pub mod clock;
pub mod error;
pub mod fake_network_pipe;
pub mod poller;
pub mod types;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use error::{PipeError, PipeResult};
pub use fake_network_pipe::{FakeNetworkPipe, NETWORK_PROCESS_MAX_WAIT_MS};
pub use poller::{spawn_network_process, PollerHandle};
pub use types::{NetworkPacket, PacketReceiver};
