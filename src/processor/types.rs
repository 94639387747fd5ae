use crate::processor::PacketProcessorListener;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_PROCESSOR_ID: AtomicU64 = AtomicU64::new(1);

/// Shared reference to a registry, handed to stage constructors
pub type ListenerRef = Arc<dyn PacketProcessorListener>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessorId(u64);

impl ProcessorId {
    fn next() -> Self {
        Self(NEXT_PROCESSOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorKind {
    Filter,
    Sender,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInfo {
    pub id: ProcessorId,
    pub kind: ProcessorKind,
    pub name: &'static str,
}

/// Identity of a stage plus its optional registration.
///
/// Registers with the listener on creation and deregisters on drop.
pub struct ProcessorHandle {
    info: ProcessorInfo,
    listener: Option<ListenerRef>,
}

impl ProcessorHandle {
    pub fn new(listener: Option<ListenerRef>, kind: ProcessorKind, name: &'static str) -> Self {
        let info = ProcessorInfo {
            id: ProcessorId::next(),
            kind,
            name,
        };
        if let Some(listener) = &listener {
            listener.add_packet_processor(&info);
        }
        Self { info, listener }
    }

    pub fn info(&self) -> &ProcessorInfo {
        &self.info
    }
}

impl std::fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("info", &self.info)
            .field("registered", &self.listener.is_some())
            .finish()
    }
}

impl Drop for ProcessorHandle {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.remove_packet_processor(&self.info);
        }
    }
}
