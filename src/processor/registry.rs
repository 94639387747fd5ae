use crate::processor::{PacketProcessorListener, ProcessorId, ProcessorInfo, ProcessorKind};
use parking_lot::RwLock;

/// Bookkeeping of live stages, e.g. for pacing or topology reporting
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    processors: RwLock<Vec<ProcessorInfo>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered stages in registration order
    pub fn processors(&self) -> Vec<ProcessorInfo> {
        self.processors.read().clone()
    }

    pub fn senders(&self) -> Vec<ProcessorInfo> {
        self.processors
            .read()
            .iter()
            .filter(|p| p.kind == ProcessorKind::Sender)
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: ProcessorId) -> bool {
        self.processors.read().iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.processors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.read().is_empty()
    }
}

impl PacketProcessorListener for ProcessorRegistry {
    fn add_packet_processor(&self, processor: &ProcessorInfo) {
        tracing::debug!(id = processor.id.value(), name = processor.name, "processor added");
        self.processors.write().push(processor.clone());
    }

    fn remove_packet_processor(&self, processor: &ProcessorInfo) {
        tracing::debug!(id = processor.id.value(), name = processor.name, "processor removed");
        self.processors.write().retain(|p| p.id != processor.id);
    }
}
