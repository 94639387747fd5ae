use crate::config::error::{ConfigError, ConfigResult};
use crate::filter::{
    ChokeFilter, DelayFilter, JitterFilter, LossFilter, ReorderFilter, TraceBasedDeliveryFilter,
};
use crate::processor::{ListenerRef, PacketProcessor};
use crate::sender::{AdaptiveVideoSender, PacketSender, VideoSender};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_PIPE_SEED: u32 = 0x5eed_1e55;

/// Parameters of a [`FakeNetworkPipe`](crate::pipe::FakeNetworkPipe)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Max packets buffered on the capacity link
    pub queue_length: usize,
    /// Fixed extra delay after serialization
    pub queue_delay_ms: i64,
    /// Link capacity, at least 8 kbps
    pub link_capacity_kbps: u32,
    /// Random loss (0 - 100)
    pub loss_percent: f32,
    /// Seed for the loss generator
    pub seed: u32,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            queue_length: 1000,
            queue_delay_ms: 0,
            link_capacity_kbps: 1_000_000,
            loss_percent: 0.0,
            seed: DEFAULT_PIPE_SEED,
        }
    }
}

impl PipeConfig {
    /// Create a perfect link (no loss, no extra delay)
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Create a typical LAN link
    pub fn lan() -> Self {
        Self {
            queue_delay_ms: 1,
            link_capacity_kbps: 1_000_000, // 1 Gbps
            ..Default::default()
        }
    }

    /// Create a typical WiFi link
    pub fn wifi() -> Self {
        Self {
            queue_delay_ms: 5,
            link_capacity_kbps: 100_000, // 100 Mbps
            loss_percent: 2.0,
            ..Default::default()
        }
    }

    /// Create a degraded 4G/LTE link
    pub fn mobile_4g() -> Self {
        Self {
            queue_length: 200,
            queue_delay_ms: 50,
            link_capacity_kbps: 10_000, // 10 Mbps
            loss_percent: 5.0,
            ..Default::default()
        }
    }

    /// Create a satellite link
    pub fn satellite() -> Self {
        Self {
            queue_length: 500,
            queue_delay_ms: 600,
            link_capacity_kbps: 5_000,
            loss_percent: 3.0,
            ..Default::default()
        }
    }

    /// Create a badly congested link
    pub fn disaster() -> Self {
        Self {
            queue_length: 50,
            queue_delay_ms: 200,
            link_capacity_kbps: 1_000, // 1 Mbps
            loss_percent: 20.0,
            ..Default::default()
        }
    }
}

/// Impairments applied by the filter chain, in this order: loss, delay,
/// jitter, reorder, choke, trace replay. Zero values leave a stage out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkProfile {
    pub loss_percent: f32,
    pub delay_ms: i64,
    /// Standard deviation of the jitter
    pub jitter_ms: i64,
    pub reorder_percent: f32,
    pub capacity_kbps: Option<u32>,
    /// Max delay through the choke, 0 for unbounded
    pub max_delay_ms: i64,
    /// Delivery opportunity trace, one nanosecond timestamp per line
    pub trace_file: Option<PathBuf>,
}

impl LinkProfile {
    /// Create a perfect network profile
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Create a typical LAN profile
    pub fn lan() -> Self {
        Self {
            delay_ms: 1,
            capacity_kbps: Some(1_000_000),
            ..Default::default()
        }
    }

    /// Create a typical WiFi profile
    pub fn wifi() -> Self {
        Self {
            loss_percent: 2.0,
            delay_ms: 5,
            jitter_ms: 10,
            capacity_kbps: Some(100_000),
            ..Default::default()
        }
    }

    /// Create a degraded 4G/LTE profile
    pub fn mobile_4g() -> Self {
        Self {
            loss_percent: 5.0,
            delay_ms: 50,
            jitter_ms: 30,
            reorder_percent: 1.0,
            capacity_kbps: Some(10_000),
            max_delay_ms: 500,
            ..Default::default()
        }
    }

    /// Create a satellite profile
    pub fn satellite() -> Self {
        Self {
            loss_percent: 3.0,
            delay_ms: 600,
            jitter_ms: 50,
            capacity_kbps: Some(5_000),
            ..Default::default()
        }
    }

    /// Create a disaster scenario profile
    pub fn disaster() -> Self {
        Self {
            loss_percent: 20.0,
            delay_ms: 200,
            jitter_ms: 100,
            reorder_percent: 5.0,
            capacity_kbps: Some(1_000),
            max_delay_ms: 1_000,
            ..Default::default()
        }
    }

    pub fn build_filters(
        &self,
        listener: Option<ListenerRef>,
    ) -> ConfigResult<Vec<Box<dyn PacketProcessor>>> {
        let mut filters: Vec<Box<dyn PacketProcessor>> = Vec::new();

        if self.loss_percent > 0.0 {
            let mut filter = LossFilter::new(listener.clone());
            filter.set_loss(self.loss_percent)?;
            filters.push(Box::new(filter));
        }
        if self.delay_ms != 0 {
            let mut filter = DelayFilter::new(listener.clone());
            filter.set_delay(self.delay_ms)?;
            filters.push(Box::new(filter));
        }
        if self.jitter_ms != 0 {
            let mut filter = JitterFilter::new(listener.clone());
            filter.set_jitter(self.jitter_ms)?;
            filters.push(Box::new(filter));
        }
        if self.reorder_percent > 0.0 {
            let mut filter = ReorderFilter::new(listener.clone());
            filter.set_reorder(self.reorder_percent)?;
            filters.push(Box::new(filter));
        }
        if let Some(kbps) = self.capacity_kbps {
            let mut filter = ChokeFilter::new(listener.clone());
            filter.set_capacity(kbps)?;
            filter.set_max_delay(self.max_delay_ms)?;
            filters.push(Box::new(filter));
        }
        if let Some(path) = &self.trace_file {
            let mut filter = TraceBasedDeliveryFilter::new(listener);
            filter.init(path)?;
            filters.push(Box::new(filter));
        }

        Ok(filters)
    }
}

/// One synthetic video stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSenderConfig {
    pub fps: f32,
    pub kbps: u32,
    pub ssrc: u32,
    pub first_frame_offset: f32,
    /// Follow bandwidth estimates instead of a fixed rate
    pub adaptive: bool,
}

impl Default for VideoSenderConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            kbps: 300,
            ssrc: 0x1234,
            first_frame_offset: 0.0,
            adaptive: false,
        }
    }
}

impl VideoSenderConfig {
    pub fn build(&self, listener: Option<ListenerRef>) -> ConfigResult<Box<dyn PacketSender>> {
        let sender: Box<dyn PacketSender> = if self.adaptive {
            Box::new(AdaptiveVideoSender::new(
                listener,
                self.fps,
                self.kbps,
                self.ssrc,
                self.first_frame_offset,
            )?)
        } else {
            Box::new(VideoSender::new(
                listener,
                self.fps,
                self.kbps,
                self.ssrc,
                self.first_frame_offset,
            )?)
        };
        Ok(sender)
    }
}

/// A complete filter-chain run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub duration_ms: i64,
    pub step_ms: i64,
    pub senders: Vec<VideoSenderConfig>,
    pub link: LinkProfile,
    /// Optional capacity link behind the filter chain
    pub pipe: Option<PipeConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            duration_ms: 10_000,
            step_ms: 10,
            senders: vec![VideoSenderConfig::default()],
            link: LinkProfile::default(),
            pipe: None,
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.step_ms <= 0 {
            return Err(ConfigError::InvalidScenario(format!(
                "step_ms must be positive, got {}",
                self.step_ms
            )));
        }
        if self.duration_ms < self.step_ms {
            return Err(ConfigError::InvalidScenario(format!(
                "duration_ms ({}) shorter than one step ({})",
                self.duration_ms, self.step_ms
            )));
        }
        if self.senders.is_empty() {
            return Err(ConfigError::InvalidScenario(
                "at least one sender is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessorRegistry;
    use std::sync::Arc;

    #[test]
    fn test_pipe_presets_have_usable_capacity() {
        for config in [
            PipeConfig::perfect(),
            PipeConfig::lan(),
            PipeConfig::wifi(),
            PipeConfig::mobile_4g(),
            PipeConfig::satellite(),
            PipeConfig::disaster(),
        ] {
            assert!(config.link_capacity_kbps >= 8);
            assert!((0.0..=100.0).contains(&config.loss_percent));
        }
    }

    #[test]
    fn test_perfect_profile_builds_no_filters() {
        let filters = LinkProfile::perfect().build_filters(None).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_profile_builds_stages_in_order() {
        let registry = Arc::new(ProcessorRegistry::new());
        let listener: ListenerRef = registry.clone();
        let filters = LinkProfile::mobile_4g()
            .build_filters(Some(listener))
            .unwrap();

        let names: Vec<&str> = filters.iter().map(|f| f.info().name).collect();
        assert_eq!(
            names,
            vec!["LossFilter", "DelayFilter", "JitterFilter", "ReorderFilter", "ChokeFilter"]
        );
        assert_eq!(registry.len(), 5);

        drop(filters);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let profile = LinkProfile {
            loss_percent: 250.0,
            ..Default::default()
        };
        assert!(matches!(
            profile.build_filters(None),
            Err(ConfigError::Filter(_))
        ));

        let missing_trace = LinkProfile {
            trace_file: Some(PathBuf::from("/nonexistent/trace.txt")),
            ..Default::default()
        };
        assert!(missing_trace.build_filters(None).is_err());
    }

    #[test]
    fn test_scenario_from_json() {
        let json = r#"{
            "name": "two streams",
            "duration_ms": 5000,
            "step_ms": 10,
            "senders": [
                { "fps": 30, "kbps": 500, "ssrc": 1 },
                { "fps": 15, "kbps": 200, "ssrc": 2, "first_frame_offset": 0.5, "adaptive": true }
            ],
            "link": { "loss_percent": 1.5, "capacity_kbps": 2000 },
            "pipe": { "queue_length": 20, "link_capacity_kbps": 1000 }
        }"#;

        let config = ScenarioConfig::from_json_str(json).unwrap();
        assert_eq!(config.name, "two streams");
        assert_eq!(config.senders.len(), 2);
        assert!(config.senders[1].adaptive);
        assert_eq!(config.link.capacity_kbps, Some(2000));
        assert_eq!(config.link.delay_ms, 0);
        let pipe = config.pipe.as_ref().unwrap();
        assert_eq!(pipe.queue_length, 20);
        assert_eq!(pipe.loss_percent, 0.0);

        let sender = config.senders[1].build(None).unwrap();
        assert_eq!(sender.feedback_interval_ms(), 100);
    }

    #[test]
    fn test_scenario_validation() {
        assert!(matches!(
            ScenarioConfig::from_json_str(r#"{ "step_ms": 0 }"#),
            Err(ConfigError::InvalidScenario(_))
        ));
        assert!(ScenarioConfig::from_json_str(r#"{ "senders": [] }"#).is_err());
        assert!(matches!(
            ScenarioConfig::from_json_str("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_pipe_config_from_json_uses_defaults() {
        let config: PipeConfig = serde_json::from_str(r#"{ "queue_delay_ms": 50 }"#).unwrap();
        assert_eq!(config.queue_delay_ms, 50);
        assert_eq!(config.queue_length, 1000);
    }
}
