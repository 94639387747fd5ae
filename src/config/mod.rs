//! Serde-backed configuration for pipes, filter chains and scenarios

pub mod error;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use types::{LinkProfile, PipeConfig, ScenarioConfig, VideoSenderConfig};
