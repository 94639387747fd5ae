use anyhow::Context;
use bwe_netsim::config::{LinkProfile, PipeConfig, ScenarioConfig, VideoSenderConfig};
use bwe_netsim::harness::run_scenario;
use tracing_subscriber::EnvFilter;

/// Usage: bwe-netsim [scenario.json] [--markdown]
fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the report on stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    bwe_netsim::metrics::init_metrics();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let markdown = args.iter().any(|a| a == "--markdown");
    let scenario = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => ScenarioConfig::from_file(path)
            .with_context(|| format!("failed to load scenario {}", path))?,
        None => default_scenario(),
    };

    let report = run_scenario(&scenario).context("scenario run failed")?;
    if markdown {
        println!("{}", report.to_markdown());
    } else {
        println!("{}", report.to_json());
    }

    Ok(())
}

/// Two desynchronized streams over a congested mobile link
fn default_scenario() -> ScenarioConfig {
    ScenarioConfig {
        name: "mobile_4g".to_string(),
        duration_ms: 10_000,
        step_ms: 10,
        senders: vec![
            VideoSenderConfig {
                fps: 30.0,
                kbps: 1500,
                ssrc: 0x1111,
                ..Default::default()
            },
            VideoSenderConfig {
                fps: 15.0,
                kbps: 500,
                ssrc: 0x2222,
                first_frame_offset: 0.5,
                adaptive: true,
            },
        ],
        link: LinkProfile::mobile_4g(),
        pipe: Some(PipeConfig::mobile_4g()),
    }
}
