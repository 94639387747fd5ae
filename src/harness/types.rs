use crate::processor::ChainSummary;
use serde::{Deserialize, Serialize};

/// Sliding-window rate measured after the last filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughputReport {
    pub mean_pps: f64,
    pub mean_kbps: f64,
    pub peak_kbps: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipeReport {
    pub sent_packets: u64,
    pub dropped_packets: u64,
    pub received_packets: u64,
    pub received_bytes: u64,
    pub loss_fraction: f32,
    pub average_delay_ms: i64,
}

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub generated_at: String,
    /// Stages registered while the scenario ran
    pub processors: usize,
    pub chain: ChainSummary,
    pub throughput: ThroughputReport,
    pub pipe: Option<PipeReport>,
}

impl SimulationReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# Scenario: {}\n\n", self.scenario));
        md.push_str(&format!("> Generated: {}\n\n", self.generated_at));

        md.push_str("## Filter chain\n\n");
        md.push_str("| Generated | Delivered | Loss | Mean delay | Max delay |\n");
        md.push_str("|-----------|-----------|------|------------|-----------|\n");
        md.push_str(&format!(
            "| {} | {} | {:.2}% | {:.1} ms | {:.1} ms |\n\n",
            self.chain.packets_generated,
            self.chain.packets_delivered,
            self.chain.loss_fraction * 100.0,
            self.chain.mean_delay_ms,
            self.chain.max_delay_ms
        ));

        md.push_str(&format!(
            "- **Throughput:** {:.1} pps, {:.1} kbps (peak {:.1} kbps)\n",
            self.throughput.mean_pps, self.throughput.mean_kbps, self.throughput.peak_kbps
        ));

        if let Some(pipe) = &self.pipe {
            md.push_str("\n## Network pipe\n\n");
            md.push_str(&format!("- **Sent:** {}\n", pipe.sent_packets));
            md.push_str(&format!(
                "- **Dropped:** {} ({:.2}%)\n",
                pipe.dropped_packets,
                pipe.loss_fraction * 100.0
            ));
            md.push_str(&format!(
                "- **Average delay:** {} ms\n",
                pipe.average_delay_ms
            ));
        }

        md
    }
}
