//! Results of a diffusion simulation run

use std::path::Path;

use dtn_stats::dtn_delay_reports::{DeliveryDelay, TopicDelays};
use dtn_stats::dtn_report_writer::{
    write_delivery_delays, write_final_report, write_topic_delays, write_transient, ReportFile,
};
use dtn_stats::dtn_summary::fmt_stat;
use dtn_stats::dtn_transient::TransientSample;
use dtn_stats::{FinalReport, HostId, StatsError};
use indexmap::IndexMap;

/// Simulation result
#[derive(Debug)]
pub struct SimResult {
    /// Seed used for the simulation
    pub seed_used: [u8; 32],

    /// Number of rounds completed
    pub rounds_completed: usize,

    /// Simulated time at the end of the run
    pub end_time: f64,

    /// Aggregator output
    pub report: FinalReport,

    /// One entry per delivered message
    pub delivery_delays: Vec<DeliveryDelay>,

    /// Per-message delays to interested hosts
    pub topic_delays: Vec<TopicDelays>,

    /// Transient samples per sampled host
    pub transient: IndexMap<HostId, Vec<TransientSample>>,

    /// Sampled hosts whose router had no transient values
    pub transient_unsupported: usize,
}

impl SimResult {
    /// Print a summary of the simulation results
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Diffusion Simulation Results                    ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Configuration:");
        println!("  Seed: {:?}", self.seed_used);
        println!("  Rounds: {}", self.rounds_completed);
        println!("  End time: {}\n", self.end_time);

        let s = &self.report.summary;
        println!("Delivery Statistics:");
        println!(
            "  Created: {} (responses requested: {})",
            s.counters.created, s.counters.response_created
        );
        println!(
            "  Delivered: {} (responses: {})",
            s.counters.delivered, s.counters.response_delivered
        );
        println!(
            "  Started / relayed / aborted: {} / {} / {}",
            s.counters.started, s.counters.relayed, s.counters.aborted
        );
        println!(
            "  Dropped / removed: {} / {}",
            s.counters.dropped, s.counters.removed
        );
        println!("  Delivery prob: {}", fmt_stat(s.delivery_prob));
        println!("  Overhead ratio: {}", fmt_stat(s.overhead_ratio));
        println!(
            "  Latency: avg={}, med={}, max={}",
            fmt_stat(s.latency_avg),
            fmt_stat(s.latency_median),
            fmt_stat(s.latency_max)
        );
        println!("  RTT avg: {}", fmt_stat(s.rtt_avg));
        println!();

        println!("Diffusion Statistics:");
        match &self.report.diffusion {
            Ok(lines) => {
                let crossings: Vec<usize> = lines.iter().map(|l| l.latencies.len()).collect();
                println!("  Messages tracked: {}", lines.len());
                if let Some(&most) = crossings.iter().max() {
                    for level in 1..=most {
                        let reached = crossings.iter().filter(|&&c| c >= level).count();
                        println!("  Reached threshold #{}: {}", level, reached);
                    }
                }
            }
            Err(e) => println!("  unavailable: {}", e),
        }
        println!();

        println!("Other Reports:");
        println!("  Delivery delays: {}", self.delivery_delays.len());
        println!("  Topic delay lists: {}", self.topic_delays.len());
        println!(
            "  Transient hosts sampled: {} ({} unsupported queries)",
            self.transient.len(),
            self.transient_unsupported
        );
        println!();
    }

    /// Write every report into `dir`, one file each
    pub fn write_reports(&self, dir: &Path) -> Result<(), StatsError> {
        std::fs::create_dir_all(dir)?;

        let mut file = ReportFile::create(dir.join("message_stats.txt"))?;
        write_final_report(file.writer(), &self.report)?;
        file.flush()?;

        let mut file = ReportFile::create(dir.join("delivery_delay.txt"))?;
        write_delivery_delays(file.writer(), &self.delivery_delays)?;
        file.flush()?;

        let mut file = ReportFile::create(dir.join("topic_delay.txt"))?;
        write_topic_delays(file.writer(), &self.topic_delays)?;
        file.flush()?;

        let mut file = ReportFile::create(dir.join("transient.txt"))?;
        write_transient(file.writer(), &self.transient)?;
        file.flush()
    }
}
