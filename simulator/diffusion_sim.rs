//! Diffusion Simulation Example
//!
//! Run with: cargo run --example diffusion_sim

mod diffusion;

use diffusion::{DiffusionRunner, DiffusionSimConfig, NetworkConfig, SimResult, TrafficConfig};
use dtn_stats::dtn_report_writer::write_diffusion;
use dtn_stats::{DiffusionConfig, StatsConfig};
use log::info;
use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new().init().unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║        Diffusion Simulator                             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    info!("Setting up diffusion simulation...");

    // Configure simulation
    let config = DiffusionSimConfig {
        rounds: 3000,
        tick_duration: 10.0,
        num_hosts: 40,
        seed: None, // Will be auto-generated
        warmup_time: 2000.0,

        traffic: TrafficConfig {
            message_interval: 30,
            spread_fraction: 0.5,
            response_fraction: 0.2,
            ..Default::default()
        },

        network: NetworkConfig {
            contact_probability: 0.15,
            abort_probability: 0.05,
            buffer_capacity: 25,
            ttl: 8000.0,
            transient_support: 0.8,
        },

        stats: StatsConfig {
            diffusion: DiffusionConfig {
                step_size: 0.3,
                ..Default::default()
            },
        },

        ..Default::default()
    };

    info!("Configuration:");
    info!("  Hosts: {}", config.num_hosts);
    info!("  Rounds: {}", config.rounds);
    info!("  Message interval: {}", config.traffic.message_interval);
    info!("  Contact probability: {}", config.network.contact_probability);
    info!("");

    info!("Starting simulation...");

    let runner = DiffusionRunner::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    let result: SimResult = runner.run();

    // Display results
    result.print_summary();

    if let Ok(lines) = &result.report.diffusion {
        println!("First tracked messages:");
        let mut out = std::io::stdout().lock();
        if let Err(e) = write_diffusion(&mut out, &lines[..lines.len().min(10)]) {
            eprintln!("Failed to print diffusion lines: {}", e);
        }
    }

    info!("✓ Simulation complete!");
}
