// Scenario Runner - Load and execute diffusion scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/epidemic.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/epidemic.yaml --seed 0x1234... --out reports/

mod diffusion;

use diffusion::{DiffusionRunner, DiffusionSimConfig};
use dtn_stats::{StatsConfig, TransientConfig};
use log::info;
use simple_logger::SimpleLogger;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Scenario file format
#[derive(Debug, serde::Deserialize)]
struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    meta: ScenarioMeta,

    /// Configuration overrides
    config: ScenarioConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
    hypothesis: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ScenarioConfig {
    // Core settings
    rounds: usize,
    num_hosts: usize,

    #[serde(default = "default_tick_duration")]
    tick_duration: f64,

    #[serde(default)]
    warmup_time: Option<f64>,

    // Traffic overrides (optional)
    #[serde(default)]
    traffic: Option<TrafficOverrides>,

    // Network overrides (optional)
    #[serde(default)]
    network: Option<NetworkOverrides>,

    // Listener configuration (optional, defaults otherwise)
    #[serde(default)]
    stats: Option<StatsConfig>,

    #[serde(default)]
    transient: Option<TransientConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct TrafficOverrides {
    message_interval: Option<usize>,
    spread_fraction: Option<f64>,
    response_fraction: Option<f64>,
    topics: Option<Vec<String>>,
    interests_per_host: Option<usize>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct NetworkOverrides {
    contact_probability: Option<f64>,
    abort_probability: Option<f64>,
    buffer_capacity: Option<usize>,
    ttl: Option<f64>,
    transient_support: Option<f64>,
}

fn default_tick_duration() -> f64 {
    10.0
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX] [--out DIR]",
            args[0]
        );
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/epidemic.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/epidemic.yaml --seed 0x123456...", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    // Parse optional flags
    let mut seed: Option<[u8; 32]> = None;
    let mut out: Option<PathBuf> = None;
    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match (flag.as_str(), rest.next()) {
            ("--seed", Some(value)) => seed = Some(parse_seed_hex(value)),
            ("--out", Some(value)) => out = Some(PathBuf::from(value)),
            _ => {
                eprintln!("Unknown or incomplete option: {}", flag);
                std::process::exit(1);
            }
        }
    }

    if path.is_file() {
        run_scenario_file(path, seed, out.as_deref());
    } else if path.is_dir() {
        run_scenario_directory(path, seed, out.as_deref());
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<[u8; 32]>, out: Option<&Path>) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("yaml")
                || path.extension().and_then(|s| s.to_str()) == Some("yml")
            {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                 ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!(
            "\n{}/{} Running: {}\n",
            i + 1,
            scenarios.len(),
            scenario_path.display()
        );
        // one report directory per scenario
        let scenario_out = out.map(|o| o.join(scenario_stem(scenario_path)));
        run_scenario_file(scenario_path, seed, scenario_out.as_deref());
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
}

fn scenario_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenario")
        .to_string()
}

fn run_scenario_file(path: &Path, seed: Option<[u8; 32]>, out: Option<&Path>) {
    println!("Loading scenario from: {}", path.display());

    // Load and parse YAML
    let yaml_content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let scenario: ScenarioFile = serde_yaml::from_str(&yaml_content).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", path.display(), e);
        std::process::exit(1);
    });

    // Print scenario header
    println!("\n╔════════════════════════════════════════════════════════╗");
    match scenario.meta.name {
        Some(ref name) => println!("║  {}", name),
        None => println!("║  Scenario: {}", scenario_stem(path)),
    }
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let config = build_config(scenario.config, seed);

    println!("Configuration:");
    println!("  Rounds: {}", config.rounds);
    println!("  Hosts: {}", config.num_hosts);
    println!("  Warm-up: {}s", config.warmup_time);
    println!(
        "  Message every {} rounds, contact probability {:.2}",
        config.traffic.message_interval, config.network.contact_probability
    );
    println!(
        "  Diffusion step: {:.0}%",
        config.stats.diffusion.step_size * 100.0
    );
    println!("\nStarting simulation...\n");

    let runner = DiffusionRunner::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid scenario {}: {}", path.display(), e);
        std::process::exit(1);
    });
    let result = runner.run();

    result.print_summary();

    if let Some(dir) = out {
        match result.write_reports(dir) {
            Ok(()) => info!("reports written to {}", dir.display()),
            Err(e) => {
                eprintln!("Failed to write reports to {}: {}", dir.display(), e);
                std::process::exit(1);
            }
        }
    }

    println!("\n✓ Scenario complete!\n");
}

fn build_config(scenario: ScenarioConfig, seed: Option<[u8; 32]>) -> DiffusionSimConfig {
    let mut config = DiffusionSimConfig::default();

    // Apply scenario config
    config.rounds = scenario.rounds;
    config.num_hosts = scenario.num_hosts;
    config.tick_duration = scenario.tick_duration;
    config.seed = seed;
    if let Some(v) = scenario.warmup_time {
        config.warmup_time = v;
    }
    if let Some(stats) = scenario.stats {
        config.stats = stats;
    }
    if let Some(transient) = scenario.transient {
        config.transient = transient;
    }

    // Apply traffic overrides
    if let Some(t) = scenario.traffic {
        if let Some(v) = t.message_interval {
            config.traffic.message_interval = v;
        }
        if let Some(v) = t.spread_fraction {
            config.traffic.spread_fraction = v;
        }
        if let Some(v) = t.response_fraction {
            config.traffic.response_fraction = v;
        }
        if let Some(v) = t.topics {
            config.traffic.topics = v;
        }
        if let Some(v) = t.interests_per_host {
            config.traffic.interests_per_host = v;
        }
    }

    // Apply network overrides
    if let Some(n) = scenario.network {
        if let Some(v) = n.contact_probability {
            config.network.contact_probability = v;
        }
        if let Some(v) = n.abort_probability {
            config.network.abort_probability = v;
        }
        if let Some(v) = n.buffer_capacity {
            config.network.buffer_capacity = v;
        }
        if let Some(v) = n.ttl {
            config.network.ttl = v;
        }
        if let Some(v) = n.transient_support {
            config.network.transient_support = v;
        }
    }

    config
}

fn parse_seed_hex(hex: &str) -> [u8; 32] {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut seed = [0u8; 32];

    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        if i >= 32 {
            break;
        }
        let byte = std::str::from_utf8(chunk)
            .ok()
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or_else(|| {
                eprintln!("Invalid hex seed: {}", hex);
                std::process::exit(1);
            });
        seed[i] = byte;
    }

    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtn_stats::{DiffusionFilter, MessageKind};

    #[test]
    fn test_parse_seed_hex() {
        let seed = parse_seed_hex("0x0102ff");
        assert_eq!(&seed[..3], &[1, 2, 255]);
        assert!(seed[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scenario_overrides() {
        let yaml = r#"
meta:
  name: Spread only
config:
  rounds: 100
  num_hosts: 30
  warmup_time: 50.0
  traffic:
    message_interval: 5
  network:
    buffer_capacity: 8
  stats:
    diffusion:
      step_size: 0.25
      filter: !Only Spread
"#;
        let scenario: ScenarioFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.meta.name.as_deref(), Some("Spread only"));

        let config = build_config(scenario.config, Some([1u8; 32]));
        assert_eq!(config.rounds, 100);
        assert_eq!(config.num_hosts, 30);
        assert_eq!(config.tick_duration, 10.0);
        assert_eq!(config.warmup_time, 50.0);
        assert_eq!(config.traffic.message_interval, 5);
        assert_eq!(config.network.buffer_capacity, 8);
        assert_eq!(config.stats.diffusion.step_size, 0.25);
        assert_eq!(
            config.stats.diffusion.filter,
            DiffusionFilter::Only(MessageKind::Spread)
        );
        // untouched sections keep their defaults
        assert_eq!(config.transient, TransientConfig::default());
        assert_eq!(config.seed, Some([1u8; 32]));
    }
}
