//! Configuration for the diffusion simulator

use dtn_stats::{StatsConfig, TransientConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Configuration for a diffusion simulation run
#[derive(Debug, Clone)]
pub struct DiffusionSimConfig {
    /// Number of simulation rounds
    pub rounds: usize,

    /// Simulated seconds per round
    pub tick_duration: f64,

    /// Number of hosts in the network
    pub num_hosts: usize,

    /// Random seed (None = generate random)
    pub seed: Option<[u8; 32]>,

    /// Messages created before this simulated time are excluded from reports
    pub warmup_time: f64,

    /// Message generation
    pub traffic: TrafficConfig,

    /// Contact and buffer model
    pub network: NetworkConfig,

    /// Statistics listener configuration
    pub stats: StatsConfig,

    /// Transient sampling configuration
    pub transient: TransientConfig,
}

impl Default for DiffusionSimConfig {
    fn default() -> Self {
        Self {
            rounds: 2000,
            tick_duration: 10.0,
            num_hosts: 50,
            seed: None,
            warmup_time: 1000.0,
            traffic: TrafficConfig::default(),
            network: NetworkConfig::default(),
            stats: StatsConfig::default(),
            transient: TransientConfig::default(),
        }
    }
}

impl DiffusionSimConfig {
    /// Get or generate seed
    pub fn resolve_seed(&self) -> [u8; 32] {
        self.seed.unwrap_or_else(|| {
            let mut temp_rng = StdRng::from_entropy();
            let mut seed = [0u8; 32];
            use rand::RngCore;
            temp_rng.fill_bytes(&mut seed);
            seed
        })
    }
}

/// Configuration for message generation
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// A new message every N rounds
    pub message_interval: usize,

    /// Fraction of messages meant to spread over the whole network
    pub spread_fraction: f64,

    /// Fraction of messages that request a response
    pub response_fraction: f64,

    /// Topics messages are tagged with
    pub topics: Vec<String>,

    /// Topics each host subscribes to
    pub interests_per_host: usize,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            message_interval: 25,
            spread_fraction: 0.5,
            response_fraction: 0.2,
            topics: vec!["news".into(), "traffic".into(), "weather".into()],
            interests_per_host: 1,
        }
    }
}

/// Contact and buffer model
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Probability that a host meets a random peer in a round
    pub contact_probability: f64,

    /// Probability that a started transfer is aborted
    pub abort_probability: f64,

    /// Messages a host buffers before evicting the oldest
    pub buffer_capacity: usize,

    /// Simulated seconds a message lives before being removed
    pub ttl: f64,

    /// Fraction of hosts whose router exposes transient values
    pub transient_support: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            contact_probability: 0.1,
            abort_probability: 0.05,
            buffer_capacity: 20,
            ttl: 6000.0,
            transient_support: 0.8,
        }
    }
}
