//! Diffusion simulator module
//!
//! Drives the statistics listeners with a small epidemic simulation:
//! - Hosts meeting random peers each round
//! - Epidemic forwarding with bounded buffers and message TTL
//! - Request / response traffic and per-topic subscriptions
//! - A warm-up window whose messages stay out of the reports

pub mod config;
pub mod runner;
pub mod stats;

pub use config::{DiffusionSimConfig, NetworkConfig, TrafficConfig};
pub use runner::DiffusionRunner;
pub use stats::SimResult;
