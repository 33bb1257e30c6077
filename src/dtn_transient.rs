//! Transient sampling report
//!
//! Periodically samples per-host transient values exposed by the routing
//! layer. Only routers implementing [`TransientSource`] can be sampled; the
//! engine hands the capability out through [`SimContext::transient_source`]
//! and returns `None` for routers without it.
//!
//! [`TransientSource`]: crate::dtn_interface::TransientSource
//! [`SimContext::transient_source`]: crate::dtn_interface::SimContext::transient_source

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dtn_interface::{HostId, SimContext, SimTime, UpdateListener};

/// Configuration for transient sampling
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct TransientConfig {
    /// Simulated time between samples
    pub interval: SimTime,

    /// Number of hosts to follow
    pub sample_size: usize,

    pub seed: u64,
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self {
            interval: 6000.0,
            sample_size: 5,
            seed: 0,
        }
    }
}

pub type TransientSample = BTreeMap<String, f64>;

pub struct TransientReport {
    interval: SimTime,
    last_record: SimTime,

    /// Sampled hosts, in sampling order
    samples: IndexMap<HostId, Vec<TransientSample>>,

    /// Sampled hosts whose router lacks the capability, counted per query
    unsupported_queries: usize,
}

impl TransientReport {
    /// Pick up to `sample_size` distinct hosts from `hosts` to follow
    pub fn new(config: TransientConfig, hosts: &[HostId]) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let samples = hosts
            .choose_multiple(&mut rng, config.sample_size)
            .map(|&h| (h, Vec::new()))
            .collect();

        Self {
            interval: config.interval,
            last_record: 0.0,
            samples,
            unsupported_queries: 0,
        }
    }

    pub fn sampled_hosts(&self) -> impl Iterator<Item = HostId> + '_ {
        self.samples.keys().copied()
    }

    pub fn unsupported_queries(&self) -> usize {
        self.unsupported_queries
    }

    pub fn done(&self) -> &IndexMap<HostId, Vec<TransientSample>> {
        &self.samples
    }
}

impl UpdateListener for TransientReport {
    fn updated(&mut self, ctx: &dyn SimContext, hosts: &[HostId]) {
        let now = ctx.sim_time();
        if now - self.last_record < self.interval {
            return;
        }
        self.last_record = now;

        for host in hosts {
            let Some(samples) = self.samples.get_mut(host) else {
                continue;
            };
            match ctx.transient_source(*host) {
                Some(source) => samples.push(source.transient()),
                None => {
                    log::debug!("host {} router has no transient values", host);
                    self.unsupported_queries += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtn_interface::TransientSource;
    use std::cell::Cell;

    struct Fixed(f64);

    impl TransientSource for Fixed {
        fn transient(&self) -> TransientSample {
            let mut m = BTreeMap::new();
            m.insert("load".to_string(), self.0);
            m
        }
    }

    struct Ctx {
        now: Cell<SimTime>,
        source: Fixed,
    }

    impl SimContext for Ctx {
        fn sim_time(&self) -> SimTime {
            self.now.get()
        }

        fn host_count(&self) -> Option<usize> {
            Some(4)
        }

        fn is_warmup(&self) -> bool {
            false
        }

        // odd hosts run a router with the capability
        fn transient_source(&self, host: HostId) -> Option<&dyn TransientSource> {
            if host % 2 == 1 {
                Some(&self.source)
            } else {
                None
            }
        }
    }

    #[test]
    fn test_samples_distinct_hosts() {
        let hosts: Vec<HostId> = (0..20).collect();
        let report = TransientReport::new(TransientConfig::default(), &hosts);

        let mut picked: Vec<_> = report.sampled_hosts().collect();
        assert_eq!(picked.len(), 5);
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let hosts: Vec<HostId> = (0..50).collect();
        let a: Vec<_> = TransientReport::new(TransientConfig::default(), &hosts)
            .sampled_hosts()
            .collect();
        let b: Vec<_> = TransientReport::new(TransientConfig::default(), &hosts)
            .sampled_hosts()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interval_and_capability() {
        let hosts: Vec<HostId> = vec![0, 1, 2, 3];
        let config = TransientConfig {
            interval: 100.0,
            sample_size: 4,
            seed: 7,
        };
        let mut report = TransientReport::new(config, &hosts);
        let ctx = Ctx {
            now: Cell::new(50.0),
            source: Fixed(0.5),
        };

        // before the first interval elapses
        report.updated(&ctx, &hosts);
        assert!(report.done().values().all(|s| s.is_empty()));

        ctx.now.set(100.0);
        report.updated(&ctx, &hosts);
        ctx.now.set(150.0);
        report.updated(&ctx, &hosts);
        ctx.now.set(200.0);
        report.updated(&ctx, &hosts);

        let done = report.done();
        assert_eq!(done[&1].len(), 2);
        assert_eq!(done[&3][0]["load"], 0.5);
        assert!(done[&0].is_empty());
        assert_eq!(report.unsupported_queries(), 4);
    }
}
