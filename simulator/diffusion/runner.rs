//! Diffusion simulation runner
//!
//! A toy epidemic engine: hosts meet random peers, exchange every buffered
//! message the peer has not seen yet and evict the oldest message when their
//! buffer overflows. Every step is reported to the statistics listeners.

use std::collections::BTreeMap;

use super::config::DiffusionSimConfig;
use super::stats::SimResult;
use dtn_stats::{
    DeliveryDelayReport, HostId, Message, MessageEvent, MessageId, MessageKind, MessageListener,
    MessageStatsAggregator, RequestRef, SimContext, SimTime, StatsError, TopicDelayReport,
    TransientReport, TransientSource, UpdateListener,
};
use hashbrown::{HashMap, HashSet};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Router-side load counters exposed as transient values
#[derive(Default)]
struct HostLoad {
    relayed: u64,
    buffered: usize,
}

impl TransientSource for HostLoad {
    fn transient(&self) -> BTreeMap<String, f64> {
        let mut values = BTreeMap::new();
        values.insert("relayed".to_string(), self.relayed as f64);
        values.insert("buffered".to_string(), self.buffered as f64);
        values
    }
}

struct SimHost {
    buffer: Vec<Message>,
    seen: HashSet<MessageId>,
    interests: Vec<String>,
    /// None when the router does not expose transient values
    load: Option<HostLoad>,
}

/// Engine state visible to listeners
struct World {
    clock: SimTime,
    warmup_time: SimTime,
    hosts: Vec<SimHost>,
}

impl SimContext for World {
    fn sim_time(&self) -> SimTime {
        self.clock
    }

    fn host_count(&self) -> Option<usize> {
        Some(self.hosts.len())
    }

    fn is_warmup(&self) -> bool {
        self.clock < self.warmup_time
    }

    fn host_interested(&self, host: HostId, topic: &str) -> bool {
        self.hosts
            .get(host as usize)
            .map_or(false, |h| h.interests.iter().any(|t| t == topic))
    }

    fn transient_source(&self, host: HostId) -> Option<&dyn TransientSource> {
        self.hosts
            .get(host as usize)
            .and_then(|h| h.load.as_ref())
            .map(|load| load as &dyn TransientSource)
    }
}

/// Message listeners fed by the runner
struct Listeners {
    stats: MessageStatsAggregator,
    delivery: DeliveryDelayReport,
    topic: TopicDelayReport,
}

impl MessageListener for Listeners {
    fn on_event(&mut self, ctx: &dyn SimContext, event: MessageEvent<'_>) {
        self.stats.on_event(ctx, event);
        self.delivery.on_event(ctx, event);
        self.topic.on_event(ctx, event);
    }
}

/// Diffusion simulation runner
pub struct DiffusionRunner {
    config: DiffusionSimConfig,
    rng: StdRng,
    seed: [u8; 32],

    world: World,
    host_ids: Vec<HostId>,
    listeners: Listeners,
    transient: TransientReport,

    destinations: HashMap<MessageId, HostId>,
    delivered: HashSet<MessageId>,
    message_counter: usize,
}

fn chance(rng: &mut StdRng, p: f64) -> bool {
    rng.gen_bool(p.clamp(0.0, 1.0))
}

impl DiffusionRunner {
    /// Create a new diffusion runner
    pub fn new(config: DiffusionSimConfig) -> Result<Self, StatsError> {
        let seed = config.resolve_seed();
        let mut rng = StdRng::from_seed(seed);

        let mut hosts = Vec::with_capacity(config.num_hosts);
        for _ in 0..config.num_hosts {
            let interests = config
                .traffic
                .topics
                .choose_multiple(&mut rng, config.traffic.interests_per_host)
                .cloned()
                .collect();
            let load = if chance(&mut rng, config.network.transient_support) {
                Some(HostLoad::default())
            } else {
                None
            };
            hosts.push(SimHost {
                buffer: Vec::new(),
                seen: HashSet::new(),
                interests,
                load,
            });
        }
        let host_ids: Vec<HostId> = (0..config.num_hosts as HostId).collect();

        let listeners = Listeners {
            stats: MessageStatsAggregator::new(config.stats.clone())?,
            delivery: DeliveryDelayReport::new(),
            topic: TopicDelayReport::new(),
        };
        let transient = TransientReport::new(config.transient.clone(), &host_ids);

        Ok(Self {
            world: World {
                clock: 0.0,
                warmup_time: config.warmup_time,
                hosts,
            },
            config,
            rng,
            seed,
            host_ids,
            listeners,
            transient,
            destinations: HashMap::new(),
            delivered: HashSet::new(),
            message_counter: 0,
        })
    }

    /// Main simulation loop
    pub fn run(mut self) -> SimResult {
        info!(
            "running {} rounds over {} hosts",
            self.config.rounds, self.config.num_hosts
        );

        let interval = self.config.traffic.message_interval.max(1);
        for round in 0..self.config.rounds {
            self.world.clock = (round + 1) as f64 * self.config.tick_duration;

            if round % interval == 0 {
                self.create_message();
            }
            self.expire_messages();
            self.exchange();

            for host in &mut self.world.hosts {
                let buffered = host.buffer.len();
                if let Some(load) = host.load.as_mut() {
                    load.buffered = buffered;
                }
            }
            self.transient.updated(&self.world, &self.host_ids);

            if round % 500 == 0 && round > 0 {
                info!("round {}/{}", round, self.config.rounds);
            }
        }

        let report = self.listeners.stats.done(&self.world);

        SimResult {
            seed_used: self.seed,
            rounds_completed: self.config.rounds,
            end_time: self.world.clock,
            report,
            delivery_delays: self.listeners.delivery.done().to_vec(),
            topic_delays: self.listeners.topic.done(),
            transient: self.transient.done().clone(),
            transient_unsupported: self.transient.unsupported_queries(),
        }
    }

    fn emit(world: &World, listeners: &mut Listeners, event: MessageEvent<'_>) {
        listeners.on_event(world, event);
    }

    fn random_other(&mut self, host: usize) -> usize {
        let n = self.world.hosts.len();
        let other = self.rng.gen_range(0..n - 1);
        if other >= host {
            other + 1
        } else {
            other
        }
    }

    fn create_message(&mut self) {
        if self.world.hosts.len() < 2 {
            return;
        }

        let source = self.rng.gen_range(0..self.world.hosts.len());
        let destination = self.random_other(source);
        self.message_counter += 1;

        let kind = if chance(&mut self.rng, self.config.traffic.spread_fraction) {
            MessageKind::Spread
        } else {
            MessageKind::Direct
        };
        let mut m = Message::new(
            format!("M{}", self.message_counter),
            kind,
            source as HostId,
            self.world.clock,
        );
        m.topic = self.config.traffic.topics.choose(&mut self.rng).cloned();
        if chance(&mut self.rng, self.config.traffic.response_fraction) {
            m.response_size = 1;
        }

        self.destinations.insert(m.id.clone(), destination as HostId);
        Self::emit(
            &self.world,
            &mut self.listeners,
            MessageEvent::Created { message: &m },
        );
        self.store(source, m);
    }

    fn create_response(&mut self, request: &Message, at: HostId) {
        self.message_counter += 1;

        let mut r = Message::new(
            format!("R{}", self.message_counter),
            MessageKind::Direct,
            at,
            self.world.clock,
        );
        r.topic = request.topic.clone();
        r.request = Some(RequestRef {
            id: request.id.clone(),
            creation_time: request.creation_time,
        });

        self.destinations.insert(r.id.clone(), request.hops[0]);
        Self::emit(
            &self.world,
            &mut self.listeners,
            MessageEvent::Created { message: &r },
        );
        self.store(at as usize, r);
    }

    /// Buffer `m` at `host`, evicting the oldest message on overflow
    fn store(&mut self, host: usize, m: Message) {
        let capacity = self.config.network.buffer_capacity.max(1);
        let evicted = {
            let h = &mut self.world.hosts[host];
            h.seen.insert(m.id.clone());
            h.buffer.push(m);
            if h.buffer.len() > capacity {
                Some(h.buffer.remove(0))
            } else {
                None
            }
        };

        if let Some(old) = evicted {
            debug!("host {} buffer full, dropping {}", host, old.id);
            Self::emit(
                &self.world,
                &mut self.listeners,
                MessageEvent::Deleted {
                    message: &old,
                    at: host as HostId,
                    dropped: true,
                },
            );
        }
    }

    fn expire_messages(&mut self) {
        let now = self.world.clock;
        let ttl = self.config.network.ttl;

        let mut expired = Vec::new();
        for (i, host) in self.world.hosts.iter_mut().enumerate() {
            let (keep, old): (Vec<_>, Vec<_>) = host
                .buffer
                .drain(..)
                .partition(|m| now - m.creation_time <= ttl);
            host.buffer = keep;
            expired.extend(old.into_iter().map(|m| (i as HostId, m)));
        }

        for (at, m) in &expired {
            Self::emit(
                &self.world,
                &mut self.listeners,
                MessageEvent::Deleted {
                    message: m,
                    at: *at,
                    dropped: false,
                },
            );
        }
    }

    fn exchange(&mut self) {
        let n = self.world.hosts.len();
        if n < 2 {
            return;
        }

        let mut contacts = Vec::new();
        for a in 0..n {
            if chance(&mut self.rng, self.config.network.contact_probability) {
                let b = self.random_other(a);
                contacts.push((a, b));
            }
        }

        for (a, b) in contacts {
            self.transfer_all(a, b);
        }
    }

    /// Offer every message `from` holds that `to` has not seen
    fn transfer_all(&mut self, from: usize, to: usize) {
        let candidates: Vec<Message> = self.world.hosts[from]
            .buffer
            .iter()
            .filter(|m| !self.world.hosts[to].seen.contains(&m.id))
            .cloned()
            .collect();

        let (from_id, to_id) = (from as HostId, to as HostId);
        for m in candidates {
            Self::emit(
                &self.world,
                &mut self.listeners,
                MessageEvent::TransferStarted {
                    message: &m,
                    from: from_id,
                    to: to_id,
                },
            );
            if chance(&mut self.rng, self.config.network.abort_probability) {
                Self::emit(
                    &self.world,
                    &mut self.listeners,
                    MessageEvent::TransferAborted {
                        message: &m,
                        from: from_id,
                        to: to_id,
                    },
                );
                continue;
            }

            // the event carries the sender's receive time; the new holder's is set afterwards
            let mut copy = m;
            copy.hops.push(to_id);
            let at_destination = self.destinations.get(&copy.id) == Some(&to_id);
            let final_target = at_destination && self.delivered.insert(copy.id.clone());

            Self::emit(
                &self.world,
                &mut self.listeners,
                MessageEvent::Transferred {
                    message: &copy,
                    from: from_id,
                    to: to_id,
                    final_target,
                },
            );
            if let Some(load) = self.world.hosts[from].load.as_mut() {
                load.relayed += 1;
            }
            copy.receive_time = self.world.clock;

            if at_destination {
                self.world.hosts[to].seen.insert(copy.id.clone());
                if final_target && copy.response_size > 0 {
                    self.create_response(&copy, to_id);
                }
            } else {
                self.store(to, copy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffusion::config::{NetworkConfig, TrafficConfig};

    fn small_config() -> DiffusionSimConfig {
        DiffusionSimConfig {
            rounds: 300,
            tick_duration: 10.0,
            num_hosts: 10,
            seed: Some([7u8; 32]),
            warmup_time: 100.0,
            traffic: TrafficConfig {
                message_interval: 10,
                ..Default::default()
            },
            network: NetworkConfig {
                contact_probability: 0.3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_run_is_reproducible() {
        let a = DiffusionRunner::new(small_config()).unwrap().run();
        let b = DiffusionRunner::new(small_config()).unwrap().run();

        assert_eq!(a.report, b.report);
        assert_eq!(a.delivery_delays, b.delivery_delays);
    }

    #[test]
    fn test_run_produces_statistics() {
        let result = DiffusionRunner::new(small_config()).unwrap().run();
        let s = &result.report.summary;

        assert!(s.counters.created > 0);
        assert!(s.counters.relayed > 0);
        assert!(s.counters.delivered <= s.counters.created);

        // the round-0 message falls into warm-up
        assert!(result.delivery_delays.iter().all(|d| d.id != "M1"));

        let lines = result.report.diffusion.as_ref().unwrap();
        assert!(lines.iter().all(|l| l.id != "M1"));
        assert!(lines.iter().all(|l| l.latencies.len() <= 4));
    }
}
