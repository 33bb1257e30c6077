//! Diffusion-threshold tracking
//!
//! Follows how far each message has spread through the host population and
//! records the simulated time (relative to creation) at which its coverage
//! moves another `step_size` past the last recorded anchor.
//!
//! Anchor rule: the first crossing pins the anchor to `step_size` itself,
//! every later crossing moves it to the coverage actually reached. Results
//! are compared across runs, so this rule must stay as it is.

use hashbrown::HashSet;
use indexmap::IndexMap;

use crate::dtn_error::StatsError;
use crate::dtn_interface::{HostId, MessageId, MessageKind, SimTime};

pub const DEFAULT_STEP_SIZE: f64 = 0.3;

// coverage is a ratio of small integers; absorbs float error such as 0.7 - 0.4 < 0.3
const COVERAGE_EPSILON: f64 = 1e-9;

/// Which messages the tracker follows
#[derive(Copy, Clone, Debug, PartialEq, Default, serde::Deserialize)]
pub enum DiffusionFilter {
    #[default]
    All,
    Only(MessageKind),
}

impl DiffusionFilter {
    pub fn accepts(&self, kind: MessageKind) -> bool {
        match self {
            DiffusionFilter::All => true,
            DiffusionFilter::Only(k) => *k == kind,
        }
    }
}

/// Configuration for diffusion tracking
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    /// Coverage increment that triggers a latency record (0.0 < step <= 1.0)
    pub step_size: f64,

    pub filter: DiffusionFilter,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            filter: DiffusionFilter::All,
        }
    }
}

impl DiffusionConfig {
    pub fn validate(&self) -> Result<(), StatsError> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 || self.step_size > 1.0 {
            return Err(StatsError::Configuration(format!(
                "step size must be in (0, 1], got {}",
                self.step_size
            )));
        }
        Ok(())
    }

    /// Upper bound on crossings a single message can record
    pub fn max_crossings(&self) -> usize {
        (1.0 / self.step_size).ceil() as usize
    }
}

/// Spread state of one message
#[derive(Debug, Clone)]
pub struct DiffusionEntry {
    reached_hosts: HashSet<HostId>,
    anchor: f64,
    latencies: Vec<SimTime>,
}

impl DiffusionEntry {
    fn new(first: HostId) -> Self {
        let mut reached_hosts = HashSet::new();
        reached_hosts.insert(first);
        Self {
            reached_hosts,
            anchor: 0.0,
            latencies: Vec::new(),
        }
    }

    pub fn reached(&self) -> usize {
        self.reached_hosts.len()
    }

    pub fn has_reached(&self, host: HostId) -> bool {
        self.reached_hosts.contains(&host)
    }

    /// Coverage level the next crossing is measured against
    pub fn anchor(&self) -> f64 {
        self.anchor
    }

    pub fn latencies(&self) -> &[SimTime] {
        &self.latencies
    }
}

/// Finalized diffusion output for one message
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionLine {
    pub id: MessageId,
    pub latencies: Vec<SimTime>,
}

pub struct DiffusionTracker {
    config: DiffusionConfig,

    /// In first-registration order
    entries: IndexMap<MessageId, DiffusionEntry>,

    /// Set when coverage was needed while the host population was unknown or zero
    population_missing: bool,
}

impl DiffusionTracker {
    pub fn new(config: DiffusionConfig) -> Result<Self, StatsError> {
        config.validate()?;
        Ok(Self {
            config,
            entries: IndexMap::new(),
            population_missing: false,
        })
    }

    pub fn config(&self) -> &DiffusionConfig {
        &self.config
    }

    pub fn follows(&self, kind: MessageKind) -> bool {
        self.config.filter.accepts(kind)
    }

    /// Register that message `id` reached host `to` at `now`.
    ///
    /// Returns the latency recorded by this transfer, if any. A crossing that
    /// cannot be timed because the creation time is unknown is skipped and
    /// reported as `MissingCreationRecord`; the entry is left untouched.
    pub fn record_transfer(
        &mut self,
        id: &str,
        to: HostId,
        now: SimTime,
        creation_time: Option<SimTime>,
        total_hosts: Option<usize>,
    ) -> Result<Option<SimTime>, StatsError> {
        let step = self.config.step_size;

        let entry = match self.entries.get_mut(id) {
            Some(entry) => entry,
            None => {
                self.entries.insert(id.to_owned(), DiffusionEntry::new(to));
                return Ok(None);
            }
        };

        if !entry.reached_hosts.insert(to) {
            return Ok(None);
        }

        let total = match total_hosts {
            Some(n) if n > 0 => n,
            _ => {
                self.population_missing = true;
                return Ok(None);
            }
        };

        let coverage = entry.reached_hosts.len() as f64 / total as f64;
        if coverage - entry.anchor < step - COVERAGE_EPSILON {
            return Ok(None);
        }

        let created = creation_time.ok_or_else(|| StatsError::MissingCreationRecord {
            id: id.to_owned(),
        })?;

        let latency = now - created;
        entry.anchor = if entry.latencies.is_empty() {
            step
        } else {
            coverage
        };
        entry.latencies.push(latency);
        debug_assert!(entry.latencies.len() <= self.config.max_crossings());

        Ok(Some(latency))
    }

    pub fn entry(&self, id: &str) -> Option<&DiffusionEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MessageId, &DiffusionEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-message latency lists, in first-registration order.
    ///
    /// Fails if coverage ever had to be computed without a usable host population.
    pub fn lines(&self) -> Result<Vec<DiffusionLine>, StatsError> {
        if self.population_missing {
            return Err(StatsError::Configuration(
                "host population unknown or zero, diffusion coverage undefined".into(),
            ));
        }

        Ok(self
            .entries
            .iter()
            .map(|(id, entry)| DiffusionLine {
                id: id.clone(),
                latencies: entry.latencies.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(step_size: f64) -> DiffusionTracker {
        DiffusionTracker::new(DiffusionConfig {
            step_size,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_thresholds_at_30_60_90_percent() {
        let mut t = tracker(0.3);

        for host in 1..=9u64 {
            t.record_transfer("M", host, host as f64, Some(0.0), Some(10))
                .unwrap();
        }

        let entry = t.entry("M").unwrap();
        assert_eq!(entry.latencies(), &[3.0, 6.0, 9.0]);
        assert_eq!(entry.reached(), 9);
        assert!((entry.anchor() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_first_crossing_pins_anchor_to_step() {
        let mut t = tracker(0.3);

        // 4 hosts: first sighting at 25%, crossing at 50%
        t.record_transfer("M", 1, 1.0, Some(0.0), Some(4)).unwrap();
        let recorded = t.record_transfer("M", 2, 2.0, Some(0.0), Some(4)).unwrap();

        assert_eq!(recorded, Some(2.0));
        assert_eq!(t.entry("M").unwrap().anchor(), 0.3);

        // 75% - 30% >= 30%: crosses again, anchor now follows coverage
        let recorded = t.record_transfer("M", 3, 3.0, Some(0.0), Some(4)).unwrap();
        assert_eq!(recorded, Some(3.0));
        assert_eq!(t.entry("M").unwrap().anchor(), 0.75);

        // 100% - 75% < 30%
        let recorded = t.record_transfer("M", 4, 4.0, Some(0.0), Some(4)).unwrap();
        assert_eq!(recorded, None);
    }

    #[test]
    fn test_first_sighting_records_nothing() {
        let mut t = tracker(0.3);

        // a single host is already the full population
        let recorded = t.record_transfer("M", 1, 5.0, Some(0.0), Some(1)).unwrap();

        assert_eq!(recorded, None);
        assert!(t.entry("M").unwrap().latencies().is_empty());
    }

    #[test]
    fn test_readding_host_is_idempotent() {
        let mut t = tracker(0.3);
        t.record_transfer("M", 1, 1.0, Some(0.0), Some(2)).unwrap();
        t.record_transfer("M", 2, 2.0, Some(0.0), Some(2)).unwrap();
        assert_eq!(t.entry("M").unwrap().latencies().len(), 1);

        for time in 3..10 {
            let recorded = t
                .record_transfer("M", 2, time as f64, Some(0.0), Some(2))
                .unwrap();
            assert_eq!(recorded, None);
        }

        let entry = t.entry("M").unwrap();
        assert_eq!(entry.reached(), 2);
        assert_eq!(entry.latencies(), &[2.0]);
    }

    #[test]
    fn test_zero_hosts_never_crosses() {
        let mut t = tracker(0.3);

        for host in 1..=20u64 {
            let recorded = t
                .record_transfer("M", host, host as f64, Some(0.0), Some(0))
                .unwrap();
            assert_eq!(recorded, None);
        }

        assert!(t.entry("M").unwrap().latencies().is_empty());
        assert!(matches!(t.lines(), Err(StatsError::Configuration(_))));
    }

    #[test]
    fn test_unknown_population_is_reported() {
        let mut t = tracker(0.3);
        t.record_transfer("M", 1, 1.0, Some(0.0), None).unwrap();
        assert!(t.lines().is_ok());

        t.record_transfer("M", 2, 2.0, Some(0.0), None).unwrap();
        assert!(t.lines().is_err());
    }

    #[test]
    fn test_missing_creation_skips_crossing() {
        let mut t = tracker(0.5);
        t.record_transfer("M", 1, 1.0, None, Some(2)).unwrap();

        let result = t.record_transfer("M", 2, 2.0, None, Some(2));
        assert_eq!(
            result,
            Err(StatsError::MissingCreationRecord { id: "M".into() })
        );

        // host counted, nothing recorded, anchor untouched
        let entry = t.entry("M").unwrap();
        assert_eq!(entry.reached(), 2);
        assert!(entry.latencies().is_empty());
        assert_eq!(entry.anchor(), 0.0);
    }

    #[test]
    fn test_crossings_bounded_by_step() {
        for &step in &[0.1, 0.25, 0.3, 0.5, 1.0] {
            let mut t = tracker(step);
            for host in 0..50u64 {
                t.record_transfer("M", host, host as f64, Some(0.0), Some(50))
                    .unwrap();
            }
            let max = t.config().max_crossings();
            assert!(t.entry("M").unwrap().latencies().len() <= max);
        }
    }

    #[test]
    fn test_lines_keep_registration_order() {
        let mut t = tracker(0.3);
        for id in ["Z", "A", "M", "B"] {
            t.record_transfer(id, 1, 1.0, Some(0.0), Some(10)).unwrap();
        }
        // re-registering does not move an entry
        t.record_transfer("A", 2, 2.0, Some(0.0), Some(10)).unwrap();

        let ids: Vec<_> = t.lines().unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["Z", "A", "M", "B"]);
    }

    #[test]
    fn test_invalid_step_size() {
        for step in [0.0, -0.3, 1.5, f64::NAN] {
            let config = DiffusionConfig {
                step_size: step,
                ..Default::default()
            };
            assert!(DiffusionTracker::new(config).is_err());
        }
    }

    #[test]
    fn test_filter() {
        assert!(DiffusionFilter::All.accepts(MessageKind::Direct));
        assert!(DiffusionFilter::Only(MessageKind::Spread).accepts(MessageKind::Spread));
        assert!(!DiffusionFilter::Only(MessageKind::Spread).accepts(MessageKind::Direct));
    }
}
