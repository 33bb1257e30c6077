//! Message Statistics Aggregator
//!
//! Consumes the message lifecycle event stream of one simulation run and
//! accumulates delivery statistics (latency, hop count, buffer residency,
//! round-trip time and the event counters) alongside per-message diffusion
//! latencies. The engine pushes events in simulated-time order; the
//! aggregator never reorders or defers them. `done()` finalizes once.
//!
//! Messages created during warm-up are ignored for the rest of the run.

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::dtn_diffusion::{DiffusionConfig, DiffusionLine, DiffusionTracker};
use crate::dtn_error::StatsError;
use crate::dtn_interface::{
    HostId, Message, MessageEvent, MessageId, MessageKind, MessageListener, SimContext, SimTime,
};
use crate::dtn_summary::{average, average_count, max, median, median_count, min, ratio};
use crate::dtn_warmup::WarmupFilter;

/// Configuration for the statistics aggregator
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub diffusion: DiffusionConfig,
}

/// What the aggregator remembers about a created message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub kind: MessageKind,
    pub creation_time: SimTime,
    pub is_response: bool,
    pub request_creation_time: Option<SimTime>,
    pub response_size: u64,
    /// Set on first delivery
    pub hop_count: Option<usize>,
}

/// Event counters; only ever incremented
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageCounters {
    pub created: usize,
    pub started: usize,
    pub relayed: usize,
    pub aborted: usize,
    pub dropped: usize,
    pub removed: usize,
    pub delivered: usize,
    pub response_created: usize,
    pub response_delivered: usize,
}

/// Append-only measurement sequences
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageSequences {
    pub latencies: Vec<SimTime>,
    pub hop_counts: Vec<usize>,
    pub buffer_times: Vec<SimTime>,
    pub round_trip_times: Vec<SimTime>,
}

/// Aggregate report; `None` marks an undefined value
#[derive(Debug, Clone, PartialEq)]
pub struct MessageStatsSummary {
    pub counters: MessageCounters,

    pub delivery_prob: Option<f64>,
    pub response_prob: Option<f64>,
    pub overhead_ratio: Option<f64>,

    pub latency_avg: Option<f64>,
    pub latency_median: Option<f64>,
    pub latency_min: Option<f64>,
    pub latency_max: Option<f64>,

    pub hop_count_avg: Option<f64>,
    pub hop_count_median: Option<usize>,

    pub buffertime_avg: Option<f64>,
    pub buffertime_median: Option<f64>,

    pub rtt_avg: Option<f64>,
    pub rtt_median: Option<f64>,
}

impl MessageStatsSummary {
    pub fn from_stats(counters: &MessageCounters, sequences: &MessageSequences) -> Self {
        let delivered = counters.delivered as f64;

        Self {
            counters: counters.clone(),
            delivery_prob: ratio(delivered, counters.created as f64),
            response_prob: ratio(
                counters.response_delivered as f64,
                counters.response_created as f64,
            ),
            overhead_ratio: ratio(counters.relayed as f64 - delivered, delivered),
            latency_avg: average(&sequences.latencies),
            latency_median: median(&sequences.latencies),
            latency_min: min(&sequences.latencies),
            latency_max: max(&sequences.latencies),
            hop_count_avg: average_count(&sequences.hop_counts),
            hop_count_median: median_count(&sequences.hop_counts),
            buffertime_avg: average(&sequences.buffer_times),
            buffertime_median: median(&sequences.buffer_times),
            rtt_avg: average(&sequences.round_trip_times),
            rtt_median: median(&sequences.round_trip_times),
        }
    }
}

/// Output of finalization
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    /// Per-message diffusion latencies in first-registration order, or the
    /// configuration problem that made coverage undefined
    pub diffusion: Result<Vec<DiffusionLine>, StatsError>,

    pub summary: MessageStatsSummary,
}

/// Read-only view of the accumulated state
pub struct StatsSnapshot<'a> {
    pub diffusion: &'a DiffusionTracker,
    pub records: &'a IndexMap<MessageId, MessageRecord>,
    pub counters: &'a MessageCounters,
    pub sequences: &'a MessageSequences,
}

pub struct MessageStatsAggregator {
    warmup: WarmupFilter,
    diffusion: DiffusionTracker,
    records: IndexMap<MessageId, MessageRecord>,
    counters: MessageCounters,
    sequences: MessageSequences,

    /// Population size, fixed once the engine reports a non-empty one
    total_hosts: Option<usize>,

    report: Option<FinalReport>,
}

impl MessageStatsAggregator {
    pub fn new(config: StatsConfig) -> Result<Self, StatsError> {
        Ok(Self {
            warmup: WarmupFilter::new(),
            diffusion: DiffusionTracker::new(config.diffusion)?,
            records: IndexMap::new(),
            counters: MessageCounters::default(),
            sequences: MessageSequences::default(),
            total_hosts: None,
            report: None,
        })
    }

    pub fn is_warmup_id(&self, id: &str) -> bool {
        self.warmup.is_warmup_id(id)
    }

    pub fn counters(&self) -> &MessageCounters {
        &self.counters
    }

    pub fn sequences(&self) -> &MessageSequences {
        &self.sequences
    }

    pub fn record(&self, id: &str) -> Option<&MessageRecord> {
        self.records.get(id)
    }

    pub fn snapshot(&self) -> StatsSnapshot<'_> {
        StatsSnapshot {
            diffusion: &self.diffusion,
            records: &self.records,
            counters: &self.counters,
            sequences: &self.sequences,
        }
    }

    fn creation_time(&self, id: &str) -> Option<SimTime> {
        self.records.get(id).map(|r| r.creation_time)
    }

    fn total_hosts(&mut self, ctx: &dyn SimContext) -> Option<usize> {
        if self.total_hosts.is_none() {
            self.total_hosts = ctx.host_count().filter(|&n| n > 0);
        }
        self.total_hosts.or_else(|| ctx.host_count())
    }

    pub fn on_created(&mut self, ctx: &dyn SimContext, m: &Message) {
        if self.warmup.admit_created(ctx, &m.id) {
            return;
        }
        if self.records.contains_key(&m.id) {
            debug!("message {} created twice, keeping first record", m.id);
            return;
        }

        self.records.insert(
            m.id.clone(),
            MessageRecord {
                id: m.id.clone(),
                kind: m.kind,
                creation_time: ctx.sim_time(),
                is_response: m.is_response(),
                request_creation_time: m.request.as_ref().map(|r| r.creation_time),
                response_size: m.response_size,
                hop_count: None,
            },
        );
        self.counters.created += 1;
        if m.response_size > 0 {
            self.counters.response_created += 1;
        }
    }

    pub fn on_transfer_started(&mut self, m: &Message, _from: HostId, _to: HostId) {
        if self.warmup.is_warmup_id(&m.id) {
            return;
        }
        self.counters.started += 1;
    }

    pub fn on_transfer_aborted(&mut self, m: &Message, _from: HostId, _to: HostId) {
        if self.warmup.is_warmup_id(&m.id) {
            return;
        }
        self.counters.aborted += 1;
    }

    pub fn on_deleted(&mut self, ctx: &dyn SimContext, m: &Message, _at: HostId, dropped: bool) {
        if self.warmup.is_warmup_id(&m.id) {
            return;
        }

        if dropped {
            self.counters.dropped += 1;
        } else {
            self.counters.removed += 1;
        }
        self.sequences
            .buffer_times
            .push(ctx.sim_time() - m.receive_time);
    }

    pub fn on_transferred(
        &mut self,
        ctx: &dyn SimContext,
        m: &Message,
        _from: HostId,
        to: HostId,
        final_target: bool,
    ) {
        if self.warmup.is_warmup_id(&m.id) {
            return;
        }

        let now = ctx.sim_time();
        let created = self.creation_time(&m.id);
        self.counters.relayed += 1;

        if self.diffusion.follows(m.kind) {
            let total_hosts = self.total_hosts(ctx);
            match self
                .diffusion
                .record_transfer(&m.id, to, now, created, total_hosts)
            {
                Ok(Some(latency)) => debug!("{} crossed threshold after {}", m.id, latency),
                Ok(None) => {}
                Err(e) => debug!("diffusion crossing skipped: {}", e),
            }
        }

        if !final_target {
            return;
        }

        match created {
            Some(created) => self.sequences.latencies.push(now - created),
            None => debug!(
                "latency skipped: {}",
                StatsError::MissingCreationRecord { id: m.id.clone() }
            ),
        }
        self.counters.delivered += 1;
        self.sequences.hop_counts.push(m.hop_count());
        if let Some(record) = self.records.get_mut(&m.id) {
            record.hop_count.get_or_insert(m.hop_count());
        }

        if let Some(request) = &m.request {
            self.sequences
                .round_trip_times
                .push(now - request.creation_time);
            self.counters.response_delivered += 1;
        }
    }

    /// Finalize the run. Later calls return the same report.
    pub fn done(&mut self, ctx: &dyn SimContext) -> FinalReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        let diffusion = self.diffusion.lines();
        if let Err(e) = &diffusion {
            warn!(
                "diffusion report unavailable ({} hosts reported): {}",
                ctx.host_count().unwrap_or(0),
                e
            );
        }

        let summary = MessageStatsSummary::from_stats(&self.counters, &self.sequences);
        info!(
            "message stats done at {}: created {} delivered {} relayed {} ({} warm-up messages ignored, {} tracked for diffusion)",
            ctx.sim_time(),
            summary.counters.created,
            summary.counters.delivered,
            summary.counters.relayed,
            self.warmup.len(),
            self.diffusion.len()
        );

        let report = FinalReport { diffusion, summary };
        self.report = Some(report.clone());
        report
    }
}

impl MessageListener for MessageStatsAggregator {
    fn on_event(&mut self, ctx: &dyn SimContext, event: MessageEvent<'_>) {
        match event {
            MessageEvent::Created { message } => self.on_created(ctx, message),
            MessageEvent::TransferStarted { message, from, to } => {
                self.on_transfer_started(message, from, to)
            }
            MessageEvent::TransferAborted { message, from, to } => {
                self.on_transfer_aborted(message, from, to)
            }
            MessageEvent::Transferred {
                message,
                from,
                to,
                final_target,
            } => self.on_transferred(ctx, message, from, to, final_target),
            MessageEvent::Deleted {
                message,
                at,
                dropped,
            } => self.on_deleted(ctx, message, at, dropped),
        }
    }
}
