//! # dtn_stats - Message Delivery & Diffusion Statistics
//!
//! Statistics listeners for opportunistic-network simulations. The simulation
//! engine pushes message lifecycle events (created, transfer started /
//! aborted / completed, deleted) and the listeners derive delivery and
//! diffusion metrics from them.
//!
//! ## Core Components
//!
//! - **MessageStatsAggregator**: delivery counters, latency / hop / buffer /
//!   round-trip sequences and per-message diffusion latencies
//! - **DiffusionTracker**: time for a message to reach successive fractions
//!   of the host population (30%, 60%, 90% by default)
//! - **WarmupFilter**: hides messages created during warm-up from every report
//! - **Delay / Transient reports**: lighter per-message and per-host reports
//!
//! ## Usage with a Simulation Engine
//!
//! The engine implements [`SimContext`] (clock, host population, warm-up
//! flag) and forwards each event to the listeners; at the end of the run it
//! calls `done()` once.
//!
//! ```
//! use dtn_stats::{
//!     Message, MessageEvent, MessageKind, MessageListener, MessageStatsAggregator,
//!     SimContext, SimTime, StatsConfig,
//! };
//!
//! struct Engine {
//!     now: SimTime,
//! }
//!
//! impl SimContext for Engine {
//!     fn sim_time(&self) -> SimTime {
//!         self.now
//!     }
//!     fn host_count(&self) -> Option<usize> {
//!         Some(10)
//!     }
//!     fn is_warmup(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let mut stats = MessageStatsAggregator::new(StatsConfig::default())?;
//! let engine = Engine { now: 0.0 };
//! let m = Message::new("M1", MessageKind::Direct, 0, 0.0);
//! stats.on_event(&engine, MessageEvent::Created { message: &m });
//!
//! let report = stats.done(&engine);
//! assert_eq!(report.summary.counters.created, 1);
//! assert_eq!(report.summary.latency_avg, None);
//! # Ok::<(), dtn_stats::StatsError>(())
//! ```
//!
//! ## Simulation
//!
//! A small epidemic simulator driving these listeners lives in
//! `simulator/` (see the `scenario_runner` binary).

pub mod dtn_delay_reports;
pub mod dtn_diffusion;
pub mod dtn_error;
pub mod dtn_interface;
pub mod dtn_message_stats;
pub mod dtn_report_writer;
pub mod dtn_summary;
pub mod dtn_transient;
pub mod dtn_warmup;

// Re-export commonly used types
pub use dtn_delay_reports::{DeliveryDelayReport, TopicDelayReport};
pub use dtn_diffusion::{DiffusionConfig, DiffusionFilter, DiffusionLine, DiffusionTracker};
pub use dtn_error::StatsError;
pub use dtn_interface::{
    HostId, Message, MessageEvent, MessageId, MessageKind, MessageListener, MultiListener,
    NoOpListener, RequestRef, SimContext, SimTime, TransientSource, UpdateListener,
};
pub use dtn_message_stats::{
    FinalReport, MessageCounters, MessageStatsAggregator, MessageStatsSummary, StatsConfig,
};
pub use dtn_transient::{TransientConfig, TransientReport};
pub use dtn_warmup::WarmupFilter;
