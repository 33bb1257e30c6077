//! Line-oriented text rendering of finalized reports

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dtn_delay_reports::{DeliveryDelay, TopicDelays};
use crate::dtn_diffusion::DiffusionLine;
use crate::dtn_error::StatsError;
use crate::dtn_interface::{HostId, SimTime};
use crate::dtn_message_stats::{FinalReport, MessageStatsSummary};
use crate::dtn_summary::fmt_stat;
use crate::dtn_transient::TransientSample;

pub const DIFFUSION_HEADER: &str = "Message ID\tLatency";
pub const DELAY_HEADER: &str = "Message ID\tDelay";

fn join_times(times: &[SimTime]) -> String {
    times
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn write_diffusion<W: Write>(w: &mut W, lines: &[DiffusionLine]) -> Result<(), StatsError> {
    writeln!(w, "{}", DIFFUSION_HEADER)?;
    for line in lines {
        writeln!(w, "{}\t{}", line.id, join_times(&line.latencies))?;
    }
    Ok(())
}

pub fn write_summary<W: Write>(w: &mut W, s: &MessageStatsSummary) -> Result<(), StatsError> {
    let c = &s.counters;
    writeln!(w, "created: {}", c.created)?;
    writeln!(w, "started: {}", c.started)?;
    writeln!(w, "relayed: {}", c.relayed)?;
    writeln!(w, "aborted: {}", c.aborted)?;
    writeln!(w, "dropped: {}", c.dropped)?;
    writeln!(w, "removed: {}", c.removed)?;
    writeln!(w, "delivered: {}", c.delivered)?;
    writeln!(w, "delivery_prob: {}", fmt_stat(s.delivery_prob))?;
    writeln!(w, "response_prob: {}", fmt_stat(s.response_prob))?;
    writeln!(w, "overhead_ratio: {}", fmt_stat(s.overhead_ratio))?;
    writeln!(w, "latency_avg: {}", fmt_stat(s.latency_avg))?;
    writeln!(w, "latency_med: {}", fmt_stat(s.latency_median))?;
    writeln!(w, "latency_min: {}", fmt_stat(s.latency_min))?;
    writeln!(w, "latency_max: {}", fmt_stat(s.latency_max))?;
    writeln!(w, "hopcount_avg: {}", fmt_stat(s.hop_count_avg))?;
    writeln!(
        w,
        "hopcount_med: {}",
        s.hop_count_median
            .map_or_else(|| "NaN".to_string(), |h| h.to_string())
    )?;
    writeln!(w, "buffertime_avg: {}", fmt_stat(s.buffertime_avg))?;
    writeln!(w, "buffertime_med: {}", fmt_stat(s.buffertime_median))?;
    writeln!(w, "rtt_avg: {}", fmt_stat(s.rtt_avg))?;
    writeln!(w, "rtt_med: {}", fmt_stat(s.rtt_median))?;
    Ok(())
}

/// Diffusion section followed by the aggregate section
pub fn write_final_report<W: Write>(w: &mut W, report: &FinalReport) -> Result<(), StatsError> {
    match &report.diffusion {
        Ok(lines) => write_diffusion(w, lines)?,
        Err(e) => writeln!(w, "# diffusion unavailable: {}", e)?,
    }
    writeln!(w)?;
    write_summary(w, &report.summary)
}

pub fn write_delivery_delays<W: Write>(
    w: &mut W,
    delays: &[DeliveryDelay],
) -> Result<(), StatsError> {
    writeln!(w, "{}", DELAY_HEADER)?;
    for d in delays {
        writeln!(w, "{}\t{}", d.id, d.delay)?;
    }
    Ok(())
}

pub fn write_topic_delays<W: Write>(w: &mut W, delays: &[TopicDelays]) -> Result<(), StatsError> {
    writeln!(w, "{}", DELAY_HEADER)?;
    for d in delays {
        writeln!(w, "{}\t{}", d.id, join_times(&d.delays))?;
    }
    Ok(())
}

pub fn write_transient<'a, W, I>(w: &mut W, samples: I) -> Result<(), StatsError>
where
    W: Write,
    I: IntoIterator<Item = (&'a HostId, &'a Vec<TransientSample>)>,
{
    for (host, list) in samples {
        for (i, sample) in list.iter().enumerate() {
            let values = sample
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(w, "{}\t{}\t{}", host, i, values)?;
        }
    }
    Ok(())
}

/// Buffered report file, flushed on drop
pub struct ReportFile {
    writer: BufWriter<File>,
}

impl ReportFile {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn writer(&mut self) -> &mut BufWriter<File> {
        &mut self.writer
    }

    pub fn flush(&mut self) -> Result<(), StatsError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for ReportFile {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
