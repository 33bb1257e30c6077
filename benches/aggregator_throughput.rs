use dtn_stats::{
    DeliveryDelayReport, HostId, Message, MessageEvent, MessageKind, MessageListener,
    MessageStatsAggregator, MultiListener, SimContext, SimTime, StatsConfig, TopicDelayReport,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

struct BenchContext {
    now: SimTime,
    hosts: usize,
}

impl SimContext for BenchContext {
    fn sim_time(&self) -> SimTime {
        self.now
    }

    fn host_count(&self) -> Option<usize> {
        Some(self.hosts)
    }

    fn is_warmup(&self) -> bool {
        false
    }
}

/// Benchmark event ingestion cost of the statistics listeners
fn main() {
    std::env::set_var("RUST_LOG", "error");
    let _ = simple_logger::init_with_env();

    println!("\n=== Statistics Listener Throughput ===\n");

    let configs = vec![
        ("Small (100 hosts, 1k messages)", 100usize, 1_000usize),
        ("Medium (1k hosts, 5k messages)", 1_000, 5_000),
        ("Large (5k hosts, 10k messages)", 5_000, 10_000),
    ];

    println!(
        "{:<40} {:>12} {:>15} {:>15}",
        "Configuration", "Events", "Time (ms)", "Events/s"
    );
    println!("{}", "-".repeat(85));

    for (name, hosts, messages) in configs {
        let mut rng = StdRng::seed_from_u64(42);
        let mut ctx = BenchContext { now: 0.0, hosts };

        let mut stats = MessageStatsAggregator::new(StatsConfig::default()).unwrap();
        let mut delivery = DeliveryDelayReport::new();
        let mut topic = TopicDelayReport::new();

        // each message visits a random walk of hosts
        let walks: Vec<(Message, Vec<HostId>)> = (0..messages)
            .map(|i| {
                let source = rng.gen_range(0..hosts) as HostId;
                let kind = if i % 2 == 0 {
                    MessageKind::Spread
                } else {
                    MessageKind::Direct
                };
                let walk = (0..rng.gen_range(1..hosts.min(200)))
                    .map(|_| rng.gen_range(0..hosts) as HostId)
                    .collect();
                (Message::new(format!("M{}", i), kind, source, 0.0), walk)
            })
            .collect();

        let start = Instant::now();
        let mut events = 0usize;
        {
            let mut listeners = MultiListener::new();
            listeners.add(&mut stats);
            listeners.add(&mut delivery);
            listeners.add(&mut topic);

            for (m, walk) in &walks {
                listeners.on_event(&ctx, MessageEvent::Created { message: m });
                events += 1;

                let mut from = m.hops[0];
                for (step, &to) in walk.iter().enumerate() {
                    ctx.now += 1.0;
                    listeners.on_event(
                        &ctx,
                        MessageEvent::Transferred {
                            message: m,
                            from,
                            to,
                            final_target: step + 1 == walk.len(),
                        },
                    );
                    from = to;
                    events += 1;
                }
            }
        }
        let report = stats.done(&ctx);
        let elapsed = start.elapsed().as_secs_f64();

        println!(
            "{:<40} {:>12} {:>15.2} {:>15.0}",
            name,
            events,
            elapsed * 1000.0,
            events as f64 / elapsed
        );

        let tracked = report.diffusion.map(|lines| lines.len()).unwrap_or(0);
        println!(
            "{:<40} delivered={} tracked={}",
            "",
            report.summary.counters.delivered,
            tracked
        );
    }

    println!();
}
