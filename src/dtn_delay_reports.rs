//! Per-message delay reports
//!
//! Two lighter listeners that sit next to the aggregator:
//! - [`DeliveryDelayReport`]: one line per delivered message with the largest
//!   delay observed for it up to delivery.
//! - [`TopicDelayReport`]: the delay of every hop that lands on an interested
//!   host, per message.
//!
//! Both drop warm-up messages the same way the aggregator does.

use indexmap::IndexMap;

use crate::dtn_interface::{
    HostId, Message, MessageEvent, MessageId, MessageKind, MessageListener, SimContext, SimTime,
};
use crate::dtn_warmup::WarmupFilter;

// ============================================================================
// Delivery Delay
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryDelay {
    pub id: MessageId,
    pub delay: SimTime,
}

#[derive(Default)]
pub struct DeliveryDelayReport {
    warmup: WarmupFilter,
    max_delays: IndexMap<MessageId, SimTime>,
    delivered: Vec<DeliveryDelay>,
}

impl DeliveryDelayReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn transferred(&mut self, now: SimTime, m: &Message, final_target: bool) {
        let current = now - m.creation_time;
        let delay = self.max_delays.entry(m.id.clone()).or_insert(0.0);
        if current > *delay {
            *delay = current;
        }

        if final_target {
            self.delivered.push(DeliveryDelay {
                id: m.id.clone(),
                delay: *delay,
            });
        }
    }

    /// Deliveries in the order they happened
    pub fn done(&self) -> &[DeliveryDelay] {
        &self.delivered
    }
}

impl MessageListener for DeliveryDelayReport {
    fn on_event(&mut self, ctx: &dyn SimContext, event: MessageEvent<'_>) {
        match event {
            MessageEvent::Created { message } => {
                self.warmup.admit_created(ctx, &message.id);
            }
            MessageEvent::Transferred {
                message,
                final_target,
                ..
            } if !self.warmup.is_warmup_id(&message.id) => {
                self.transferred(ctx.sim_time(), message, final_target)
            }
            _ => {}
        }
    }
}

// ============================================================================
// Topic Delay
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TopicDelays {
    pub id: MessageId,
    pub delays: Vec<SimTime>,
}

#[derive(Default)]
pub struct TopicDelayReport {
    warmup: WarmupFilter,
    delays: IndexMap<MessageId, Vec<SimTime>>,
}

impl TopicDelayReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(ctx: &dyn SimContext, m: &Message, to: HostId) -> bool {
        if m.kind == MessageKind::Spread {
            return true;
        }
        m.topic
            .as_deref()
            .map_or(false, |topic| ctx.host_interested(to, topic))
    }

    fn transferred(&mut self, ctx: &dyn SimContext, m: &Message, to: HostId) {
        if !Self::counts(ctx, m, to) {
            return;
        }

        let now = ctx.sim_time();
        match self.delays.get_mut(&m.id) {
            // measured from the moment the previous holder got its copy
            Some(list) => list.push(now - m.receive_time),
            None => {
                self.delays.insert(m.id.clone(), vec![now - m.creation_time]);
            }
        }
    }

    /// Delay lists in first-registration order
    pub fn done(&self) -> Vec<TopicDelays> {
        self.delays
            .iter()
            .map(|(id, delays)| TopicDelays {
                id: id.clone(),
                delays: delays.clone(),
            })
            .collect()
    }
}

impl MessageListener for TopicDelayReport {
    fn on_event(&mut self, ctx: &dyn SimContext, event: MessageEvent<'_>) {
        match event {
            MessageEvent::Created { message } => {
                self.warmup.admit_created(ctx, &message.id);
            }
            MessageEvent::Transferred { message, to, .. }
                if !self.warmup.is_warmup_id(&message.id) =>
            {
                self.transferred(ctx, message, to)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Ctx {
        now: Cell<SimTime>,
        warmup: Cell<bool>,
    }

    impl Ctx {
        fn new() -> Self {
            Self {
                now: Cell::new(0.0),
                warmup: Cell::new(false),
            }
        }

        fn at(&self, t: SimTime) -> &Self {
            self.now.set(t);
            self
        }
    }

    impl SimContext for Ctx {
        fn sim_time(&self) -> SimTime {
            self.now.get()
        }

        fn host_count(&self) -> Option<usize> {
            Some(10)
        }

        fn is_warmup(&self) -> bool {
            self.warmup.get()
        }

        // even hosts follow "news"
        fn host_interested(&self, host: HostId, topic: &str) -> bool {
            topic == "news" && host % 2 == 0
        }
    }

    fn transferred(m: &Message, to: HostId, final_target: bool) -> MessageEvent<'_> {
        MessageEvent::Transferred {
            message: m,
            from: 0,
            to,
            final_target,
        }
    }

    #[test]
    fn test_delivery_delay_is_max_seen() {
        let ctx = Ctx::new();
        let mut report = DeliveryDelayReport::new();
        let m = Message::new("M", MessageKind::Direct, 0, 2.0);

        report.on_event(ctx.at(2.0), MessageEvent::Created { message: &m });
        report.on_event(ctx.at(5.0), transferred(&m, 1, false));
        report.on_event(ctx.at(9.0), transferred(&m, 2, true));

        assert_eq!(
            report.done(),
            &[DeliveryDelay {
                id: "M".into(),
                delay: 7.0
            }]
        );
    }

    #[test]
    fn test_delivery_delay_skips_warmup() {
        let ctx = Ctx::new();
        let mut report = DeliveryDelayReport::new();
        let m = Message::new("W", MessageKind::Direct, 0, 0.0);

        ctx.warmup.set(true);
        report.on_event(ctx.at(0.0), MessageEvent::Created { message: &m });
        ctx.warmup.set(false);
        report.on_event(ctx.at(4.0), transferred(&m, 1, true));

        assert!(report.done().is_empty());
    }

    #[test]
    fn test_topic_delays_follow_interest() {
        let ctx = Ctx::new();
        let mut report = TopicDelayReport::new();
        let mut m = Message::new("N", MessageKind::Direct, 0, 0.0);
        m.topic = Some("news".into());

        report.on_event(ctx.at(0.0), MessageEvent::Created { message: &m });

        // odd host not interested
        report.on_event(ctx.at(1.0), transferred(&m, 1, false));
        // first interested hop: measured from creation
        report.on_event(ctx.at(3.0), transferred(&m, 2, false));
        // later hops: measured from the sender's receive time
        m.receive_time = 3.0;
        report.on_event(ctx.at(8.0), transferred(&m, 4, false));

        assert_eq!(
            report.done(),
            vec![TopicDelays {
                id: "N".into(),
                delays: vec![3.0, 5.0],
            }]
        );
    }

    #[test]
    fn test_spread_messages_always_count() {
        let ctx = Ctx::new();
        let mut report = TopicDelayReport::new();
        let b = Message::new("B", MessageKind::Spread, 0, 0.0);
        let d = Message::new("D", MessageKind::Direct, 0, 0.0);

        for m in [&d, &b] {
            report.on_event(ctx.at(0.0), MessageEvent::Created { message: m });
            report.on_event(ctx.at(2.0), transferred(m, 1, false));
        }

        let out = report.done();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "B");
    }
}
