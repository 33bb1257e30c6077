use std::collections::BTreeMap;

// all hosts are addressed by the engine's numeric address
pub type HostId = u64;

// simulated seconds
pub type SimTime = f64;

pub type MessageId = String;

/// Category of a message, fixed by the engine when the message is created
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, serde::Deserialize)]
pub enum MessageKind {
    /// Addressed to a single destination host
    #[default]
    Direct,
    /// Meant to spread over the whole population
    Spread,
}

/// The request a response message answers
#[derive(Clone, Debug, PartialEq)]
pub struct RequestRef {
    pub id: MessageId,
    pub creation_time: SimTime,
}

/// Message metadata as handed over by the simulation engine
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub creation_time: SimTime,
    /// Time the current holder received this copy
    pub receive_time: SimTime,
    /// Hosts traversed so far, the source included
    pub hops: Vec<HostId>,
    /// Requested response size; > 0 marks a request expecting a response
    pub response_size: u64,
    /// Set only on responses
    pub request: Option<RequestRef>,
    pub topic: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<MessageId>, kind: MessageKind, source: HostId, now: SimTime) -> Self {
        Self {
            id: id.into(),
            kind,
            creation_time: now,
            receive_time: now,
            hops: vec![source],
            response_size: 0,
            request: None,
            topic: None,
        }
    }

    pub fn is_response(&self) -> bool {
        self.request.is_some()
    }

    /// Number of hops taken; the source host does not count as a hop
    pub fn hop_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }
}

// ============================================================================
// Lifecycle Events
// ============================================================================

/// Message lifecycle events emitted by the simulation engine
#[derive(Debug, Clone, Copy)]
pub enum MessageEvent<'a> {
    /// Message created at its source
    Created { message: &'a Message },
    /// Transfer between two hosts started
    TransferStarted {
        message: &'a Message,
        from: HostId,
        to: HostId,
    },
    /// Transfer between two hosts aborted before completion
    TransferAborted {
        message: &'a Message,
        from: HostId,
        to: HostId,
    },
    /// Transfer completed; `final_target` is set on first delivery to the destination
    Transferred {
        message: &'a Message,
        from: HostId,
        to: HostId,
        final_target: bool,
    },
    /// Message removed from a buffer (`dropped` when evicted, otherwise removed)
    Deleted {
        message: &'a Message,
        at: HostId,
        dropped: bool,
    },
}

impl MessageEvent<'_> {
    pub fn message(&self) -> &Message {
        match *self {
            MessageEvent::Created { message }
            | MessageEvent::TransferStarted { message, .. }
            | MessageEvent::TransferAborted { message, .. }
            | MessageEvent::Transferred { message, .. }
            | MessageEvent::Deleted { message, .. } => message,
        }
    }
}

// ============================================================================
// Engine Context
// ============================================================================

/// Optional routing-layer capability: per-host transient values
pub trait TransientSource {
    fn transient(&self) -> BTreeMap<String, f64>;
}

/// Read-only view of the simulation engine, queried by listeners
pub trait SimContext {
    /// Current simulated time, non-decreasing over a run
    fn sim_time(&self) -> SimTime;

    /// Size of the host population; `None` while unknown
    fn host_count(&self) -> Option<usize>;

    /// Is the warm-up window still open?
    fn is_warmup(&self) -> bool;

    /// Does `host` subscribe to `topic`?
    fn host_interested(&self, _host: HostId, _topic: &str) -> bool {
        false
    }

    /// The routing layer's transient capability for `host`, if it has one
    fn transient_source(&self, _host: HostId) -> Option<&dyn TransientSource> {
        None
    }
}

/// Trait for consuming message lifecycle events
pub trait MessageListener {
    fn on_event(&mut self, ctx: &dyn SimContext, event: MessageEvent<'_>);
}

/// Trait for listeners woken on every engine update
pub trait UpdateListener {
    fn updated(&mut self, ctx: &dyn SimContext, hosts: &[HostId]);
}

/// Listener that ignores everything
pub struct NoOpListener;

impl MessageListener for NoOpListener {
    #[inline(always)]
    fn on_event(&mut self, _ctx: &dyn SimContext, _event: MessageEvent<'_>) {}
}

/// Fans events out to several listeners in registration order
#[derive(Default)]
pub struct MultiListener<'a> {
    listeners: Vec<&'a mut dyn MessageListener>,
}

impl<'a> MultiListener<'a> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add(&mut self, listener: &'a mut dyn MessageListener) {
        self.listeners.push(listener);
    }
}

impl MessageListener for MultiListener<'_> {
    fn on_event(&mut self, ctx: &dyn SimContext, event: MessageEvent<'_>) {
        for listener in &mut self.listeners {
            listener.on_event(ctx, event);
        }
    }
}
