//! Warm-up filtering
//!
//! Messages created while the engine reports an open warm-up window are
//! remembered by id; every later event that references one of them is
//! dropped by the listeners sharing this filter.

use hashbrown::HashSet;

use crate::dtn_interface::{MessageId, SimContext};

#[derive(Debug, Default, Clone)]
pub struct WarmupFilter {
    ids: HashSet<MessageId>,
}

impl WarmupFilter {
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }

    pub fn is_warmup_active(&self, ctx: &dyn SimContext) -> bool {
        ctx.is_warmup()
    }

    pub fn is_warmup_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Called on message creation. Returns true if the message was created
    /// during warm-up and must be ignored from now on.
    pub fn admit_created(&mut self, ctx: &dyn SimContext, id: &str) -> bool {
        if self.is_warmup_active(ctx) {
            log::debug!("warm-up message {} excluded from statistics", id);
            self.ids.insert(id.to_owned());
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtn_interface::SimTime;

    struct Ctx {
        warmup: bool,
    }

    impl SimContext for Ctx {
        fn sim_time(&self) -> SimTime {
            0.0
        }

        fn host_count(&self) -> Option<usize> {
            Some(1)
        }

        fn is_warmup(&self) -> bool {
            self.warmup
        }
    }

    #[test]
    fn test_records_only_during_warmup() {
        let mut filter = WarmupFilter::new();

        assert!(filter.admit_created(&Ctx { warmup: true }, "W1"));
        assert!(!filter.admit_created(&Ctx { warmup: false }, "M1"));

        assert!(filter.is_warmup_id("W1"));
        assert!(!filter.is_warmup_id("M1"));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_membership_outlives_warmup() {
        let mut filter = WarmupFilter::new();
        filter.admit_created(&Ctx { warmup: true }, "W1");

        // warm-up over: the id stays filtered
        assert!(!filter.is_warmup_active(&Ctx { warmup: false }));
        assert!(filter.is_warmup_id("W1"));
    }
}
