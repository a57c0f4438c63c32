//! # devsim-engine::events
//!
//! Defines the queued event wrappers and the bag structures the event table
//! hands to the coordinator. Queued entries carry a monotonic sequence number
//! so equal-time pops from the `BinaryHeap`s are stable, which is what makes
//! two runs of the same experiment byte-identical.

use devsim_model::api::{ExternalEvent, RequestEvent};
use devsim_types::{id::SimulatorId, time::Time};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A scheduled internal transition. The sequence number doubles as the
/// tombstone generation: the entry is live only while the event table's index
/// still maps `target` to this `seq`.
#[derive(Debug)]
pub struct QueuedInternal {
    pub time: Time,
    pub target: SimulatorId,
    pub seq: u64,
}

/// A scheduled observation of `(target, port)` on behalf of a view.
#[derive(Debug, Clone)]
pub struct QueuedObservation {
    pub time: Time,
    pub view: String,
    pub target: SimulatorId,
    pub port: String,
    pub seq: u64,
}

// The following implementations are crucial for the `BinaryHeap`s to function
// as min-heaps and to maintain deterministic ordering: the primary sort key
// is `time` (earlier is greater), the secondary is `seq` (earlier is
// greater).

macro_rules! impl_queue_order {
    ($ty:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.time == other.time && self.seq == other.seq
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                other
                    .time
                    .cmp(&self.time)
                    .then_with(|| other.seq.cmp(&self.seq))
            }
        }
    };
}

impl_queue_order!(QueuedInternal);
impl_queue_order!(QueuedObservation);

/// Everything one simulator has to process at a single time instant.
#[derive(Debug, Default)]
pub struct EventBagModel {
    /// Whether a live internal transition fired at this instant. There is at
    /// most one.
    pub internal: bool,
    pub externals: Vec<ExternalEvent>,
    pub requests: Vec<RequestEvent>,
}

impl EventBagModel {
    pub fn is_empty(&self) -> bool {
        !self.internal && self.externals.is_empty() && self.requests.is_empty()
    }
}

/// The complete bag for one time instant: per-simulator event bags plus the
/// observations due once the instant is idle.
#[derive(Debug)]
pub struct CompleteEventBagModel {
    pub time: Time,
    bags: BTreeMap<SimulatorId, EventBagModel>,
    pub observations: Vec<QueuedObservation>,
}

impl CompleteEventBagModel {
    pub fn new(time: Time) -> Self {
        Self {
            time,
            bags: BTreeMap::new(),
            observations: Vec::new(),
        }
    }

    pub fn bag_mut(&mut self, sim: SimulatorId) -> &mut EventBagModel {
        self.bags.entry(sim).or_default()
    }

    pub fn remove(&mut self, sim: SimulatorId) -> Option<EventBagModel> {
        self.bags.remove(&sim)
    }

    pub fn has_internal(&self, sim: SimulatorId) -> bool {
        self.bags.get(&sim).map_or(false, |b| b.internal)
    }

    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }

    /// True when no transition-bearing events fired at this instant.
    /// Observations are gated on this: a state is only observable between
    /// transitions.
    pub fn is_transition_free(&self) -> bool {
        self.bags.values().all(EventBagModel::is_empty)
    }

    /// The deterministic dispatch order: non-executive simulators first, then
    /// executives, each group in ascending id order. Deferring executives
    /// guarantees every other model in the bag transitions against the
    /// pre-mutation graph.
    pub fn ordered(&self, is_executive: impl Fn(SimulatorId) -> bool) -> Vec<SimulatorId> {
        let mut order: Vec<SimulatorId> = Vec::with_capacity(self.bags.len());
        let mut executives: Vec<SimulatorId> = Vec::new();
        for &id in self.bags.keys() {
            if is_executive(id) {
                executives.push(id);
            } else {
                order.push(id);
            }
        }
        order.extend(executives);
        order
    }
}
