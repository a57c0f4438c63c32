//! # devsim-engine::table
//!
//! The event table holds every pending event and produces, on demand, the
//! earliest time instant together with the complete bag of everything
//! scheduled there.
//!
//! Internal events are invalidated lazily: the heap keeps superseded entries
//! and an id-indexed generation map decides liveness when they surface.
//! Insertion stays O(log n) and `top_time` is amortised O(log n), and the
//! executive can drop a model's events without touching heap internals.

use crate::events::{CompleteEventBagModel, QueuedInternal, QueuedObservation};
use devsim_model::api::{ExternalEvent, RequestEvent};
use devsim_types::{errors::KernelError, id::SimulatorId, time::Time};
use fxhash::FxHashMap;
use std::collections::BinaryHeap;

pub struct EventTable {
    current_time: Time,
    internal_heap: BinaryHeap<QueuedInternal>,
    /// The live internal per simulator: `(generation, scheduled time)`.
    /// A heap entry whose generation is not the indexed one is a tombstone.
    internal_index: FxHashMap<SimulatorId, (u64, Time)>,
    /// Pending externals and requests per simulator. Everything queued here
    /// is due at `current_time`: routed events arrive at the instant they
    /// were produced and are consumed by the next bag.
    externals: FxHashMap<SimulatorId, (Vec<ExternalEvent>, Vec<RequestEvent>)>,
    observation_heap: BinaryHeap<QueuedObservation>,
    seq: u64,
}

impl EventTable {
    pub fn new() -> Self {
        Self {
            current_time: Time::ZERO,
            internal_heap: BinaryHeap::new(),
            internal_index: FxHashMap::default(),
            externals: FxHashMap::default(),
            observation_heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq = self.seq.checked_add(1).expect("event sequence overflow");
        seq
    }

    /// Schedules a simulator's next internal transition, superseding any live
    /// one.
    pub fn put_internal(&mut self, target: SimulatorId, time: Time) -> Result<(), KernelError> {
        if time < self.current_time {
            return Err(KernelError::EventInPast {
                event: time,
                current: self.current_time,
            });
        }
        let seq = self.next_seq();
        self.internal_heap.push(QueuedInternal { time, target, seq });
        // Overwriting the index tombstones the previous entry, if any.
        self.internal_index.insert(target, (seq, time));
        Ok(())
    }

    /// Tombstones the target's live internal, if any.
    pub fn cancel_internal(&mut self, target: SimulatorId) {
        self.internal_index.remove(&target);
    }

    /// The target's live internal time, if one is scheduled.
    pub fn live_internal(&self, target: SimulatorId) -> Option<Time> {
        self.internal_index.get(&target).map(|&(_, time)| time)
    }

    /// Queues an external event, due at the current instant. An unconfirmed
    /// internal scheduled strictly later is cancelled: the input will change
    /// the target's state and with it the time advance. An internal at
    /// exactly the current instant is kept, because that coincidence is a
    /// confluent transition.
    pub fn put_external(&mut self, target: SimulatorId, event: ExternalEvent) {
        self.externals.entry(target).or_default().0.push(event);
        if let Some(&(_, time)) = self.internal_index.get(&target) {
            if time > self.current_time {
                self.internal_index.remove(&target);
            }
        }
    }

    /// Queues a request, due at the current instant. Requests never disturb
    /// internal scheduling.
    pub fn put_request(&mut self, target: SimulatorId, event: RequestEvent) {
        self.externals.entry(target).or_default().1.push(event);
    }

    pub fn put_observation(
        &mut self,
        view: impl Into<String>,
        target: SimulatorId,
        port: impl Into<String>,
        time: Time,
    ) -> Result<(), KernelError> {
        if time < self.current_time {
            return Err(KernelError::EventInPast {
                event: time,
                current: self.current_time,
            });
        }
        let seq = self.next_seq();
        self.observation_heap.push(QueuedObservation {
            time,
            view: view.into(),
            target,
            port: port.into(),
            seq,
        });
        Ok(())
    }

    /// Drops tombstoned entries sitting on top of the internal heap.
    fn clean_internal_heap(&mut self) {
        while let Some(top) = self.internal_heap.peek() {
            let live = self
                .internal_index
                .get(&top.target)
                .map_or(false, |&(seq, _)| seq == top.seq);
            if live {
                break;
            }
            self.internal_heap.pop();
        }
    }

    /// The earliest pending instant, or infinity when the table is drained.
    /// Pending externals are always due at the current instant.
    pub fn top_time(&mut self) -> Time {
        if !self.externals.is_empty() {
            return self.current_time;
        }
        self.clean_internal_heap();
        let internal = self
            .internal_heap
            .peek()
            .map_or(Time::INFINITY, |ev| ev.time);
        let observation = self
            .observation_heap
            .peek()
            .map_or(Time::INFINITY, |ev| ev.time);
        internal.min(observation)
    }

    /// Advances the clock to the earliest instant and gathers everything due
    /// there. Observations are attached only when the instant carries no
    /// transitional events; otherwise they stay queued and fire at the next
    /// idle instant at or after their scheduled time.
    pub fn pop_bag(&mut self) -> CompleteEventBagModel {
        let time = self.top_time();
        let mut bag = CompleteEventBagModel::new(time);
        if time.is_infinite() {
            return bag;
        }
        self.current_time = time;

        while let Some(top) = self.internal_heap.peek() {
            let live = self
                .internal_index
                .get(&top.target)
                .map_or(false, |&(seq, _)| seq == top.seq);
            if live && top.time > time {
                break;
            }
            let ev = self.internal_heap.pop().expect("peeked entry vanished");
            if live {
                bag.bag_mut(ev.target).internal = true;
                self.internal_index.remove(&ev.target);
            }
        }

        for (target, (externals, requests)) in self.externals.drain() {
            let entry = bag.bag_mut(target);
            entry.externals = externals;
            entry.requests = requests;
        }

        if bag.is_transition_free() {
            while self
                .observation_heap
                .peek()
                .map_or(false, |obs| obs.time <= time)
            {
                let obs = self.observation_heap.pop().expect("peeked entry vanished");
                bag.observations.push(obs);
            }
        }

        bag
    }

    /// Purges every pending event targeting a deleted model: its internal is
    /// tombstoned, queued externals and requests are dropped, and its
    /// observations are removed from the heap.
    pub fn del_model_events(&mut self, target: SimulatorId) {
        self.internal_index.remove(&target);
        self.externals.remove(&target);
        if self
            .observation_heap
            .iter()
            .any(|obs| obs.target == target)
        {
            let kept: Vec<QueuedObservation> = self
                .observation_heap
                .drain()
                .filter(|obs| obs.target != target)
                .collect();
            self.observation_heap = kept.into();
        }
    }

    /// Number of live pending events, for diagnostics and tests.
    pub fn live_event_count(&self) -> usize {
        let queued: usize = self
            .externals
            .values()
            .map(|(evs, reqs)| evs.len() + reqs.len())
            .sum();
        self.internal_index.len() + queued + self.observation_heap.len()
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new()
    }
}
