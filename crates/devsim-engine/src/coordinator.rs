//! # devsim-engine::coordinator
//!
//! The top-level simulation driver. The coordinator owns the event table,
//! the model graph, every simulator and every view, and runs the Parallel
//! DEVS loop: pop the earliest bag, collect outputs, route them, apply
//! transitions in deterministic order, reschedule, then materialise the
//! observations due at idle instants.
//!
//! Executives are dispatched after all non-executive simulators in the same
//! bag, and the structural changes they stage are applied as soon as their
//! transition returns, so routing within a bag always sees a consistent
//! graph.

use crate::{
    control::ControlMsg,
    events::EventBagModel,
    factory::ModelFactory,
    graph::ModelGraph,
    ids::IdGen,
    simulator::Simulator,
    structure::StructuralChange,
    table::EventTable,
    view::{
        stream::{Sample, Stream},
        View,
    },
};
use crossbeam_channel::Receiver;
use devsim_model::{
    api::{DynResult, ExternalEvent, ExternalEventList, RequestEvent},
    ctx::{DevsCtx, NewModel},
};
use devsim_types::{
    errors::{DynamicsError, KernelError, SimulationFailure},
    experiment::{ModelSpec, ViewKind, SELF_SCOPE},
    id::{ModelId, SimulatorId},
    metrics::{LBL_KIND, MET_BAGS, MET_EXTERNALS_ROUTED, MET_OBSERVATIONS, MET_STRUCTURAL_CHANGES, MET_TRANSITIONS},
    time::Time,
    value::Value,
};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use std::time::Duration;

pub struct Coordinator {
    table: EventTable,
    graph: ModelGraph,
    sims: FxHashMap<SimulatorId, Simulator>,
    views: IndexMap<String, View>,
    factory: ModelFactory,
    ids: IdGen,
    seed: u64,
    /// Structural changes staged by the executive currently transitioning.
    staged: Vec<StructuralChange>,
    control: Option<Receiver<ControlMsg>>,
    /// Maximum number of consecutive bags at one instant before the run is
    /// declared stuck in a zero-delay cascade. `None` runs indefinitely.
    cycle_limit: Option<u64>,
    bags_at_instant: u64,
    last_instant: Option<Time>,
    finished: bool,
}

impl Coordinator {
    pub fn new(factory: ModelFactory, seed: u64) -> Self {
        Self {
            table: EventTable::new(),
            graph: ModelGraph::new(),
            sims: FxHashMap::default(),
            views: IndexMap::new(),
            factory,
            ids: IdGen::new(),
            seed,
            staged: Vec::new(),
            control: None,
            cycle_limit: None,
            bags_at_instant: 0,
            last_instant: None,
            finished: false,
        }
    }

    /// Sets the channel on which the embedder sends pause/resume/stop; it is
    /// polled between bags.
    pub fn set_control_channel(&mut self, rx: Receiver<ControlMsg>) {
        self.control = Some(rx);
    }

    pub fn set_cycle_limit(&mut self, limit: Option<u64>) {
        self.cycle_limit = limit;
    }

    pub fn current_time(&self) -> Time {
        self.table.current_time()
    }

    /// The time of the next pending bag, or infinity when drained.
    pub fn next_time(&mut self) -> Time {
        self.table.top_time()
    }

    pub fn has_model(&self, path: &str) -> bool {
        self.graph.contains(path)
    }

    pub fn simulator_count(&self) -> usize {
        self.sims.len()
    }

    pub fn pending_events(&self) -> usize {
        self.table.live_event_count()
    }

    // --- construction API ------------------------------------------------

    /// Adds an empty coupled model. `parent: None` creates the root.
    pub fn add_coupled(&mut self, parent: Option<&str>, name: &str) -> Result<ModelId, KernelError> {
        let parent_id = parent.map(|p| self.graph.resolve(p)).transpose()?;
        let id = self.ids.next_model_id();
        self.graph.insert_coupled(id, parent_id, name)?;
        Ok(id)
    }

    /// Adds an atomic model under a coupled parent: builds its dynamics
    /// through the factory, initialises it at the current time and schedules
    /// its first internal transition.
    pub fn add_model(&mut self, parent: &str, model: NewModel) -> Result<SimulatorId, KernelError> {
        let id = self.ids.next_model_id();
        self.create_atomic_with_id(parent, model, id)?;
        Ok(id)
    }

    /// Instantiates a whole model-spec sub-tree under `parent` (`None` for
    /// the root).
    pub fn instantiate(
        &mut self,
        parent: Option<&str>,
        spec: &ModelSpec,
    ) -> Result<ModelId, KernelError> {
        self.instantiate_spec(parent, spec, None)
    }

    pub fn add_input_port(&mut self, model: &str, port: &str) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        self.graph.add_port(id, port, true)
    }

    pub fn add_output_port(&mut self, model: &str, port: &str) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        self.graph.add_port(id, port, false)
    }

    pub fn remove_input_port(&mut self, model: &str, port: &str) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        self.graph.remove_port(id, port, true)
    }

    pub fn remove_output_port(&mut self, model: &str, port: &str) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        self.graph.remove_port(id, port, false)
    }

    pub fn connect(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> Result<(), KernelError> {
        let src_id = self.graph.resolve(src)?;
        let dst_id = self.graph.resolve(dst)?;
        self.graph.connect(src_id, src_port, dst_id, dst_port)
    }

    pub fn disconnect(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> Result<(), KernelError> {
        let src_id = self.graph.resolve(src)?;
        let dst_id = self.graph.resolve(dst)?;
        self.graph.disconnect(src_id, src_port, dst_id, dst_port)
    }

    /// Deletes a model (and its subtree) immediately. The executive path
    /// stages the same operation through its context instead.
    pub fn delete_model(&mut self, model: &str) -> Result<(), KernelError> {
        self.delete_model_by_path(model)
    }

    pub fn add_view(
        &mut self,
        name: &str,
        kind: ViewKind,
        stream: Box<dyn Stream>,
    ) -> Result<(), KernelError> {
        if self.views.contains_key(name) {
            return Err(KernelError::DuplicateView {
                view: name.to_string(),
            });
        }
        let view = View::new(name, kind, stream)?;
        self.views.insert(name.to_string(), view);
        Ok(())
    }

    /// Subscribes a view to `(model, port)`. Timed views get their first
    /// observation event enqueued at the current time.
    pub fn subscribe(&mut self, view: &str, model: &str, port: &str) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        self.subscribe_id(view, id, port)
    }

    /// Queues an external event for an atomic model's input port, due at the
    /// current instant. This is how initial values enter the system.
    pub fn inject(&mut self, model: &str, port: &str, value: Value) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        self.inject_id(id, port, value)
    }

    /// Queues a request for an atomic model, due at the current instant.
    pub fn send_request(
        &mut self,
        model: &str,
        port: &str,
        value: Value,
    ) -> Result<(), KernelError> {
        let id = self.graph.resolve(model)?;
        let node = self.graph.node(id)?;
        if !node.is_atomic() {
            return Err(KernelError::UnknownModel {
                model: node.path.to_string(),
            });
        }
        self.table.put_request(
            id,
            RequestEvent {
                port: port.to_string(),
                value,
            },
        );
        Ok(())
    }

    // --- main loop -------------------------------------------------------

    /// Runs until the event table drains, the horizon passes, or the
    /// embedder stops the run; then tears down. Bags at exactly the horizon
    /// are still processed.
    pub fn run(&mut self, horizon: Time) -> Result<(), SimulationFailure> {
        loop {
            if self.drain_control() {
                tracing::info!(t = %self.current_time(), "stop requested");
                break;
            }
            let next = self.table.top_time();
            if next.is_infinite() || next > horizon {
                break;
            }
            match self.step() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(failure) => {
                    let _ = self.teardown();
                    return Err(failure);
                }
            }
        }
        self.teardown()
            .map_err(|kind| self.fail(kind, None))
    }

    /// Processes exactly one bag. Returns the bag's time, or `None` when the
    /// table is drained. Embedders driving the loop in chunks call this and
    /// then [`Coordinator::finish`] once done.
    pub fn step(&mut self) -> Result<Option<Time>, SimulationFailure> {
        let t = self.table.top_time();
        if t.is_infinite() {
            return Ok(None);
        }
        if self.last_instant == Some(t) {
            self.bags_at_instant += 1;
        } else {
            self.last_instant = Some(t);
            self.bags_at_instant = 1;
        }
        if let Some(limit) = self.cycle_limit {
            if self.bags_at_instant > limit {
                return Err(self.fail(KernelError::CascadeLimit { limit, time: t }, None));
            }
        }

        let mut bag = self.table.pop_bag();
        tracing::debug!(t = %t, models = bag.len(), observations = bag.observations.len(), "bag");
        ::metrics::counter!(MET_BAGS).increment(1);

        let order = bag.ordered(|id| self.sims.get(&id).map_or(false, Simulator::is_executive));

        // Phase 1: outputs of every simulator firing an internal (or
        // confluent) transition, routed into the table as externals due at
        // this same instant. They are consumed by the next bag unless they
        // land on a simulator already transitioning now.
        for &id in &order {
            if !bag.has_internal(id) {
                continue;
            }
            let out = {
                let sim = self
                    .sims
                    .get(&id)
                    .expect("bag references unknown simulator");
                sim.output(t).map_err(|e| self.fail(e, Some(id)))?
            };
            self.route_outputs(id, out)
                .map_err(|e| self.fail(e, Some(id)))?;
        }

        // Phase 2: transitions, non-executives first, executives last.
        for &id in &order {
            let Some(events) = bag.remove(id) else { continue };
            self.dispatch(id, t, events)?;
        }

        // Phase 3: observations, only present when phases 1 and 2 were idle
        // at this instant.
        let observations = std::mem::take(&mut bag.observations);
        for obs in observations {
            self.dispatch_observation(obs.view, obs.target, obs.port, t)
                .map_err(|e| self.fail(e, Some(obs.target)))?;
        }

        Ok(Some(t))
    }

    /// Tears the run down: `finish` on every dynamics, final view flush,
    /// sink close. Idempotent.
    pub fn finish(&mut self) -> Result<(), SimulationFailure> {
        self.teardown().map_err(|kind| self.fail(kind, None))
    }

    // --- internals -------------------------------------------------------

    fn fail(&self, kind: KernelError, sim: Option<SimulatorId>) -> SimulationFailure {
        let simulator = sim.map(|id| {
            let path = self
                .sims
                .get(&id)
                .map(|s| s.path().to_string())
                .unwrap_or_else(|| format!("#{}", id));
            (id, path)
        });
        SimulationFailure {
            kind,
            time: self.table.current_time(),
            simulator,
        }
    }

    /// Returns true when the embedder requested a stop. Blocks while paused.
    fn drain_control(&mut self) -> bool {
        let Some(rx) = &self.control else {
            return false;
        };
        let mut paused = false;
        loop {
            let msg = if paused {
                match rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(msg) => Some(msg),
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return false,
                }
            } else {
                match rx.try_recv() {
                    Ok(msg) => Some(msg),
                    Err(crossbeam_channel::TryRecvError::Empty) => None,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => return false,
                }
            };
            match msg {
                Some(ControlMsg::Stop) => return true,
                Some(ControlMsg::Pause) => paused = true,
                Some(ControlMsg::Resume) => paused = false,
                None if paused => continue,
                None => return false,
            }
        }
    }

    fn route_outputs(
        &mut self,
        source: SimulatorId,
        mut out: ExternalEventList,
    ) -> Result<(), KernelError> {
        for event in out.drain() {
            let targets = self.graph.route(source, &event.port)?;
            for (target, port) in targets {
                ::metrics::counter!(MET_EXTERNALS_ROUTED).increment(1);
                self.table.put_external(
                    target,
                    ExternalEvent {
                        port,
                        value: event.value.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Applies one simulator's share of the bag: the transition chosen by the
    /// Parallel DEVS case analysis, then requests, reschedule, event-view
    /// samples, and finally any staged structural changes.
    fn dispatch(
        &mut self,
        id: SimulatorId,
        t: Time,
        events: EventBagModel,
    ) -> Result<(), SimulationFailure> {
        // An executive earlier in this bag may have deleted the model.
        let Some(mut sim) = self.sims.remove(&id) else {
            return Ok(());
        };
        let parent = self
            .graph
            .node(id)
            .ok()
            .and_then(|n| n.parent)
            .and_then(|p| self.graph.path(p).ok())
            .unwrap_or_default()
            .to_string();

        let externals: ExternalEventList = events.externals.into();
        let transitioned = events.internal || !externals.is_empty();
        let kind_label = match (events.internal, !externals.is_empty()) {
            (true, false) => "internal",
            (false, true) => "external",
            (true, true) => "confluent",
            (false, false) => "request",
        };

        let result = {
            let mut ctx = EngineCtx {
                now: t,
                executive: sim.is_executive(),
                sim_id: id,
                parent,
                seed: self.seed,
                staged: &mut self.staged,
                ids: &mut self.ids,
            };
            match (events.internal, externals.is_empty()) {
                (true, true) => sim.internal_transition(&mut ctx, t),
                (false, false) => sim.external_transition(&mut ctx, &externals, t),
                (true, false) => sim.confluent_transitions(&mut ctx, t, &externals),
                (false, true) => Ok(()),
            }
        };
        self.sims.insert(id, sim);
        result.map_err(|e| self.fail(e, Some(id)))?;

        for request in &events.requests {
            let out = {
                let sim = self.sims.get(&id).expect("simulator reinserted above");
                sim.request(request, t).map_err(|e| self.fail(e, Some(id)))?
            };
            self.route_outputs(id, out)
                .map_err(|e| self.fail(e, Some(id)))?;
        }

        if transitioned {
            ::metrics::counter!(MET_TRANSITIONS, LBL_KIND => kind_label).increment(1);
            let next = self
                .sims
                .get(&id)
                .expect("simulator reinserted above")
                .next_internal(t);
            match next {
                Some(next) => self
                    .table
                    .put_internal(id, next)
                    .map_err(|e| self.fail(e, Some(id)))?,
                None => self.table.cancel_internal(id),
            }
            self.sample_event_views(id, t)
                .map_err(|e| self.fail(e, Some(id)))?;
        }

        if !self.staged.is_empty() {
            self.apply_staged(t).map_err(|e| self.fail(e, Some(id)))?;
        }
        Ok(())
    }

    /// Feeds every event view observing `sim` a fresh sample after one of its
    /// transitions.
    fn sample_event_views(&mut self, id: SimulatorId, t: Time) -> Result<(), KernelError> {
        let sim = match self.sims.get(&id) {
            Some(sim) => sim,
            None => return Ok(()),
        };
        let path = sim.path().to_string();
        for view in self.views.values_mut() {
            if view.is_timed() || !view.observes(id) {
                continue;
            }
            for port in view.ports_of(id) {
                if let Some(value) = sim.observation(&port, t) {
                    ::metrics::counter!(MET_OBSERVATIONS).increment(1);
                    view.record_event(
                        t,
                        id,
                        Sample {
                            model: path.clone(),
                            port,
                            value,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Materialises one scheduled observation and, for timed views,
    /// re-enqueues the next one a period later. Samples of models deleted
    /// since scheduling are silently dropped.
    fn dispatch_observation(
        &mut self,
        view_name: String,
        target: SimulatorId,
        port: String,
        t: Time,
    ) -> Result<(), KernelError> {
        let Some(sim) = self.sims.get(&target) else {
            return Ok(());
        };
        let Some(view) = self.views.get_mut(&view_name) else {
            return Ok(());
        };
        if let Some(value) = sim.observation(&port, t) {
            ::metrics::counter!(MET_OBSERVATIONS).increment(1);
            view.record_timed(
                t,
                Sample {
                    model: sim.path().to_string(),
                    port: port.clone(),
                    value,
                },
            )?;
        }
        if let Some(period) = view.period() {
            self.table
                .put_observation(view_name, target, port, t.saturating_add(period))?;
        }
        Ok(())
    }

    fn apply_staged(&mut self, t: Time) -> Result<(), KernelError> {
        let staged = std::mem::take(&mut self.staged);
        for change in staged {
            tracing::info!(t = %t, change = ?change, "structural change");
            ::metrics::counter!(MET_STRUCTURAL_CHANGES).increment(1);
            match change {
                StructuralChange::CreateModel { parent, model, id } => {
                    self.create_atomic_with_id(&parent, model, id)?;
                }
                StructuralChange::CreateFromClass {
                    class,
                    name,
                    parent,
                    id,
                } => {
                    let mut spec = self.factory.class(&class)?.clone();
                    match &mut spec {
                        ModelSpec::Atomic(a) => a.name = name,
                        ModelSpec::Coupled(c) => c.name = name,
                    }
                    self.instantiate_spec(Some(&parent), &spec, Some(id))?;
                }
                StructuralChange::DeleteModel { model } => {
                    self.delete_model_by_path(&model)?;
                }
                StructuralChange::AddConnection {
                    src,
                    src_port,
                    dst,
                    dst_port,
                } => {
                    let src_id = self.graph.resolve(&src)?;
                    let dst_id = self.graph.resolve(&dst)?;
                    self.graph.connect(src_id, &src_port, dst_id, &dst_port)?;
                }
                StructuralChange::RemoveConnection {
                    src,
                    src_port,
                    dst,
                    dst_port,
                } => {
                    let src_id = self.graph.resolve(&src)?;
                    let dst_id = self.graph.resolve(&dst)?;
                    self.graph.disconnect(src_id, &src_port, dst_id, &dst_port)?;
                }
                StructuralChange::AddPort { model, port, input } => {
                    let id = self.graph.resolve(&model)?;
                    self.graph.add_port(id, &port, input)?;
                }
                StructuralChange::RemovePort { model, port, input } => {
                    let id = self.graph.resolve(&model)?;
                    self.graph.remove_port(id, &port, input)?;
                }
            }
        }
        Ok(())
    }

    /// Builds an atomic model with a pre-allocated id: graph node, dynamics
    /// instance, simulator, `init` at the current time, first internal event
    /// and observable wiring. Shared by the construction API and the staged
    /// executive path.
    fn create_atomic_with_id(
        &mut self,
        parent: &str,
        model: NewModel,
        id: SimulatorId,
    ) -> Result<SimulatorId, KernelError> {
        let parent_id = self.graph.resolve(parent)?;
        self.graph.insert_atomic(
            id,
            parent_id,
            &model.name,
            &model.dynamics,
            model.input_ports.clone(),
            model.output_ports.clone(),
        )?;
        let dynamics = self.factory.build(&model.dynamics, &model.conditions)?;
        let path = self.graph.path(id)?.to_string();
        let mut sim = Simulator::new(id, path, dynamics);

        let t = self.table.current_time();
        let first = {
            let mut ctx = EngineCtx {
                now: t,
                // init is not a transition; structural calls are rejected.
                executive: false,
                sim_id: id,
                parent: parent.to_string(),
                seed: self.seed,
                staged: &mut self.staged,
                ids: &mut self.ids,
            };
            sim.init(&mut ctx, t)?
        };
        if let Some(first) = first {
            self.table.put_internal(id, first)?;
        }
        self.sims.insert(id, sim);

        for (view, port) in &model.observables {
            self.subscribe_id(view, id, port)?;
        }
        Ok(id)
    }

    fn instantiate_spec(
        &mut self,
        parent: Option<&str>,
        spec: &ModelSpec,
        root_id: Option<ModelId>,
    ) -> Result<ModelId, KernelError> {
        match spec {
            ModelSpec::Atomic(atomic) => {
                let parent = parent.ok_or_else(|| KernelError::ScopeMismatch {
                    src: "<root>".to_string(),
                    dst: atomic.name.clone(),
                })?;
                let id = root_id.unwrap_or_else(|| self.ids.next_model_id());
                let model = NewModel {
                    name: atomic.name.clone(),
                    dynamics: atomic.dynamics.clone(),
                    input_ports: atomic.input_ports.clone(),
                    output_ports: atomic.output_ports.clone(),
                    conditions: atomic.conditions.clone(),
                    observables: Vec::new(),
                };
                self.create_atomic_with_id(parent, model, id)?;
                for (port, value) in &atomic.initial {
                    self.inject_id(id, port, value.clone())?;
                }
                Ok(id)
            }
            ModelSpec::Coupled(coupled) => {
                let parent_id = parent.map(|p| self.graph.resolve(p)).transpose()?;
                let id = root_id.unwrap_or_else(|| self.ids.next_model_id());
                self.graph.insert_coupled(id, parent_id, &coupled.name)?;
                for port in &coupled.input_ports {
                    self.graph.add_port(id, port, true)?;
                }
                for port in &coupled.output_ports {
                    self.graph.add_port(id, port, false)?;
                }
                let path = self.graph.path(id)?.to_string();
                for child in &coupled.children {
                    self.instantiate_spec(Some(&path), child, None)?;
                }
                for conn in &coupled.connections {
                    let src_id = self.resolve_in_scope(id, &path, &conn.src)?;
                    let dst_id = self.resolve_in_scope(id, &path, &conn.dst)?;
                    self.graph
                        .connect(src_id, &conn.src_port, dst_id, &conn.dst_port)?;
                }
                Ok(id)
            }
        }
    }

    fn resolve_in_scope(
        &self,
        scope: ModelId,
        scope_path: &str,
        name: &str,
    ) -> Result<ModelId, KernelError> {
        if name == SELF_SCOPE {
            Ok(scope)
        } else {
            self.graph.resolve(&format!("{}.{}", scope_path, name))
        }
    }

    fn subscribe_id(&mut self, view: &str, id: SimulatorId, port: &str) -> Result<(), KernelError> {
        if !self.sims.contains_key(&id) {
            return Err(KernelError::UnknownModel {
                model: self.graph.path(id).unwrap_or("?").to_string(),
            });
        }
        let now = self.table.current_time();
        let Some(view_ref) = self.views.get_mut(view) else {
            return Err(KernelError::UnknownView {
                view: view.to_string(),
            });
        };
        if let Some(first) = view_ref.add_observable(id, port, now) {
            self.table.put_observation(view, id, port, first)?;
        }
        Ok(())
    }

    fn inject_id(&mut self, id: SimulatorId, port: &str, value: Value) -> Result<(), KernelError> {
        let node = self.graph.node(id)?;
        if !node.is_atomic() || !node.input_ports.iter().any(|p| p == port) {
            return Err(KernelError::UnknownPort {
                model: node.path.clone(),
                port: port.to_string(),
            });
        }
        self.table.put_external(
            id,
            ExternalEvent {
                port: port.to_string(),
                value,
            },
        );
        Ok(())
    }

    fn delete_model_by_path(&mut self, path: &str) -> Result<(), KernelError> {
        let id = self.graph.resolve(path)?;
        let removed = self.graph.remove_model(id)?;
        for sim_id in removed {
            if let Some(mut sim) = self.sims.remove(&sim_id) {
                sim.finish();
            }
            self.table.del_model_events(sim_id);
            for view in self.views.values_mut() {
                view.remove_observable(sim_id);
            }
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), KernelError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let mut ids: Vec<SimulatorId> = self.sims.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(sim) = self.sims.get_mut(&id) {
                sim.finish();
            }
        }

        let mut first_error = None;
        for view in self.views.values_mut() {
            if let Err(e) = view.finish() {
                tracing::warn!(error = %e, "view teardown failed");
                first_error.get_or_insert(e);
            }
        }
        tracing::info!(t = %self.table.current_time(), "simulation finished");
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

/// The engine side of [`DevsCtx`]: a per-dispatch window onto the
/// coordinator. Structural calls stage changes; they are validated and
/// applied once the transition has returned.
struct EngineCtx<'a> {
    now: Time,
    executive: bool,
    sim_id: SimulatorId,
    /// The dispatched model's coupled scope, used by class instantiation.
    parent: String,
    seed: u64,
    staged: &'a mut Vec<StructuralChange>,
    ids: &'a mut IdGen,
}

impl EngineCtx<'_> {
    fn structural(&self) -> DynResult<()> {
        if self.executive {
            Ok(())
        } else {
            Err(DynamicsError::msg(
                KernelError::NotExecutive.to_string(),
            ))
        }
    }
}

impl DevsCtx for EngineCtx<'_> {
    fn now(&self) -> Time {
        self.now
    }

    fn random_seed(&mut self) -> u64 {
        // Splitmix-style spread keeps per-model streams independent while
        // staying a pure function of (experiment seed, model id).
        self.seed ^ (self.sim_id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    fn create_model(&mut self, parent: &str, model: NewModel) -> DynResult<SimulatorId> {
        self.structural()?;
        let id = self.ids.next_model_id();
        self.staged.push(StructuralChange::CreateModel {
            parent: parent.to_string(),
            model,
            id,
        });
        Ok(id)
    }

    fn create_model_from_class(&mut self, class: &str, name: &str) -> DynResult<SimulatorId> {
        self.structural()?;
        let id = self.ids.next_model_id();
        self.staged.push(StructuralChange::CreateFromClass {
            class: class.to_string(),
            name: name.to_string(),
            parent: self.parent.clone(),
            id,
        });
        Ok(id)
    }

    fn delete_model(&mut self, model: &str) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::DeleteModel {
            model: model.to_string(),
        });
        Ok(())
    }

    fn add_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::AddConnection {
            src: src.to_string(),
            src_port: src_port.to_string(),
            dst: dst.to_string(),
            dst_port: dst_port.to_string(),
        });
        Ok(())
    }

    fn remove_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::RemoveConnection {
            src: src.to_string(),
            src_port: src_port.to_string(),
            dst: dst.to_string(),
            dst_port: dst_port.to_string(),
        });
        Ok(())
    }

    fn add_input_port(&mut self, model: &str, port: &str) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::AddPort {
            model: model.to_string(),
            port: port.to_string(),
            input: true,
        });
        Ok(())
    }

    fn remove_input_port(&mut self, model: &str, port: &str) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::RemovePort {
            model: model.to_string(),
            port: port.to_string(),
            input: true,
        });
        Ok(())
    }

    fn add_output_port(&mut self, model: &str, port: &str) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::AddPort {
            model: model.to_string(),
            port: port.to_string(),
            input: false,
        });
        Ok(())
    }

    fn remove_output_port(&mut self, model: &str, port: &str) -> DynResult<()> {
        self.structural()?;
        self.staged.push(StructuralChange::RemovePort {
            model: model.to_string(),
            port: port.to_string(),
            input: false,
        });
        Ok(())
    }
}
