//! End-to-end scenarios driving the whole kernel through the public API:
//! generator/counter pipelines, confluent coincidences, executive-driven
//! structure changes, tombstoned internals, timed observers and model
//! deletion.

use devsim_engine::prelude::*;
use devsim_model::models::{Counter, Generator};
use std::sync::{Arc, Mutex};

// --- fixtures ------------------------------------------------------------

/// Emits `Boolean(true)` once at t = first transition, then goes quiescent.
struct Pulse {
    delay: Time,
    emitted: bool,
}

impl Dynamics for Pulse {
    fn time_advance(&self) -> Time {
        if self.emitted {
            Time::INFINITY
        } else {
            self.delay
        }
    }

    fn output(&self, _t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        out.push("out", Value::Boolean(true));
        Ok(())
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.emitted = true;
        Ok(())
    }
}

/// Schedules its first internal with `ta = 3`; an external input defers the
/// next one by 10. Records every internal transition time.
struct Sluggish {
    ta: Time,
    fired: Arc<Mutex<Vec<Time>>>,
}

impl Dynamics for Sluggish {
    fn time_advance(&self) -> Time {
        self.ta
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, t: Time) -> DynResult<()> {
        self.fired.lock().unwrap().push(t);
        self.ta = Time::INFINITY;
        Ok(())
    }

    fn external_transition(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        _evs: &ExternalEventList,
        _t: Time,
    ) -> DynResult<()> {
        self.ta = Time::from_f64(10.0);
        Ok(())
    }
}

/// State is the time of the last internal transition; advances every 0.25.
struct Clock {
    state: Time,
}

impl Dynamics for Clock {
    fn time_advance(&self) -> Time {
        Time::from_f64(0.25)
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, t: Time) -> DynResult<()> {
        self.state = t;
        Ok(())
    }

    fn observation(&self, obs: &ObservationRequest) -> Option<Value> {
        match obs.port.as_str() {
            "clock" => Some(Value::Double(self.state.get())),
            _ => None,
        }
    }
}

fn test_factory() -> ModelFactory {
    ModelFactory::new(Box::new(|name, conditions| match name {
        "generator" => Generator::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "counter" => Counter::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "pulse" => Ok(Box::new(Pulse {
            delay: Time::from_f64(1.0),
            emitted: false,
        })),
        "clock" => Ok(Box::new(Clock { state: Time::ZERO })),
        _ => Err(FactoryError::Unknown),
    }))
}

fn generator(name: &str, period: f64) -> NewModel {
    NewModel::new(name, "generator")
        .output_port("out")
        .condition("period", Value::Double(period))
}

fn counter(name: &str) -> NewModel {
    NewModel::new(name, "counter").input_port("in")
}

fn memory_view(c: &mut Coordinator, name: &str, period: f64) -> SharedRecords {
    let (stream, records) = MemoryStream::new();
    c.add_view(
        name,
        ViewKind::Timed {
            period: Time::from_f64(period),
        },
        Box::new(stream),
    )
    .unwrap();
    records
}

fn last_value_at(records: &SharedRecords, t: f64) -> Option<Value> {
    let records = records.lock().unwrap();
    records
        .iter()
        .filter(|r| r.time == Time::from_f64(t))
        .map(|r| r.value.clone())
        .last()
}

// --- scenarios -----------------------------------------------------------

#[test]
fn generator_drives_counter_to_ten() {
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen", 1.0)).unwrap();
    c.add_model("root", counter("count")).unwrap();
    c.connect("root.gen", "out", "root.count", "in").unwrap();
    let records = memory_view(&mut c, "obs", 1.0);
    c.subscribe("obs", "root.count", "counter").unwrap();

    c.run(Time::from_f64(10.0)).unwrap();

    assert_eq!(last_value_at(&records, 10.0), Some(Value::Integer(10)));
    assert_eq!(last_value_at(&records, 0.0), Some(Value::Integer(0)));
    assert_eq!(last_value_at(&records, 3.0), Some(Value::Integer(3)));
}

#[test]
fn two_generators_deliver_simultaneous_externals() {
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen_a", 1.0)).unwrap();
    c.add_model("root", generator("gen_b", 1.0)).unwrap();
    c.add_model("root", counter("count")).unwrap();
    c.connect("root.gen_a", "out", "root.count", "in").unwrap();
    c.connect("root.gen_b", "out", "root.count", "in").unwrap();
    let records = memory_view(&mut c, "obs", 1.0);
    c.subscribe("obs", "root.count", "counter").unwrap();

    c.run(Time::from_f64(5.0)).unwrap();

    assert_eq!(last_value_at(&records, 5.0), Some(Value::Integer(10)));
}

/// Spec scenario: the executive spawns a counter at t=2 and wires it to the
/// running generator, so it only sees the emissions at t=3, 4 and 5.
struct Spawner {
    fired: bool,
}

impl Dynamics for Spawner {
    fn time_advance(&self) -> Time {
        if self.fired {
            Time::INFINITY
        } else {
            Time::from_f64(2.0)
        }
    }

    fn internal_transition(&mut self, ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.fired = true;
        ctx.create_model("root", counter("late").observable("obs", "counter"))?;
        ctx.add_connection("root.gen", "out", "root.late", "in")?;
        Ok(())
    }

    fn is_executive(&self) -> bool {
        true
    }
}

#[test]
fn executive_spawns_counter_mid_run() {
    let factory = ModelFactory::new(Box::new(|name, conditions| match name {
        "generator" => Generator::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "counter" => Counter::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "spawner" => Ok(Box::new(Spawner { fired: false })),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen", 1.0)).unwrap();
    c.add_model("root", NewModel::new("exec", "spawner")).unwrap();
    let records = memory_view(&mut c, "obs", 1.0);

    c.run(Time::from_f64(5.0)).unwrap();

    assert!(c.has_model("root.late"));
    assert_eq!(last_value_at(&records, 5.0), Some(Value::Integer(3)));
    // The new model existed from t=2 but saw nothing before t=3.
    assert_eq!(last_value_at(&records, 2.0), Some(Value::Integer(0)));
}

#[test]
fn external_input_tombstones_pending_internal() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let fired_handle = fired.clone();
    let factory = ModelFactory::new(Box::new(move |name, _conditions| match name {
        "pulse" => Ok(Box::new(Pulse {
            delay: Time::from_f64(1.0),
            emitted: false,
        }) as Box<dyn Dynamics>),
        "sluggish" => Ok(Box::new(Sluggish {
            ta: Time::from_f64(3.0),
            fired: fired_handle.clone(),
        })),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model(
        "root",
        NewModel::new("pulse", "pulse").output_port("out"),
    )
    .unwrap();
    c.add_model(
        "root",
        NewModel::new("slug", "sluggish").input_port("in"),
    )
    .unwrap();
    c.connect("root.pulse", "out", "root.slug", "in").unwrap();

    c.run(Time::from_f64(12.0)).unwrap();

    // The internal scheduled for t=3 must never fire; the external at t=1
    // defers the next internal to t=11.
    assert_eq!(*fired.lock().unwrap(), vec![Time::from_f64(11.0)]);
}

#[test]
fn timed_observer_samples_on_the_period() {
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", NewModel::new("clock", "clock")).unwrap();
    let records = memory_view(&mut c, "obs", 0.5);
    c.subscribe("obs", "root.clock", "clock").unwrap();

    c.run(Time::from_f64(2.0)).unwrap();

    let records = records.lock().unwrap();
    let samples: Vec<(Time, Value)> = records.iter().map(|r| (r.time, r.value.clone())).collect();
    let expected: Vec<(Time, Value)> = [0.0, 0.5, 1.0, 1.5, 2.0]
        .iter()
        .map(|&t| (Time::from_f64(t), Value::Double(t)))
        .collect();
    assert_eq!(samples, expected);
}

/// Deletes `root.victim` at t=2 while an emission to it is still in flight.
struct Reaper {
    fired: bool,
}

impl Dynamics for Reaper {
    fn time_advance(&self) -> Time {
        if self.fired {
            Time::INFINITY
        } else {
            Time::from_f64(2.0)
        }
    }

    fn internal_transition(&mut self, ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.fired = true;
        ctx.delete_model("root.victim")?;
        Ok(())
    }

    fn is_executive(&self) -> bool {
        true
    }
}

#[test]
fn deleted_model_drops_inflight_events_and_observations() {
    let factory = ModelFactory::new(Box::new(|name, conditions| match name {
        "generator" => Generator::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "counter" => Counter::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "reaper" => Ok(Box::new(Reaper { fired: false })),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen", 1.0)).unwrap();
    c.add_model("root", counter("victim")).unwrap();
    c.add_model("root", NewModel::new("exec", "reaper")).unwrap();
    c.connect("root.gen", "out", "root.victim", "in").unwrap();
    let records = memory_view(&mut c, "obs", 1.0);
    c.subscribe("obs", "root.victim", "counter").unwrap();

    c.run(Time::from_f64(5.0)).unwrap();

    assert!(!c.has_model("root.victim"));
    let records = records.lock().unwrap();
    // The generator's t=2 emission was routed before the executive ran and
    // must be dropped with the model; nothing is observed at or after t=2.
    assert!(records.iter().all(|r| r.time < Time::from_f64(2.0)));
    assert_eq!(records.last().map(|r| r.value.clone()), Some(Value::Integer(1)));
}

// --- boundary and protocol behaviour -------------------------------------

#[test]
fn empty_event_table_terminates_without_transitions() {
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", counter("count")).unwrap();

    c.run(Time::from_f64(100.0)).unwrap();
    assert_eq!(c.current_time(), Time::ZERO);
}

#[test]
fn zero_delay_cascade_trips_the_cycle_limit() {
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen", 0.0)).unwrap();
    c.set_cycle_limit(Some(16));

    let failure = c.run(Time::from_f64(1.0)).unwrap_err();
    assert_eq!(failure.kind.kind(), ErrorKind::Protocol);
    assert!(matches!(failure.kind, KernelError::CascadeLimit { .. }));
}

/// Reschedules itself with ta=0 after its first transition, so the incoming
/// external at the same instant coincides with a pending internal.
struct Coincident {
    transitions: u32,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dynamics for Coincident {
    fn time_advance(&self) -> Time {
        match self.transitions {
            0 => Time::from_f64(1.0),
            1 => Time::ZERO,
            _ => Time::INFINITY,
        }
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.transitions += 1;
        self.log.lock().unwrap().push("internal");
        Ok(())
    }

    fn external_transition(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        _evs: &ExternalEventList,
        _t: Time,
    ) -> DynResult<()> {
        self.transitions += 1;
        self.log.lock().unwrap().push("external");
        Ok(())
    }

    fn confluent_transitions(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        _t: Time,
        _evs: &ExternalEventList,
    ) -> DynResult<ConfluentKind> {
        self.log.lock().unwrap().push("confluent");
        Ok(ConfluentKind::ExternalFirst)
    }
}

#[test]
fn coincident_internal_and_external_resolve_confluently() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_handle = log.clone();
    let factory = ModelFactory::new(Box::new(move |name, _conditions| match name {
        "pulse" => Ok(Box::new(Pulse {
            delay: Time::from_f64(1.0),
            emitted: false,
        }) as Box<dyn Dynamics>),
        "coincident" => Ok(Box::new(Coincident {
            transitions: 0,
            log: log_handle.clone(),
        })),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model(
        "root",
        NewModel::new("pulse", "pulse").output_port("out"),
    )
    .unwrap();
    c.add_model(
        "root",
        NewModel::new("co", "coincident").input_port("in"),
    )
    .unwrap();
    c.connect("root.pulse", "out", "root.co", "in").unwrap();

    c.run(Time::from_f64(2.0)).unwrap();

    // Bag 1 at t=1: internal only (the pulse's emission is routed within the
    // bag and lands in the next one). Bag 2 at t=1: the rescheduled internal
    // coincides with the external, and ExternalFirst orders the pair.
    assert_eq!(
        *log.lock().unwrap(),
        vec!["internal", "confluent", "external", "internal"]
    );
}

#[test]
fn create_then_delete_leaves_no_trace() {
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", counter("count")).unwrap();
    let sims_before = c.simulator_count();
    let events_before = c.pending_events();

    c.add_model("root", generator("tmp", 1.0)).unwrap();
    assert_eq!(c.simulator_count(), sims_before + 1);
    c.delete_model("root.tmp").unwrap();

    assert_eq!(c.simulator_count(), sims_before);
    assert_eq!(c.pending_events(), events_before);
    assert!(!c.has_model("root.tmp"));
}

/// Fails its internal transition at t=1.
struct Fragile;

impl Dynamics for Fragile {
    fn time_advance(&self) -> Time {
        Time::from_f64(1.0)
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        Err(DynamicsError::msg("boom"))
    }
}

#[test]
fn user_fault_is_fatal_and_attributed() {
    let factory = ModelFactory::new(Box::new(|name, _conditions| match name {
        "fragile" => Ok(Box::new(Fragile) as Box<dyn Dynamics>),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", NewModel::new("frail", "fragile")).unwrap();

    let failure = c.run(Time::from_f64(5.0)).unwrap_err();
    assert_eq!(failure.kind.kind(), ErrorKind::UserFault);
    assert_eq!(failure.time, Time::from_f64(1.0));
    assert_eq!(
        failure.simulator,
        Some((1, "root.frail".to_string()))
    );
}

#[test]
fn reruns_are_byte_identical() {
    let run_once = || {
        let mut c = Coordinator::new(test_factory(), 42);
        c.add_coupled(None, "root").unwrap();
        c.add_model("root", generator("gen_a", 1.0)).unwrap();
        c.add_model("root", generator("gen_b", 0.5)).unwrap();
        c.add_model("root", counter("count")).unwrap();
        c.connect("root.gen_a", "out", "root.count", "in").unwrap();
        c.connect("root.gen_b", "out", "root.count", "in").unwrap();
        let records = memory_view(&mut c, "obs", 0.5);
        c.subscribe("obs", "root.count", "counter").unwrap();
        c.run(Time::from_f64(7.0)).unwrap();
        let records = records.lock().unwrap();
        records
            .iter()
            .map(|r| format!("{}\t{}\t{}\t{}", r.time, r.model, r.port, r.value))
            .collect::<Vec<_>>()
    };
    assert_eq!(run_once(), run_once());
}

/// Clones the pre-registered "tally" class at t=2 and wires it to the
/// generator.
struct Cloner {
    fired: bool,
}

impl Dynamics for Cloner {
    fn time_advance(&self) -> Time {
        if self.fired {
            Time::INFINITY
        } else {
            Time::from_f64(2.0)
        }
    }

    fn internal_transition(&mut self, ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.fired = true;
        ctx.create_model_from_class("tally", "clone")?;
        ctx.add_connection("root.gen", "out", "root.clone", "in")?;
        Ok(())
    }

    fn is_executive(&self) -> bool {
        true
    }
}

#[test]
fn executive_clones_a_registered_class() {
    let mut factory = ModelFactory::new(Box::new(|name, conditions| match name {
        "generator" => Generator::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "counter" => Counter::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "cloner" => Ok(Box::new(Cloner { fired: false })),
        _ => Err(FactoryError::Unknown),
    }));
    factory.register_class(
        "tally",
        ModelSpec::Atomic(AtomicSpec {
            name: "tally".to_string(),
            dynamics: "counter".to_string(),
            input_ports: vec!["in".to_string()],
            output_ports: vec![],
            conditions: Conditions::default(),
            initial: indexmap::IndexMap::new(),
        }),
    );
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen", 1.0)).unwrap();
    c.add_model("root", NewModel::new("exec", "cloner")).unwrap();
    let records = memory_view(&mut c, "obs", 1.0);
    c.subscribe("obs", "root.gen", "emitted").unwrap();

    c.run(Time::from_f64(5.0)).unwrap();

    assert!(c.has_model("root.clone"));
    // The clone exists from t=2 and absorbs the emissions at t=3, 4 and 5
    // without erroring; the generator keeps running throughout.
    assert_eq!(last_value_at(&records, 5.0), Some(Value::Integer(5)));
}

/// Answers any request with `Integer(42)` on its output port.
struct Responder;

impl Dynamics for Responder {
    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    fn request(&self, _req: &RequestEvent, _t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        out.push("out", Value::Integer(42));
        Ok(())
    }
}

#[test]
fn request_answers_are_routed_as_externals() {
    let factory = ModelFactory::new(Box::new(|name, conditions| match name {
        "counter" => Counter::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "responder" => Ok(Box::new(Responder) as Box<dyn Dynamics>),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model(
        "root",
        NewModel::new("resp", "responder").output_port("out"),
    )
    .unwrap();
    c.add_model("root", counter("count")).unwrap();
    c.connect("root.resp", "out", "root.count", "in").unwrap();
    let records = memory_view(&mut c, "obs", 1.0);
    c.subscribe("obs", "root.count", "counter").unwrap();

    c.send_request("root.resp", "query", Value::Nil).unwrap();
    c.run(Time::from_f64(1.0)).unwrap();

    // The answer travels as a normal external and is counted once.
    assert_eq!(last_value_at(&records, 1.0), Some(Value::Integer(1)));
}

/// A non-executive that tries to mutate the graph anyway.
struct Overreacher;

impl Dynamics for Overreacher {
    fn time_advance(&self) -> Time {
        Time::from_f64(1.0)
    }

    fn internal_transition(&mut self, ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        ctx.delete_model("root.other")?;
        Ok(())
    }
}

#[test]
fn structural_calls_from_non_executives_are_rejected() {
    let factory = ModelFactory::new(Box::new(|name, conditions| match name {
        "counter" => Counter::from_conditions(conditions)
            .map(|d| Box::new(d) as Box<dyn Dynamics>)
            .map_err(|e| FactoryError::Failed(e.to_string())),
        "overreacher" => Ok(Box::new(Overreacher) as Box<dyn Dynamics>),
        _ => Err(FactoryError::Unknown),
    }));
    let mut c = Coordinator::new(factory, 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", counter("other")).unwrap();
    c.add_model("root", NewModel::new("rogue", "overreacher")).unwrap();

    let failure = c.run(Time::from_f64(5.0)).unwrap_err();
    assert_eq!(failure.kind.kind(), ErrorKind::UserFault);
    assert!(failure.kind.to_string().contains("executive"));
    // The attempted deletion never happened.
    assert!(c.has_model("root.other"));
}

#[test]
fn stop_request_halts_between_bags() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut c = Coordinator::new(test_factory(), 0);
    c.add_coupled(None, "root").unwrap();
    c.add_model("root", generator("gen", 1.0)).unwrap();
    c.set_control_channel(rx);

    tx.send(ControlMsg::Stop).unwrap();
    c.run(Time::from_f64(100.0)).unwrap();
    assert_eq!(c.current_time(), Time::ZERO);
}
