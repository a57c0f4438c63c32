//! # devsim-engine::view
//!
//! The observer subsystem. A view maps `(simulator, port)` subscriptions to a
//! sample stream. Timed views sample on a fixed period driven by observation
//! events in the table; event views sample after every transition of an
//! observed model, writing a row only when time has advanced past the last
//! written instant.

pub mod stream;

use devsim_types::{
    errors::KernelError, experiment::ViewKind, id::SimulatorId, time::Time, value::Value,
};
use stream::{Sample, Stream};

pub struct View {
    name: String,
    kind: ViewKind,
    subscriptions: Vec<(SimulatorId, String)>,
    stream: Box<dyn Stream>,
    /// Event-view buffer: samples collected at `pending_time`, written once
    /// the instant is over.
    pending: Vec<(SimulatorId, Sample)>,
    pending_time: Option<Time>,
}

impl View {
    pub fn new(
        name: impl Into<String>,
        kind: ViewKind,
        mut stream: Box<dyn Stream>,
    ) -> Result<Self, KernelError> {
        let name = name.into();
        if let ViewKind::Timed { period } = kind {
            if !period.is_finite() || period <= Time::ZERO {
                return Err(KernelError::InvalidPeriod { view: name });
            }
        }
        stream.open(&name, &Value::Nil)?;
        Ok(Self {
            name,
            kind,
            subscriptions: Vec::new(),
            stream,
            pending: Vec::new(),
            pending_time: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.kind, ViewKind::Timed { .. })
    }

    pub fn period(&self) -> Option<Time> {
        match self.kind {
            ViewKind::Timed { period } => Some(period),
            ViewKind::Event => None,
        }
    }

    /// Registers a subscription. For a timed view, returns the time of the
    /// first observation event the caller must enqueue; event views sample
    /// whenever the port next yields a value.
    pub fn add_observable(&mut self, sim: SimulatorId, port: &str, now: Time) -> Option<Time> {
        self.subscriptions.push((sim, port.to_string()));
        self.is_timed().then_some(now)
    }

    /// Drops every subscription of a deleted model, including buffered
    /// samples that have not been written yet.
    pub fn remove_observable(&mut self, sim: SimulatorId) {
        self.subscriptions.retain(|(s, _)| *s != sim);
        self.pending.retain(|(s, _)| *s != sim);
    }

    pub fn observes(&self, sim: SimulatorId) -> bool {
        self.subscriptions.iter().any(|(s, _)| *s == sim)
    }

    /// Ports of `sim` this view observes.
    pub fn ports_of(&self, sim: SimulatorId) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|(s, _)| *s == sim)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Timed-view sample: written through immediately.
    pub fn record_timed(&mut self, t: Time, sample: Sample) -> Result<(), KernelError> {
        self.stream.write_values(t, &[sample])
    }

    /// Event-view sample: buffered per instant, flushed when time advances.
    /// A model transitioning repeatedly at one instant overwrites its earlier
    /// sample, so the row reflects the state the instant settled on.
    pub fn record_event(
        &mut self,
        t: Time,
        sim: SimulatorId,
        sample: Sample,
    ) -> Result<(), KernelError> {
        if self.pending_time != Some(t) {
            self.flush()?;
            self.pending_time = Some(t);
        }
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|(s, existing)| *s == sim && existing.port == sample.port)
        {
            existing.1 = sample;
        } else {
            self.pending.push((sim, sample));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), KernelError> {
        if let Some(t) = self.pending_time.take() {
            if !self.pending.is_empty() {
                let rows: Vec<Sample> = self.pending.drain(..).map(|(_, s)| s).collect();
                self.stream.write_values(t, &rows)?;
            }
        }
        Ok(())
    }

    /// Final flush and sink close, called once at teardown.
    pub fn finish(&mut self) -> Result<(), KernelError> {
        self.flush()?;
        self.stream.close()
    }
}
