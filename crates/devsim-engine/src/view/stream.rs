//! # devsim-engine::view::stream
//!
//! Observation sinks. A `Stream` receives the samples a view materialises;
//! the kernel ships a text sink writing the newline-delimited TAB format and
//! an in-memory sink the tests and embedders can inspect after a run.

use devsim_types::{errors::KernelError, time::Time, value::Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One materialised observation row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Full dotted path of the observed model.
    pub model: String,
    pub port: String,
    pub value: Value,
}

/// Where a view writes its samples. Implementations must not block on
/// anything but their own sink: they run inline on the coordinator thread.
pub trait Stream: Send {
    /// Called once when the owning view is created.
    fn open(&mut self, view: &str, params: &Value) -> Result<(), KernelError>;

    fn write_values(&mut self, t: Time, samples: &[Sample]) -> Result<(), KernelError>;

    /// Called once at teardown, after the final flush.
    fn close(&mut self) -> Result<(), KernelError>;
}

/// Newline-delimited records of `time TAB model_path TAB port TAB value`.
pub struct TextStream {
    out: BufWriter<Box<dyn Write + Send>>,
    view: String,
}

impl TextStream {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: BufWriter::new(out),
            view: String::new(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(Box::new(File::create(path)?)))
    }

    fn sink_error(&self, error: io::Error) -> KernelError {
        KernelError::StreamWrite {
            view: self.view.clone(),
            reason: error.to_string(),
        }
    }
}

impl Stream for TextStream {
    fn open(&mut self, view: &str, _params: &Value) -> Result<(), KernelError> {
        self.view = view.to_string();
        Ok(())
    }

    fn write_values(&mut self, t: Time, samples: &[Sample]) -> Result<(), KernelError> {
        for sample in samples {
            writeln!(
                self.out,
                "{}\t{}\t{}\t{}",
                t, sample.model, sample.port, sample.value
            )
            .map_err(|e| self.sink_error(e))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), KernelError> {
        self.out.flush().map_err(|e| self.sink_error(e))
    }
}

/// One record collected by a [`MemoryStream`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: Time,
    pub model: String,
    pub port: String,
    pub value: Value,
}

pub type SharedRecords = Arc<Mutex<Vec<Record>>>;

/// Collects samples in memory; the shared handle stays readable after the
/// coordinator has consumed the stream.
pub struct MemoryStream {
    records: SharedRecords,
}

impl MemoryStream {
    pub fn new() -> (Self, SharedRecords) {
        let records: SharedRecords = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

impl Stream for MemoryStream {
    fn open(&mut self, _view: &str, _params: &Value) -> Result<(), KernelError> {
        Ok(())
    }

    fn write_values(&mut self, t: Time, samples: &[Sample]) -> Result<(), KernelError> {
        let mut records = self.records.lock().expect("memory stream poisoned");
        records.extend(samples.iter().map(|s| Record {
            time: t,
            model: s.model.clone(),
            port: s.port.clone(),
            value: s.value.clone(),
        }));
        Ok(())
    }

    fn close(&mut self) -> Result<(), KernelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_stream_writes_tab_records() {
        let buffer: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

        struct SharedWriter(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut stream = TextStream::new(Box::new(SharedWriter(buffer.clone())));
        stream.open("v", &Value::Nil).unwrap();
        stream
            .write_values(
                Time::from_f64(1.5),
                &[Sample {
                    model: "root.counter".to_string(),
                    port: "counter".to_string(),
                    value: Value::Integer(3),
                }],
            )
            .unwrap();
        stream.close().unwrap();

        let written = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "1.5\troot.counter\tcounter\t3\n");
    }
}
