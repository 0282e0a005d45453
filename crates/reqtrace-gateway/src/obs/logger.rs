//! Durable JSON-lines event log.
//!
//! Each event becomes one line: `{"timestamp", "message", ...fields}`, with
//! caller fields merged last. [`JsonLineSink`] appends synchronously;
//! [`QueuedSink`] puts a bounded queue and a dedicated writer thread in front
//! of any [`LineWriter`] so request paths never wait on the disk.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use reqtrace_core::error::{Result, TelemetryError};
use reqtrace_core::sink::{EventSink, Fields};

/// Encode one event as a newline-terminated JSON line.
pub fn encode_line(message: &str, fields: &Fields) -> Result<Bytes> {
    let mut entry = Fields::new();
    entry.insert(
        "timestamp".into(),
        Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    entry.insert("message".into(), Value::from(message));
    for (k, v) in fields {
        entry.insert(k.clone(), v.clone());
    }

    let mut line = serde_json::to_vec(&Value::Object(entry))
        .map_err(|e| TelemetryError::Sink(format!("encode failed: {e}")))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Destination for already-encoded lines, driven by the [`QueuedSink`] worker.
pub trait LineWriter: Send + 'static {
    fn write_line(&self, line: &[u8]) -> Result<()>;
}

/// Appends lines to a file and optionally echoes them to stdout.
#[derive(Debug)]
pub struct JsonLineSink {
    file: Mutex<File>,
    console: bool,
}

impl JsonLineSink {
    pub fn open(path: &str, console: bool) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            console,
        })
    }
}

impl LineWriter for JsonLineSink {
    fn write_line(&self, line: &[u8]) -> Result<()> {
        {
            let mut f = self.file.lock().unwrap_or_else(PoisonError::into_inner);
            f.write_all(line)?;
        }
        if self.console {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(line);
        }
        Ok(())
    }
}

impl EventSink for JsonLineSink {
    fn log(&self, message: &str, fields: &Fields) -> Result<()> {
        let line = encode_line(message, fields)?;
        self.write_line(&line)
    }
}

/// Non-blocking front for a [`LineWriter`].
///
/// `log` encodes on the caller and `try_send`s the line; a full or closed
/// queue is reported as a sink error (and counted by the instrumentation).
/// Write failures on the worker are logged only. [`QueuedSink::close`] (or
/// dropping the sink) closes the queue and waits until the worker has
/// written everything already accepted.
#[derive(Debug)]
pub struct QueuedSink {
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedSink {
    pub fn spawn<W: LineWriter>(inner: W, queue: usize) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel::<Bytes>(queue.max(1));

        let worker = thread::Builder::new()
            .name("reqtrace-log-writer".into())
            .spawn(move || {
                while let Some(line) = rx.blocking_recv() {
                    if let Err(e) = inner.write_line(&line) {
                        tracing::warn!(error = %e, "event log write failed");
                    }
                }
            })?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Stop accepting events and block until the queue is drained.
    /// Idempotent; later `log` calls fail with a sink error.
    pub fn close(&self) -> Result<()> {
        drop(lock(&self.tx).take());

        let Some(worker) = lock(&self.worker).take() else {
            return Ok(());
        };
        worker
            .join()
            .map_err(|_| TelemetryError::Internal("event writer panicked".into()))
    }
}

impl EventSink for QueuedSink {
    fn log(&self, message: &str, fields: &Fields) -> Result<()> {
        let line = encode_line(message, fields)?;
        let guard = lock(&self.tx);
        let Some(tx) = guard.as_ref() else {
            return Err(TelemetryError::Sink("event writer stopped".into()));
        };
        tx.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => TelemetryError::Sink("event queue full".into()),
            TrySendError::Closed(_) => TelemetryError::Sink("event writer stopped".into()),
        })
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "event writer did not shut down cleanly");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
