use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use console::style;
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::clock::Clock;
use super::record::AuditRecord;
use super::stream::{self, LogStream, ARCHIVE_DIR, JSON_EXT, TEXT_EXT};

pub const GENERAL_STREAM: &str = "audit";
pub const SECURITY_STREAM: &str = "security";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditState {
    Uninitialized,
    Ready,
    Rotating,
}

impl AuditState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Ready,
            2 => Self::Rotating,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Ready => 1,
            Self::Rotating => 2,
        }
    }
}

/// One audit stream: JSON records plus their human-readable companion. Both
/// files rotate and expire together.
struct StreamFiles {
    records: LogStream,
    text: LogStream,
}

impl StreamFiles {
    fn open(dir: &Path, name: &'static str) -> Result<Self> {
        Ok(Self {
            records: LogStream::open(dir, name, JSON_EXT)
                .with_context(|| format!("open {name} audit stream"))?,
            text: LogStream::open(dir, name, TEXT_EXT)
                .with_context(|| format!("open {name} audit text stream"))?,
        })
    }

    fn append(&mut self, record: &AuditRecord, today: NaiveDate) -> Result<()> {
        self.records.append(&record.to_json(), today)?;
        self.text.append(&record.human_line(), today)
    }
}

/// Owner of the stream files. Only the writer task touches it, so appends
/// and rotations never interleave.
pub struct AuditSink {
    general: StreamFiles,
    security: StreamFiles,
    archive_dir: PathBuf,
    clock: Arc<dyn Clock>,
    retention_days: u64,
    /// Day of the last successful retention sweep.
    swept: Option<NaiveDate>,
    state: Arc<AtomicU8>,
}

impl AuditSink {
    /// Opens the streams under `dir`. The sink stays `Uninitialized` until a
    /// writer task starts draining into it.
    pub fn open(dir: &Path, clock: Arc<dyn Clock>, retention_days: u64) -> Result<Self> {
        Ok(Self {
            general: StreamFiles::open(dir, GENERAL_STREAM)?,
            security: StreamFiles::open(dir, SECURITY_STREAM)?,
            archive_dir: dir.join(ARCHIVE_DIR),
            clock,
            retention_days,
            swept: None,
            state: Arc::new(AtomicU8::new(AuditState::Uninitialized.as_u8())),
        })
    }

    pub fn state(&self) -> AuditState {
        AuditState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Appends the record to the general stream, and to the security stream
    /// when it carries a violation. Due rotations happen first.
    pub fn write(&mut self, record: &AuditRecord) -> Result<()> {
        let today = self.clock.now().date_naive();
        self.rotate_due(today);
        self.sweep(today);

        self.general.append(record, today)?;
        if record.is_security() {
            self.security.append(record, today)?;
        }
        Ok(())
    }

    /// Rotates any stream left over from an earlier day, and sweeps expired
    /// archives once per day even when nothing was written.
    pub fn maintain(&mut self) {
        let today = self.clock.now().date_naive();
        self.rotate_due(today);
        self.sweep(today);
    }

    /// Archives every stream regardless of its day and sweeps expired
    /// archives.
    pub fn force_rotate(&mut self) -> Result<Vec<PathBuf>> {
        let today = self.clock.now().date_naive();
        let prev = self.state();
        self.set_state(AuditState::Rotating);
        let result = self.rotate_all(today);
        self.set_state(prev);

        let archived = result?;
        self.purge(today)?;
        self.swept = Some(today);
        Ok(archived)
    }

    pub fn purge(&self, today: NaiveDate) -> Result<usize> {
        let count = stream::purge_archives(&self.archive_dir, self.retention_days, today)?;
        if count > 0 {
            info!(
                "Removed {count} audit archive(s) older than {} days",
                self.retention_days
            );
        }
        Ok(count)
    }

    fn streams_mut(&mut self) -> [&mut LogStream; 4] {
        [
            &mut self.general.records,
            &mut self.general.text,
            &mut self.security.records,
            &mut self.security.text,
        ]
    }

    fn rotate_all(&mut self, today: NaiveDate) -> Result<Vec<PathBuf>> {
        let mut archived = Vec::with_capacity(4);
        for stream in self.streams_mut() {
            if let Some(path) = stream.rotate(today)? {
                archived.push(path);
            }
        }
        Ok(archived)
    }

    fn rotate_due(&mut self, today: NaiveDate) {
        if !self.streams_mut().iter().any(|stream| stream.is_due(today)) {
            return;
        }

        let prev = self.state();
        self.set_state(AuditState::Rotating);
        for stream in self.streams_mut() {
            if !stream.is_due(today) {
                continue;
            }
            if let Err(e) = stream.rotate(today) {
                error!("Rotate {} failed: {e:#}", stream.path().display());
            }
        }
        self.set_state(prev);
    }

    fn sweep(&mut self, today: NaiveDate) {
        if self.swept == Some(today) {
            return;
        }
        match self.purge(today) {
            Ok(_) => self.swept = Some(today),
            Err(e) => error!("Purge audit archives failed: {e:#}"),
        }
    }

    fn set_state(&self, state: AuditState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Cheaply cloneable handle for recording audit records.
///
/// `record` never blocks: the record goes through a bounded channel to the
/// writer task, and is dropped with a warning if the channel is full.
#[derive(Clone)]
pub struct AuditLogger {
    tx: mpsc::Sender<AuditRecord>,
    state: Arc<AtomicU8>,
    console_alerts: bool,
}

impl AuditLogger {
    /// Returns whether the record was handed to the writer.
    pub fn record(&self, record: AuditRecord) -> bool {
        info!("{}", record.human_line());
        if let Some(ref security) = record.security {
            warn!(
                "Security violation from {} on {} {}: {security}",
                record.ip, record.method, record.url
            );
            if self.console_alerts {
                eprintln!(
                    "{} {} {} {} {}",
                    style("[SECURITY]").red().bold(),
                    record.timestamp,
                    record.ip,
                    style(format!("{} {}", record.method, record.url)).bold(),
                    style(security).red()
                );
            }
        }

        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                warn!("Audit channel full, record {} dropped", record.request_id);
                false
            }
            Err(TrySendError::Closed(record)) => {
                warn!("Audit writer stopped, record {} dropped", record.request_id);
                false
            }
        }
    }

    pub fn state(&self) -> AuditState {
        AuditState::from_u8(self.state.load(Ordering::Acquire))
    }
}

pub struct AuditWorker {
    rx: mpsc::Receiver<AuditRecord>,
    sink: AuditSink,
    tick: Duration,
}

/// Creates the logger handle and the writer that drains it. The writer does
/// nothing until started.
pub fn create(
    sink: AuditSink,
    capacity: usize,
    tick: Duration,
    console_alerts: bool,
) -> (AuditLogger, AuditWorker) {
    let (tx, rx) = mpsc::channel(capacity);
    let logger = AuditLogger {
        tx,
        state: sink.state.clone(),
        console_alerts,
    };
    let worker = AuditWorker { rx, sink, tick };
    (logger, worker)
}

impl AuditWorker {
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.main_loop().await;
        })
    }

    /// Runs until every [`AuditLogger`] is dropped and the channel is drained.
    pub async fn main_loop(mut self) {
        self.sink.set_state(AuditState::Ready);
        self.sink.maintain();

        let mut intv = interval_at(Instant::now() + self.tick, self.tick);

        info!("Starting audit writer");
        loop {
            tokio::select! {
                record = self.rx.recv() => {
                    match record {
                        Some(record) => {
                            if let Err(e) = self.sink.write(&record) {
                                error!("Write audit record {} failed: {e:#}", record.request_id);
                            }
                        }
                        None => {
                            info!("Audit channel closed, writer stopped");
                            break;
                        }
                    }
                }
                _ = intv.tick() => self.sink.maintain(),
            }
        }
    }
}
