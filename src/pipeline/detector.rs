//! Intake queue and the single scoring worker.
//!
//! Submissions go through a bounded channel with `try_send`, so callers never
//! wait on inference. Exactly one worker drains the channel; alerts are
//! therefore recorded in dequeue order. Shutdown is cooperative: the worker
//! only observes the stop signal between items, so the record in flight
//! always finishes.

use super::Scorer;
use crate::alerts::AlertSink;
use crate::config::QueueConfig;
use crate::error::{IntakeError, ScoreError};
use crate::features::RequestRecord;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    processed: AtomicU64,
    threats: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub accepted: u64,
    pub rejected: u64,
    pub processed: u64,
    pub threats: u64,
    pub failures: u64,
    pub discarded: u64,
}

struct Running {
    tx: mpsc::Sender<RequestRecord>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum State {
    Stopped,
    Running(Running),
}

pub struct Detector {
    scorer: Arc<Scorer>,
    sink: Arc<AlertSink>,
    config: QueueConfig,
    state: Mutex<State>,
    counters: Arc<Counters>,
}

impl Detector {
    pub fn new(scorer: Arc<Scorer>, sink: Arc<AlertSink>, config: QueueConfig) -> Self {
        Self {
            scorer,
            sink,
            config,
            state: Mutex::new(State::Stopped),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running(_))
    }

    /// Spawn the worker. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), IntakeError> {
        let mut state = self.state.lock();
        if matches!(*state, State::Running(_)) {
            return Err(IntakeError::AlreadyRunning);
        }
        let (tx, rx) = mpsc::channel(self.config.capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = Worker {
            scorer: self.scorer.clone(),
            sink: self.sink.clone(),
            timeout: self.config.inference_timeout(),
            counters: self.counters.clone(),
        };
        let handle = tokio::spawn(worker.run(rx, shutdown_rx));
        *state = State::Running(Running {
            tx,
            shutdown,
            handle,
        });
        info!(capacity = self.config.capacity, "attack detection started");
        Ok(())
    }

    /// Enqueue a record for asynchronous scoring. Never blocks.
    pub fn submit(&self, record: RequestRecord) -> Result<(), IntakeError> {
        let state = self.state.lock();
        let State::Running(running) = &*state else {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(IntakeError::NotRunning);
        };
        match running.tx.try_send(record) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                Err(IntakeError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                Err(IntakeError::NotRunning)
            }
        }
    }

    /// Stop accepting work, let the in-flight record finish, join the worker and
    /// release the alert sink. No alert writes happen after this returns.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Stopped);
        let State::Running(running) = previous else {
            return;
        };
        let _ = running.shutdown.send(true);
        drop(running.tx);
        if let Err(e) = running.handle.await {
            error!(error = %e, "worker task ended abnormally");
        }
        self.sink.close();
        info!("attack detection stopped");
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.counters;
        PipelineStats {
            accepted: c.accepted.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            processed: c.processed.load(Ordering::Relaxed),
            threats: c.threats.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
        }
    }
}

struct Worker {
    scorer: Arc<Scorer>,
    sink: Arc<AlertSink>,
    timeout: Duration,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<RequestRecord>, mut shutdown: watch::Receiver<bool>) {
        debug!("worker loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                item = rx.recv() => match item {
                    Some(record) => self.process(record).await,
                    None => break,
                },
            }
        }

        rx.close();
        let mut discarded = 0u64;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.counters.discarded.fetch_add(discarded, Ordering::Relaxed);
            warn!(discarded, "queued records dropped at shutdown");
        }
        debug!("worker loop exited");
    }

    async fn process(&self, record: RequestRecord) {
        let record = Arc::new(record);
        let scoring = {
            let scorer = self.scorer.clone();
            let record = record.clone();
            tokio::task::spawn_blocking(move || scorer.score(&record))
        };
        let outcome = match tokio::time::timeout(self.timeout, scoring).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ScoreError::Task(join.to_string())),
            Err(_) => Err(ScoreError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(prediction) if prediction.is_threat() => {
                self.counters.threats.fetch_add(1, Ordering::Relaxed);
                self.sink.clone().record(&record, &prediction).await;
            }
            Ok(prediction) => {
                debug!(
                    ip = %record.ip_or_default(),
                    confidence = prediction.confidence,
                    "benign request"
                );
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(ip = %record.ip_or_default(), error = %e, "record skipped");
            }
        }
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
    }
}
