//! Background analysis on a dedicated thread.
//!
//! One request per worker. The handle sees zero or more progress messages and then
//! exactly one `Finished` message, after which iteration ends.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::analysis::AnalysisResult;
use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::pipeline::{self, AnalysisSource, Progress};

#[derive(Debug)]
pub enum WorkerMessage {
    Progress(Progress),
    Finished(Result<AnalysisResult>),
}

pub struct AnalysisWorker;

impl AnalysisWorker {
    /// Start analyzing `source` on a new thread. The source is moved into the worker.
    pub fn spawn(source: AnalysisSource, config: AnalysisConfig) -> AnalysisHandle {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let fallback_tx = tx.clone();

        let spawned = thread::Builder::new()
            .name("tempokey-worker".into())
            .spawn(move || run(source, config, worker_cancel, tx));

        let thread = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("Failed to spawn analysis worker: {}", err);
                fallback_tx
                    .send(WorkerMessage::Finished(Err(AnalysisError::Analysis(format!(
                        "failed to spawn worker thread: {}",
                        err
                    )))))
                    .ok();
                None
            }
        };

        AnalysisHandle {
            rx,
            cancel,
            thread,
            finished: false,
        }
    }
}

fn run(
    source: AnalysisSource,
    config: AnalysisConfig,
    cancel: CancelToken,
    tx: Sender<WorkerMessage>,
) -> Result<()> {
    let result = pipeline::analyze_source(source, &config, &cancel, &mut |p| {
        // A closed channel means the caller is gone; keep going until the next cancel check.
        tx.send(WorkerMessage::Progress(p)).ok();
    });

    match &result {
        Ok(_) => {}
        Err(AnalysisError::Cancelled) => log::debug!("Analysis cancelled"),
        Err(err) => log::warn!("Analysis failed: {}", err),
    }
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    tx.send(WorkerMessage::Finished(result)).ok();
    outcome
}

/// Caller side of one in-flight analysis.
///
/// Dropping the handle cancels the analysis.
pub struct AnalysisHandle {
    rx: Receiver<WorkerMessage>,
    cancel: CancelToken,
    thread: Option<JoinHandle<Result<()>>>,
    finished: bool,
}

impl AnalysisHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Abandon the analysis. The worker stops at its next cancellation check.
    pub fn cancel(self) {
        self.cancel.cancel();
    }

    /// Block until the terminal message, forwarding progress to `on_progress`.
    pub fn wait(mut self, mut on_progress: impl FnMut(&Progress)) -> Result<AnalysisResult> {
        for message in self.by_ref() {
            match message {
                WorkerMessage::Progress(p) => on_progress(&p),
                WorkerMessage::Finished(result) => return result,
            }
        }
        Err(AnalysisError::Analysis("worker produced no result".into()))
    }

    fn reap(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Analysis worker panicked");
            }
        }
    }
}

impl Iterator for AnalysisHandle {
    type Item = WorkerMessage;

    fn next(&mut self) -> Option<WorkerMessage> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(WorkerMessage::Progress(p)) => Some(WorkerMessage::Progress(p)),
            Ok(WorkerMessage::Finished(result)) => {
                self.finished = true;
                self.reap();
                Some(WorkerMessage::Finished(result))
            }
            Err(_) => {
                // Sender dropped without a terminal message: the worker died.
                self.finished = true;
                self.reap();
                Some(WorkerMessage::Finished(Err(AnalysisError::Analysis(
                    "worker terminated without a result".into(),
                ))))
            }
        }
    }
}

impl Drop for AnalysisHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}
