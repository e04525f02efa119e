//! In-process job queue feeding the pipeline worker pool
//!
//! Jobs are enqueued after the transaction that makes them runnable commits,
//! so a worker never observes a job for state that does not exist yet. The
//! channel is at-least-once: handlers are idempotent and a duplicate job
//! degrades to a no-op.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::model::ContextSource;
use crate::service::orchestrator::Orchestrator;

/// One unit of asynchronous pipeline work
#[derive(Debug, Clone)]
pub enum Job {
    ExtractDocument {
        document_id: i64,
    },
    CleanDocument {
        document_id: i64,
    },
    DeidentifyDocument {
        document_id: i64,
        country: String,
    },
    AnalyzeClaim {
        claim_id: i64,
        prompt_id: String,
        actor: String,
    },
    GenerateReport {
        claim_id: i64,
        prompt_id: String,
        model_used: String,
        sources: Vec<ContextSource>,
        actor: String,
    },
    EmbedReference {
        reference_id: i64,
    },
}

impl Job {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Job::ExtractDocument { .. } => "extract_document",
            Job::CleanDocument { .. } => "clean_document",
            Job::DeidentifyDocument { .. } => "deidentify_document",
            Job::AnalyzeClaim { .. } => "analyze_claim",
            Job::GenerateReport { .. } => "generate_report",
            Job::EmbedReference { .. } => "embed_reference",
        }
    }
}

/// Cloneable handle for enqueueing jobs
#[derive(Clone)]
pub struct JobQueue {
    sender: UnboundedSender<Job>,
}

impl JobQueue {
    pub fn dispatch(&self, job: Job) {
        let kind = job.kind();
        if self.sender.send(job).is_err() {
            // Receiver dropped means the worker pool is gone; recovery
            // endpoints can re-dispatch once it is back.
            tracing::error!(kind = %kind, "Job dropped, worker pool is not running");
        }
    }
}

/// Create the queue and its receiving end
pub fn channel() -> (JobQueue, UnboundedReceiver<Job>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (JobQueue { sender }, receiver)
}

/// Spawn `count` workers draining the shared receiver.
///
/// Workers never die on job failure: the orchestrator converts errors into
/// claim-level FAILED status, and the worker moves on.
pub fn spawn_workers(
    count: usize,
    receiver: UnboundedReceiver<Job>,
    orchestrator: Arc<Orchestrator>,
) {
    let receiver = Arc::new(Mutex::new(receiver));

    for worker_id in 0..count {
        let receiver = Arc::clone(&receiver);
        let orchestrator = Arc::clone(&orchestrator);

        tokio::spawn(async move {
            tracing::info!(worker_id, "Pipeline worker started");
            loop {
                let job = {
                    let mut rx = receiver.lock().await;
                    rx.recv().await
                };
                match job {
                    Some(job) => {
                        tracing::debug!(worker_id, kind = %job.kind(), "Job picked up");
                        orchestrator.run(job).await;
                    }
                    None => {
                        tracing::info!(worker_id, "Job queue closed, worker exiting");
                        break;
                    }
                }
            }
        });
    }
}
