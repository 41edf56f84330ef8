//! Asynchronous externalization service
//!
//! Requests enter an unbounded queue and are consumed by a single worker
//! task. The worker runs each walk on a blocking thread while holding the
//! engine mutex, so the graph walk stays globally serialized with the
//! synchronous entry point.
//!
//! Duplicate requests already waiting in the queue are answered from one
//! walk. Nothing outlives the batch it was computed for.

use crate::coordinator::{Externalizer, ExternalizerStore};
use crate::ExternalizeError;
use pressroom_domain::{ExternalFile, Version, VersionId};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Shared result of one externalization
pub type ExternalizeResult = Result<Arc<Vec<ExternalFile>>, ExternalizeError>;

struct Request {
    version_id: VersionId,
    reply: oneshot::Sender<ExternalizeResult>,
}

/// Pending result of an [`ExternalizerService::externalize_async`] call
#[derive(Debug)]
pub struct ExternalizeHandle {
    version_id: VersionId,
    rx: oneshot::Receiver<ExternalizeResult>,
}

impl ExternalizeHandle {
    /// Version this handle waits for
    pub fn version_id(&self) -> VersionId {
        self.version_id
    }

    /// Wait for the worker to finish the request
    pub async fn wait(self) -> ExternalizeResult {
        self.rx.await.unwrap_or(Err(ExternalizeError::WorkerStopped))
    }
}

/// Queued requests grouped by version, in first-arrival order
fn coalesce(requests: Vec<Request>) -> Vec<(VersionId, Vec<oneshot::Sender<ExternalizeResult>>)> {
    let mut groups: Vec<(VersionId, Vec<oneshot::Sender<ExternalizeResult>>)> = Vec::new();
    for request in requests {
        match groups.iter_mut().find(|(id, _)| *id == request.version_id) {
            Some((_, waiters)) => waiters.push(request.reply),
            None => groups.push((request.version_id, vec![request.reply])),
        }
    }
    groups
}

/// Take the engine lock, recovering it if an earlier walk panicked
///
/// Run state lives only for one call, so a panic leaves nothing shared
/// half-updated.
fn lock_engine<S>(engine: &Mutex<Externalizer<S>>) -> MutexGuard<'_, Externalizer<S>> {
    engine.lock().unwrap_or_else(|poisoned| {
        tracing::error!("Externalizer engine lock poisoned by a panicked walk, recovering");
        engine.clear_poison();
        poisoned.into_inner()
    })
}

/// Externalizer running behind a single background worker
pub struct ExternalizerService<S> {
    engine: Arc<Mutex<Externalizer<S>>>,
    tx: mpsc::UnboundedSender<Request>,
    worker: JoinHandle<()>,
}

impl<S> ExternalizerService<S>
where
    S: ExternalizerStore + 'static,
{
    /// Start the worker on the current tokio runtime
    pub fn start(engine: Externalizer<S>) -> Self {
        let max_depth = engine.config().max_depth;
        let engine = Arc::new(Mutex::new(engine));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&engine), rx));

        tracing::info!(max_depth, "Externalizer service started");
        Self { engine, tx, worker }
    }

    /// Queue `version_id` for externalization and return immediately
    pub fn externalize_async(&self, version_id: VersionId) -> ExternalizeHandle {
        let (reply, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(request)) = self.tx.send(Request { version_id, reply }) {
            let _ = request.reply.send(Err(ExternalizeError::WorkerStopped));
        }
        ExternalizeHandle { version_id, rx }
    }

    /// Externalize `version` on the calling thread
    ///
    /// Blocks until the engine lock is free; call it from a blocking context.
    pub fn externalize(&self, version: &Version) -> Result<Vec<ExternalFile>, ExternalizeError> {
        lock_engine(&self.engine).externalize(version)
    }

    /// Resolver walks performed by the engine so far
    pub fn walk_count(&self) -> u64 {
        lock_engine(&self.engine).walk_count()
    }

    /// Stop accepting requests, drain the queue and wait for the worker
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            tracing::error!("Externalizer worker ended abnormally: {}", e);
        }
        tracing::info!("Externalizer service stopped");
    }
}

async fn run_worker<S>(
    engine: Arc<Mutex<Externalizer<S>>>,
    mut rx: mpsc::UnboundedReceiver<Request>,
) where
    S: ExternalizerStore + 'static,
{
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        for (id, waiters) in coalesce(batch) {
            if waiters.len() > 1 {
                tracing::debug!(version_id = %id, requests = waiters.len(), "Coalesced queued requests");
            }
            let outcome = walk(Arc::clone(&engine), id).await;
            for reply in waiters {
                if reply.send(outcome.clone()).is_err() {
                    tracing::debug!(version_id = %id, "Caller dropped its handle");
                }
            }
        }
    }
}

async fn walk<S>(engine: Arc<Mutex<Externalizer<S>>>, id: VersionId) -> ExternalizeResult
where
    S: ExternalizerStore + 'static,
{
    let joined = tokio::task::spawn_blocking(move || {
        let mut guard = lock_engine(&engine);
        guard.externalize_by_id(id)
    })
    .await;
    match joined {
        Ok(result) => result.map(Arc::new),
        Err(e) => {
            tracing::error!(version_id = %id, "Externalization task failed: {}", e);
            Err(ExternalizeError::EngineUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: u128) -> (Request, oneshot::Receiver<ExternalizeResult>) {
        let (reply, rx) = oneshot::channel();
        let request = Request {
            version_id: VersionId::from_value(value),
            reply,
        };
        (request, rx)
    }

    #[test]
    fn test_coalesce_groups_duplicates_in_arrival_order() {
        let (a1, _) = request(1);
        let (b, _) = request(2);
        let (a2, _) = request(1);
        let (a3, _) = request(1);

        let groups = coalesce(vec![a1, b, a2, a3]);
        let shape: Vec<(VersionId, usize)> =
            groups.iter().map(|(id, waiters)| (*id, waiters.len())).collect();
        assert_eq!(
            shape,
            vec![(VersionId::from_value(1), 3), (VersionId::from_value(2), 1)]
        );
    }
}
