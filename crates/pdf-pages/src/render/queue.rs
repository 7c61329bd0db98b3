//! Serialized render queue
//!
//! A single worker task drains a FIFO of render jobs against one backend, so
//! at most one rasterization is in flight. Jobs are keyed by id: enqueuing an
//! id that is still waiting replaces the stale entry, `cancel` removes a
//! waiting job or trips the running job's token, and `clear` does both for
//! everything. Each job's outcome is delivered through a [`RenderTicket`].

use super::backend::{BackendError, CancelToken, PageHandle, RenderBackend, Surface, Viewport};
use crate::types::RenderError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

/// Work for the rendering backend
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub surface: Arc<Surface>,
    pub page: PageHandle,
    pub viewport: Viewport,
}

type Outcome = Result<(), RenderError>;

struct QueuedJob {
    id: String,
    job: RenderJob,
    responder: oneshot::Sender<Outcome>,
}

struct Running {
    id: String,
    token: CancelToken,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<QueuedJob>,
    running: Option<Running>,
    closed: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Completion of an enqueued job.
///
/// Resolves `Ok(())` once the bitmap is on the job's surface, or
/// `Err(RenderError::Cancelled)` when the job was cancelled, superseded or
/// its surface went away.
#[derive(Debug)]
pub struct RenderTicket {
    rx: oneshot::Receiver<Outcome>,
}

impl RenderTicket {
    /// Non-blocking check for an outcome
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RenderError::Cancelled)),
        }
    }
}

impl Future for RenderTicket {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RenderError::Cancelled)))
    }
}

/// Owned render queue; one per page-manager session.
///
/// Must be created inside a tokio runtime. Dropping the queue clears it and
/// stops the worker.
pub struct RenderQueue {
    shared: Arc<Shared>,
    _worker: JoinHandle<()>,
}

impl RenderQueue {
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), backend));
        Self {
            shared,
            _worker: worker,
        }
    }

    /// Queue `job` under `id`, replacing a waiting job with the same id
    pub fn enqueue(&self, id: impl Into<String>, job: RenderJob) -> RenderTicket {
        let id = id.into();
        let (responder, rx) = oneshot::channel();

        let mut state = self.shared.lock();
        if state.closed {
            let _ = responder.send(Err(RenderError::Cancelled));
            return RenderTicket { rx };
        }

        if let Some(pos) = state.queue.iter().position(|queued| queued.id == id) {
            if let Some(stale) = state.queue.remove(pos) {
                log::debug!("Superseding queued render job {}", id);
                let _ = stale.responder.send(Err(RenderError::Cancelled));
            }
        }
        state.queue.push_back(QueuedJob { id, job, responder });
        drop(state);

        self.shared.wake.notify_one();
        RenderTicket { rx }
    }

    /// Cancel the job with `id`, waiting or running. Returns whether one was found.
    pub fn cancel(&self, id: &str) -> bool {
        let mut state = self.shared.lock();
        let mut found = false;

        if let Some(pos) = state.queue.iter().position(|queued| queued.id == id) {
            if let Some(queued) = state.queue.remove(pos) {
                let _ = queued.responder.send(Err(RenderError::Cancelled));
                found = true;
            }
        }

        if let Some(running) = state.running.as_ref().filter(|r| r.id == id) {
            running.token.cancel();
            found = true;
        }

        found
    }

    /// Cancel the running job and reject everything still waiting
    pub fn clear(&self) {
        let mut state = self.shared.lock();
        if let Some(running) = &state.running {
            running.token.cancel();
        }
        for queued in state.queue.drain(..) {
            let _ = queued.responder.send(Err(RenderError::Cancelled));
        }
    }

    /// Jobs waiting to run (the running job is not counted)
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock();
        state.queue.is_empty() && state.running.is_none()
    }
}

impl Drop for RenderQueue {
    fn drop(&mut self) {
        self.clear();
        self.shared.lock().closed = true;
        self.shared.wake.notify_one();
    }
}

async fn run_worker(shared: Arc<Shared>, backend: Arc<dyn RenderBackend>) {
    loop {
        let next = {
            let mut state = shared.lock();
            if state.closed {
                return;
            }
            next_live_job(&mut state)
        };

        let Some((queued, token)) = next else {
            shared.wake.notified().await;
            continue;
        };

        let QueuedJob { id, job, responder } = queued;
        let outcome = execute(Arc::clone(&backend), job, token.clone()).await;

        {
            let mut state = shared.lock();
            if state.running.as_ref().is_some_and(|r| r.id == id) {
                state.running = None;
            }
        }

        if let Err(RenderError::Backend(message)) = &outcome {
            log::warn!("Render job {} failed: {}", id, message);
        }
        let _ = responder.send(outcome);
    }
}

/// Pop the next job whose surface is still attached and mark it running.
/// Jobs for detached surfaces are rejected on the way.
fn next_live_job(state: &mut QueueState) -> Option<(QueuedJob, CancelToken)> {
    while let Some(queued) = state.queue.pop_front() {
        if !queued.job.surface.is_attached() {
            log::debug!("Skipping render job {}: surface detached", queued.id);
            let _ = queued.responder.send(Err(RenderError::Cancelled));
            continue;
        }

        let token = CancelToken::new();
        state.running = Some(Running {
            id: queued.id.clone(),
            token: token.clone(),
        });
        return Some((queued, token));
    }
    None
}

async fn execute(backend: Arc<dyn RenderBackend>, job: RenderJob, token: CancelToken) -> Outcome {
    let cancel = token.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let bitmap = backend.render(&job.page, &job.viewport, &cancel)?;
        Ok((job.surface, bitmap))
    })
    .await;

    match rendered {
        Ok(Ok((surface, bitmap))) => {
            if token.is_cancelled() || !surface.is_attached() {
                Err(RenderError::Cancelled)
            } else {
                surface.present(bitmap);
                Ok(())
            }
        }
        Ok(Err(BackendError::Cancelled)) => Err(RenderError::Cancelled),
        Ok(Err(BackendError::Failed(message))) => Err(RenderError::Backend(message)),
        Err(e) => Err(RenderError::Backend(format!("Task join error: {}", e))),
    }
}
