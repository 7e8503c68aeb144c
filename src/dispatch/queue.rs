//! Render job queue.
//!
//! All render requests go through a [`RenderQueue`]. In worker mode one
//! dispatcher task owns the queue state and feeds the background worker one
//! job at a time:
//!
//! ```text
//!   submit() ──Job──▶ dispatcher task ──WorkerRequest──▶ render-worker thread
//!      ▲                   │    ▲                              │
//!      │                   │    └──────WorkerResponse──────────┘
//!      └──oneshot result───┘
//! ```
//!
//! While a job runs, new jobs wait. When it completes, the next job is taken
//! according to the [`DispatchOrder`]: newest first by default, so the tiles
//! the viewer asked for last are rendered first.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use clap::ValueEnum;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::fractal::Renderer;
use crate::geometry::Rect;

use super::worker::{spawn_render_worker, WorkerRequest, WorkerResponse};

// =============================================================================
// Types
// =============================================================================

/// Which queued job runs next once the worker is free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOrder {
    /// Most recently submitted first
    #[default]
    Lifo,
    /// Oldest first
    Fifo,
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub id: u64,
    pub image: RgbaImage,
    /// Position of this job in completion order, starting at 0.
    pub completion_index: u64,
}

/// Snapshot of the queue for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub busy: bool,
    pub queued: usize,
}

type Reply = oneshot::Sender<Result<RenderOutput, RenderError>>;

/// Handle to a submitted job.
#[derive(Debug)]
pub struct RenderTicket {
    id: u64,
    result: oneshot::Receiver<Result<RenderOutput, RenderError>>,
}

impl RenderTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<RenderOutput, RenderError> {
        match self.result.await {
            Ok(result) => result,
            Err(_) => Err(RenderError::WorkerGone { id: self.id }),
        }
    }
}

// =============================================================================
// Dispatcher state
// =============================================================================

/// Queue bookkeeping with no I/O, owned by the dispatcher task.
///
/// At most one job is in flight. `T` is whatever the caller needs to hand
/// back on completion.
#[derive(Debug)]
pub(crate) struct Dispatcher<T> {
    order: DispatchOrder,
    waiting: VecDeque<WorkerRequest>,
    pending: HashMap<u64, (WorkerRequest, T)>,
    in_flight: Option<u64>,
    completed: u64,
}

impl<T> Dispatcher<T> {
    pub(crate) fn new(order: DispatchOrder) -> Self {
        Self {
            order,
            waiting: VecDeque::new(),
            pending: HashMap::new(),
            in_flight: None,
            completed: 0,
        }
    }

    pub(crate) fn push(&mut self, request: WorkerRequest, reply: T) {
        self.waiting.push_back(request.clone());
        self.pending.insert(request.id, (request, reply));
    }

    /// Take the next job to run, if the worker is idle.
    pub(crate) fn next(&mut self) -> Option<WorkerRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let request = match self.order {
            DispatchOrder::Lifo => self.waiting.pop_back(),
            DispatchOrder::Fifo => self.waiting.pop_front(),
        }?;
        self.in_flight = Some(request.id);
        Some(request)
    }

    /// Record a completion for `id`.
    ///
    /// Returns `None` for an id that is not the job in flight; the worker
    /// stays busy in that case.
    pub(crate) fn complete(&mut self, id: u64) -> Option<(WorkerRequest, T, u64)> {
        if self.in_flight != Some(id) {
            return None;
        }
        self.in_flight = None;
        let (request, reply) = self.pending.remove(&id)?;
        let index = self.completed;
        self.completed += 1;
        Some((request, reply, index))
    }

    /// Drop every job that has not completed, returning their replies.
    pub(crate) fn drain(&mut self) -> Vec<(u64, T)> {
        self.waiting.clear();
        self.in_flight = None;
        self.pending
            .drain()
            .map(|(id, (_, reply))| (id, reply))
            .collect()
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub(crate) fn queued(&self) -> usize {
        self.waiting.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.waiting.is_empty()
    }
}

/// Turn a worker payload into an image, checking its size.
fn into_output(
    request: &WorkerRequest,
    data: Vec<u8>,
    completion_index: u64,
) -> Result<RenderOutput, RenderError> {
    let expected = request.width as usize * request.height as usize * 4;
    let actual = data.len();
    let image = RgbaImage::from_raw(request.width, request.height, data)
        .filter(|_| actual == expected)
        .ok_or(RenderError::PayloadSize {
            id: request.id,
            expected,
            actual,
        })?;
    Ok(RenderOutput {
        id: request.id,
        image,
        completion_index,
    })
}

// =============================================================================
// Render Queue
// =============================================================================

struct Job {
    request: WorkerRequest,
    reply: Reply,
}

#[derive(Default)]
struct SharedStatus {
    busy: AtomicBool,
    queued: AtomicUsize,
}

enum Backend {
    /// Render in the submitting task
    Inline { completed: AtomicU64 },
    /// Hand jobs to the dispatcher task
    Worker { jobs: mpsc::UnboundedSender<Job> },
}

/// Entry point for render requests.
pub struct RenderQueue {
    renderer: Arc<Renderer>,
    backend: Backend,
    next_id: AtomicU64,
    status: Arc<SharedStatus>,
}

impl RenderQueue {
    /// Start the background worker and its dispatcher task.
    ///
    /// Must be called inside a Tokio runtime. Falls back to inline rendering
    /// if the worker thread cannot be started.
    pub fn spawn(renderer: Arc<Renderer>, order: DispatchOrder) -> Self {
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        let worker = match spawn_render_worker(renderer.clone(), resp_tx) {
            Ok(worker) => worker,
            Err(e) => {
                warn!("{}; rendering inline", e);
                return Self::inline(renderer);
            }
        };

        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let status = Arc::new(SharedStatus::default());
        tokio::spawn(run_dispatcher(
            jobs_rx,
            resp_rx,
            worker,
            order,
            status.clone(),
        ));

        Self {
            renderer,
            backend: Backend::Worker { jobs: jobs_tx },
            next_id: AtomicU64::new(0),
            status,
        }
    }

    /// Render synchronously in the submitting task, without queueing.
    pub fn inline(renderer: Arc<Renderer>) -> Self {
        Self {
            renderer,
            backend: Backend::Inline {
                completed: AtomicU64::new(0),
            },
            next_id: AtomicU64::new(0),
            status: Arc::new(SharedStatus::default()),
        }
    }

    /// Worker-mode queue whose dispatcher is already gone.
    #[cfg(test)]
    pub(crate) fn disconnected(renderer: Arc<Renderer>) -> Self {
        let (jobs, _) = mpsc::unbounded_channel();
        Self {
            renderer,
            backend: Backend::Worker { jobs },
            next_id: AtomicU64::new(0),
            status: Arc::new(SharedStatus::default()),
        }
    }

    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.backend, Backend::Inline { .. })
    }

    /// Queue a render of `rect` at `width` x `height` pixels.
    pub fn submit(
        &self,
        rect: Rect,
        width: u32,
        height: u32,
    ) -> Result<RenderTicket, RenderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = WorkerRequest {
            id,
            rect,
            width,
            height,
        };
        let (reply, result) = oneshot::channel();

        match &self.backend {
            Backend::Inline { completed } => {
                let response = request.run(&self.renderer);
                let index = completed.fetch_add(1, Ordering::Relaxed);
                let _ = reply.send(into_output(&request, response.data, index));
            }
            Backend::Worker { jobs } => {
                jobs.send(Job { request, reply })
                    .map_err(|_| RenderError::WorkerGone { id })?;
            }
        }

        Ok(RenderTicket { id, result })
    }

    /// Submit and wait.
    pub async fn render(
        &self,
        rect: Rect,
        width: u32,
        height: u32,
    ) -> Result<RenderOutput, RenderError> {
        self.submit(rect, width, height)?.wait().await
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            busy: self.status.busy.load(Ordering::Relaxed),
            queued: self.status.queued.load(Ordering::Relaxed),
        }
    }
}

/// Dispatcher task: owns the queue and talks to the worker.
///
/// Runs until the queue handle is dropped and every accepted job finished,
/// or until the worker goes away.
async fn run_dispatcher(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut responses: mpsc::UnboundedReceiver<WorkerResponse>,
    worker: std::sync::mpsc::Sender<WorkerRequest>,
    order: DispatchOrder,
    status: Arc<SharedStatus>,
) {
    let mut dispatcher: Dispatcher<Reply> = Dispatcher::new(order);
    let mut accepting = true;

    loop {
        tokio::select! {
            biased;

            job = jobs.recv(), if accepting => match job {
                Some(Job { request, reply }) => {
                    dispatcher.push(request, reply);
                }
                None => accepting = false,
            },

            response = responses.recv() => match response {
                Some(WorkerResponse { id, data }) => match dispatcher.complete(id) {
                    Some((request, reply, index)) => {
                        debug!(id, index, "Render job complete");
                        let _ = reply.send(into_output(&request, data, index));
                    }
                    None => warn!(id, "Ignoring completion for unknown render job"),
                },
                None => break,
            },
        }

        if let Some(request) = dispatcher.next() {
            let id = request.id;
            debug!(id, queued = dispatcher.queued(), "Dispatching render job");
            if worker.send(request).is_err() {
                break;
            }
        }

        status.busy.store(dispatcher.is_busy(), Ordering::Relaxed);
        status.queued.store(dispatcher.queued(), Ordering::Relaxed);

        if !accepting && dispatcher.is_idle() {
            break;
        }
    }

    for (id, reply) in dispatcher.drain() {
        let _ = reply.send(Err(RenderError::WorkerGone { id }));
    }
    status.busy.store(false, Ordering::Relaxed);
    status.queued.store(0, Ordering::Relaxed);
    debug!("Render dispatcher exiting");
}

// =============================================================================
// Tests
// =============================================================================
