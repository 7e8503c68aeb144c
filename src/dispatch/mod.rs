//! Render dispatch.
//!
//! - [`RenderQueue`]: accepts render requests and returns tickets
//! - [`spawn_render_worker`]: the single background render thread
//!
//! Only one render runs at a time. Requests that arrive while the worker is
//! busy wait in the queue and are taken newest first unless configured with
//! [`DispatchOrder::Fifo`].

mod queue;
mod worker;

pub use queue::{DispatchOrder, QueueStatus, RenderOutput, RenderQueue, RenderTicket};
pub use worker::{spawn_render_worker, WorkerRequest, WorkerResponse};
