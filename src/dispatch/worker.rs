//! Background render worker.
//!
//! A single named OS thread that renders one rectangle per request and
//! returns the raw RGBA bytes. It knows nothing about queueing; the
//! dispatcher decides what to send and when.

use std::sync::mpsc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::RenderError;
use crate::fractal::Renderer;
use crate::geometry::Rect;

/// Job sent to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub id: u64,
    pub rect: Rect,
    pub width: u32,
    pub height: u32,
}

/// Completed job: `data` holds `width * height * 4` RGBA bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub id: u64,
    pub data: Vec<u8>,
}

impl WorkerRequest {
    /// Render this request synchronously.
    pub fn run(&self, renderer: &Renderer) -> WorkerResponse {
        let image = renderer.render(&self.rect, self.width, self.height);
        WorkerResponse {
            id: self.id,
            data: image.into_raw(),
        }
    }
}

/// Spawn the render worker thread.
///
/// Returns the send side for requests. Responses go to `responses`. The
/// thread runs until the request sender is dropped or the response
/// receiver goes away.
pub fn spawn_render_worker(
    renderer: Arc<Renderer>,
    responses: UnboundedSender<WorkerResponse>,
) -> Result<mpsc::Sender<WorkerRequest>, RenderError> {
    let (req_tx, req_rx) = mpsc::channel::<WorkerRequest>();

    std::thread::Builder::new()
        .name("render-worker".into())
        .spawn(move || {
            debug!("Render worker thread started");
            while let Ok(request) = req_rx.recv() {
                let response = request.run(&renderer);
                if responses.send(response).is_err() {
                    break;
                }
            }
            debug!("Render worker thread exiting");
        })
        .map_err(|e| RenderError::WorkerSpawn(e.to_string()))?;

    Ok(req_tx)
}
