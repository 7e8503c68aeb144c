//! Render queue ordering through the public API.
//!
//! Tests verify:
//! - The newest queued job runs next under LIFO dispatch
//! - Jobs run in submission order under FIFO dispatch
//! - Rendered buffers have the requested size

use std::sync::Arc;

use mandel_tiles::{DispatchOrder, Rect, RenderQueue, Renderer};

const ROOT: Rect = Rect::new(-2.0, -2.0, 2.0, 2.0);

/// Submit `count` jobs back to back and return their completion indexes in
/// submission order.
///
/// The first job goes to the worker at once; the rest wait in the queue.
async fn completion_indexes(order: DispatchOrder, count: usize) -> Vec<u64> {
    let queue = RenderQueue::spawn(Arc::new(Renderer::default()), order);

    let tickets: Vec<_> = (0..count)
        .map(|_| queue.submit(ROOT, 16, 16).unwrap())
        .collect();

    let mut indexes = Vec::with_capacity(count);
    for ticket in tickets {
        let output = ticket.wait().await.unwrap();
        assert_eq!(output.image.dimensions(), (16, 16));
        indexes.push(output.completion_index);
    }
    indexes
}

#[tokio::test]
async fn test_lifo_runs_newest_waiting_job_first() {
    // a runs first; then c, then b
    assert_eq!(completion_indexes(DispatchOrder::Lifo, 3).await, vec![0, 2, 1]);
}

#[tokio::test]
async fn test_lifo_with_longer_backlog() {
    assert_eq!(
        completion_indexes(DispatchOrder::Lifo, 5).await,
        vec![0, 4, 3, 2, 1]
    );
}

#[tokio::test]
async fn test_fifo_runs_in_submission_order() {
    assert_eq!(completion_indexes(DispatchOrder::Fifo, 3).await, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_ticket_ids_are_sequential() {
    let queue = RenderQueue::spawn(Arc::new(Renderer::default()), DispatchOrder::Lifo);
    let first = queue.submit(ROOT, 4, 4).unwrap();
    let second = queue.submit(ROOT, 4, 4).unwrap();
    assert_eq!(second.id(), first.id() + 1);

    let output = second.wait().await.unwrap();
    assert_eq!(output.id, 1);
    first.wait().await.unwrap();
}

#[tokio::test]
async fn test_worker_and_inline_render_identically() {
    let renderer = Arc::new(Renderer::default());
    let worker = RenderQueue::spawn(renderer.clone(), DispatchOrder::Lifo);
    let inline = RenderQueue::inline(renderer);

    let rect = Rect::new(-0.75, 0.0, -0.25, 0.5);
    let a = worker.render(rect, 8, 8).await.unwrap();
    let b = inline.render(rect, 8, 8).await.unwrap();
    assert_eq!(a.image, b.image);
}
