//! Run-and-report helper for detached background work.

use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;

/// Spawn a fallible operation on its own task. Errors and panics are routed
/// to the structured logger and never surface to the caller — the triggering
/// request must not fail because a background side effect did.
pub fn spawn_logged<F>(task: &'static str, fut: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, task, "background task failed"),
            Err(_) => tracing::error!(task, "background task panicked"),
        }
    })
}
