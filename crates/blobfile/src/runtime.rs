//! Tokio runtime management for synchronous operations

use crate::{BlobError, Result};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Runtime;

const DEFAULT_WORKER_THREADS: usize = 2;

/// Build a dedicated multi-threaded runtime
pub fn build_runtime(worker_threads: usize) -> Result<Arc<Runtime>> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .enable_all()
        .thread_name("blobfile-worker")
        .build()
        .map(Arc::new)
        .map_err(|e| BlobError::Runtime(format!("Failed to create Tokio runtime: {}", e)))
}

/// Get or create the runtime shared by all backends in the process
pub(crate) fn shared_runtime() -> Result<Arc<Runtime>> {
    static RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.clone());
    }

    let runtime = build_runtime(DEFAULT_WORKER_THREADS)?;
    Ok(RUNTIME.get_or_init(|| runtime).clone())
}
