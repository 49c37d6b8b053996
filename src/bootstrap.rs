//! Once-per-process initialisation: logging and the async runtime.
//!
//! Must run before any agent or venue is constructed. Calling [`init`] again
//! returns the already-initialised [`Process`] and changes nothing.

use std::future::Future;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

static PROCESS: OnceLock<Process> = OnceLock::new();

/// Process-wide runtime handle shared by every caller of [`init`].
pub struct Process {
    runtime: Runtime,
}

impl Process {
    /// Drive `future` to completion on the shared runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

pub fn init() -> Result<&'static Process> {
    if let Some(process) = PROCESS.get() {
        return Ok(process);
    }

    install_logging();
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .thread_name("run-agent")
        .build()
        .context("Failed to build the tokio runtime")?;

    // A concurrent caller may have won the race; its runtime is kept and ours dropped.
    if PROCESS.set(Process { runtime }).is_err() {
        debug!("Process already initialised by another caller");
    }
    PROCESS.get().context("Process initialisation did not complete")
}

fn install_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
    if installed.is_err() {
        debug!("A tracing subscriber is already installed, keeping it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = init().unwrap();
        let second = init().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_runs_futures_on_the_shared_runtime() {
        let process = init().unwrap();
        let value = process.block_on(async {
            tokio::task::spawn(async { 40 + 2 }).await.unwrap()
        });
        assert_eq!(value, 42);
    }
}
