//! Background execution of a materialization run.
//!
//! [`AsyncRunner::run_async`] moves one run onto tokio's blocking pool and returns
//! a [`RunHandle`] right away. The handle is a future resolving to the run's
//! [`Outcome`] and can also be polled with [`RunHandle::is_finished`]. The
//! completion callback fires exactly once, on the worker, before the handle resolves.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::{debug, error};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::materializer::{Materializer, Outcome};
use crate::spec::Spec;

/// Spawns materialization runs on a tokio runtime.
#[derive(Debug, Clone)]
pub struct AsyncRunner {
    runtime: Handle,
}

impl AsyncRunner {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Runner bound to the runtime of the calling task.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Starts materializing `spec` below `root` and returns immediately.
    ///
    /// `on_done` receives the outcome once, whether the run succeeded or failed.
    /// Runs against overlapping paths are not serialized.
    pub fn run_async<P, F>(
        &self,
        materializer: &Materializer,
        root: P,
        spec: Spec,
        on_done: F,
    ) -> RunHandle
    where
        P: Into<PathBuf>,
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let materializer = materializer.clone();
        let root = root.into();
        debug!("Spawning background run into {}", root.display());

        let inner = self.runtime.spawn_blocking(move || {
            let outcome = materializer.materialize(&root, &spec);
            on_done(&outcome);
            outcome
        });
        RunHandle { inner }
    }
}

/// Starts a background run on the current tokio runtime.
pub fn run_async<P, F>(root: P, spec: Spec, on_done: F) -> RunHandle
where
    P: Into<PathBuf>,
    F: FnOnce(&Outcome) + Send + 'static,
{
    AsyncRunner::current().run_async(&Materializer::new(), root, spec, on_done)
}

/// Handle to an in-flight run. Await it to get the [`Outcome`].
#[derive(Debug)]
pub struct RunHandle {
    inner: JoinHandle<Outcome>,
}

impl RunHandle {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Future for RunHandle {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| {
                error!("Background run did not complete: {}", e);
                let cause = io::Error::new(io::ErrorKind::Other, e.to_string());
                let err = Error::IoError(cause);
                Outcome {
                    ok: false,
                    log: vec![format!("error: {err}")],
                    error: Some(err),
                }
            })
        })
    }
}
