//! Marshaling work onto the main context.
//!
//! The transport runs on a worker runtime but scene state lives on the main
//! context. Handlers send closures through a [`MainContext`]; the owner of
//! the state drains them with [`MainLoop::pump`] (from its own frame loop)
//! or [`MainLoop::run`] (dedicated thread).

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::error::{BridgeError, Result};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Cloneable, thread-safe handle for scheduling work against `S`.
pub struct MainContext<S> {
    tx: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for MainContext<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: 'static> MainContext<S> {
    /// Queue `job` without waiting for it.
    pub fn schedule(&self, job: impl FnOnce(&mut S) + Send + 'static) -> Result<()> {
        self.tx
            .send(Box::new(job))
            .map_err(|_| BridgeError::MainContextGone)
    }

    /// Run `job` on the main context and await its result.
    pub async fn call<R>(&self, job: impl FnOnce(&mut S) -> R + Send + 'static) -> Result<R>
    where
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.schedule(move |state| {
            if reply_tx.send(job(state)).is_err() {
                trace!("caller stopped waiting for main-context reply");
            }
        })?;
        reply_rx.await.map_err(|_| BridgeError::ReplyDropped)
    }
}

/// Receiving end, owned by whoever owns `S`.
pub struct MainLoop<S> {
    rx: mpsc::UnboundedReceiver<Job<S>>,
}

/// A connected handle/loop pair.
pub fn channel<S>() -> (MainContext<S>, MainLoop<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainContext { tx }, MainLoop { rx })
}

impl<S> MainLoop<S> {
    /// Run every job queued so far. Never blocks. Returns the job count.
    pub fn pump(&mut self, state: &mut S) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job(state);
            ran += 1;
        }
        ran
    }

    /// Block the current thread running jobs until every handle is dropped.
    ///
    /// Must not be called from inside an async runtime.
    pub fn run(mut self, state: &mut S) {
        while let Some(job) = self.rx.blocking_recv() {
            job(state);
        }
        debug!("all main-context handles dropped, main loop exiting");
    }
}
