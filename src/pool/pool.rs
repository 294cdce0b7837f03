use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::context::Context;
use crate::error::TaskError;
use crate::pool::task::ValuelessTask;

/// A queued request: the submit-time context travels with the task so the
/// worker executes it under the submitter's cancellation scope.
struct Queued<R> {
    ctx: Context,
    task: Box<dyn ValuelessTask<R>>,
}

/// Fixed-size worker set consuming a bounded request queue, sharing one
/// resource.
///
/// The resource is handed to every task as `Arc<R>`; it is shared
/// read-only, interior mutability is the task author's concern. If
/// per-worker resources are required, make `R` itself a checkout pool.
pub struct WorkerPool<R> {
    resource: Arc<R>,
    sender: Mutex<Option<mpsc::Sender<Queued<R>>>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Queued<R>>>>,
    workers: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl<R: Send + Sync + 'static> WorkerPool<R> {
    /// Creates (but does not start) a pool with no request buffering beyond
    /// the single in-flight request a bounded tokio channel holds.
    ///
    /// # Panics
    /// Panics if `workers` is zero.
    pub fn new(resource: R, workers: usize) -> Self {
        Self::new_buffered(resource, workers, 0)
    }

    /// Creates (but does not start) a pool with the given request queue
    /// capacity.
    ///
    /// A `buffer` of 0 is treated as 1; tokio bounded channels always admit
    /// one in-flight request.
    ///
    /// # Panics
    /// Panics if `workers` is zero.
    pub fn new_buffered(resource: R, workers: usize, buffer: usize) -> Self {
        if workers == 0 {
            panic!("worker pool must have at least one worker");
        }

        let (tx, rx) = mpsc::channel(buffer.max(1));

        Self {
            resource: Arc::new(resource),
            sender: Mutex::new(Some(tx)),
            receiver: Arc::new(tokio::sync::Mutex::new(rx)),
            workers,
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the workers.
    ///
    /// # Panics
    /// Panics if the pool has already been started.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            panic!("attempt to start a previously started WorkerPool");
        }

        let mut handles = self.handles.lock().expect("pool handles lock");
        for _ in 0..self.workers {
            let receiver = Arc::clone(&self.receiver);
            let resource = Arc::clone(&self.resource);
            handles.push(tokio::spawn(worker(receiver, resource)));
        }
    }

    /// Closes the request queue and, if the pool was started, waits for the
    /// workers to drain it and exit.
    ///
    /// Idempotent: only the first call closes the queue and joins the
    /// workers; later calls return immediately. If the pool was never
    /// started, there is nothing to wait for.
    pub async fn close(&self) {
        // Dropping the sender is the close: workers observe the queue end
        // after the remaining requests are drained.
        let sender = self.sender.lock().expect("pool sender lock").take();
        drop(sender);

        let handles: Vec<_> = self
            .handles
            .lock()
            .expect("pool handles lock")
            .drain(..)
            .collect();
        // A worker that panicked already tore its task down; nothing to
        // salvage from its JoinError here.
        let _ = join_all(handles).await;
    }

    /// Enqueues a task, honouring `ctx`.
    ///
    /// Returns the cancellation cause if `ctx` cancels before the task is
    /// accepted. The submit-time context is what the worker later passes to
    /// the task.
    ///
    /// # Panics
    /// Panics if the pool has been closed. Callers must sequence `close`
    /// after all submissions.
    pub async fn submit(
        &self,
        ctx: &Context,
        task: impl ValuelessTask<R>,
    ) -> Result<(), TaskError> {
        if let Some(cause) = ctx.cause() {
            return Err(cause);
        }

        let tx = self
            .sender
            .lock()
            .expect("pool sender lock")
            .clone()
            .unwrap_or_else(|| panic!("attempt to submit a task to a closed WorkerPool"));

        let queued = Queued {
            ctx: ctx.clone(),
            task: Box::new(task),
        };

        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.cause().unwrap_or(TaskError::Canceled)),
            sent = tx.send(queued) => match sent {
                Ok(()) => Ok(()),
                // The receiver only disappears when the pool is torn down.
                Err(_) => panic!("attempt to submit a task to a closed WorkerPool"),
            },
        }
    }

    /// The shared resource handed to every task.
    pub fn resource(&self) -> Arc<R> {
        Arc::clone(&self.resource)
    }
}

/// Worker loop: pop one request at a time (FIFO via the shared receiver),
/// run it, exit when the queue is closed and drained.
async fn worker<R: Send + Sync + 'static>(
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Queued<R>>>>,
    resource: Arc<R>,
) {
    loop {
        // Hold the receiver lock only for the pop, never during execution,
        // so the other workers keep consuming while this one runs.
        let next = { receiver.lock().await.recv().await };

        match next {
            Some(queued) => queued.task.execute(queued.ctx, Arc::clone(&resource)).await,
            None => break,
        }
    }
}
