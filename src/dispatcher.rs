use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    processor::RequestProcessor,
    request::{CorrelationId, Request, Response},
};

/// How long an idle worker waits on the inbound channel before rechecking shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Receives exactly one response per submitted request.
pub trait ResponseSink: Send + Sync {
    fn on_response(&self, correlation_id: CorrelationId, response: Response);
}

impl ResponseSink for mpsc::Sender<(CorrelationId, Response)> {
    fn on_response(&self, correlation_id: CorrelationId, response: Response) {
        if self.send((correlation_id, response)).is_err() {
            warn!(correlation_id, "response receiver is gone, dropping response");
        }
    }
}

impl ResponseSink for Mutex<Vec<(CorrelationId, Response)>> {
    fn on_response(&self, correlation_id: CorrelationId, response: Response) {
        self.lock().push((correlation_id, response));
    }
}

/// Cooperative stop flag, checked by workers between dequeues.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Worker pool needs at least one worker")]
    NoWorkers,
    #[error("Failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}

fn reject(sink: &dyn ResponseSink, request: Request) {
    warn!(
        correlation_id = request.correlation_id,
        "request rejected, dispatcher is shutting down"
    );
    sink.on_response(request.correlation_id, Response::unavailable());
}

struct Worker {
    processor: Arc<dyn RequestProcessor>,
    sink: Arc<dyn ResponseSink>,
    backlog: Arc<Mutex<mpsc::Receiver<Request>>>,
    shutdown: ShutdownToken,
}

impl Worker {
    fn run(self) {
        debug!("worker started");
        while !self.shutdown.is_triggered() {
            // the receiver lock is released before the request is handled
            let next = self.backlog.lock().recv_timeout(POLL_INTERVAL);
            match next {
                // shutdown may have begun while this worker waited for the receiver
                Ok(request) if self.shutdown.is_triggered() => reject(&*self.sink, request),
                Ok(request) => self.handle(request),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("worker stopped");
    }

    fn handle(&self, request: Request) {
        let Request {
            correlation_id,
            operation,
        } = request;
        // record locks are scoped to `process`, nothing is held past this line
        let response = Response::from(self.processor.process(operation));
        self.sink.on_response(correlation_id, response);
    }
}

/// Fixed pool of worker threads fed from a single FIFO channel.
///
/// Completion order across workers is not tied to submission order;
/// requests touching the same account are serialized by its record lock.
pub struct Dispatcher {
    inbound: Option<mpsc::Sender<Request>>,
    backlog: Arc<Mutex<mpsc::Receiver<Request>>>,
    sink: Arc<dyn ResponseSink>,
    shutdown: ShutdownToken,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn start(
        processor: Arc<dyn RequestProcessor>,
        sink: Arc<dyn ResponseSink>,
        workers: usize,
    ) -> Result<Self, DispatchError> {
        if workers == 0 {
            return Err(DispatchError::NoWorkers);
        }
        let (inbound, backlog) = mpsc::channel();
        let backlog = Arc::new(Mutex::new(backlog));
        let shutdown = ShutdownToken::new();

        let handles = (0..workers)
            .map(|index| {
                let worker = Worker {
                    processor: Arc::clone(&processor),
                    sink: Arc::clone(&sink),
                    backlog: Arc::clone(&backlog),
                    shutdown: shutdown.clone(),
                };
                thread::Builder::new()
                    .name(format!("ledger-worker-{index}"))
                    .spawn(move || worker.run())
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(workers, "dispatcher started");

        Ok(Self {
            inbound: Some(inbound),
            backlog,
            sink,
            shutdown,
            workers: handles,
        })
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Queues a request. Once shutdown has begun the sink is answered
    /// immediately with an `Unavailable` error instead.
    pub fn submit(&self, request: Request) {
        let rejected = match &self.inbound {
            Some(inbound) if !self.shutdown.is_triggered() => match inbound.send(request) {
                Ok(()) => return,
                Err(mpsc::SendError(request)) => request,
            },
            _ => request,
        };
        reject(&*self.sink, rejected);
    }

    /// Stops accepting requests and waits until everything already queued
    /// has been processed.
    pub fn close(mut self) {
        self.finish();
    }

    /// Lets in-flight requests complete, then answers whatever is still
    /// queued with `Unavailable`.
    pub fn shutdown(self) {
        self.shutdown.trigger();
    }

    fn finish(&mut self) {
        // dropping the sender lets idle workers see a disconnected channel
        self.inbound = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
        let leftovers: Vec<Request> = self.backlog.lock().try_iter().collect();
        for request in leftovers {
            reject(&*self.sink, request);
        }
        info!("dispatcher stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.inbound.is_none() && self.workers.is_empty() {
            return;
        }
        if self.inbound.is_some() && !self.shutdown.is_triggered() {
            warn!("dispatcher dropped while running, shutting down");
        }
        self.shutdown.trigger();
        self.finish();
    }
}
