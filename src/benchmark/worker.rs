use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::task::JoinSet;
use tracing::warn;

use crate::error::SendError;
use crate::generator::Generator;
use crate::http::{RateLimiter, RequestBuilder, send};
use crate::openapi::{Operation, OperationDetails};
use crate::shutdown::Shutdown;

use super::stats::RequestResult;
use super::{BenchmarkConfig, BenchmarkEvent, BenchmarkEventKind, EventHandler};

/// Everything one measuring phase needs; consumed by [`MeasuringPhase::run`].
pub(super) struct MeasuringPhase {
    pub config: BenchmarkConfig,
    pub client: Client,
    pub limiter: Option<Arc<RateLimiter>>,
    pub shutdown: Shutdown,
    pub on_event: EventHandler,
    pub operation: Arc<Operation>,
    pub details: Arc<OperationDetails>,
    pub index: usize,
    pub total: usize,
    pub progress_every: usize,
}

/// Attempts that finished, in job order, and the wall time of the phase.
pub(super) struct Measurement {
    pub samples: Vec<RequestResult>,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Counters {
    completed: usize,
    total_duration: Duration,
    errors: usize,
}

struct Shared {
    next_job: AtomicUsize,
    slots: Box<[OnceLock<RequestResult>]>,
    counters: Mutex<Counters>,
    started: Instant,
}

impl Shared {
    fn claim(&self, iterations: usize) -> Option<usize> {
        let job = self.next_job.fetch_add(1, Ordering::Relaxed);
        (job < iterations).then_some(job)
    }

    /// Stores `result` in its slot and returns a copy of the counters when
    /// this completion is due a progress report.
    fn record(
        &self,
        job: usize,
        result: RequestResult,
        progress_every: usize,
    ) -> Option<Counters> {
        let duration = result.duration;
        let failed = !result.is_success();
        if let Some(slot) = self.slots.get(job) {
            drop(slot.set(result));
        }

        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.completed = counters.completed.saturating_add(1);
        counters.total_duration = counters.total_duration.saturating_add(duration);
        if failed {
            counters.errors = counters.errors.saturating_add(1);
        }
        (counters.completed.checked_rem(progress_every) == Some(0)).then(|| Counters {
            completed: counters.completed,
            total_duration: counters.total_duration,
            errors: counters.errors,
        })
    }
}

impl MeasuringPhase {
    /// Runs `concurrency` workers over `iterations` jobs and waits for all
    /// of them.
    pub(super) async fn run(self) -> Measurement {
        let iterations = self.config.iterations;
        let shared = Arc::new(Shared {
            next_job: AtomicUsize::new(0),
            slots: (0..iterations).map(|_| OnceLock::new()).collect(),
            counters: Mutex::new(Counters::default()),
            started: Instant::now(),
        });
        let phase = Arc::new(self);

        let mut workers = JoinSet::new();
        for worker_id in 0..phase.config.concurrency.min(iterations.max(1)) {
            let worker = Worker {
                phase: Arc::clone(&phase),
                shared: Arc::clone(&shared),
                builder: RequestBuilder::new(worker_generator(phase.config.seed, worker_id)),
            };
            workers.spawn(worker.run());
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                warn!("Benchmark worker stopped unexpectedly: {}", err);
            }
        }

        let elapsed = shared.started.elapsed();
        let samples = match Arc::try_unwrap(shared) {
            Ok(owned) => owned
                .slots
                .into_vec()
                .into_iter()
                .filter_map(OnceLock::into_inner)
                .collect(),
            Err(still_shared) => still_shared
                .slots
                .iter()
                .filter_map(|slot| slot.get().cloned())
                .collect(),
        };
        Measurement { samples, elapsed }
    }
}

/// Seeded runs give each worker its own reproducible stream.
fn worker_generator(seed: Option<u64>, worker_id: usize) -> Generator {
    let offset = u64::try_from(worker_id).unwrap_or(u64::MAX).saturating_add(1);
    Generator::with_seed(seed.map(|seed| seed.wrapping_add(offset)))
}

struct Worker {
    phase: Arc<MeasuringPhase>,
    shared: Arc<Shared>,
    builder: RequestBuilder,
}

impl Worker {
    async fn run(mut self) {
        let phase = Arc::clone(&self.phase);
        loop {
            if phase.shutdown.is_cancelled() {
                return;
            }
            let Some(job) = self.shared.claim(phase.config.iterations) else {
                return;
            };
            if let Some(limiter) = phase.limiter.as_ref()
                && !limiter.acquire(&phase.shutdown).await
            {
                return;
            }
            let Some(result) = self.attempt(&phase).await else {
                return;
            };
            if let Some(snapshot) = self.shared.record(job, result, phase.progress_every) {
                self.report(&phase, &snapshot);
            }
        }
    }

    /// One measured request. `None` when it was cut short by cancellation.
    async fn attempt(&mut self, phase: &MeasuringPhase) -> Option<RequestResult> {
        let started = Instant::now();
        let request = match self.builder.build(&phase.details, &phase.operation.server_url) {
            Ok(request) => request,
            Err(err) => {
                return Some(RequestResult::failure(
                    started.elapsed(),
                    format!("build request failed: {}", err),
                ));
            }
        };

        match send(&phase.client, request, phase.config.timeout, &phase.shutdown).await {
            Ok(response) => Some(RequestResult {
                duration: started.elapsed(),
                status: response.status,
                error: String::new(),
            }),
            Err(SendError::Cancelled) => None,
            Err(err @ (SendError::TimedOut(_) | SendError::Transport { .. })) => {
                Some(RequestResult::failure(started.elapsed(), err.to_string()))
            }
        }
    }

    fn report(&self, phase: &MeasuringPhase, snapshot: &Counters) {
        let elapsed = self.shared.started.elapsed().as_secs_f64();
        let mut event = BenchmarkEvent::new(
            BenchmarkEventKind::BenchmarkProgress,
            &phase.operation,
            phase.index,
            phase.total,
        );
        event.progress = snapshot.completed;
        event.max_iterations = phase.config.iterations;
        event.running_avg = snapshot
            .total_duration
            .checked_div(u32::try_from(snapshot.completed).unwrap_or(u32::MAX))
            .unwrap_or_default();
        event.running_reqs_per_sec = if elapsed > 0.0 {
            snapshot.completed as f64 / elapsed
        } else {
            0.0
        };
        event.error_count = snapshot.errors;
        (phase.on_event)(&event);
    }
}
