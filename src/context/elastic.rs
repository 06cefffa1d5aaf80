use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ExecutionContext, Job};

/// State shared by the pool and its lane threads
struct LaneShared {
    jobs: Receiver<Job>,
    /// Lanes waiting for work that no submitter has claimed yet
    idle: AtomicUsize,
    live: AtomicUsize,
    next_lane_id: AtomicUsize,
    keep_alive: Duration,
    name_prefix: String,
}

impl LaneShared {
    /// Take one idle lane for a new job, if there is one
    fn claim_idle_lane(&self) -> bool {
        let mut idle = self.idle.load(Ordering::Acquire);
        loop {
            if idle == 0 {
                return false;
            }
            match self
                .idle
                .compare_exchange(idle, idle - 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(current) => idle = current,
            }
        }
    }
}

/// Pool that grows a lane whenever every existing lane is busy.
///
/// Jobs never wait behind a blocked lane, which is what nested `fork`s need:
/// each fork parks its lane until the inner computation finishes. Lanes that
/// stay idle for `keep_alive` exit. Dropping the pool lets idle lanes exit
/// once their queue is drained.
pub struct ElasticPool {
    jobs: Sender<Job>,
    shared: Arc<LaneShared>,
}

impl ElasticPool {
    pub fn new(keep_alive: Duration, name_prefix: impl Into<String>) -> Self {
        let (jobs_tx, jobs_rx) = unbounded();
        Self {
            jobs: jobs_tx,
            shared: Arc::new(LaneShared {
                jobs: jobs_rx,
                idle: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                next_lane_id: AtomicUsize::new(0),
                keep_alive,
                name_prefix: name_prefix.into(),
            }),
        }
    }

    /// Lanes currently alive, busy or idle
    pub fn live_lanes(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Total lanes started over the pool's lifetime
    pub fn lanes_started(&self) -> usize {
        self.shared.next_lane_id.load(Ordering::Acquire)
    }

    fn start_lane(&self) {
        let lane_id = self.shared.next_lane_id.fetch_add(1, Ordering::AcqRel);
        let shared = Arc::clone(&self.shared);
        shared.live.fetch_add(1, Ordering::AcqRel);

        let spawned = std::thread::Builder::new()
            .name(format!("{}-{}", self.shared.name_prefix, lane_id))
            .spawn(move || lane_loop(shared, lane_id));

        if let Err(e) = spawned {
            self.shared.live.fetch_sub(1, Ordering::AcqRel);
            tracing::error!("Failed to start lane {}: {}, running job inline", lane_id, e);
            if let Ok(job) = self.shared.jobs.try_recv() {
                job();
            }
        }
    }
}

impl ExecutionContext for ElasticPool {
    fn spawn(&self, job: Job) {
        // The pool owns a receiver, so the channel cannot be disconnected here
        let _ = self.jobs.send(job);
        if !self.shared.claim_idle_lane() {
            self.start_lane();
        }
    }

    fn name(&self) -> &str {
        "elastic"
    }
}

fn lane_loop(shared: Arc<LaneShared>, lane_id: usize) {
    tracing::debug!(lane_id, "lane started");

    loop {
        match shared.jobs.recv_timeout(shared.keep_alive) {
            Ok(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::warn!(lane_id, "job panicked, lane keeps running");
                }
                shared.idle.fetch_add(1, Ordering::AcqRel);
            }
            Err(RecvTimeoutError::Timeout) => {
                // Only retire if no submitter is counting on this lane
                if shared.claim_idle_lane() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    shared.live.fetch_sub(1, Ordering::AcqRel);
    tracing::debug!(lane_id, "lane retired");
}
