//! Background execution of an RRT-Dubins run
//!
//! The search runs on its own thread. Callers hold a [`PlanningHandle`]
//! and poll it: `poll_progress` returns the iteration counter, which also
//! serves as the token passed to `is_done` and `finalize`.
//!
//! The worker stores the result before raising the completion flag
//! (`Release`), and readers check the flag (`Acquire`) before touching
//! the result slot.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{error, trace};

use crate::common::{PlanningError, PlanningResult};
use crate::path_planning::rrt_dubins::{PlanResult, RRTDubinsPlanner, SearchState};

/// State shared between a handle and its worker thread
#[derive(Debug)]
pub struct PlannerState {
    iterations: AtomicUsize,
    cancelled: AtomicBool,
    status: AtomicU8,
    done: AtomicBool,
    result: Mutex<Option<PlanResult>>,
}

impl PlannerState {
    fn new() -> Self {
        PlannerState {
            iterations: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            status: AtomicU8::new(SearchState::Idle as u8),
            done: AtomicBool::new(false),
            result: Mutex::new(None),
        }
    }

    fn set_status(&self, state: SearchState) {
        self.status.store(state as u8, Ordering::Release);
    }

    fn publish(&self, result: PlanResult) {
        let state = result.state();
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        self.set_status(state);
        self.done.store(true, Ordering::Release);
    }
}

/// Handle to a planning run on a worker thread
///
/// Dropping the handle cancels the run without waiting for the worker.
#[derive(Debug)]
pub struct PlanningHandle {
    state: Arc<PlannerState>,
    worker: Option<JoinHandle<()>>,
}

impl PlanningHandle {
    /// Completed iterations so far; never blocks
    pub fn poll_progress(&self) -> usize {
        self.state.iterations.load(Ordering::Acquire)
    }

    /// True once the run has ended, including a worker that died without a result
    pub fn is_done(&self, token: usize) -> bool {
        if self.state.done.load(Ordering::Acquire) {
            return true;
        }
        let finished = self.worker.as_ref().map_or(true, |worker| worker.is_finished());
        if finished {
            trace!("Worker gone without a result (token {})", token);
        }
        finished
    }

    /// The run's result; the same value on every call once done
    pub fn finalize(&self, token: usize) -> PlanningResult<PlanResult> {
        if !self.is_done(token) {
            return Err(PlanningError::PlanNotReady { iterations: self.poll_progress() });
        }
        // empty slot after the worker exited means it panicked mid-run
        let slot = self.state.result.lock().unwrap_or_else(PoisonError::into_inner);
        slot.clone().ok_or(PlanningError::WorkerDisconnected)
    }

    /// Ask the worker to stop before its next iteration
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    pub fn status(&self) -> SearchState {
        SearchState::from_u8(self.state.status.load(Ordering::Acquire))
    }
}

impl Drop for PlanningHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start `planner` on a dedicated worker thread and return immediately
pub fn start_planning(planner: &RRTDubinsPlanner) -> PlanningHandle {
    let state = Arc::new(PlannerState::new());
    let mut engine = planner.engine();

    let worker_state = Arc::clone(&state);
    let spawned = thread::Builder::new()
        .name("rrt-dubins-worker".to_string())
        .spawn(move || {
            worker_state.set_status(SearchState::Running);
            let result = engine.run(
                || worker_state.cancelled.load(Ordering::Acquire),
                |iterations| worker_state.iterations.store(iterations, Ordering::Release),
            );
            worker_state.publish(result);
        });

    let worker = match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to spawn planning worker: {}", e);
            None
        }
    };

    PlanningHandle { state, worker }
}
