//! Background execution of the perspective pixel pass.
//!
//! The worker gets exclusive, moved-in ownership of a scratch copy of the
//! original raster. Its result travels back over a oneshot channel and is only
//! swapped into the model by the interaction thread, so readers never observe
//! a partially warped raster. A shared [`JobControl`] decides exactly one
//! outcome: whichever of completion and cancellation takes the phase lock
//! first wins.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use image::RgbaImage;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SelectionError, SelectionResult};
use crate::event::Progress;
use crate::paste::PastedContent;
use crate::state::SelectionState;

use super::compositor;
use super::homography::Homography;

/// Identifies one pixel pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marker returned by a pass that observed cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Running,
    Completed,
    Cancelled,
}

/// State shared between the interaction thread and a worker
#[derive(Debug)]
pub struct JobControl {
    cancelled: AtomicBool,
    rows_done: AtomicUsize,
    total_rows: usize,
    phase: Mutex<JobPhase>,
}

impl JobControl {
    pub fn new(total_rows: usize) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            rows_done: AtomicUsize::new(0),
            total_rows,
            phase: Mutex::new(JobPhase::Running),
        }
    }

    /// Request cancellation. Returns true if this call decided the outcome,
    /// false if the job had already completed or been cancelled.
    pub fn cancel(&self) -> bool {
        self.cancelled.store(true, Ordering::Release);
        let mut phase = self.phase.lock();
        if *phase == JobPhase::Running {
            *phase = JobPhase::Cancelled;
            true
        } else {
            false
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Claim the completed outcome. Fails if cancellation got there first.
    pub fn try_complete(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase == JobPhase::Running {
            *phase = JobPhase::Completed;
            true
        } else {
            false
        }
    }

    pub fn row_done(&self) {
        self.rows_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn progress(&self) -> Progress {
        if self.total_rows == 0 {
            return Progress::Indeterminate;
        }
        let done = self.rows_done.load(Ordering::Relaxed).min(self.total_rows);
        Progress::Percent((done * 100 / self.total_rows) as u8)
    }
}

/// How a pass ended, as seen by the worker
#[derive(Debug)]
pub enum WarpOutcome {
    Completed(RgbaImage),
    Cancelled,
    Failed(SelectionError),
}

/// Where the pixel pass runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// A dedicated worker thread; the caller polls for the result
    #[default]
    Background,
    /// The calling thread, before the launch call returns
    Inline,
}

/// An in-flight pixel pass owned by the model
#[derive(Debug)]
pub struct PasteJob {
    id: JobId,
    control: Arc<JobControl>,
    receiver: oneshot::Receiver<WarpOutcome>,
    prior_state: SelectionState,
    raster_generation: usize,
    content: Arc<PastedContent>,
}

impl PasteJob {
    /// Start a pass that composites `content` onto `scratch` via `inverse`
    pub fn launch(
        scratch: RgbaImage,
        content: Arc<PastedContent>,
        inverse: Homography,
        mode: ProcessingMode,
        prior_state: SelectionState,
        raster_generation: usize,
    ) -> SelectionResult<Self> {
        let id = JobId::new();
        let control = Arc::new(JobControl::new(scratch.height() as usize));
        let (sender, receiver) = oneshot::channel();

        let worker_control = Arc::clone(&control);
        let worker_content = Arc::clone(&content);
        let work = move || {
            let outcome = run_pass(&worker_content.raster, scratch, &inverse, &worker_control);
            if sender.send(outcome).is_err() {
                debug!("warp job {id} finished after its receiver was dropped");
            }
        };

        match mode {
            ProcessingMode::Inline => work(),
            ProcessingMode::Background => {
                std::thread::Builder::new()
                    .name(format!("perspective-warp-{id}"))
                    .spawn(work)?;
            }
        }

        Ok(Self {
            id,
            control,
            receiver,
            prior_state,
            raster_generation,
            content,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn prior_state(&self) -> SelectionState {
        self.prior_state
    }

    pub fn raster_generation(&self) -> usize {
        self.raster_generation
    }

    pub fn content(&self) -> &Arc<PastedContent> {
        &self.content
    }

    pub fn progress(&self) -> Progress {
        self.control.progress()
    }

    /// Non-blocking check for the worker's result
    pub fn try_take(&mut self) -> Option<WarpOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(worker_vanished(self.id)),
        }
    }

    /// Block until the worker delivers its result
    pub fn wait(&mut self) -> WarpOutcome {
        match futures::executor::block_on(&mut self.receiver) {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => worker_vanished(self.id),
        }
    }

    /// Mark the job cancelled. Idempotent.
    pub fn cancel(&self) -> bool {
        let decided = self.control.cancel();
        if decided {
            debug!("warp job {} cancelled while running", self.id);
        }
        decided
    }
}

fn run_pass(content: &RgbaImage, mut scratch: RgbaImage, inverse: &Homography, control: &JobControl) -> WarpOutcome {
    match compositor::warp_and_overlay(content, &mut scratch, inverse, control) {
        Ok(()) if control.try_complete() => WarpOutcome::Completed(scratch),
        Ok(()) | Err(Interrupted) => WarpOutcome::Cancelled,
    }
}

fn worker_vanished(id: JobId) -> WarpOutcome {
    warn!("warp job {id} terminated without reporting a result");
    WarpOutcome::Failed(SelectionError::ProcessingFailed(format!(
        "warp job {id} terminated without producing a raster"
    )))
}
