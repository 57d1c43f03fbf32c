//! The selection model: a single-threaded state machine that owns the path,
//! its undo history, the raster and at most one in-flight paste job.
//!
//! Every public mutator is all-or-nothing. Validation (state, bounds,
//! homography solve) happens before the first field is touched, so an `Err`
//! leaves the model exactly as it was.

use std::io::Write;
use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, Rgba, RgbaImage};
use log::{debug, error, info, warn};

use crate::config::SelectorConfig;
use crate::error::{SelectionError, SelectionResult};
use crate::event::{EventBus, EventHandler, HandlerId, Progress, SelectionEvent};
use crate::geometry::{Point, Polygon, Segment};
use crate::history::{Checkpoint, CheckpointKind, UndoHistory};
use crate::paste::{PasteKind, PastedContent};
use crate::path::SelectionPath;
use crate::raster::RasterStore;
use crate::shapes::{render_shape, ShapeKind};
use crate::state::SelectionState;
use crate::tool::{AppendOutcome, FinishOutcome, SelectionVariant, VariantKind};
use crate::warp::{perspective_homography, Homography, JobId, PasteJob, ProcessingMode, WarpOutcome};

/// Where the model's paste job stands after a poll or wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// No pass was running
    Idle,
    /// The pass is still running
    Running(Progress),
    /// The warped raster was swapped in
    Applied(JobId),
    /// The pass ended without a raster; the original was restored
    Cancelled(JobId),
    /// The pass failed; a `ProcessingFailed` event carries the error
    Failed(JobId),
}

pub struct SelectionModel {
    config: SelectorConfig,
    state: SelectionState,
    path: SelectionPath,
    history: UndoHistory,
    variant: Box<dyn SelectionVariant>,
    raster: Option<RasterStore>,
    /// Content of the last completed paste, re-warped when corners move
    last_paste: Option<Arc<PastedContent>>,
    job: Option<PasteJob>,
    last_progress: Option<Progress>,
    event_bus: EventBus,
}

impl std::fmt::Debug for SelectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionModel")
            .field("state", &self.state)
            .field("variant", &self.variant.name())
            .field("points", &self.path.point_count())
            .field("closed", &self.path.is_closed())
            .field("has_image", &self.raster.is_some())
            .field("job", &self.job.as_ref().map(PasteJob::id))
            .finish()
    }
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

impl Drop for SelectionModel {
    fn drop(&mut self) {
        if let Some(job) = &self.job {
            job.cancel();
        }
    }
}

impl SelectionModel {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            variant: config.variant.new_instance(),
            config,
            state: SelectionState::NoSelection,
            path: SelectionPath::new(),
            history: UndoHistory::new(),
            raster: None,
            last_paste: None,
            job: None,
            last_progress: None,
            event_bus: EventBus::new(),
        }
    }

    /// Convenience constructor overriding the configured variant
    pub fn with_variant(kind: VariantKind) -> Self {
        Self::new(SelectorConfig {
            variant: kind,
            ..SelectorConfig::default()
        })
    }

    /// Subscribe a handler to model notifications
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) -> HandlerId {
        self.event_bus.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.event_bus.unsubscribe(id)
    }

    // ---- queries ------------------------------------------------------------

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selection_path(&self) -> &SelectionPath {
        &self.path
    }

    pub fn segments(&self) -> &[Segment] {
        self.path.segments()
    }

    pub fn variant(&self) -> &dyn SelectionVariant {
        self.variant.as_ref()
    }

    pub fn variant_kind(&self) -> VariantKind {
        self.variant.kind()
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// The working raster, including any applied paste
    pub fn image(&self) -> Option<&RgbaImage> {
        self.raster.as_ref().map(RasterStore::working)
    }

    /// The snapshot every paste starts from
    pub fn original_image(&self) -> Option<&RgbaImage> {
        self.raster.as_ref().map(RasterStore::original)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.job.as_ref().map(PasteJob::id)
    }

    /// Progress of the running pass, if any
    pub fn processing_progress(&self) -> Option<Progress> {
        self.job.as_ref().map(PasteJob::progress)
    }

    pub fn last_paste(&self) -> Option<&PastedContent> {
        self.last_paste.as_deref()
    }

    /// The segment the view should draw from the last point to `p`. Only
    /// defined while a path is being built.
    pub fn live_wire(&self, p: Point) -> Option<Segment> {
        if self.state != SelectionState::Selecting {
            return None;
        }
        self.variant.live_wire(&self.path, p)
    }

    /// Index of the control point within `tolerance_squared` of `p`
    pub fn closest_point(&self, p: Point, tolerance_squared: i64) -> Option<usize> {
        self.path.closest_point(p, tolerance_squared)
    }

    /// [`Self::closest_point`] using the configured grab radius
    pub fn hit_test(&self, p: Point) -> Option<usize> {
        self.closest_point(p, self.config.tolerance_squared())
    }

    // ---- image ------------------------------------------------------------

    /// Attach a decoded raster, replacing any previous one. The selection is
    /// discarded because its coordinates referred to the old image.
    pub fn set_image(&mut self, image: RgbaImage) -> SelectionResult<()> {
        self.ensure_not_processing("set an image")?;
        if image.width() == 0 || image.height() == 0 {
            return Err(SelectionError::InvalidArgument(format!(
                "image must not be empty (got {}x{})",
                image.width(),
                image.height()
            )));
        }

        info!("image attached ({}x{})", image.width(), image.height());
        self.raster = Some(RasterStore::new(image));
        self.clear_selection();
        self.emit(SelectionEvent::RasterChanged);
        Ok(())
    }

    pub fn clear_image(&mut self) -> SelectionResult<()> {
        self.ensure_not_processing("clear the image")?;
        if self.raster.take().is_some() {
            self.clear_selection();
            self.emit(SelectionEvent::RasterChanged);
        }
        Ok(())
    }

    // ---- path editing -----------------------------------------------------

    pub fn add_point(&mut self, p: Point) -> SelectionResult<()> {
        match self.state {
            SelectionState::NoSelection => {
                let Some((w, h)) = self.raster.as_ref().map(RasterStore::dimensions) else {
                    return Err(SelectionError::illegal_state("add a point without an image", self.state));
                };
                check_bounds(p, w, h)?;

                self.path.begin(p);
                debug!("selection started at {p}");
                self.transition_to(SelectionState::Selecting);
                self.emit(SelectionEvent::PathChanged);
                Ok(())
            }
            SelectionState::Selecting => {
                let (w, h) = self.dimensions()?;
                check_bounds(p, w, h)?;

                let before = self.path.clone();
                let outcome = self.variant.append_to_selection(&mut self.path, p);
                let kind = match outcome {
                    AppendOutcome::Continue => CheckpointKind::AppendPoint,
                    AppendOutcome::AutoFinish => CheckpointKind::AutoFinish,
                };
                self.history.push(Checkpoint::new(kind, before, SelectionState::Selecting));
                debug!("point {p} appended ({} points)", self.path.point_count());

                if outcome == AppendOutcome::AutoFinish {
                    self.path.close();
                    debug!("{} selection closed automatically", self.variant.name());
                    self.transition_to(SelectionState::Selected);
                }
                self.emit(SelectionEvent::PathChanged);
                Ok(())
            }
            state => Err(SelectionError::illegal_state("add a point", state)),
        }
    }

    /// Close the path. With fewer than two points the selection is discarded
    /// instead.
    pub fn finish_selection(&mut self) -> SelectionResult<()> {
        if self.state != SelectionState::Selecting {
            return Err(SelectionError::illegal_state("finish the selection", self.state));
        }

        match self.variant.finish_selection(&self.path) {
            FinishOutcome::Reset => {
                warn!("selection with {} point(s) is too short to close; discarding", self.path.point_count());
                self.reset();
            }
            FinishOutcome::Close => {
                let before = self.path.clone();
                self.history.push(Checkpoint::new(CheckpointKind::Finish, before, SelectionState::Selecting));
                self.path.close();
                self.transition_to(SelectionState::Selected);
                self.emit(SelectionEvent::PathChanged);
            }
        }
        Ok(())
    }

    /// Drag control point `index` to `new_pos`. If content was pasted onto
    /// the selection it is warped again onto the new corners.
    pub fn move_point(&mut self, index: usize, new_pos: Point) -> SelectionResult<()> {
        if self.state != SelectionState::Selected {
            return Err(SelectionError::illegal_state("move a point", self.state));
        }
        let (w, h) = self.dimensions()?;
        check_bounds(new_pos, w, h)?;

        let mut moved = self.path.clone();
        moved.move_point(index, new_pos)?;
        let rewarp = self.prepare_rewarp(&moved)?;

        let before = std::mem::replace(&mut self.path, moved);
        self.history.push(Checkpoint::new(CheckpointKind::MovePoint, before, SelectionState::Selected));
        debug!("control point {index} moved to {new_pos}");
        self.emit(SelectionEvent::PathChanged);

        if let Some((content, inverse)) = rewarp {
            self.start_pass(content, inverse)?;
        }
        Ok(())
    }

    /// Step back one edit.
    ///
    /// In `Selecting` this removes the last point, or resets when only the
    /// start point is left. In `Selected` a corner move is reverted, and the
    /// automatic close of a four-corner path reopens it; undoing an explicit
    /// finish is rejected.
    pub fn undo(&mut self) -> SelectionResult<()> {
        match self.state {
            SelectionState::Selecting => {
                if let Some(checkpoint) = self.history.pop() {
                    self.restore_checkpoint(checkpoint);
                } else if self.path.point_count() <= 1 {
                    debug!("undo of the start point resets the selection");
                    self.reset();
                } else {
                    return Err(SelectionError::illegal_state("undo without history", self.state));
                }
                Ok(())
            }
            SelectionState::Selected => {
                let Some(top) = self.history.peek() else {
                    return Err(SelectionError::illegal_state("undo without history", self.state));
                };
                let kind = top.kind;
                let rewarp = match kind {
                    CheckpointKind::MovePoint => self.prepare_rewarp(&top.path)?,
                    _ => None,
                };

                match kind {
                    CheckpointKind::MovePoint => {
                        if let Some(checkpoint) = self.history.pop() {
                            self.restore_checkpoint(checkpoint);
                        }
                        if let Some((content, inverse)) = rewarp {
                            self.start_pass(content, inverse)?;
                        }
                        Ok(())
                    }
                    CheckpointKind::AutoFinish if self.variant.undo_reopens_auto_close() => {
                        // The raster keeps what was pasted; the next paste starts from the original
                        self.last_paste = None;
                        if let Some(checkpoint) = self.history.pop() {
                            self.restore_checkpoint(checkpoint);
                        }
                        Ok(())
                    }
                    _ => Err(SelectionError::illegal_state("undo a finished selection", self.state)),
                }
            }
            state => Err(SelectionError::illegal_state("undo", state)),
        }
    }

    /// Discard the path and its history unconditionally. A running pass is
    /// cancelled first.
    pub fn reset(&mut self) {
        self.cancel_processing();
        self.clear_selection();
    }

    /// Switch to another selection variant. The image is kept; the path is not.
    pub fn switch_variant(&mut self, kind: VariantKind) -> SelectionResult<()> {
        self.ensure_not_processing("switch the selection variant")?;
        self.variant = kind.new_instance();
        self.config.variant = kind;
        debug!("selection variant switched to {}", self.variant.name());
        self.clear_selection();
        Ok(())
    }

    // ---- perspective paste --------------------------------------------------

    /// Warp a decoded image onto the four selection corners
    pub fn add_perspective_image(&mut self, image: RgbaImage) -> SelectionResult<JobId> {
        self.paste(image, PasteKind::Image)
    }

    /// Warp a rendered text raster onto the four selection corners
    pub fn add_perspective_text(&mut self, rendered: RgbaImage) -> SelectionResult<JobId> {
        self.paste(rendered, PasteKind::Text)
    }

    /// Render a `size`×`size` shape in `color` and warp it onto the corners
    pub fn add_perspective_shape(&mut self, kind: ShapeKind, size: u32, color: Rgba<u8>) -> SelectionResult<JobId> {
        self.ensure_pasteable()?;
        let raster = render_shape(kind, size, color)?;
        self.paste(raster, PasteKind::Shape(kind))
    }

    fn paste(&mut self, raster: RgbaImage, kind: PasteKind) -> SelectionResult<JobId> {
        let corners = self.ensure_pasteable()?;
        let content = PastedContent::new(raster, kind)?;
        let inverse = self.solve_inverse(&content, &corners)?;
        self.start_pass(Arc::new(content), inverse)
    }

    /// Stop the running pass and restore the raster from the original. A no-op
    /// outside `Processing`. Returns true if a pass was cancelled.
    pub fn cancel_processing(&mut self) -> bool {
        let Some(job) = self.job.take() else {
            return false;
        };

        if !job.cancel() {
            debug!("warp job {} already finished; discarding its result", job.id());
        }
        warn!("processing cancelled (job {})", job.id());

        if let Some(raster) = self.raster.as_mut() {
            raster.restore_original();
        }
        self.last_paste = None;
        self.last_progress = None;
        self.transition_to(job.prior_state());
        self.emit(SelectionEvent::RasterChanged);
        true
    }

    /// Apply the pass result if it is ready, without blocking
    pub fn poll_processing(&mut self) -> ProcessingStatus {
        let Some(job) = self.job.as_mut() else {
            return ProcessingStatus::Idle;
        };

        match job.try_take() {
            Some(outcome) => match self.job.take() {
                Some(job) => self.finish_pass(job, outcome),
                None => ProcessingStatus::Idle,
            },
            None => {
                let progress = job.progress();
                if self.last_progress != Some(progress) {
                    self.last_progress = Some(progress);
                    self.emit(SelectionEvent::ProgressChanged(progress));
                }
                ProcessingStatus::Running(progress)
            }
        }
    }

    /// Block until the running pass ends and apply its result
    pub fn wait_for_processing(&mut self) -> ProcessingStatus {
        match self.job.take() {
            Some(mut job) => {
                let outcome = job.wait();
                self.finish_pass(job, outcome)
            }
            None => ProcessingStatus::Idle,
        }
    }

    // ---- region operations ------------------------------------------------

    /// Paint every pixel inside the selection with `color`. The result becomes
    /// the new original so later pastes build on it.
    pub fn fill_selection(&mut self, color: Rgba<u8>) -> SelectionResult<()> {
        self.paint_region("fill the selection", color)?;
        info!("selection filled with {:?}", color.0);
        Ok(())
    }

    /// Make every pixel inside the selection fully transparent
    pub fn delete_selection(&mut self) -> SelectionResult<()> {
        self.paint_region("delete the selection", Rgba([0, 0, 0, 0]))?;
        info!("selection deleted");
        Ok(())
    }

    /// Write the pixels enclosed by the selection as a PNG of its bounding box.
    /// Pixels outside the path are transparent.
    pub fn save_selection<W: Write>(&self, sink: W) -> SelectionResult<()> {
        let (raster, polygon) = self.selected_region("save the selection")?;
        let (w, h) = raster.dimensions();

        let bounds = polygon
            .bounds(w, h)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| SelectionError::InvalidArgument("selection encloses no pixels".into()))?;

        let source = raster.working();
        let mut out = RgbaImage::new(bounds.width(), bounds.height());
        let mut covered = 0usize;
        polygon.for_each_covered_pixel(w, h, |x, y| {
            if (bounds.min_x..bounds.max_x).contains(&x) && (bounds.min_y..bounds.max_y).contains(&y) {
                out.put_pixel(x - bounds.min_x, y - bounds.min_y, *source.get_pixel(x, y));
                covered += 1;
            }
        });
        if covered == 0 {
            return Err(SelectionError::InvalidArgument("selection encloses no pixels".into()));
        }

        PngEncoder::new(sink).write_image(out.as_raw(), out.width(), out.height(), ExtendedColorType::Rgba8)?;
        info!("selection saved ({}x{})", out.width(), out.height());
        Ok(())
    }

    /// Coverage of the closed selection (255 inside, 0 outside)
    pub fn selection_mask(&self) -> SelectionResult<GrayImage> {
        let (raster, polygon) = self.selected_region("build a selection mask")?;
        let (w, h) = raster.dimensions();
        Ok(polygon.coverage_mask(w, h))
    }

    // ---- internals ----------------------------------------------------------

    fn transition_to(&mut self, new: SelectionState) {
        if self.state == new {
            return;
        }
        debug_assert!(self.state.can_transition_to(new), "illegal transition {} -> {new}", self.state);

        let old = std::mem::replace(&mut self.state, new);
        debug!("selection state {old} -> {new}");
        self.event_bus.emit(SelectionEvent::StateChanged { old, new });
    }

    fn emit(&self, event: SelectionEvent) {
        self.event_bus.emit(event);
    }

    fn ensure_not_processing(&self, operation: &'static str) -> SelectionResult<()> {
        if self.state.is_processing() {
            warn!("rejected: cannot {operation} while processing");
            return Err(SelectionError::illegal_state(operation, self.state));
        }
        Ok(())
    }

    fn dimensions(&self) -> SelectionResult<(u32, u32)> {
        self.raster
            .as_ref()
            .map(RasterStore::dimensions)
            .ok_or_else(|| SelectionError::illegal_state("edit a selection without an image", self.state))
    }

    /// Drop the path, its history and the remembered paste, keeping the image
    fn clear_selection(&mut self) {
        let had_path = !self.path.is_empty();
        self.path.clear();
        self.history.clear();
        self.last_paste = None;
        self.transition_to(SelectionState::NoSelection);
        if had_path {
            self.emit(SelectionEvent::PathChanged);
        }
    }

    fn restore_checkpoint(&mut self, checkpoint: Checkpoint) {
        debug!("undo {:?}", checkpoint.kind);
        self.path = checkpoint.path;
        self.transition_to(checkpoint.state);
        self.emit(SelectionEvent::PathChanged);
    }

    /// Corners of a closed selection that perspective pasting can target
    fn ensure_pasteable(&self) -> SelectionResult<Vec<Point>> {
        if self.state != SelectionState::Selected {
            return Err(SelectionError::illegal_state("paste in perspective", self.state));
        }
        match self.variant.corner_count() {
            Some(n) if n == self.path.segment_count() && self.raster.is_some() => Ok(self.path.control_points()),
            _ => Err(SelectionError::illegal_state(
                "paste in perspective without exactly four corners",
                self.state,
            )),
        }
    }

    fn solve_inverse(&self, content: &PastedContent, corners: &[Point]) -> SelectionResult<Homography> {
        let tolerance = self.config.tolerance;
        let forward = perspective_homography(content.raster.width(), content.raster.height(), corners, tolerance)?;
        forward.inverse(tolerance)
    }

    /// If the last paste should follow the corners of `path`, solve for it now
    /// so a degenerate quad is rejected before anything changes
    fn prepare_rewarp(&self, path: &SelectionPath) -> SelectionResult<Option<(Arc<PastedContent>, Homography)>> {
        if !self.config.rewarp_on_corner_move {
            return Ok(None);
        }
        let Some(content) = &self.last_paste else {
            return Ok(None);
        };
        let inverse = self.solve_inverse(content, &path.control_points())?;
        Ok(Some((Arc::clone(content), inverse)))
    }

    fn start_pass(&mut self, content: Arc<PastedContent>, inverse: Homography) -> SelectionResult<JobId> {
        let Some(raster) = self.raster.as_ref() else {
            return Err(SelectionError::illegal_state("paste without an image", self.state));
        };

        let job = PasteJob::launch(
            raster.scratch(),
            content,
            inverse,
            self.config.processing,
            self.state,
            raster.generation(),
        )?;
        let id = job.id();
        info!("paste job {id} launched ({:?})", self.config.processing);

        self.job = Some(job);
        self.last_progress = Some(Progress::Percent(0));
        self.transition_to(SelectionState::Processing);
        self.emit(SelectionEvent::ProgressChanged(Progress::Percent(0)));

        if self.config.processing == ProcessingMode::Inline {
            self.poll_processing();
        }
        Ok(id)
    }

    fn finish_pass(&mut self, job: PasteJob, outcome: WarpOutcome) -> ProcessingStatus {
        let id = job.id();
        let current_generation = self.raster.as_ref().map(RasterStore::generation);
        self.last_progress = None;

        let status = match outcome {
            WarpOutcome::Completed(image) if current_generation == Some(job.raster_generation()) => {
                if let Some(raster) = self.raster.as_mut() {
                    raster.replace_working(image);
                }
                self.last_paste = Some(Arc::clone(job.content()));
                self.emit(SelectionEvent::ProgressChanged(Progress::Percent(100)));
                info!("paste job {id} applied");
                ProcessingStatus::Applied(id)
            }
            WarpOutcome::Completed(_) => {
                warn!("paste job {id} finished against a replaced image; result dropped");
                ProcessingStatus::Cancelled(id)
            }
            WarpOutcome::Cancelled => {
                if let Some(raster) = self.raster.as_mut() {
                    raster.restore_original();
                }
                self.last_paste = None;
                ProcessingStatus::Cancelled(id)
            }
            WarpOutcome::Failed(err) => {
                error!("paste job {id} failed: {err}");
                if let Some(raster) = self.raster.as_mut() {
                    raster.restore_original();
                }
                self.last_paste = None;
                self.emit(SelectionEvent::ProcessingFailed {
                    job: id,
                    error: Arc::new(err),
                });
                ProcessingStatus::Failed(id)
            }
        };

        self.transition_to(job.prior_state());
        self.emit(SelectionEvent::RasterChanged);
        status
    }

    fn selected_region(&self, operation: &'static str) -> SelectionResult<(&RasterStore, Polygon)> {
        if self.state != SelectionState::Selected {
            return Err(SelectionError::illegal_state(operation, self.state));
        }
        let raster = self
            .raster
            .as_ref()
            .ok_or_else(|| SelectionError::illegal_state(operation, self.state))?;
        Ok((raster, self.path.to_polygon()))
    }

    fn paint_region(&mut self, operation: &'static str, color: Rgba<u8>) -> SelectionResult<()> {
        let (_, polygon) = self.selected_region(operation)?;
        let Some(raster) = self.raster.as_mut() else {
            return Err(SelectionError::illegal_state(operation, self.state));
        };

        let (w, h) = raster.dimensions();
        let working = raster.working_mut();
        polygon.for_each_covered_pixel(w, h, |x, y| working.put_pixel(x, y, color));
        raster.commit_working_as_original();

        self.last_paste = None;
        self.emit(SelectionEvent::RasterChanged);
        Ok(())
    }
}

fn check_bounds(p: Point, width: u32, height: u32) -> SelectionResult<()> {
    if p.is_within(width, height) {
        Ok(())
    } else {
        Err(SelectionError::InvalidArgument(format!(
            "point {p} lies outside the {width}x{height} image"
        )))
    }
}
