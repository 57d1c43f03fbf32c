pub mod compositor;
pub mod homography;
mod job;

pub use compositor::{bilinear_sample, blend_over, composite, perspective_homography, source_quad, warp_and_overlay};
pub use homography::{Homography, Tolerance, DEFAULT_EPSILON};
pub use job::{Interrupted, JobControl, JobId, PasteJob, ProcessingMode, WarpOutcome};
