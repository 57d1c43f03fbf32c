#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod history;
pub mod model;
pub mod paste;
pub mod path;
pub mod raster;
pub mod shapes;
pub mod state;
pub mod tool;
pub mod util;
pub mod warp;

pub use config::{ConfigError, SelectorConfig};
pub use error::{SelectionError, SelectionResult};
pub use event::{EventBus, EventHandler, HandlerId, LogEventHandler, Progress, SelectionEvent};
pub use geometry::{Point, Polygon, Segment};
pub use model::{ProcessingStatus, SelectionModel};
pub use paste::{PasteKind, PastedContent};
pub use path::SelectionPath;
pub use shapes::ShapeKind;
pub use state::{SelectionSnapshot, SelectionState};
pub use tool::{SelectionVariant, VariantKind};
pub use warp::{Homography, JobId, ProcessingMode, Tolerance};
