use log::{debug, error, info};

use crate::event::{EventHandler, Progress, SelectionEvent};

/// Forwards every model notification to the `log` facade
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl LogEventHandler {
    pub fn new() -> Self {
        Self
    }
}

impl EventHandler for LogEventHandler {
    fn handle_event(&mut self, event: &SelectionEvent) {
        match event {
            SelectionEvent::PathChanged => debug!("selection path changed"),
            SelectionEvent::StateChanged { old, new } => info!("selection state {old} -> {new}"),
            SelectionEvent::RasterChanged => debug!("raster changed"),
            SelectionEvent::ProgressChanged(Progress::Percent(p)) => debug!("processing {p}%"),
            SelectionEvent::ProgressChanged(Progress::Indeterminate) => debug!("processing..."),
            SelectionEvent::ProcessingFailed { job, error: err } => {
                error!("processing job {job} failed: {err}")
            }
        }
    }
}

impl<F> EventHandler for F
where
    F: FnMut(&SelectionEvent) + Send,
{
    fn handle_event(&mut self, event: &SelectionEvent) {
        self(event)
    }
}
