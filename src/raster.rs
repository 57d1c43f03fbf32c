use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// Every attached raster gets a fresh generation so stale pass results can be told apart
static NEXT_GENERATION: AtomicUsize = AtomicUsize::new(1);

/// The model's pixels: an editable working copy plus the untouched snapshot
/// every paste starts from.
#[derive(Debug, Clone)]
pub struct RasterStore {
    generation: usize,
    working: RgbaImage,
    original: Arc<RgbaImage>,
}

impl RasterStore {
    pub fn new(image: RgbaImage) -> Self {
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::SeqCst);
        Self {
            generation,
            original: Arc::new(image.clone()),
            working: image,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn working(&self) -> &RgbaImage {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut RgbaImage {
        &mut self.working
    }

    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.working.dimensions()
    }

    /// A private copy of the original for a worker to write into
    pub fn scratch(&self) -> RgbaImage {
        (*self.original).clone()
    }

    /// Discard every edit made since the last commit
    pub fn restore_original(&mut self) {
        self.working.clone_from(&self.original);
    }

    /// Swap in a finished raster in one step
    pub fn replace_working(&mut self, image: RgbaImage) {
        debug_assert_eq!(image.dimensions(), self.working.dimensions());
        self.working = image;
    }

    /// Make the current working copy the new baseline for pastes
    pub fn commit_working_as_original(&mut self) {
        self.original = Arc::new(self.working.clone());
    }
}
