//! Random photo selection.
use rand::Rng;

use crate::extract;
use crate::notion::model::Page;

pub trait PhotoChooser: Send + Sync {
    /// Index in `0..len`. Only called with `len > 0`.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomChooser;

impl PhotoChooser for RandomChooser {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always picks the same position, clamped to the candidate count.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedChooser(pub usize);

impl PhotoChooser for FixedChooser {
    fn pick(&self, len: usize) -> usize {
        self.0.min(len - 1)
    }
}

/// Choose one candidate and resolve its URL. `None` when there are no
/// candidates or the chosen one carries no image.
pub fn choose_url(candidates: &[Page], chooser: &dyn PhotoChooser) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let pick = chooser.pick(candidates.len());
    candidates.get(pick).and_then(extract::photo_url)
}
