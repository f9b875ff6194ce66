/// Receives progress strings while a commit or revert runs.
///
/// All methods default to doing nothing so callers only override what they
/// render.
pub trait ProgressReporter {
    fn start(&mut self, _phase: &str, _total: usize) {}

    fn advance(&mut self, _item: &str) {}

    fn finish(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}
