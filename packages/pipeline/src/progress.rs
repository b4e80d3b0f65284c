//! Per-volcano progress reporting.

use std::sync::Arc;

use volcano_risk_volcano_models::Volcano;

/// Receives progress events from a pipeline run.
///
/// Implementations must be `Send + Sync`; with `run.concurrency > 1`
/// events for different volcanoes interleave.
pub trait ProgressCallback: Send + Sync {
    /// Number of volcanoes about to be analysed.
    fn set_total(&self, total: u64);

    /// A volcano's analysis has started.
    fn volcano_started(&self, volcano: &Volcano);

    /// A volcano's analysis has ended, successfully or not.
    fn volcano_finished(&self, volcano: &Volcano, succeeded: bool);

    /// The run is over.
    fn finish(&self, msg: String);
}

/// Discards every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn volcano_started(&self, _volcano: &Volcano) {}
    fn volcano_finished(&self, _volcano: &Volcano, _succeeded: bool) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
