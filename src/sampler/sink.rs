//! Sample delivery hook.

use async_trait::async_trait;

use crate::sampler::window::Sample;

/// Observer invoked once for every retained sample.
///
/// The collector calls [`deliver`](SampleSink::deliver) after the append has
/// committed and the window lock has been released, so a slow sink never
/// blocks readers of the window. Rejected (stale) samples are not delivered.
///
/// Delivery failures are the sink's own concern: implementations log and
/// absorb them, and the collector carries on regardless.
#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Handle one retained sample from the named set.
    async fn deliver(&self, set_name: &str, sample: &Sample);
}
