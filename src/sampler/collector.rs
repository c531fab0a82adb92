//! Polling task for a single sample set.
//!
//! Each registered set owns one [`SampleCollector`] running in its own tokio
//! task. The task wakes on a fixed period, fetches the set's endpoint,
//! resolves the sample timestamp, and appends into the set's window. Every
//! failure along the way is logged and absorbed; the next tick is the retry.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::sampler::set::SampleSetConfig;
use crate::sampler::sink::SampleSink;
use crate::sampler::timestamp::TimestampExtractor;
use crate::sampler::window::{Sample, SampleWindow};

/// Why a single poll produced no sample. Logged, never surfaced.
#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("empty response body")]
    EmptyBody,
}

/// The polling loop for one sample set.
///
/// Constructed by the registry, consumed by [`spawn`](SampleCollector::spawn).
/// The timer is the only retry mechanism: a failed poll skips the append and
/// waits for the next tick.
pub struct SampleCollector {
    config: SampleSetConfig,
    window: Arc<SampleWindow>,
    client: Client,
    extractor: Option<Arc<dyn TimestampExtractor>>,
    sink: Option<Arc<dyn SampleSink>>,
    cancel: CancellationToken,
}

impl SampleCollector {
    /// Create a collector for `config` appending into `window`.
    pub fn new(
        config: SampleSetConfig,
        window: Arc<SampleWindow>,
        client: Client,
        extractor: Option<Arc<dyn TimestampExtractor>>,
        sink: Option<Arc<dyn SampleSink>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            window,
            client,
            extractor,
            sink,
            cancel,
        }
    }

    /// Start the polling loop in its own task. The task runs until the
    /// cancellation token fires.
    pub fn spawn(self) {
        tokio::spawn(self.run());
    }

    async fn run(self) {
        let period = self.config.clamped_period();
        // First fire one full period after spawn, then on the fixed period.
        // A poll that overruns delays the next tick instead of bursting.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(set = %self.config.name, period = ?period, "collector started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(set = %self.config.name, "collector stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }

    /// One tick: fetch, stamp, append, deliver.
    async fn poll_once(&self) {
        let payload = match self.fetch().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(set = %self.config.name, error = %e, "poll failed");
                return;
            }
        };

        let time = self
            .extractor
            .as_ref()
            .and_then(|extractor| extractor.extract(&payload))
            .unwrap_or_else(Utc::now);

        let sample = Sample::new(time, payload);
        if !self.window.try_append(sample.clone()).await {
            tracing::debug!(
                set = %self.config.name,
                time = %sample.time,
                "stale sample rejected"
            );
            return;
        }

        tracing::debug!(
            set = %self.config.name,
            time = %sample.time,
            bytes = sample.payload.len(),
            "sample retained"
        );

        // Delivery happens outside the window lock and only for retained
        // samples.
        if let Some(sink) = &self.sink {
            sink.deliver(&self.config.name, &sample).await;
        }
    }

    async fn fetch(&self) -> Result<Bytes, FetchError> {
        let mut request = self
            .client
            .request(reqwest::Method::from(self.config.method), &self.config.url)
            .timeout(self.config.timeout);
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &self.config.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let payload = response.bytes().await?;
        if payload.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(payload)
    }
}

impl std::fmt::Debug for SampleCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleCollector")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::timestamp::SnapshotTimeExtractor;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::any;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn try_bind() -> Option<TcpListener> {
        match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => Some(listener),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                eprintln!("Skipping test: cannot bind loopback socket: {e}");
                None
            }
            Err(e) => panic!("failed to bind loopback socket: {e}"),
        }
    }

    async fn serve(app: Router) -> Option<SocketAddr> {
        let listener = try_bind().await?;
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Some(addr)
    }

    async fn serve_static(status: StatusCode, body: &'static str) -> Option<SocketAddr> {
        serve(Router::new().route("/", any(move || async move { (status, body) }))).await
    }

    fn collector_for(
        addr: SocketAddr,
        period: Duration,
        extractor: Option<Arc<dyn TimestampExtractor>>,
        sink: Option<Arc<dyn SampleSink>>,
    ) -> (SampleCollector, Arc<SampleWindow>, CancellationToken) {
        let config = SampleSetConfig::new("under-test", format!("http://{addr}/"))
            .with_period(period)
            .with_timeout(Duration::from_secs(2));
        let window = Arc::new(SampleWindow::new(Duration::from_secs(3600)));
        let cancel = CancellationToken::new();
        let collector = SampleCollector::new(
            config,
            window.clone(),
            Client::new(),
            extractor,
            sink,
            cancel.clone(),
        );
        (collector, window, cancel)
    }

    struct CountingSink {
        delivered: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SampleSink for CountingSink {
        async fn deliver(&self, _set_name: &str, _sample: &Sample) {
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_collector_appends_with_wall_clock_fallback() {
        // Payload is not the snapshot shape, so the extractor falls back to
        // the wall clock and every tick lands a fresh sample.
        let Some(addr) = serve_static(StatusCode::OK, r#"{"cpu": 0.5}"#).await else {
            return;
        };
        let (collector, window, cancel) = collector_for(
            addr,
            Duration::from_millis(25),
            Some(Arc::new(SnapshotTimeExtractor)),
            None,
        );
        collector.spawn();

        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();

        let samples = window.read_last_n(0).await;
        assert!(
            samples.len() >= 2,
            "expected several samples, got {}",
            samples.len()
        );
        // Newest first, strictly descending.
        for pair in samples.windows(2) {
            assert!(pair[0].time > pair[1].time);
        }
        assert_eq!(samples[0].payload.as_ref(), br#"{"cpu": 0.5}"#);
    }

    #[tokio::test]
    async fn test_fixed_snapshot_time_retains_single_sample() {
        let body = r#"{
            "GLOBAL.snapshot.count": {"count": 7},
            "GLOBAL.snapshot.time": {"value": 1700000000}
        }"#;
        let Some(addr) = serve_static(StatusCode::OK, body).await else {
            return;
        };
        let sink = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
        });
        let (collector, window, cancel) = collector_for(
            addr,
            Duration::from_millis(25),
            Some(Arc::new(SnapshotTimeExtractor)),
            Some(sink.clone()),
        );
        collector.spawn();

        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();

        // Every poll after the first carries the same embedded time and is
        // rejected as stale; the sink fires only for the retained one.
        assert_eq!(window.len().await, 1);
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_status_produces_no_samples() {
        let Some(addr) = serve_static(StatusCode::INTERNAL_SERVER_ERROR, "boom").await else {
            return;
        };
        let (collector, window, cancel) =
            collector_for(addr, Duration::from_millis(25), None, None);
        collector.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        assert!(window.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_body_produces_no_samples() {
        let Some(addr) = serve_static(StatusCode::OK, "").await else {
            return;
        };
        let (collector, window, cancel) =
            collector_for(addr, Duration::from_millis(25), None, None);
        collector.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        assert!(window.is_empty().await);
    }

    #[tokio::test]
    async fn test_unreachable_target_keeps_collector_alive() {
        // Bind then drop to get an address with nothing listening.
        let Some(listener) = try_bind().await else {
            return;
        };
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (collector, window, cancel) =
            collector_for(addr, Duration::from_millis(25), None, None);
        collector.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(window.is_empty().await);
        assert!(!cancel.is_cancelled());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick() {
        let Some(addr) = serve_static(StatusCode::OK, r#"{"x":1}"#).await else {
            return;
        };
        let (collector, window, cancel) =
            collector_for(addr, Duration::from_millis(100), None, None);
        collector.spawn();

        // The first tick is a full period out; cancelling before it means
        // nothing is ever fetched.
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(window.is_empty().await);
    }

    #[tokio::test]
    async fn test_sink_fires_per_retained_sample() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hits = counter.clone();
        let app = Router::new().route(
            "/",
            any(move || {
                let hits = hits.clone();
                async move { format!(r#"{{"n": {}}}"#, hits.fetch_add(1, Ordering::SeqCst)) }
            }),
        );
        let Some(addr) = serve(app).await else {
            return;
        };

        let sink = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
        });
        let (collector, window, cancel) =
            collector_for(addr, Duration::from_millis(25), None, Some(sink.clone()));
        collector.spawn();

        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();

        let retained = window.len().await;
        assert!(retained >= 2);
        assert_eq!(sink.delivered.load(Ordering::SeqCst), retained);
    }
}
