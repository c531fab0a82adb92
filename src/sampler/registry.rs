//! Named registry of live sample sets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::sampler::collector::SampleCollector;
use crate::sampler::error::SamplerError;
use crate::sampler::set::SampleSetConfig;
use crate::sampler::sink::SampleSink;
use crate::sampler::timestamp::TimestampExtractor;
use crate::sampler::window::{Sample, SampleWindow};

/// Live state for one registered set.
struct SetHandle {
    window: Arc<SampleWindow>,
    cancel: CancellationToken,
}

/// Concurrent map of sample sets, keyed by unique name.
///
/// Adding a set creates its window and spawns its collector atomically under
/// the write lock, so a name can never briefly refer to two collectors.
/// Removing a set drops the entry and fires the collector's cancellation
/// token without waiting for the task to finish; an in-flight poll may still
/// complete against the detached window, which nothing can read anymore.
///
/// Reads resolve the name under the registry's read lock, clone the window
/// handle, and release the registry lock before touching the window's own
/// lock. The two locks are never held together.
#[derive(Clone)]
pub struct SampleRegistry {
    sets: Arc<RwLock<HashMap<String, SetHandle>>>,
    client: Client,
    extractor: Option<Arc<dyn TimestampExtractor>>,
    sink: Option<Arc<dyn SampleSink>>,
}

impl SampleRegistry {
    /// Create an empty registry with a default HTTP client and no extractor
    /// or sink.
    pub fn new() -> Self {
        Self {
            sets: Arc::new(RwLock::new(HashMap::new())),
            client: Client::default(),
            extractor: None,
            sink: None,
        }
    }

    /// Use a preconfigured HTTP client for all collectors (proxies, TLS
    /// settings, a global timeout ceiling).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Install a timestamp extractor applied to every set's payloads.
    pub fn with_timestamp_extractor(mut self, extractor: Arc<dyn TimestampExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Install a sink receiving every retained sample.
    pub fn with_sink(mut self, sink: Arc<dyn SampleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Register a set and start polling it.
    ///
    /// # Errors
    /// `InvalidConfig` when the declaration fails validation,
    /// `DuplicateName` when the name is already registered. On error no
    /// task is spawned and the registry is unchanged.
    pub async fn add_set(&self, config: SampleSetConfig) -> Result<(), SamplerError> {
        config.validate()?;

        let mut sets = self.sets.write().await;
        if sets.contains_key(&config.name) {
            return Err(SamplerError::DuplicateName(config.name.clone()));
        }

        let name = config.name.clone();
        let window = Arc::new(SampleWindow::new(config.retention));
        let cancel = CancellationToken::new();
        tracing::info!(
            set = %name,
            url = %config.url,
            period = ?config.period,
            retention = ?config.retention,
            "sample set added"
        );
        SampleCollector::new(
            config,
            window.clone(),
            self.client.clone(),
            self.extractor.clone(),
            self.sink.clone(),
            cancel.clone(),
        )
        .spawn();
        sets.insert(name, SetHandle { window, cancel });
        Ok(())
    }

    /// Unregister a set and signal its collector to stop.
    ///
    /// The stop signal is fire-and-forget: this returns as soon as the entry
    /// is gone, without waiting for the collector task to observe it.
    ///
    /// # Errors
    /// `UnknownName` when no set has this name.
    pub async fn remove_set(&self, name: &str) -> Result<(), SamplerError> {
        let mut sets = self.sets.write().await;
        let handle = sets
            .remove(name)
            .ok_or_else(|| SamplerError::UnknownName(name.to_string()))?;
        handle.cancel.cancel();
        tracing::info!(set = %name, "sample set removed");
        Ok(())
    }

    /// Window of the named set.
    ///
    /// # Errors
    /// `UnknownName` when no set has this name.
    pub async fn window(&self, name: &str) -> Result<Arc<SampleWindow>, SamplerError> {
        let sets = self.sets.read().await;
        sets.get(name)
            .map(|handle| handle.window.clone())
            .ok_or_else(|| SamplerError::UnknownName(name.to_string()))
    }

    /// The `n` most recent samples of the named set, newest first.
    /// `n == 0` means all.
    ///
    /// # Errors
    /// `UnknownName` when no set has this name.
    pub async fn read_last_n(&self, name: &str, n: usize) -> Result<Vec<Sample>, SamplerError> {
        let window = self.window(name).await?;
        Ok(window.read_last_n(n).await)
    }

    /// All samples of the named set strictly after `cutoff`, newest first.
    ///
    /// # Errors
    /// `UnknownName` when no set has this name.
    pub async fn read_since(
        &self,
        name: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Sample>, SamplerError> {
        let window = self.window(name).await?;
        Ok(window.read_since(cutoff).await)
    }

    /// All samples of the named set within the trailing `span` of now,
    /// newest first.
    ///
    /// # Errors
    /// `UnknownName` when no set has this name.
    pub async fn read_range(
        &self,
        name: &str,
        span: Duration,
    ) -> Result<Vec<Sample>, SamplerError> {
        // A span too large for timestamp arithmetic just means "everything".
        let cutoff = chrono::Duration::from_std(span)
            .ok()
            .and_then(|span| Utc::now().checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.read_since(name, cutoff).await
    }

    /// Names of all registered sets, sorted.
    pub async fn set_names(&self) -> Vec<String> {
        let sets = self.sets.read().await;
        let mut names: Vec<String> = sets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a set with this name is registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.sets.read().await.contains_key(name)
    }

    /// Number of registered sets.
    pub async fn len(&self) -> usize {
        self.sets.read().await.len()
    }

    /// Whether the registry has no sets.
    pub async fn is_empty(&self) -> bool {
        self.sets.read().await.is_empty()
    }

    /// Stop every collector and clear the registry.
    pub async fn shutdown(&self) {
        let mut sets = self.sets.write().await;
        let count = sets.len();
        for (_, handle) in sets.drain() {
            handle.cancel.cancel();
        }
        tracing::info!(sets = count, "sample registry shut down");
    }
}

impl Default for SampleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SampleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRegistry")
            .field(
                "set_count",
                &self.sets.try_read().map(|sets| sets.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}
