//! InfluxDB delivery sink.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::sampler::{Sample, SampleSink};

/// Timeout for a single write request.
const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sink that writes retained samples to an InfluxDB series endpoint.
///
/// Payloads are expected to be the flattened metric shape: a JSON object of
/// objects with numeric leaves (`{"group": {"metric": 1.5, ...}, ...}`).
/// Each sample becomes one point in a series named after its set, with
/// columns `time` plus the dotted `group.metric` keys in sorted order.
/// Payloads that do not match the shape are skipped with a warning.
///
/// The write request runs in its own task, so a slow store never delays the
/// collector that delivered the sample.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    url: String,
    client: Client,
}

impl InfluxSink {
    /// Create a sink posting to `url` (the full series write endpoint,
    /// including any database name and credentials in the query string).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::default(),
        }
    }

    /// Use a preconfigured HTTP client for writes.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl SampleSink for InfluxSink {
    async fn deliver(&self, set_name: &str, sample: &Sample) {
        let Some(flat) = flatten(&sample.payload) else {
            tracing::warn!(
                set = %set_name,
                "payload does not flatten to metric columns, skipping export"
            );
            return;
        };
        if flat.is_empty() {
            tracing::debug!(set = %set_name, "no metric columns in payload");
            return;
        }

        let body = format_points(set_name, sample.time.timestamp(), &flat);
        let request = self
            .client
            .post(&self.url)
            .timeout(POST_TIMEOUT)
            .json(&body);
        let name = set_name.to_string();
        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        set = %name,
                        status = %status,
                        detail = %detail,
                        "time-series store rejected points"
                    );
                }
                Ok(_) => {
                    tracing::debug!(set = %name, columns = body_column_count(&body), "points exported");
                }
                Err(e) => {
                    tracing::warn!(set = %name, error = %e, "failed to post points");
                }
            }
        });
    }
}

fn body_column_count(body: &Value) -> usize {
    body[0]["columns"].as_array().map(Vec::len).unwrap_or(0)
}

/// Flatten a two-level metric object to dotted keys. Returns `None` when the
/// payload is not an object of objects with numeric leaves.
fn flatten(payload: &[u8]) -> Option<BTreeMap<String, f64>> {
    let top: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_slice(payload).ok()?;
    let mut flat = BTreeMap::new();
    for (key, inner) in top {
        for (key2, value) in inner {
            flat.insert(format!("{key}.{key2}"), value);
        }
    }
    Some(flat)
}

/// Build the `[{name, columns, points}]` write body for one sample.
/// Columns and point values come from the same sorted iteration, with
/// `time` (unix seconds) first.
fn format_points(name: &str, time_secs: i64, flat: &BTreeMap<String, f64>) -> Value {
    let mut columns = Vec::with_capacity(flat.len() + 1);
    let mut row = Vec::with_capacity(flat.len() + 1);
    columns.push(Value::from("time"));
    row.push(Value::from(time_secs));
    for (key, value) in flat {
        columns.push(Value::from(key.as_str()));
        row.push(json!(value));
    }
    json!([{
        "name": name,
        "columns": columns,
        "points": [row],
    }])
}
