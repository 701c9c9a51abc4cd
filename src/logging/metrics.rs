//! Latency metrics for extraction and analysis
//!
//! Bounded, thread-safe store of recent measurements with percentile
//! summaries, served by the detection service on `/metrics`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

const MAX_MEASUREMENTS: usize = 10_000;

/// Individual performance measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMeasurement {
    pub operation: String,
    pub duration_ms: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub correlation_id: Option<Uuid>,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Statistical summary of performance measurements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub operation: String,
    pub count: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
}

pub struct MetricsCollector {
    measurements: Mutex<Vec<PerformanceMeasurement>>,
    enabled: bool,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            measurements: Mutex::new(Vec::new()),
            enabled,
        }
    }

    /// Record a performance measurement
    pub fn record(&self, operation: &str, duration: Duration, correlation_id: Option<Uuid>) {
        self.record_with_metadata(operation, duration, correlation_id, HashMap::new());
    }

    /// Record a measurement with additional metadata
    pub fn record_with_metadata(
        &self,
        operation: &str,
        duration: Duration,
        correlation_id: Option<Uuid>,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let measurement = PerformanceMeasurement {
            operation: operation.to_string(),
            duration_ms: duration.as_secs_f64() * 1000.0,
            timestamp: chrono::Utc::now(),
            correlation_id,
            metadata,
        };

        if let Ok(mut measurements) = self.measurements.lock() {
            measurements.push(measurement);

            // Keep only the most recent half once the cap is hit
            if measurements.len() > MAX_MEASUREMENTS {
                measurements.drain(0..MAX_MEASUREMENTS / 2);
            }
        }
    }

    /// Get all measurements for a specific operation
    pub fn get_measurements(&self, operation: &str) -> Vec<PerformanceMeasurement> {
        match self.measurements.lock() {
            Ok(measurements) => measurements
                .iter()
                .filter(|m| m.operation == operation)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Calculate performance statistics for an operation
    pub fn calculate_stats(&self, operation: &str) -> Option<PerformanceStats> {
        let mut durations: Vec<f64> = self
            .get_measurements(operation)
            .iter()
            .map(|m| m.duration_ms)
            .collect();
        if durations.is_empty() {
            return None;
        }
        durations.sort_by(|a, b| a.total_cmp(b));

        let count = durations.len();
        let mean = durations.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (durations[count / 2 - 1] + durations[count / 2]) / 2.0
        } else {
            durations[count / 2]
        };
        let p95_index = ((count as f64) * 0.95) as usize;

        Some(PerformanceStats {
            operation: operation.to_string(),
            count,
            mean_ms: mean,
            median_ms: median,
            min_ms: durations[0],
            max_ms: durations[count - 1],
            p95_ms: durations[p95_index.min(count - 1)],
        })
    }

    /// Statistics for every operation seen so far, keyed by operation name
    pub fn summary(&self) -> BTreeMap<String, PerformanceStats> {
        let operations: Vec<String> = match self.measurements.lock() {
            Ok(measurements) => {
                let mut ops: Vec<String> = measurements.iter().map(|m| m.operation.clone()).collect();
                ops.sort();
                ops.dedup();
                ops
            }
            Err(_) => Vec::new(),
        };

        operations
            .into_iter()
            .filter_map(|op| self.calculate_stats(&op).map(|stats| (op, stats)))
            .collect()
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(true)
    }
}
