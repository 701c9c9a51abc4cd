//! Alignment analysis entry point.
//!
//! Extracts a landmark from the captured and the reference photo in
//! parallel, compares them and classifies the offset. Expected runtime
//! failures end up as an `unknown` verdict; only contract violations
//! reach the caller as errors.

mod detector;

pub use detector::SharedDetector;

use instant::Instant;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::algorithms::{compute_offset, VerdictClassifier};
use crate::config::Config;
use crate::error::{AlignError, AlignResult};
use crate::logging::{AnalysisSpan, MetricsCollector};
use crate::pipeline::{AnalysisResult, ImageHandle, Landmark, Tip};

#[derive(Clone)]
pub struct AlignmentAnalyzer {
    detector: SharedDetector,
    classifier: VerdictClassifier,
    budget: Duration,
    metrics: Arc<MetricsCollector>,
}

impl AlignmentAnalyzer {
    pub fn new(detector: SharedDetector, classifier: VerdictClassifier, budget: Duration) -> Self {
        Self {
            detector,
            classifier,
            budget,
            metrics: Arc::new(MetricsCollector::new(false)),
        }
    }

    pub fn from_config(config: &Config) -> AlignResult<Self> {
        let classifier = VerdictClassifier::new(config.analyzer.deadband)?;
        if config.analyzer.timeout_ms == 0 {
            return Err(AlignError::ContractViolation(
                "analysis timeout must be positive".to_string(),
            ));
        }
        Ok(Self::new(
            SharedDetector::from_config(config),
            classifier,
            Duration::from_millis(config.analyzer.timeout_ms),
        )
        .with_metrics(Arc::new(MetricsCollector::new(config.logging.collect_metrics))))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn detector(&self) -> &SharedDetector {
        &self.detector
    }

    pub fn classifier(&self) -> &VerdictClassifier {
        &self.classifier
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Compare a captured photo against a reference photo.
    ///
    /// # Errors
    ///
    /// Only [`AlignError::ContractViolation`]; decode failures, an
    /// unavailable detector and timeouts come back as `unknown` results.
    pub async fn analyze(
        &self,
        captured: &ImageHandle,
        reference: &ImageHandle,
    ) -> AlignResult<AnalysisResult> {
        captured.validate()?;
        reference.validate()?;

        let span = AnalysisSpan::new(self.detector.backend(), captured.as_str(), reference.as_str());
        let start = Instant::now();

        let (captured_outcome, reference_outcome) = async {
            tokio::join!(
                self.extract_within_budget(captured),
                self.extract_within_budget(reference)
            )
        }
        .instrument(span.span().clone())
        .await;

        span.record_extraction("captured", &captured_outcome);
        span.record_extraction("reference", &reference_outcome);

        let result = self.conclude(captured_outcome, reference_outcome)?;
        span.record_result(&result);

        let mut metadata: HashMap<String, serde_json::Value> = HashMap::new();
        metadata.insert(
            "alignment".to_string(),
            serde_json::Value::from(result.alignment.to_string()),
        );
        self.metrics.record_with_metadata(
            "analyze",
            start.elapsed(),
            Some(span.correlation_id()),
            metadata,
        );
        Ok(result)
    }

    /// Offset and classification for landmarks that are already known
    pub fn assess(&self, captured: Option<&Landmark>, reference: Option<&Landmark>) -> AnalysisResult {
        let offset = match (captured, reference) {
            (Some(c), Some(r)) => Some(compute_offset(c, r)),
            _ => None,
        };
        self.classifier.classify(offset)
    }

    async fn extract_within_budget(&self, image: &ImageHandle) -> AlignResult<Option<Landmark>> {
        let start = Instant::now();
        let outcome = self
            .within_budget(async {
                let extractor = self.detector.get().await?;
                extractor.extract(image).await
            })
            .await;
        self.metrics.record("extract", start.elapsed(), None);
        outcome
    }

    /// Bound one extraction by the per-image budget; overrunning it
    /// yields [`AlignError::Timeout`].
    pub async fn within_budget<F>(&self, extraction: F) -> AlignResult<Option<Landmark>>
    where
        F: Future<Output = AlignResult<Option<Landmark>>>,
    {
        match tokio::time::timeout(self.budget, extraction).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AlignError::Timeout {
                budget_ms: self.budget.as_millis() as u64,
            }),
        }
    }

    /// Fold two extraction outcomes into a result.
    ///
    /// Contract violations on either side propagate; any other failure
    /// yields an `unknown` verdict whose tip names the failure.
    pub fn conclude(
        &self,
        captured: AlignResult<Option<Landmark>>,
        reference: AlignResult<Option<Landmark>>,
    ) -> AlignResult<AnalysisResult> {
        for outcome in [&captured, &reference] {
            if let Err(e) = outcome {
                if !e.is_recoverable() {
                    return Err(e.clone());
                }
            }
        }

        // The captured side's failure is reported first
        match (captured, reference) {
            (Err(e), _) | (_, Err(e)) => Ok(AnalysisResult::unknown(Tip::for_failure(&e))),
            (Ok(c), Ok(r)) => Ok(self.assess(c.as_ref(), r.as_ref())),
        }
    }
}
