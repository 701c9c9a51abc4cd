//! Structured span for one analysis call
//!
//! Every `analyze` call gets its own correlation id so the two concurrent
//! extractions and the final verdict can be tied together in the logs.

use instant::Instant;
use tracing::{field, span, Level, Span};
use uuid::Uuid;

use crate::error::AlignError;
use crate::pipeline::{AnalysisResult, Landmark};

pub struct AnalysisSpan {
    span: Span,
    start_time: Instant,
    correlation_id: Uuid,
}

impl AnalysisSpan {
    pub fn new(extractor: &str, captured: &str, reference: &str) -> Self {
        let correlation_id = Uuid::new_v4();
        let span = span!(
            Level::INFO,
            "alignment_analysis",
            correlation_id = %correlation_id,
            extractor = extractor,
            captured = captured,
            reference = reference,
            alignment = field::Empty,
            confidence = field::Empty,
            execution_time_ms = field::Empty,
        );

        Self {
            span,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Record how extraction went for one side of the pair
    pub fn record_extraction(&self, role: &str, outcome: &Result<Option<Landmark>, AlignError>) {
        match outcome {
            Ok(Some(landmark)) => tracing::debug!(
                parent: &self.span,
                role = role,
                landmark = %landmark.name,
                x = landmark.x,
                y = landmark.y,
                "Landmark extracted"
            ),
            Ok(None) => tracing::debug!(
                parent: &self.span,
                role = role,
                "No landmark found"
            ),
            Err(e) if e.is_recoverable() => tracing::warn!(
                parent: &self.span,
                role = role,
                error = %e,
                "Extraction failed, downgrading to unknown verdict"
            ),
            Err(e) => tracing::error!(
                parent: &self.span,
                role = role,
                error = %e,
                "Extraction rejected by contract check"
            ),
        }
    }

    /// Record the final verdict
    pub fn record_result(&self, result: &AnalysisResult) {
        let duration = self.start_time.elapsed();
        self.span.record("alignment", field::display(result.alignment));
        self.span.record("confidence", result.confidence);
        self.span.record("execution_time_ms", duration.as_millis() as u64);

        tracing::info!(
            parent: &self.span,
            alignment = %result.alignment,
            confidence = format!("{:.3}", result.confidence),
            tip = %result.tip,
            dx = format!("{:.4}", result.raw_offset.dx),
            dy = format!("{:.4}", result.raw_offset.dy),
            execution_time_ms = duration.as_millis() as u64,
            "Alignment analysis completed"
        );
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
