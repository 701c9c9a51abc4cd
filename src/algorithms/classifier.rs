use crate::error::{AlignError, AlignResult};
use crate::pipeline::{AlignmentVerdict, AnalysisResult, Offset, Tip};

/// Lowest confidence an aligned verdict can carry
pub const ALIGNED_CONFIDENCE_FLOOR: f32 = 0.85;
/// Highest confidence a directional verdict can carry
pub const MISALIGNED_CONFIDENCE_CEILING: f32 = 0.84;
pub const DEFAULT_DEADBAND: f32 = 0.03;

/// Maps an offset to a verdict, a confidence and a tip.
///
/// Sign convention: a verdict names the direction the subject must travel
/// within the frame. `dx > 0` puts the subject right of its reference
/// position, so the verdict is `Left`; `dy > 0` puts it below (y grows
/// downward), so the verdict is `Up`. Tips follow the same
/// subject-relative wording (`Up` → "move up").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerdictClassifier {
    deadband: f32,
}

impl VerdictClassifier {
    pub fn new(deadband: f32) -> AlignResult<Self> {
        if !(deadband.is_finite() && deadband > 0.0) {
            return Err(AlignError::ContractViolation(format!(
                "deadband must be a positive finite number, got {deadband}"
            )));
        }
        Ok(Self { deadband })
    }

    pub fn deadband(&self) -> f32 {
        self.deadband
    }

    /// Classify an offset; `None` means a landmark was missing on either side.
    pub fn classify(&self, offset: Option<Offset>) -> AnalysisResult {
        let Some(offset) = offset else {
            return AnalysisResult::unknown(Tip::CouldNotAnalyze);
        };

        if !(offset.dx.is_finite() && offset.dy.is_finite()) {
            return AnalysisResult::unknown(Tip::CouldNotAnalyze);
        }
        let m = offset.magnitude();

        if m <= self.deadband {
            let closeness = 1.0 - m / self.deadband;
            let confidence = ALIGNED_CONFIDENCE_FLOOR + (1.0 - ALIGNED_CONFIDENCE_FLOOR) * closeness;
            return AnalysisResult {
                alignment: AlignmentVerdict::Aligned,
                confidence: confidence.clamp(ALIGNED_CONFIDENCE_FLOOR, 1.0),
                tip: Tip::GoodAlignment,
                raw_offset: offset,
            };
        }

        // Horizontal wins ties
        let (alignment, tip) = if offset.dx.abs() >= offset.dy.abs() {
            if offset.dx > 0.0 {
                (AlignmentVerdict::Left, Tip::MoveLeft)
            } else {
                (AlignmentVerdict::Right, Tip::MoveRight)
            }
        } else if offset.dy > 0.0 {
            (AlignmentVerdict::Up, Tip::MoveUp)
        } else {
            (AlignmentVerdict::Down, Tip::MoveDown)
        };

        AnalysisResult {
            alignment,
            confidence: (1.0 - m).clamp(0.0, MISALIGNED_CONFIDENCE_CEILING),
            tip,
            raw_offset: offset,
        }
    }
}

impl Default for VerdictClassifier {
    fn default() -> Self {
        Self {
            deadband: DEFAULT_DEADBAND,
        }
    }
}
