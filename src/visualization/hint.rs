//! Turning analysis results into user-facing hints.
//!
//! Mirrors what the camera screen does with a result: an affirmation for a
//! confident aligned verdict, a directional nudge otherwise, and a neutral
//! notice when the analysis could not say anything. Dismissal timing is
//! the caller's job; the hint only carries how long it should stay up.

use serde::Serialize;
use std::time::Duration;

use crate::algorithms::ALIGNED_CONFIDENCE_FLOOR;
use crate::pipeline::{AlignmentVerdict, AnalysisResult};

pub const HINT_DISPLAY_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Affirmation,
    Nudge,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hint {
    pub kind: HintKind,
    pub text: String,
    #[serde(skip)]
    pub display_for: Duration,
}

pub fn render_hint(result: &AnalysisResult) -> Hint {
    let (kind, text) = match result.alignment {
        AlignmentVerdict::Aligned if result.confidence >= ALIGNED_CONFIDENCE_FLOOR => {
            (HintKind::Affirmation, "Good alignment!")
        }
        // Only reachable for results built outside the classifier
        AlignmentVerdict::Aligned => (HintKind::Nudge, "Almost there, hold steady"),
        AlignmentVerdict::Left => (HintKind::Nudge, "Move the subject left in the frame"),
        AlignmentVerdict::Right => (HintKind::Nudge, "Move the subject right in the frame"),
        AlignmentVerdict::Up => (HintKind::Nudge, "Move the subject up in the frame"),
        AlignmentVerdict::Down => (HintKind::Nudge, "Move the subject down in the frame"),
        AlignmentVerdict::Unknown => (HintKind::Neutral, "Couldn't analyze photo"),
    };

    Hint {
        kind,
        text: text.to_string(),
        display_for: HINT_DISPLAY_DURATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Offset, Tip};

    fn result(alignment: AlignmentVerdict, confidence: f32, tip: Tip) -> AnalysisResult {
        AnalysisResult {
            alignment,
            confidence,
            tip,
            raw_offset: Offset::default(),
        }
    }

    #[test]
    fn test_confident_alignment_is_affirmed() {
        let hint = render_hint(&result(AlignmentVerdict::Aligned, 0.9, Tip::GoodAlignment));
        assert_eq!(hint.kind, HintKind::Affirmation);
        assert_eq!(hint.text, "Good alignment!");
        assert_eq!(hint.display_for, Duration::from_secs(3));
    }

    #[test]
    fn test_directional_verdicts_nudge() {
        for verdict in [
            AlignmentVerdict::Left,
            AlignmentVerdict::Right,
            AlignmentVerdict::Up,
            AlignmentVerdict::Down,
        ] {
            let hint = render_hint(&result(verdict, 0.5, Tip::MoveLeft));
            assert_eq!(hint.kind, HintKind::Nudge);
        }
    }

    #[test]
    fn test_unknown_is_neutral() {
        let hint = render_hint(&AnalysisResult::unknown(Tip::TimedOut));
        assert_eq!(hint.kind, HintKind::Neutral);
        assert_eq!(hint.text, "Couldn't analyze photo");
    }
}
