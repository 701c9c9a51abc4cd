use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{AlignError, AlignResult};

/// Opaque reference to an image resource (local path or `file://` URI).
///
/// The analyzer only borrows handles; it never deletes or rewrites the
/// resource behind them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects handles that cannot refer to anything.
    pub fn validate(&self) -> AlignResult<()> {
        if self.0.trim().is_empty() {
            return Err(AlignError::ContractViolation(
                "image handle must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageHandle {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<PathBuf> for ImageHandle {
    fn from(value: PathBuf) -> Self {
        Self::new(value.to_string_lossy().into_owned())
    }
}

impl From<&std::path::Path> for ImageHandle {
    fn from(value: &std::path::Path) -> Self {
        Self::new(value.to_string_lossy().into_owned())
    }
}

/// A named feature point in normalized image space.
///
/// Coordinates are fractions of image width and height in `[0, 1]`,
/// origin top-left, y growing downward. Images of different resolutions
/// are directly comparable once expressed this way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    /// Builds a landmark from coordinates already in normalized space.
    pub fn normalized(name: impl Into<String>, x: f32, y: f32) -> AlignResult<Self> {
        let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(x) || !in_range(y) {
            return Err(AlignError::ContractViolation(format!(
                "landmark ({x}, {y}) is outside normalized space"
            )));
        }
        Ok(Self {
            name: name.into(),
            x,
            y,
        })
    }

    /// Builds a landmark from pixel coordinates of an image of the given size.
    pub fn from_pixel(
        name: impl Into<String>,
        px: f32,
        py: f32,
        width: u32,
        height: u32,
    ) -> AlignResult<Self> {
        if width == 0 || height == 0 {
            return Err(AlignError::ContractViolation(format!(
                "cannot normalize against a {width}x{height} image"
            )));
        }
        Self::normalized(name, px / width as f32, py / height as f32)
    }

    /// Re-validates a landmark deserialized from an untrusted backend.
    pub(crate) fn checked(self) -> AlignResult<Self> {
        Self::normalized(self.name, self.x, self.y)
    }
}

/// Signed offset `captured - reference` in normalized space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f32,
    pub dy: f32,
}

impl Offset {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    /// Chebyshev magnitude, `max(|dx|, |dy|)`.
    pub fn magnitude(&self) -> f32 {
        self.dx.abs().max(self.dy.abs())
    }
}

/// Discrete alignment classification.
///
/// Directions name where the subject has to travel within the frame to
/// reach its position in the reference shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentVerdict {
    Left,
    Right,
    Up,
    Down,
    Aligned,
    Unknown,
}

impl fmt::Display for AlignmentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::Aligned => "aligned",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Locale-agnostic hint identifier. The presentation layer maps it to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tip {
    #[serde(rename = "good alignment")]
    GoodAlignment,
    #[serde(rename = "move left")]
    MoveLeft,
    #[serde(rename = "move right")]
    MoveRight,
    #[serde(rename = "move up")]
    MoveUp,
    #[serde(rename = "move down")]
    MoveDown,
    #[serde(rename = "could not analyze")]
    CouldNotAnalyze,
    #[serde(rename = "image could not be decoded")]
    DecodeFailed,
    #[serde(rename = "detector unavailable")]
    DetectorUnavailable,
    #[serde(rename = "analysis timed out")]
    TimedOut,
}

impl Tip {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoodAlignment => "good alignment",
            Self::MoveLeft => "move left",
            Self::MoveRight => "move right",
            Self::MoveUp => "move up",
            Self::MoveDown => "move down",
            Self::CouldNotAnalyze => "could not analyze",
            Self::DecodeFailed => "image could not be decoded",
            Self::DetectorUnavailable => "detector unavailable",
            Self::TimedOut => "analysis timed out",
        }
    }

    /// Tip naming the class of a recoverable extraction failure.
    pub fn for_failure(error: &AlignError) -> Self {
        match error {
            AlignError::Decode { .. } => Self::DecodeFailed,
            AlignError::DetectorUnavailable(_) => Self::DetectorUnavailable,
            AlignError::Timeout { .. } => Self::TimedOut,
            AlignError::ContractViolation(_) => Self::CouldNotAnalyze,
        }
    }
}

impl fmt::Display for Tip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one `analyze` call. Transient; consumed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub alignment: AlignmentVerdict,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub tip: Tip,
    pub raw_offset: Offset,
}

impl AnalysisResult {
    pub fn unknown(tip: Tip) -> Self {
        Self {
            alignment: AlignmentVerdict::Unknown,
            confidence: 0.0,
            tip,
            raw_offset: Offset::default(),
        }
    }
}
