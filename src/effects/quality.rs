use serde::{Deserialize, Serialize};

/// Fixed quality presets. Every effect maps a tier to its own parameter table,
/// trading render-target resolution and sample count for frame cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// Picks the value for this tier from a `[low, medium, high]` table.
    #[inline]
    #[must_use]
    pub fn pick<T: Copy>(self, table: [T; 3]) -> T {
        table[self as usize]
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

impl std::str::FromStr for QualityTier {
    type Err = crate::errors::VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(crate::errors::VisionError::Config(format!(
                "unknown quality tier '{other}'"
            ))),
        }
    }
}
