use std::fmt;
use std::str::FromStr;

use super::{Criterion, Judgement};
use crate::attributes::AttributeProvider;
use crate::error::{Error, Result};
use crate::types::Identity;

/// How close two picture shapes must be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeTolerance {
    /// Pixel dimensions differ (a rotated copy counts as the same size)
    DifferentSize,
    /// Both landscape, both portrait, or both square
    #[default]
    Orientation,
    /// Identical shape ratio
    Exact,
    /// Shape ratios at most this many points apart
    Within(u8),
}

impl ShapeTolerance {
    pub const ALL: [ShapeTolerance; 8] = [
        ShapeTolerance::DifferentSize,
        ShapeTolerance::Orientation,
        ShapeTolerance::Exact,
        ShapeTolerance::Within(5),
        ShapeTolerance::Within(10),
        ShapeTolerance::Within(20),
        ShapeTolerance::Within(30),
        ShapeTolerance::Within(50),
    ];
}

impl fmt::Display for ShapeTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeTolerance::DifferentSize => f.write_str("Different Size"),
            ShapeTolerance::Orientation => f.write_str("Portrait/Landscape"),
            ShapeTolerance::Exact => f.write_str("Exact"),
            ShapeTolerance::Within(percent) => write!(f, "<{}%", percent),
        }
    }
}

impl FromStr for ShapeTolerance {
    type Err = String;

    /// Accepts the label or `different`, `orientation`, `exact`, `5`..`50`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        if let Some(tolerance) = ShapeTolerance::ALL
            .iter()
            .find(|t| t.to_string().to_lowercase() == wanted)
        {
            return Ok(*tolerance);
        }
        let parsed = match wanted.trim_end_matches('%') {
            "different" | "differentsize" => Some(ShapeTolerance::DifferentSize),
            "orientation" => Some(ShapeTolerance::Orientation),
            "exact" => Some(ShapeTolerance::Exact),
            number => number.parse::<u8>().ok().map(ShapeTolerance::Within),
        };
        parsed
            .filter(|t| ShapeTolerance::ALL.contains(t))
            .ok_or_else(|| {
                format!(
                    "unknown shape tolerance '{}' (expected different, orientation, exact, 5, 10, 20, 30 or 50)",
                    s
                )
            })
    }
}

/// Compare pixel sizes or shape ratios
#[derive(Debug, Clone, Default)]
pub struct ShapeCriterion {
    tolerance: ShapeTolerance,
}

impl ShapeCriterion {
    pub fn tolerance(&self) -> ShapeTolerance {
        self.tolerance
    }

    /// Only the settings in [`ShapeTolerance::ALL`] are accepted
    pub fn set_tolerance(&mut self, tolerance: ShapeTolerance) -> Result<()> {
        if !ShapeTolerance::ALL.contains(&tolerance) {
            return Err(Error::InvalidParameter {
                condition: "pictureshape",
                reason: format!("tolerance '{}' is not available", tolerance),
            });
        }
        self.tolerance = tolerance;
        Ok(())
    }
}

impl Criterion for ShapeCriterion {
    type Params = ShapeTolerance;

    fn name(&self) -> &'static str {
        "pictureshape"
    }

    fn label(&self) -> String {
        format!("pictureshape ({})", self.tolerance)
    }

    fn params(&self) -> Self::Params {
        self.tolerance
    }

    fn judge(&self, provider: &AttributeProvider, a: &Identity, b: &Identity) -> Judgement {
        let (Some(dims_a), Some(dims_b)) = (provider.dimensions(a), provider.dimensions(b)) else {
            return Judgement::no_match();
        };
        let ratio_a = dims_a.shape_ratio();
        let ratio_b = dims_b.shape_ratio();

        match self.tolerance {
            ShapeTolerance::DifferentSize => {
                Judgement::from_bool(dims_a.unordered() != dims_b.unordered())
            }
            ShapeTolerance::Orientation => {
                Judgement::from_bool(ratio_a * ratio_b > 0.0 || (ratio_a == 0.0 && ratio_b == 0.0))
            }
            ShapeTolerance::Exact => Judgement::from_bool(ratio_a == ratio_b),
            ShapeTolerance::Within(percent) => {
                Judgement::from_bool((ratio_a - ratio_b).abs() <= percent as f64)
            }
        }
    }
}
