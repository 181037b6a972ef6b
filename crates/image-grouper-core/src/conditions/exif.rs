use std::fmt;
use std::str::FromStr;

use super::{Criterion, Judgement};
use crate::attributes::AttributeProvider;
use crate::error::Result;
use crate::types::{CaptureTime, Identity};

/// Maximum gap between two capture times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    OneMinute,
    #[default]
    TenMinutes,
    OneHour,
    OneDay,
    OneWeek,
    FourWeeks,
    OneYear,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 7] = [
        TimeWindow::OneMinute,
        TimeWindow::TenMinutes,
        TimeWindow::OneHour,
        TimeWindow::OneDay,
        TimeWindow::OneWeek,
        TimeWindow::FourWeeks,
        TimeWindow::OneYear,
    ];

    pub fn seconds(self) -> i64 {
        const DAY: i64 = 24 * 3600;
        match self {
            TimeWindow::OneMinute => 60,
            TimeWindow::TenMinutes => 600,
            TimeWindow::OneHour => 3600,
            TimeWindow::OneDay => DAY,
            TimeWindow::OneWeek => 7 * DAY,
            TimeWindow::FourWeeks => 28 * DAY,
            TimeWindow::OneYear => 365 * DAY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::OneMinute => "1 minute",
            TimeWindow::TenMinutes => "10 minutes",
            TimeWindow::OneHour => "1 hour",
            TimeWindow::OneDay => "1 day",
            TimeWindow::OneWeek => "1 week",
            TimeWindow::FourWeeks => "4 weeks",
            TimeWindow::OneYear => "1 year",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    /// Accepts the label (`"1 hour"`) or a short form (`1h`, `10m`, `4w`)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        if let Some(window) = TimeWindow::ALL.iter().find(|w| w.label() == wanted) {
            return Ok(*window);
        }
        match wanted.as_str() {
            "1m" => Ok(TimeWindow::OneMinute),
            "10m" => Ok(TimeWindow::TenMinutes),
            "1h" => Ok(TimeWindow::OneHour),
            "1d" => Ok(TimeWindow::OneDay),
            "1w" => Ok(TimeWindow::OneWeek),
            "4w" => Ok(TimeWindow::FourWeeks),
            "1y" => Ok(TimeWindow::OneYear),
            _ => Err(format!(
                "unknown time window '{}' (expected 1m, 10m, 1h, 1d, 1w, 4w or 1y)",
                s
            )),
        }
    }
}

/// Capture times at most a window apart.
///
/// The reference image must carry a time. An image without one matches only
/// when `include_missing` is set, and only as the second of the pair.
#[derive(Debug, Clone, Default)]
pub struct TimeCriterion {
    window: TimeWindow,
    include_missing: bool,
}

impl TimeCriterion {
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn set_window(&mut self, window: TimeWindow) {
        self.window = window;
    }

    pub fn include_missing(&self) -> bool {
        self.include_missing
    }

    pub fn set_include_missing(&mut self, include: bool) {
        self.include_missing = include;
    }
}

impl Criterion for TimeCriterion {
    type Params = (TimeWindow, bool);

    fn name(&self) -> &'static str {
        "closeintime"
    }

    fn label(&self) -> String {
        let missing = if self.include_missing {
            ", missing matches"
        } else {
            ""
        };
        format!("closeintime (within {}{})", self.window, missing)
    }

    fn params(&self) -> Self::Params {
        (self.window, self.include_missing)
    }

    fn prepare(&self, provider: &mut AttributeProvider) -> Result<()> {
        provider.ensure_exif();
        Ok(())
    }

    fn judge(&self, provider: &AttributeProvider, a: &Identity, b: &Identity) -> Judgement {
        let time_a = provider.capture_time(a);
        let time_b = provider.capture_time(b);
        match (time_a, time_b) {
            (CaptureTime::Missing, _) => Judgement::no_match(),
            (_, CaptureTime::Missing) => Judgement::from_bool(self.include_missing),
            _ => Judgement::from_bool(
                time_a
                    .seconds_between(&time_b)
                    .map_or(false, |gap| gap <= self.window.seconds()),
            ),
        }
    }

    fn is_symmetric(&self) -> bool {
        false
    }
}

/// Whether matching camera models mean "similar" or "dissimilar"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraSense {
    #[default]
    Same,
    Different,
}

impl FromStr for CameraSense {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "same" => Ok(CameraSense::Same),
            "different" => Ok(CameraSense::Different),
            _ => Err(format!("expected 'same' or 'different', got '{}'", s)),
        }
    }
}

impl fmt::Display for CameraSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSense::Same => f.write_str("Same"),
            CameraSense::Different => f.write_str("Different"),
        }
    }
}

/// Camera models compared for equality (or inequality).
///
/// The reference image must name a camera. With `include_missing`, an image
/// without a camera model matches as the second of the pair.
#[derive(Debug, Clone, Default)]
pub struct CameraCriterion {
    sense: CameraSense,
    include_missing: bool,
}

impl CameraCriterion {
    pub fn sense(&self) -> CameraSense {
        self.sense
    }

    pub fn set_sense(&mut self, sense: CameraSense) {
        self.sense = sense;
    }

    pub fn include_missing(&self) -> bool {
        self.include_missing
    }

    pub fn set_include_missing(&mut self, include: bool) {
        self.include_missing = include;
    }
}

impl Criterion for CameraCriterion {
    type Params = (CameraSense, bool);

    fn name(&self) -> &'static str {
        "cameramodel"
    }

    fn label(&self) -> String {
        let missing = if self.include_missing {
            ", missing matches"
        } else {
            ""
        };
        format!("cameramodel ({}{})", self.sense, missing)
    }

    fn params(&self) -> Self::Params {
        (self.sense, self.include_missing)
    }

    fn prepare(&self, provider: &mut AttributeProvider) -> Result<()> {
        provider.ensure_exif();
        Ok(())
    }

    fn judge(&self, provider: &AttributeProvider, a: &Identity, b: &Identity) -> Judgement {
        let model_a = provider.camera_model(a);
        let model_b = provider.camera_model(b);
        if model_a.is_empty() {
            return Judgement::no_match();
        }
        if self.include_missing && model_b.is_empty() {
            return Judgement::from_bool(true);
        }
        Judgement::from_bool((model_a == model_b) == (self.sense == CameraSense::Same))
    }

    fn is_symmetric(&self) -> bool {
        false
    }
}
