use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Granularity used when turning an elapsed interval into billable hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursRounding {
    #[default]
    HalfHour,
    WholeHour,
}

impl HoursRounding {
    /// Rounds half away from zero to the nearest step.
    pub fn round(self, hours: f64) -> f64 {
        match self {
            HoursRounding::HalfHour => (hours * 2.0).round() / 2.0,
            HoursRounding::WholeHour => hours.round(),
        }
    }
}

impl FromStr for HoursRounding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "half_hour" | "half-hour" | "0.5" => Ok(HoursRounding::HalfHour),
            "whole_hour" | "whole-hour" | "hour" | "1" => Ok(HoursRounding::WholeHour),
            other => anyhow::bail!("unknown hours rounding policy {other:?}"),
        }
    }
}

/// Hours between `start` and `end`, rounded per `policy`. An `end` before
/// `start` counts as zero.
pub fn hours_worked(start: OffsetDateTime, end: OffsetDateTime, policy: HoursRounding) -> f64 {
    let elapsed = (end - start).as_seconds_f64().max(0.0);
    policy.round(elapsed / 3600.0)
}
