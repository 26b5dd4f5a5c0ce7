use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Elapsed time kept as a single count of seconds.
///
/// Hours/minutes/seconds only exist at the edges: parsing a duration label,
/// rendering, and the `{hours, minutes, seconds}` shape records are stored in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Hms", into = "Hms")]
pub struct TimeSpan {
    secs: u64,
}

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan { secs: 0 };

    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    pub fn from_hms(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            secs: hours
                .saturating_mul(3600)
                .saturating_add(minutes.saturating_mul(60))
                .saturating_add(seconds),
        }
    }

    /// Parses a `MM:SS` or `HH:MM:SS` label. Anything else is zero.
    pub fn parse(text: &str) -> Self {
        let fields: Option<Vec<u64>> = text
            .trim()
            .split(':')
            .map(|field| field.trim().parse::<u64>().ok())
            .collect();

        match fields.as_deref() {
            Some([minutes, seconds]) => Self::from_hms(0, *minutes, *seconds),
            Some([hours, minutes, seconds]) => Self::from_hms(*hours, *minutes, *seconds),
            _ => Self::ZERO,
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.secs
    }

    pub fn hours(&self) -> u64 {
        self.secs / 3600
    }

    pub fn minutes(&self) -> u64 {
        (self.secs % 3600) / 60
    }

    pub fn seconds(&self) -> u64 {
        self.secs % 60
    }

    pub fn is_zero(&self) -> bool {
        self.secs == 0
    }

    /// Subtracts `other`, stopping at zero instead of going negative.
    pub fn saturating_sub(self, other: TimeSpan) -> TimeSpan {
        TimeSpan {
            secs: self.secs.saturating_sub(other.secs),
        }
    }

    /// Share of `total` covered by `self`, rounded to the nearest percent.
    pub fn percent_of(&self, total: TimeSpan) -> u8 {
        if total.secs == 0 {
            return 0;
        }
        let watched = self.secs.min(total.secs) as u128;
        let total = total.secs as u128;
        ((watched * 100 + total / 2) / total) as u8
    }

    /// `"{h}h {m}m"`, used where seconds would only add noise.
    pub fn short_display(&self) -> String {
        format!("{}h {}m", self.hours(), self.minutes())
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours(), self.minutes(), self.seconds())
    }
}

impl Add for TimeSpan {
    type Output = TimeSpan;

    fn add(self, rhs: TimeSpan) -> TimeSpan {
        TimeSpan {
            secs: self.secs.saturating_add(rhs.secs),
        }
    }
}

impl AddAssign for TimeSpan {
    fn add_assign(&mut self, rhs: TimeSpan) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TimeSpan {
    fn sum<I: Iterator<Item = TimeSpan>>(iter: I) -> Self {
        iter.fold(TimeSpan::ZERO, |acc, span| acc + span)
    }
}

impl From<std::time::Duration> for TimeSpan {
    fn from(value: std::time::Duration) -> Self {
        TimeSpan::from_secs(value.as_secs())
    }
}

/// Stored representation. Older records may carry unnormalized or negative
/// fields, so they are read as signed and clamped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Hms {
    #[serde(default)]
    hours: i64,
    #[serde(default)]
    minutes: i64,
    #[serde(default)]
    seconds: i64,
}

impl From<Hms> for TimeSpan {
    fn from(value: Hms) -> Self {
        let total = value
            .hours
            .saturating_mul(3600)
            .saturating_add(value.minutes.saturating_mul(60))
            .saturating_add(value.seconds);
        TimeSpan::from_secs(total.max(0) as u64)
    }
}

impl From<TimeSpan> for Hms {
    fn from(value: TimeSpan) -> Self {
        Hms {
            hours: value.hours() as i64,
            minutes: value.minutes() as i64,
            seconds: value.seconds() as i64,
        }
    }
}
