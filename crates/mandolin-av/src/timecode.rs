//! Timecodes as written in config files and passed to ffmpeg.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A point in, or a length of, a media file.
///
/// Parses from `"HH:MM:SS.mmm"`, `"MM:SS"`, `"SS"`, a number of seconds,
/// or a table of `hours`, `minutes`, `seconds` and `milliseconds`.
///
/// # Example
///
/// ```
/// use mandolin_av::Timecode;
/// use std::time::Duration;
///
/// let tc: Timecode = "01:02:03.5".parse()?;
/// assert_eq!(tc.as_duration(), Duration::from_millis(3_723_500));
/// assert_eq!(tc.to_string(), "01:02:03.500");
/// # Ok::<(), mandolin_av::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode(Duration);

impl Timecode {
    pub const ZERO: Timecode = Timecode(Duration::ZERO);

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl From<Duration> for Timecode {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<Timecode> for Duration {
    fn from(tc: Timecode) -> Self {
        tc.0
    }
}

/// Format a duration the way ffmpeg expects it: `hh:mm:ss.SSS`.
///
/// Sub-millisecond remainders are rounded to the nearest millisecond.
pub fn format_timecode(d: Duration) -> String {
    let total_ms = (d.as_nanos() + 500_000) / 1_000_000;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_timecode(self.0))
    }
}

impl FromStr for Timecode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid timecode: {:?}", s));

        let s = s.trim();
        if s.is_empty() {
            return Err(invalid());
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }

        let (whole, fraction) = match parts[parts.len() - 1].split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (parts[parts.len() - 1], None),
        };

        let mut secs: u64 = 0;
        for field in parts[..parts.len() - 1].iter().chain(std::iter::once(&whole)) {
            let value: u64 = field.parse().map_err(|_| invalid())?;
            secs = secs
                .checked_mul(60)
                .and_then(|s| s.checked_add(value))
                .ok_or_else(invalid)?;
        }

        let nanos = match fraction {
            Some(f) => parse_fraction(f).ok_or_else(invalid)?,
            None => 0,
        };

        Ok(Self(Duration::new(secs, nanos)))
    }
}

/// Decimal fraction of a second to nanoseconds: `"5"` is 500ms, `"04"` is 40ms.
pub(crate) fn parse_fraction(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimecodeRepr {
    Text(String),
    Seconds(f64),
    Parts {
        #[serde(default)]
        hours: u64,
        #[serde(default)]
        minutes: u64,
        #[serde(default)]
        seconds: f64,
        #[serde(default)]
        milliseconds: u64,
    },
}

impl<'de> Deserialize<'de> for Timecode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error as _;

        match TimecodeRepr::deserialize(deserializer)? {
            TimecodeRepr::Text(s) => s.parse().map_err(D::Error::custom),
            TimecodeRepr::Seconds(secs) => seconds_to_duration(secs)
                .map(Self)
                .ok_or_else(|| D::Error::custom(format!("invalid timecode: {}", secs))),
            TimecodeRepr::Parts {
                hours,
                minutes,
                seconds,
                milliseconds,
            } => {
                let secs = seconds_to_duration(seconds)
                    .ok_or_else(|| D::Error::custom(format!("invalid seconds: {}", seconds)))?;
                hours
                    .checked_mul(3600)
                    .zip(minutes.checked_mul(60))
                    .and_then(|(h, m)| h.checked_add(m))
                    .map(Duration::from_secs)
                    .and_then(|d| d.checked_add(secs))
                    .and_then(|d| d.checked_add(Duration::from_millis(milliseconds)))
                    .map(Self)
                    .ok_or_else(|| D::Error::custom("timecode out of range"))
            }
        }
    }
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

impl Serialize for Timecode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
