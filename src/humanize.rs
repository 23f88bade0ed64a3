//! Human-readable size and duration parsing for configuration values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

/// Splits `"15s"` into `(15, "s")`. A bare number yields an empty unit.
fn split_number(s: &str) -> Result<(u64, &str), ParseError> {
    let pos = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if pos == 0 {
        return Err(ParseError::InvalidFormat(s.to_string()));
    }
    let num = s[..pos].parse::<u64>()?;
    Ok((num, s[pos..].trim()))
}

/// Byte size wrapper with human-readable parsing ("64KB", "5MB")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();
        let (num, unit) = split_number(&s)?;

        let multiplier: u64 = match unit {
            "" | "B" => 1,
            "K" | "KB" | "KIB" => 1024,
            "M" | "MB" | "MIB" => 1024 * 1024,
            "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        num.checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ParseError::InvalidFormat(s.clone()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[(&str, u64)] = &[("GB", 1024 * 1024 * 1024), ("MB", 1024 * 1024), ("KB", 1024)];

        for &(unit, divisor) in UNITS {
            if self.0 >= divisor && self.0 % divisor == 0 {
                return write!(f, "{}{}", self.0 / divisor, unit);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(UnitVisitor::<ByteSize>::new("a byte size such as \"64KB\" or an integer"))
    }
}

/// Duration wrapper accepting "500ms", "1s", "15s", "2m", "1h".
///
/// Bare integers are read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_secs(secs: u64) -> Self {
        HumanDuration(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        HumanDuration(Duration::from_millis(millis))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (num, unit) = split_number(&s)?;

        let overflow = || ParseError::InvalidFormat(s.clone());
        let duration = match unit {
            "ms" => Duration::from_millis(num),
            "" | "s" => Duration::from_secs(num),
            "m" => Duration::from_secs(num.checked_mul(60).ok_or_else(overflow)?),
            "h" => Duration::from_secs(num.checked_mul(3600).ok_or_else(overflow)?),
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        Ok(HumanDuration(duration))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1000 != 0 {
            write!(f, "{}ms", millis)
        } else {
            write!(f, "{}s", self.0.as_secs())
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(UnitVisitor::<HumanDuration>::new("a duration such as \"15s\" or an integer"))
    }
}

/// Shared visitor for values that come either as unit strings or plain integers.
struct UnitVisitor<T> {
    expecting: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T> UnitVisitor<T> {
    fn new(expecting: &'static str) -> Self {
        Self {
            expecting,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'de, T> serde::de::Visitor<'de> for UnitVisitor<T>
where
    T: FromStr<Err = ParseError>,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.expecting)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.to_string().parse::<T>().map_err(serde::de::Error::custom)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let v = u64::try_from(v).map_err(|_| serde::de::Error::custom("value must not be negative"))?;
        self.visit_u64(v)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<T>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bytes() {
        assert_eq!("1024".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("1KB".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("64k".parse::<ByteSize>().unwrap().as_u64(), 64 * 1024);
        assert_eq!("5MiB".parse::<ByteSize>().unwrap().as_u64(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_parse_bytes_invalid() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("MB".parse::<ByteSize>().is_err());
        assert!("5XB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_byte_size_display() {
        assert_eq!(ByteSize(64 * 1024).to_string(), "64KB");
        assert_eq!(ByteSize(5 * 1024 * 1024).to_string(), "5MB");
        assert_eq!(ByteSize(1500).to_string(), "1500B");
    }

    #[test]
    fn test_parse_durations() {
        assert_eq!("1s".parse::<HumanDuration>().unwrap().as_duration(), Duration::from_secs(1));
        assert_eq!("15".parse::<HumanDuration>().unwrap().as_duration(), Duration::from_secs(15));
        assert_eq!("250ms".parse::<HumanDuration>().unwrap().as_duration(), Duration::from_millis(250));
        assert_eq!("2m".parse::<HumanDuration>().unwrap().as_duration(), Duration::from_secs(120));
        assert_eq!("1H".parse::<HumanDuration>().unwrap().as_duration(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_invalid_unit() {
        let err = "10d".parse::<HumanDuration>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidUnit(unit) if unit == "d"));
    }

    #[test]
    fn test_parse_overflow_is_an_error() {
        let err = "9999999999999999h".parse::<HumanDuration>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
        assert!("99999999999999999m".parse::<HumanDuration>().is_err());

        let err = "99999999999GB".parse::<ByteSize>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(HumanDuration::from_secs(15).to_string(), "15s");
        assert_eq!(HumanDuration::from_millis(1500).to_string(), "1500ms");
    }

    #[test]
    fn test_deserialize_string_and_number() {
        #[derive(Deserialize)]
        struct Limits {
            size: ByteSize,
            every: HumanDuration,
        }

        let parsed: Limits = serde_json::from_str(r#"{"size": "10MB", "every": "500ms"}"#).unwrap();
        assert_eq!(parsed.size.as_u64(), 10 * 1024 * 1024);
        assert_eq!(parsed.every.as_duration(), Duration::from_millis(500));

        let parsed: Limits = serde_json::from_str(r#"{"size": 1024, "every": 3}"#).unwrap();
        assert_eq!(parsed.size.as_u64(), 1024);
        assert_eq!(parsed.every.as_duration(), Duration::from_secs(3));
    }
}
