use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheSpecError, CacheSpecResult};

/// Spec used when a deployment enables caching without tuning it:
/// 128 MiB of cached content, dropped after five idle minutes.
pub const DEFAULT_CACHE_SPEC: &str = "maximumWeight=134217728,expireAfterAccess=5m";

const MAXIMUM_SIZE: &str = "maximumSize";
const MAXIMUM_WEIGHT: &str = "maximumWeight";
const EXPIRE_AFTER_ACCESS: &str = "expireAfterAccess";
const EXPIRE_AFTER_WRITE: &str = "expireAfterWrite";

/// Parsed cache configuration.
///
/// All bounds are optional; a spec with no bounds yields an unbounded cache
/// that never expires entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheSpec {
    /// Maximum number of entries.
    pub maximum_size: Option<u64>,
    /// Maximum total weight (bytes of cached content plus keys).
    pub maximum_weight: Option<u64>,
    /// Drop an entry this long after it was last read or written.
    pub expire_after_access: Option<Duration>,
    /// Drop an entry this long after it was written.
    pub expire_after_write: Option<Duration>,
}

impl CacheSpec {
    /// Parse a spec string.
    pub fn parse(spec: &str) -> CacheSpecResult<Self> {
        let mut parsed = CacheSpec::default();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| CacheSpecError::MalformedEntry(entry.to_string()))?;
            if key.is_empty() || value.is_empty() {
                return Err(CacheSpecError::MalformedEntry(entry.to_string()));
            }

            match key {
                MAXIMUM_SIZE => set_once(&mut parsed.maximum_size, key, parse_count(key, value)?)?,
                MAXIMUM_WEIGHT => {
                    set_once(&mut parsed.maximum_weight, key, parse_count(key, value)?)?
                }
                EXPIRE_AFTER_ACCESS => set_once(
                    &mut parsed.expire_after_access,
                    key,
                    parse_duration(key, value)?,
                )?,
                EXPIRE_AFTER_WRITE => set_once(
                    &mut parsed.expire_after_write,
                    key,
                    parse_duration(key, value)?,
                )?,
                other => return Err(CacheSpecError::UnknownKey(other.to_string())),
            }
        }

        if parsed.maximum_size.is_some() && parsed.maximum_weight.is_some() {
            return Err(CacheSpecError::Conflict(MAXIMUM_SIZE, MAXIMUM_WEIGHT));
        }
        Ok(parsed)
    }

    /// Parse an optional spec. `None` and blank strings disable caching.
    pub fn parse_optional(spec: Option<&str>) -> CacheSpecResult<Option<Self>> {
        match spec {
            Some(s) if !s.trim().is_empty() => Self::parse(s).map(Some),
            _ => Ok(None),
        }
    }

    /// Returns `true` if the spec bounds the cache by size or weight.
    pub fn is_bounded(&self) -> bool {
        self.maximum_size.is_some() || self.maximum_weight.is_some()
    }
}

impl FromStr for CacheSpec {
    type Err = CacheSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CacheSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(n) = self.maximum_size {
            parts.push(format!("{MAXIMUM_SIZE}={n}"));
        }
        if let Some(n) = self.maximum_weight {
            parts.push(format!("{MAXIMUM_WEIGHT}={n}"));
        }
        if let Some(d) = self.expire_after_access {
            parts.push(format!("{EXPIRE_AFTER_ACCESS}={}", format_duration(d)));
        }
        if let Some(d) = self.expire_after_write {
            parts.push(format!("{EXPIRE_AFTER_WRITE}={}", format_duration(d)));
        }
        write!(f, "{}", parts.join(","))
    }
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> CacheSpecResult<()> {
    if slot.is_some() {
        return Err(CacheSpecError::DuplicateKey(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_count(key: &str, value: &str) -> CacheSpecResult<u64> {
    value.parse::<u64>().map_err(|e| CacheSpecError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_duration(key: &str, value: &str) -> CacheSpecResult<Duration> {
    let invalid = |reason: &str| CacheSpecError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| invalid("missing time unit (ms, s, m, h, d)"))?;
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| invalid("missing amount"))?;

    let millis_per_unit: u64 = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => return Err(invalid("unknown time unit")),
    };
    let millis = amount
        .checked_mul(millis_per_unit)
        .ok_or_else(|| invalid("duration overflows"))?;
    Ok(Duration::from_millis(millis))
}

fn format_duration(d: Duration) -> String {
    let millis = d.as_millis() as u64;
    for (unit, per) in [("d", 86_400_000), ("h", 3_600_000), ("m", 60_000), ("s", 1_000)] {
        if millis != 0 && millis % per == 0 {
            return format!("{}{unit}", millis / per);
        }
    }
    format!("{millis}ms")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_default_spec() {
        let spec = CacheSpec::parse(DEFAULT_CACHE_SPEC).unwrap();
        assert_eq!(spec.maximum_weight, Some(134_217_728));
        assert_eq!(spec.expire_after_access, Some(Duration::from_secs(300)));
        assert_eq!(spec.maximum_size, None);
        assert!(spec.is_bounded());
    }

    #[test]
    fn parse_all_units() {
        let spec = CacheSpec::parse("expireAfterAccess=250ms,expireAfterWrite=2d").unwrap();
        assert_eq!(spec.expire_after_access, Some(Duration::from_millis(250)));
        assert_eq!(spec.expire_after_write, Some(Duration::from_secs(2 * 86_400)));
        assert!(!spec.is_bounded());
    }

    #[test]
    fn tolerates_whitespace() {
        let spec = CacheSpec::parse(" maximumSize = 10 , expireAfterWrite=1h ").unwrap();
        assert_eq!(spec.maximum_size, Some(10));
        assert_eq!(spec.expire_after_write, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn reject_unknown_key() {
        assert_eq!(
            CacheSpec::parse("softValues=true"),
            Err(CacheSpecError::UnknownKey("softValues".into()))
        );
    }

    #[test]
    fn reject_duplicate_key() {
        assert_eq!(
            CacheSpec::parse("maximumSize=1,maximumSize=2"),
            Err(CacheSpecError::DuplicateKey("maximumSize".into()))
        );
    }

    #[test]
    fn reject_size_and_weight_together() {
        assert!(matches!(
            CacheSpec::parse("maximumSize=1,maximumWeight=2"),
            Err(CacheSpecError::Conflict(..))
        ));
    }

    #[test]
    fn reject_malformed_entries() {
        assert!(matches!(
            CacheSpec::parse("maximumSize"),
            Err(CacheSpecError::MalformedEntry(_))
        ));
        assert!(matches!(
            CacheSpec::parse("maximumSize="),
            Err(CacheSpecError::MalformedEntry(_))
        ));
    }

    #[test]
    fn reject_bad_values() {
        assert!(CacheSpec::parse("maximumSize=-1").is_err());
        assert!(CacheSpec::parse("expireAfterAccess=5").is_err());
        assert!(CacheSpec::parse("expireAfterAccess=5w").is_err());
        assert!(CacheSpec::parse("expireAfterAccess=m").is_err());
    }

    #[test]
    fn optional_blank_disables_caching() {
        assert_eq!(CacheSpec::parse_optional(None).unwrap(), None);
        assert_eq!(CacheSpec::parse_optional(Some("  ")).unwrap(), None);
        assert!(CacheSpec::parse_optional(Some("maximumSize=5")).unwrap().is_some());
    }

    #[test]
    fn display_is_canonical() {
        let spec = CacheSpec::parse("expireAfterAccess=300s,maximumWeight=1024").unwrap();
        assert_eq!(spec.to_string(), "maximumWeight=1024,expireAfterAccess=5m");
    }

    proptest! {
        #[test]
        fn display_parses_back(
            size in proptest::option::of(0u64..1_000_000),
            access_ms in proptest::option::of(0u64..10_000_000),
            write_ms in proptest::option::of(0u64..10_000_000),
        ) {
            let spec = CacheSpec {
                maximum_size: size,
                maximum_weight: None,
                expire_after_access: access_ms.map(Duration::from_millis),
                expire_after_write: write_ms.map(Duration::from_millis),
            };
            prop_assert_eq!(CacheSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }
}
