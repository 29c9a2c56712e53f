use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// First second of 2015, the epoch Discord ids count from.
pub const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// Discord's unique id: 42 bits of milliseconds since [`DISCORD_EPOCH`],
/// 5 bits worker, 5 bits process and a 12 bit increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn timestamp(self) -> DateTime<Utc> {
        let millis = (self.0 >> 22) + DISCORD_EPOCH;
        Utc.timestamp_millis_opt(millis as i64)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn worker_id(self) -> u64 {
        (self.0 & 0x3E0000) >> 17
    }

    pub fn process_id(self) -> u64 {
        (self.0 & 0x1F000) >> 12
    }

    pub fn increment(self) -> u64 {
        self.0 & 0xFFF
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Snowflake)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a string or integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Snowflake, E> {
        Ok(Snowflake(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Snowflake, E> {
        u64::try_from(v)
            .map(Snowflake)
            .map_err(|_| E::custom(format!("negative snowflake: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Snowflake, E> {
        v.parse().map_err(|_| E::custom(format!("invalid snowflake: {}", v)))
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_parts() {
        // Example id from Discord's reference documentation
        let id = Snowflake(175928847299117063);

        assert_eq!(id.timestamp().timestamp_millis(), 1462015105796);
        assert_eq!(id.worker_id(), 1);
        assert_eq!(id.process_id(), 0);
        assert_eq!(id.increment(), 7);
    }

    #[test]
    fn test_snowflake_serde() {
        let from_str: Snowflake = serde_json::from_str("\"175928847299117063\"").unwrap();
        let from_int: Snowflake = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(from_str, from_int);

        let out = serde_json::to_string(&from_str).unwrap();
        assert_eq!(out, "\"175928847299117063\"");

        assert!(serde_json::from_str::<Snowflake>("\"abc\"").is_err());
    }

    #[test]
    fn test_snowflake_from_str() {
        assert_eq!("42".parse::<Snowflake>().unwrap(), Snowflake(42));
        assert!("not-a-guild".parse::<Snowflake>().is_err());
    }
}
