//! Configuration for replication and response caching.
//!
//! Durations are written in milliseconds in configuration files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for replicator behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicatorConfig {
    /// Maximum transfers in flight, per call and across all calls sharing
    /// one replicator. Zero is treated as one.
    pub max_concurrency: usize,
    /// Timeout applied to every single transport request.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    /// On fetch, count dependencies already held locally as stored instead
    /// of requesting them again.
    pub skip_present: bool,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            request_timeout: Duration::from_secs(30),
            skip_present: false,
        }
    }
}

/// Configuration for [`CachedTransport`](crate::CachedTransport).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a fetched asset stays valid. Zero, the default, disables
    /// caching.
    #[serde(with = "duration_ms")]
    pub ttl: Duration,
}

/// (De)serialize a [`Duration`] as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: ReplicatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReplicatorConfig::default());

        let cache: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cache.ttl, Duration::ZERO);

        let cache: CacheConfig = serde_json::from_str(r#"{"ttl": 30000}"#).unwrap();
        assert_eq!(cache.ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_durations_in_millis() {
        let config: ReplicatorConfig = serde_json::from_str(
            r#"{"max_concurrency": 2, "request_timeout": 1500, "skip_present": true}"#,
        )
        .unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert!(config.skip_present);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request_timeout"], 1500);
    }
}
