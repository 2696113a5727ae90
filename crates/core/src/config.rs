use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::key::KeyDeriver;

/// How long an InProgress record blocks duplicates if its owner never
/// completes or aborts.
pub const DEFAULT_IN_PROGRESS_TTL: Duration = Duration::from_secs(300);

/// How long a Completed record keeps serving its cached result.
pub const DEFAULT_COMPLETED_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Coordinator configuration.
///
/// `in_progress_ttl` must cover realistic use case execution time but stay
/// short enough to bound how long a crashed attempt blocks retries.
/// Complete replaces the expiration with `now + completed_ttl`, so cached
/// results are retained independently of the in-progress window.
///
/// Both TTLs must be non-zero; see [`IdempotencyConfig::validate`].
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    pub in_progress_ttl: Duration,
    pub completed_ttl: Duration,
    pub key_deriver: KeyDeriver,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            in_progress_ttl: DEFAULT_IN_PROGRESS_TTL,
            completed_ttl: DEFAULT_COMPLETED_TTL,
            key_deriver: KeyDeriver::default(),
        }
    }
}

impl IdempotencyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_in_progress_ttl(mut self, ttl: Duration) -> Self {
        self.in_progress_ttl = ttl;
        self
    }

    pub fn with_completed_ttl(mut self, ttl: Duration) -> Self {
        self.completed_ttl = ttl;
        self
    }

    pub fn with_key_deriver(mut self, key_deriver: KeyDeriver) -> Self {
        self.key_deriver = key_deriver;
        self
    }

    /// Reject TTLs under which a fresh record is already expired: a zero
    /// in-progress TTL admits every duplicate Begin, a zero completed TTL
    /// reruns finished use cases.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.in_progress_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl {
                field: "in_progress_ttl",
            });
        }
        if self.completed_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl {
                field: "completed_ttl",
            });
        }
        Ok(())
    }
}

/// TTL settings as they appear in configuration files, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlSettings {
    pub in_progress_secs: u64,
    pub completed_secs: u64,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            in_progress_secs: DEFAULT_IN_PROGRESS_TTL.as_secs(),
            completed_secs: DEFAULT_COMPLETED_TTL.as_secs(),
        }
    }
}

impl TryFrom<TtlSettings> for IdempotencyConfig {
    type Error = ConfigError;

    fn try_from(ttl: TtlSettings) -> Result<Self, Self::Error> {
        let config = IdempotencyConfig::default()
            .with_in_progress_ttl(Duration::from_secs(ttl.in_progress_secs))
            .with_completed_ttl(Duration::from_secs(ttl.completed_secs));
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ttl_settings_fall_back_to_defaults() {
        let ttl: TtlSettings = serde_json::from_str(r#"{"in_progress_secs": 10}"#).unwrap();
        assert_eq!(ttl.in_progress_secs, 10);
        assert_eq!(ttl.completed_secs, 86_400);

        let config = IdempotencyConfig::try_from(ttl).unwrap();
        assert_eq!(config.in_progress_ttl, Duration::from_secs(10));
        assert_eq!(config.completed_ttl, DEFAULT_COMPLETED_TTL);
    }

    #[test]
    fn zero_in_progress_ttl_is_rejected() {
        let ttl = TtlSettings {
            in_progress_secs: 0,
            ..TtlSettings::default()
        };
        assert_eq!(
            IdempotencyConfig::try_from(ttl).unwrap_err(),
            ConfigError::ZeroTtl {
                field: "in_progress_ttl"
            }
        );
    }

    #[test]
    fn zero_completed_ttl_is_rejected() {
        let ttl = TtlSettings {
            completed_secs: 0,
            ..TtlSettings::default()
        };
        assert_eq!(
            IdempotencyConfig::try_from(ttl).unwrap_err(),
            ConfigError::ZeroTtl {
                field: "completed_ttl"
            }
        );
    }

    #[test]
    fn builder_zero_ttl_fails_validation() {
        let config = IdempotencyConfig::new().with_in_progress_ttl(Duration::ZERO);
        assert!(config.validate().is_err());
        assert!(IdempotencyConfig::default().validate().is_ok());
    }
}
