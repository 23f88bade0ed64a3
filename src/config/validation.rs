use super::models::Config;
use crate::humanize::ByteSize;
use thiserror::Error;

const MAX_PAYLOAD_LIMIT: ByteSize = ByteSize(5 * 1024 * 1024);
const MAX_BATCH_SIZE: usize = 10_000;
const MAX_SNAPSHOT_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("max_payload_bytes ({actual}) exceeds limit of {limit}")]
    PayloadLimitTooLarge { actual: ByteSize, limit: ByteSize },

    #[error("snapshot_limit must be between 1 and {max}, got {value}")]
    InvalidSnapshotLimit { value: usize, max: usize },

    #[error("store pool_size must be positive")]
    InvalidPoolSize,

    #[error("Stream interval must be positive: {field}")]
    ZeroInterval { field: &'static str },

    #[error("stream batch_size must be between 1 and {max}, got {value}")]
    InvalidBatchSize { value: usize, max: usize },

    #[error("stream {field} must be positive")]
    ZeroStreamLimit { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_store(config)?;
    validate_stream(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.api_key.is_empty() {
        return Err(ValidationError::EmptyApiKey);
    }

    let payload = config.server.api.max_payload_bytes;
    if payload > MAX_PAYLOAD_LIMIT {
        return Err(ValidationError::PayloadLimitTooLarge {
            actual: payload,
            limit: MAX_PAYLOAD_LIMIT,
        });
    }

    let snapshot_limit = config.server.api.snapshot_limit;
    if !(1..=MAX_SNAPSHOT_LIMIT).contains(&snapshot_limit) {
        return Err(ValidationError::InvalidSnapshotLimit {
            value: snapshot_limit,
            max: MAX_SNAPSHOT_LIMIT,
        });
    }

    Ok(())
}

fn validate_store(config: &Config) -> Result<(), ValidationError> {
    if config.store.pool_size == 0 {
        return Err(ValidationError::InvalidPoolSize);
    }
    Ok(())
}

fn validate_stream(config: &Config) -> Result<(), ValidationError> {
    let stream = &config.stream;

    if stream.poll_interval.is_zero() {
        return Err(ValidationError::ZeroInterval {
            field: "poll_interval",
        });
    }
    if stream.heartbeat_interval.is_zero() {
        return Err(ValidationError::ZeroInterval {
            field: "heartbeat_interval",
        });
    }
    if stream.max_lifetime.is_some_and(|d| d.is_zero()) {
        return Err(ValidationError::ZeroInterval {
            field: "max_lifetime",
        });
    }

    if !(1..=MAX_BATCH_SIZE).contains(&stream.batch_size) {
        return Err(ValidationError::InvalidBatchSize {
            value: stream.batch_size,
            max: MAX_BATCH_SIZE,
        });
    }

    if stream.max_connections == 0 {
        return Err(ValidationError::ZeroStreamLimit {
            field: "max_connections",
        });
    }
    if stream.max_consecutive_failures == 0 {
        return Err(ValidationError::ZeroStreamLimit {
            field: "max_consecutive_failures",
        });
    }
    if stream.channel_capacity == 0 {
        return Err(ValidationError::ZeroStreamLimit {
            field: "channel_capacity",
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_api_key() {
        let mut config = Config::default();
        config.server.api_key.clear();

        assert!(matches!(validate(&config), Err(ValidationError::EmptyApiKey)));
    }

    #[test]
    fn test_payload_limit() {
        let mut config = Config::default();
        config.server.api.max_payload_bytes = ByteSize(10 * 1024 * 1024);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::PayloadLimitTooLarge { .. })
        ));
    }

    #[test]
    fn test_snapshot_limit_bounds() {
        let mut config = Config::default();
        config.server.api.snapshot_limit = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidSnapshotLimit { value: 0, .. })
        ));

        config.server.api.snapshot_limit = 1001;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = Config::default();
        config.stream.poll_interval = HumanDuration::from_millis(0);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroInterval {
                field: "poll_interval"
            })
        ));
    }

    #[test]
    fn test_zero_max_lifetime() {
        let mut config = Config::default();
        config.stream.max_lifetime = Some(HumanDuration::from_secs(0));

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroInterval {
                field: "max_lifetime"
            })
        ));
    }

    #[test]
    fn test_batch_size_bounds() {
        let mut config = Config::default();
        config.stream.batch_size = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBatchSize { value: 0, .. })
        ));

        config.stream.batch_size = 10_001;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_connection_cap() {
        let mut config = Config::default();
        config.stream.max_connections = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroStreamLimit {
                field: "max_connections"
            })
        ));
    }
}
