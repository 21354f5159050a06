//! Error types for the table, the counter configuration and record parsing.

use thiserror::Error;

/// Errors raised by [`ChainedHashMap`](crate::ChainedHashMap) and its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// A table needs at least one bucket.
    #[error("modulus must be greater than zero")]
    ZeroModulus,
    /// The map was mutated after the cursor was positioned.
    #[error("cursor is stale: the map was modified during iteration")]
    StaleCursor,
}

/// Invalid watermark or table sizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("high watermark must be greater than zero")]
    ZeroHighWatermark,
    #[error("low watermark ({low}) must not exceed the high watermark ({high})")]
    LowAboveHigh { low: usize, high: usize },
    #[error(transparent)]
    Map(#[from] MapError),
}

/// A single input line could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record has no key")]
    MissingKey,
    #[error("invalid count {token:?}: expected an unsigned 64-bit decimal")]
    InvalidCount { token: String },
}

/// Umbrella error for [`run`](crate::driver::run).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("line {line}: {source}")]
    Record { line: u64, source: RecordError },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let e = ConfigError::LowAboveHigh { low: 5, high: 3 };
        assert!(e.to_string().contains("(5)"));
        assert!(e.to_string().contains("(3)"));

        let e = Error::Record {
            line: 7,
            source: RecordError::InvalidCount {
                token: "x1".to_string(),
            },
        };
        let msg = e.to_string();
        assert!(msg.starts_with("line 7: "), "{msg}");
        assert!(msg.contains("\"x1\""), "{msg}");
    }

    #[test]
    fn map_error_lifts_into_config_error() {
        let e: ConfigError = MapError::ZeroModulus.into();
        assert_eq!(e, ConfigError::Map(MapError::ZeroModulus));
        assert_eq!(e.to_string(), "modulus must be greater than zero");
    }
}
