use thiserror::Error;

/// Matches the account table size of the legacy server.
pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_WORKERS: usize = 4;
/// Account slots are allocated up front, so the table size is capped.
pub const MAX_CAPACITY: usize = 1 << 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Capacity must allow at least one account")]
    ZeroCapacity,
    #[error("Capacity {requested} exceeds the limit of {limit} accounts")]
    CapacityTooLarge { requested: usize, limit: usize },
    #[error("Worker pool needs at least one worker")]
    ZeroWorkers,
}

/// Startup parameters, fixed for the lifetime of a ledger.
///
/// `capacity` is reserved in full when the ledger starts, hence [`MAX_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub capacity: usize,
    pub workers: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl LedgerConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                requested: self.capacity,
                limit: MAX_CAPACITY,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(self)
    }
}
