use serde::Serialize;
use thiserror::Error;

use crate::account::AccountId;

/// Structural problems with a request, detected before any lock is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be positive, got {amount}")]
    NonPositiveAmount { amount: i64 },
    #[error("Pin must be exactly 4 digits")]
    MalformedPin,
    #[error("Cannot transfer from account {id} to itself")]
    SelfTransfer { id: AccountId },
    #[error("Depositing {amount} would overflow the balance of account {id}")]
    BalanceOverflow { id: AccountId, amount: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Account {id} does not exist")]
    NotFound { id: AccountId },
    #[error("Account {id} is closed")]
    InactiveAccount { id: AccountId },
    #[error("Pin does not match account {id}")]
    Unauthorized { id: AccountId },
    #[error("Insufficient funds in account {id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        id: AccountId,
        balance: i64,
        requested: i64,
    },
    #[error("Account table is full ({capacity} accounts)")]
    CapacityExceeded { capacity: usize },
}

/// Flat error classification carried by an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InactiveAccount,
    Auth,
    InsufficientFunds,
    CapacityExceeded,
    /// The request reached a dispatcher that is shutting down.
    Unavailable,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::InactiveAccount { .. } => ErrorKind::InactiveAccount,
            LedgerError::Unauthorized { .. } => ErrorKind::Auth,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
        }
    }
}
