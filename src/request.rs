use serde::Serialize;

use crate::{
    account::AccountId,
    error::{ErrorKind, LedgerError},
};

/// Opaque token that routes a response back to whoever submitted the request.
pub type CorrelationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Deposit,
    Withdraw,
    View,
    Transfer,
    Delete,
    ChangePin,
}

/// Typed account mutation. Pins travel as raw strings and are checked by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create {
        pin: String,
    },
    Deposit {
        id: AccountId,
        amount: i64,
        pin: String,
    },
    Withdraw {
        id: AccountId,
        amount: i64,
        pin: String,
    },
    View {
        id: AccountId,
        pin: String,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: i64,
        pin: String,
    },
    Delete {
        id: AccountId,
        pin: String,
    },
    ChangePin {
        id: AccountId,
        pin: String,
        new_pin: String,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create { .. } => OperationKind::Create,
            Operation::Deposit { .. } => OperationKind::Deposit,
            Operation::Withdraw { .. } => OperationKind::Withdraw,
            Operation::View { .. } => OperationKind::View,
            Operation::Transfer { .. } => OperationKind::Transfer,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::ChangePin { .. } => OperationKind::ChangePin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub correlation_id: CorrelationId,
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created {
        id: AccountId,
    },
    /// Balance after a deposit or withdrawal, or the viewed balance.
    Balance {
        id: AccountId,
        balance: i64,
    },
    Transferred {
        from: AccountId,
        to: AccountId,
        from_balance: i64,
        to_balance: i64,
    },
    Deleted {
        id: AccountId,
    },
    PinChanged {
        id: AccountId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok(Outcome),
    Err { kind: ErrorKind, message: String },
}

impl Response {
    pub fn unavailable() -> Self {
        Response::Err {
            kind: ErrorKind::Unavailable,
            message: "Ledger is shutting down, request was not processed".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Response::Ok(_) => None,
            Response::Err { kind, .. } => Some(*kind),
        }
    }
}

impl From<LedgerError> for Response {
    fn from(err: LedgerError) -> Self {
        Response::Err {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Result<Outcome, LedgerError>> for Response {
    fn from(result: Result<Outcome, LedgerError>) -> Self {
        match result {
            Ok(outcome) => Response::Ok(outcome),
            Err(err) => err.into(),
        }
    }
}
