use crate::{
    error::LedgerError,
    request::{Operation, Outcome},
};

pub mod in_memory_ledger;

/// Executes one operation to completion. Shared by every dispatcher worker,
/// so implementations synchronize internally.
pub trait RequestProcessor: Send + Sync {
    fn process(&self, operation: Operation) -> Result<Outcome, LedgerError>;
}
