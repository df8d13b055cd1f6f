use parking_lot::MutexGuard;
use tracing::{debug, info};

use crate::{
    account::{Account, AccountId, AccountState, Pin, authorize},
    error::{LedgerError, ValidationError},
    request::{Operation, Outcome},
    store::{AccountSnapshot, AccountStore},
};

use super::RequestProcessor;

fn ensure_positive(amount: i64) -> Result<(), ValidationError> {
    if amount > 0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveAmount { amount })
    }
}

fn ensure_authorized(state: &AccountState, id: AccountId, pin: &str) -> Result<(), LedgerError> {
    if authorize(state, pin) {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized { id })
    }
}

/// Both record locks of a transfer, taken lower id first.
///
/// Fields drop in declaration order, so `higher` is released before `lower`.
struct TransferLocks<'a> {
    higher: MutexGuard<'a, AccountState>,
    lower: MutexGuard<'a, AccountState>,
    source_is_lower: bool,
}

impl<'a> TransferLocks<'a> {
    fn acquire(source: &'a Account, destination: &'a Account) -> Self {
        let source_is_lower = source.id() < destination.id();
        let (lower, higher) = if source_is_lower {
            (source, destination)
        } else {
            (destination, source)
        };
        let lower = lower.lock();
        let higher = higher.lock();
        Self {
            higher,
            lower,
            source_is_lower,
        }
    }

    /// Returns `(source, destination)`.
    fn split(&mut self) -> (&mut AccountState, &mut AccountState) {
        if self.source_is_lower {
            (&mut *self.lower, &mut *self.higher)
        } else {
            (&mut *self.higher, &mut *self.lower)
        }
    }
}

/// The ledger operations over an in-memory [`AccountStore`].
///
/// Every operation validates its arguments first, then takes the record
/// lock(s) it needs and holds them until its effect is complete.
pub struct InMemoryLedger {
    store: AccountStore,
}

impl InMemoryLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: AccountStore::with_capacity(capacity),
        }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        self.store.snapshot()
    }

    pub fn create(&self, pin: &str) -> Result<AccountId, LedgerError> {
        let pin = Pin::parse(pin)?;
        let id = self.store.create(pin)?;
        info!(id, "account created");
        Ok(id)
    }

    pub fn deposit(&self, id: AccountId, amount: i64, pin: &str) -> Result<i64, LedgerError> {
        ensure_positive(amount)?;
        let mut state = self.store.get(id)?.lock();
        state.ensure_active(id)?;
        ensure_authorized(&state, id, pin)?;
        state.credit(id, amount)
    }

    pub fn withdraw(&self, id: AccountId, amount: i64, pin: &str) -> Result<i64, LedgerError> {
        ensure_positive(amount)?;
        let mut state = self.store.get(id)?.lock();
        state.ensure_active(id)?;
        ensure_authorized(&state, id, pin)?;
        state.debit(id, amount)
    }

    pub fn view(&self, id: AccountId, pin: &str) -> Result<i64, LedgerError> {
        let mut state = self.store.get(id)?.lock();
        state.ensure_active(id)?;
        ensure_authorized(&state, id, pin)?;
        state.touch();
        Ok(state.balance())
    }

    /// Moves `amount` between two accounts. Returns the new
    /// `(source, destination)` balances.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: i64,
        pin: &str,
    ) -> Result<(i64, i64), LedgerError> {
        if from == to {
            return Err(ValidationError::SelfTransfer { id: from }.into());
        }
        ensure_positive(amount)?;
        let source = self.store.get(from)?;
        let destination = self.store.get(to)?;

        let mut locks = TransferLocks::acquire(source, destination);
        let (source, destination) = locks.split();
        source.ensure_active(from)?;
        destination.ensure_active(to)?;
        ensure_authorized(source, from, pin)?;
        if source.balance() < amount {
            return Err(LedgerError::InsufficientFunds {
                id: from,
                balance: source.balance(),
                requested: amount,
            });
        }
        // credit first: an overflow must leave the source untouched
        let to_balance = destination.credit(to, amount)?;
        let from_balance = source.debit(from, amount)?;
        Ok((from_balance, to_balance))
    }

    pub fn delete(&self, id: AccountId, pin: &str) -> Result<(), LedgerError> {
        let mut state = self.store.get(id)?.lock();
        state.ensure_active(id)?;
        ensure_authorized(&state, id, pin)?;
        state.close();
        drop(state);
        info!(id, "account closed");
        Ok(())
    }

    pub fn change_pin(&self, id: AccountId, pin: &str, new_pin: &str) -> Result<(), LedgerError> {
        let new_pin = Pin::parse(new_pin)?;
        let mut state = self.store.get(id)?.lock();
        state.ensure_active(id)?;
        ensure_authorized(&state, id, pin)?;
        state.set_pin(new_pin);
        Ok(())
    }
}

impl RequestProcessor for InMemoryLedger {
    fn process(&self, operation: Operation) -> Result<Outcome, LedgerError> {
        let kind = operation.kind();
        let outcome = match operation {
            Operation::Create { pin } => self.create(&pin).map(|id| Outcome::Created { id }),
            Operation::Deposit { id, amount, pin } => self
                .deposit(id, amount, &pin)
                .map(|balance| Outcome::Balance { id, balance }),
            Operation::Withdraw { id, amount, pin } => self
                .withdraw(id, amount, &pin)
                .map(|balance| Outcome::Balance { id, balance }),
            Operation::View { id, pin } => self
                .view(id, &pin)
                .map(|balance| Outcome::Balance { id, balance }),
            Operation::Transfer {
                from,
                to,
                amount,
                pin,
            } => self
                .transfer(from, to, amount, &pin)
                .map(|(from_balance, to_balance)| Outcome::Transferred {
                    from,
                    to,
                    from_balance,
                    to_balance,
                }),
            Operation::Delete { id, pin } => self.delete(id, &pin).map(|()| Outcome::Deleted { id }),
            Operation::ChangePin { id, pin, new_pin } => self
                .change_pin(id, &pin, &new_pin)
                .map(|()| Outcome::PinChanged { id }),
        };
        match &outcome {
            Ok(outcome) => debug!(?kind, ?outcome, "operation applied"),
            Err(err) => debug!(?kind, %err, "operation rejected"),
        }
        outcome
    }
}
