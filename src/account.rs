use std::{fmt, time::Instant};

use parking_lot::{Mutex, MutexGuard};

use crate::error::{LedgerError, ValidationError};

pub type AccountId = usize;

pub const PIN_LENGTH: usize = 4;

/// Four-digit numeric pin. Acts as a capability token, not a credential.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Pin([u8; PIN_LENGTH]);

impl Pin {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let bytes: [u8; PIN_LENGTH] = raw
            .as_bytes()
            .try_into()
            .map_err(|_| ValidationError::MalformedPin)?;
        if bytes.iter().all(u8::is_ascii_digit) {
            Ok(Self(bytes))
        } else {
            Err(ValidationError::MalformedPin)
        }
    }

    pub fn is_well_formed(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }
}

// never print the digits
impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Mutable part of an account. Only reachable through [`Account::lock`].
#[derive(Debug)]
pub struct AccountState {
    balance: i64,
    pin: Pin,
    active: bool,
    last_access: Option<Instant>,
}

impl AccountState {
    fn new(pin: Pin) -> Self {
        Self {
            balance: 0,
            pin,
            active: true,
            last_access: None,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_access(&self) -> Option<Instant> {
        self.last_access
    }

    pub fn touch(&mut self) {
        self.last_access = Some(Instant::now());
    }

    pub fn ensure_active(&self, id: AccountId) -> Result<(), LedgerError> {
        if self.active {
            Ok(())
        } else {
            Err(LedgerError::InactiveAccount { id })
        }
    }

    pub fn credit(&mut self, id: AccountId, amount: i64) -> Result<i64, LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(ValidationError::BalanceOverflow { id, amount })?;
        Ok(self.balance)
    }

    pub fn debit(&mut self, id: AccountId, amount: i64) -> Result<i64, LedgerError> {
        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                id,
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    pub fn set_pin(&mut self, pin: Pin) {
        self.pin = pin;
    }

    /// Terminal transition: the account keeps its id but holds no funds.
    pub fn close(&mut self) {
        self.active = false;
        self.balance = 0;
    }
}

/// Compares a candidate pin against the stored one.
///
/// Takes the state by reference, so the caller must already hold the
/// record lock. Malformed candidates are rejected exactly like wrong ones.
pub fn authorize(state: &AccountState, candidate: &str) -> bool {
    state.pin.0 == candidate.as_bytes()
}

/// A ledger record. The id is fixed, everything else sits behind the record lock.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    state: Mutex<AccountState>,
}

impl Account {
    pub(crate) fn new(id: AccountId, pin: Pin) -> Self {
        Self {
            id,
            state: Mutex::new(AccountState::new(pin)),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(raw: &str) -> Pin {
        Pin::parse(raw).unwrap()
    }

    #[test]
    fn pin_format() {
        assert!(Pin::is_well_formed("0000"));
        assert!(Pin::is_well_formed("1234"));
        assert_eq!(Pin::parse("123"), Err(ValidationError::MalformedPin));
        assert_eq!(Pin::parse("12345"), Err(ValidationError::MalformedPin));
        assert_eq!(Pin::parse("12a4"), Err(ValidationError::MalformedPin));
        assert_eq!(Pin::parse("１２３"), Err(ValidationError::MalformedPin));
        assert_eq!(format!("{:?}", pin("1234")), "Pin(****)");
    }

    #[test]
    fn authorize_rejects_wrong_and_malformed() {
        let acc = Account::new(0, pin("1111"));
        let state = acc.lock();
        assert!(authorize(&state, "1111"));
        assert!(!authorize(&state, "9999"));
        assert!(!authorize(&state, "111"));
        assert!(!authorize(&state, "11111"));
        assert!(!authorize(&state, ""));
    }

    #[test]
    fn credit_and_debit() {
        let acc = Account::new(2, pin("1111"));
        let mut state = acc.lock();
        assert_eq!(state.credit(2, 100).unwrap(), 100);
        assert_eq!(state.debit(2, 30).unwrap(), 70);
        assert_eq!(
            state.debit(2, 71).unwrap_err(),
            LedgerError::InsufficientFunds {
                id: 2,
                balance: 70,
                requested: 71
            }
        );
        assert_eq!(state.balance(), 70);

        state.credit(2, i64::MAX - 70).unwrap();
        let err = state.credit(2, 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::BalanceOverflow { id: 2, amount: 1 })
        ));
        assert_eq!(state.balance(), i64::MAX);
    }

    #[test]
    fn close_is_terminal() {
        let acc = Account::new(5, pin("4321"));
        let mut state = acc.lock();
        state.credit(5, 40).unwrap();
        assert!(state.ensure_active(5).is_ok());

        state.close();
        assert!(!state.is_active());
        assert_eq!(state.balance(), 0);
        assert_eq!(
            state.ensure_active(5).unwrap_err(),
            LedgerError::InactiveAccount { id: 5 }
        );
    }

    #[test]
    fn change_pin() {
        let acc = Account::new(0, pin("1111"));
        let mut state = acc.lock();
        state.set_pin(pin("2222"));
        assert!(!authorize(&state, "1111"));
        assert!(authorize(&state, "2222"));
    }
}
