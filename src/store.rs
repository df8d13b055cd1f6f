use std::sync::{
    OnceLock,
    atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    account::{Account, AccountId, Pin},
    error::LedgerError,
};

/// Point-in-time view of one record, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub balance: i64,
    pub active: bool,
}

/// Append-only arena of accounts, indexed by id.
///
/// Slots are allocated up front for the configured capacity, so a record
/// never moves once created and `get` hands out plain references. The
/// structural lock only serializes appends; record locks are taken by callers.
pub struct AccountStore {
    slots: Box<[OnceLock<Account>]>,
    // structural lock, guards the next free id
    next_id: Mutex<AccountId>,
    // published count, ids below it are fully initialized
    len: AtomicUsize,
}

impl AccountStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            next_id: Mutex::new(0),
            len: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create(&self, pin: Pin) -> Result<AccountId, LedgerError> {
        let mut next_id = self.next_id.lock();
        let id = *next_id;
        let Some(slot) = self.slots.get(id) else {
            return Err(LedgerError::CapacityExceeded {
                capacity: self.capacity(),
            });
        };
        // ids are handed out under the structural lock, so the slot is still empty
        slot.get_or_init(|| Account::new(id, pin));
        *next_id += 1;
        self.len.store(*next_id, Ordering::Release);
        Ok(id)
    }

    pub fn get(&self, id: AccountId) -> Result<&Account, LedgerError> {
        if id >= self.len() {
            return Err(LedgerError::NotFound { id });
        }
        self.slots[id].get().ok_or(LedgerError::NotFound { id })
    }

    /// Locks each record in turn, never more than one at a time.
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        self.slots[..self.len()]
            .iter()
            .filter_map(OnceLock::get)
            .map(|acc| {
                let state = acc.lock();
                AccountSnapshot {
                    id: acc.id(),
                    balance: state.balance(),
                    active: state.is_active(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn pin(raw: &str) -> Pin {
        Pin::parse(raw).unwrap()
    }

    #[test]
    fn ids_are_sequential_until_full() {
        let store = AccountStore::with_capacity(2);
        assert!(store.is_empty());
        assert_eq!(store.create(pin("1111")).unwrap(), 0);
        assert_eq!(store.create(pin("2222")).unwrap(), 1);
        assert_eq!(
            store.create(pin("3333")).unwrap_err(),
            LedgerError::CapacityExceeded { capacity: 2 }
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn get_out_of_range() {
        let store = AccountStore::with_capacity(4);
        store.create(pin("1111")).unwrap();
        assert_eq!(store.get(0).unwrap().id(), 0);
        assert_eq!(store.get(1).unwrap_err(), LedgerError::NotFound { id: 1 });
        assert_eq!(
            store.get(usize::MAX).unwrap_err(),
            LedgerError::NotFound { id: usize::MAX }
        );
    }

    #[test]
    fn zero_capacity_store_rejects_everything() {
        let store = AccountStore::with_capacity(0);
        assert!(matches!(
            store.create(pin("1111")),
            Err(LedgerError::CapacityExceeded { capacity: 0 })
        ));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn concurrent_creates_never_reuse_ids() {
        let store = AccountStore::with_capacity(64);
        let mut ids: Vec<AccountId> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..10)
                            .filter_map(|_| store.create(pin("0000")).ok())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        ids.sort_unstable();
        assert_eq!(ids, (0..64).collect::<Vec<_>>());
        assert_eq!(store.len(), 64);
    }

    #[test]
    fn snapshot_reflects_state() {
        let store = AccountStore::with_capacity(3);
        store.create(pin("1111")).unwrap();
        store.create(pin("2222")).unwrap();
        store.get(0).unwrap().lock().credit(0, 25).unwrap();
        store.get(1).unwrap().lock().close();
        assert_eq!(
            store.snapshot(),
            vec![
                AccountSnapshot {
                    id: 0,
                    balance: 25,
                    active: true
                },
                AccountSnapshot {
                    id: 1,
                    balance: 0,
                    active: false
                },
            ]
        );
    }
}
