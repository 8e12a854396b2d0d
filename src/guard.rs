//! Bank transfer guard.
//!
//! Cash collected from members may only be moved to the bank while it is
//! still on hand: a deposit must not exceed `collected - deposited`. The
//! check and the insertion of the deposit have to happen as one step,
//! otherwise a concurrent deposit or payment deletion could slip in between
//! and push `deposited` above `collected`.

use crate::amount::Amount;
use crate::error::{Result, TontineError};
use crate::ledger::Ledger;
use crate::record::{DepositId, NewDeposit};
use crate::store::{MemoryStore, RecordStore};
use crate::summary::SchemeTotals;
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard};

/// Validates proposed bank deposits against the available cash.
pub struct BankTransferGuard;

impl BankTransferGuard {
    /// Accepts `amount` if it does not exceed `totals.available`.
    ///
    /// Rejection carries the available amount for display.
    pub fn check(amount: Amount, totals: &SchemeTotals) -> Result<()> {
        if amount > totals.available {
            warn!(
                "Rejected bank deposit of {}: only {} available",
                amount, totals.available
            );
            return Err(TontineError::InsufficientAvailableBalance {
                available: totals.available,
            });
        }
        Ok(())
    }
}

/// A ledger shared between threads behind a single-writer lock.
///
/// Every deposit is validated and inserted while the lock is held, which
/// serializes all writers on the deposit ledger.
pub struct SharedLedger<S = MemoryStore> {
    inner: Arc<Mutex<Ledger<S>>>,
}

impl<S> Clone for SharedLedger<S> {
    fn clone(&self) -> Self {
        SharedLedger {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RecordStore> SharedLedger<S> {
    pub fn new(ledger: Ledger<S>) -> Self {
        SharedLedger {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Locks the ledger for reads or other writes.
    ///
    /// A poisoned lock is recovered: every ledger mutation is a single store
    /// call, so a panic elsewhere cannot leave it half-applied.
    pub fn lock(&self) -> MutexGuard<'_, Ledger<S>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Checks the available balance and inserts the deposit atomically.
    pub fn deposit(&self, deposit: NewDeposit) -> Result<DepositId> {
        self.lock().record_deposit(deposit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::month::parse_date;
    use crate::record::{Channel, NewPayment};
    use chrono::NaiveDate;
    use std::thread;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn totals(collected: u64, deposited: u64) -> SchemeTotals {
        SchemeTotals::new(Amount::new(collected), Amount::new(deposited))
    }

    #[test]
    fn test_check_accepts_up_to_available() {
        let totals = totals(100_000, 40_000);
        assert!(BankTransferGuard::check(Amount::new(60_000), &totals).is_ok());
        assert!(BankTransferGuard::check(Amount::new(1), &totals).is_ok());
    }

    #[test]
    fn test_check_rejects_above_available() {
        let err = BankTransferGuard::check(Amount::new(60_001), &totals(100_000, 40_000))
            .unwrap_err();
        match err {
            TontineError::InsufficientAvailableBalance { available } => {
                assert_eq!(available, Amount::new(60_000))
            }
            other => panic!("Expected InsufficientAvailableBalance, got {:?}", other),
        }
    }

    #[test]
    fn test_check_when_overdrawn() {
        let err = BankTransferGuard::check(Amount::new(1), &totals(10_000, 40_000)).unwrap_err();
        assert!(matches!(
            err,
            TontineError::InsufficientAvailableBalance { available } if available.is_zero()
        ));
    }

    #[test]
    fn test_concurrent_deposits_never_exceed_collected() {
        let mut ledger = Ledger::new(ProjectConfig::default());
        let member = ledger
            .enroll_member("Awa Diop", "771234567", date("2025-10-15"))
            .unwrap();
        ledger
            .record_payment(NewPayment {
                member_id: member,
                pay_date: date("2025-11-01"),
                amount: Amount::new(100_000),
                channel: Channel::Cash,
                reference: None,
                note: None,
            })
            .unwrap();

        let shared = SharedLedger::new(ledger);
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared
                        .deposit(NewDeposit {
                            dep_date: date("2025-11-02"),
                            amount: Amount::new(15_000),
                            reference: Some(format!("BANK-{}", i)),
                            note: None,
                        })
                        .is_ok()
                })
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 6);
        let totals = shared.lock().scheme_totals_as_of(date("2025-11-30"));
        assert_eq!(totals.deposited, Amount::new(90_000));
        assert_eq!(totals.available, Amount::new(10_000));
    }

    #[test]
    fn test_concurrent_future_dated_deposits_share_one_balance() {
        let mut ledger = Ledger::new(ProjectConfig::default());
        let member = ledger
            .enroll_member("Awa Diop", "771234567", date("2025-10-15"))
            .unwrap();
        ledger
            .record_payment(NewPayment {
                member_id: member,
                pay_date: date("2025-11-01"),
                amount: Amount::new(100_000),
                channel: Channel::Wave,
                reference: None,
                note: None,
            })
            .unwrap();

        let shared = SharedLedger::new(ledger);
        let handles: Vec<_> = (0..5)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared
                        .deposit(NewDeposit {
                            dep_date: date("2025-12-01"),
                            amount: Amount::new(100_000),
                            reference: Some(format!("BANK-{}", i)),
                            note: None,
                        })
                        .is_ok()
                })
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 1);
        let totals = shared.lock().scheme_totals_as_of(date("2026-01-31"));
        assert_eq!(totals.collected, Amount::new(100_000));
        assert_eq!(totals.deposited, Amount::new(100_000));
    }
}
