//! Derived views computed on demand: member status, scheme totals and
//! per-channel breakdowns. Nothing here is stored.

use crate::amount::Amount;
use crate::month::YearMonth;
use crate::record::{BankDeposit, Channel, Payment};
use serde::Serialize;
use std::fmt;

/// Where a member stands against the contribution schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    /// Nothing left to pay.
    Current,

    /// Arrears outstanding.
    Late,

    /// Deactivated; excluded from the live view.
    Inactive,
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Standing::Current => "current",
            Standing::Late => "late",
            Standing::Inactive => "inactive",
        })
    }
}

/// A member's due/paid reconciliation.
///
/// # Invariants
///
/// - `rest == max(0, due - paid)` and `avance == max(0, paid - due)`
/// - `avance - rest == balance == paid - due`
/// - at most one of `rest` and `avance` is non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberStatus {
    pub due: Amount,
    pub paid: Amount,

    /// `paid - due`; negative while in arrears.
    pub balance: i64,

    /// Arrears.
    pub rest: Amount,

    /// Credit (overpayment).
    pub avance: Amount,

    pub status: Standing,
}

impl MemberStatus {
    /// Compares cumulative due against cumulative paid.
    pub fn reconcile(due: Amount, paid: Amount) -> Self {
        let rest = due.saturating_sub(paid);
        MemberStatus {
            due,
            paid,
            balance: paid.signed_diff(due),
            rest,
            avance: paid.saturating_sub(due),
            status: if rest.is_zero() {
                Standing::Current
            } else {
                Standing::Late
            },
        }
    }

    /// Status reported for a deactivated member: all zeros.
    pub fn inactive() -> Self {
        MemberStatus {
            due: Amount::ZERO,
            paid: Amount::ZERO,
            balance: 0,
            rest: Amount::ZERO,
            avance: Amount::ZERO,
            status: Standing::Inactive,
        }
    }

    /// Verifies the balance identity.
    #[cfg(debug_assertions)]
    pub fn check_invariant(&self) -> bool {
        let identity = self.avance.signed_diff(self.rest) == self.balance
            && self.balance == self.paid.signed_diff(self.due);
        let exclusive = self.rest.is_zero() || self.avance.is_zero();
        identity && exclusive
    }
}

/// Scheme-wide cash position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeTotals {
    /// All member payments.
    pub collected: Amount,

    /// All bank deposits.
    pub deposited: Amount,

    /// Cash on hand: `max(0, collected - deposited)`. Ceiling for new deposits.
    pub available: Amount,
}

impl SchemeTotals {
    pub fn new(collected: Amount, deposited: Amount) -> Self {
        SchemeTotals {
            collected,
            deposited,
            available: collected.saturating_sub(deposited),
        }
    }
}

/// Amounts split by payment channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelTotals {
    pub wave: Amount,
    pub om: Amount,
    pub cash: Amount,
}

impl ChannelTotals {
    pub fn add(&mut self, channel: Channel, amount: Amount) {
        match channel {
            Channel::Wave => self.wave += amount,
            Channel::OrangeMoney => self.om += amount,
            Channel::Cash => self.cash += amount,
        }
    }

    pub fn get(&self, channel: Channel) -> Amount {
        match channel {
            Channel::Wave => self.wave,
            Channel::OrangeMoney => self.om,
            Channel::Cash => self.cash,
        }
    }

    pub fn total(&self) -> Amount {
        self.wave + self.om + self.cash
    }
}

/// Payments collected in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthlyCollection {
    pub total: Amount,
    pub channels: ChannelTotals,
}

impl MonthlyCollection {
    pub fn add(&mut self, payment: &Payment) {
        self.total += payment.amount;
        self.channels.add(payment.channel, payment.amount);
    }
}

/// Bookkeeping view of one calendar month.
#[derive(Debug, Clone)]
pub struct MonthJournal<'a> {
    pub month: YearMonth,

    /// Newest first (by date, then id).
    pub payments: Vec<&'a Payment>,

    /// Newest first (by date, then id).
    pub deposits: Vec<&'a BankDeposit>,

    pub collected: MonthlyCollection,
    pub deposited: Amount,
}
