//! # Tontine Ledger
//!
//! Contribution accrual and cash reconciliation for a community savings
//! scheme (tontine). Members owe a running contribution accrued day by day
//! with a monthly cap; their payments are reconciled against that schedule,
//! and the cash collected is tracked against what was deposited at the bank.
//!
//! ## Design Principles
//!
//! - **Integer amounts**: whole currency units, text parsed via `rust_decimal`
//! - **Pure calculations**: every figure is a function of the records, an
//!   explicit as-of date and an immutable config snapshot
//! - **Strict invariants**: `deposited <= collected` is enforced at insertion
//! - **Frozen time**: a stopped project clamps every as-of date to its stop date
//!
//! ## Example
//!
//! ```no_run
//! use tontine_ledger::{Ledger, ProjectConfig};
//! use tontine_ledger::month::parse_date;
//! use std::io::Cursor;
//!
//! let journal = "type,phone,date,amount,channel,name,reference\n\
//!                member,771234567,2025-10-15,,,Awa Diop,\n\
//!                payment,771234567,2025-10-31,30000,wave,,TX-1\n";
//! let mut ledger = Ledger::new(ProjectConfig::default());
//! ledger.process_csv(Cursor::new(journal)).unwrap();
//! ledger
//!     .write_statuses(std::io::stdout(), parse_date("2025-11-15").unwrap())
//!     .unwrap();
//! ```

pub mod accrual;
pub mod amount;
pub mod config;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod member;
pub mod month;
pub mod record;
pub mod store;
pub mod summary;

pub use accrual::AccrualCalculator;
pub use amount::Amount;
pub use config::{MonthRule, ProjectConfig, ProjectState};
pub use error::{Result, TontineError};
pub use guard::{BankTransferGuard, SharedLedger};
pub use ledger::Ledger;
pub use member::{ActivityInterval, Member, MemberId};
pub use month::YearMonth;
pub use record::{
    BankDeposit, Channel, DepositId, JournalEntry, JournalRecord, NewDeposit, NewPayment, Payment,
    PaymentId,
};
pub use store::{MemoryStore, RecordStore};
pub use summary::{
    ChannelTotals, MemberStatus, MonthJournal, MonthlyCollection, SchemeTotals, Standing,
};
