//! Error types for the tontine ledger.

use crate::amount::Amount;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, TontineError>;

/// Errors surfaced by the ledger.
///
/// Every variant is recoverable: callers get a structured value back and
/// decide how to present it. Insufficient funds on a bank deposit is an
/// expected outcome, not a fault.
#[derive(Error, Debug)]
pub enum TontineError {
    /// Malformed or impossible calendar date
    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Non-positive, negative or fractional amount
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// Reference to a member that is not in the store
    #[error("Unknown member {0}")]
    UnknownMember(String),

    /// Bank deposit larger than the cash currently held
    #[error("Deposit exceeds available balance (available: {available})")]
    InsufficientAvailableBalance { available: Amount },

    /// Member identity (phone) already used by another member
    #[error("Phone {0} is already used by another member")]
    DuplicateIdentity(String),

    /// Phone number that is not exactly 9 digits
    #[error("Invalid phone '{0}' (expected 9 digits)")]
    InvalidPhone(String),

    /// Blank member name
    #[error("Member name must not be empty")]
    EmptyName,

    /// Payment channel outside the supported set
    #[error("Invalid payment channel '{0}'")]
    InvalidChannel(String),

    /// Unusable project setting
    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    /// Journal row with an unknown type or a missing column
    #[error("Malformed journal entry: {0}")]
    MalformedEntry(String),

    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Report name not understood by the CLI
    #[error("Unknown report '{0}' (expected status, overdue, months, totals or journal:YYYY-MM)")]
    UnknownReport(String),

    /// Missing journal file argument
    #[error("Missing journal file argument. Usage: tontine-ledger <journal.csv> [status|overdue|months|totals|journal:YYYY-MM]")]
    MissingArgument,
}
