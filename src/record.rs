//! Payment and bank deposit records, and the journal rows that create them.

use crate::amount::Amount;
use crate::error::TontineError;
use crate::member::MemberId;
use crate::month::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Wave mobile money
    Wave,

    /// Orange Money
    #[serde(rename = "om")]
    OrangeMoney,

    Cash,
}

impl Channel {
    /// Every channel, in report column order.
    pub const ALL: [Channel; 3] = [Channel::Wave, Channel::OrangeMoney, Channel::Cash];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Wave => "wave",
            Channel::OrangeMoney => "om",
            Channel::Cash => "cash",
        }
    }
}

impl FromStr for Channel {
    type Err = TontineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wave" => Ok(Channel::Wave),
            "om" => Ok(Channel::OrangeMoney),
            "cash" => Ok(Channel::Cash),
            _ => Err(TontineError::InvalidChannel(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-assigned payment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentId(pub u32);

/// Store-assigned bank deposit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepositId(pub u32);

/// A payment before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub member_id: MemberId,
    pub pay_date: NaiveDate,
    pub amount: Amount,
    pub channel: Channel,
    pub reference: Option<String>,
    pub note: Option<String>,
}

/// A recorded member payment. Immutable once stored; only deletion removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub member_id: MemberId,
    pub pay_date: NaiveDate,
    pub amount: Amount,
    pub channel: Channel,
    pub reference: Option<String>,
    pub note: Option<String>,
}

impl Payment {
    pub fn from_new(id: PaymentId, new: NewPayment) -> Self {
        Payment {
            id,
            member_id: new.member_id,
            pay_date: new.pay_date,
            amount: new.amount,
            channel: new.channel,
            reference: new.reference,
            note: new.note,
        }
    }
}

/// A bank deposit before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub dep_date: NaiveDate,
    pub amount: Amount,
    pub reference: Option<String>,
    pub note: Option<String>,
}

/// Cash moved from the collected pool to the bank account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankDeposit {
    pub id: DepositId,
    pub dep_date: NaiveDate,
    pub amount: Amount,
    pub reference: Option<String>,
    pub note: Option<String>,
}

impl BankDeposit {
    pub fn from_new(id: DepositId, new: NewDeposit) -> Self {
        BankDeposit {
            id,
            dep_date: new.dep_date,
            amount: new.amount,
            reference: new.reference,
            note: new.note,
        }
    }
}

/// Raw journal row as read from CSV.
///
/// Every column except `type` is optional; which ones are required depends
/// on the row type.
#[derive(Debug, Default, Deserialize)]
pub struct JournalRecord {
    /// Row type: member, update, deactivate, activate, payment, deposit, stop, resume
    #[serde(rename = "type")]
    pub entry_type: String,

    /// Member phone (identity)
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub amount: Option<String>,

    #[serde(default)]
    pub channel: Option<String>,

    /// Member full name
    #[serde(default)]
    pub name: Option<String>,

    /// Payment or deposit reference; new phone number for `update` rows
    #[serde(default)]
    pub reference: Option<String>,
}

/// A validated journal entry ready to apply to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// Enroll a new member.
    Enroll {
        phone: String,
        full_name: String,
        enrollment_date: NaiveDate,
    },

    /// Rename a member and/or change their phone.
    UpdateMember {
        phone: String,
        full_name: Option<String>,
        new_phone: Option<String>,
    },

    Deactivate { phone: String, date: NaiveDate },

    Activate { phone: String, date: NaiveDate },

    /// Record a member payment.
    Payment {
        phone: String,
        pay_date: NaiveDate,
        amount: Amount,
        channel: Channel,
        reference: Option<String>,
    },

    /// Move cash to the bank, subject to the available balance.
    BankDeposit {
        dep_date: NaiveDate,
        amount: Amount,
        reference: Option<String>,
    },

    /// Freeze calculations at the given date.
    Stop { date: NaiveDate },

    /// Clear the stop date.
    Resume,
}

impl JournalRecord {
    /// Validates the raw row into a typed entry.
    pub fn parse(&self) -> Result<JournalEntry, TontineError> {
        let entry_type = self.entry_type.trim().to_lowercase();

        match entry_type.as_str() {
            "member" => Ok(JournalEntry::Enroll {
                phone: self.required_phone()?,
                full_name: self.required("name", &self.name)?,
                enrollment_date: self.required_date()?,
            }),
            "update" => Ok(JournalEntry::UpdateMember {
                phone: self.required_phone()?,
                full_name: non_empty(&self.name),
                new_phone: non_empty(&self.reference),
            }),
            "deactivate" => Ok(JournalEntry::Deactivate {
                phone: self.required_phone()?,
                date: self.required_date()?,
            }),
            "activate" => Ok(JournalEntry::Activate {
                phone: self.required_phone()?,
                date: self.required_date()?,
            }),
            "payment" => Ok(JournalEntry::Payment {
                phone: self.required_phone()?,
                pay_date: self.required_date()?,
                amount: self.required_amount()?,
                channel: self.required("channel", &self.channel)?.parse()?,
                reference: non_empty(&self.reference),
            }),
            "deposit" => Ok(JournalEntry::BankDeposit {
                dep_date: self.required_date()?,
                amount: self.required_amount()?,
                reference: non_empty(&self.reference),
            }),
            "stop" => Ok(JournalEntry::Stop {
                date: self.required_date()?,
            }),
            "resume" => Ok(JournalEntry::Resume),
            _ => Err(TontineError::MalformedEntry(format!(
                "unknown entry type '{}'",
                self.entry_type.trim()
            ))),
        }
    }

    fn required(&self, column: &str, value: &Option<String>) -> Result<String, TontineError> {
        non_empty(value).ok_or_else(|| {
            TontineError::MalformedEntry(format!(
                "missing {} for '{}' row",
                column,
                self.entry_type.trim()
            ))
        })
    }

    fn required_phone(&self) -> Result<String, TontineError> {
        self.required("phone", &self.phone)
    }

    fn required_date(&self) -> Result<NaiveDate, TontineError> {
        parse_date(&self.required("date", &self.date)?)
    }

    fn required_amount(&self) -> Result<Amount, TontineError> {
        Amount::parse_positive(&self.required("amount", &self.amount)?)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entry_type: &str) -> JournalRecord {
        JournalRecord {
            entry_type: entry_type.to_string(),
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_member() {
        let rec = JournalRecord {
            phone: Some("771234567".to_string()),
            date: Some("2025-10-15".to_string()),
            name: Some("Awa Diop".to_string()),
            ..record("member")
        };

        assert_eq!(
            rec.parse().unwrap(),
            JournalEntry::Enroll {
                phone: "771234567".to_string(),
                full_name: "Awa Diop".to_string(),
                enrollment_date: date("2025-10-15"),
            }
        );
    }

    #[test]
    fn test_parse_payment() {
        let rec = JournalRecord {
            phone: Some("771234567".to_string()),
            date: Some("2025-10-20".to_string()),
            amount: Some("30000".to_string()),
            channel: Some(" OM ".to_string()),
            reference: Some("TX-1".to_string()),
            ..record(" Payment ")
        };

        match rec.parse().unwrap() {
            JournalEntry::Payment {
                amount,
                channel,
                reference,
                ..
            } => {
                assert_eq!(amount, Amount::new(30_000));
                assert_eq!(channel, Channel::OrangeMoney);
                assert_eq!(reference.as_deref(), Some("TX-1"));
            }
            other => panic!("Expected Payment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_payment_rejects_bad_fields() {
        let base = || JournalRecord {
            phone: Some("771234567".to_string()),
            date: Some("2025-10-20".to_string()),
            amount: Some("1000".to_string()),
            channel: Some("cash".to_string()),
            ..record("payment")
        };

        let rec = JournalRecord {
            channel: Some("paypal".to_string()),
            ..base()
        };
        assert!(matches!(rec.parse(), Err(TontineError::InvalidChannel(_))));

        let rec = JournalRecord {
            amount: Some("0".to_string()),
            ..base()
        };
        assert!(matches!(rec.parse(), Err(TontineError::InvalidAmount(_))));

        let rec = JournalRecord {
            amount: Some("10.5".to_string()),
            ..base()
        };
        assert!(matches!(rec.parse(), Err(TontineError::InvalidAmount(_))));

        let rec = JournalRecord {
            date: Some("2025-13-01".to_string()),
            ..base()
        };
        assert!(matches!(rec.parse(), Err(TontineError::InvalidDate(_))));

        let rec = JournalRecord {
            amount: Some("   ".to_string()),
            ..base()
        };
        assert!(matches!(
            rec.parse(),
            Err(TontineError::MalformedEntry(_))
        ));
    }

    #[test]
    fn test_parse_deposit_and_lifecycle_rows() {
        let rec = JournalRecord {
            date: Some("2025-11-01".to_string()),
            amount: Some("50000".to_string()),
            ..record("deposit")
        };
        assert!(matches!(
            rec.parse().unwrap(),
            JournalEntry::BankDeposit { reference: None, .. }
        ));

        let rec = JournalRecord {
            date: Some("2025-11-20".to_string()),
            ..record("stop")
        };
        assert_eq!(
            rec.parse().unwrap(),
            JournalEntry::Stop {
                date: date("2025-11-20")
            }
        );

        assert_eq!(record("resume").parse().unwrap(), JournalEntry::Resume);
    }

    #[test]
    fn test_parse_update_treats_blank_as_unchanged() {
        let rec = JournalRecord {
            phone: Some("771234567".to_string()),
            name: Some("  ".to_string()),
            reference: Some("781234567".to_string()),
            ..record("update")
        };
        assert_eq!(
            rec.parse().unwrap(),
            JournalEntry::UpdateMember {
                phone: "771234567".to_string(),
                full_name: None,
                new_phone: Some("781234567".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(record("withdrawal").parse().is_err());
    }

    #[test]
    fn test_channel_round_trip_text() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
    }
}
