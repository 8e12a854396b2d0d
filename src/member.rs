//! Member model and activity tracking.
//!
//! Activity is kept as a list of `[start, end)` intervals instead of a single
//! flag, so a member who is deactivated and later reactivated does not accrue
//! contributions for the gap.

use crate::error::{Result, TontineError};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Store-assigned member identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MemberId(pub u32);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A half-open period `[start, end)` during which a member accrues.
///
/// `end == None` means the member is still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityInterval {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl ActivityInterval {
    /// An interval starting at `start` with no end yet.
    pub fn open(start: NaiveDate) -> Self {
        ActivityInterval { start, end: None }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Last day on which the member was active, `None` while open.
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.end.and_then(|end| end.pred_opt())
    }

    /// Intersects the interval with the inclusive window `[from, to]`.
    ///
    /// Returns the inclusive sub-window, or `None` when they do not overlap.
    pub fn clip(&self, from: NaiveDate, to: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start.max(from);
        let end = match self.last_day() {
            Some(last) => last.min(to),
            None => to,
        };
        (start <= end).then_some((start, end))
    }
}

/// A participant of the scheme.
///
/// # Invariants
///
/// - Activity intervals are sorted, non-empty and non-overlapping
/// - Only the last interval may be open
#[derive(Debug, Clone)]
pub struct Member {
    /// Store-assigned identifier.
    pub id: MemberId,

    pub full_name: String,

    phone: String,

    /// First day the member owes contributions, independent of the project
    /// start date.
    pub enrollment_date: NaiveDate,

    activity: Vec<ActivityInterval>,
}

impl Member {
    /// Creates an active member whose accrual starts at `enrollment_date`.
    pub fn new(id: MemberId, full_name: String, phone: String, enrollment_date: NaiveDate) -> Self {
        Member {
            id,
            full_name,
            phone,
            enrollment_date,
            activity: vec![ActivityInterval::open(enrollment_date)],
        }
    }

    /// Unique identity of the member: 9 digits.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Swaps the phone, returning the previous one. Only the store calls
    /// this, since it keeps the phone index.
    pub(crate) fn set_phone(&mut self, phone: String) -> String {
        std::mem::replace(&mut self.phone, phone)
    }

    /// Returns `true` if the member currently accrues contributions.
    pub fn is_active(&self) -> bool {
        self.activity.last().is_some_and(ActivityInterval::is_open)
    }

    pub fn activity(&self) -> &[ActivityInterval] {
        &self.activity
    }

    /// Stops accrual from `date` onwards (the date itself is not accrued).
    ///
    /// Returns `false` if the member is already inactive. A deactivation
    /// dated on or before the start of the current interval erases that
    /// interval entirely.
    pub fn deactivate(&mut self, date: NaiveDate) -> bool {
        let Some(current) = self.activity.last_mut().filter(|i| i.is_open()) else {
            return false;
        };

        if date <= current.start {
            self.activity.pop();
        } else {
            current.end = Some(date);
        }
        true
    }

    /// Resumes accrual from `date`.
    ///
    /// Returns `false` if the member is already active. A reactivation dated
    /// before the end of the previous interval starts at that end instead,
    /// so intervals never overlap.
    pub fn activate(&mut self, date: NaiveDate) -> bool {
        if self.is_active() {
            return false;
        }

        let start = match self.activity.last().and_then(|i| i.end) {
            Some(previous_end) => date.max(previous_end),
            None => date.max(self.enrollment_date),
        };
        self.activity.push(ActivityInterval::open(start));
        true
    }

    /// Verifies the interval invariants.
    #[cfg(debug_assertions)]
    pub fn check_invariant(&self) -> bool {
        let ordered = self.activity.windows(2).all(|pair| match pair[0].end {
            Some(end) => end <= pair[1].start,
            None => false,
        });
        let non_empty = self
            .activity
            .iter()
            .all(|i| i.end.map_or(true, |end| i.start < end));
        ordered && non_empty
    }
}

/// Normalizes and validates a member phone number (exactly 9 ASCII digits).
pub fn validate_phone(phone: &str) -> Result<String> {
    let phone = phone.trim();
    if phone.len() == 9 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(phone.to_string())
    } else {
        Err(TontineError::InvalidPhone(phone.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::month::parse_date;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn member() -> Member {
        Member::new(
            MemberId(1),
            "Awa Diop".to_string(),
            "771234567".to_string(),
            date("2025-10-15"),
        )
    }

    #[test]
    fn test_new_member_is_active_from_enrollment() {
        let m = member();
        assert!(m.is_active());
        assert_eq!(m.activity(), &[ActivityInterval::open(date("2025-10-15"))]);
        assert!(m.check_invariant());
    }

    #[test]
    fn test_deactivate_then_activate_records_gap() {
        let mut m = member();
        assert!(m.deactivate(date("2025-12-01")));
        assert!(!m.is_active());
        assert!(!m.deactivate(date("2025-12-05")));

        assert!(m.activate(date("2026-01-10")));
        assert!(m.is_active());
        assert!(!m.activate(date("2026-01-11")));

        assert_eq!(
            m.activity(),
            &[
                ActivityInterval {
                    start: date("2025-10-15"),
                    end: Some(date("2025-12-01")),
                },
                ActivityInterval::open(date("2026-01-10")),
            ]
        );
        assert!(m.check_invariant());
    }

    #[test]
    fn test_deactivate_on_start_day_erases_interval() {
        let mut m = member();
        assert!(m.deactivate(date("2025-10-15")));
        assert!(m.activity().is_empty());
        assert!(!m.is_active());

        assert!(m.activate(date("2025-10-01")));
        assert_eq!(m.activity(), &[ActivityInterval::open(date("2025-10-15"))]);
    }

    #[test]
    fn test_backdated_reactivation_does_not_overlap() {
        let mut m = member();
        m.deactivate(date("2025-12-01"));
        m.activate(date("2025-11-20"));

        assert_eq!(m.activity()[1].start, date("2025-12-01"));
        assert!(m.check_invariant());
    }

    #[test]
    fn test_clip() {
        let closed = ActivityInterval {
            start: date("2025-11-10"),
            end: Some(date("2025-11-21")),
        };
        assert_eq!(
            closed.clip(date("2025-11-01"), date("2025-11-30")),
            Some((date("2025-11-10"), date("2025-11-20")))
        );
        assert_eq!(closed.clip(date("2025-11-21"), date("2025-11-30")), None);

        let open = ActivityInterval::open(date("2025-11-10"));
        assert_eq!(
            open.clip(date("2025-11-01"), date("2025-11-15")),
            Some((date("2025-11-10"), date("2025-11-15")))
        );
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone(" 771234567 ").unwrap(), "771234567");
        assert!(matches!(
            validate_phone("77123456"),
            Err(TontineError::InvalidPhone(_))
        ));
        assert!(validate_phone("77123456a").is_err());
        assert!(validate_phone("+22177123").is_err());
    }
}
