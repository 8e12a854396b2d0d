//! Contribution accrual.
//!
//! Computes how much a member owes as of a date. Each calendar month accrues
//! independently according to its [`MonthRule`]:
//!
//! - `Prorated`: daily amount times the number of owed days in the month,
//!   capped at the monthly cap.
//! - `FixedFee`: a flat fee, recognized in full once the month has ended and
//!   only for members who enrolled during that month.
//!
//! Every function here is pure over its arguments and the config snapshot;
//! dates before enrollment owe nothing rather than being errors.

use crate::amount::Amount;
use crate::config::{MonthRule, ProjectConfig};
use crate::member::{ActivityInterval, Member};
use crate::month::{inclusive_days, YearMonth};
use chrono::NaiveDate;

/// Accrual calculator bound to one configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AccrualCalculator<'a> {
    config: &'a ProjectConfig,
}

impl<'a> AccrualCalculator<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        AccrualCalculator { config }
    }

    /// Amount owed for `month` as of `asof` by a member enrolled on
    /// `enrollment` and active ever since.
    ///
    /// `asof` is clamped to the project stop date.
    pub fn due_for_month(&self, month: YearMonth, asof: NaiveDate, enrollment: NaiveDate) -> Amount {
        let always_active = [ActivityInterval::open(enrollment)];
        self.month_due(month, self.config.effective_as_of(asof), enrollment, &always_active)
    }

    /// Cumulative amount owed as of `asof` by a member enrolled on
    /// `enrollment` and active ever since.
    ///
    /// # Examples
    ///
    /// ```
    /// use tontine_ledger::{AccrualCalculator, Amount, ProjectConfig};
    /// use tontine_ledger::month::parse_date;
    ///
    /// let config = ProjectConfig::default();
    /// let calc = AccrualCalculator::new(&config);
    /// let enrolled = parse_date("2025-10-15").unwrap();
    ///
    /// // October 2025 is a flat 30000, plus 15 days of November at 2000.
    /// let due = calc.due_total_as_of(parse_date("2025-11-15").unwrap(), enrolled);
    /// assert_eq!(due, Amount::new(60_000));
    /// ```
    pub fn due_total_as_of(&self, asof: NaiveDate, enrollment: NaiveDate) -> Amount {
        let always_active = [ActivityInterval::open(enrollment)];
        self.total_due(asof, enrollment, &always_active)
    }

    /// Cumulative amount owed by `member` as of `asof`, counting only the
    /// days inside the member's activity intervals.
    pub fn due_total_for(&self, member: &Member, asof: NaiveDate) -> Amount {
        self.total_due(asof, member.enrollment_date, member.activity())
    }

    /// Per-month amounts owed by `member` as of `asof`, chronological.
    pub fn monthly_schedule(&self, member: &Member, asof: NaiveDate) -> Vec<(YearMonth, Amount)> {
        let asof = self.config.effective_as_of(asof);
        if asof < member.enrollment_date {
            return Vec::new();
        }
        YearMonth::range_inclusive(YearMonth::of(member.enrollment_date), YearMonth::of(asof))
            .map(|month| {
                let due = self.month_due(month, asof, member.enrollment_date, member.activity());
                (month, due)
            })
            .collect()
    }

    fn total_due(
        &self,
        asof: NaiveDate,
        enrollment: NaiveDate,
        activity: &[ActivityInterval],
    ) -> Amount {
        let asof = self.config.effective_as_of(asof);
        if asof < enrollment {
            return Amount::ZERO;
        }
        YearMonth::range_inclusive(YearMonth::of(enrollment), YearMonth::of(asof))
            .map(|month| self.month_due(month, asof, enrollment, activity))
            .sum()
    }

    /// `asof` must already be clamped.
    fn month_due(
        &self,
        month: YearMonth,
        asof: NaiveDate,
        enrollment: NaiveDate,
        activity: &[ActivityInterval],
    ) -> Amount {
        let enrollment_month = YearMonth::of(enrollment);
        if month < enrollment_month {
            return Amount::ZERO;
        }

        let window_start = month.first_day().max(enrollment);

        match self.config.month_rule(month) {
            MonthRule::FixedFee(fee) => {
                if enrollment_month != month || asof < month.last_day() {
                    return Amount::ZERO;
                }
                let was_active = activity
                    .iter()
                    .any(|i| i.clip(window_start, month.last_day()).is_some());
                if was_active {
                    fee
                } else {
                    Amount::ZERO
                }
            }
            MonthRule::Prorated => {
                let window_end = month.last_day().min(asof);
                if window_end < window_start {
                    return Amount::ZERO;
                }
                let days: u64 = activity
                    .iter()
                    .filter_map(|i| i.clip(window_start, window_end))
                    .map(|(start, end)| inclusive_days(start, end))
                    .sum();
                self.config
                    .daily_amount()
                    .times(days)
                    .min(self.config.monthly_cap())
            }
        }
    }
}
