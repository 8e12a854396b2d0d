//! Project configuration snapshots.
//!
//! A [`ProjectConfig`] is an immutable value: administrative changes (new
//! rates, stopping or resuming the project) build a new snapshot which the
//! ledger swaps in whole. Calculations therefore only ever see one consistent
//! set of parameters.

use crate::amount::Amount;
use crate::error::{Result, TontineError};
use crate::month::{parse_date, YearMonth, DATE_FORMAT};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

pub const DEFAULT_START_DATE: &str = "2025-10-15";
pub const DEFAULT_DAILY_AMOUNT: u64 = 2_000;
pub const DEFAULT_MONTHLY_CAP: u64 = 60_000;
pub const DEFAULT_OCTOBER_2025_FEE: u64 = 30_000;

const MONTH_OVERRIDE_PREFIX: &str = "month_override.";

/// How a calendar month accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthRule {
    /// Daily rate times active days, capped at the monthly cap.
    Prorated,

    /// A flat fee charged once the month is over, only to members who
    /// enrolled during that month.
    FixedFee(Amount),
}

impl MonthRule {
    fn parse(key: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("prorated") {
            return Ok(MonthRule::Prorated);
        }
        match value.split_once(':') {
            Some((kind, fee)) if kind.trim().eq_ignore_ascii_case("fixed") => {
                Ok(MonthRule::FixedFee(positive_setting(key, fee)?))
            }
            _ => Err(TontineError::InvalidSetting {
                key: key.to_string(),
                message: format!("expected 'prorated' or 'fixed:<amount>', got '{}'", value),
            }),
        }
    }
}

/// Lifecycle of the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectState {
    /// Contributions keep accruing day by day.
    Active,

    /// Time is frozen at the given stop date.
    Stopped(NaiveDate),
}

/// Static parameters of the savings scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    start_date: NaiveDate,
    stop_date: Option<NaiveDate>,
    daily_amount: Amount,
    monthly_cap: Amount,
    month_overrides: BTreeMap<YearMonth, MonthRule>,
}

/// Raw `key,value` row of a settings file.
#[derive(Debug, Deserialize)]
struct SettingRecord {
    key: String,
    #[serde(default)]
    value: String,
}

impl ProjectConfig {
    /// Creates an active configuration without month overrides.
    ///
    /// Both amounts must be strictly positive.
    pub fn new(start_date: NaiveDate, daily_amount: Amount, monthly_cap: Amount) -> Result<Self> {
        if daily_amount.is_zero() {
            return Err(TontineError::InvalidAmount(daily_amount.to_string()));
        }
        if monthly_cap.is_zero() {
            return Err(TontineError::InvalidAmount(monthly_cap.to_string()));
        }
        Ok(ProjectConfig {
            start_date,
            stop_date: None,
            daily_amount,
            monthly_cap,
            month_overrides: BTreeMap::new(),
        })
    }

    /// Returns a copy with `rule` applied to `month`.
    pub fn with_month_rule(mut self, month: YearMonth, rule: MonthRule) -> Self {
        match rule {
            MonthRule::Prorated => {
                self.month_overrides.remove(&month);
            }
            MonthRule::FixedFee(_) => {
                self.month_overrides.insert(month, rule);
            }
        }
        self
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn stop_date(&self) -> Option<NaiveDate> {
        self.stop_date
    }

    pub fn daily_amount(&self) -> Amount {
        self.daily_amount
    }

    pub fn monthly_cap(&self) -> Amount {
        self.monthly_cap
    }

    /// Accrual rule for `month`, `Prorated` unless overridden.
    pub fn month_rule(&self, month: YearMonth) -> MonthRule {
        self.month_overrides
            .get(&month)
            .copied()
            .unwrap_or(MonthRule::Prorated)
    }

    pub fn month_overrides(&self) -> &BTreeMap<YearMonth, MonthRule> {
        &self.month_overrides
    }

    pub fn state(&self) -> ProjectState {
        match self.stop_date {
            Some(date) => ProjectState::Stopped(date),
            None => ProjectState::Active,
        }
    }

    /// Snapshot with the project stopped at `date`.
    pub fn stopped(&self, date: NaiveDate) -> Self {
        ProjectConfig {
            stop_date: Some(date),
            ..self.clone()
        }
    }

    /// Snapshot with the stop date cleared.
    pub fn resumed(&self) -> Self {
        ProjectConfig {
            stop_date: None,
            ..self.clone()
        }
    }

    /// The date calculations are evaluated at: `min(asof, stop_date)`.
    pub fn effective_as_of(&self, asof: NaiveDate) -> NaiveDate {
        match self.stop_date {
            Some(stop) => asof.min(stop),
            None => asof,
        }
    }

    /// Builds a snapshot from key/value settings, starting from the defaults.
    ///
    /// Unknown keys are logged and ignored.
    pub fn from_settings<I, K, V>(settings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = ProjectConfig::default();

        for (key, value) in settings {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();

            match key {
                "project_start_date" => {
                    config.start_date = date_setting(key, value)?;
                }
                "project_end_date" => {
                    config.stop_date = if value.is_empty() {
                        None
                    } else {
                        Some(date_setting(key, value)?)
                    };
                }
                "daily_amount" => {
                    config.daily_amount = positive_setting(key, value)?;
                }
                "monthly_cap" => {
                    config.monthly_cap = positive_setting(key, value)?;
                }
                "oct_2025_fixed" => {
                    let fee = positive_setting(key, value)?;
                    config = config.with_month_rule(october_2025(), MonthRule::FixedFee(fee));
                }
                _ => match key.strip_prefix(MONTH_OVERRIDE_PREFIX) {
                    Some(month) => {
                        let month: YearMonth =
                            month.parse().map_err(|_| TontineError::InvalidSetting {
                                key: key.to_string(),
                                message: "month must be YYYY-MM".to_string(),
                            })?;
                        let rule = MonthRule::parse(key, value)?;
                        config = config.with_month_rule(month, rule);
                    }
                    None => warn!("Ignoring unknown setting '{}'", key),
                },
            }
            debug!("Setting {} = '{}'", key, value);
        }

        info!(
            "Project config: start {}, {} per day, cap {} per month, {} month override(s), stop {}",
            config.start_date.format(DATE_FORMAT),
            config.daily_amount,
            config.monthly_cap,
            config.month_overrides.len(),
            config
                .stop_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string())
        );

        Ok(config)
    }

    /// Reads a `key,value` settings CSV and builds a snapshot from it.
    pub fn from_settings_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut pairs = Vec::new();
        for result in csv_reader.deserialize::<SettingRecord>() {
            let record = result?;
            pairs.push((record.key, record.value));
        }

        ProjectConfig::from_settings(pairs)
    }
}

impl Default for ProjectConfig {
    /// The scheme as originally launched: 2000 per day from 2025-10-15,
    /// capped at 60000 per month, October 2025 billed as a flat 30000.
    fn default() -> Self {
        ProjectConfig {
            start_date: NaiveDate::from_ymd_opt(2025, 10, 15).unwrap_or(NaiveDate::MIN),
            stop_date: None,
            daily_amount: Amount::new(DEFAULT_DAILY_AMOUNT),
            monthly_cap: Amount::new(DEFAULT_MONTHLY_CAP),
            month_overrides: BTreeMap::from([(
                october_2025(),
                MonthRule::FixedFee(Amount::new(DEFAULT_OCTOBER_2025_FEE)),
            )]),
        }
    }
}

fn october_2025() -> YearMonth {
    YearMonth::of(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or(NaiveDate::MIN))
}

fn date_setting(key: &str, value: &str) -> Result<NaiveDate> {
    parse_date(value).map_err(|e| TontineError::InvalidSetting {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn positive_setting(key: &str, value: &str) -> Result<Amount> {
    Amount::parse_positive(value).map_err(|e| TontineError::InvalidSetting {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_matches_launch_parameters() {
        let config = ProjectConfig::default();
        assert_eq!(config.start_date(), date(DEFAULT_START_DATE));
        assert_eq!(config.daily_amount(), Amount::new(2000));
        assert_eq!(config.monthly_cap(), Amount::new(60_000));
        assert_eq!(
            config.month_rule(ym("2025-10")),
            MonthRule::FixedFee(Amount::new(30_000))
        );
        assert_eq!(config.month_rule(ym("2025-11")), MonthRule::Prorated);
        assert_eq!(config.state(), ProjectState::Active);
    }

    #[test]
    fn test_new_rejects_zero_amounts() {
        let start = date("2025-01-01");
        assert!(ProjectConfig::new(start, Amount::ZERO, Amount::new(10)).is_err());
        assert!(ProjectConfig::new(start, Amount::new(10), Amount::ZERO).is_err());
        assert!(ProjectConfig::new(start, Amount::new(10), Amount::new(100)).is_ok());
    }

    #[test]
    fn test_stop_and_resume_produce_new_snapshots() {
        let active = ProjectConfig::default();
        let stopped = active.stopped(date("2025-11-20"));

        assert_eq!(active.state(), ProjectState::Active);
        assert_eq!(stopped.state(), ProjectState::Stopped(date("2025-11-20")));
        assert_eq!(stopped.effective_as_of(date("2025-12-31")), date("2025-11-20"));
        assert_eq!(stopped.effective_as_of(date("2025-11-01")), date("2025-11-01"));

        let resumed = stopped.resumed();
        assert_eq!(resumed, active);
        assert_eq!(resumed.effective_as_of(date("2025-12-31")), date("2025-12-31"));
    }

    #[test]
    fn test_prorated_rule_removes_override() {
        let config = ProjectConfig::default().with_month_rule(ym("2025-10"), MonthRule::Prorated);
        assert!(config.month_overrides().is_empty());
    }

    #[test]
    fn test_from_settings() {
        let config = ProjectConfig::from_settings([
            ("project_start_date", "2026-01-01"),
            ("daily_amount", "1500"),
            ("monthly_cap", "40000"),
            ("oct_2025_fixed", "25000"),
            ("month_override.2026-02", "fixed:10000"),
            ("project_end_date", "2026-06-30"),
            ("theme", "dark"),
        ])
        .unwrap();

        assert_eq!(config.start_date(), date("2026-01-01"));
        assert_eq!(config.daily_amount(), Amount::new(1500));
        assert_eq!(config.monthly_cap(), Amount::new(40_000));
        assert_eq!(
            config.month_rule(ym("2025-10")),
            MonthRule::FixedFee(Amount::new(25_000))
        );
        assert_eq!(
            config.month_rule(ym("2026-02")),
            MonthRule::FixedFee(Amount::new(10_000))
        );
        assert_eq!(config.stop_date(), Some(date("2026-06-30")));
    }

    #[test]
    fn test_from_settings_empty_end_date_means_active() {
        let config = ProjectConfig::from_settings([("project_end_date", "")]).unwrap();
        assert_eq!(config.state(), ProjectState::Active);
    }

    #[test]
    fn test_from_settings_rejects_bad_values() {
        assert!(matches!(
            ProjectConfig::from_settings([("daily_amount", "0")]),
            Err(TontineError::InvalidSetting { .. })
        ));
        assert!(ProjectConfig::from_settings([("monthly_cap", "12.5")]).is_err());
        assert!(ProjectConfig::from_settings([("project_start_date", "2025-02-30")]).is_err());
        assert!(ProjectConfig::from_settings([("month_override.2025-13", "prorated")]).is_err());
        assert!(ProjectConfig::from_settings([("month_override.2025-12", "weekly")]).is_err());
    }

    #[test]
    fn test_from_settings_csv() {
        let csv = "key,value\n daily_amount , 2500 \nmonth_override.2025-10,prorated\nproject_end_date,\n";
        let config = ProjectConfig::from_settings_csv(Cursor::new(csv)).unwrap();

        assert_eq!(config.daily_amount(), Amount::new(2500));
        assert_eq!(config.month_rule(ym("2025-10")), MonthRule::Prorated);
        assert_eq!(config.stop_date(), None);
    }
}
