//! Contribution ledger.
//!
//! [`Ledger`] owns the current [`ProjectConfig`] snapshot and a
//! [`RecordStore`], and reconciles what members owe against what they paid.
//! Every query takes an explicit as-of date which is clamped to the project
//! stop date, so historical views stay reproducible.
//!
//! Journals are streamed from CSV one row at a time. Invalid rows and
//! rejected operations are logged at warn level and skipped, so one bad line
//! never aborts a replay.

use crate::accrual::AccrualCalculator;
use crate::amount::Amount;
use crate::config::ProjectConfig;
use crate::error::{Result, TontineError};
use crate::guard::BankTransferGuard;
use crate::member::{validate_phone, Member, MemberId};
use crate::month::{YearMonth, DATE_FORMAT};
use crate::record::{
    BankDeposit, Channel, DepositId, JournalEntry, JournalRecord, NewDeposit, NewPayment,
    Payment, PaymentId,
};
use crate::store::{MemoryStore, RecordStore};
use crate::summary::{
    ChannelTotals, MemberStatus, MonthJournal, MonthlyCollection, SchemeTotals, Standing,
};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// The tontine ledger.
///
/// Mutations take `&mut self`, so a single `Ledger` value is its own
/// single-writer lock: a deposit's balance check and its insertion can never
/// be interleaved with another write. Use [`crate::SharedLedger`] to share
/// one ledger between threads.
pub struct Ledger<S = MemoryStore> {
    config: ProjectConfig,
    store: S,
}

impl Ledger<MemoryStore> {
    /// Creates a ledger backed by an empty in-memory store.
    pub fn new(config: ProjectConfig) -> Self {
        Ledger::with_store(config, MemoryStore::new())
    }
}

impl<S: RecordStore> Ledger<S> {
    pub fn with_store(config: ProjectConfig, store: S) -> Self {
        Ledger { config, store }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Accrual calculator over the current config snapshot.
    pub fn calculator(&self) -> AccrualCalculator<'_> {
        AccrualCalculator::new(&self.config)
    }

    /// Swaps in a new configuration snapshot.
    pub fn replace_config(&mut self, config: ProjectConfig) {
        info!("Replacing project configuration");
        self.config = config;
    }

    /// Freezes all calculations at `date`.
    pub fn stop_project(&mut self, date: NaiveDate) {
        info!("Project stopped at {}", date.format(DATE_FORMAT));
        self.config = self.config.stopped(date);
    }

    /// Clears the stop date.
    pub fn resume_project(&mut self) {
        info!("Project resumed");
        self.config = self.config.resumed();
    }

    // ==================== MEMBERS ====================

    /// Enrolls a member. The phone is the member's unique identity.
    pub fn enroll_member(
        &mut self,
        full_name: &str,
        phone: &str,
        enrollment_date: NaiveDate,
    ) -> Result<MemberId> {
        let full_name = non_blank_name(full_name)?;
        let phone = validate_phone(phone)?;

        let id = self
            .store
            .insert_member(full_name, phone, enrollment_date)?;
        debug!(
            "Enrolled member {} from {}",
            id,
            enrollment_date.format(DATE_FORMAT)
        );
        Ok(id)
    }

    /// Renames a member and/or changes their phone. `None` leaves a field
    /// unchanged.
    pub fn update_member(
        &mut self,
        id: MemberId,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<()> {
        let full_name = full_name.map(non_blank_name).transpose()?;
        let phone = phone.map(validate_phone).transpose()?;
        self.member(id)?;

        if let Some(phone) = phone {
            self.store.change_phone(id, phone)?;
        }
        if let Some(full_name) = full_name {
            self.member_mut(id)?.full_name = full_name;
        }
        Ok(())
    }

    /// Stops a member's accrual from `date`. Returns `false` if the member
    /// was already inactive.
    pub fn deactivate_member(&mut self, id: MemberId, date: NaiveDate) -> Result<bool> {
        Ok(self.member_mut(id)?.deactivate(date))
    }

    /// Resumes a member's accrual from `date`. Returns `false` if the member
    /// was already active.
    pub fn activate_member(&mut self, id: MemberId, date: NaiveDate) -> Result<bool> {
        Ok(self.member_mut(id)?.activate(date))
    }

    pub fn member(&self, id: MemberId) -> Result<&Member> {
        self.store
            .member(id)
            .ok_or_else(|| TontineError::UnknownMember(id.to_string()))
    }

    pub fn member_by_phone(&self, phone: &str) -> Result<&Member> {
        self.store
            .member_by_phone(phone.trim())
            .ok_or_else(|| TontineError::UnknownMember(phone.trim().to_string()))
    }

    fn member_mut(&mut self, id: MemberId) -> Result<&mut Member> {
        self.store
            .member_mut(id)
            .ok_or_else(|| TontineError::UnknownMember(id.to_string()))
    }

    // ==================== PAYMENTS & DEPOSITS ====================

    /// Records a member payment.
    pub fn record_payment(&mut self, payment: NewPayment) -> Result<PaymentId> {
        if payment.amount.is_zero() {
            return Err(TontineError::InvalidAmount(payment.amount.to_string()));
        }
        self.member(payment.member_id)?;

        let member = payment.member_id;
        let amount = payment.amount;
        let id = self.store.insert_payment(payment);
        debug!("Recorded payment of {} from member {}", amount, member);
        Ok(id)
    }

    pub fn delete_payment(&mut self, id: PaymentId) -> Option<Payment> {
        let removed = self.store.delete_payment(id);
        if removed.is_none() {
            debug!("Payment {} not found, nothing deleted", id.0);
        }
        removed
    }

    /// Checks that `amount` can be moved to the bank on `asof`.
    ///
    /// The ceiling is the cash collected up to `asof` (clamped to the stop
    /// date) minus every deposit already recorded, whatever its date. A
    /// deposit dated after `asof` has already left the cash box.
    pub fn validate_deposit(&self, amount: Amount, asof: NaiveDate) -> Result<()> {
        BankTransferGuard::check(amount, &self.deposit_headroom(asof))
    }

    fn deposit_headroom(&self, asof: NaiveDate) -> SchemeTotals {
        let asof = self.config.effective_as_of(asof);
        SchemeTotals::new(
            self.store.collected_until(asof),
            self.store.deposited_total(),
        )
    }

    /// Validates and inserts a bank deposit in one step.
    ///
    /// The deposit is checked against the cash on hand on its own date while
    /// `self` is exclusively borrowed, so nothing can change the balance
    /// between the check and the insertion. Accepted deposits therefore never
    /// exceed the cash collected, on any date.
    pub fn record_deposit(&mut self, deposit: NewDeposit) -> Result<DepositId> {
        if deposit.amount.is_zero() {
            return Err(TontineError::InvalidAmount(deposit.amount.to_string()));
        }
        self.validate_deposit(deposit.amount, deposit.dep_date)?;

        let amount = deposit.amount;
        let id = self.store.insert_deposit(deposit);
        debug!("Deposited {} to the bank", amount);
        Ok(id)
    }

    pub fn delete_deposit(&mut self, id: DepositId) -> Option<BankDeposit> {
        self.store.delete_deposit(id)
    }

    // ==================== RECONCILIATION ====================

    /// Sum of a member's payments dated on or before `asof`.
    ///
    /// Payments made while the member was inactive still count.
    pub fn paid_total_as_of(&self, member: MemberId, asof: NaiveDate) -> Result<Amount> {
        self.member(member)?;
        let asof = self.config.effective_as_of(asof);
        Ok(self.store.member_paid_until(member, asof))
    }

    /// Due/paid reconciliation for one member.
    ///
    /// A currently inactive member is reported as all zeros with status
    /// `inactive`.
    pub fn status(&self, member: MemberId, asof: NaiveDate) -> Result<MemberStatus> {
        let member = self.member(member)?;
        Ok(self.status_of(member, asof))
    }

    fn status_of(&self, member: &Member, asof: NaiveDate) -> MemberStatus {
        if !member.is_active() {
            return MemberStatus::inactive();
        }
        let asof = self.config.effective_as_of(asof);
        let due = self.calculator().due_total_for(member, asof);
        let paid = self.store.member_paid_until(member.id, asof);
        MemberStatus::reconcile(due, paid)
    }

    /// Status of every member, ordered by id.
    pub fn statuses(&self, asof: NaiveDate) -> Vec<(&Member, MemberStatus)> {
        self.store
            .members()
            .map(|m| (m, self.status_of(m, asof)))
            .collect()
    }

    /// Active members in arrears, smallest arrears first.
    pub fn overdue(&self, asof: NaiveDate) -> Vec<(&Member, MemberStatus)> {
        let mut late: Vec<_> = self
            .statuses(asof)
            .into_iter()
            .filter(|(m, status)| m.is_active() && !status.rest.is_zero())
            .collect();
        late.sort_by_key(|(m, status)| (status.rest, m.id));
        late
    }

    /// Collected, deposited and available cash as of `asof`.
    pub fn scheme_totals_as_of(&self, asof: NaiveDate) -> SchemeTotals {
        let asof = self.config.effective_as_of(asof);
        SchemeTotals::new(
            self.store.collected_until(asof),
            self.store.deposited_until(asof),
        )
    }

    /// Scheme-wide collections per channel as of `asof`.
    pub fn channel_totals_as_of(&self, asof: NaiveDate) -> ChannelTotals {
        let asof = self.config.effective_as_of(asof);
        let mut totals = ChannelTotals::default();
        for payment in self.store.payments().filter(|p| p.pay_date <= asof) {
            totals.add(payment.channel, payment.amount);
        }
        totals
    }

    /// Collections per calendar month.
    ///
    /// Every month from the project start through `asof` is present, zero
    /// filled. Months outside that range appear when they hold payments, so
    /// no payment dated on or before `asof` is ever left out.
    pub fn monthly_breakdown(&self, asof: NaiveDate) -> BTreeMap<YearMonth, MonthlyCollection> {
        let asof = self.config.effective_as_of(asof);
        let mut months: BTreeMap<YearMonth, MonthlyCollection> = YearMonth::range_inclusive(
            YearMonth::of(self.config.start_date()),
            YearMonth::of(asof),
        )
        .map(|month| (month, MonthlyCollection::default()))
        .collect();

        for payment in self.store.payments().filter(|p| p.pay_date <= asof) {
            months
                .entry(YearMonth::of(payment.pay_date))
                .or_default()
                .add(payment);
        }
        months
    }

    /// Payments and bank deposits dated within `month`.
    pub fn month_journal(&self, month: YearMonth) -> MonthJournal<'_> {
        let mut payments: Vec<&Payment> = self
            .store
            .payments()
            .filter(|p| month.contains(p.pay_date))
            .collect();
        payments.sort_by(|a, b| (b.pay_date, b.id).cmp(&(a.pay_date, a.id)));

        let mut deposits: Vec<&BankDeposit> = self
            .store
            .deposits()
            .filter(|d| month.contains(d.dep_date))
            .collect();
        deposits.sort_by(|a, b| (b.dep_date, b.id).cmp(&(a.dep_date, a.id)));

        let mut collected = MonthlyCollection::default();
        for payment in &payments {
            collected.add(payment);
        }
        let deposited = deposits.iter().map(|d| d.amount).sum();

        MonthJournal {
            month,
            payments,
            deposits,
            collected,
            deposited,
        }
    }

    // ==================== JOURNAL ====================

    /// Applies journal rows from a CSV reader in streaming fashion.
    ///
    /// Records are read one at a time. Invalid rows and rejected operations
    /// (unknown member, duplicate phone, deposit above the available cash)
    /// are logged at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<JournalRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse() {
                    Ok(entry) => {
                        if let Err(e) = self.apply(entry) {
                            warn!("Row {}: {}", row_num, e);
                        }
                    }
                    Err(e) => warn!("Row {}: {}", row_num, e),
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Applies a single journal entry.
    ///
    /// Bank deposits are checked against the cash available on their own
    /// date.
    pub fn apply(&mut self, entry: JournalEntry) -> Result<()> {
        match entry {
            JournalEntry::Enroll {
                phone,
                full_name,
                enrollment_date,
            } => {
                self.enroll_member(&full_name, &phone, enrollment_date)?;
            }
            JournalEntry::UpdateMember {
                phone,
                full_name,
                new_phone,
            } => {
                let id = self.member_by_phone(&phone)?.id;
                self.update_member(id, full_name.as_deref(), new_phone.as_deref())?;
            }
            JournalEntry::Deactivate { phone, date } => {
                let id = self.member_by_phone(&phone)?.id;
                if !self.deactivate_member(id, date)? {
                    debug!("Member {} already inactive, ignoring", id);
                }
            }
            JournalEntry::Activate { phone, date } => {
                let id = self.member_by_phone(&phone)?.id;
                if !self.activate_member(id, date)? {
                    debug!("Member {} already active, ignoring", id);
                }
            }
            JournalEntry::Payment {
                phone,
                pay_date,
                amount,
                channel,
                reference,
            } => {
                let member_id = self.member_by_phone(&phone)?.id;
                self.record_payment(NewPayment {
                    member_id,
                    pay_date,
                    amount,
                    channel,
                    reference,
                    note: None,
                })?;
            }
            JournalEntry::BankDeposit {
                dep_date,
                amount,
                reference,
            } => {
                self.record_deposit(NewDeposit {
                    dep_date,
                    amount,
                    reference,
                    note: None,
                })?;
            }
            JournalEntry::Stop { date } => self.stop_project(date),
            JournalEntry::Resume => self.resume_project(),
        }
        Ok(())
    }

    // ==================== REPORTS ====================

    /// Writes every member's status as of `asof` to CSV, ordered by id.
    pub fn write_statuses<W: Write>(&self, writer: W, asof: NaiveDate) -> Result<()> {
        self.write_status_rows(writer, self.statuses(asof))
    }

    /// Writes the active members in arrears, smallest arrears first.
    pub fn write_overdue<W: Write>(&self, writer: W, asof: NaiveDate) -> Result<()> {
        self.write_status_rows(writer, self.overdue(asof))
    }

    fn write_status_rows<W: Write>(
        &self,
        writer: W,
        rows: Vec<(&Member, MemberStatus)>,
    ) -> Result<()> {
        let mut csv_writer = report_writer(writer);

        csv_writer.write_record([
            "member", "name", "phone", "due", "paid", "balance", "rest", "avance", "status",
        ])?;

        for (member, status) in rows {
            csv_writer.serialize(StatusRow {
                member: member.id,
                name: &member.full_name,
                phone: member.phone(),
                due: status.due,
                paid: status.paid,
                balance: status.balance,
                rest: status.rest,
                avance: status.avance,
                status: status.status,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the monthly collection breakdown as of `asof`.
    pub fn write_monthly_breakdown<W: Write>(&self, writer: W, asof: NaiveDate) -> Result<()> {
        let mut csv_writer = report_writer(writer);

        csv_writer.write_record(["month", "total", "wave", "om", "cash"])?;

        for (month, collection) in self.monthly_breakdown(asof) {
            let channels = collection.channels;
            csv_writer.serialize((
                month,
                collection.total,
                channels.wave,
                channels.om,
                channels.cash,
            ))?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the scheme cash position and channel totals as of `asof`.
    pub fn write_totals<W: Write>(&self, writer: W, asof: NaiveDate) -> Result<()> {
        let mut csv_writer = report_writer(writer);
        let totals = self.scheme_totals_as_of(asof);
        let channels = self.channel_totals_as_of(asof);

        csv_writer.write_record([
            "as_of", "collected", "deposited", "available", "wave", "om", "cash",
        ])?;
        csv_writer.serialize((
            self.config.effective_as_of(asof),
            totals.collected,
            totals.deposited,
            totals.available,
            channels.wave,
            channels.om,
            channels.cash,
        ))?;

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the payments and bank deposits of `month`, oldest first.
    pub fn write_month_journal<W: Write>(&self, writer: W, month: YearMonth) -> Result<()> {
        let mut csv_writer = report_writer(writer);
        let journal = self.month_journal(month);

        csv_writer.write_record([
            "kind", "date", "name", "phone", "amount", "channel", "reference", "note",
        ])?;

        for payment in journal.payments.iter().rev() {
            let member = self.store.member(payment.member_id);
            csv_writer.serialize(JournalRow {
                kind: "payment",
                date: payment.pay_date,
                name: member.map_or("", |m| m.full_name.as_str()),
                phone: member.map_or("", Member::phone),
                amount: payment.amount,
                channel: Some(payment.channel),
                reference: payment.reference.as_deref(),
                note: payment.note.as_deref(),
            })?;
        }

        for deposit in journal.deposits.iter().rev() {
            csv_writer.serialize(JournalRow {
                kind: "bank_deposit",
                date: deposit.dep_date,
                name: "",
                phone: "",
                amount: deposit.amount,
                channel: None,
                reference: deposit.reference.as_deref(),
                note: deposit.note.as_deref(),
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

/// Row of the status and overdue reports.
#[derive(Serialize)]
struct StatusRow<'a> {
    member: MemberId,
    name: &'a str,
    phone: &'a str,
    due: Amount,
    paid: Amount,
    balance: i64,
    rest: Amount,
    avance: Amount,
    status: Standing,
}

/// Row of the month journal report.
#[derive(Serialize)]
struct JournalRow<'a> {
    kind: &'static str,
    date: NaiveDate,
    name: &'a str,
    phone: &'a str,
    amount: Amount,
    channel: Option<Channel>,
    reference: Option<&'a str>,
    note: Option<&'a str>,
}

/// CSV writer whose header row is written explicitly, so empty reports
/// still carry one.
fn report_writer<W: Write>(writer: W) -> csv::Writer<W> {
    WriterBuilder::new().has_headers(false).from_writer(writer)
}

impl Default for Ledger<MemoryStore> {
    fn default() -> Self {
        Self::new(ProjectConfig::default())
    }
}

fn non_blank_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TontineError::EmptyName);
    }
    Ok(name.to_string())
}
