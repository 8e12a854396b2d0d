//! Record store seam.
//!
//! The ledger only needs a handful of capabilities from persistence: members
//! keyed by id and unique phone, plus insert/delete/scan of payments and bank
//! deposits. [`RecordStore`] names those capabilities; [`MemoryStore`] is the
//! in-process implementation used by the CLI and the tests.

use crate::amount::Amount;
use crate::error::{Result, TontineError};
use crate::member::{Member, MemberId};
use crate::record::{BankDeposit, DepositId, NewDeposit, NewPayment, Payment, PaymentId};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Persistence capabilities the ledger relies on.
///
/// Implementations must keep phone numbers unique across members and hand
/// out ids that increase with insertion order.
pub trait RecordStore {
    /// Inserts a member, assigning its id.
    ///
    /// Fails with [`TontineError::DuplicateIdentity`] if the phone is taken.
    fn insert_member(
        &mut self,
        full_name: String,
        phone: String,
        enrollment_date: NaiveDate,
    ) -> Result<MemberId>;

    fn member(&self, id: MemberId) -> Option<&Member>;

    fn member_mut(&mut self, id: MemberId) -> Option<&mut Member>;

    fn member_by_phone(&self, phone: &str) -> Option<&Member>;

    /// All members ordered by id.
    fn members(&self) -> Box<dyn Iterator<Item = &Member> + '_>;

    /// Changes a member's phone, keeping phones unique.
    fn change_phone(&mut self, id: MemberId, phone: String) -> Result<()>;

    fn insert_payment(&mut self, payment: NewPayment) -> PaymentId;

    fn delete_payment(&mut self, id: PaymentId) -> Option<Payment>;

    /// All payments ordered by id.
    fn payments(&self) -> Box<dyn Iterator<Item = &Payment> + '_>;

    fn insert_deposit(&mut self, deposit: NewDeposit) -> DepositId;

    fn delete_deposit(&mut self, id: DepositId) -> Option<BankDeposit>;

    /// All bank deposits ordered by id.
    fn deposits(&self) -> Box<dyn Iterator<Item = &BankDeposit> + '_>;

    /// Sum of one member's payments dated on or before `until`.
    fn member_paid_until(&self, member: MemberId, until: NaiveDate) -> Amount {
        self.payments()
            .filter(|p| p.member_id == member && p.pay_date <= until)
            .map(|p| p.amount)
            .sum()
    }

    /// Sum of all payments dated on or before `until`.
    fn collected_until(&self, until: NaiveDate) -> Amount {
        self.payments()
            .filter(|p| p.pay_date <= until)
            .map(|p| p.amount)
            .sum()
    }

    /// Sum of every bank deposit, whatever its date.
    fn deposited_total(&self) -> Amount {
        self.deposits().map(|d| d.amount).sum()
    }

    /// Sum of all bank deposits dated on or before `until`.
    fn deposited_until(&self, until: NaiveDate) -> Amount {
        self.deposits()
            .filter(|d| d.dep_date <= until)
            .map(|d| d.amount)
            .sum()
    }
}

/// `BTreeMap`-backed store with sequential ids.
#[derive(Debug, Default)]
pub struct MemoryStore {
    members: BTreeMap<MemberId, Member>,
    phones: BTreeMap<String, MemberId>,
    payments: BTreeMap<PaymentId, Payment>,
    deposits: BTreeMap<DepositId, BankDeposit>,
    next_member: u32,
    next_payment: u32,
    next_deposit: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn insert_member(
        &mut self,
        full_name: String,
        phone: String,
        enrollment_date: NaiveDate,
    ) -> Result<MemberId> {
        if self.phones.contains_key(&phone) {
            return Err(TontineError::DuplicateIdentity(phone));
        }

        self.next_member += 1;
        let id = MemberId(self.next_member);
        self.phones.insert(phone.clone(), id);
        self.members
            .insert(id, Member::new(id, full_name, phone, enrollment_date));
        Ok(id)
    }

    fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    fn member_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.get_mut(&id)
    }

    fn member_by_phone(&self, phone: &str) -> Option<&Member> {
        self.phones.get(phone).and_then(|id| self.members.get(id))
    }

    fn members(&self) -> Box<dyn Iterator<Item = &Member> + '_> {
        Box::new(self.members.values())
    }

    fn change_phone(&mut self, id: MemberId, phone: String) -> Result<()> {
        match self.phones.get(&phone) {
            Some(owner) if *owner == id => return Ok(()),
            Some(_) => return Err(TontineError::DuplicateIdentity(phone)),
            None => {}
        }

        let member = self
            .members
            .get_mut(&id)
            .ok_or_else(|| TontineError::UnknownMember(id.to_string()))?;
        self.phones.insert(phone.clone(), id);
        let previous = member.set_phone(phone);
        self.phones.remove(&previous);
        Ok(())
    }

    fn insert_payment(&mut self, payment: NewPayment) -> PaymentId {
        self.next_payment += 1;
        let id = PaymentId(self.next_payment);
        self.payments.insert(id, Payment::from_new(id, payment));
        id
    }

    fn delete_payment(&mut self, id: PaymentId) -> Option<Payment> {
        self.payments.remove(&id)
    }

    fn payments(&self) -> Box<dyn Iterator<Item = &Payment> + '_> {
        Box::new(self.payments.values())
    }

    fn insert_deposit(&mut self, deposit: NewDeposit) -> DepositId {
        self.next_deposit += 1;
        let id = DepositId(self.next_deposit);
        self.deposits.insert(id, BankDeposit::from_new(id, deposit));
        id
    }

    fn delete_deposit(&mut self, id: DepositId) -> Option<BankDeposit> {
        self.deposits.remove(&id)
    }

    fn deposits(&self) -> Box<dyn Iterator<Item = &BankDeposit> + '_> {
        Box::new(self.deposits.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::month::parse_date;
    use crate::record::Channel;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn payment(member: MemberId, day: &str, amount: u64) -> NewPayment {
        NewPayment {
            member_id: member,
            pay_date: date(day),
            amount: Amount::new(amount),
            channel: Channel::Cash,
            reference: None,
            note: None,
        }
    }

    #[test]
    fn test_insert_member_rejects_duplicate_phone() {
        let mut store = MemoryStore::new();
        let first = store
            .insert_member("Awa".into(), "771234567".into(), date("2025-10-15"))
            .unwrap();
        assert_eq!(first, MemberId(1));

        let err = store
            .insert_member("Other".into(), "771234567".into(), date("2025-10-15"))
            .unwrap_err();
        assert!(matches!(err, TontineError::DuplicateIdentity(_)));
        assert_eq!(store.members().count(), 1);
    }

    #[test]
    fn test_change_phone_keeps_index_consistent() {
        let mut store = MemoryStore::new();
        let awa = store
            .insert_member("Awa".into(), "771234567".into(), date("2025-10-15"))
            .unwrap();
        let moussa = store
            .insert_member("Moussa".into(), "781234567".into(), date("2025-10-15"))
            .unwrap();

        assert!(matches!(
            store.change_phone(awa, "781234567".into()),
            Err(TontineError::DuplicateIdentity(_))
        ));
        store.change_phone(awa, "771234567".into()).unwrap();
        store.change_phone(awa, "701234567".into()).unwrap();

        assert!(store.member_by_phone("771234567").is_none());
        assert_eq!(store.member_by_phone("701234567").unwrap().id, awa);
        assert_eq!(store.member_by_phone("781234567").unwrap().id, moussa);

        store.member_mut(awa).unwrap().full_name = "Awa Sarr".into();
        let member = store.member_by_phone("701234567").unwrap();
        assert_eq!(member.phone(), "701234567");
        assert_eq!(member.full_name, "Awa Sarr");
    }

    #[test]
    fn test_payment_sums_respect_dates() {
        let mut store = MemoryStore::new();
        let a = MemberId(1);
        let b = MemberId(2);
        store.insert_payment(payment(a, "2025-10-20", 10_000));
        store.insert_payment(payment(a, "2025-11-05", 5_000));
        let late = store.insert_payment(payment(b, "2025-11-10", 7_000));

        assert_eq!(store.member_paid_until(a, date("2025-10-31")), Amount::new(10_000));
        assert_eq!(store.member_paid_until(a, date("2025-11-05")), Amount::new(15_000));
        assert_eq!(store.collected_until(date("2025-11-10")), Amount::new(22_000));

        assert!(store.delete_payment(late).is_some());
        assert!(store.delete_payment(late).is_none());
        assert_eq!(store.collected_until(date("2025-12-31")), Amount::new(15_000));
    }

    #[test]
    fn test_deposit_sums_respect_dates() {
        let mut store = MemoryStore::new();
        let first = store.insert_deposit(NewDeposit {
            dep_date: date("2025-11-01"),
            amount: Amount::new(20_000),
            reference: Some("BANK-1".into()),
            note: None,
        });
        store.insert_deposit(NewDeposit {
            dep_date: date("2025-12-01"),
            amount: Amount::new(5_000),
            reference: None,
            note: None,
        });

        assert_eq!(store.deposited_until(date("2025-11-30")), Amount::new(20_000));
        assert_eq!(store.deposited_until(date("2025-12-01")), Amount::new(25_000));
        assert_eq!(store.deposited_total(), Amount::new(25_000));
        assert_eq!(store.delete_deposit(first).unwrap().amount, Amount::new(20_000));
        assert_eq!(store.deposits().count(), 1);
    }
}
