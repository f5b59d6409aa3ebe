//! # Debtor Projection
//!
//! Debtor accounts are a read-side projection over the purchase ledger.
//!
//! ## Two Ways to Keep It Consistent
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  New active credit sale ──► apply_new_credit_sale()   O(1) fast path    │
//! │                             (nothing prior can be invalidated)          │
//! │                                                                         │
//! │  Edit / void / refund   ──► recompute()               full rebuild      │
//! │                             (totals, status or identity may have        │
//! │                              changed retroactively)                     │
//! │                                                                         │
//! │  recompute() rebuilds totalDue + purchaseIds from purchases and         │
//! │  carries totalPaid + lastPayment forward from the prior accounts:       │
//! │  payments are not derivable from purchases.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A negative balance (payments exceed what is due after a void or refund)
//! is kept as store credit. Nothing here clamps it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::identity::IdentityKey;
use crate::money::Money;
use crate::types::{Debtor, Purchase};
use crate::validation::validate_amount_within;

impl Debtor {
    /// Opens an account from the first credit purchase of a customer.
    fn open(purchase: &Purchase) -> Debtor {
        Debtor {
            id: Uuid::new_v4().to_string(),
            customer_name: purchase.customer_name.clone(),
            customer_phone: purchase.customer_phone.clone(),
            total_due: Money::zero(),
            total_paid: Money::zero(),
            purchase_ids: Vec::new(),
            created_at: purchase.created_at,
            last_purchase: purchase.date,
            last_payment: None,
        }
    }

    pub fn identity_key(&self) -> Option<IdentityKey> {
        IdentityKey::for_customer(&self.customer_name, &self.customer_phone)
    }

    /// Records a payment against the outstanding balance.
    ///
    /// # Errors
    /// `Validation` unless `0 < amount <= balance`. An account with a zero or
    /// negative balance accepts no payment.
    pub fn record_payment(&mut self, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        validate_amount_within("payment amount", amount, self.balance())?;

        self.total_paid += amount;
        self.last_payment = Some(now);
        Ok(())
    }

    /// Owes money and has not bought anything for longer than `after`.
    pub fn is_overdue(&self, now: DateTime<Utc>, after: Duration) -> bool {
        self.balance().is_positive() && now - self.last_purchase > after
    }
}

/// Incrementally adds a brand-new credit sale to its debtor account.
///
/// Returns the index of the touched account, or `None` when the purchase does
/// not count toward any debt (cash, closed, or no customer identity).
pub fn apply_new_credit_sale(debtors: &mut Vec<Debtor>, purchase: &Purchase) -> Option<usize> {
    if !purchase.counts_toward_debt() {
        return None;
    }
    let key = purchase.identity_key()?;

    let index = match debtors.iter().position(|d| d.identity_key().as_ref() == Some(&key)) {
        Some(index) => index,
        None => {
            debtors.push(Debtor::open(purchase));
            debtors.len() - 1
        }
    };

    let debtor = &mut debtors[index];
    if !debtor.purchase_ids.contains(&purchase.id) {
        debtor.total_due += purchase.total;
        debtor.purchase_ids.push(purchase.id.clone());
    }
    if purchase.date > debtor.last_purchase {
        debtor.last_purchase = purchase.date;
    }

    Some(index)
}

/// Per-identity sums over the active credit purchases.
struct CreditGroup<'a> {
    first: &'a Purchase,
    total: Money,
    ids: Vec<String>,
    last_purchase: DateTime<Utc>,
}

/// Rebuilds every debtor account from the purchase ledger.
///
/// - Every prior account is retained (a zero balance is a valid state),
///   keeping its `id`, `createdAt`, display name/phone, `totalPaid` and
///   `lastPayment`.
/// - `totalDue` and `purchaseIds` are rebuilt from active credit purchases
///   only; `lastPurchase` follows the newest of them when any exist.
/// - Identities seen for the first time are appended in order of their
///   first purchase.
///
/// Running it twice on the same inputs yields identical accounts.
pub fn recompute(prior: &[Debtor], purchases: &[Purchase]) -> Vec<Debtor> {
    let mut order: Vec<IdentityKey> = Vec::new();
    let mut groups: HashMap<IdentityKey, CreditGroup<'_>> = HashMap::new();

    for purchase in purchases.iter().filter(|p| p.counts_toward_debt()) {
        let Some(key) = purchase.identity_key() else {
            continue;
        };
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            CreditGroup {
                first: purchase,
                total: Money::zero(),
                ids: Vec::new(),
                last_purchase: purchase.date,
            }
        });
        group.total += purchase.total;
        group.ids.push(purchase.id.clone());
        if purchase.date > group.last_purchase {
            group.last_purchase = purchase.date;
        }
    }

    let mut rebuilt = Vec::with_capacity(prior.len() + order.len());

    for debtor in prior {
        let mut next = debtor.clone();
        match debtor.identity_key().and_then(|key| groups.remove(&key)) {
            Some(group) => {
                next.total_due = group.total;
                next.purchase_ids = group.ids;
                next.last_purchase = group.last_purchase;
            }
            None => {
                next.total_due = Money::zero();
                next.purchase_ids = Vec::new();
            }
        }
        rebuilt.push(next);
    }

    for key in order {
        if let Some(group) = groups.remove(&key) {
            let mut debtor = Debtor::open(group.first);
            debtor.total_due = group.total;
            debtor.purchase_ids = group.ids;
            debtor.last_purchase = group.last_purchase;
            rebuilt.push(debtor);
        }
    }

    rebuilt
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use crate::types::{PurchaseDraft, PurchaseItem};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn credit(name: &str, phone: &str, major: i64, when: &str) -> Purchase {
        let items = vec![PurchaseItem::new("g1", "Rice", Money::from_major(major), 1)];
        Purchase::from_draft(PurchaseDraft::credit(items, name, phone), at(when)).unwrap()
    }

    #[test]
    fn test_first_credit_sale_opens_account() {
        let mut debtors = Vec::new();
        let p = credit("Amina", "555-1", 200, "2026-03-01T09:00:00Z");

        assert_eq!(apply_new_credit_sale(&mut debtors, &p), Some(0));
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].total_due, Money::from_major(200));
        assert_eq!(debtors[0].total_paid, Money::zero());
        assert_eq!(debtors[0].balance(), Money::from_major(200));
        assert_eq!(debtors[0].purchase_ids, vec![p.id.clone()]);
    }

    #[test]
    fn test_incremental_sale_accumulates_and_is_not_double_counted() {
        let mut debtors = Vec::new();
        let a = credit("Amina", "555-1", 200, "2026-03-01T09:00:00Z");
        let b = credit("AMINA B", "555-1", 50, "2026-03-02T09:00:00Z");

        apply_new_credit_sale(&mut debtors, &a);
        apply_new_credit_sale(&mut debtors, &b);
        apply_new_credit_sale(&mut debtors, &b);

        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].total_due, Money::from_major(250));
        assert_eq!(debtors[0].last_purchase, b.date);
        assert_eq!(debtors[0].customer_name, "Amina");
    }

    #[test]
    fn test_cash_or_anonymous_sale_is_ignored() {
        let mut debtors = Vec::new();
        let mut cash = credit("Amina", "555-1", 10, "2026-03-01T09:00:00Z");
        cash.payment_type = crate::types::PaymentType::Cash;
        let anonymous = credit(" ", "", 10, "2026-03-01T09:00:00Z");

        assert_eq!(apply_new_credit_sale(&mut debtors, &cash), None);
        assert_eq!(apply_new_credit_sale(&mut debtors, &anonymous), None);
        assert!(debtors.is_empty());
    }

    #[test]
    fn test_recompute_preserves_payments_after_void() {
        let mut p = credit("Amina", "555-1", 200, "2026-03-01T09:00:00Z");
        let mut debtors = Vec::new();
        apply_new_credit_sale(&mut debtors, &p);
        debtors[0].record_payment(Money::from_major(80), at("2026-03-02T09:00:00Z")).unwrap();

        p.void("wrong customer", at("2026-03-03T09:00:00Z")).unwrap();
        let rebuilt = recompute(&debtors, std::slice::from_ref(&p));

        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].id, debtors[0].id);
        assert_eq!(rebuilt[0].total_due, Money::zero());
        assert_eq!(rebuilt[0].total_paid, Money::from_major(80));
        assert_eq!(rebuilt[0].balance(), Money::from_major(-80));
        assert!(rebuilt[0].is_in_credit());
        assert!(rebuilt[0].purchase_ids.is_empty());
    }

    #[test]
    fn test_recompute_matches_sum_of_active_credit() {
        let a = credit("Amina", "", 100, "2026-03-01T09:00:00Z");
        let b = credit("amina", "", 40, "2026-03-02T09:00:00Z");
        let mut c = credit("Bello", "777", 70, "2026-03-02T10:00:00Z");
        c.refund(Money::from_major(70), "returned", at("2026-03-02T11:00:00Z")).unwrap();
        let d = credit("Chidi", "888", 30, "2026-03-03T09:00:00Z");

        let rebuilt = recompute(&[], &[a.clone(), b.clone(), c, d.clone()]);

        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt[0].total_due, Money::from_major(140));
        assert_eq!(rebuilt[0].purchase_ids, vec![a.id, b.id]);
        assert_eq!(rebuilt[0].last_purchase, b.date);
        assert_eq!(rebuilt[1].customer_phone, "888");
        assert_eq!(rebuilt[1].purchase_ids, vec![d.id]);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let purchases = vec![
            credit("Amina", "555-1", 100, "2026-03-01T09:00:00Z"),
            credit("Bello", "", 40, "2026-03-02T09:00:00Z"),
        ];
        let once = recompute(&[], &purchases);
        let twice = recompute(&once, &purchases);

        assert_eq!(
            serde_json::to_vec(&once).unwrap(),
            serde_json::to_vec(&twice).unwrap()
        );
    }

    #[test]
    fn test_recompute_reattributes_on_identity_change() {
        let mut p = credit("Amina", "555-1", 100, "2026-03-01T09:00:00Z");
        let mut debtors = Vec::new();
        apply_new_credit_sale(&mut debtors, &p);

        p.customer_phone = "555-2".to_string();
        let rebuilt = recompute(&debtors, std::slice::from_ref(&p));

        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt[0].total_due, Money::zero());
        assert_eq!(rebuilt[1].customer_phone, "555-2");
        assert_eq!(rebuilt[1].total_due, Money::from_major(100));
    }

    #[test]
    fn test_record_payment_rules() {
        let p = credit("Amina", "555-1", 200, "2026-03-01T09:00:00Z");
        let mut debtors = Vec::new();
        apply_new_credit_sale(&mut debtors, &p);
        let debtor = &mut debtors[0];
        let now = at("2026-03-02T09:00:00Z");

        assert!(matches!(
            debtor.record_payment(Money::zero(), now),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(matches!(
            debtor.record_payment(Money::from_major(201), now),
            Err(CoreError::Validation(ValidationError::ExceedsLimit { .. }))
        ));

        debtor.record_payment(Money::from_major(80), now).unwrap();
        assert_eq!(debtor.total_paid, Money::from_major(80));
        assert_eq!(debtor.balance(), Money::from_major(120));
        assert_eq!(debtor.last_payment, Some(now));
    }

    #[test]
    fn test_is_overdue() {
        let p = credit("Amina", "555-1", 200, "2026-03-01T09:00:00Z");
        let mut debtors = Vec::new();
        apply_new_credit_sale(&mut debtors, &p);

        let window = Duration::days(30);
        assert!(!debtors[0].is_overdue(at("2026-03-20T09:00:00Z"), window));
        assert!(debtors[0].is_overdue(at("2026-04-01T09:00:00Z"), window));

        debtors[0].record_payment(Money::from_major(200), at("2026-03-05T09:00:00Z")).unwrap();
        assert!(!debtors[0].is_overdue(at("2026-04-01T09:00:00Z"), window));
    }
}
