//! # Debtor Account Ledger
//!
//! Credit balances per customer, projected from the purchase ledger, plus the
//! one thing purchases cannot tell us: payments.
//!
//! ## Recording a Payment
//! ```text
//! record_payment(debtor_id, 80, ["p1"])
//!      │
//!      ├── debtor unknown? ─────────────────────► NotFound
//!      ├── amount <= 0 or amount > balance? ────► Validation
//!      ▼
//! totalPaid += 80, lastPayment = now
//! purchases["p1"].paid = true, paidDate = now  (hint only, idempotent)
//!      │
//!      ▼
//! one transaction: debtors (+ purchases when marked)
//! ```

use std::collections::HashSet;
use tracing::{info, warn};

use tally_core::debtor::recompute;
use tally_core::report::{debtor_summary, search_debtors, DebtorSummary};
use tally_core::{CoreError, Debtor, Money, Purchase};
use tally_db::Collection;

use crate::engine::{encode, LedgerEngine};
use crate::error::LedgerResult;

impl LedgerEngine {
    /// Rebuilds every debtor account from the purchase ledger.
    ///
    /// Payments are carried forward. Running it twice without purchase
    /// changes in between stores identical accounts.
    pub async fn recompute_debtors(&self) -> LedgerResult<Vec<Debtor>> {
        let _guard = self.store.lock(&[Collection::Purchases, Collection::Debtors]).await;
        let now = self.clock.now().await;

        let purchases: Vec<Purchase> = self.store.get(Collection::Purchases).await?;
        let prior: Vec<Debtor> = self.store.get(Collection::Debtors).await?;
        let debtors = recompute(&prior, &purchases);

        self.commit(vec![encode(Collection::Debtors, &debtors)?], now).await?;

        info!(debtors = debtors.len(), "Debtor accounts recomputed");
        Ok(debtors)
    }

    /// Records a payment and optionally marks purchases as paid.
    ///
    /// Ids in `mark_paid` that match no purchase are ignored with a warning.
    ///
    /// # Errors
    /// - `NotFound` if no debtor has `debtor_id`
    /// - `Validation` unless `0 < amount <= balance`
    pub async fn record_payment(&self, debtor_id: &str, amount: Money, mark_paid: &[String]) -> LedgerResult<Debtor> {
        let _guard = self.store.lock(&[Collection::Purchases, Collection::Debtors]).await;
        let now = self.clock.now().await;

        let mut debtors: Vec<Debtor> = self.store.get(Collection::Debtors).await?;
        let debtor = debtors
            .iter_mut()
            .find(|d| d.id == debtor_id)
            .ok_or_else(|| CoreError::DebtorNotFound(debtor_id.to_string()))?;

        debtor.record_payment(amount, now)?;
        let debtor = debtor.clone();

        let mut writes = Vec::with_capacity(2);

        if !mark_paid.is_empty() {
            let wanted: HashSet<&str> = mark_paid.iter().map(String::as_str).collect();
            let mut purchases: Vec<Purchase> = self.store.get(Collection::Purchases).await?;
            let mut found = HashSet::new();

            for purchase in purchases.iter_mut().filter(|p| wanted.contains(p.id.as_str())) {
                purchase.mark_paid(now);
                found.insert(purchase.id.clone());
            }
            for missing in wanted.iter().filter(|id| !found.contains(**id)) {
                warn!(debtor_id = %debtor_id, purchase_id = %missing, "Cannot mark unknown purchase as paid");
            }

            if !found.is_empty() {
                writes.push(encode(Collection::Purchases, &purchases)?);
            }
        }

        writes.push(encode(Collection::Debtors, &debtors)?);
        self.commit(writes, now).await?;

        info!(
            debtor_id = %debtor.id,
            amount = %amount,
            balance = %debtor.balance(),
            marked_paid = mark_paid.len(),
            "Payment recorded"
        );
        Ok(debtor)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_debtor(&self, id: &str) -> LedgerResult<Debtor> {
        self.list_debtors()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::DebtorNotFound(id.to_string()).into())
    }

    /// The purchases a debtor account references, in account order.
    pub async fn debtor_purchases(&self, debtor_id: &str) -> LedgerResult<Vec<Purchase>> {
        let debtor = self.get_debtor(debtor_id).await?;
        let purchases = self.list_purchases().await?;

        Ok(debtor
            .purchase_ids
            .iter()
            .filter_map(|id| purchases.iter().find(|p| &p.id == id).cloned())
            .collect())
    }

    pub async fn debtor_summary(&self) -> LedgerResult<DebtorSummary> {
        let debtors = self.list_debtors().await?;
        let now = self.clock.now().await;
        Ok(debtor_summary(&debtors, now, self.settings.overdue_after()))
    }

    /// Case-insensitive on name, substring on phone.
    pub async fn search_debtors(&self, term: &str) -> LedgerResult<Vec<Debtor>> {
        Ok(search_debtors(&self.list_debtors().await?, term))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::testing::ledger;
    use chrono::Duration;
    use tally_core::{Money, PurchaseDraft, PurchaseItem, PurchasePatch};

    fn sugar(qty: i64) -> PurchaseItem {
        PurchaseItem::new("2", "Sugar (1kg)", Money::from_major(80), qty)
    }

    #[tokio::test]
    async fn test_payment_bounds() {
        let (ledger, _clock) = ledger().await;
        ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Amina", "555-1"))
            .await
            .unwrap();
        let debtor = ledger.list_debtors().await.unwrap().remove(0);

        for amount in [Money::zero(), Money::from_major(-5), Money::from_major(81)] {
            let err = ledger.record_payment(&debtor.id, amount, &[]).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        let paid = ledger.record_payment(&debtor.id, Money::from_major(80), &[]).await.unwrap();
        assert_eq!(paid.balance(), Money::zero());

        // Nothing owed, nothing accepted.
        let err = ledger.record_payment(&debtor.id, Money::from_major(1), &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_debtor() {
        let (ledger, _clock) = ledger().await;
        let err = ledger.record_payment("ghost", Money::from_major(1), &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let (ledger, clock) = ledger().await;
        let p = ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(2)], "Amina", "555-1"))
            .await
            .unwrap();
        let debtor_id = ledger.list_debtors().await.unwrap()[0].id.clone();

        ledger
            .record_payment(&debtor_id, Money::from_major(50), &[p.id.clone(), "missing".into()])
            .await
            .unwrap();
        let first = ledger.get_purchase(&p.id).await.unwrap();
        assert!(first.paid);

        clock.advance(Duration::hours(1));
        ledger.record_payment(&debtor_id, Money::from_major(50), &[p.id.clone()]).await.unwrap();
        let second = ledger.get_purchase(&p.id).await.unwrap();
        assert_eq!(second.paid_date, first.paid_date);
    }

    #[tokio::test]
    async fn test_same_phone_different_name_is_one_account() {
        let (ledger, _clock) = ledger().await;
        ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Amina", "555-1"))
            .await
            .unwrap();
        ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(2)], "Amina K.", " 555-1 "))
            .await
            .unwrap();

        let debtors = ledger.list_debtors().await.unwrap();
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].total_due, Money::from_major(240));
        assert_eq!(debtors[0].purchase_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_name_matching_ignores_case_and_spacing() {
        let (ledger, _clock) = ledger().await;
        ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Mary  Jane", ""))
            .await
            .unwrap();
        ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "mary jane", ""))
            .await
            .unwrap();

        assert_eq!(ledger.list_debtors().await.unwrap().len(), 1);
        assert_eq!(ledger.search_debtors("MARY").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_moves_balance_between_customers() {
        let (ledger, _clock) = ledger().await;
        let p = ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Amina", "555-1"))
            .await
            .unwrap();

        ledger
            .update_purchase(
                &p.id,
                PurchasePatch {
                    customer_name: Some("Baraka".into()),
                    customer_phone: Some("555-2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let debtors = ledger.list_debtors().await.unwrap();
        assert_eq!(debtors.len(), 2);
        assert_eq!(debtors[0].customer_phone, "555-1");
        assert_eq!(debtors[0].total_due, Money::zero());
        assert_eq!(debtors[1].customer_phone, "555-2");
        assert_eq!(debtors[1].total_due, Money::from_major(80));
    }

    #[tokio::test]
    async fn test_switching_to_cash_clears_due() {
        let (ledger, _clock) = ledger().await;
        let p = ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Amina", "555-1"))
            .await
            .unwrap();

        ledger
            .update_purchase(
                &p.id,
                PurchasePatch {
                    payment_type: Some(tally_core::PaymentType::Cash),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let debtor = ledger.list_debtors().await.unwrap().remove(0);
        assert_eq!(debtor.total_due, Money::zero());
        assert!(debtor.purchase_ids.is_empty());
    }

    #[tokio::test]
    async fn test_debtor_purchases_and_summary() {
        let (ledger, clock) = ledger().await;
        let a = ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Amina", "555-1"))
            .await
            .unwrap();
        ledger
            .add_purchase(PurchaseDraft::credit(vec![sugar(1)], "Baraka", "555-2"))
            .await
            .unwrap();
        let amina = ledger.search_debtors("555-1").await.unwrap().remove(0);

        let purchases = ledger.debtor_purchases(&amina.id).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].id, a.id);

        clock.advance(Duration::days(31));
        let summary = ledger.debtor_summary().await.unwrap();
        assert_eq!(summary.debtor_count, 2);
        assert_eq!(summary.total_outstanding, Money::from_major(160));
        assert_eq!(summary.overdue_count, 2);
        assert_eq!(summary.in_credit_count, 0);
    }
}
