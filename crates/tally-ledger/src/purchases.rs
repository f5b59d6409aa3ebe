//! # Purchase Ledger
//!
//! Records sales and drives them through their lifecycle.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                 update_purchase (within edit window)                    │
//! │                        ┌─────────┐                                      │
//! │                        ▼         │                                      │
//! │  add_purchase ──► ┌──────────┐   │                                      │
//! │                   │  active  │───┘                                      │
//! │                   └────┬─────┘                                          │
//! │          void_purchase │ refund_purchase    (any age)                   │
//! │                ┌───────┴────────┐                                       │
//! │                ▼                ▼                                       │
//! │          ┌──────────┐     ┌──────────┐                                  │
//! │          │  voided  │     │ refunded │      terminal                    │
//! │          └──────────┘     └──────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Debtor accounts follow along in the same transaction: a new credit sale
//! is applied incrementally, anything else that touches a credit sale
//! rebuilds every account.

use tracing::{info, warn};

use tally_core::debtor::{apply_new_credit_sale, recompute};
use tally_core::report::{filter_purchases, sales_summary, PurchaseQuery, SalesSummary};
use tally_core::{CoreError, Debtor, Money, Purchase, PurchaseDraft, PurchasePatch, ValidationError};
use tally_db::Collection;

use crate::engine::{encode, LedgerEngine};
use crate::error::LedgerResult;
use crate::photos::RecordedPurchase;

impl LedgerEngine {
    /// Records a new sale.
    ///
    /// The draft's total is checked against Σ subtotal. A credit sale with a
    /// customer identity is added to that customer's debtor account in the
    /// same write.
    ///
    /// # Errors
    /// `Validation` for empty or inconsistent lines, a total mismatch, or a
    /// duplicate id.
    pub async fn add_purchase(&self, draft: PurchaseDraft) -> LedgerResult<Purchase> {
        Ok(self.insert_purchase(draft, None).await?.purchase)
    }

    /// Records a new sale with an attached photo.
    ///
    /// The photo is saved only once the draft has passed every check. If
    /// saving it fails the sale is still recorded, without a `photoRef`, and
    /// the failure is returned as a warning.
    pub async fn add_purchase_with_photo(&self, draft: PurchaseDraft, photo: &[u8]) -> LedgerResult<RecordedPurchase> {
        self.insert_purchase(draft, Some(photo)).await
    }

    async fn insert_purchase(&self, draft: PurchaseDraft, photo: Option<&[u8]>) -> LedgerResult<RecordedPurchase> {
        let _guard = self.store.lock(&[Collection::Purchases, Collection::Debtors]).await;
        let now = self.clock.now().await;

        let mut purchase = Purchase::from_draft(draft, now)?;

        let mut purchases: Vec<Purchase> = self.store.get(Collection::Purchases).await?;
        if purchases.iter().any(|p| p.id == purchase.id) {
            return Err(ValidationError::DuplicateId {
                collection: Collection::Purchases.key().to_string(),
                id: purchase.id,
            }
            .into());
        }

        let mut debtors: Option<Vec<Debtor>> = None;
        if purchase.counts_toward_debt() {
            let mut current: Vec<Debtor> = self.store.get(Collection::Debtors).await?;
            match apply_new_credit_sale(&mut current, &purchase) {
                Some(index) => {
                    info!(
                        purchase_id = %purchase.id,
                        debtor_id = %current[index].id,
                        balance = %current[index].balance(),
                        "Credit sale applied to debtor"
                    );
                    debtors = Some(current);
                }
                None => warn!(purchase_id = %purchase.id, "Credit sale has no customer identity; no debtor account"),
            }
        }

        // Every check has passed; only the write itself can still fail.
        let mut warnings = Vec::new();
        if let Some(photo) = photo {
            match self.photos.save(&purchase.id, photo, now).await {
                Ok(photo_ref) => purchase.photo_ref = Some(photo_ref),
                Err(e) => {
                    warn!(purchase_id = %purchase.id, error = %e, "Photo not saved, recording purchase without it");
                    warnings.push(format!("Photo was not saved: {}", e));
                }
            }
        }
        purchases.push(purchase.clone());

        let written: LedgerResult<()> = async {
            let mut writes = vec![encode(Collection::Purchases, &purchases)?];
            if let Some(debtors) = &debtors {
                writes.push(encode(Collection::Debtors, debtors)?);
            }
            self.commit(writes, now).await
        }
        .await;

        if let Err(e) = written {
            if let Some(photo_ref) = &purchase.photo_ref {
                if let Err(cleanup) = self.photos.delete(photo_ref).await {
                    warn!(photo_ref = %photo_ref, error = %cleanup, "Orphan photo left after failed purchase write");
                }
            }
            return Err(e);
        }

        info!(
            purchase_id = %purchase.id,
            total = %purchase.total,
            payment_type = %purchase.payment_type,
            items = purchase.items.len(),
            "Purchase recorded"
        );
        Ok(RecordedPurchase { purchase, warnings })
    }

    /// Edits customer fields, lines, or payment type of an active purchase
    /// inside the edit window.
    ///
    /// # Errors
    /// - `NotFound` if no purchase has `id`
    /// - `InvalidState` if the purchase is voided or refunded
    /// - `EditWindowExpired` once the window has passed
    /// - `Validation` for malformed lines
    pub async fn update_purchase(&self, id: &str, patch: PurchasePatch) -> LedgerResult<Purchase> {
        let window = self.settings.edit_window();
        let empty = patch.is_empty();

        self.mutate_purchase(id, "Purchase updated", move |purchase, now| {
            let affects_debt = purchase.apply_patch(patch, now, window)?;
            Ok(Mutation {
                write: !empty,
                recompute: affects_debt && !empty,
            })
        })
        .await
    }

    /// Voids an active purchase, whatever its age.
    ///
    /// # Errors
    /// `NotFound`, or `InvalidState` if already voided or refunded.
    pub async fn void_purchase(&self, id: &str, reason: &str) -> LedgerResult<Purchase> {
        self.mutate_purchase(id, "Purchase voided", |purchase, now| {
            purchase.void(reason, now)?;
            Ok(Mutation {
                write: true,
                recompute: purchase.is_credit(),
            })
        })
        .await
    }

    /// Refunds an active purchase, whatever its age.
    ///
    /// # Errors
    /// `NotFound`, `InvalidState` if already closed, or `Validation` unless
    /// `0 < amount <= total`.
    pub async fn refund_purchase(&self, id: &str, amount: Money, reason: &str) -> LedgerResult<Purchase> {
        self.mutate_purchase(id, "Purchase refunded", |purchase, now| {
            purchase.refund(amount, reason, now)?;
            Ok(Mutation {
                write: true,
                recompute: purchase.is_credit(),
            })
        })
        .await
    }

    /// Shared read-modify-write for an existing purchase.
    async fn mutate_purchase<F>(&self, id: &str, event: &'static str, apply: F) -> LedgerResult<Purchase>
    where
        F: FnOnce(&mut Purchase, chrono::DateTime<chrono::Utc>) -> Result<Mutation, CoreError>,
    {
        let _guard = self.store.lock(&[Collection::Purchases, Collection::Debtors]).await;
        let now = self.clock.now().await;

        let mut purchases: Vec<Purchase> = self.store.get(Collection::Purchases).await?;
        let index = purchases
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()))?;

        let mut updated = purchases[index].clone();
        let mutation = apply(&mut updated, now)?;
        if !mutation.write {
            return Ok(updated);
        }
        purchases[index] = updated.clone();

        let mut writes = vec![encode(Collection::Purchases, &purchases)?];
        if mutation.recompute {
            let prior: Vec<Debtor> = self.store.get(Collection::Debtors).await?;
            let debtors = recompute(&prior, &purchases);
            writes.push(encode(Collection::Debtors, &debtors)?);
        }

        self.commit(writes, now).await?;

        info!(
            purchase_id = %updated.id,
            status = %updated.status,
            total = %updated.total,
            debtors_recomputed = mutation.recompute,
            "{}", event
        );
        Ok(updated)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_purchase(&self, id: &str) -> LedgerResult<Purchase> {
        self.list_purchases()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()).into())
    }

    /// Purchases matching `query`, newest first.
    pub async fn query_purchases(&self, query: &PurchaseQuery) -> LedgerResult<Vec<Purchase>> {
        Ok(filter_purchases(&self.list_purchases().await?, query))
    }

    /// Totals over the active purchases matching `query`.
    pub async fn sales_summary(&self, query: &PurchaseQuery) -> LedgerResult<SalesSummary> {
        Ok(sales_summary(&self.query_purchases(query).await?))
    }

    /// Whether a direct edit of `id` would be accepted right now.
    pub async fn can_edit_purchase(&self, id: &str) -> LedgerResult<bool> {
        let purchase = self.get_purchase(id).await?;
        let now = self.clock.now().await;
        Ok(purchase.can_edit(now, self.settings.edit_window()))
    }
}

/// What a purchase mutation needs persisted.
struct Mutation {
    write: bool,
    recompute: bool,
}

#[cfg(test)]
mod tests {
    use crate::testing::{ledger, t0};
    use chrono::Duration;
    use tally_core::{Money, PaymentType, PurchaseDraft, PurchaseItem, PurchasePatch, PurchaseStatus};

    use crate::error::ErrorKind;

    fn rice(qty: i64) -> PurchaseItem {
        PurchaseItem::new("1", "Rice (1kg)", Money::from_major(50), qty)
    }

    #[tokio::test]
    async fn test_cash_purchase_recorded() {
        let (ledger, _clock) = ledger().await;

        let purchase = ledger.add_purchase(PurchaseDraft::cash(vec![rice(2)])).await.unwrap();
        assert_eq!(purchase.total, Money::from_major(100));
        assert_eq!(purchase.created_at, t0());
        assert_eq!(purchase.date, purchase.created_at);

        let listed = ledger.list_purchases().await.unwrap();
        assert_eq!(listed, vec![purchase]);
        assert!(ledger.list_debtors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_total_mismatch_writes_nothing() {
        let (ledger, _clock) = ledger().await;

        let mut draft = PurchaseDraft::cash(vec![rice(2)]);
        draft.total = Money::from_major(90);
        let err = ledger.add_purchase(draft).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(ledger.list_purchases().await.unwrap().is_empty());
        assert_eq!(ledger.sync_status().await.pending_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (ledger, _clock) = ledger().await;

        let mut draft = PurchaseDraft::cash(vec![rice(1)]);
        draft.id = Some("p-1".into());
        ledger.add_purchase(draft.clone()).await.unwrap();

        let err = ledger.add_purchase(draft).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ledger.list_purchases().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_credit_without_identity_has_no_debtor() {
        let (ledger, _clock) = ledger().await;

        let purchase = ledger
            .add_purchase(PurchaseDraft::credit(vec![rice(1)], "  ", ""))
            .await
            .unwrap();
        assert_eq!(purchase.payment_type, PaymentType::Credit);
        assert!(ledger.list_debtors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_window() {
        let (ledger, clock) = ledger().await;
        let purchase = ledger.add_purchase(PurchaseDraft::cash(vec![rice(1)])).await.unwrap();

        clock.advance(Duration::hours(23));
        assert!(ledger.can_edit_purchase(&purchase.id).await.unwrap());
        let patch = PurchasePatch {
            items: Some(vec![rice(3)]),
            ..Default::default()
        };
        let edited = ledger.update_purchase(&purchase.id, patch.clone()).await.unwrap();
        assert_eq!(edited.total, Money::from_major(150));
        assert_eq!(edited.created_at, purchase.created_at);

        clock.advance(Duration::hours(2));
        assert!(!ledger.can_edit_purchase(&purchase.id).await.unwrap());
        let err = ledger.update_purchase(&purchase.id, patch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EditWindowExpired);
        assert_eq!(ledger.get_purchase(&purchase.id).await.unwrap().total, Money::from_major(150));
    }

    #[tokio::test]
    async fn test_void_and_refund_ignore_window_once() {
        let (ledger, clock) = ledger().await;
        let a = ledger.add_purchase(PurchaseDraft::cash(vec![rice(1)])).await.unwrap();
        let b = ledger.add_purchase(PurchaseDraft::cash(vec![rice(2)])).await.unwrap();

        clock.advance(Duration::days(10));

        let voided = ledger.void_purchase(&a.id, "wrong till").await.unwrap();
        assert_eq!(voided.status, PurchaseStatus::Voided);
        assert_eq!(voided.voided_at, Some(t0() + Duration::days(10)));

        let refunded = ledger.refund_purchase(&b.id, Money::from_major(40), "damaged").await.unwrap();
        assert_eq!(refunded.status, PurchaseStatus::Refunded);
        assert_eq!(refunded.refund.unwrap().amount, Money::from_major(40));

        for id in [&a.id, &b.id] {
            let err = ledger.void_purchase(id, "again").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
            let err = ledger.refund_purchase(id, Money::from_major(1), "again").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }
    }

    #[tokio::test]
    async fn test_refund_amount_bounds() {
        let (ledger, _clock) = ledger().await;
        let p = ledger.add_purchase(PurchaseDraft::cash(vec![rice(1)])).await.unwrap();

        for amount in [Money::zero(), Money::from_major(51)] {
            let err = ledger.refund_purchase(&p.id, amount, "x").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(ledger.get_purchase(&p.id).await.unwrap().status, PurchaseStatus::Active);
    }

    #[tokio::test]
    async fn test_unknown_purchase() {
        let (ledger, _clock) = ledger().await;
        let err = ledger.void_purchase("nope", "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = ledger.update_purchase("nope", PurchasePatch::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let (ledger, _clock) = ledger().await;
        let p = ledger.add_purchase(PurchaseDraft::cash(vec![rice(1)])).await.unwrap();
        let pending = ledger.sync_status().await.pending_count;

        let same = ledger.update_purchase(&p.id, PurchasePatch::default()).await.unwrap();
        assert_eq!(same, p);
        assert_eq!(ledger.sync_status().await.pending_count, pending);
    }

    #[tokio::test]
    async fn test_photo_attached() {
        let (ledger, _clock) = ledger().await;

        let recorded = ledger
            .add_purchase_with_photo(PurchaseDraft::cash(vec![rice(1)]), &[0xFF, 0xD8])
            .await
            .unwrap();
        assert!(!recorded.has_warnings());

        let photo_ref = recorded.purchase.photo_ref.clone().unwrap();
        assert_eq!(photo_ref, format!("photo_{}", recorded.purchase.id));
        assert_eq!(ledger.get_photo(&photo_ref).await.unwrap(), Some(vec![0xFF, 0xD8]));
    }

    #[tokio::test]
    async fn test_photo_failure_is_a_warning() {
        let (ledger, _clock) = ledger().await;

        let recorded = ledger
            .add_purchase_with_photo(PurchaseDraft::cash(vec![rice(1)]), &[])
            .await
            .unwrap();

        assert!(recorded.has_warnings());
        assert!(recorded.purchase.photo_ref.is_none());
        assert_eq!(ledger.list_purchases().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_keeps_existing_photo() {
        let (ledger, _clock) = ledger().await;

        let mut draft = PurchaseDraft::cash(vec![rice(1)]);
        draft.id = Some("p1".into());
        ledger.add_purchase_with_photo(draft.clone(), &[1, 1, 1]).await.unwrap();
        let pending = ledger.sync_status().await.pending_count;

        let err = ledger.add_purchase_with_photo(draft, &[9, 9]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ledger.get_photo("photo_p1").await.unwrap(), Some(vec![1, 1, 1]));
        assert_eq!(ledger.sync_status().await.pending_count, pending);
    }

    #[tokio::test]
    async fn test_rejected_draft_stores_no_photo() {
        let (ledger, _clock) = ledger().await;

        let mut draft = PurchaseDraft::credit(vec![rice(1)], "A".repeat(300), "555-1");
        draft.id = Some("p2".into());
        let err = ledger.add_purchase_with_photo(draft, &[7]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ledger.get_photo("photo_p2").await.unwrap(), None);
        assert!(ledger.list_purchases().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_huge_quantity_rejected() {
        let (ledger, _clock) = ledger().await;

        let err = ledger
            .add_purchase(PurchaseDraft::cash(vec![rice(i64::MAX / 2)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(ledger.list_purchases().await.unwrap().is_empty());
    }
}
