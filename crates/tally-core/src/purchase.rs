//! # Purchase Lifecycle
//!
//! Pure state transitions for a [`Purchase`]. Nothing here touches storage or
//! reads a clock: "now" is always an argument.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PurchaseDraft ──from_draft──► Purchase { status: Active }              │
//! │                                     │                                   │
//! │     apply_patch (active, within window) ──► Active (fields replaced)   │
//! │     void        (active, any age)        ──► Voided   { voidReason }    │
//! │     refund      (active, any age)        ──► Refunded { refund }        │
//! │     mark_paid   (any status)             ──► paid = true                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition validates fully before mutating, so an `Err` leaves the
//! purchase untouched.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::identity::IdentityKey;
use crate::money::Money;
use crate::types::{Purchase, PurchaseDraft, PurchasePatch, PurchaseStatus, Refund};
use crate::validation::{
    validate_amount_within, validate_items, validate_items_and_total, validate_optional_text,
};

impl Purchase {
    /// Creates an active purchase from a draft.
    ///
    /// The id is generated when the draft has none. `date` and `created_at`
    /// are both set to `now`.
    ///
    /// # Errors
    /// `ValidationError` when the lines are empty or malformed, or the
    /// draft's total differs from Σ subtotal.
    pub fn from_draft(draft: PurchaseDraft, now: DateTime<Utc>) -> CoreResult<Purchase> {
        let total = validate_items_and_total(&draft.items, draft.total)?;
        validate_optional_text("customerName", &draft.customer_name)?;
        validate_optional_text("customerPhone", &draft.customer_phone)?;

        let id = draft
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Purchase {
            id,
            date: now,
            items: draft.items,
            total,
            payment_type: draft.payment_type,
            customer_name: draft.customer_name.trim().to_string(),
            customer_phone: draft.customer_phone.trim().to_string(),
            status: PurchaseStatus::Active,
            photo_ref: None,
            refund: None,
            void_reason: None,
            voided_at: None,
            paid: false,
            paid_date: None,
            created_at: now,
        })
    }

    /// Whether a direct field edit would be accepted at `now`.
    ///
    /// Screens use this to disable the edit button instead of attempting it.
    pub fn can_edit(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.is_active() && !self.edit_window_expired(now, window)
    }

    fn edit_window_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.created_at > window
    }

    /// The debtor identity this purchase belongs to, if any.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        IdentityKey::for_customer(&self.customer_name, &self.customer_phone)
    }

    /// Applies a field edit.
    ///
    /// Returns `true` when debtor balances may have changed, i.e. the
    /// purchase was a credit sale before or after the edit.
    ///
    /// # Errors
    /// - `InvalidPurchaseState` if the purchase is voided or refunded
    /// - `EditWindowExpired` if `now - created_at` exceeds `window`
    /// - `Validation` if the new lines are malformed
    pub fn apply_patch(&mut self, patch: PurchasePatch, now: DateTime<Utc>, window: Duration) -> CoreResult<bool> {
        self.ensure_active("edit")?;

        if self.edit_window_expired(now, window) {
            return Err(CoreError::EditWindowExpired {
                purchase_id: self.id.clone(),
                created_at: self.created_at,
                window_hours: window.num_hours(),
            });
        }

        let new_total = match &patch.items {
            Some(items) => Some(validate_items(items)?),
            None => None,
        };
        if let Some(name) = &patch.customer_name {
            validate_optional_text("customerName", name)?;
        }
        if let Some(phone) = &patch.customer_phone {
            validate_optional_text("customerPhone", phone)?;
        }

        let was_credit = self.is_credit();

        if let Some(name) = patch.customer_name {
            self.customer_name = name.trim().to_string();
        }
        if let Some(phone) = patch.customer_phone {
            self.customer_phone = phone.trim().to_string();
        }
        if let (Some(items), Some(total)) = (patch.items, new_total) {
            self.items = items;
            self.total = total;
        }
        if let Some(payment_type) = patch.payment_type {
            self.payment_type = payment_type;
        }

        Ok(was_credit || self.is_credit())
    }

    /// Voids an active purchase. Ignores the edit window.
    pub fn void(&mut self, reason: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_active("void")?;
        validate_optional_text("reason", reason)?;

        self.status = PurchaseStatus::Voided;
        self.void_reason = Some(reason.trim().to_string());
        self.voided_at = Some(now);
        Ok(())
    }

    /// Refunds an active purchase. Ignores the edit window.
    ///
    /// # Errors
    /// `Validation` unless `0 < amount <= total`.
    pub fn refund(&mut self, amount: Money, reason: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_active("refund")?;
        validate_amount_within("refund amount", amount, self.total)?;
        validate_optional_text("reason", reason)?;

        self.status = PurchaseStatus::Refunded;
        self.refund = Some(Refund {
            amount,
            reason: reason.trim().to_string(),
            date: now,
        });
        Ok(())
    }

    /// Marks the purchase as settled by a debtor payment.
    ///
    /// Idempotent: the first paid date is kept.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        if !self.paid {
            self.paid = true;
            self.paid_date = Some(at);
        }
    }

    fn ensure_active(&self, operation: &'static str) -> CoreResult<()> {
        if self.status.is_closed() {
            return Err(CoreError::InvalidPurchaseState {
                purchase_id: self.id.clone(),
                status: self.status,
                operation,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::{PaymentType, PurchaseItem};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn window() -> Duration {
        Duration::hours(24)
    }

    fn rice(qty: i64) -> PurchaseItem {
        PurchaseItem::new("g-rice", "Rice (1kg)", Money::from_major(50), qty)
    }

    fn credit_purchase(now: DateTime<Utc>) -> Purchase {
        Purchase::from_draft(PurchaseDraft::credit(vec![rice(4)], "Amina", "555-1"), now).unwrap()
    }

    #[test]
    fn test_from_draft_stamps_fields() {
        let now = at("2026-03-01T09:00:00Z");
        let p = Purchase::from_draft(PurchaseDraft::cash(vec![rice(2)]), now).unwrap();

        assert_eq!(p.total, Money::from_major(100));
        assert_eq!(p.status, PurchaseStatus::Active);
        assert_eq!(p.date, now);
        assert_eq!(p.created_at, now);
        assert!(!p.id.is_empty());
        assert!(!p.paid);
    }

    #[test]
    fn test_from_draft_keeps_given_id() {
        let mut draft = PurchaseDraft::cash(vec![rice(1)]);
        draft.id = Some("p-42".to_string());
        let p = Purchase::from_draft(draft, at("2026-03-01T09:00:00Z")).unwrap();
        assert_eq!(p.id, "p-42");
    }

    #[test]
    fn test_from_draft_rejects_bad_total() {
        let mut draft = PurchaseDraft::cash(vec![rice(2)]);
        draft.total = Money::from_major(99);

        let err = Purchase::from_draft(draft, at("2026-03-01T09:00:00Z")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TotalMismatch { .. })
        ));
    }

    #[test]
    fn test_from_draft_rejects_empty_items() {
        let err = Purchase::from_draft(PurchaseDraft::cash(vec![]), at("2026-03-01T09:00:00Z")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyItems)));
    }

    #[test]
    fn test_edit_within_window() {
        let created = at("2026-03-01T09:00:00Z");
        let mut p = credit_purchase(created);

        let patch = PurchasePatch {
            items: Some(vec![rice(1)]),
            ..Default::default()
        };
        let affects_debt = p.apply_patch(patch, at("2026-03-02T08:59:00Z"), window()).unwrap();

        assert!(affects_debt);
        assert_eq!(p.total, Money::from_major(50));
        assert_eq!(p.created_at, created);
    }

    #[test]
    fn test_edit_at_exact_window_boundary_is_allowed() {
        let mut p = credit_purchase(at("2026-03-01T09:00:00Z"));
        assert!(p.can_edit(at("2026-03-02T09:00:00Z"), window()));
        assert!(p
            .apply_patch(PurchasePatch::default(), at("2026-03-02T09:00:00Z"), window())
            .is_ok());
    }

    #[test]
    fn test_edit_after_window_fails() {
        let mut p = credit_purchase(at("2026-03-01T09:00:00Z"));
        let before = p.clone();

        let patch = PurchasePatch {
            customer_name: Some("Someone Else".to_string()),
            ..Default::default()
        };
        let err = p.apply_patch(patch, at("2026-03-02T09:01:00Z"), window()).unwrap_err();

        assert!(matches!(err, CoreError::EditWindowExpired { window_hours: 24, .. }));
        assert_eq!(p, before);
        assert!(!p.can_edit(at("2026-03-02T09:01:00Z"), window()));
    }

    #[test]
    fn test_edit_closed_purchase_is_invalid_state_even_in_window() {
        let now = at("2026-03-01T09:00:00Z");
        let mut p = credit_purchase(now);
        p.void("mistake", now).unwrap();

        let err = p.apply_patch(PurchasePatch::default(), now, window()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPurchaseState { operation: "edit", .. }));
    }

    #[test]
    fn test_edit_cash_to_credit_affects_debt() {
        let now = at("2026-03-01T09:00:00Z");
        let mut p = Purchase::from_draft(PurchaseDraft::cash(vec![rice(1)]), now).unwrap();

        let affects = p
            .apply_patch(PurchasePatch { customer_name: Some("Bob".into()), ..Default::default() }, now, window())
            .unwrap();
        assert!(!affects);

        let affects = p
            .apply_patch(
                PurchasePatch { payment_type: Some(PaymentType::Credit), ..Default::default() },
                now,
                window(),
            )
            .unwrap();
        assert!(affects);
    }

    #[test]
    fn test_invalid_patch_leaves_purchase_untouched() {
        let now = at("2026-03-01T09:00:00Z");
        let mut p = credit_purchase(now);
        let before = p.clone();

        let patch = PurchasePatch {
            customer_name: Some("New".into()),
            items: Some(vec![]),
            ..Default::default()
        };
        assert!(p.apply_patch(patch, now, window()).is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn test_void_bypasses_window_once() {
        let mut p = credit_purchase(at("2026-01-01T09:00:00Z"));
        let late = at("2026-03-01T09:00:00Z");

        p.void("customer returned goods", late).unwrap();
        assert_eq!(p.status, PurchaseStatus::Voided);
        assert_eq!(p.voided_at, Some(late));
        assert_eq!(p.void_reason.as_deref(), Some("customer returned goods"));

        assert!(matches!(p.void("again", late), Err(CoreError::InvalidPurchaseState { .. })));
        assert!(matches!(
            p.refund(Money::from_major(1), "x", late),
            Err(CoreError::InvalidPurchaseState { .. })
        ));
    }

    #[test]
    fn test_refund_amount_rules() {
        let now = at("2026-03-01T09:00:00Z");
        let mut p = credit_purchase(now);

        assert!(matches!(
            p.refund(Money::zero(), "x", now),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(matches!(
            p.refund(Money::from_major(201), "x", now),
            Err(CoreError::Validation(ValidationError::ExceedsLimit { .. }))
        ));
        assert_eq!(p.status, PurchaseStatus::Active);

        p.refund(Money::from_major(200), "damaged", now).unwrap();
        assert_eq!(p.status, PurchaseStatus::Refunded);
        assert_eq!(p.refund.as_ref().map(|r| r.amount), Some(Money::from_major(200)));
        assert!(p.void("x", now).is_err());
    }

    #[test]
    fn test_mark_paid_is_idempotent() {
        let mut p = credit_purchase(at("2026-03-01T09:00:00Z"));
        let first = at("2026-03-02T09:00:00Z");
        p.mark_paid(first);
        p.mark_paid(at("2026-03-05T09:00:00Z"));
        assert!(p.paid);
        assert_eq!(p.paid_date, Some(first));
    }
}
