//! # Domain Types
//!
//! Core domain types persisted in the Record Store and consumed by screens.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Good       │   │    Purchase     │   │     Debtor      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name, price    │   │  items[]        │   │  totalDue       │       │
//! │  │  category       │   │  total          │   │  totalPaid      │       │
//! │  │  barcode?       │   │  status         │   │  purchaseIds[]  │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │  InventoryItem  │   │  PurchaseItem   │   │ SyncQueueEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  itemId         │   │  name snapshot  │   │  key            │       │
//! │  │  stockLevel     │   │  price snapshot │   │  value (JSON)   │       │
//! │  └─────────────────┘   │  subtotal       │   │  timestamp      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Persisted Shape
//! Every type serializes with camelCase field names. A debtor's balance is a
//! method, never a field: it cannot drift from `totalDue - totalPaid`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Good
// =============================================================================

/// A catalogue entry.
///
/// Purchases snapshot a good's name and price per line, so editing a good
/// never changes a recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Good {
    pub id: String,
    pub name: String,
    /// Unit price, always positive.
    pub price: Money,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for creating a catalogue entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GoodDraft {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub price: Money,
    /// Defaults to [`crate::DEFAULT_GOOD_CATEGORY`].
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// The fields of a good that may be changed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GoodPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub category: Option<String>,
    /// `Some(None)` clears the barcode.
    #[serde(default)]
    pub barcode: Option<Option<String>>,
}

// =============================================================================
// Payment Type & Purchase Status
// =============================================================================

/// How a purchase was settled at the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    /// Goods taken now, paid later. Feeds a debtor account.
    Credit,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::Cash => write!(f, "cash"),
            PaymentType::Credit => write!(f, "credit"),
        }
    }
}

/// Lifecycle status of a purchase.
///
/// ## State Machine
/// ```text
///            edit (within window)
///              ┌──────┐
///              ▼      │
///          ┌──────────┴┐
///          │  Active   │
///          └─────┬─────┘
///        void    │    refund
///      ┌─────────┴─────────┐
///      ▼                   ▼
/// ┌──────────┐       ┌──────────┐
/// │  Voided  │       │ Refunded │     (both terminal)
/// └──────────┘       └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Active,
    Voided,
    Refunded,
}

impl PurchaseStatus {
    /// Voided and refunded purchases accept no further transitions.
    #[inline]
    pub fn is_closed(&self) -> bool {
        !matches!(self, PurchaseStatus::Active)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseStatus::Active => write!(f, "active"),
            PurchaseStatus::Voided => write!(f, "voided"),
            PurchaseStatus::Refunded => write!(f, "refunded"),
        }
    }
}

// =============================================================================
// Purchase Item
// =============================================================================

/// A line on a purchase.
/// Uses snapshot pattern to freeze good data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub good_id: String,
    /// Good name at time of sale (frozen).
    pub name: String,
    /// Unit price at time of sale (frozen).
    pub price: Money,
    /// At least 1.
    pub quantity: i64,
    /// price × quantity.
    pub subtotal: Money,
}

impl PurchaseItem {
    /// Builds a line with a correctly computed subtotal.
    pub fn new(good_id: impl Into<String>, name: impl Into<String>, price: Money, quantity: i64) -> Self {
        PurchaseItem {
            good_id: good_id.into(),
            name: name.into(),
            price,
            quantity,
            subtotal: price.saturating_multiply_quantity(quantity),
        }
    }

    /// Snapshots a catalogue entry into a line.
    pub fn from_good(good: &Good, quantity: i64) -> Self {
        PurchaseItem::new(good.id.clone(), good.name.clone(), good.price, quantity)
    }

    #[inline]
    pub fn expected_subtotal(&self) -> Money {
        self.price.saturating_multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// Refund details stored on a refunded purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub amount: Money,
    pub reason: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

/// A sale transaction. Never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    /// Sale date. Equal to `created_at` (no backdating).
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub items: Vec<PurchaseItem>,
    /// Σ item.subtotal, enforced on every write.
    pub total: Money,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub status: PurchaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund: Option<Refund>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
    /// Payment-allocation hint set by `record_payment`.
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub paid_date: Option<DateTime<Utc>>,
    /// Immutable anchor of the edit window.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == PurchaseStatus::Active
    }

    #[inline]
    pub fn is_credit(&self) -> bool {
        self.payment_type == PaymentType::Credit
    }

    /// Active credit purchases are the only ones that contribute to a debt.
    #[inline]
    pub fn counts_toward_debt(&self) -> bool {
        self.is_active() && self.is_credit()
    }
}

/// Input for recording a sale.
///
/// `total` is what the till computed. The ledger recomputes it and rejects
/// the draft if they disagree.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub items: Vec<PurchaseItem>,
    pub total: Money,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
}

impl PurchaseDraft {
    /// A cash draft whose total is computed from the lines.
    pub fn cash(items: Vec<PurchaseItem>) -> Self {
        let total = Money::checked_sum(items.iter().map(|i| i.subtotal)).unwrap_or(Money::MAX);
        PurchaseDraft {
            id: None,
            items,
            total,
            payment_type: PaymentType::Cash,
            customer_name: String::new(),
            customer_phone: String::new(),
        }
    }

    /// A credit draft whose total is computed from the lines.
    pub fn credit(items: Vec<PurchaseItem>, customer_name: impl Into<String>, customer_phone: impl Into<String>) -> Self {
        PurchaseDraft {
            payment_type: PaymentType::Credit,
            customer_name: customer_name.into(),
            customer_phone: customer_phone.into(),
            ..PurchaseDraft::cash(items)
        }
    }
}

/// The fields of an active purchase that may be edited within the window.
///
/// `id`, `createdAt`, `date`, and `status` are deliberately absent; status
/// changes go through void/refund only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePatch {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Replaces all lines; the total is recomputed.
    #[serde(default)]
    pub items: Option<Vec<PurchaseItem>>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
}

impl PurchasePatch {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.customer_phone.is_none()
            && self.items.is_none()
            && self.payment_type.is_none()
    }
}

// =============================================================================
// Debtor
// =============================================================================

/// A credit account, one per customer identity.
///
/// Created lazily on the first credit sale and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Debtor {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    /// Σ total of active credit purchases in `purchase_ids`.
    pub total_due: Money,
    /// Payments are not derivable from purchases; preserved across recompute.
    pub total_paid: Money,
    pub purchase_ids: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_purchase: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub last_payment: Option<DateTime<Utc>>,
}

impl Debtor {
    /// Outstanding amount. Negative means the customer holds store credit.
    #[inline]
    pub fn balance(&self) -> Money {
        self.total_due - self.total_paid
    }

    #[inline]
    pub fn is_in_credit(&self) -> bool {
        self.balance().is_negative()
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock snapshot for one good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// The good's id.
    pub item_id: String,
    pub stock_level: i64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Sync Queue
// =============================================================================

/// One pending write awaiting delivery to the remote service.
///
/// Written once per mutating Record Store write, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
    /// Collection key that was written.
    pub key: String,
    /// The full value written under `key`.
    #[ts(type = "unknown")]
    pub value: serde_json::Value,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_purchase_item_computes_subtotal() {
        let item = PurchaseItem::new("g1", "Rice (1kg)", Money::from_major(50), 2);
        assert_eq!(item.subtotal, Money::from_major(100));
        assert_eq!(item.expected_subtotal(), item.subtotal);
    }

    #[test]
    fn test_status_is_closed() {
        assert!(!PurchaseStatus::Active.is_closed());
        assert!(PurchaseStatus::Voided.is_closed());
        assert!(PurchaseStatus::Refunded.is_closed());
    }

    #[test]
    fn test_debtor_balance_is_derived() {
        let at = ts("2026-01-01T00:00:00Z");
        let debtor = Debtor {
            id: "d1".to_string(),
            customer_name: "Amina".to_string(),
            customer_phone: "555-1".to_string(),
            total_due: Money::zero(),
            total_paid: Money::from_major(80),
            purchase_ids: vec![],
            created_at: at,
            last_purchase: at,
            last_payment: Some(at),
        };
        assert_eq!(debtor.balance(), Money::from_major(-80));
        assert!(debtor.is_in_credit());

        let json = serde_json::to_value(&debtor).unwrap();
        assert!(json.get("balance").is_none());
        assert_eq!(json["totalPaid"], 8000);
    }

    #[test]
    fn test_purchase_serializes_camel_case() {
        let at = ts("2026-01-01T09:00:00Z");
        let purchase = Purchase {
            id: "p1".to_string(),
            date: at,
            items: vec![PurchaseItem::new("g1", "Bread", Money::from_major(30), 1)],
            total: Money::from_major(30),
            payment_type: PaymentType::Credit,
            customer_name: "Amina".to_string(),
            customer_phone: String::new(),
            status: PurchaseStatus::Active,
            photo_ref: None,
            refund: None,
            void_reason: None,
            voided_at: None,
            paid: false,
            paid_date: None,
            created_at: at,
        };

        let json = serde_json::to_value(&purchase).unwrap();
        assert_eq!(json["paymentType"], "credit");
        assert_eq!(json["status"], "active");
        assert_eq!(json["items"][0]["goodId"], "g1");
        assert!(json.get("photoRef").is_none());

        let back: Purchase = serde_json::from_value(json).unwrap();
        assert_eq!(back, purchase);
    }

    #[test]
    fn test_draft_constructors_sum_lines() {
        let draft = PurchaseDraft::credit(
            vec![
                PurchaseItem::new("g1", "Rice", Money::from_major(50), 2),
                PurchaseItem::new("g2", "Milk", Money::from_major(60), 1),
            ],
            "Amina",
            "555-1",
        );
        assert_eq!(draft.total, Money::from_major(160));
        assert_eq!(draft.payment_type, PaymentType::Credit);
        assert!(PurchasePatch::default().is_empty());
    }
}
