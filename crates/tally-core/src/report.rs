//! # Reports
//!
//! Read-side projections consumed by the sales, debtors and inventory screens.
//! All functions are pure and work on collections already loaded from the
//! Record Store.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::identity::normalize_name;
use crate::money::Money;
use crate::types::{Debtor, Good, InventoryItem, PaymentType, Purchase};

// =============================================================================
// Sales
// =============================================================================

/// Filters for the sales history screen. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseQuery {
    /// Case-insensitive match on customer name or any item name.
    #[serde(default)]
    pub search: Option<String>,
    /// Calendar day (UTC) of `date`.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub day: Option<NaiveDate>,
    /// Inclusive lower bound on `date`.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `date`.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
}

impl PurchaseQuery {
    pub fn matches(&self, purchase: &Purchase) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = purchase.customer_name.to_lowercase().contains(&term)
                || purchase.items.iter().any(|i| i.name.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(day) = self.day {
            if purchase.date.date_naive() != day {
                return false;
            }
        }
        if let Some(from) = self.from {
            if purchase.date < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if purchase.date >= until {
                return false;
            }
        }
        if let Some(payment_type) = self.payment_type {
            if purchase.payment_type != payment_type {
                return false;
            }
        }
        true
    }
}

/// Applies a query and sorts newest first.
pub fn filter_purchases(purchases: &[Purchase], query: &PurchaseQuery) -> Vec<Purchase> {
    let mut matched: Vec<Purchase> = purchases.iter().filter(|p| query.matches(p)).cloned().collect();
    matched.sort_by(|a, b| b.date.cmp(&a.date));
    matched
}

/// Totals over the **active** purchases of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total: Money,
    pub cash_total: Money,
    pub credit_total: Money,
    pub count: usize,
}

pub fn sales_summary(purchases: &[Purchase]) -> SalesSummary {
    purchases
        .iter()
        .filter(|p| p.is_active())
        .fold(SalesSummary::default(), |mut acc, p| {
            acc.total += p.total;
            match p.payment_type {
                PaymentType::Cash => acc.cash_total += p.total,
                PaymentType::Credit => acc.credit_total += p.total,
            }
            acc.count += 1;
            acc
        })
}

// =============================================================================
// Debtors
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DebtorSummary {
    /// Σ balance over all accounts (store credit reduces it).
    pub total_outstanding: Money,
    pub debtor_count: usize,
    pub overdue_count: usize,
    pub in_credit_count: usize,
}

pub fn debtor_summary(debtors: &[Debtor], now: DateTime<Utc>, overdue_after: Duration) -> DebtorSummary {
    DebtorSummary {
        total_outstanding: debtors.iter().map(Debtor::balance).sum(),
        debtor_count: debtors.len(),
        overdue_count: debtors.iter().filter(|d| d.is_overdue(now, overdue_after)).count(),
        in_credit_count: debtors.iter().filter(|d| d.is_in_credit()).count(),
    }
}

/// Case-insensitive on name, substring on phone. An empty term matches all.
pub fn search_debtors(debtors: &[Debtor], term: &str) -> Vec<Debtor> {
    let needle = normalize_name(term);
    if needle.is_empty() {
        return debtors.to_vec();
    }
    let raw = term.trim();

    debtors
        .iter()
        .filter(|d| normalize_name(&d.customer_name).contains(&needle) || d.customer_phone.contains(raw))
        .cloned()
        .collect()
}

// =============================================================================
// Stock
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum StockStatus {
    OutOfStock,
    /// Above zero, below the low-stock threshold.
    Low,
    InStock,
}

impl StockStatus {
    pub fn classify(level: i64, low_threshold: i64) -> Self {
        if level <= 0 {
            StockStatus::OutOfStock
        } else if level < low_threshold {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub good_id: String,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub stock_level: i64,
    pub status: StockStatus,
    #[ts(as = "Option<String>")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockReport {
    pub lines: Vec<StockLine>,
    pub item_count: usize,
    pub total_units: i64,
    pub low_count: usize,
    pub out_of_stock_count: usize,
}

/// Joins the catalogue with stock levels. Goods without a stock row count as
/// zero. `search` matches name or category, case-insensitively.
pub fn stock_report(goods: &[Good], inventory: &[InventoryItem], search: &str, low_threshold: i64) -> StockReport {
    let levels: HashMap<&str, &InventoryItem> =
        inventory.iter().map(|i| (i.item_id.as_str(), i)).collect();
    let term = search.trim().to_lowercase();

    let lines: Vec<StockLine> = goods
        .iter()
        .filter(|g| {
            term.is_empty()
                || g.name.to_lowercase().contains(&term)
                || g.category.to_lowercase().contains(&term)
        })
        .map(|g| {
            let row = levels.get(g.id.as_str());
            let stock_level = row.map(|r| r.stock_level).unwrap_or(0);
            StockLine {
                good_id: g.id.clone(),
                name: g.name.clone(),
                category: g.category.clone(),
                price: g.price,
                stock_level,
                status: StockStatus::classify(stock_level, low_threshold),
                last_updated: row.map(|r| r.last_updated),
            }
        })
        .collect();

    StockReport {
        item_count: lines.len(),
        total_units: lines.iter().map(|l| l.stock_level).sum(),
        low_count: lines.iter().filter(|l| l.status == StockStatus::Low).count(),
        out_of_stock_count: lines.iter().filter(|l| l.status == StockStatus::OutOfStock).count(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PurchaseDraft, PurchaseItem};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sale(name: &str, item: &str, major: i64, credit: bool, when: &str) -> Purchase {
        let items = vec![PurchaseItem::new("g", item, Money::from_major(major), 1)];
        let draft = if credit {
            PurchaseDraft::credit(items, name, "")
        } else {
            let mut d = PurchaseDraft::cash(items);
            d.customer_name = name.to_string();
            d
        };
        Purchase::from_draft(draft, at(when)).unwrap()
    }

    fn good(id: &str, name: &str, category: &str) -> Good {
        Good {
            id: id.to_string(),
            name: name.to_string(),
            price: Money::from_major(10),
            category: category.to_string(),
            barcode: None,
            created_at: None,
        }
    }

    #[test]
    fn test_filter_purchases() {
        let purchases = vec![
            sale("Amina", "Rice", 50, true, "2026-03-01T09:00:00Z"),
            sale("", "Bread", 30, false, "2026-03-02T09:00:00Z"),
            sale("Bello", "Milk", 60, false, "2026-03-02T12:00:00Z"),
        ];

        let all = filter_purchases(&purchases, &PurchaseQuery::default());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].items[0].name, "Milk");

        let q = PurchaseQuery { search: Some("bread".into()), ..Default::default() };
        assert_eq!(filter_purchases(&purchases, &q).len(), 1);

        let q = PurchaseQuery { search: Some("AMINA".into()), ..Default::default() };
        assert_eq!(filter_purchases(&purchases, &q).len(), 1);

        let q = PurchaseQuery {
            day: NaiveDate::from_ymd_opt(2026, 3, 2),
            payment_type: Some(PaymentType::Cash),
            ..Default::default()
        };
        assert_eq!(filter_purchases(&purchases, &q).len(), 2);

        let q = PurchaseQuery {
            from: Some(at("2026-03-02T00:00:00Z")),
            until: Some(at("2026-03-02T12:00:00Z")),
            ..Default::default()
        };
        assert_eq!(filter_purchases(&purchases, &q).len(), 1);
    }

    #[test]
    fn test_sales_summary_skips_closed() {
        let mut voided = sale("", "Soap", 25, false, "2026-03-01T09:00:00Z");
        voided.void("mistake", at("2026-03-01T09:05:00Z")).unwrap();
        let purchases = vec![
            sale("Amina", "Rice", 50, true, "2026-03-01T09:00:00Z"),
            sale("", "Bread", 30, false, "2026-03-01T10:00:00Z"),
            voided,
        ];

        let summary = sales_summary(&purchases);
        assert_eq!(summary.total, Money::from_major(80));
        assert_eq!(summary.cash_total, Money::from_major(30));
        assert_eq!(summary.credit_total, Money::from_major(50));
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn test_debtor_summary_and_search() {
        let mut debtors = Vec::new();
        crate::debtor::apply_new_credit_sale(&mut debtors, &sale("Amina", "Rice", 200, true, "2026-01-01T09:00:00Z"));
        crate::debtor::apply_new_credit_sale(&mut debtors, &sale("Bello", "Milk", 60, true, "2026-03-01T09:00:00Z"));
        debtors[1].total_paid = Money::from_major(100);

        let summary = debtor_summary(&debtors, at("2026-03-10T09:00:00Z"), Duration::days(30));
        assert_eq!(summary.total_outstanding, Money::from_major(160));
        assert_eq!(summary.debtor_count, 2);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.in_credit_count, 1);

        assert_eq!(search_debtors(&debtors, "ami").len(), 1);
        assert_eq!(search_debtors(&debtors, "").len(), 2);
    }

    #[test]
    fn test_stock_report() {
        let goods = vec![
            good("a", "Rice (1kg)", "Grains"),
            good("b", "Milk (1L)", "Dairy"),
            good("c", "Eggs (12pcs)", "Dairy"),
        ];
        let now = at("2026-03-01T09:00:00Z");
        let inventory = vec![
            InventoryItem { item_id: "a".into(), stock_level: 40, last_updated: now },
            InventoryItem { item_id: "b".into(), stock_level: 3, last_updated: now },
        ];

        let report = stock_report(&goods, &inventory, "", 10);
        assert_eq!(report.item_count, 3);
        assert_eq!(report.total_units, 43);
        assert_eq!(report.low_count, 1);
        assert_eq!(report.out_of_stock_count, 1);
        assert_eq!(report.lines[2].status, StockStatus::OutOfStock);
        assert_eq!(report.lines[2].last_updated, None);

        let dairy = stock_report(&goods, &inventory, "DAIRY", 10);
        assert_eq!(dairy.item_count, 2);
    }

    #[test]
    fn test_stock_status_boundaries() {
        assert_eq!(StockStatus::classify(0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(9, 10), StockStatus::Low);
        assert_eq!(StockStatus::classify(10, 10), StockStatus::InStock);
    }
}
