//! Aggregates over a list of entries: totals, per-category and per-tenant
//! breakdowns, and the income/expense statement shown on the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Category, Entry};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub count: usize,
    pub total: f64,
    /// Share of the overall total, 0-100. Zero when the overall total is 0.
    pub percentage: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub count: usize,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_amount: f64,
    pub total_entries: usize,
    pub average_amount: f64,
    /// Always holds every category, zeroed when unused.
    pub category_summary: BTreeMap<Category, CategorySummary>,
    pub tenant_summary: BTreeMap<String, TenantSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TenantShare {
    pub tenant: String,
    pub count: usize,
    pub total: f64,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: Category,
    pub count: usize,
    pub total: f64,
    pub percentage: f64,
}

/// Dashboard cards: income is `Rent` + `Security Deposit`, everything else is
/// an expense.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub entry_count: usize,
}

impl Summary {
    pub fn category(&self, category: Category) -> CategorySummary {
        self.category_summary
            .get(&category)
            .copied()
            .unwrap_or_default()
    }

    pub fn income_statement(&self) -> IncomeStatement {
        let (income, expenses) = self.category_summary.iter().fold(
            (0.0, 0.0),
            |(income, expenses), (category, summary)| {
                if category.is_income() {
                    (income + summary.total, expenses)
                } else {
                    (income, expenses + summary.total)
                }
            },
        );
        IncomeStatement {
            income,
            expenses,
            net: income - expenses,
            entry_count: self.total_entries,
        }
    }
}

/// Single pass over `entries`; percentages are derived afterwards.
pub fn summarize(entries: &[Entry]) -> Summary {
    let mut category_summary: BTreeMap<Category, CategorySummary> = Category::ALL
        .into_iter()
        .map(|category| (category, CategorySummary::default()))
        .collect();
    let mut tenant_summary: BTreeMap<String, TenantSummary> = BTreeMap::new();
    let mut total_amount = 0.0;

    for entry in entries {
        total_amount += entry.amount;

        let category = category_summary.entry(entry.category).or_default();
        category.count += 1;
        category.total += entry.amount;

        let tenant = tenant_summary.entry(entry.tenant.clone()).or_default();
        tenant.count += 1;
        tenant.total += entry.amount;
    }

    for summary in category_summary.values_mut() {
        summary.percentage = percentage(summary.total, total_amount);
    }

    let total_entries = entries.len();
    Summary {
        total_amount,
        total_entries,
        average_amount: if total_entries == 0 {
            0.0
        } else {
            total_amount / total_entries as f64
        },
        category_summary,
        tenant_summary,
    }
}

/// Income statement straight from entries.
pub fn income_statement(entries: &[Entry]) -> IncomeStatement {
    summarize(entries).income_statement()
}

/// Tenants by total, largest first, at most `limit`.
pub fn top_tenants(summary: &Summary, limit: usize) -> Vec<TenantShare> {
    let mut shares: Vec<TenantShare> = summary
        .tenant_summary
        .iter()
        .map(|(tenant, data)| TenantShare {
            tenant: tenant.clone(),
            count: data.count,
            total: data.total,
            percentage: percentage(data.total, summary.total_amount),
        })
        .collect();
    shares.sort_by(|a, b| b.total.total_cmp(&a.total));
    shares.truncate(limit);
    shares
}

/// Categories that have entries, largest total first.
pub fn top_categories(summary: &Summary) -> Vec<CategoryShare> {
    let mut shares: Vec<CategoryShare> = summary
        .category_summary
        .iter()
        .filter(|(_, data)| data.count > 0)
        .map(|(category, data)| CategoryShare {
            category: *category,
            count: data.count,
            total: data.total,
            percentage: data.percentage,
        })
        .collect();
    shares.sort_by(|a, b| b.total.total_cmp(&a.total));
    shares
}

/// Entries grouped by `yyyy-MM`, in chronological key order.
pub fn group_by_month(entries: &[Entry]) -> BTreeMap<String, Vec<Entry>> {
    let mut groups: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry(entry.date.format("%Y-%m").to_string())
            .or_default()
            .push(entry.clone());
    }
    groups
}

fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}
