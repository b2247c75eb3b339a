//! Client-side filtering of ledger entries.
//!
//! A [`FilterSpec`] is a conjunction of optional predicates. Absent fields
//! match everything. An empty category list also matches everything rather
//! than nothing.
//!
//! Dates are compared as calendar dates; entries carry no time of day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Category, Entry, validation::parse_date};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Exact, case-sensitive tenant match.
    pub tenant: Option<String>,
    pub categories: Vec<Category>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    /// Case-insensitive substring of description or tenant.
    pub search_term: Option<String>,
}

/// Filter form values exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub tenant: Option<String>,
    pub categories: Vec<String>,
    pub amount_min: Option<String>,
    pub amount_max: Option<String>,
    pub search_term: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    DateFrom,
    DateTo,
    Categories,
    AmountMin,
    AmountMax,
}

pub type FilterErrors = BTreeMap<FilterField, String>;

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Parse typed form values. Blank values count as absent; malformed ones
    /// are reported instead of silently matching nothing.
    pub fn from_raw(raw: &RawFilter) -> Result<Self, FilterErrors> {
        let mut errors = FilterErrors::new();

        let mut date = |value: &Option<String>, field| match non_blank(value) {
            None => None,
            Some(value) => {
                let parsed = parse_date(value);
                if parsed.is_none() {
                    errors.insert(field, "Invalid date format".to_string());
                }
                parsed
            }
        };
        let date_from = date(&raw.date_from, FilterField::DateFrom);
        let date_to = date(&raw.date_to, FilterField::DateTo);

        let mut amount = |value: &Option<String>, field| match non_blank(value) {
            None => None,
            Some(value) => {
                let parsed = value.parse::<f64>().ok().filter(|v| v.is_finite());
                if parsed.is_none() {
                    errors.insert(field, "Amount must be a valid number".to_string());
                }
                parsed
            }
        };
        let amount_min = amount(&raw.amount_min, FilterField::AmountMin);
        let amount_max = amount(&raw.amount_max, FilterField::AmountMax);

        let mut categories = Vec::with_capacity(raw.categories.len());
        for name in &raw.categories {
            match Category::try_from(name.as_str()) {
                Ok(category) => categories.push(category),
                Err(_) => {
                    errors.insert(
                        FilterField::Categories,
                        "Invalid category selected".to_string(),
                    );
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            date_from,
            date_to,
            tenant: non_blank(&raw.tenant).map(ToString::to_string),
            categories,
            amount_min,
            amount_max,
            search_term: non_blank(&raw.search_term).map(ToString::to_string),
        })
    }

    /// Report inverted ranges. Filtering never requires this.
    pub fn validate(&self) -> Result<(), FilterErrors> {
        let mut errors = FilterErrors::new();
        if let (Some(min), Some(max)) = (self.amount_min, self.amount_max)
            && min > max
        {
            errors.insert(
                FilterField::AmountMin,
                "Minimum amount must be less than or equal to maximum amount".to_string(),
            );
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to)
            && from > to
        {
            errors.insert(
                FilterField::DateFrom,
                "From date must be before or equal to to date".to_string(),
            );
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Combine two specs; fields present in `other` win.
    pub fn merge(self, other: FilterSpec) -> FilterSpec {
        FilterSpec {
            date_from: other.date_from.or(self.date_from),
            date_to: other.date_to.or(self.date_to),
            tenant: other.tenant.or(self.tenant),
            categories: if other.categories.is_empty() {
                self.categories
            } else {
                other.categories
            },
            amount_min: other.amount_min.or(self.amount_min),
            amount_max: other.amount_max.or(self.amount_max),
            search_term: other.search_term.or(self.search_term),
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if self.date_from.is_some_and(|from| entry.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| entry.date > to) {
            return false;
        }
        if let Some(tenant) = self.tenant.as_deref()
            && !tenant.is_empty()
            && entry.tenant != tenant
        {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&entry.category) {
            return false;
        }
        if self.amount_min.is_some_and(|min| entry.amount < min) {
            return false;
        }
        if self.amount_max.is_some_and(|max| entry.amount > max) {
            return false;
        }
        if let Some(term) = self.search_term.as_deref()
            && !term.is_empty()
        {
            let needle = term.to_lowercase();
            let in_description = entry.description.to_lowercase().contains(&needle);
            let in_tenant = entry.tenant.to_lowercase().contains(&needle);
            if !in_description && !in_tenant {
                return false;
            }
        }
        true
    }
}

/// Entries matching every present predicate of `spec`, in input order.
pub fn filter_entries(entries: &[Entry], spec: &FilterSpec) -> Vec<Entry> {
    entries
        .iter()
        .filter(|entry| spec.matches(entry))
        .cloned()
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::NewEntry;

    fn entry(id: &str, date: &str, tenant: &str, amount: f64, category: Category, note: &str) -> Entry {
        Entry::from_new(
            id.to_string(),
            "alice",
            NewEntry {
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                tenant: tenant.to_string(),
                amount,
                category,
                description: note.to_string(),
            },
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn ledger() -> Vec<Entry> {
        vec![
            entry("1", "2025-01-01", "John Doe", 1000.0, Category::Rent, "January rent"),
            entry("2", "2025-01-10", "Jane Smith", 500.0, Category::Maintenance, "Plumbing repair"),
            entry("3", "2025-02-01", "John Doe", 120.0, Category::Utilities, "Water bill"),
            entry("4", "2025-02-15", "PLUMBING Co", 80.0, Category::Other, "Parts"),
            entry("5", "2025-03-01", "Jane Smith", 2000.0, Category::SecurityDeposit, "Deposit"),
        ]
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_categories_is_identity() {
        let spec = FilterSpec {
            categories: vec![],
            ..Default::default()
        };
        assert_eq!(filter_entries(&ledger(), &spec), ledger());
    }

    #[test]
    fn date_range_is_inclusive() {
        let spec = FilterSpec {
            date_from: NaiveDate::from_ymd_opt(2025, 1, 10),
            date_to: NaiveDate::from_ymd_opt(2025, 2, 15),
            ..Default::default()
        };
        assert_eq!(ids(&filter_entries(&ledger(), &spec)), vec!["2", "3", "4"]);
    }

    #[test]
    fn tenant_is_exact_and_case_sensitive() {
        let spec = FilterSpec {
            tenant: Some("John Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_entries(&ledger(), &spec)), vec!["1", "3"]);

        let spec = FilterSpec {
            tenant: Some("john doe".to_string()),
            ..Default::default()
        };
        assert!(filter_entries(&ledger(), &spec).is_empty());
    }

    #[test]
    fn categories_and_amounts() {
        let spec = FilterSpec {
            categories: vec![Category::Rent, Category::SecurityDeposit],
            amount_min: Some(1000.0),
            amount_max: Some(1500.0),
            ..Default::default()
        };
        assert_eq!(ids(&filter_entries(&ledger(), &spec)), vec!["1"]);
    }

    #[test]
    fn search_matches_description_or_tenant() {
        let spec = FilterSpec {
            search_term: Some("plumbing".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_entries(&ledger(), &spec)), vec!["2", "4"]);
    }

    #[test]
    fn disjoint_specs_compose() {
        let a = FilterSpec {
            categories: vec![Category::Maintenance, Category::Other, Category::Rent],
            ..Default::default()
        };
        let b = FilterSpec {
            date_from: NaiveDate::from_ymd_opt(2025, 1, 5),
            search_term: Some("p".to_string()),
            ..Default::default()
        };
        let chained = filter_entries(&filter_entries(&ledger(), &a), &b);
        let merged = filter_entries(&ledger(), &a.clone().merge(b));
        assert_eq!(chained, merged);
        assert_eq!(ids(&merged), vec!["2", "4"]);
    }

    #[test]
    fn from_raw_parses_and_reports() {
        let spec = FilterSpec::from_raw(&RawFilter {
            date_from: Some("2025-01-01".to_string()),
            tenant: Some("  ".to_string()),
            categories: vec!["Rent".to_string()],
            amount_max: Some("1500".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(spec.date_from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(spec.tenant, None);
        assert_eq!(spec.categories, vec![Category::Rent]);
        assert_eq!(spec.amount_max, Some(1500.0));

        let errors = FilterSpec::from_raw(&RawFilter {
            date_to: Some("not a date".to_string()),
            amount_min: Some("ten".to_string()),
            categories: vec!["Parking".to_string()],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec![
                FilterField::DateTo,
                FilterField::Categories,
                FilterField::AmountMin
            ]
        );
    }

    #[test]
    fn validate_reports_inverted_ranges() {
        let spec = FilterSpec {
            amount_min: Some(10.0),
            amount_max: Some(5.0),
            date_from: NaiveDate::from_ymd_opt(2025, 2, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        let errors = spec.validate().unwrap_err();
        assert!(errors.contains_key(&FilterField::AmountMin));
        assert!(errors.contains_key(&FilterField::DateFrom));
        assert!(FilterSpec::default().validate().is_ok());
    }
}
