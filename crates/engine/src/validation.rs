//! Entry form validation.
//!
//! Form values arrive as raw strings. [`validate_at`] reports every problem
//! keyed by field, except that suspicious input short-circuits with a single
//! generic error that does not reveal which pattern matched.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Category, NewEntry, sanitize};

pub const MAX_AMOUNT: f64 = 10_000_000.0;
pub const TENANT_MIN_CHARS: usize = 2;
pub const TENANT_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

pub const SUSPICIOUS_INPUT_MESSAGE: &str = "Invalid characters detected in input";

/// Form fields, in the order their checks run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Amount,
    Date,
    Tenant,
    Category,
    Description,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Date => "date",
            Self::Tenant => "tenant",
            Self::Category => "category",
            Self::Description => "description",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry form exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntryForm {
    pub tenant: String,
    pub amount: String,
    pub category: String,
    pub description: String,
    pub date: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<Field, String>,
}

impl ValidationResult {
    fn from_errors(errors: BTreeMap<Field, String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// The field rejected by the suspicious-input pre-check, if any.
    pub fn suspicious_field(&self) -> Option<Field> {
        self.errors
            .iter()
            .find(|(_, message)| message.as_str() == SUSPICIOUS_INPUT_MESSAGE)
            .map(|(field, _)| *field)
    }
}

/// Validate against the current moment.
pub fn validate(form: &RawEntryForm) -> ValidationResult {
    validate_at(form, Utc::now())
}

/// Validate against `now`, which anchors the one-year date window.
pub fn validate_at(form: &RawEntryForm, now: DateTime<Utc>) -> ValidationResult {
    if let Some(field) = suspicious_field(form) {
        let mut errors = BTreeMap::new();
        errors.insert(field, SUSPICIOUS_INPUT_MESSAGE.to_string());
        return ValidationResult::from_errors(errors);
    }

    let mut errors = BTreeMap::new();
    if let Err(message) = check_amount(&form.amount) {
        errors.insert(Field::Amount, message.to_string());
    }
    if let Err(message) = check_date(&form.date, now.date_naive()) {
        errors.insert(Field::Date, message.to_string());
    }
    if let Err(message) = check_tenant(&form.tenant) {
        errors.insert(Field::Tenant, message.to_string());
    }
    if let Err(message) = check_category(&form.category) {
        errors.insert(Field::Category, message.to_string());
    }
    if form.description.trim().chars().count() > DESCRIPTION_MAX_CHARS {
        errors.insert(
            Field::Description,
            "Description must be less than 500 characters".to_string(),
        );
    }
    ValidationResult::from_errors(errors)
}

/// Validate and, when clean, convert into a [`NewEntry`] with trimmed text.
pub fn parse_form_at(
    form: &RawEntryForm,
    now: DateTime<Utc>,
) -> Result<NewEntry, ValidationResult> {
    let result = validate_at(form, now);
    if !result.is_valid {
        return Err(result);
    }
    match (
        check_amount(&form.amount),
        parse_date(&form.date),
        check_category(&form.category),
    ) {
        (Ok(amount), Some(date), Ok(category)) => Ok(NewEntry {
            date,
            tenant: form.tenant.trim().to_string(),
            amount,
            category,
            description: form.description.trim().to_string(),
        }),
        _ => Err(result),
    }
}

fn suspicious_field(form: &RawEntryForm) -> Option<Field> {
    [
        (Field::Tenant, form.tenant.as_str()),
        (Field::Description, form.description.as_str()),
    ]
    .into_iter()
    .find(|(_, value)| sanitize::is_suspicious(value))
    .map(|(field, _)| field)
}

fn check_amount(raw: &str) -> Result<f64, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Amount is required");
    }
    let amount = raw
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or("Amount must be a valid number")?;
    if amount <= 0.0 {
        return Err("Amount must be greater than 0");
    }
    if amount > MAX_AMOUNT {
        return Err("Amount must be less than ₹1,00,00,000");
    }
    Ok(amount)
}

/// Accepts `yyyy-MM-dd` or an RFC 3339 timestamp (its UTC date is used).
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc).date_naive())
    })
}

fn check_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, &'static str> {
    if raw.trim().is_empty() {
        return Err("Date is required");
    }
    let date = parse_date(raw).ok_or("Invalid date format")?;
    let earliest = today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
    let latest = today.checked_add_months(Months::new(12)).unwrap_or(NaiveDate::MAX);
    if date < earliest {
        return Err("Date cannot be more than 1 year ago");
    }
    if date > latest {
        return Err("Date cannot be more than 1 year in the future");
    }
    Ok(date)
}

fn check_tenant(raw: &str) -> Result<(), &'static str> {
    let chars = raw.trim().chars().count();
    if chars == 0 {
        return Err("Tenant name is required");
    }
    if chars < TENANT_MIN_CHARS {
        return Err("Tenant name must be at least 2 characters");
    }
    if chars > TENANT_MAX_CHARS {
        return Err("Tenant name must be less than 100 characters");
    }
    Ok(())
}

fn check_category(raw: &str) -> Result<Category, &'static str> {
    if raw.is_empty() {
        return Err("Category is required");
    }
    Category::try_from(raw).map_err(|_| "Invalid category selected")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn form() -> RawEntryForm {
        RawEntryForm {
            tenant: "John Doe".to_string(),
            amount: "1000".to_string(),
            category: "Rent".to_string(),
            description: "June rent".to_string(),
            date: "2025-06-01".to_string(),
        }
    }

    fn with_amount(amount: &str) -> RawEntryForm {
        RawEntryForm {
            amount: amount.to_string(),
            ..form()
        }
    }

    #[test]
    fn well_formed_form_is_valid() {
        let result = validate_at(&form(), now());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn validation_is_idempotent() {
        let bad = with_amount("abc");
        assert_eq!(validate_at(&bad, now()), validate_at(&bad, now()));
        assert_eq!(validate_at(&form(), now()), validate_at(&form(), now()));
    }

    #[test]
    fn amount_boundaries() {
        assert_eq!(
            validate_at(&with_amount("0"), now()).error(Field::Amount),
            Some("Amount must be greater than 0")
        );
        assert_eq!(
            validate_at(&with_amount("10000000.01"), now()).error(Field::Amount),
            Some("Amount must be less than ₹1,00,00,000")
        );
        assert!(validate_at(&with_amount("0.01"), now()).is_valid);
        assert!(validate_at(&with_amount("10000000"), now()).is_valid);
    }

    #[test]
    fn amount_messages() {
        assert_eq!(
            validate_at(&with_amount("  "), now()).error(Field::Amount),
            Some("Amount is required")
        );
        assert_eq!(
            validate_at(&with_amount("12abc"), now()).error(Field::Amount),
            Some("Amount must be a valid number")
        );
        assert_eq!(
            validate_at(&with_amount("NaN"), now()).error(Field::Amount),
            Some("Amount must be a valid number")
        );
        assert_eq!(
            validate_at(&with_amount("-5"), now()).error(Field::Amount),
            Some("Amount must be greater than 0")
        );
    }

    #[test]
    fn tenant_length_boundaries() {
        let tenant = |name: String| RawEntryForm {
            tenant: name,
            ..form()
        };
        assert_eq!(
            validate_at(&tenant("J".to_string()), now()).error(Field::Tenant),
            Some("Tenant name must be at least 2 characters")
        );
        assert!(validate_at(&tenant("Jo".to_string()), now()).is_valid);
        assert!(validate_at(&tenant("a".repeat(100)), now()).is_valid);
        assert_eq!(
            validate_at(&tenant("a".repeat(101)), now()).error(Field::Tenant),
            Some("Tenant name must be less than 100 characters")
        );
        assert_eq!(
            validate_at(&tenant("   ".to_string()), now()).error(Field::Tenant),
            Some("Tenant name is required")
        );
    }

    #[test]
    fn date_window() {
        let dated = |date: &str| RawEntryForm {
            date: date.to_string(),
            ..form()
        };
        assert_eq!(
            validate_at(&dated(""), now()).error(Field::Date),
            Some("Date is required")
        );
        assert_eq!(
            validate_at(&dated("15/06/2025"), now()).error(Field::Date),
            Some("Invalid date format")
        );
        assert_eq!(
            validate_at(&dated("2024-06-14"), now()).error(Field::Date),
            Some("Date cannot be more than 1 year ago")
        );
        assert_eq!(
            validate_at(&dated("2026-06-16"), now()).error(Field::Date),
            Some("Date cannot be more than 1 year in the future")
        );
        assert!(validate_at(&dated("2024-06-15"), now()).is_valid);
        assert!(validate_at(&dated("2026-06-15T08:00:00Z"), now()).is_valid);
    }

    #[test]
    fn category_and_description() {
        let result = validate_at(
            &RawEntryForm {
                category: String::new(),
                description: "x".repeat(501),
                ..form()
            },
            now(),
        );
        assert_eq!(result.error(Field::Category), Some("Category is required"));
        assert_eq!(
            result.error(Field::Description),
            Some("Description must be less than 500 characters")
        );

        let result = validate_at(
            &RawEntryForm {
                category: "Parking".to_string(),
                description: format!("  {}  ", "x".repeat(500)),
                ..form()
            },
            now(),
        );
        assert_eq!(result.error(Field::Category), Some("Invalid category selected"));
        assert_eq!(result.error(Field::Description), None);
    }

    #[test]
    fn collects_every_error() {
        let result = validate_at(
            &RawEntryForm {
                tenant: String::new(),
                amount: String::new(),
                category: String::new(),
                description: String::new(),
                date: String::new(),
            },
            now(),
        );
        assert!(!result.is_valid);
        assert_eq!(
            result.errors.keys().copied().collect::<Vec<_>>(),
            vec![Field::Amount, Field::Date, Field::Tenant, Field::Category]
        );
    }

    #[test]
    fn suspicious_input_short_circuits() {
        let result = validate_at(
            &RawEntryForm {
                tenant: "<script>alert(1)</script>".to_string(),
                amount: String::new(),
                ..form()
            },
            now(),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.error(Field::Tenant), Some(SUSPICIOUS_INPUT_MESSAGE));
        assert_eq!(result.suspicious_field(), Some(Field::Tenant));

        let result = validate_at(
            &RawEntryForm {
                description: "1 OR 1=1".to_string(),
                ..form()
            },
            now(),
        );
        assert_eq!(result.suspicious_field(), Some(Field::Description));
    }

    #[test]
    fn zero_amount_scenario() {
        let result = validate_at(
            &RawEntryForm {
                tenant: "Jo".to_string(),
                amount: "0".to_string(),
                category: "Rent".to_string(),
                description: String::new(),
                date: now().date_naive().format("%Y-%m-%d").to_string(),
            },
            now(),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.error(Field::Amount),
            Some("Amount must be greater than 0")
        );
    }

    #[test]
    fn parse_form_trims_text() {
        let entry = parse_form_at(
            &RawEntryForm {
                tenant: "  John Doe ".to_string(),
                description: " note ".to_string(),
                ..form()
            },
            now(),
        )
        .unwrap();
        assert_eq!(entry.tenant, "John Doe");
        assert_eq!(entry.description, "note");
        assert_eq!(entry.category, Category::Rent);
        assert_eq!(entry.amount, 1000.0);

        assert!(parse_form_at(&with_amount("0"), now()).is_err());
    }
}
