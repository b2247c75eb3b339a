//! Display helpers for amounts.
//!
//! Amounts are stored as `f64` with full precision; rounding to two decimals
//! only happens here.

/// Formats `amount` as Indian rupees with en-IN digit grouping.
///
/// # Examples
///
/// ```rust
/// use engine::format_currency;
///
/// assert_eq!(format_currency(1234.5), "₹1,234.50");
/// assert_eq!(format_currency(10_000_000.0), "₹1,00,00,000.00");
/// assert_eq!(format_currency(-800.0), "-₹800.00");
/// ```
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}₹{}.{fraction}", group_en_in(integer))
}

/// Last three digits form one group, every two digits before that another.
fn group_en_in(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}
