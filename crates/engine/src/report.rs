//! Printable HTML report: income statement followed by the entries table.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::{Entry, format_currency, summary::income_statement};

pub const DEFAULT_REPORT_TITLE: &str = "Tenant Ledger Report";

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.header { text-align: center; margin-bottom: 30px; }
.summary { background: #f5f5f5; padding: 15px; margin-bottom: 20px; border-radius: 5px; }
.summary-grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 10px; }
table { width: 100%; border-collapse: collapse; margin-top: 20px; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
.amount { text-align: right; }
@media print { body { margin: 0; } }";

/// Escape text for use in HTML element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `tenant-ledger-report-<yyyy-MM-dd>.html`
pub fn report_filename(date: NaiveDate) -> String {
    format!("tenant-ledger-report-{}.html", date.format("%Y-%m-%d"))
}

/// Render `entries` as a standalone HTML page, in input order.
///
/// Every user-supplied string (title, tenant, description) is escaped.
pub fn render_report(entries: &[Entry], title: &str, generated_on: NaiveDate) -> String {
    let statement = income_statement(entries);
    let title = escape_html(title);

    let mut rows = String::new();
    for entry in entries {
        // Writing into a String cannot fail.
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"amount\">{}</td></tr>",
            entry.date.format("%b %-d, %Y"),
            escape_html(&entry.tenant),
            escape_html(entry.category.as_str()),
            escape_html(&entry.description),
            format_currency(entry.amount),
        );
    }

    format!(
        "<!DOCTYPE html>
<html>
<head>
<meta charset=\"utf-8\">
<title>{title}</title>
<style>
{STYLE}
</style>
</head>
<body>
<div class=\"header\">
<h1>{title}</h1>
<p>Generated on {generated}</p>
</div>
<div class=\"summary\">
<h2>Summary</h2>
<div class=\"summary-grid\">
<div><strong>Total Income:</strong> {income}</div>
<div><strong>Total Expenses:</strong> {expenses}</div>
<div><strong>Net Income:</strong> {net}</div>
<div><strong>Total Entries:</strong> {count}</div>
</div>
</div>
<table>
<thead>
<tr><th>Date</th><th>Tenant</th><th>Category</th><th>Description</th><th class=\"amount\">Amount</th></tr>
</thead>
<tbody>
{rows}</tbody>
</table>
</body>
</html>
",
        generated = generated_on.format("%B %-d, %Y"),
        income = format_currency(statement.income),
        expenses = format_currency(statement.expenses),
        net = format_currency(statement.net),
        count = statement.entry_count,
    )
}
