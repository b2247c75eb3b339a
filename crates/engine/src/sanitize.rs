//! Detection and scrubbing of unsafe text in free-form fields.
//!
//! The detectors are denylists and the scrubbers are lossy. Neither is a
//! security boundary: encodings the patterns do not know pass through.

use std::sync::LazyLock;

use regex::{Regex, RegexSet};

#[allow(clippy::expect_used)]
fn compile_set(patterns: &[&str]) -> RegexSet {
    // Literal patterns, exercised by the tests below.
    RegexSet::new(patterns).expect("sanitizer patterns must compile")
}

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("sanitizer pattern must compile")
}

static SQL_INJECTION: LazyLock<RegexSet> = LazyLock::new(|| {
    compile_set(&[
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|UNION)\b",
        r"(?i)\b(OR|AND)\s+\d+\s*=\s*\d+",
        r"--|/\*|\*/",
        r"(?i)\b(SCRIPT|JAVASCRIPT|VBSCRIPT)\b",
        r#"['";]"#,
    ])
});

static XSS: LazyLock<RegexSet> = LazyLock::new(|| {
    compile_set(&[
        r"(?is)<script\b.*?</script\s*>",
        r"(?i)(javascript|vbscript)\s*:",
        r"(?i)\bdata\s*:\s*[a-z]+/[a-z0-9.+-]+",
        r"(?i)\bon\w+\s*=",
        r"(?i)<\s*(iframe|object|embed|form|applet|meta|link|base|svg)\b",
    ])
});

static ANGLE_BRACKETS: LazyLock<Regex> = LazyLock::new(|| compile(r"[<>]"));
static URL_SCHEMES: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(javascript|vbscript|data)\s*:"));
static EVENT_HANDLERS: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bon\w+\s*="));

/// `true` when `input` looks like an SQL injection attempt: SQL keywords as
/// whole words, `OR 1=1` style tautologies, comment delimiters, quotes or
/// semicolons.
pub fn detect_sql_injection(input: &str) -> bool {
    SQL_INJECTION.is_match(input)
}

/// `true` when `input` looks like markup meant to run script: `<script>`
/// pairs, script or data URLs, inline event handlers, embeddable tags.
pub fn detect_xss(input: &str) -> bool {
    XSS.is_match(input)
}

/// Either detector fires.
pub fn is_suspicious(input: &str) -> bool {
    detect_sql_injection(input) || detect_xss(input)
}

/// Best-effort cleanup applied while a value is being typed.
///
/// Strips angle brackets, script/data URL schemes, event-handler attribute
/// prefixes and control characters. Whitespace is kept as typed.
pub fn sanitize(input: &str) -> String {
    let without_controls: String = input.chars().filter(|c| !c.is_control()).collect();
    let without_tags = ANGLE_BRACKETS.replace_all(&without_controls, "");
    let without_schemes = URL_SCHEMES.replace_all(&without_tags, "");
    EVENT_HANDLERS.replace_all(&without_schemes, "").into_owned()
}

/// Normalization applied by the store before persisting: trim and drop angle
/// brackets.
pub fn sanitize_input(input: &str) -> String {
    ANGLE_BRACKETS.replace_all(input.trim(), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_keywords_and_tautologies() {
        assert!(detect_sql_injection("1; DROP TABLE entries"));
        assert!(detect_sql_injection("x or 1 = 1"));
        assert!(detect_sql_injection("name -- comment"));
        assert!(detect_sql_injection("/* hidden */"));
        assert!(detect_sql_injection("O'Brien"));
        assert!(!detect_sql_injection("Plumbing repair for flat 4B"));
        assert!(!detect_sql_injection("Selection of tiles"));
    }

    #[test]
    fn xss_patterns() {
        assert!(detect_xss("<script>alert(1)</script>"));
        assert!(detect_xss("<SCRIPT src=x>\n</script >"));
        assert!(detect_xss("javascript:alert(1)"));
        assert!(detect_xss("VBScript : msgbox"));
        assert!(detect_xss("data:text/html;base64,PHNjcmlwdD4="));
        assert!(detect_xss("<img src=x onerror=alert(1)>"));
        assert!(detect_xss("<iframe src=evil>"));
        assert!(detect_xss("< embed src=x>"));
        assert!(!detect_xss("Maintenance done=yes"));
        assert!(!detect_xss("Meter data: 1200 units"));
        assert!(!detect_xss("John Doe"));
    }

    #[test]
    fn sanitize_strips_markup_and_controls() {
        assert_eq!(
            sanitize("<b onclick=run()>Jo\u{0}hn</b>"),
            "b run()John/b"
        );
        assert_eq!(sanitize("javascript:alert(1)"), "alert(1)");
        assert_eq!(sanitize("tab\u{9f}bed  "), "tabbed  ");
    }

    #[test]
    fn sanitize_input_trims_and_drops_brackets() {
        assert_eq!(sanitize_input("  test  "), "test");
        assert_eq!(
            sanitize_input("<script>alert(\"test\")</script>"),
            "scriptalert(\"test\")/script"
        );
    }
}
