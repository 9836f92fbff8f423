//! Link extraction from directory listing pages.
//!
//! Everything that knows about the shape of the remote HTML lives here. The
//! matching is targeted at known URL paths rather than a full HTML parse.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::codes::{Subject, YearCode};

static LOOSE_SUBJECT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]*href="[^"]*/([A-Z]{2,4})(?:/|")"#).expect("valid subject regex")
});

/// Subject anchors: `href="<root><CODE>/"`
pub fn subject_pattern(root: &str) -> Regex {
    Regex::new(&format!(
        r#"href="{}([A-Z]{{2,4}})(?:/|")"#,
        regex::escape(root)
    ))
    .expect("escaped subject pattern is valid")
}

/// Year anchors: `href="<root><SUBJECT>/<LETTERS+4 digits>/"`
pub fn year_pattern(root: &str, subject: &Subject) -> Regex {
    Regex::new(&format!(
        r#"href="{}{}/([A-Z]+[0-9]{{4}})(?:/|")"#,
        regex::escape(root),
        regex::escape(subject.as_str())
    ))
    .expect("escaped year pattern is valid")
}

fn loose_year_pattern(subject: &Subject) -> Regex {
    Regex::new(&format!(
        r#"href="[^"]*/({}[0-9]{{4}})(?:/|")"#,
        regex::escape(subject.as_str())
    ))
    .expect("escaped year pattern is valid")
}

fn captures<T: std::str::FromStr>(pattern: &Regex, html: &str) -> BTreeSet<T>
where
    T: Ord,
{
    pattern
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Distinct subject codes linked from the catalog root, ascending.
///
/// Falls back to any anchor ending in a short uppercase segment when no link
/// has the exact root prefix. An empty set means nothing matched.
pub fn extract_subjects(html: &str, primary: &Regex) -> BTreeSet<Subject> {
    let subjects = captures(primary, html);
    if !subjects.is_empty() {
        return subjects;
    }
    captures(&LOOSE_SUBJECT_REGEX, html)
}

/// Distinct year codes linked from a subject index, most recent first.
pub fn extract_years(html: &str, root: &str, subject: &Subject) -> Vec<YearCode> {
    let mut years: BTreeSet<YearCode> = captures(&year_pattern(root, subject), html);
    if years.is_empty() {
        years = captures(&loose_year_pattern(subject), html);
    }
    years.into_iter().rev().collect()
}
