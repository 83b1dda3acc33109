//! Contact detection over the CV header lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::resume::ContactDetails;
use crate::parsing::keywords::Heuristics;

/// How many leading lines are searched for contact information.
pub const CONTACT_SCAN_LINES: usize = 8;

/// Minimum digits for a run to count as a phone number (dates stay below this).
const MIN_PHONE_DIGITS: usize = 10;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static PHONE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s\-().]{6,}\d").expect("valid phone regex"));

static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:[a-z]{2,3}\.)?linkedin\.com/[^\s|,;]+")
        .expect("valid linkedin regex")
});

/// True when a line looks like contact information: an `@`, a long digit run,
/// or a locality / network keyword.
pub fn is_contact_line(line: &str, heuristics: &Heuristics) -> bool {
    line.contains('@') || find_phone(line).is_some() || heuristics.has_locality(line)
}

/// Scans the given lines for the first email, phone number and LinkedIn URL.
pub fn scan_contact_details<'a, I>(lines: I) -> ContactDetails
where
    I: IntoIterator<Item = &'a str>,
{
    let mut details = ContactDetails::default();
    for line in lines {
        if details.email.is_empty() {
            if let Some(m) = EMAIL.find(line) {
                details.email = m.as_str().to_string();
            }
        }
        if details.phone.is_empty() {
            if let Some(phone) = find_phone(line) {
                details.phone = phone;
            }
        }
        if details.linkedin.is_empty() {
            if let Some(m) = LINKEDIN.find(line) {
                details.linkedin = m.as_str().trim_end_matches(['/', '.']).to_string();
            }
        }
    }
    details
}

fn find_phone(line: &str) -> Option<String> {
    PHONE_CANDIDATE
        .find_iter(line)
        .map(|m| m.as_str().trim())
        .find(|candidate| candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS)
        .map(String::from)
}
