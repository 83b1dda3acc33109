//! Experience Tokenizer: groups experience-section lines into role entries.
//!
//! Best-effort recovery, not a grammar. Lines are classified by shape in
//! priority order (see `classify_line`) and folded into entries. An entry is
//! only ever opened by a date line or a role-title line, so text containing
//! neither produces no entries.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::request::strip_bullet_marker;
use crate::models::resume::ExperienceEntry;
use crate::parsing::keywords::Heuristics;

/// Date lines at or above this length are treated as prose, not role boundaries.
const MAX_DATE_LINE_CHARS: usize = 40;
/// Longest plain line that may be taken as a company name.
const MAX_COMPANY_LINE_CHARS: usize = 60;

pub(crate) static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// Start of a date expression: optional month name or `MM/`, then a year.
static DATE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+|\b\d{1,2}/)?\b(?:19|20)\d{2}\b",
    )
    .expect("valid date start regex")
});

static RANGE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:–|—|-|\bto\b)\s*").expect("valid range separator regex"));

const BULLET_MARKERS: &[char] = &['-', '•', '*', '·', '▪'];

/// The shape of a single line, in classification priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineShape<'a> {
    /// Contains a year and is short: a role boundary.
    Dates,
    /// Starts with a bullet marker; carries the text after the marker.
    Bullet(&'a str),
    /// Contains a role-title keyword.
    Title,
    /// Anything else.
    Plain,
}

/// A bulleted line only counts as dates when nothing but dates follow the
/// marker; "- Promoted to lead in 2021" is an achievement, not a boundary.
pub fn classify_line<'a>(line: &'a str, heuristics: &Heuristics) -> LineShape<'a> {
    let bulleted = line.starts_with(BULLET_MARKERS);
    let short_dated = YEAR.is_match(line) && line.chars().count() < MAX_DATE_LINE_CHARS;
    if short_dated && !(bulleted && has_text_before_dates(strip_bullet_marker(line))) {
        LineShape::Dates
    } else if bulleted {
        LineShape::Bullet(strip_bullet_marker(line))
    } else if heuristics.is_role_title(line) {
        LineShape::Title
    } else {
        LineShape::Plain
    }
}

/// Date context split out of a date line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateContext {
    /// Text before the first date token, e.g. a company or "Title, Company".
    pub prefix: String,
    pub start: String,
    pub end: String,
}

pub fn split_date_line(line: &str) -> DateContext {
    let Some(found) = DATE_START.find(line) else {
        return DateContext {
            prefix: clean_fragment(line),
            ..Default::default()
        };
    };

    let prefix = clean_fragment(&line[..found.start()]);
    let mut parts = RANGE_SEPARATOR.splitn(&line[found.start()..], 2);
    let start = parts.next().map(clean_fragment).unwrap_or_default();
    let end = parts.next().map(clean_fragment).unwrap_or_default();
    DateContext { prefix, start, end }
}

fn has_text_before_dates(text: &str) -> bool {
    DATE_START
        .find(text)
        .is_some_and(|found| !clean_fragment(&text[..found.start()]).is_empty())
}

fn clean_fragment(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '|' | '(' | ')' | '[' | ']' | ':' | '-' | '–' | '—')
        })
        .to_string()
}

/// Tokenizes the experience segment. Never fails; text with no date or
/// role-title lines yields no entries.
pub fn tokenize_experience(segment_text: &str, heuristics: &Heuristics) -> Vec<ExperienceEntry> {
    let mut entries = Vec::new();
    let mut current: Option<ExperienceEntry> = None;

    for line in segment_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match classify_line(line, heuristics) {
            LineShape::Dates => {
                let context = split_date_line(line);
                match current.as_mut().filter(|e| awaiting_dates(e)) {
                    Some(entry) => apply_dates(entry, context, heuristics),
                    None => {
                        close(&mut entries, current.take());
                        let mut entry = ExperienceEntry::default();
                        apply_dates(&mut entry, context, heuristics);
                        current = Some(entry);
                    }
                }
            }
            LineShape::Bullet(text) => {
                if let Some(entry) = current.as_mut() {
                    if !text.is_empty() {
                        entry.bullets.push(text.to_string());
                    }
                }
            }
            LineShape::Title => match current.as_mut() {
                None => current = Some(open_with_title(line)),
                Some(entry) if entry.title.is_empty() => entry.title = line.to_string(),
                Some(entry) if entry.has_dates() || !entry.bullets.is_empty() => {
                    close(&mut entries, current.take());
                    current = Some(open_with_title(line));
                }
                Some(entry) if entry.company.is_empty() => entry.company = line.to_string(),
                Some(entry) => entry.bullets.push(line.to_string()),
            },
            LineShape::Plain => {
                if let Some(entry) = current.as_mut() {
                    if takes_company(entry, line) {
                        entry.company = line.to_string();
                    } else {
                        entry.bullets.push(line.to_string());
                    }
                }
            }
        }
    }

    close(&mut entries, current);
    entries
}

fn open_with_title(line: &str) -> ExperienceEntry {
    ExperienceEntry {
        title: line.to_string(),
        ..Default::default()
    }
}

/// An entry that has a heading (title or company) but nothing under it yet.
fn awaiting_dates(entry: &ExperienceEntry) -> bool {
    (!entry.title.is_empty() || !entry.company.is_empty())
        && !entry.has_dates()
        && entry.bullets.is_empty()
}

fn takes_company(entry: &ExperienceEntry, line: &str) -> bool {
    entry.company.is_empty()
        && entry.bullets.is_empty()
        && line.chars().count() < MAX_COMPANY_LINE_CHARS
        && !line.ends_with('.')
}

fn apply_dates(entry: &mut ExperienceEntry, context: DateContext, heuristics: &Heuristics) {
    entry.start = context.start;
    entry.end = context.end;

    if context.prefix.is_empty() {
        return;
    }
    if entry.title.is_empty() && heuristics.is_role_title(&context.prefix) {
        entry.title = context.prefix;
    } else if entry.company.is_empty() {
        let (company, location) = context
            .prefix
            .split_once(',')
            .unwrap_or((context.prefix.as_str(), ""));
        entry.company = company.trim().to_string();
        if entry.location.is_empty() {
            entry.location = location.trim().to_string();
        }
    } else if entry.location.is_empty() {
        entry.location = context.prefix;
    }
}

fn close(entries: &mut Vec<ExperienceEntry>, entry: Option<ExperienceEntry>) {
    if let Some(entry) = entry.filter(|e| !e.is_empty()) {
        entries.push(entry);
    }
}

/// Renders entries back into the line layout the tokenizer reads.
pub fn render_experience_text(entries: &[ExperienceEntry]) -> String {
    let mut lines = Vec::new();
    for entry in entries {
        let heading = [entry.title.as_str(), entry.company.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if !heading.is_empty() {
            lines.push(heading);
        }
        let dates = entry.date_range();
        if !dates.is_empty() {
            lines.push(dates);
        }
        lines.extend(entry.bullets.iter().map(|b| format!("- {b}")));
    }
    lines.join("\n")
}
