//! Education Tokenizer: one qualification per line, with multi-line layouts
//! ("Degree / Institution / Year") folded into the previous entry.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::request::strip_bullet_marker;
use crate::models::resume::EducationEntry;
use crate::parsing::experience::YEAR;
use crate::parsing::keywords::word_tokens;

/// A year or year range, with optional month names, e.g. `Sept 2015 - June 2018`.
static DATE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+)?\b(?:19|20)\d{2}\b(?:\s*(?:–|—|-|\bto\b)\s*(?:\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+)?(?:\b(?:19|20)\d{2}\b|present|current))?",
    )
    .expect("valid education date regex")
});

static FIELD_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:,|\||\s[-–—]\s)\s*").expect("valid education field separator regex")
});

const DEGREE_TOKENS: &[&str] = &[
    "bsc", "ba", "beng", "msc", "ma", "meng", "mba", "phd", "llb", "degree", "diploma",
    "certificate", "a-level", "a-levels", "gcse", "gcses", "hnd", "hnc", "btec", "bachelor",
    "bachelors", "master", "masters", "doctorate", "nvq",
];

/// Tokenizes the education segment. Never fails; entries with every field
/// empty are dropped.
pub fn tokenize_education(segment_text: &str) -> Vec<EducationEntry> {
    let mut entries: Vec<EducationEntry> = Vec::new();

    for line in segment_text
        .lines()
        .map(strip_bullet_marker)
        .filter(|l| !l.is_empty())
    {
        let year = YEAR
            .find_iter(line)
            .last()
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let without_dates = DATE_SPAN.replace_all(line, " ");
        let parts: Vec<String> = FIELD_SEPARATOR
            .split(without_dates.trim())
            .map(|p| {
                p.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
                    .to_string()
            })
            .filter(|p| !p.is_empty())
            .collect();

        match parts.as_slice() {
            [] => {
                // Year-only line: belongs to the entry above it.
                if let Some(previous) = entries.last_mut().filter(|e| e.year.is_empty()) {
                    previous.year = year;
                }
            }
            [single] => {
                let is_degree = mentions_degree(single);
                let fills_previous = entries.last_mut().filter(|e| {
                    e.year.is_empty()
                        && if is_degree {
                            e.degree.is_empty()
                        } else {
                            e.institution.is_empty() && !e.degree.is_empty()
                        }
                });
                match fills_previous {
                    Some(previous) => {
                        if is_degree {
                            previous.degree = single.clone();
                        } else {
                            previous.institution = single.clone();
                        }
                        previous.year = year;
                    }
                    None => entries.push(EducationEntry {
                        degree: if is_degree { single.clone() } else { String::new() },
                        institution: if is_degree { String::new() } else { single.clone() },
                        year,
                    }),
                }
            }
            [first, second, ..] => entries.push(EducationEntry {
                degree: first.clone(),
                institution: second.clone(),
                year,
            }),
        }
    }

    entries.retain(|e| !e.is_empty());
    entries
}

fn mentions_degree(text: &str) -> bool {
    word_tokens(text)
        .iter()
        .any(|token| DEGREE_TOKENS.contains(&token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_education_line() {
        let entries = tokenize_education("BSc Marketing, LeedsUni, 2018");
        assert_eq!(
            entries,
            vec![EducationEntry {
                degree: "BSc Marketing".to_string(),
                institution: "LeedsUni".to_string(),
                year: "2018".to_string(),
            }]
        );
    }

    #[test]
    fn test_range_keeps_graduation_year() {
        let entries = tokenize_education("MSc Finance | University of York | Sept 2018 - June 2019");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].degree, "MSc Finance");
        assert_eq!(entries[0].institution, "University of York");
        assert_eq!(entries[0].year, "2019");
    }

    #[test]
    fn test_multi_line_layout_folds_into_one_entry() {
        let entries = tokenize_education("BA History\nUniversity of Leeds\n2012 - 2015");
        assert_eq!(
            entries,
            vec![EducationEntry {
                degree: "BA History".to_string(),
                institution: "University of Leeds".to_string(),
                year: "2015".to_string(),
            }]
        );
    }

    #[test]
    fn test_single_institution_line() {
        let entries = tokenize_education("Harrogate Grammar School");
        assert_eq!(entries[0].institution, "Harrogate Grammar School");
        assert!(entries[0].degree.is_empty());
    }

    #[test]
    fn test_multiple_complete_lines() {
        let entries =
            tokenize_education("- BSc Marketing, Leeds, 2018\n- A-Levels, Harrogate College (2015)");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].degree, "A-Levels");
        assert_eq!(entries[1].institution, "Harrogate College");
        assert_eq!(entries[1].year, "2015");
    }

    #[test]
    fn test_orphan_year_and_empty_input() {
        assert!(tokenize_education("").is_empty());
        assert!(tokenize_education("2018").is_empty());
    }
}
