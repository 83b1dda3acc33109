//! Deterministic, non-generative alignment content.
//!
//! Used when no completion capability is configured, or when a completion
//! call fails with a non-terminal error. Every function here is pure: the
//! same parsed CV and job description always produce the same output.

use crate::alignment::{truncate_chars, MAX_SKILLS, SUMMARY_MAX_CHARS};
use crate::models::resume::{ExperienceEntry, ParsedCv};
use crate::parsing::contact::is_contact_line;
use crate::parsing::keywords::{contains_phrase, word_tokens, Heuristics};
use crate::parsing::segmenter::classify_heading;

/// Header lines considered when the CV has no summary section.
const MAX_PREAMBLE_LINES: usize = 4;

/// Skills recognised without a completion call, in output order.
pub const SKILL_VOCABULARY: &[&str] = &[
    "Account Management",
    "Business Development",
    "Sales",
    "Negotiation",
    "Customer Service",
    "Stakeholder Management",
    "Project Management",
    "Team Leadership",
    "People Management",
    "Communication",
    "Presentation",
    "Problem Solving",
    "Time Management",
    "Marketing",
    "Digital Marketing",
    "Content Marketing",
    "Social Media",
    "SEO",
    "Copywriting",
    "CRM",
    "Salesforce",
    "HubSpot",
    "Budgeting",
    "Forecasting",
    "Financial Analysis",
    "Accounting",
    "Data Analysis",
    "Reporting",
    "Excel",
    "Microsoft Office",
    "PowerPoint",
    "Power BI",
    "Tableau",
    "SQL",
    "Python",
    "Java",
    "JavaScript",
    "TypeScript",
    "Rust",
    "React",
    "AWS",
    "Azure",
    "Docker",
    "Kubernetes",
    "Git",
    "Agile",
    "Scrum",
    "Operations",
    "Logistics",
    "Supply Chain",
    "Procurement",
    "Compliance",
    "Risk Management",
    "Recruitment",
    "Training",
    "Research",
];

/// Summary from the CV itself: the summary section, else the free lines of
/// the header, else a sentence built from the first role title.
pub fn fallback_summary(
    cv: &ParsedCv,
    experience: &[ExperienceEntry],
    heuristics: &Heuristics,
) -> String {
    let summary = if !cv.summary_text.trim().is_empty() {
        join_sentences(cv.summary_text.lines())
    } else {
        let preamble = preamble_lines(cv, heuristics);
        if preamble.is_empty() {
            templated_summary(experience)
        } else {
            join_sentences(preamble.into_iter())
        }
    };
    truncate_chars(&summary, SUMMARY_MAX_CHARS).trim_end().to_string()
}

/// Lines before the first heading that are not the name or contact details.
fn preamble_lines<'a>(cv: &'a ParsedCv, heuristics: &Heuristics) -> Vec<&'a str> {
    cv.normalized_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take_while(|l| classify_heading(l).is_none())
        .filter(|l| *l != cv.full_name && *l != cv.contact_line)
        .filter(|l| !is_contact_line(l, heuristics))
        .take(MAX_PREAMBLE_LINES)
        .collect()
}

fn templated_summary(experience: &[ExperienceEntry]) -> String {
    let title = experience
        .iter()
        .map(|e| e.title.trim())
        .find(|t| !t.is_empty());
    match title {
        Some(title) => format!(
            "Experienced {title} bringing practical, results-focused experience to the role."
        ),
        None => "Experienced professional bringing practical, results-focused experience to the role."
            .to_string(),
    }
}

fn join_sentences<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Experience is passed through untouched: the parsed text and the tokenized entries.
pub fn fallback_experience(cv: &ParsedCv, entries: &[ExperienceEntry]) -> (String, Vec<ExperienceEntry>) {
    (cv.experience_text.clone(), entries.to_vec())
}

/// Skills line from the CV's own skills section, else from the fixed vocabulary.
pub fn fallback_skills(cv: &ParsedCv, job_description: &str) -> String {
    if !cv.skills_text.trim().is_empty() {
        return join_skills(split_skills(&cv.skills_text));
    }

    let cv_tokens = word_tokens(&cv.normalized_text);
    let jd_tokens = word_tokens(job_description);
    let use_jd = !jd_tokens.is_empty();

    join_skills(
        SKILL_VOCABULARY
            .iter()
            .filter(|skill| {
                let phrase = word_tokens(skill);
                contains_phrase(&cv_tokens, &phrase)
                    && (!use_jd || contains_phrase(&jd_tokens, &phrase))
            })
            .map(|skill| skill.to_string()),
    )
}

/// Splits free-form skill text on the usual list separators.
pub fn split_skills(text: &str) -> Vec<String> {
    text.split(['|', ',', '•', ';', '\n', '·'])
        .map(|s| s.trim().trim_start_matches(['-', '*']).trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Case-insensitive dedupe, capped, joined with ` | `.
pub fn join_skills(skills: impl IntoIterator<Item = String>) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut kept: Vec<String> = Vec::new();
    for skill in skills {
        let key = skill.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        kept.push(skill);
        if kept.len() == MAX_SKILLS {
            break;
        }
    }
    kept.join(" | ")
}
