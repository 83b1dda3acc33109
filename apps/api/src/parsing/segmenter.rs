//! Section Segmenter: an explicit finite-state machine over normalized lines.
//!
//! # States
//! `None` (before any heading, or after a heading we do not track),
//! `InSummary`, `InExperience`, `InEducation`, `InSkills`, `InOther`.
//!
//! # Transitions
//! - a heading line moves to the state its heading names, and is not content
//!   (a mixed-case role title such as "Education Officer" is not a heading)
//! - `Heading: inline text` moves state and keeps `inline text` as content
//! - any other line stays in the current state and is content for it
//!
//! Content seen in `None` or `InOther` is not assigned to a section. Name and
//! contact detection run over the header independently of the state machine.

use crate::models::resume::{ParsedCv, DEFAULT_FULL_NAME};
use crate::parsing::contact::{is_contact_line, scan_contact_details, CONTACT_SCAN_LINES};
use crate::parsing::keywords::{contains_phrase, word_tokens, Heuristics};

/// Lines searched for the candidate name.
const NAME_SCAN_LINES: usize = 5;
const MAX_HEADING_WORDS: usize = 6;
const MAX_HEADING_CHARS: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    None,
    InSummary,
    InExperience,
    InEducation,
    InSkills,
    InOther,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Summary,
    Experience,
    Education,
    Skills,
    Other,
}

impl Heading {
    pub fn target_state(self) -> SegmentState {
        match self {
            Heading::Summary => SegmentState::InSummary,
            Heading::Experience => SegmentState::InExperience,
            Heading::Education => SegmentState::InEducation,
            Heading::Skills => SegmentState::InSkills,
            Heading::Other => SegmentState::InOther,
        }
    }
}

/// Checked in order; the first group with a matching phrase wins.
const HEADING_TOKENS: &[(Heading, &[&str])] = &[
    (
        Heading::Summary,
        &[
            "summary",
            "profile",
            "personal statement",
            "about me",
            "objective",
        ],
    ),
    (
        Heading::Experience,
        &[
            "experience",
            "employment",
            "work history",
            "career history",
        ],
    ),
    (Heading::Education, &["education", "academic", "qualifications"]),
    (Heading::Skills, &["skills", "competencies"]),
    (
        Heading::Other,
        &[
            "interests",
            "hobbies",
            "references",
            "certifications",
            "languages",
            "projects",
            "achievements",
            "awards",
            "volunteering",
            "personal details",
            "contact",
        ],
    ),
];

/// One step of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'a> {
    /// The line is a heading; move to the new state.
    Heading(SegmentState),
    /// The line is a heading with trailing content on the same line.
    HeadingWithContent(SegmentState, &'a str),
    /// The line is content for the given (unchanged) state.
    Content(SegmentState),
}

/// Classifies a line as a section heading.
///
/// A heading is short, has no digits, and is either at most three words,
/// all upper case, or terminated by a colon.
pub fn classify_heading(line: &str) -> Option<Heading> {
    let trimmed = line.trim();
    if trimmed.is_empty()
        || trimmed.chars().count() > MAX_HEADING_CHARS
        || trimmed.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let tokens = word_tokens(trimmed);
    if tokens.is_empty() || tokens.len() > MAX_HEADING_WORDS {
        return None;
    }

    let letters: String = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    let is_upper = letters.chars().all(|c| !c.is_lowercase());
    let shaped_like_heading = tokens.len() <= 3 || is_upper || trimmed.ends_with(':');
    if !shaped_like_heading {
        return None;
    }

    HEADING_TOKENS.iter().find_map(|(heading, phrases)| {
        phrases
            .iter()
            .any(|phrase| contains_phrase(&tokens, &word_tokens(phrase)))
            .then_some(*heading)
    })
}

/// Classifies a line as a heading unless it reads like a job title.
///
/// "Education Officer" or "Contact Centre Manager" inside an experience
/// section are roles, not headings. An upper-case or colon-terminated line
/// is still taken as a heading.
fn heading_for(line: &str, heuristics: &Heuristics) -> Option<Heading> {
    let heading = classify_heading(line)?;
    let trimmed = line.trim();
    let emphatic = trimmed.ends_with(':') || !trimmed.chars().any(char::is_lowercase);
    if heuristics.is_role_title(trimmed) && !emphatic {
        return None;
    }
    Some(heading)
}

/// The transition function. Pure; the segmenter folds it over every line.
pub fn next_step<'a>(state: SegmentState, line: &'a str, heuristics: &Heuristics) -> Step<'a> {
    if let Some(heading) = heading_for(line, heuristics) {
        return Step::Heading(heading.target_state());
    }
    if let Some((head, rest)) = line.split_once(':') {
        let rest = rest.trim();
        if !rest.is_empty() {
            if let Some(heading) = heading_for(head, heuristics) {
                return Step::HeadingWithContent(heading.target_state(), rest);
            }
        }
    }
    Step::Content(state)
}

/// Segments normalized text. Never fails; unparseable input yields the
/// default `ParsedCv` (`"Candidate"`, everything else empty).
pub fn segment(normalized: &str, heuristics: &Heuristics) -> ParsedCv {
    let lines: Vec<&str> = normalized
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let name_index = find_name_line(&lines);
    let contact_index = lines
        .iter()
        .take(CONTACT_SCAN_LINES)
        .enumerate()
        .find(|(i, line)| Some(*i) != name_index && is_contact_line(line, heuristics))
        .map(|(i, _)| i);

    let mut summary = Vec::new();
    let mut experience = Vec::new();
    let mut education = Vec::new();
    let mut skills = Vec::new();

    let mut state = SegmentState::None;
    for line in &lines {
        let content = match next_step(state, line, heuristics) {
            Step::Heading(next) => {
                state = next;
                None
            }
            Step::HeadingWithContent(next, rest) => {
                state = next;
                Some(rest)
            }
            Step::Content(current) => Some(*line).filter(|_| current != SegmentState::None),
        };

        let Some(content) = content else { continue };
        match state {
            SegmentState::InSummary => summary.push(content),
            SegmentState::InExperience => experience.push(content),
            SegmentState::InEducation => education.push(content),
            SegmentState::InSkills => skills.push(content),
            SegmentState::None | SegmentState::InOther => {}
        }
    }

    ParsedCv {
        full_name: name_index
            .map(|i| lines[i].to_string())
            .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string()),
        contact_line: contact_index
            .map(|i| lines[i].to_string())
            .unwrap_or_default(),
        summary_text: summary.join("\n"),
        experience_text: experience.join("\n"),
        education_text: education.join("\n"),
        skills_text: skills.join("\n"),
        contact: scan_contact_details(lines.iter().take(CONTACT_SCAN_LINES).copied()),
        normalized_text: normalized.to_string(),
    }
}

/// First header line that starts with a letter and reads like a name:
/// no `@`, no digits, no URL, not a heading or a "Curriculum Vitae" banner.
/// Only lines before the first heading are considered.
fn find_name_line(lines: &[&str]) -> Option<usize> {
    for (i, line) in lines.iter().enumerate().take(NAME_SCAN_LINES) {
        if classify_heading(line).is_some() {
            return None;
        }
        let starts_with_letter = line.chars().next().is_some_and(char::is_alphabetic);
        if starts_with_letter
            && !line.contains('@')
            && !line.chars().any(|c| c.is_ascii_digit())
            && !line.to_lowercase().contains("http")
            && !line.to_lowercase().contains("www.")
            && !is_banner(line)
        {
            return Some(i);
        }
    }
    None
}

fn is_banner(line: &str) -> bool {
    let cleaned = word_tokens(line).join(" ");
    matches!(
        cleaned.as_str(),
        "curriculum vitae" | "cv" | "resume" | "résumé" | "curriculum vitae cv"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sections(text: &str) -> ParsedCv {
        segment(text, &Heuristics::default())
    }

    const JANE: &str = "Jane Doe\njane@x.com\nEXPERIENCE\nSales Manager\n2019-2022\n- Grew revenue 20%\nEDUCATION\nBSc Marketing, LeedsUni, 2018";

    #[test]
    fn test_segment_scenario_sections() {
        let parsed = parse_sections(JANE);
        assert_eq!(parsed.full_name, "Jane Doe");
        assert_eq!(parsed.contact_line, "jane@x.com");
        assert_eq!(
            parsed.experience_text,
            "Sales Manager\n2019-2022\n- Grew revenue 20%"
        );
        assert_eq!(parsed.education_text, "BSc Marketing, LeedsUni, 2018");
        assert!(parsed.summary_text.is_empty());
        assert_eq!(parsed.contact.email, "jane@x.com");
    }

    #[test]
    fn test_missing_name_defaults_to_candidate() {
        for text in ["", "12345 Main St\n@handle", "EXPERIENCE\nSales Manager\n2019", "jane@x.com"] {
            assert_eq!(parse_sections(text).full_name, "Candidate", "input {text:?}");
        }
    }

    #[test]
    fn test_unparseable_input_yields_default() {
        let parsed = parse_sections("");
        assert_eq!(parsed, ParsedCv::default());
    }

    #[test]
    fn test_banner_line_is_not_a_name() {
        let parsed = parse_sections("CURRICULUM VITAE\nJohn Smith\nLondon");
        assert_eq!(parsed.full_name, "John Smith");
        assert_eq!(parsed.contact_line, "London");
    }

    #[test]
    fn test_contact_line_only_within_header() {
        let mut text = String::from("Jane Doe\n");
        for i in 0..10 {
            text.push_str(&format!("Line number {}\n", "x".repeat(i + 1)));
        }
        text.push_str("jane@x.com");
        assert_eq!(parse_sections(&text).contact_line, "");
    }

    #[test]
    fn test_classify_heading_variants() {
        assert_eq!(classify_heading("PROFESSIONAL EXPERIENCE"), Some(Heading::Experience));
        assert_eq!(classify_heading("Work History"), Some(Heading::Experience));
        assert_eq!(classify_heading("Employment:"), Some(Heading::Experience));
        assert_eq!(classify_heading("Profile Summary"), Some(Heading::Summary));
        assert_eq!(classify_heading("Education & Qualifications"), Some(Heading::Education));
        assert_eq!(classify_heading("Academic Background"), Some(Heading::Education));
        assert_eq!(classify_heading("Key Skills"), Some(Heading::Skills));
        assert_eq!(classify_heading("Interests"), Some(Heading::Other));
        assert_eq!(classify_heading("Sales Manager"), None);
        assert_eq!(classify_heading("Experience 2019"), None);
        assert_eq!(
            classify_heading("Gained experience across retail and wholesale"),
            None
        );
    }

    #[test]
    fn test_next_step_transitions() {
        assert_eq!(
            next_step(SegmentState::None, "EXPERIENCE", &Heuristics::default()),
            Step::Heading(SegmentState::InExperience)
        );
        assert_eq!(
            next_step(SegmentState::InExperience, "Sales Manager", &Heuristics::default()),
            Step::Content(SegmentState::InExperience)
        );
        assert_eq!(
            next_step(SegmentState::InExperience, "Education", &Heuristics::default()),
            Step::Heading(SegmentState::InEducation)
        );
        assert_eq!(
            next_step(SegmentState::None, "Profile: Results-driven sales leader", &Heuristics::default()),
            Step::HeadingWithContent(SegmentState::InSummary, "Results-driven sales leader")
        );
        assert_eq!(
            next_step(SegmentState::InSummary, "Note: see attached", &Heuristics::default()),
            Step::Content(SegmentState::InSummary)
        );
    }

    #[test]
    fn test_other_heading_stops_previous_section() {
        let text = "Jane Doe\nEducation\nBSc Marketing, Leeds, 2018\nInterests\nRunning\nSkills\nExcel, CRM";
        let parsed = parse_sections(text);
        assert_eq!(parsed.education_text, "BSc Marketing, Leeds, 2018");
        assert_eq!(parsed.skills_text, "Excel, CRM");
        assert!(!parsed.education_text.contains("Running"));
    }

    #[test]
    fn test_summary_section_collected() {
        let text = "Jane Doe\nSUMMARY\nCommercial sales leader.\nTen years in B2B.\nEXPERIENCE\nSales Manager";
        let parsed = parse_sections(text);
        assert_eq!(parsed.summary_text, "Commercial sales leader.\nTen years in B2B.");
        assert_eq!(parsed.experience_text, "Sales Manager");
    }

    #[test]
    fn test_lines_before_headings_are_unassigned() {
        let parsed = parse_sections("Jane Doe\nLondon\nSome intro line\nEXPERIENCE\nAnalyst");
        assert!(parsed.summary_text.is_empty());
        assert_eq!(parsed.experience_text, "Analyst");
    }

    #[test]
    fn test_role_titles_with_heading_words_stay_content() {
        let h = Heuristics::default();
        for title in [
            "Education Officer",
            "Contact Centre Manager",
            "Customer Experience Manager",
            "Academic Tutor",
            "Head of Education",
        ] {
            assert_eq!(
                next_step(SegmentState::InExperience, title, &h),
                Step::Content(SegmentState::InExperience),
                "title {title:?}"
            );
        }
        assert_eq!(
            next_step(SegmentState::InExperience, "Education Officer: Leeds Council", &h),
            Step::Content(SegmentState::InExperience)
        );
    }

    #[test]
    fn test_emphatic_headings_win_over_role_keywords() {
        let h = Heuristics::default();
        assert_eq!(
            next_step(SegmentState::InSummary, "EXPERIENCE LEAD", &h),
            Step::Heading(SegmentState::InExperience)
        );
        assert_eq!(
            next_step(SegmentState::InSummary, "Experience as Manager:", &h),
            Step::Heading(SegmentState::InExperience)
        );
    }

    #[test]
    fn test_role_title_keeps_experience_section_intact() {
        let text = "Jane Doe\njane@x.com\nEXPERIENCE\nEducation Officer\nLeeds Council\n2018-2022\n- Ran school programmes\nEDUCATION\nBSc Marketing, LeedsUni, 2018";
        let parsed = parse_sections(text);
        assert_eq!(
            parsed.experience_text,
            "Education Officer\nLeeds Council\n2018-2022\n- Ran school programmes"
        );
        assert_eq!(parsed.education_text, "BSc Marketing, LeedsUni, 2018");
    }
}
