//! Section Mapper: merges parsed, aligned and caller-supplied content into
//! the `CanonicalResume`.
//!
//! Precedence (default policy): caller profile fields > caller experience /
//! education arrays > parsed or aligned content > empty.

use crate::alignment::fallback::{join_skills, split_skills};
use crate::models::request::{CallerEducation, CallerExperience, CallerOverrides};
use crate::models::resume::{
    AlignedContent, CanonicalResume, ContactDetails, EducationEntry, ExperienceEntry,
    DEFAULT_FULL_NAME,
};
use crate::parsing::ParsedSections;

const MAX_TITLE_CHARS: usize = 80;
const MAX_TITLE_WORDS: usize = 10;
const TITLE_PREFIXES: &[&str] = &["job title:", "position:", "role:", "title:"];

/// Variations in how caller content and heuristic content are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Caller content wins; when `false` parsed content wins and caller
    /// content only fills gaps.
    pub prefer_caller_fields: bool,
    /// An explicitly supplied empty array counts as a caller value and
    /// suppresses heuristic fill; when `false` it is treated as absent.
    pub explicit_empty_overrides: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            prefer_caller_fields: true,
            explicit_empty_overrides: true,
        }
    }
}

impl MergePolicy {
    fn pick(self, caller: Option<String>, derived: String) -> String {
        if self.prefer_caller_fields {
            caller.unwrap_or(derived)
        } else if derived.is_empty() {
            caller.unwrap_or_default()
        } else {
            derived
        }
    }

    fn pick_list<T>(self, caller: Option<Vec<T>>, derived: Vec<T>) -> Vec<T> {
        let caller = caller.filter(|list| self.explicit_empty_overrides || !list.is_empty());
        if self.prefer_caller_fields {
            caller.unwrap_or(derived)
        } else if derived.is_empty() {
            caller.unwrap_or_default()
        } else {
            derived
        }
    }
}

pub fn merge_into_canonical(
    parsed: &ParsedSections,
    aligned: &AlignedContent,
    overrides: &CallerOverrides,
    job_description: &str,
    policy: MergePolicy,
) -> CanonicalResume {
    let profile = overrides.profile.clone().unwrap_or_default();

    let parsed_name = Some(parsed.cv.full_name.trim())
        .filter(|name| *name != DEFAULT_FULL_NAME)
        .unwrap_or_default()
        .to_string();
    let full_name = policy.pick(present(profile.full_name), parsed_name);
    let full_name = if full_name.is_empty() {
        DEFAULT_FULL_NAME.to_string()
    } else {
        full_name
    };

    let mut experience = policy.pick_list(
        overrides.experience.clone().map(caller_experience),
        aligned.experience.clone(),
    );
    experience.retain(|entry| !entry.is_empty());

    let mut education = policy.pick_list(
        overrides.education.clone().map(caller_education),
        parsed.education.clone(),
    );
    education.retain(|entry| !entry.is_empty());

    let derived_title = title_from_job_description(job_description)
        .or_else(|| {
            experience
                .iter()
                .map(|e| e.title.trim())
                .find(|t| !t.is_empty())
                .map(String::from)
        })
        .unwrap_or_default();
    let target_title = policy.pick(present(profile.target_title), derived_title);

    let scanned = &parsed.cv.contact;
    let contact = ContactDetails {
        email: policy.pick(present(profile.email), scanned.email.clone()),
        phone: policy.pick(present(profile.phone), scanned.phone.clone()),
        linkedin: policy.pick(present(profile.linkedin), scanned.linkedin.clone()),
    };

    let caller_skills = profile
        .skills
        .map(|skills| join_skills(skills.to_lines().iter().flat_map(|l| split_skills(l))))
        .filter(|line| !line.is_empty());

    CanonicalResume {
        full_name,
        target_title,
        contact,
        summary: policy.pick(present(profile.summary), aligned.summary.clone()),
        skills_line: policy.pick(caller_skills, aligned.skills_line.clone()),
        experience,
        education,
    }
}

/// First non-empty job description line, when it reads like a job title.
pub fn title_from_job_description(job_description: &str) -> Option<String> {
    let line = job_description.lines().map(str::trim).find(|l| !l.is_empty())?;
    let title = TITLE_PREFIXES
        .iter()
        .find_map(|prefix| {
            line.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &line[prefix.len()..])
        })
        .unwrap_or(line)
        .trim()
        .trim_end_matches(['.', ':'])
        .trim();

    let fits = !title.is_empty()
        && title.chars().count() <= MAX_TITLE_CHARS
        && title.split_whitespace().count() <= MAX_TITLE_WORDS;
    fits.then(|| title.to_string())
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn caller_experience(entries: Vec<CallerExperience>) -> Vec<ExperienceEntry> {
    entries.into_iter().map(CallerExperience::into_entry).collect()
}

fn caller_education(entries: Vec<CallerEducation>) -> Vec<EducationEntry> {
    entries.into_iter().map(CallerEducation::into_entry).collect()
}
