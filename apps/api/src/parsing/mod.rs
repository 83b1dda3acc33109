// Heuristic CV parsing: normalize → segment → tokenize.
// Nothing in this module returns an error; every stage degrades to empty/default values.

pub mod contact;
pub mod education;
pub mod experience;
pub mod keywords;
pub mod normalizer;
pub mod segmenter;

use serde::Serialize;

use crate::models::resume::{EducationEntry, ExperienceEntry, ParsedCv};

pub use keywords::Heuristics;

/// Everything recovered from a CV by the heuristic stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSections {
    pub cv: ParsedCv,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
}

/// Runs the full heuristic parse over raw CV text.
pub fn parse_cv(raw: &str, heuristics: &Heuristics) -> ParsedSections {
    let normalized = normalizer::normalize(raw);
    let cv = segmenter::segment(&normalized, heuristics);
    let experience = experience::tokenize_experience(&cv.experience_text, heuristics);
    let education = education::tokenize_education(&cv.education_text);
    ParsedSections {
        cv,
        experience,
        education,
    }
}
