use serde::{Deserialize, Serialize};

/// Name used when no identity line can be recovered from the CV.
pub const DEFAULT_FULL_NAME: &str = "Candidate";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
    pub linkedin: String,
}

/// Raw section text recovered by the segmenter. Request-scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCv {
    pub full_name: String,
    pub contact_line: String,
    pub summary_text: String,
    pub experience_text: String,
    pub education_text: String,
    pub skills_text: String,
    pub contact: ContactDetails,
    /// The normalized source the sections were cut from. Used for summary fallback.
    #[serde(skip)]
    pub normalized_text: String,
}

impl Default for ParsedCv {
    fn default() -> Self {
        Self {
            full_name: DEFAULT_FULL_NAME.to_string(),
            contact_line: String::new(),
            summary_text: String::new(),
            experience_text: String::new(),
            education_text: String::new(),
            skills_text: String::new(),
            contact: ContactDetails::default(),
            normalized_text: String::new(),
        }
    }
}

/// A single role. Must carry at least a title, a company, or one bullet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub location: String,
    pub start: String,
    pub end: String,
    pub bullets: Vec<String>,
}

impl ExperienceEntry {
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.company.trim().is_empty() && self.bullets.is_empty()
    }

    pub fn has_dates(&self) -> bool {
        !self.start.is_empty() || !self.end.is_empty()
    }

    /// "Start – End", "Start", or "" depending on which ends are known.
    pub fn date_range(&self) -> String {
        match (self.start.is_empty(), self.end.is_empty()) {
            (false, false) => format!("{} – {}", self.start, self.end),
            (false, true) => self.start.clone(),
            (true, false) => self.end.clone(),
            (true, true) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

impl EducationEntry {
    pub fn is_empty(&self) -> bool {
        self.degree.trim().is_empty()
            && self.institution.trim().is_empty()
            && self.year.trim().is_empty()
    }
}

/// Where a piece of aligned content came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentSource {
    Completion,
    #[default]
    Fallback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentSources {
    pub summary: AlignmentSource,
    pub experience: AlignmentSource,
    pub skills: AlignmentSource,
}

/// Output of the alignment engine. Same shape whether the completion
/// capability or the deterministic fallback produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedContent {
    pub summary: String,
    pub skills_line: String,
    pub experience_text: String,
    pub experience: Vec<ExperienceEntry>,
    pub sources: AlignmentSources,
}

/// The merged, final model that drives both JSON output and document assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalResume {
    pub full_name: String,
    pub target_title: String,
    pub contact: ContactDetails,
    pub summary: String,
    pub skills_line: String,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
}
