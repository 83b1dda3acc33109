//! Caller-facing request shapes. Field names are camelCase on the wire;
//! snake_case aliases are accepted for older clients.

use serde::{Deserialize, Deserializer};

use crate::models::resume::{EducationEntry, ExperienceEntry};

/// Body of `POST /api/v1/resumes/tailor` and `/tailor/json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    #[serde(default, alias = "cv_text", deserialize_with = "null_as_empty")]
    pub cv_text: String,
    #[serde(default, alias = "job_description", deserialize_with = "null_as_empty")]
    pub job_description: String,
    #[serde(flatten)]
    pub overrides: CallerOverrides,
}

/// Structured fields the caller may supply. `None` means "not provided";
/// `Some(vec![])` is an explicit empty list (see `MergePolicy`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerOverrides {
    #[serde(default)]
    pub profile: Option<PartialProfile>,
    #[serde(default)]
    pub experience: Option<Vec<CallerExperience>>,
    #[serde(default)]
    pub education: Option<Vec<CallerEducation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialProfile {
    #[serde(default, alias = "name", alias = "full_name")]
    pub full_name: Option<String>,
    #[serde(default, alias = "target_title", alias = "title")]
    pub target_title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Option<TextList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerExperience {
    #[serde(default, alias = "role")]
    pub title: String,
    #[serde(default, alias = "employer")]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "startDate", alias = "start_date")]
    pub start: String,
    #[serde(default, alias = "endDate", alias = "end_date")]
    pub end: String,
    #[serde(default)]
    pub bullets: TextList,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerEducation {
    #[serde(default, alias = "qualification")]
    pub degree: String,
    #[serde(default, alias = "school")]
    pub institution: String,
    #[serde(
        default,
        alias = "graduationYear",
        deserialize_with = "deserialize_string_or_number"
    )]
    pub year: String,
}

/// Either a JSON array of strings or one newline-delimited string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextList {
    Items(Vec<String>),
    Text(String),
}

impl Default for TextList {
    fn default() -> Self {
        TextList::Items(Vec::new())
    }
}

impl TextList {
    /// Flattens to trimmed, marker-stripped, non-empty lines in caller order.
    pub fn to_lines(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            TextList::Items(items) => items.iter().flat_map(|s| s.lines()).collect(),
            TextList::Text(text) => text.lines().collect(),
        };
        raw.into_iter()
            .map(strip_bullet_marker)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Strips a leading `-`, `•`, `*`, `·`, `▪` marker and surrounding whitespace.
pub fn strip_bullet_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '•', '*', '·', '▪'])
        .trim()
}

impl CallerExperience {
    pub fn into_entry(self) -> ExperienceEntry {
        ExperienceEntry {
            title: self.title.trim().to_string(),
            company: self.company.trim().to_string(),
            location: self.location.trim().to_string(),
            start: self.start.trim().to_string(),
            end: self.end.trim().to_string(),
            bullets: self.bullets.to_lines(),
        }
    }
}

impl CallerEducation {
    pub fn into_entry(self) -> EducationEntry {
        EducationEntry {
            degree: self.degree.trim().to_string(),
            institution: self.institution.trim().to_string(),
            year: self.year.trim().to_string(),
        }
    }
}

/// `null` is the same as an absent field.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
        Missing(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Missing(()) => String::new(),
    })
}
