// Shared prompt constants and prompt-building utilities.
// Each service that needs completion calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder regex"));

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to every rewrite prompt.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY facts present in the candidate text provided. \
    Do NOT invent employers, job titles, dates, qualifications, figures or achievements. \
    If the candidate text does not support a claim, omit it entirely.";

/// House style for all generated résumé prose.
pub const UK_ENGLISH_INSTRUCTION: &str = "\
    Write in British English spelling and tone (e.g. 'organised', 'optimised', 'programme'). \
    Keep the language plain and keyword-rich so applicant tracking systems can parse it. \
    No first-person pronouns, no emojis, no markdown.";

/// Fills `{placeholder}` slots in a template in a single pass, so slot
/// syntax inside a substituted value is never expanded. Unknown placeholders
/// are left as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_replaces_every_occurrence() {
        let filled = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(filled, "x and y and x");
    }

    #[test]
    fn test_fill_template_leaves_unknown_slots() {
        assert_eq!(fill_template("{missing}", &[("a", "x")]), "{missing}");
    }

    #[test]
    fn test_fill_template_does_not_expand_slots_inside_values() {
        let filled = fill_template(
            "CV: {candidate_text}\nJD: {job_description}",
            &[
                ("candidate_text", "I wrote {job_description} templates"),
                ("job_description", "Sales lead"),
            ],
        );
        assert_eq!(filled, "CV: I wrote {job_description} templates\nJD: Sales lead");
    }
}
