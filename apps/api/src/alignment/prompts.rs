// Prompt constants for the Alignment module.
// Reuses cross-cutting fragments from llm_client::prompts via `{no_fabrication}` / `{house_style}`.

/// System prompt for the profile summary rewrite.
pub const SUMMARY_SYSTEM: &str = "You are an expert UK CV writer. \
    You rewrite a candidate's profile summary so it speaks directly to a target role. \
    Reply with the summary text only.";

/// Summary prompt template.
/// Replace: {no_fabrication}, {house_style}, {candidate_text}, {job_description}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"{no_fabrication}
{house_style}

Write a profile summary of 3 to 5 sentences for the candidate below, aligned to the job description.
Lead with the candidate's most relevant experience. Mirror the job description's vocabulary where
the candidate text supports it. Do not mention the employer you are applying to by name.

CANDIDATE TEXT:
{candidate_text}

JOB DESCRIPTION:
{job_description}"#;

/// System prompt for the experience rewrite. JSON mode is applied by the client.
pub const EXPERIENCE_SYSTEM: &str = "You are an expert UK CV writer. \
    You rewrite the bullet points of each role in a candidate's work history so they \
    emphasise the responsibilities and results a target role asks for.";

/// Experience prompt template.
/// Replace: {no_fabrication}, {house_style}, {experience_text}, {job_description}
pub const EXPERIENCE_PROMPT_TEMPLATE: &str = r#"{no_fabrication}
{house_style}

Rewrite the bullets of each role below to emphasise terms from the job description.
Keep every role in the same order. Copy title, company, location, start and end EXACTLY as given;
use an empty string when a value is not given. Do not add roles. Return 2 to 6 bullets per role,
each a single sentence starting with an action verb, without bullet characters.

Return a JSON object with this EXACT schema (no extra fields):
{
  "roles": [
    {
      "title": "Sales Manager",
      "company": "Acme Ltd",
      "location": "Leeds",
      "start": "2019",
      "end": "2022",
      "bullets": ["Grew regional revenue by 20% through targeted account planning"]
    }
  ]
}

WORK HISTORY:
{experience_text}

JOB DESCRIPTION:
{job_description}"#;

/// System prompt for the key skills line.
pub const SKILLS_SYSTEM: &str = "You are an expert UK CV writer and ATS specialist. \
    You pick the candidate skills most relevant to a target role. \
    Reply with a single line of skills separated by ' | ' and nothing else.";

/// Skills prompt template.
/// Replace: {no_fabrication}, {candidate_text}, {job_description}
pub const SKILLS_PROMPT_TEMPLATE: &str = r#"{no_fabrication}

List between 8 and 14 skills the candidate demonstrably has that the job description asks for,
most relevant first. Use short noun phrases (1 to 3 words) in title case, separated by " | ".

CANDIDATE TEXT:
{candidate_text}

JOB DESCRIPTION:
{job_description}"#;
