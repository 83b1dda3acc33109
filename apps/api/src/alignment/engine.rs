//! Alignment Engine: rewrites summary, experience bullets and the skills
//! line against a job description.
//!
//! Failure policy per completion call:
//! - `RateLimited`: one retry after `rate_limit_backoff`; a second rate limit
//!   fails the request with `UpstreamRateLimited`.
//! - `QuotaExceeded`: terminal, no retry, no fallback.
//! - anything else: logged, then the deterministic fallback is used.
//!
//! Structured experience replies that fail schema or fact checks are
//! `UpstreamMalformed`.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::alignment::prompts::{
    EXPERIENCE_PROMPT_TEMPLATE, EXPERIENCE_SYSTEM, SKILLS_PROMPT_TEMPLATE, SKILLS_SYSTEM,
    SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM,
};
use crate::alignment::{fallback, truncate_chars, SUMMARY_MAX_CHARS};
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, NO_FABRICATION_INSTRUCTION, UK_ENGLISH_INSTRUCTION};
use crate::llm_client::{CompletionOptions, CompletionProvider, LlmError};
use crate::models::request::strip_bullet_marker;
use crate::models::resume::{AlignedContent, AlignmentSource, AlignmentSources, ExperienceEntry};
use crate::parsing::experience::render_experience_text;
use crate::parsing::{Heuristics, ParsedSections};

// Prompt budgets, in characters.
const SUMMARY_SOURCE_CHARS: usize = 900;
const SUMMARY_JD_CHARS: usize = 1200;
const EXPERIENCE_SOURCE_CHARS: usize = 2500;
const EXPERIENCE_JD_CHARS: usize = 1500;
const SKILLS_SOURCE_CHARS: usize = 2500;
const SKILLS_JD_CHARS: usize = 1000;

const SUMMARY_TEMPERATURE: f32 = 0.4;
const EXPERIENCE_TEMPERATURE: f32 = 0.3;
const SKILLS_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(1000);

// ────────────────────────────────────────────────────────────────────────────
// Structured experience reply
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExperienceReply {
    roles: Vec<AlignedRole>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AlignedRole {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
    bullets: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Built once at startup and shared read-only across requests.
pub struct AlignmentEngine {
    provider: Option<Arc<dyn CompletionProvider>>,
    heuristics: Heuristics,
    rate_limit_backoff: Duration,
}

impl AlignmentEngine {
    pub fn new(
        provider: Option<Arc<dyn CompletionProvider>>,
        heuristics: Heuristics,
        rate_limit_backoff: Duration,
    ) -> Self {
        Self {
            provider,
            heuristics,
            rate_limit_backoff,
        }
    }

    pub fn has_completion(&self) -> bool {
        self.provider.is_some()
    }

    /// Runs the three sub-operations concurrently and merges their output.
    pub async fn align(
        &self,
        parsed: &ParsedSections,
        job_description: &str,
    ) -> Result<AlignedContent, AppError> {
        let (
            (summary, summary_source),
            (experience_text, experience, experience_source),
            (skills_line, skills_source),
        ) = tokio::try_join!(
            self.rewrite_summary(parsed, job_description),
            self.align_experience(parsed, job_description),
            self.build_skills(parsed, job_description),
        )?;

        Ok(AlignedContent {
            summary,
            skills_line,
            experience_text,
            experience,
            sources: AlignmentSources {
                summary: summary_source,
                experience: experience_source,
                skills: skills_source,
            },
        })
    }

    async fn rewrite_summary(
        &self,
        parsed: &ParsedSections,
        job_description: &str,
    ) -> Result<(String, AlignmentSource), AppError> {
        let fallback = || {
            (
                fallback::fallback_summary(&parsed.cv, &parsed.experience, &self.heuristics),
                AlignmentSource::Fallback,
            )
        };
        let Some(provider) = self.provider.as_deref() else {
            return Ok(fallback());
        };

        let candidate_text = summary_source_text(parsed);
        let prompt = fill_template(
            SUMMARY_PROMPT_TEMPLATE,
            &[
                ("no_fabrication", NO_FABRICATION_INSTRUCTION),
                ("house_style", UK_ENGLISH_INSTRUCTION),
                ("candidate_text", truncate_chars(&candidate_text, SUMMARY_SOURCE_CHARS)),
                ("job_description", truncate_chars(job_description, SUMMARY_JD_CHARS)),
            ],
        );

        let reply = self
            .complete_with_retry(
                provider,
                "summary",
                SUMMARY_SYSTEM,
                &prompt,
                CompletionOptions::text(SUMMARY_TEMPERATURE),
            )
            .await?;

        match reply.map(|text| collapse_whitespace(&text)).filter(|s| !s.is_empty()) {
            Some(summary) => Ok((
                truncate_chars(&summary, SUMMARY_MAX_CHARS).trim_end().to_string(),
                AlignmentSource::Completion,
            )),
            None => Ok(fallback()),
        }
    }

    async fn align_experience(
        &self,
        parsed: &ParsedSections,
        job_description: &str,
    ) -> Result<(String, Vec<ExperienceEntry>, AlignmentSource), AppError> {
        let fallback = || {
            let (text, entries) = fallback::fallback_experience(&parsed.cv, &parsed.experience);
            (text, entries, AlignmentSource::Fallback)
        };
        let Some(provider) = self.provider.as_deref() else {
            return Ok(fallback());
        };
        if parsed.experience.is_empty() {
            return Ok(fallback());
        }

        let source_text = render_experience_text(&parsed.experience);
        let prompt = fill_template(
            EXPERIENCE_PROMPT_TEMPLATE,
            &[
                ("no_fabrication", NO_FABRICATION_INSTRUCTION),
                ("house_style", UK_ENGLISH_INSTRUCTION),
                ("experience_text", truncate_chars(&source_text, EXPERIENCE_SOURCE_CHARS)),
                ("job_description", truncate_chars(job_description, EXPERIENCE_JD_CHARS)),
            ],
        );

        let Some(reply) = self
            .complete_with_retry(
                provider,
                "experience",
                EXPERIENCE_SYSTEM,
                &prompt,
                CompletionOptions::json(EXPERIENCE_TEMPERATURE),
            )
            .await?
        else {
            return Ok(fallback());
        };

        let reply: ExperienceReply = serde_json::from_str(&reply).map_err(|e| {
            AppError::UpstreamMalformed(format!("experience reply failed schema check: {e}"))
        })?;
        let entries = merge_aligned_roles(&parsed.experience, reply)?;

        Ok((
            render_experience_text(&entries),
            entries,
            AlignmentSource::Completion,
        ))
    }

    async fn build_skills(
        &self,
        parsed: &ParsedSections,
        job_description: &str,
    ) -> Result<(String, AlignmentSource), AppError> {
        let fallback = || {
            (
                fallback::fallback_skills(&parsed.cv, job_description),
                AlignmentSource::Fallback,
            )
        };
        let Some(provider) = self.provider.as_deref() else {
            return Ok(fallback());
        };

        let prompt = fill_template(
            SKILLS_PROMPT_TEMPLATE,
            &[
                ("no_fabrication", NO_FABRICATION_INSTRUCTION),
                ("candidate_text", truncate_chars(&parsed.cv.normalized_text, SKILLS_SOURCE_CHARS)),
                ("job_description", truncate_chars(job_description, SKILLS_JD_CHARS)),
            ],
        );

        let reply = self
            .complete_with_retry(
                provider,
                "skills",
                SKILLS_SYSTEM,
                &prompt,
                CompletionOptions::text(SKILLS_TEMPERATURE),
            )
            .await?;

        let line = reply
            .map(|text| fallback::join_skills(fallback::split_skills(&text)))
            .filter(|line| !line.is_empty());
        match line {
            Some(line) => Ok((line, AlignmentSource::Completion)),
            None => Ok(fallback()),
        }
    }

    /// `Ok(Some(text))` on success, `Ok(None)` when the failure is one the
    /// fallback covers, `Err` for terminal upstream conditions.
    async fn complete_with_retry(
        &self,
        provider: &dyn CompletionProvider,
        operation: &str,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<Option<String>, AppError> {
        let mut retried = false;
        loop {
            match provider.complete(system, user, options).await {
                Ok(text) => {
                    debug!(operation, "completion succeeded");
                    return Ok(Some(text));
                }
                Err(LlmError::RateLimited(msg)) if !retried => {
                    warn!(
                        operation,
                        "completion rate limited, retrying in {}ms: {msg}",
                        self.rate_limit_backoff.as_millis()
                    );
                    retried = true;
                    tokio::time::sleep(self.rate_limit_backoff).await;
                }
                Err(LlmError::RateLimited(msg)) => {
                    return Err(AppError::UpstreamRateLimited(msg));
                }
                Err(LlmError::QuotaExceeded(msg)) => {
                    return Err(AppError::UpstreamQuotaExceeded(msg));
                }
                Err(e) => {
                    warn!(operation, "completion failed, using fallback: {e}");
                    return Ok(None);
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn summary_source_text(parsed: &ParsedSections) -> String {
    let parts: Vec<&str> = [parsed.cv.summary_text.as_str(), parsed.cv.experience_text.as_str()]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect();
    if parts.is_empty() {
        parsed.cv.normalized_text.clone()
    } else {
        parts.join("\n")
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps every source fact and takes only the rewritten bullets from the reply.
fn merge_aligned_roles(
    source: &[ExperienceEntry],
    reply: ExperienceReply,
) -> Result<Vec<ExperienceEntry>, AppError> {
    if reply.roles.len() > source.len() {
        return Err(AppError::UpstreamMalformed(format!(
            "experience reply has {} roles but the CV has {}",
            reply.roles.len(),
            source.len()
        )));
    }

    let mut merged = source.to_vec();
    for (index, (role, entry)) in reply.roles.into_iter().zip(merged.iter_mut()).enumerate() {
        check_fact(index, "company", &role.company, &entry.company)?;
        check_fact(index, "start", &role.start, &entry.start)?;
        check_fact(index, "end", &role.end, &entry.end)?;
        debug!(
            index,
            title = %role.title,
            location = %role.location,
            "aligned role accepted"
        );

        let bullets: Vec<String> = role
            .bullets
            .iter()
            .map(|b| strip_bullet_marker(b))
            .filter(|b| !b.is_empty())
            .map(String::from)
            .collect();
        if !bullets.is_empty() {
            entry.bullets = bullets;
        }
    }
    Ok(merged)
}

/// A returned value must be empty or appear in the source value.
fn check_fact(index: usize, field: &str, returned: &str, source: &str) -> Result<(), AppError> {
    let returned = fold(returned);
    if returned.is_empty() {
        return Ok(());
    }
    let source = fold(source);
    if !source.is_empty() && source.contains(&returned) {
        return Ok(());
    }
    Err(AppError::UpstreamMalformed(format!(
        "experience reply role {index} changed {field}"
    )))
}

fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::MockProvider;
    use crate::parsing::parse_cv;

    const JANE: &str = "Jane Doe\njane@x.com\nEXPERIENCE\nSales Manager\nAcme Ltd\n2019-2022\n- Grew revenue 20%\nEDUCATION\nBSc Marketing, LeedsUni, 2018";
    const JD: &str = "Regional Sales Manager\nWe need negotiation and CRM experience to grow revenue.";

    fn parsed() -> ParsedSections {
        parse_cv(JANE, &Heuristics::default())
    }

    fn engine_with(provider: Arc<MockProvider>) -> AlignmentEngine {
        AlignmentEngine::new(
            Some(provider as Arc<dyn CompletionProvider>),
            Heuristics::default(),
            DEFAULT_RATE_LIMIT_BACKOFF,
        )
    }

    fn happy_reply(system: &str) -> Result<String, LlmError> {
        if system == SUMMARY_SYSTEM {
            Ok("Results-driven sales manager.\n\nGrew revenue by 20%.".to_string())
        } else if system == EXPERIENCE_SYSTEM {
            Ok(r#"{"roles":[{"title":"Sales Manager","company":"Acme Ltd","location":"","start":"2019","end":"2022","bullets":["- Grew regional revenue by 20% through CRM-led account planning"]}]}"#.to_string())
        } else {
            Ok("Negotiation | CRM | Account Management | crm".to_string())
        }
    }

    #[tokio::test]
    async fn test_fallback_when_capability_absent() {
        let engine = AlignmentEngine::new(None, Heuristics::default(), DEFAULT_RATE_LIMIT_BACKOFF);
        let parsed = parsed();
        let aligned = engine.align(&parsed, JD).await.unwrap();

        assert_eq!(aligned.sources, AlignmentSources::default());
        assert_eq!(aligned.experience, parsed.experience);
        assert_eq!(aligned.experience_text, parsed.cv.experience_text);
        assert!(aligned.summary.starts_with("Experienced Sales Manager"));
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let engine = AlignmentEngine::new(None, Heuristics::default(), DEFAULT_RATE_LIMIT_BACKOFF);
        let parsed = parsed();
        let first = engine.align(&parsed, JD).await.unwrap();
        let second = engine.align(&parsed, JD).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_completion_output_is_used_and_facts_preserved() {
        let provider = MockProvider::new(|system, _| happy_reply(system));
        let aligned = engine_with(provider.clone()).align(&parsed(), JD).await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(
            aligned.sources,
            AlignmentSources {
                summary: AlignmentSource::Completion,
                experience: AlignmentSource::Completion,
                skills: AlignmentSource::Completion,
            }
        );
        assert_eq!(aligned.summary, "Results-driven sales manager. Grew revenue by 20%.");
        assert_eq!(aligned.skills_line, "Negotiation | CRM | Account Management");

        let role = &aligned.experience[0];
        assert_eq!(role.title, "Sales Manager");
        assert_eq!(role.company, "Acme Ltd");
        assert_eq!(role.start, "2019");
        assert_eq!(
            role.bullets,
            vec!["Grew regional revenue by 20% through CRM-led account planning"]
        );
        assert!(aligned.experience_text.contains("- Grew regional revenue"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_rate_limit_retries_exactly_once() {
        let provider = MockProvider::always_rate_limited();
        let engine = engine_with(provider.clone());
        let started = tokio::time::Instant::now();

        let result = engine.rewrite_summary(&parsed(), JD).await;

        assert!(matches!(result, Err(AppError::UpstreamRateLimited(_))));
        assert_eq!(provider.calls(), 2, "one initial call plus exactly one retry");
        assert!(started.elapsed() >= DEFAULT_RATE_LIMIT_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_rate_limit_recovers_after_backoff() {
        let provider = MockProvider::new(|system, call| {
            if call == 0 {
                Err(LlmError::RateLimited("slow down".to_string()))
            } else {
                happy_reply(system)
            }
        });
        let engine = engine_with(provider.clone());

        let (summary, source) = engine.rewrite_summary(&parsed(), JD).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(source, AlignmentSource::Completion);
        assert!(summary.starts_with("Results-driven"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_align_surfaces_rate_limit_as_retryable() {
        let engine = engine_with(MockProvider::always_rate_limited());
        let err = engine.align(&parsed(), JD).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamRateLimited(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_quota_is_terminal_without_retry() {
        let provider = MockProvider::new(|_, _| Err(LlmError::QuotaExceeded("credit balance".to_string())));
        let engine = engine_with(provider.clone());

        let result = engine.build_skills(&parsed(), JD).await;
        assert!(matches!(result, Err(AppError::UpstreamQuotaExceeded(_))));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_generic_failure_falls_back() {
        let provider = MockProvider::new(|_, _| {
            Err(LlmError::Api {
                status: 500,
                message: "overloaded".to_string(),
            })
        });
        let parsed = parsed();
        let aligned = engine_with(provider.clone()).align(&parsed, JD).await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(aligned.sources, AlignmentSources::default());
        assert_eq!(aligned.experience, parsed.experience);
    }

    #[tokio::test]
    async fn test_experience_reply_with_unknown_fields_is_malformed() {
        let provider = MockProvider::new(|_, _| {
            Ok(r#"{"roles":[{"title":"Sales Manager","company":"Acme Ltd","bullets":["x"],"impact":"high"}]}"#.to_string())
        });
        let result = engine_with(provider).align_experience(&parsed(), JD).await;
        assert!(matches!(result, Err(AppError::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_experience_reply_with_non_string_bullets_is_malformed() {
        let provider = MockProvider::new(|_, _| Ok(r#"{"roles":[{"bullets":[1,2]}]}"#.to_string()));
        let result = engine_with(provider).align_experience(&parsed(), JD).await;
        assert!(matches!(result, Err(AppError::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_experience_reply_with_invented_employer_is_malformed() {
        let provider = MockProvider::new(|_, _| {
            Ok(r#"{"roles":[{"title":"Sales Manager","company":"Globex","bullets":["x"]}]}"#.to_string())
        });
        let result = engine_with(provider).align_experience(&parsed(), JD).await;
        assert!(matches!(result, Err(AppError::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_experience_reply_with_extra_roles_is_malformed() {
        let provider = MockProvider::new(|_, _| {
            Ok(r#"{"roles":[{"bullets":["a"]},{"bullets":["b"]}]}"#.to_string())
        });
        let result = engine_with(provider).align_experience(&parsed(), JD).await;
        assert!(matches!(result, Err(AppError::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_empty_aligned_bullets_keep_source_bullets() {
        let provider = MockProvider::new(|_, _| {
            Ok(r#"{"roles":[{"title":"Sales Manager","company":"acme ltd","bullets":[" "]}]}"#.to_string())
        });
        let (_, entries, source) = engine_with(provider)
            .align_experience(&parsed(), JD)
            .await
            .unwrap();
        assert_eq!(source, AlignmentSource::Completion);
        assert_eq!(entries[0].bullets, vec!["Grew revenue 20%"]);
    }

    #[tokio::test]
    async fn test_no_parsed_roles_skips_experience_call() {
        let provider = MockProvider::new(|system, _| happy_reply(system));
        let parsed = parse_cv("Jane Doe\nSUMMARY\nSeasoned seller.", &Heuristics::default());
        let (_, entries, source) = engine_with(provider.clone())
            .align_experience(&parsed, JD)
            .await
            .unwrap();
        assert!(entries.is_empty());
        assert_eq!(source, AlignmentSource::Fallback);
        assert_eq!(provider.calls(), 0);
    }
}
