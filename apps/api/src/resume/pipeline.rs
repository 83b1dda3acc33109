//! The tailoring pipeline: parse → align → merge, under a request timeout.
//!
//! One `Pipeline` is built at startup from `Config` and shared read-only
//! through `AppState`. Policy variations are flags, not separate pipelines.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alignment::AlignmentEngine;
use crate::config::Config;
use crate::document::{assemble, document_filename, DocumentRenderer, WordMlRenderer};
use crate::errors::AppError;
use crate::llm_client::CompletionProvider;
use crate::models::request::TailorRequest;
use crate::models::resume::{AlignmentSources, CanonicalResume};
use crate::parsing::{parse_cv, Heuristics, ParsedSections};
use crate::resume::mapper::{merge_into_canonical, MergePolicy};

/// Result of one tailoring run.
#[derive(Debug, Clone)]
pub struct TailoredResume {
    pub request_id: Uuid,
    pub resume: CanonicalResume,
    pub sources: AlignmentSources,
    pub generated_at: DateTime<Utc>,
}

/// A rendered document ready to send as an attachment.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

pub struct Pipeline {
    heuristics: Heuristics,
    aligner: AlignmentEngine,
    renderer: Arc<dyn DocumentRenderer>,
    merge_policy: MergePolicy,
    request_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        heuristics: Heuristics,
        aligner: AlignmentEngine,
        renderer: Arc<dyn DocumentRenderer>,
        merge_policy: MergePolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            heuristics,
            aligner,
            renderer,
            merge_policy,
            request_timeout,
        }
    }

    /// Wires the pipeline from configuration. `provider` is `None` when no
    /// completion credentials are configured.
    pub fn from_config(config: &Config, provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        let heuristics = Heuristics::new(&config.role_keywords, &config.locality_keywords);
        let aligner = AlignmentEngine::new(
            provider,
            heuristics.clone(),
            Duration::from_millis(config.rate_limit_backoff_ms),
        );
        Self::new(
            heuristics,
            aligner,
            Arc::new(WordMlRenderer),
            config.merge_policy(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn has_completion(&self) -> bool {
        self.aligner.has_completion()
    }

    /// Heuristic parse only. Never fails and never calls the completion service.
    pub fn parse(&self, raw: &str) -> ParsedSections {
        parse_cv(raw, &self.heuristics)
    }

    pub async fn tailor(&self, request: TailorRequest) -> Result<TailoredResume, AppError> {
        if request.cv_text.trim().is_empty() {
            return Err(AppError::Validation("cvText cannot be empty".to_string()));
        }

        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            cv_chars = request.cv_text.chars().count(),
            jd_chars = request.job_description.chars().count(),
            completion = self.has_completion(),
            "Tailoring started"
        );

        match tokio::time::timeout(self.request_timeout, self.run(request_id, request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%request_id, "Tailoring exceeded {:?}, dropping partial results", self.request_timeout);
                Err(AppError::ServiceTimeout(self.request_timeout.as_secs()))
            }
        }
    }

    async fn run(&self, request_id: Uuid, request: TailorRequest) -> Result<TailoredResume, AppError> {
        let parsed = self.parse(&request.cv_text);
        debug!(
            %request_id,
            roles = parsed.experience.len(),
            qualifications = parsed.education.len(),
            "CV parsed"
        );

        let aligned = self.aligner.align(&parsed, &request.job_description).await?;
        info!(
            %request_id,
            summary = ?aligned.sources.summary,
            experience = ?aligned.sources.experience,
            skills = ?aligned.sources.skills,
            "Alignment complete"
        );

        let resume = merge_into_canonical(
            &parsed,
            &aligned,
            &request.overrides,
            &request.job_description,
            self.merge_policy,
        );

        Ok(TailoredResume {
            request_id,
            resume,
            sources: aligned.sources,
            generated_at: Utc::now(),
        })
    }

    pub fn render(&self, tailored: &TailoredResume) -> Result<RenderedDocument, AppError> {
        let blocks = assemble(&tailored.resume);
        let bytes = self.renderer.render(&blocks)?;
        debug!(
            request_id = %tailored.request_id,
            blocks = blocks.len(),
            bytes = bytes.len(),
            "Document rendered"
        );

        Ok(RenderedDocument {
            filename: document_filename(&tailored.resume.full_name, self.renderer.file_extension()),
            content_type: self.renderer.content_type(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::alignment::engine::DEFAULT_RATE_LIMIT_BACKOFF;
    use crate::llm_client::mock::MockProvider;
    use crate::llm_client::{CompletionOptions, LlmError};
    use crate::models::resume::AlignmentSource;

    const JANE: &str = "Jane Doe\njane@x.com\nEXPERIENCE\nSales Manager\n2019-2022\n- Grew revenue 20%\nEDUCATION\nBSc Marketing, LeedsUni, 2018";

    fn pipeline(provider: Option<Arc<dyn CompletionProvider>>) -> Pipeline {
        Pipeline::new(
            Heuristics::default(),
            AlignmentEngine::new(provider, Heuristics::default(), DEFAULT_RATE_LIMIT_BACKOFF),
            Arc::new(WordMlRenderer),
            MergePolicy::default(),
            Duration::from_secs(60),
        )
    }

    fn request(value: serde_json::Value) -> TailorRequest {
        serde_json::from_value(value).unwrap()
    }

    struct StalledProvider;

    #[async_trait]
    impl CompletionProvider for StalledProvider {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _options: CompletionOptions,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_scenario_fallback_without_completion() {
        let tailored = pipeline(None)
            .tailor(request(json!({"cvText": JANE})))
            .await
            .unwrap();

        let resume = &tailored.resume;
        assert_eq!(resume.full_name, "Jane Doe");
        assert_eq!(resume.experience.len(), 1);
        assert!(resume.experience[0].title.contains("Sales Manager"));
        assert_eq!(resume.experience[0].bullets, vec!["Grew revenue 20%"]);
        assert_eq!(resume.education.len(), 1);
        assert!(resume.education[0].degree.starts_with("BSc Marketing"));
        assert_eq!(tailored.sources.summary, AlignmentSource::Fallback);
    }

    #[tokio::test]
    async fn test_empty_cv_is_rejected_before_any_stage() {
        let provider = MockProvider::new(|_, _| Ok("unused".to_string()));
        let pipeline = pipeline(Some(provider.clone() as Arc<dyn CompletionProvider>));

        let err = pipeline
            .tailor(request(json!({"cvText": "  \n ", "jobDescription": "Sales Manager"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_rate_limit_fails_retryable() {
        let provider = MockProvider::always_rate_limited();
        let pipeline = pipeline(Some(provider.clone() as Arc<dyn CompletionProvider>));
        let err = pipeline
            .tailor(request(json!({"cvText": JANE, "jobDescription": "Sales Manager"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamRateLimited(_)));
        assert!(err.is_retryable());
        // One call per sub-operation, then a single retry whose second 429
        // fails the request and cancels the other pending retries.
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_drops_partial_results() {
        let pipeline = pipeline(Some(Arc::new(StalledProvider) as Arc<dyn CompletionProvider>));
        let err = pipeline
            .tailor(request(json!({"cvText": JANE})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ServiceTimeout(60)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_caller_experience_replaces_parsed_roles() {
        let tailored = pipeline(None)
            .tailor(request(json!({
                "cvText": JANE,
                "experience": [{"title": "Buyer", "company": "Initech", "bullets": ["Cut costs 8%"]}]
            })))
            .await
            .unwrap();

        assert_eq!(tailored.resume.experience.len(), 1);
        assert_eq!(tailored.resume.experience[0].company, "Initech");
    }

    #[tokio::test]
    async fn test_render_produces_named_word_document() {
        let pipeline = pipeline(None);
        let tailored = pipeline.tailor(request(json!({"cvText": JANE}))).await.unwrap();
        let document = pipeline.render(&tailored).unwrap();

        assert_eq!(document.filename, "jane-doe-cv.doc");
        assert_eq!(document.content_type, "application/msword");
        let xml = String::from_utf8(document.bytes.to_vec()).unwrap();
        assert!(xml.contains("Jane Doe"));
        assert!(xml.contains("PROFESSIONAL EXPERIENCE"));
    }
}
