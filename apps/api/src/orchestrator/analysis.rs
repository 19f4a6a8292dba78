//! Job-detail analysis: optional page extraction, then one report turn.

use tracing::{info, warn};

use crate::extraction::url_guard::extract_first_url;
use crate::extraction::FetchError;
use crate::llm_client::{ChatMessage, LlmError};
use crate::orchestrator::prompts::{analysis_context, job_detail_analysis_system, ANALYSIS_KICKOFF};
use crate::orchestrator::{OrchestrationResult, Orchestrator, Protocol};

impl Orchestrator {
    /// Produces an analysis report for a job description or posting URL.
    ///
    /// Extraction problems of any kind leave the query as the only context.
    pub async fn analyze(&self, text: &str) -> Result<OrchestrationResult, LlmError> {
        let mut result = OrchestrationResult::new(Protocol::Analysis, text);
        let mut job_info = text.to_string();

        if let Some(url) = extract_first_url(text) {
            result.extracted_url = Some(url.to_string());
            match self.extractor.try_extract(url).await {
                Ok(content) => {
                    result.external_call = true;
                    job_info = analysis_context(text, &content.render());
                    result.extracted_content = Some(content);
                }
                Err(FetchError::Rejected(_)) => {
                    info!("URL not fetchable; analysing query only");
                }
                Err(e) => {
                    result.external_call = true;
                    warn!("Extraction failed for {}: {}; analysing query only", url, e);
                }
            }
        } else {
            info!("No URL in query; analysing text only");
        }

        let messages = [
            ChatMessage::system(job_detail_analysis_system(&job_info)),
            ChatMessage::user(ANALYSIS_KICKOFF),
        ];
        let reply = self
            .chat_turn("Detail analysis", &messages, &[], &mut result)
            .await?;

        let report = reply.text().ok_or(LlmError::EmptyContent)?.to_string();
        Ok(result.finish(report))
    }
}
