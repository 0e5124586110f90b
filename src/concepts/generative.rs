//! Generative concept source backed by an LLM.
//!
//! One structured prompt asks for exactly `count` concepts as a JSON array.
//! The response is free-form text; the array is extracted best-effort and
//! any failure to do so aborts sourcing for the whole run.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::ConceptError;
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::utils::json_extraction::extract_json_array;

use super::{Concept, ConceptList, ConceptSource, TransformationCategory};

/// User prompt template for concept brainstorming.
const CONCEPT_PROMPT_TEMPLATE: &str = r#"Generate {count} diverse and creative concepts for ARC (Abstraction and Reasoning Corpus) puzzles.

Each concept should be:
1. Unique and different from others
2. Based on visual/spatial transformations
3. Describable in 1-2 sentences
4. Suitable for grid-based puzzles

Include variety across these categories:
{categories}

Format your response as a JSON array of strings, where each string is a concept description.
Example: ["Mirror the pattern horizontally", "Rotate each colored region 90 degrees clockwise"]

Output ONLY the JSON array, no additional text."#;

/// Rough output tokens needed per concept, used to size `max_tokens`.
const TOKENS_PER_CONCEPT: u32 = 64;

/// Configuration for [`LlmConceptSource`].
#[derive(Debug, Clone)]
pub struct ConceptSourceConfig {
    /// Model passed to the provider. Empty means the provider default.
    pub model: String,
    /// Sampling temperature; kept high for diversity.
    pub temperature: f64,
    /// Categories listed in the prompt.
    pub categories: Vec<TransformationCategory>,
}

impl Default for ConceptSourceConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 1.0,
            categories: TransformationCategory::all(),
        }
    }
}

impl ConceptSourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the temperature, clamped to the provider range.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

/// Concept source that brainstorms concepts with an LLM.
pub struct LlmConceptSource {
    llm_client: Arc<dyn LlmProvider>,
    config: ConceptSourceConfig,
}

impl std::fmt::Debug for LlmConceptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConceptSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LlmConceptSource {
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: ConceptSourceConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, ConceptSourceConfig::default())
    }

    pub fn config(&self) -> &ConceptSourceConfig {
        &self.config
    }

    /// Builds the brainstorming prompt for `count` concepts.
    pub fn build_prompt(&self, count: usize) -> String {
        let categories = self
            .config
            .categories
            .iter()
            .map(TransformationCategory::prompt_line)
            .collect::<Vec<_>>()
            .join("\n");

        CONCEPT_PROMPT_TEMPLATE
            .replace("{count}", &count.to_string())
            .replace("{categories}", &categories)
    }
}

#[async_trait]
impl ConceptSource for LlmConceptSource {
    async fn generate(&self, count: usize) -> Result<ConceptList, ConceptError> {
        if count == 0 {
            return Ok(ConceptList::new(Vec::new(), 0));
        }

        info!(count, model = %self.config.model, "Brainstorming puzzle concepts");

        let max_tokens = TOKENS_PER_CONCEPT
            .saturating_mul(u32::try_from(count).unwrap_or(u32::MAX))
            .saturating_add(512);

        let request = GenerationRequest::new(
            self.config.model.clone(),
            vec![Message::user(self.build_prompt(count))],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(max_tokens);

        let response = self.llm_client.generate(request).await?;
        let content = response
            .first_content()
            .filter(|c| !c.trim().is_empty())
            .ok_or(ConceptError::EmptyResponse)?;

        debug!(tokens = response.usage.total_tokens, "Concept response received");

        let concepts = parse_concepts(content, count)?;
        let list = ConceptList::new(concepts, count);

        if list.shortfall() > 0 {
            warn!(
                sourced = list.len(),
                requested = count,
                "Concept service returned fewer concepts than requested"
            );
        }

        Ok(list)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

/// Parses a free-form response into at most `count` concepts.
///
/// Blank entries are dropped and surrounding whitespace trimmed. The raw
/// response is carried in the error so the operator can see what came back.
pub fn parse_concepts(content: &str, count: usize) -> Result<Vec<Concept>, ConceptError> {
    let span = extract_json_array(content).ok_or_else(|| ConceptError::NoJsonArray {
        raw: content.to_string(),
    })?;

    let entries: Vec<String> =
        serde_json::from_str(span).map_err(|e| ConceptError::InvalidArray {
            reason: e.to_string(),
            raw: content.to_string(),
        })?;

    Ok(entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .take(count)
        .map(Concept::from)
        .collect())
}
