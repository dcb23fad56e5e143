//! Narrative generation: the retrieval-augmented composition pipeline.
//!
//! One call produces one [`JourneyNarrative`] for one [`JourneyRequest`]:
//! read preferences (degrading to empty on failure), embed the goal, retrieve
//! context, assemble a single prompt, invoke the generation oracle once, and
//! parse strictly. The fallback policy lives in the prompt itself: when the
//! knowledge base yields nothing relevant, the oracle is instructed to
//! describe the destination itself instead of inventing local trivia.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embed::EmbeddingOracle;
use crate::error::{NarrativeError, ScribeError, ScribeResult};
use crate::index::ContextIndex;
use crate::llm::GenerationOracle;
use crate::profile::{self, PreferenceProfile, PreferenceStore};
use crate::prompt;

/// A single journey request. Immutable, built fresh per request, never
/// persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyRequest {
    /// Opaque user identifier.
    pub user_id: String,
    /// Current position as (latitude, longitude). Used by routing only.
    pub origin: (f64, f64),
    /// Locale hint constraining narrative content; not validated against a
    /// gazetteer.
    pub city: String,
    /// Free-text description of the desired experience. May be empty.
    pub goal_query: String,
    /// Opaque destination identifier, resolved through the catalog.
    pub destination_id: String,
}

impl JourneyRequest {
    /// The goal text used in prompts: the query, or the generic goal when
    /// the query is empty.
    pub fn goal_text(&self) -> &str {
        let trimmed = self.goal_query.trim();
        if trimmed.is_empty() {
            prompt::DEFAULT_GOAL
        } else {
            trimmed
        }
    }
}

/// The structured output of one narrative generation.
///
/// All four fields are non-empty after a successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyNarrative {
    /// Short, catchy title for the journey.
    pub title: String,
    /// The main story, 2–4 sentences.
    pub narrative: String,
    /// One brief fun fact tied to the journey.
    pub fun_fact: String,
    /// One sentence referencing a specific nearby feature.
    pub location_awareness: String,
}

impl JourneyNarrative {
    /// Parse raw oracle output, accepting it only when all four fields are
    /// present and non-empty.
    pub fn parse(raw: &str) -> Result<Self, NarrativeError> {
        let json = prompt::extract_json_object(raw).ok_or_else(|| {
            tracing::debug!(raw, "narrative response held no JSON object");
            NarrativeError::MalformedOutput {
                message: "no JSON object found in response".into(),
            }
        })?;

        let parsed: Self = serde_json::from_str(json).map_err(|e| {
            tracing::debug!(raw, error = %e, "narrative response failed schema parse");
            NarrativeError::MalformedOutput {
                message: e.to_string(),
            }
        })?;

        for (field, value) in [
            ("title", &parsed.title),
            ("narrative", &parsed.narrative),
            ("fun_fact", &parsed.fun_fact),
            ("location_awareness", &parsed.location_awareness),
        ] {
            if value.trim().is_empty() {
                tracing::debug!(raw, field, "narrative response field empty");
                return Err(NarrativeError::EmptyField { field });
            }
        }

        Ok(parsed)
    }
}

/// Assembles prompts and drives the generation oracle for one request at a
/// time. Collaborators are injected; lifecycle belongs to the composition
/// root.
pub struct NarrativeGenerator {
    preferences: Arc<dyn PreferenceStore>,
    embedder: Arc<dyn EmbeddingOracle>,
    index: Arc<ContextIndex>,
    oracle: Arc<dyn GenerationOracle>,
    top_k: usize,
}

impl NarrativeGenerator {
    /// Create a generator with the given collaborators.
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        embedder: Arc<dyn EmbeddingOracle>,
        index: Arc<ContextIndex>,
        oracle: Arc<dyn GenerationOracle>,
        top_k: usize,
    ) -> Self {
        Self {
            preferences,
            embedder,
            index,
            oracle,
            top_k,
        }
    }

    /// Produce one narrative for the request, personalized and grounded.
    ///
    /// The two failure modes a caller can distinguish are
    /// [`ScribeError::Retrieval`] (embedding oracle down — retryable) and
    /// [`ScribeError::Narrative`] (oracle failed or emitted an unparseable
    /// narrative). A preference-store failure is absorbed as the empty
    /// profile and never aborts the request.
    pub fn generate(
        &self,
        request: &JourneyRequest,
        destination_name: &str,
    ) -> ScribeResult<JourneyNarrative> {
        let profile = profile::load_or_default(self.preferences.as_ref(), &request.user_id);

        // The query embedding is the one retrieval step that cannot degrade:
        // without it there is nothing to ground the narrative on.
        let query_vector = self.embedder.embed(request.goal_text())?;

        let chunks = self.index.search(&query_vector, self.top_k);
        let context = prompt::join_context(&chunks);
        tracing::debug!(
            user_id = %request.user_id,
            chunks = chunks.len(),
            "retrieved context for narrative"
        );

        let prompt = build_narrative_prompt(request, destination_name, &profile, &context);

        let raw = self
            .oracle
            .complete(&prompt)
            .map_err(|e| ScribeError::Narrative(NarrativeError::Oracle(e)))?;

        let narrative = JourneyNarrative::parse(&raw).map_err(ScribeError::Narrative)?;
        tracing::info!(user_id = %request.user_id, title = %narrative.title, "narrative generated");
        Ok(narrative)
    }
}

impl std::fmt::Debug for NarrativeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeGenerator")
            .field("top_k", &self.top_k)
            .field("index", &self.index)
            .finish()
    }
}

/// Build the single narrative prompt.
///
/// Section order is fixed: system framing, destination, goal, preferences,
/// context, fallback instruction, output schema.
fn build_narrative_prompt(
    request: &JourneyRequest,
    destination_name: &str,
    profile: &PreferenceProfile,
    context: &str,
) -> String {
    let context_block = if context.is_empty() {
        "(no retrieved context)".to_string()
    } else {
        context.to_string()
    };

    format!(
        "You are a precise, locally-grounded narrator. Restrict everything you say \
         to the city of {city}.\n\
         \n\
         The user is heading to: \"{destination}\".\n\
         The user's goal is: \"{goal}\".\n\
         The user's profile: {preferences}\n\
         \n\
         Retrieved context from the local knowledge base:\n\
         {context}\n\
         \n\
         If the context above is empty or irrelevant to the goal, generate a rich, \
         self-contained description of \"{destination}\" itself. Do not invent \
         unrelated local trivia.\n\
         \n\
         Respond with only a JSON object with exactly these keys, all non-empty \
         strings:\n\
         {{\"title\": \"short, catchy title\", \
         \"narrative\": \"the main story, 2-4 sentences\", \
         \"fun_fact\": \"one brief fun fact\", \
         \"location_awareness\": \"one sentence naming a specific nearby feature\"}}",
        city = request.city,
        destination = destination_name,
        goal = request.goal_text(),
        preferences = profile.summary(),
        context = context_block,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JourneyRequest {
        JourneyRequest {
            user_id: "u1".into(),
            origin: (6.45, 7.51),
            city: "Enugu".into(),
            goal_query: "quiet walk".into(),
            destination_id: "poi-1".into(),
        }
    }

    #[test]
    fn goal_text_defaults_when_query_empty() {
        let mut req = request();
        req.goal_query = "  ".into();
        assert_eq!(req.goal_text(), prompt::DEFAULT_GOAL);
    }

    #[test]
    fn parse_accepts_complete_narrative() {
        let raw = r#"{"title": "t", "narrative": "n", "fun_fact": "f", "location_awareness": "l"}"#;
        let narrative = JourneyNarrative::parse(raw).unwrap();
        assert_eq!(narrative.title, "t");
    }

    #[test]
    fn parse_accepts_fenced_output() {
        let raw = "```json\n{\"title\": \"t\", \"narrative\": \"n\", \"fun_fact\": \"f\", \"location_awareness\": \"l\"}\n```";
        assert!(JourneyNarrative::parse(raw).is_ok());
    }

    #[test]
    fn parse_rejects_missing_field() {
        let raw = r#"{"title": "t", "narrative": "n", "fun_fact": "f"}"#;
        assert!(matches!(
            JourneyNarrative::parse(raw),
            Err(NarrativeError::MalformedOutput { .. })
        ));
    }

    #[test]
    fn parse_rejects_empty_field() {
        let raw = r#"{"title": "t", "narrative": "n", "fun_fact": "", "location_awareness": "l"}"#;
        assert!(matches!(
            JourneyNarrative::parse(raw),
            Err(NarrativeError::EmptyField { field: "fun_fact" })
        ));
    }

    #[test]
    fn parse_rejects_plain_text() {
        assert!(matches!(
            JourneyNarrative::parse("a lovely walk"),
            Err(NarrativeError::MalformedOutput { .. })
        ));
    }

    #[test]
    fn prompt_sections_appear_in_order() {
        let profile = PreferenceProfile::new(vec!["history"], vec![]);
        let built = build_narrative_prompt(&request(), "Old Clock Tower", &profile, "a fact");

        let city_pos = built.find("Enugu").unwrap();
        let dest_pos = built.find("Old Clock Tower").unwrap();
        let goal_pos = built.find("quiet walk").unwrap();
        let pref_pos = built.find("history").unwrap();
        let ctx_pos = built.find("a fact").unwrap();
        let fallback_pos = built.find("empty or irrelevant").unwrap();
        assert!(city_pos < dest_pos);
        assert!(dest_pos < goal_pos);
        assert!(goal_pos < pref_pos);
        assert!(pref_pos < ctx_pos);
        assert!(ctx_pos < fallback_pos);
    }

    #[test]
    fn empty_context_renders_placeholder() {
        let built = build_narrative_prompt(
            &request(),
            "Central Library",
            &PreferenceProfile::default(),
            "",
        );
        assert!(built.contains("(no retrieved context)"));
        assert!(built.contains("self-contained description"));
    }
}
