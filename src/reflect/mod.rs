//! Reflection: turning post-journey feedback into an updated profile.
//!
//! Preference inference is a different task than narrative composition, so it
//! is a second, independent oracle call — never a reuse of the narrative
//! call's output — and it is separately testable. The oracle is shown the
//! current profile and must emit the full merged replacement; the engine does
//! no set-union of its own. Validation is strict: anything short of a JSON
//! object with exactly `likes` and `dislikes` string lists means zero writes.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::PreferenceError;
use crate::llm::GenerationOracle;
use crate::profile::{self, PreferenceProfile, PreferenceStore};
use crate::prompt;

/// Whether the user liked or disliked a completed journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Liked,
    Disliked,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Liked => "liked",
            Feedback::Disliked => "disliked",
        }
    }
}

/// Feedback on one completed journey. Consumed once, never persisted.
#[derive(Debug, Clone)]
pub struct ReflectionFeedback {
    pub user_id: String,
    pub original_query: String,
    pub journey_title: String,
    pub feedback: Feedback,
}

/// Expected oracle output shape. `deny_unknown_fields` enforces the
/// exactly-two-keys contract.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReflectionOutput {
    likes: Vec<String>,
    dislikes: Vec<String>,
}

/// Drives the reflection oracle call and persists validated profiles.
pub struct ReflectionUpdater {
    preferences: Arc<dyn PreferenceStore>,
    oracle: Arc<dyn GenerationOracle>,
}

impl ReflectionUpdater {
    /// Create an updater with the given collaborators.
    pub fn new(preferences: Arc<dyn PreferenceStore>, oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            preferences,
            oracle,
        }
    }

    /// Infer an updated profile from feedback and upsert it.
    ///
    /// Any failure — oracle call, JSON parse, shape validation, store write —
    /// leaves the stored profile untouched and surfaces as a
    /// [`PreferenceError`] for the caller to log. The planner facade absorbs
    /// it; reflection never blocks the user-facing flow.
    pub fn reflect_and_update(&self, feedback: &ReflectionFeedback) -> Result<(), PreferenceError> {
        let current = profile::load_or_default(self.preferences.as_ref(), &feedback.user_id);

        let prompt = build_reflection_prompt(feedback, &current);

        let raw = self
            .oracle
            .complete(&prompt)
            .map_err(|source| PreferenceError::Oracle { source })?;

        let updated = parse_reflection(&raw)?;

        self.preferences
            .upsert(&feedback.user_id, &updated)
            .map_err(|source| PreferenceError::Store { source })?;

        tracing::info!(
            user_id = %feedback.user_id,
            likes = updated.likes.len(),
            dislikes = updated.dislikes.len(),
            "preference profile updated from reflection"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ReflectionUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionUpdater").finish()
    }
}

/// Parse and validate raw oracle output into a normalized profile.
fn parse_reflection(raw: &str) -> Result<PreferenceProfile, PreferenceError> {
    let json = prompt::extract_json_object(raw).ok_or_else(|| {
        tracing::debug!(raw, "reflection response held no JSON object");
        PreferenceError::UpdateRejected {
            message: "no JSON object found in response".into(),
        }
    })?;

    let output: ReflectionOutput = serde_json::from_str(json).map_err(|e| {
        tracing::debug!(raw, error = %e, "reflection response failed validation");
        PreferenceError::UpdateRejected {
            message: e.to_string(),
        }
    })?;

    // Normalization enforces the lowercase, deduplicated contract even when
    // the oracle ignored that part of the instructions.
    Ok(PreferenceProfile::new(output.likes, output.dislikes))
}

/// Build the reflection prompt: infer the merged profile from the journey
/// outcome against the profile the oracle is shown.
fn build_reflection_prompt(feedback: &ReflectionFeedback, current: &PreferenceProfile) -> String {
    format!(
        "You maintain a traveler's preference profile.\n\
         \n\
         Current profile: {current}\n\
         The user asked for: \"{query}\"\n\
         They took the journey titled: \"{title}\"\n\
         Afterwards they said they {verdict} it.\n\
         \n\
         Infer the user's topical likes and dislikes from this outcome and merge \
         them into the current profile. Respond with only a JSON object with \
         exactly the two keys \"likes\" and \"dislikes\", each a list of \
         lowercase, deduplicated topic strings representing the full updated \
         profile.",
        current = current.summary(),
        query = feedback.original_query,
        title = feedback.journey_title,
        verdict = feedback.feedback.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback() -> ReflectionFeedback {
        ReflectionFeedback {
            user_id: "u1".into(),
            original_query: "quiet walk".into(),
            journey_title: "A Walk Through History".into(),
            feedback: Feedback::Liked,
        }
    }

    #[test]
    fn parse_accepts_exact_shape() {
        let profile =
            parse_reflection(r#"{"likes": ["quiet", "history"], "dislikes": ["crowded"]}"#).unwrap();
        assert_eq!(profile.likes, vec!["quiet", "history"]);
        assert_eq!(profile.dislikes, vec!["crowded"]);
    }

    #[test]
    fn parse_normalizes_oracle_output() {
        let profile = parse_reflection(r#"{"likes": ["Quiet", "quiet "], "dislikes": []}"#).unwrap();
        assert_eq!(profile.likes, vec!["quiet"]);
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(matches!(
            parse_reflection("not json"),
            Err(PreferenceError::UpdateRejected { .. })
        ));
    }

    #[test]
    fn parse_rejects_missing_key() {
        assert!(matches!(
            parse_reflection(r#"{"likes": ["quiet"]}"#),
            Err(PreferenceError::UpdateRejected { .. })
        ));
    }

    #[test]
    fn parse_rejects_extra_key() {
        assert!(matches!(
            parse_reflection(r#"{"likes": [], "dislikes": [], "notes": "hi"}"#),
            Err(PreferenceError::UpdateRejected { .. })
        ));
    }

    #[test]
    fn parse_rejects_wrong_value_type() {
        assert!(matches!(
            parse_reflection(r#"{"likes": "quiet", "dislikes": []}"#),
            Err(PreferenceError::UpdateRejected { .. })
        ));
    }

    #[test]
    fn reflection_prompt_shows_current_profile_and_verdict() {
        let current = PreferenceProfile::new(vec!["history"], vec![]);
        let built = build_reflection_prompt(&feedback(), &current);
        assert!(built.contains("history"));
        assert!(built.contains("quiet walk"));
        assert!(built.contains("A Walk Through History"));
        assert!(built.contains("liked"));
        assert!(built.contains("\"likes\""));
        assert!(built.contains("\"dislikes\""));
    }
}
