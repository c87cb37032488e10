use anyhow::Result;

use crate::core::state::CreativeState;
use crate::services::llm::{LlmClient, TextRequest};
use crate::services::prompt::{report_introduction_prompt, translation_prompt};
use crate::services::responses::normalize_text;

pub const INTRO_API_ERROR: &str = "Introduction could not be generated due to an API error.";
pub const TRANSLATION_API_ERROR: &str = "Translation could not be generated due to an API error.";
pub const INTRO_NO_API_KEY: &str = "Introduction could not be generated as no API key is set.";

/// Which derived report texts are out of date for the current lyrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegenerationPlan {
    pub lyrics_changed: bool,
    pub needs_intro: bool,
    pub needs_translation: bool,
}

impl RegenerationPlan {
    pub fn evaluate(state: &CreativeState, force: bool) -> Self {
        let lyrics_changed = state.lyrics != state.report_lyrics_snapshot;
        let needs_intro = force || state.report_introduction.is_empty() || lyrics_changed;
        let needs_translation =
            state.song_has_non_english() && (state.translated_lyrics.is_empty() || lyrics_changed);
        Self {
            lyrics_changed,
            needs_intro,
            needs_translation,
        }
    }

    /// True when the stored texts can be used as they are.
    pub fn is_up_to_date(&self) -> bool {
        !self.needs_intro && !self.needs_translation
    }

    /// Runs the needed generations concurrently. A failed generation is
    /// replaced by a fallback text and never fails the pass. Without a
    /// client nothing is called and the no-key fallbacks are used.
    pub async fn execute(
        &self,
        llm: Option<&dyn LlmClient>,
        model: &str,
        state: &CreativeState,
    ) -> ReportRefresh {
        let mut refresh = ReportRefresh::unchanged(state);
        if self.is_up_to_date() {
            return refresh;
        }

        let Some(llm) = llm else {
            log::warn!("No API key set, report content was not regenerated");
            if self.needs_intro {
                refresh.introduction = INTRO_NO_API_KEY.to_string();
            }
            if self.needs_translation {
                refresh.translation = String::new();
            }
            return refresh;
        };

        let intro = async {
            if !self.needs_intro {
                return None;
            }
            let prompt = report_introduction_prompt(&state.title, &state.topic, &state.lyrics, &state.singers);
            Some(generate_text(llm, model, prompt).await)
        };
        let translation = async {
            if !self.needs_translation {
                return None;
            }
            Some(generate_text(llm, model, translation_prompt(&state.lyrics)).await)
        };
        let (intro, translation) = futures_util::join!(intro, translation);

        match intro {
            Some(Ok(text)) => {
                refresh.introduction = text.clone();
                refresh.generated_introduction = Some(text);
            }
            Some(Err(e)) => {
                log::warn!("Failed to generate introduction: {:#}", e);
                refresh.introduction = INTRO_API_ERROR.to_string();
            }
            None => {}
        }
        match translation {
            Some(Ok(text)) => {
                refresh.translation = text.clone();
                refresh.generated_translation = Some(text);
            }
            Some(Err(e)) => {
                log::warn!("Failed to generate translation: {:#}", e);
                refresh.translation = TRANSLATION_API_ERROR.to_string();
            }
            None => {}
        }

        // Advanced after any executed pass. A failed call stores no text, so an
        // empty introduction or translation is requested again on the next view.
        refresh.snapshot = Some(state.lyrics.clone());
        refresh
    }
}

async fn generate_text(llm: &dyn LlmClient, model: &str, prompt: String) -> Result<String> {
    let text = llm.generate(&TextRequest::new(model, prompt)).await?;
    Ok(normalize_text(&text))
}

/// Outcome of one regeneration pass: the texts to show now, plus the
/// changes to store back into the session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRefresh {
    pub introduction: String,
    pub translation: String,
    generated_introduction: Option<String>,
    generated_translation: Option<String>,
    snapshot: Option<String>,
}

impl ReportRefresh {
    /// The stored texts, with nothing to write back.
    pub fn unchanged(state: &CreativeState) -> Self {
        Self {
            introduction: state.report_introduction.clone(),
            translation: state.translated_lyrics.clone(),
            generated_introduction: None,
            generated_translation: None,
            snapshot: None,
        }
    }

    pub fn changed_state(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Stores generated texts and the lyrics snapshot they were made from.
    /// Fallback texts are never stored.
    pub fn apply(&self, state: &mut CreativeState) {
        if let Some(intro) = &self.generated_introduction {
            state.report_introduction = intro.clone();
        }
        if let Some(translation) = &self.generated_translation {
            state.translated_lyrics = translation.clone();
        }
        if let Some(snapshot) = &self.snapshot {
            state.report_lyrics_snapshot = snapshot.clone();
        }
    }
}
