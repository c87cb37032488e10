use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::text::strip_performance_notes;

pub const MIRANDA: &str = "Miranda Noor";
pub const ANNELIES: &str = "Annelies Brink";
pub const FANNIE: &str = "Fannie de Jong";
pub const EMMA: &str = "Emma Vermeer";

pub const MAX_SINGERS: usize = 4;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Singer {
    pub name: String,
    pub voice: String,
}

impl Singer {
    pub fn new(name: &str, voice: &str) -> Self {
        Self {
            name: name.to_string(),
            voice: voice.to_string(),
        }
    }

    /// First word of the name, used inside `[Label]` lyric tags.
    pub fn first_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or(&self.name)
    }

    pub fn label(&self) -> String {
        format!("[{}]", self.first_name())
    }
}

/// The singer a solo falls back to when nobody is selected.
pub fn lead_singer() -> Singer {
    Singer::new(MIRANDA, "Soprano")
}

/// The four performers the wizard knows about.
pub fn roster() -> Vec<Singer> {
    vec![
        lead_singer(),
        Singer::new(ANNELIES, "Alto"),
        Singer::new(FANNIE, "Mezzo-Soprano"),
        Singer::new(EMMA, "Feminine Baritone"),
    ]
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SongRating {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[default]
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
}

impl SongRating {
    pub const ALL: [SongRating; 5] = [
        SongRating::G,
        SongRating::Pg,
        SongRating::Pg13,
        SongRating::R,
        SongRating::Nc17,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SongRating::G => "G",
            SongRating::Pg => "PG",
            SongRating::Pg13 => "PG-13",
            SongRating::R => "R",
            SongRating::Nc17 => "NC-17",
        }
    }
}

impl fmt::Display for SongRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ten optional creative-tuning parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum QualityKey {
    Mood,
    Genre,
    Pace,
    Instrumentation,
    VocalStyle,
    LyricalTheme,
    DrumStyle,
    SnareType,
    SpecialInstrument,
    NarrativeDynamic,
}

impl QualityKey {
    pub const ALL: [QualityKey; 10] = [
        QualityKey::Mood,
        QualityKey::Genre,
        QualityKey::Pace,
        QualityKey::Instrumentation,
        QualityKey::VocalStyle,
        QualityKey::LyricalTheme,
        QualityKey::DrumStyle,
        QualityKey::SnareType,
        QualityKey::SpecialInstrument,
        QualityKey::NarrativeDynamic,
    ];
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Qualities {
    pub mood: Option<String>,
    pub genre: Option<String>,
    pub pace: Option<String>,
    pub instrumentation: Option<String>,
    pub vocal_style: Option<String>,
    pub lyrical_theme: Option<String>,
    pub drum_style: Option<String>,
    pub snare_type: Option<String>,
    pub special_instrument: Option<String>,
    pub narrative_dynamic: Option<String>,
}

impl Qualities {
    pub fn get(&self, key: QualityKey) -> Option<&str> {
        let value = match key {
            QualityKey::Mood => &self.mood,
            QualityKey::Genre => &self.genre,
            QualityKey::Pace => &self.pace,
            QualityKey::Instrumentation => &self.instrumentation,
            QualityKey::VocalStyle => &self.vocal_style,
            QualityKey::LyricalTheme => &self.lyrical_theme,
            QualityKey::DrumStyle => &self.drum_style,
            QualityKey::SnareType => &self.snare_type,
            QualityKey::SpecialInstrument => &self.special_instrument,
            QualityKey::NarrativeDynamic => &self.narrative_dynamic,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: QualityKey, value: Option<String>) {
        let slot = match key {
            QualityKey::Mood => &mut self.mood,
            QualityKey::Genre => &mut self.genre,
            QualityKey::Pace => &mut self.pace,
            QualityKey::Instrumentation => &mut self.instrumentation,
            QualityKey::VocalStyle => &mut self.vocal_style,
            QualityKey::LyricalTheme => &mut self.lyrical_theme,
            QualityKey::DrumStyle => &mut self.drum_style,
            QualityKey::SnareType => &mut self.snare_type,
            QualityKey::SpecialInstrument => &mut self.special_instrument,
            QualityKey::NarrativeDynamic => &mut self.narrative_dynamic,
        };
        *slot = value;
    }

    /// Value or the literal "Not specified", as listed in prompts.
    pub fn describe(&self, key: QualityKey) -> &str {
        self.get(key).unwrap_or("Not specified")
    }
}

fn default_singers() -> Vec<Singer> {
    roster().into_iter().take(2).collect()
}

fn default_language() -> String {
    "English".to_string()
}

/// Everything the user has chosen or generated so far in one wizard session.
///
/// Cover prompts and URLs are parallel arrays; they are only changed through
/// the methods below so their lengths never drift apart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreativeState {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(flatten)]
    pub qualities: Qualities,
    #[serde(default)]
    pub rating: SongRating,
    #[serde(default = "default_singers")]
    pub singers: Vec<Singer>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_language")]
    pub language2: String,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lyrics: String,
    #[serde(default)]
    pub report_introduction: String,
    #[serde(default)]
    pub report_lyrics_snapshot: String,
    #[serde(default)]
    pub translated_lyrics: String,
    #[serde(default)]
    cover_image_prompts: Vec<String>,
    #[serde(default)]
    cover_image_urls: Vec<String>,
    #[serde(default)]
    selected_cover_image_index: Option<usize>,
    #[serde(default)]
    pub image_generation_skipped: bool,
}

impl Default for CreativeState {
    fn default() -> Self {
        Self {
            topic: String::new(),
            style: None,
            qualities: Qualities::default(),
            rating: SongRating::default(),
            singers: default_singers(),
            language: default_language(),
            language2: default_language(),
            instruments: Vec::new(),
            title: String::new(),
            lyrics: String::new(),
            report_introduction: String::new(),
            report_lyrics_snapshot: String::new(),
            translated_lyrics: String::new(),
            cover_image_prompts: Vec::new(),
            cover_image_urls: Vec::new(),
            selected_cover_image_index: None,
            image_generation_skipped: false,
        }
    }
}

impl CreativeState {
    pub fn is_bilingual(&self) -> bool {
        is_bilingual(&self.language, &self.language2)
    }

    pub fn song_has_non_english(&self) -> bool {
        song_has_non_english(&self.language, &self.language2)
    }

    /// Lyrics as sung, without tags or stage directions.
    pub fn plain_lyrics(&self) -> String {
        strip_performance_notes(&self.lyrics)
    }

    pub fn quality(&self, key: QualityKey) -> Option<&str> {
        self.qualities.get(key)
    }

    pub fn set_quality(&mut self, key: QualityKey, value: Option<String>) {
        self.qualities.set(key, value);
    }

    /// Title, lyrics and at least one instrument: enough for a collection.
    pub fn core_content_ready(&self) -> bool {
        !self.title.is_empty() && !self.lyrics.is_empty() && !self.instruments.is_empty()
    }

    /// Choosing a style invalidates the instruments picked for the old one.
    pub fn set_style(&mut self, style: Option<String>) {
        self.style = style;
        self.instruments = Vec::new();
    }

    pub fn set_singers(&mut self, singers: Vec<Singer>) -> Result<()> {
        if singers.is_empty() || singers.len() > MAX_SINGERS {
            return Err(anyhow!(
                "A song needs between 1 and {} singers, got {}",
                MAX_SINGERS,
                singers.len()
            ));
        }
        for (i, singer) in singers.iter().enumerate() {
            if singers[..i].iter().any(|s| s.name == singer.name) {
                return Err(anyhow!("Singer {} selected twice", singer.name));
            }
        }
        self.singers = singers;
        Ok(())
    }

    pub fn cover_image_prompts(&self) -> &[String] {
        &self.cover_image_prompts
    }

    pub fn cover_image_urls(&self) -> &[String] {
        &self.cover_image_urls
    }

    pub fn selected_cover_image_index(&self) -> Option<usize> {
        self.selected_cover_image_index
    }

    pub fn selected_cover_prompt(&self) -> Option<&str> {
        self.selected_cover_image_index
            .and_then(|i| self.cover_image_prompts.get(i))
            .map(|s| s.as_str())
    }

    /// Appends one cover and selects it.
    pub fn add_cover_image(&mut self, prompt: String, url: String) {
        self.cover_image_prompts.push(prompt);
        self.cover_image_urls.push(url);
        self.selected_cover_image_index = Some(self.cover_image_urls.len() - 1);
    }

    /// Appends a batch of covers in one update and selects the last one.
    pub fn extend_cover_images(&mut self, covers: Vec<(String, String)>) {
        if covers.is_empty() {
            return;
        }
        for (prompt, url) in covers {
            self.cover_image_prompts.push(prompt);
            self.cover_image_urls.push(url);
        }
        self.selected_cover_image_index = Some(self.cover_image_urls.len() - 1);
    }

    pub fn select_cover_image(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            if i >= self.cover_image_urls.len() {
                return Err(anyhow!(
                    "Cover image {} does not exist ({} generated)",
                    i + 1,
                    self.cover_image_urls.len()
                ));
            }
        }
        self.selected_cover_image_index = index;
        Ok(())
    }

    /// Repairs state loaded from disk that breaks the cover-image invariants.
    pub fn normalize(&mut self) {
        if self.singers.is_empty() || self.singers.len() > MAX_SINGERS {
            self.singers = default_singers();
        }
        let len = self.cover_image_prompts.len().min(self.cover_image_urls.len());
        self.cover_image_prompts.truncate(len);
        self.cover_image_urls.truncate(len);
        if matches!(self.selected_cover_image_index, Some(i) if i >= len) {
            self.selected_cover_image_index = len.checked_sub(1);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn is_bilingual(language: &str, language2: &str) -> bool {
    language.to_lowercase() != language2.to_lowercase()
}

fn is_english(language: &str) -> bool {
    language.to_lowercase() == "english"
}

pub fn song_has_non_english(language: &str, language2: &str) -> bool {
    !is_english(language) || (is_bilingual(language, language2) && !is_english(language2))
}
