use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;
use tokio::sync::OnceCell;

use crate::core::state::{Singer, ANNELIES, EMMA, FANNIE, MIRANDA};
use crate::services::assets::StaticTextSource;

pub const MIRANDA_PROFILE_PATH: &str = "Miranda_Noor.md";
pub const ANNELIES_PROFILE_PATH: &str = "Annelies_Brink.md";

const BODY_DETAILS_MARKER: &str = "### Body Details";
const SECTION_END: &str = "\n## ";

const FANNIE_DESCRIPTION: &str = "Fannie de Jong, an average Dutch girl with a charming spray of freckles across her nose and cheeks, wearing stylish glasses. She has a blond ponytail and friendly blue eyes.";
const EMMA_DESCRIPTION: &str = "Emma Vermeer, a Dutch girl with striking reddish, shoulder-length hair and captivating light green eyes.";
const MIRANDA_FALLBACK: &str = "A young woman of mixed Indian and Dutch heritage, with deep espresso black hair with auburn highlights, and warm dark hazel eyes. She plays a bass guitar.";
const ANNELIES_FALLBACK: &str = "A young woman of Dutch heritage, with light brown, shoulder-length hair and blue almond-shaped eyes. She has a calm and creative presence.";

/// One-line physical descriptions for the four known singers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterDescriptions {
    pub miranda: String,
    pub annelies: String,
    pub fannie: String,
    pub emma: String,
}

impl CharacterDescriptions {
    pub fn fallback() -> Self {
        Self {
            miranda: MIRANDA_FALLBACK.to_string(),
            annelies: ANNELIES_FALLBACK.to_string(),
            fannie: FANNIE_DESCRIPTION.to_string(),
            emma: EMMA_DESCRIPTION.to_string(),
        }
    }

    pub fn for_name(&self, name: &str) -> Option<&str> {
        match name {
            MIRANDA => Some(&self.miranda),
            ANNELIES => Some(&self.annelies),
            FANNIE => Some(&self.fannie),
            EMMA => Some(&self.emma),
            _ => None,
        }
    }

    /// Known description, or a generic one built from the voice.
    pub fn description_for(&self, singer: &Singer) -> String {
        self.for_name(&singer.name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("A young female musician with a {} voice.", singer.voice))
    }
}

static BOLD_LIST_KEY: OnceLock<Regex> = OnceLock::new();
static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn bold_list_key() -> &'static Regex {
    BOLD_LIST_KEY.get_or_init(|| Regex::new(r"- \*\*(.*?)\*\*:").expect("Invalid list key regex"))
}

fn whitespace() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"))
}

/// Extracts the "Body Details" section of a character profile as a single
/// line of prose. Returns `None` when the section is missing.
pub fn parse_body_details(markdown: &str) -> Option<String> {
    let start = markdown.find(BODY_DETAILS_MARKER)? + BODY_DETAILS_MARKER.len();
    let mut section = &markdown[start..];
    if let Some(end) = section.find(SECTION_END) {
        section = &section[..end];
    }

    let cleaned = bold_list_key().replace_all(section, "${1}:");
    let cleaned = cleaned.replace(';', ",").replace('*', "");
    let cleaned = whitespace().replace_all(&cleaned, " ");
    Some(cleaned.trim().to_string())
}

async fn fetch_descriptions(source: &dyn StaticTextSource) -> Result<CharacterDescriptions> {
    let (miranda, annelies) = futures_util::try_join!(
        source.fetch_text(MIRANDA_PROFILE_PATH),
        source.fetch_text(ANNELIES_PROFILE_PATH),
    )?;
    let miranda = parse_body_details(&miranda)
        .ok_or_else(|| anyhow!("{} has no Body Details section", MIRANDA_PROFILE_PATH))?;
    let annelies = parse_body_details(&annelies)
        .ok_or_else(|| anyhow!("{} has no Body Details section", ANNELIES_PROFILE_PATH))?;
    Ok(CharacterDescriptions {
        miranda,
        annelies,
        fannie: FANNIE_DESCRIPTION.to_string(),
        emma: EMMA_DESCRIPTION.to_string(),
    })
}

/// Init-once store for parsed descriptions. Only a successful load is kept;
/// a failed one returns the fallback and is retried on the next call.
/// Nothing invalidates it for the rest of the session.
#[derive(Debug, Default)]
pub struct CharacterDescriptionCache {
    cell: OnceCell<CharacterDescriptions>,
}

impl CharacterDescriptionCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub async fn resolve(&self, source: &dyn StaticTextSource) -> CharacterDescriptions {
        match self.cell.get_or_try_init(|| fetch_descriptions(source)).await {
            Ok(descriptions) => descriptions.clone(),
            Err(e) => {
                log::error!("Error fetching and parsing character descriptions: {:#}", e);
                CharacterDescriptions::fallback()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

static CHARACTER_CACHE: CharacterDescriptionCache = CharacterDescriptionCache::new();

/// Descriptions from the process-wide cache.
pub async fn get_character_descriptions(source: &dyn StaticTextSource) -> CharacterDescriptions {
    CHARACTER_CACHE.resolve(source).await
}
