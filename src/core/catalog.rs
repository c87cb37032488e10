use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::state::QualityKey;
use crate::services::assets::StaticTextSource;

pub const STYLES_PATH: &str = "music-styles.json";
pub const QUALITIES_PATH: &str = "qualities.json";
pub const LANGUAGES_PATH: &str = "languages.json";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Instrument {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MusicStyleDefinition {
    pub description: String,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StyleGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub styles: BTreeMap<String, MusicStyleDefinition>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Quality {
    pub name: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QualityGroup {
    pub group_name: String,
    #[serde(default)]
    pub description: String,
    pub key: QualityKey,
    pub qualities: Vec<Quality>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LanguageGroup {
    pub group_name: String,
    pub languages: Vec<Language>,
}

/// Reference data the wizard offers choices from and the report resolves
/// descriptions against.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub style_groups: Vec<StyleGroup>,
    pub quality_groups: Vec<QualityGroup>,
    pub language_groups: Vec<LanguageGroup>,
}

impl Catalog {
    /// Loads the three reference files. A file that cannot be fetched or
    /// parsed leaves its part of the catalog empty.
    pub async fn load(source: &dyn StaticTextSource) -> Self {
        let (styles, qualities, languages) = futures_util::join!(
            load_json::<Vec<StyleGroup>>(source, STYLES_PATH),
            load_json::<Vec<QualityGroup>>(source, QUALITIES_PATH),
            load_json::<Vec<LanguageGroup>>(source, LANGUAGES_PATH),
        );
        Self {
            style_groups: styles,
            quality_groups: qualities,
            language_groups: languages,
        }
    }

    pub fn from_json(styles: &str, qualities: &str, languages: &str) -> Result<Self> {
        Ok(Self {
            style_groups: serde_json::from_str(styles).context("Failed to parse music styles")?,
            quality_groups: serde_json::from_str(qualities).context("Failed to parse qualities")?,
            language_groups: serde_json::from_str(languages).context("Failed to parse languages")?,
        })
    }

    pub fn style(&self, name: &str) -> Option<&MusicStyleDefinition> {
        self.style_groups.iter().find_map(|g| g.styles.get(name))
    }

    pub fn style_names(&self) -> Vec<String> {
        self.style_groups
            .iter()
            .flat_map(|g| g.styles.keys().cloned())
            .collect()
    }

    pub fn instrument(&self, style: &str, name: &str) -> Option<&Instrument> {
        self.style(style)?.instruments.iter().find(|i| i.name == name)
    }

    pub fn default_instruments(&self, style: &str) -> Vec<String> {
        self.style(style)
            .map(|s| {
                s.instruments
                    .iter()
                    .filter(|i| i.default)
                    .map(|i| i.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn quality(&self, key: QualityKey, name: &str) -> Option<(&QualityGroup, &Quality)> {
        self.quality_groups
            .iter()
            .filter(|g| g.key == key)
            .find_map(|g| g.qualities.iter().find(|q| q.name == name).map(|q| (g, q)))
    }

    pub fn language_names(&self) -> Vec<String> {
        self.language_groups
            .iter()
            .flat_map(|g| g.languages.iter().map(|l| l.name.clone()))
            .collect()
    }
}

async fn load_json<T: serde::de::DeserializeOwned + Default>(
    source: &dyn StaticTextSource,
    path: &str,
) -> T {
    let parsed = match source.fetch_text(path).await {
        Ok(text) => serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path)),
        Err(e) => Err(e),
    };
    match parsed {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to load {}: {:#}", path, e);
            T::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const STYLES: &str = r#"[
        {
            "name": "Electronic",
            "description": "Synthetic sounds",
            "styles": {
                "Synthwave": {
                    "description": "Retro-futuristic 80s synths.",
                    "instruments": [
                        { "name": "Analog Synth", "description": "Warm detuned pads.", "default": true },
                        { "name": "Drum Machine", "description": "Gated 80s beats.", "default": true },
                        { "name": "Electric Guitar", "description": "Chorused leads." }
                    ]
                }
            }
        },
        {
            "name": "Folk",
            "description": "Acoustic traditions",
            "styles": {
                "Merfolk/Siren": {
                    "description": "Haunting, oceanic vocals.",
                    "instruments": [
                        { "name": "Harp", "description": "Shimmering arpeggios.", "default": true }
                    ]
                }
            }
        }
    ]"#;

    pub const QUALITIES: &str = r#"[
        {
            "groupName": "Mood",
            "description": "Emotional color",
            "key": "mood",
            "qualities": [
                { "name": "Melancholic", "description": "A wistful, bittersweet feeling." }
            ]
        },
        {
            "groupName": "Narrative Dynamic",
            "description": "How the singers relate",
            "key": "narrativeDynamic",
            "qualities": [
                { "name": "Call and Response", "description": "Singers answer each other." }
            ]
        }
    ]"#;

    pub const LANGUAGES: &str = r#"[
        { "groupName": "Germanic", "languages": [ { "name": "English", "code": "en" }, { "name": "Dutch", "code": "nl" } ] }
    ]"#;

    pub fn sample_catalog() -> Catalog {
        Catalog::from_json(STYLES, QUALITIES, LANGUAGES).unwrap()
    }

    #[test]
    fn test_lookups() {
        let catalog = sample_catalog();
        assert_eq!(catalog.style_names(), vec!["Synthwave", "Merfolk/Siren"]);
        assert_eq!(
            catalog.default_instruments("Synthwave"),
            vec!["Analog Synth", "Drum Machine"]
        );
        assert!(catalog.instrument("Synthwave", "Harp").is_none());
        let (group, quality) = catalog.quality(QualityKey::Mood, "Melancholic").unwrap();
        assert_eq!(group.group_name, "Mood");
        assert_eq!(quality.description, "A wistful, bittersweet feeling.");
        assert!(catalog.quality(QualityKey::Genre, "Melancholic").is_none());
        assert_eq!(catalog.language_names(), vec!["English", "Dutch"]);
    }
}
