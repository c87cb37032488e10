//! Prompt builders. Every function here is pure: the same state always
//! produces the same prompt text.

pub mod context;

use serde_json::json;

use crate::core::state::{
    lead_singer, CreativeState, QualityKey, Qualities, Singer, SongRating, ANNELIES, MIRANDA,
};
use crate::services::characters::CharacterDescriptions;
use context::{
    rating_instruction, relationship_for, roles_instruction, Ensemble, LYRICS_SAPPHIC_SENSIBILITY,
    TOPIC_SAPPHIC_SENSIBILITY,
};

const DEFAULT_SONG_THEME: &str = "An uplifting song about friendship and creativity.";
const DEFAULT_IMAGE_THEME: &str = "A group of female musicians creating music together";
const DEFAULT_IMAGE_STYLE: &str = "Pop";
const DEFAULT_MUSIC_STYLE: &str = "Pop";

/// Quality labels in the order the lyrics prompt lists them.
const LYRICS_QUALITY_LABELS: [(QualityKey, &str); 10] = [
    (QualityKey::NarrativeDynamic, "Narrative Dynamic"),
    (QualityKey::Mood, "Mood"),
    (QualityKey::Genre, "Genre Context"),
    (QualityKey::Pace, "Pace"),
    (QualityKey::Instrumentation, "Texture"),
    (QualityKey::LyricalTheme, "Lyrical Theme"),
    (QualityKey::VocalStyle, "Vocal Style"),
    (QualityKey::DrumStyle, "Drum Style"),
    (QualityKey::SnareType, "Snare Sound"),
    (QualityKey::SpecialInstrument, "Special Instrument Feature"),
];

/// Quality labels in the order the style-suggestion prompt lists them.
const STYLE_QUALITY_LABELS: [(QualityKey, &str); 10] = [
    (QualityKey::Mood, "Mood/Emotion"),
    (QualityKey::Genre, "Intended Genre"),
    (QualityKey::Pace, "Pace/Dynamics"),
    (QualityKey::Instrumentation, "Texture/Instrumentation"),
    (QualityKey::LyricalTheme, "Lyrical Theme"),
    (QualityKey::NarrativeDynamic, "Narrative Dynamic"),
    (QualityKey::VocalStyle, "Vocal Style"),
    (QualityKey::DrumStyle, "Drum Style"),
    (QualityKey::SnareType, "Snare Sound"),
    (QualityKey::SpecialInstrument, "Special Instrument Feature"),
];

fn quality_lines(qualities: &Qualities, labels: &[(QualityKey, &str)]) -> String {
    labels
        .iter()
        .map(|(key, label)| format!("- {}: {}", label, qualities.describe(*key)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn names(singers: &[Singer]) -> Vec<&str> {
    singers.iter().map(|s| s.name.as_str()).collect()
}

fn labels(singers: &[Singer]) -> Vec<String> {
    singers.iter().map(Singer::label).collect()
}

/// `[Full Name is a female voice]`, one line per singer.
pub fn singer_introductions(singers: &[Singer]) -> String {
    singers
        .iter()
        .map(|s| format!("[{} is a female {}]", s.name, s.voice.to_lowercase()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn expand_topic_prompt(topic: &str, singers: &[Singer], rating: SongRating) -> String {
    let singer_names = names(singers);
    let performers = match Ensemble::of(singers) {
        Ensemble::Solo => format!("a solo performance by {}.", singer_names.join(", ")),
        Ensemble::Duet => format!("a duet between {} and {}.", singer_names[0], singer_names[1]),
        Ensemble::Choir => format!("a small choir piece for {}.", singer_names.join(", ")),
    };

    let personal_context = relationship_for(singers)
        .map(|r| {
            format!(
                "\nFor additional, optional context about the performers:  {} {}\n",
                r.topic_context, TOPIC_SAPPHIC_SENSIBILITY
            )
        })
        .unwrap_or_default();

    format!(
        "You are a creative muse. Your goal is to expand a user's song idea into a rich, descriptive paragraph of about 300-500 words. This will be used as the basis for a song.

{rating}

The song will be performed by {performers} This context can optionally influence the narrative. For example, a solo might be more introspective, while a duet or choir song could explore themes of interaction, harmony, or contrasting viewpoints.
{personal_context}
If the user's topic mentions any names, you must incorporate them into the narrative you create.

Focus on imagery, emotion, and potential narrative arcs. Do not write lyrics, just the underlying story and mood. Do not mention specific instruments or musical styles.

User topic: \"{topic}\"",
        rating = rating_instruction(rating, "narrative"),
    )
}

fn language_and_performer_instructions(state: &CreativeState) -> (String, String) {
    let singers = &state.singers;
    let language = &state.language;
    let language2 = &state.language2;
    let bilingual = state.is_bilingual();
    let singer_labels = labels(singers);
    let roles = roles_instruction(singers);

    let mut language_instruction = format!(
        "The song must be written entirely in {}. The title must also be in {}.",
        language, language
    );

    let performer_instruction = match Ensemble::of(singers) {
        Ensemble::Solo => {
            let solo = singers.first().cloned().unwrap_or_else(lead_singer);
            format!(
                "The song is a solo performed by {} ({}). All lyrics should be for this singer, using the label {}.",
                solo.name,
                solo.voice,
                solo.label()
            )
        }
        Ensemble::Duet => {
            let (first, second) = (&singers[0], &singers[1]);
            let duet_labels = singer_labels.join(" and ");
            if bilingual {
                language_instruction = format!(
                    "This is a bilingual song. The title must be in {language}.
- {first_name} will sing in {language}.
- {second_name} will sing in {language2}.
**IMPORTANT RULE:** Before each singer's part, you MUST specify the language in brackets. Example: \"[{language}] {first_label}\" or \"[{language2}] {second_label}\".
For duet parts sung together, favor {language} unless the blend of languages is more artistic.",
                    first_name = first.name,
                    second_name = second.name,
                    first_label = first.label(),
                    second_label = second.label(),
                );
                format!(
                    "The song is a bilingual duet. {} Use labels {} to assign parts. Use [Duet] when they sing together.",
                    roles, duet_labels
                )
            } else {
                format!(
                    "The song is a duet performed by {} ({}) and {} ({}). {} Use the labels {} to assign parts. Use [Duet] when they sing together.",
                    first.name, first.voice, second.name, second.voice, roles, duet_labels
                )
            }
        }
        Ensemble::Choir => {
            if bilingual {
                let second = &singers[1];
                language_instruction = format!(
                    "This is a bilingual choir song. The primary language is {language}, and the title must be in {language}.
- {second_name} ({second_voice}) should sing her solo parts in {language2}.
- All other singers sing in {language}.
**IMPORTANT RULE:** Before each singer's part, you MUST specify the language in brackets. Example: \"[{language}] {first_label}\" or \"[{language2}] {second_label}\".
For full choir parts, use the primary language, {language}.",
                    second_name = second.name,
                    second_voice = second.voice,
                    first_label = singers[0].label(),
                    second_label = second.label(),
                );
                format!(
                    "The song is for a female choir of {}. {} Clearly label all parts (e.g., {}, [Choir]).",
                    singers.len(),
                    roles,
                    singer_labels[..2].join(", ")
                )
            } else {
                format!(
                    "The song is for a female choir of {}. {} Clearly label parts for each singer using their names in brackets (e.g., {}). Use [Choir] or [All] when they all sing together.",
                    singers.len(),
                    roles,
                    singer_labels.join(", ")
                )
            }
        }
    };

    (performer_instruction, language_instruction)
}

/// A selected narrative dynamic replaces the default relationship framing.
fn relationship_instruction(state: &CreativeState) -> String {
    if let Some(dynamic) = state.qualities.get(QualityKey::NarrativeDynamic) {
        return format!(
            "The core narrative dynamic of the song is: **{}**. The lyrics MUST reflect this dynamic in the interactions and perspectives of the singers. All lyrics should be interpreted from a female perspective.",
            dynamic
        );
    }
    match relationship_for(&state.singers) {
        Some(r) => format!("{} {}", LYRICS_SAPPHIC_SENSIBILITY, r.lyrics_context),
        None => LYRICS_SAPPHIC_SENSIBILITY.to_string(),
    }
}

pub fn title_and_lyrics_prompt(state: &CreativeState) -> String {
    let (performer_instruction, language_instruction) = language_and_performer_instructions(state);
    let singer_labels = labels(&state.singers);
    let label_rule = if state.singers.len() > 1 {
        format!(
            "Clearly label parts for each singer or group (e.g., {}, [Duet], [Choir]).",
            singer_labels.join(", ")
        )
    } else {
        format!("Label the singer part as {}.", singer_labels.join(", "))
    };
    let topic = if state.topic.is_empty() {
        DEFAULT_SONG_THEME
    } else {
        state.topic.as_str()
    };

    format!(
        "You are an expert songwriter creating lyrics for a song.

**Primary Directive:** The song's narrative, story, and core subject matter MUST be derived exclusively from the \"Song's Theme\" provided below. The musical style, instruments, and other qualities are for tonal and structural guidance only; they should influence the *feeling* and *rhythm* of the lyrics, but **not** the story itself. For example, if the style is 'Merfolk/Siren' but the topic is 'a robot finding a friend', the lyrics must be about the robot, with a haunting or alluring *tone*, not about the sea.

{rating}

{performer_instruction}
{language_instruction}
{relationship}

The song should be written in the *tonal spirit* of: {style}.
The song's *rhythmic feel* should be compatible with: {instruments}.

The song's theme, which dictates the story, is based on this:
---
{topic}
---
Also, consider these qualities for the song's overall feel:
{qualities}
These should influence the lyrical tone, the structure, and the performance directions you provide in brackets.

Your task is to generate a suitable song title and the full song lyrics. To ensure the song fits within typical generation limits (around 2-3 minutes including instrumentals), please create a concise song structure.
For example, a good structure would be: [Intro], [Verse 1], [Chorus], [Verse 2], [Chorus], [Bridge], [Instrumental Solo], [Chorus], [Outro].
Avoid overly long verses or too many repeating sections.

**Crucial First Step:** Before any other content, the VERY FIRST lines of the generated lyrics MUST be the introductions for all singers, each on a new line, exactly as specified below:
{introductions}

Follow these strict formatting rules for Suno AI:
- Use tags like [Intro], [Verse], [Chorus], [Bridge], [Outro], etc., to structure the song.
- Indicate non-lyrical vocalizations like (oohs), (aahs).
- Use [Spoken Word] for spoken parts.
- Use *sound effect* for sound effects, like *thunder clap*.
- {label_rule}

**Critically Important:** All musical or performance instructions MUST be enclosed in `[]` brackets. Do NOT write descriptive sentences about the music within the lyrics, such as 'The guitar comes in here'. Instead, use bracketed tags like `[Acoustic guitar intro]` or `[Music fades out]`. The lyrics should only contain the words to be sung and the bracketed instructions.

Output a JSON object with two keys: \"title\" and \"lyrics\". The title must be in {language}. The lyrics must follow the language instructions provided above.
Do not include any other text or explanation outside of the JSON object.",
        rating = rating_instruction(state.rating, "song"),
        relationship = relationship_instruction(state),
        style = state.style.as_deref().unwrap_or(DEFAULT_MUSIC_STYLE),
        instruments = state.instruments.join(", "),
        qualities = quality_lines(&state.qualities, &LYRICS_QUALITY_LABELS),
        introductions = singer_introductions(&state.singers),
        language = state.language,
    )
}

/// Response schema requested alongside [`title_and_lyrics_prompt`].
pub fn title_and_lyrics_schema(language: &str) -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": format!("A creative and fitting title for the song, in {}.", language)
            },
            "lyrics": {
                "type": "STRING",
                "description": "The full lyrics of the song, following all language and formatting rules. The structure should be concise (e.g., 2 verses, a bridge) to fit a 2-3 minute runtime. All instructions must be in brackets."
            }
        }
    })
}

pub fn image_prompt_prompt(
    topic: &str,
    style: Option<&str>,
    singers: &[Singer],
    descriptions: &CharacterDescriptions,
) -> String {
    let singer_names = names(singers);
    let subject = match (Ensemble::of(singers), relationship_for(singers)) {
        (_, Some(known)) => known.image_subject.to_string(),
        (Ensemble::Solo, None) => format!(
            "The image should feature a solo female musician, {}.",
            singer_names.join(", ")
        ),
        (Ensemble::Duet, None) => format!(
            "The image should feature a female music duet (two young women), {}, performing together.",
            singer_names.join(" and ")
        ),
        (Ensemble::Choir, None) => format!(
            "The image should feature a small female musical group of {} women: {}.",
            singers.len(),
            singer_names.join(", ")
        ),
    };
    let singer_descriptions = singers
        .iter()
        .map(|s| format!("- **{}'s Description:** {}", s.name, descriptions.description_for(s)))
        .collect::<Vec<_>>()
        .join("\n");
    let theme = if topic.is_empty() { DEFAULT_IMAGE_THEME } else { topic };

    format!(
        "You are an expert prompt engineer for text-to-image models like Imagen.
Your task is to create a single, detailed, high-quality image prompt for a song's cover art. The prompt must be strictly PG-rated or G-rated, ensuring it is family-friendly and safe-for-work.

**Core Theme Analysis:**
- The song's theme is: \"{theme}\".
- The music style is: {style}.
- Analyze this theme. If it is clearly about people, you can describe the performers. If it is about a place, an object, or an abstract concept, focus the prompt on creating a beautiful, artistic representation of that theme.
- **Crucially, do not include people or singers in the prompt unless the theme explicitly calls for it.** For example, a song about \"sunflowers in a field at sunset\" should not feature any people. A song about \"two friends on a road trip\" should.

**Performer Details (ONLY use if the theme is about people):**
- {subject}
{singer_descriptions}

**Instructions for the final prompt:**
- Combine all relevant elements into one cohesive, artistic scene.
- If depicting people, describe their appearances based on the descriptions, their clothing, their emotional expressions, and their interaction with each other.
- The background and environment of the image must subtly reflect the core theme and musical style.
- Use descriptive keywords that text-to-image models understand well:
    - For Composition: cinematic, dynamic angle, rule of thirds, photorealistic, 8k, hyper-detailed, intricate, sharp focus.
    - For Lighting: soft lighting, dramatic lighting, neon glow, golden hour, Rembrandt lighting.
    - For Mood: ethereal, energetic, melancholic, joyful, mysterious.

Output only the final prompt as a single line of text. Do not include any other explanations.",
        style = style.unwrap_or(DEFAULT_IMAGE_STYLE),
    )
}

/// Asks for exactly one entry of `styles`, copied verbatim.
pub fn style_suggestion_prompt(state: &CreativeState, styles: &[String]) -> String {
    let language_info = if state.is_bilingual() {
        format!("Languages: {} and {}", state.language, state.language2)
    } else {
        format!("Language: {}", state.language)
    };

    format!(
        "From the following list of music styles, which one best fits the song described below?
Your answer must be ONLY the style name, exactly as it appears in the list. Do not add any other words, punctuation, or explanations.

Available Styles:
{styles}

---
Description of the Song:
- Song Topic: \"{topic}\"
- {language_info}
{qualities}
---
",
        styles = styles.join(", "),
        topic = state.topic,
        qualities = quality_lines(&state.qualities, &STYLE_QUALITY_LABELS),
    )
}

pub fn report_introduction_prompt(title: &str, topic: &str, lyrics: &str, singers: &[Singer]) -> String {
    let has = |name: &str| singers.iter().any(|s| s.name == name);
    let mut character_context = String::new();
    let mut personal_notes = Vec::new();

    if has(MIRANDA) {
        character_context.push_str("- Miranda Noor: A passionate storyteller and musician (Indian/Dutch/American heritage). She is resilient, empathetic, and channels her experiences with identity and love into her music. She is in a romantic relationship with Annelies.\n");
        personal_notes.push("- A personal note from Miranda Noor, reflecting on the song's origin and its meaning to her.");
    }
    if has(ANNELIES) {
        character_context.push_str("- Annelies Brink: A calm, supportive, and creative graphic designer and poet from the Netherlands. She is loyal and optimistic, often providing a grounding presence. She is in a romantic relationship with Miranda.\n");
        personal_notes.push("- A personal note from Annelies Brink, reflecting on her perspective on the song and its creation.");
    }
    if character_context.is_empty() {
        character_context.push_str("No specific character context provided.");
    }

    format!(
        "You are a creative writer and biographer for the musical duo Noor (Miranda Noor and Annelies Brink). Your task is to write the introductory chapter for a song report about their new song, \"{title}\".

**Song Details:**
- Title: \"{title}\"
- Singers: {singers}
- Core Story/Theme:
---
{topic}
---
- Lyrics:
---
{lyrics}
---

**Character Context for Personal Notes:**
{character_context}
- General Theme: The artists explore themes of love, connection, and identity from a female perspective, often with a subtle sapphic sensibility. Their relationships (Miranda/Annelies are a couple) should inform the tone of their personal notes.

**Instructions:**
Your response must be structured in two distinct parts: \"The Story\" and \"Personal Notes\".

**Part 1: The Story**

1.  **Fictional Origin Story:**
    - As a creative writer, invent a compelling, fictional origin story for the song. This should be a small adventure or a moment of sudden inspiration.
    - **CRITICAL:** This story **MUST** be written as three or more distinct paragraphs. Each paragraph should be separated by a newline. Do not merge them into a single block of text. For example:
      Paragraph 1...

      Paragraph 2...

      Paragraph 3...
    - The story should be engaging and weave in elements from the song's theme and lyrics.

2.  **The Song's Message:**
    - Immediately after the story, write a new, separate paragraph that explains the core message of the song in simple, plain language. This paragraph should start with something like \"At its heart, the song is about...\"

**Part 2: Personal Notes**

1.  **Singer Reflections:**
    - After explaining the message, create the following sections, each with a short, heartfelt note from the singer's perspective.
    {personal_notes}
    - In each note, the singer should reflect on the fictional origin story you created and their personal connection to the song's message.

**Output Format:**
- Use Markdown for formatting. The personal notes must use `## A Note from [Singer Name]` headers.
- The entire response should be the report content. Do not add any preamble.
",
        singers = names(singers).join(", "),
        personal_notes = personal_notes.join("\n"),
    )
}

pub fn translation_prompt(lyrics: &str) -> String {
    format!(
        "Translate the following song lyrics to English.
**Crucial instructions:**
1.  Preserve the original song structure perfectly. This includes all tags like [Verse], [Chorus], [Bridge], [Intro], [Outro], etc.
2.  Preserve all singer labels, such as [Miranda], [Annelies], [Duet], [Choir], etc.
3.  Preserve all language specifiers like [English] or [Dutch] if they appear before a singer label.
4.  Translate only the lyrical content. Do not translate the tags or labels themselves.
5.  The goal is a natural-sounding English translation that fits the song's context, not a literal word-for-word translation. Capture the meaning and emotion.
6.  Output ONLY the translated lyrics text. Do not add any preamble, explanation, or extra formatting.

Lyrics to translate:
---
{lyrics}
---
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{roster, EMMA, FANNIE};

    fn state_with(count: usize, language: &str, language2: &str) -> CreativeState {
        let mut state = CreativeState::default();
        state.topic = "A lighthouse keeper".to_string();
        state.style = Some("Synthwave".to_string());
        state.instruments = vec!["Analog Synth".to_string(), "Drum Machine".to_string()];
        state.language = language.to_string();
        state.language2 = language2.to_string();
        state.set_singers(roster().into_iter().take(count).collect()).unwrap();
        state
    }

    #[test]
    fn test_lyrics_prompt_without_singers_or_style() {
        let mut state = state_with(1, "English", "English");
        state.singers.clear();
        state.style = None;
        let prompt = title_and_lyrics_prompt(&state);
        assert!(prompt.contains("The song is a solo performed by Miranda Noor (Soprano)."));
        assert!(prompt.contains("The song should be written in the *tonal spirit* of: Pop."));
    }

    #[test]
    fn test_lyrics_prompt_branches_on_singer_count() {
        let solo = title_and_lyrics_prompt(&state_with(1, "English", "English"));
        assert!(solo.contains("The song is a solo performed by Miranda Noor (Soprano)."));
        assert!(solo.contains("Label the singer part as [Miranda]."));

        let duet = title_and_lyrics_prompt(&state_with(2, "English", "English"));
        assert!(duet.contains("The song is a duet performed by Miranda Noor (Soprano) and Annelies Brink (Alto)."));
        assert!(duet.contains("Use the labels [Miranda] and [Annelies] to assign parts."));

        let choir = title_and_lyrics_prompt(&state_with(3, "English", "English"));
        assert!(choir.contains("The song is for a female choir of 3."));
        assert!(choir.contains("[Miranda], [Annelies], [Fannie]"));
    }

    #[test]
    fn test_singer_introductions_come_first() {
        for count in 1..=4 {
            let prompt = title_and_lyrics_prompt(&state_with(count, "English", "English"));
            let first_step = prompt.find("**Crucial First Step:**").unwrap();
            let intros = singer_introductions(&state_with(count, "English", "English").singers);
            assert_eq!(intros.lines().count(), count);
            let intro_pos = prompt.find(&intros).unwrap();
            assert!(intro_pos > first_step);
            assert!(prompt.find("Follow these strict formatting rules").unwrap() > intro_pos);
        }
        assert_eq!(
            singer_introductions(&roster()[3..]),
            "[Emma Vermeer is a female feminine baritone]"
        );
    }

    #[test]
    fn test_bilingual_prompt_requires_language_tags() {
        let duet = title_and_lyrics_prompt(&state_with(2, "English", "Dutch"));
        assert!(duet.contains("This is a bilingual song."));
        assert!(duet.contains("\"[English] [Miranda]\" or \"[Dutch] [Annelies]\""));
        assert!(!duet.contains("written entirely in"));

        let choir = title_and_lyrics_prompt(&state_with(4, "English", "Dutch"));
        assert!(choir.contains("Annelies Brink (Alto) should sing her solo parts in Dutch."));

        let same = title_and_lyrics_prompt(&state_with(2, "Dutch", "dutch"));
        assert!(same.contains("The song must be written entirely in Dutch."));
        assert!(!same.contains("IMPORTANT RULE"));
    }

    #[test]
    fn test_narrative_dynamic_replaces_relationship_framing() {
        let mut state = state_with(2, "English", "English");
        let default = title_and_lyrics_prompt(&state);
        assert!(default.contains(LYRICS_SAPPHIC_SENSIBILITY));
        assert!(default.contains("This song is for the couple Miranda and Annelies."));

        state
            .qualities
            .set(QualityKey::NarrativeDynamic, Some("Call and Response".to_string()));
        let dynamic = title_and_lyrics_prompt(&state);
        assert!(dynamic.contains("The core narrative dynamic of the song is: **Call and Response**."));
        assert!(!dynamic.contains(LYRICS_SAPPHIC_SENSIBILITY));
        assert!(!dynamic.contains("This song is for the couple"));
        assert!(dynamic.contains("- Narrative Dynamic: Call and Response"));
        assert!(dynamic.contains("- Mood: Not specified"));
    }

    #[test]
    fn test_lyrics_prompt_mandates_bracket_directions() {
        let prompt = title_and_lyrics_prompt(&state_with(2, "English", "English"));
        assert!(prompt.contains("'The guitar comes in here'"));
        assert!(prompt.contains("MUST be enclosed in `[]` brackets"));
        assert!(prompt.contains("**Content Rating:** The song must adhere to a \"PG-13\" rating."));
        assert!(prompt.contains("Performer Roles: Miranda Noor and Annelies Brink are main singers."));
    }

    #[test]
    fn test_empty_topic_uses_default_theme() {
        let mut state = state_with(1, "English", "English");
        state.topic.clear();
        assert!(title_and_lyrics_prompt(&state).contains(DEFAULT_SONG_THEME));
    }

    #[test]
    fn test_expand_topic_prompt() {
        let all = roster();
        let solo = expand_topic_prompt("rain", &all[..1], SongRating::G);
        assert!(solo.contains("performed by a solo performance by Miranda Noor."));
        assert!(!solo.contains("sapphic"));
        assert!(solo.ends_with("User topic: \"rain\""));

        let couple = expand_topic_prompt("rain", &all[..2], SongRating::G);
        assert!(couple.contains("a duet between Miranda Noor and Annelies Brink."));
        assert!(couple.contains("romantic couple"));
        assert!(couple.contains(TOPIC_SAPPHIC_SENSIBILITY));
        assert!(couple.contains("The narrative must adhere to a \"G\" rating."));

        let choir = expand_topic_prompt("rain", &all[..3], SongRating::R);
        assert!(choir.contains("a small choir piece for Miranda Noor, Annelies Brink, Fannie de Jong."));
        assert!(!choir.contains("sapphic"));
    }

    #[test]
    fn test_image_prompt_subjects_and_descriptions() {
        let descriptions = CharacterDescriptions::fallback();
        let friends = vec![Singer::new(FANNIE, "Mezzo-Soprano"), Singer::new(EMMA, "Feminine Baritone")];
        let prompt = image_prompt_prompt("", None, &friends, &descriptions);
        assert!(prompt.contains("close friends, Fannie de Jong and Emma Vermeer"));
        assert!(prompt.contains(DEFAULT_IMAGE_THEME));
        assert!(prompt.contains("The music style is: Pop."));
        assert!(prompt.contains(&format!("- **Emma Vermeer's Description:** {}", descriptions.emma)));

        let guests = vec![Singer::new("Ada", "Alto"), Singer::new("Bea", "Soprano")];
        let prompt = image_prompt_prompt("Stars", Some("Jazz"), &guests, &descriptions);
        assert!(prompt.contains("a female music duet (two young women), Ada and Bea, performing together."));
        assert!(prompt.contains("A young female musician with a Alto voice."));
        assert!(prompt.ends_with("Do not include any other explanations."));
    }

    #[test]
    fn test_style_suggestion_prompt_lists_candidates() {
        let state = state_with(2, "English", "Dutch");
        let prompt = style_suggestion_prompt(&state, &["Synthwave".to_string(), "Merfolk/Siren".to_string()]);
        assert!(prompt.contains("Available Styles:\nSynthwave, Merfolk/Siren"));
        assert!(prompt.contains("- Languages: English and Dutch"));
        assert!(prompt.contains("exactly as it appears in the list"));
    }

    #[test]
    fn test_report_introduction_notes_only_for_leads() {
        let all = roster();
        let prompt = report_introduction_prompt("Tides", "sea", "[Verse]", &all[2..]);
        assert!(prompt.contains("No specific character context provided."));
        assert!(!prompt.contains("A personal note from"));

        let prompt = report_introduction_prompt("Tides", "sea", "[Verse]", &all);
        assert!(prompt.contains("A personal note from Miranda Noor"));
        assert!(prompt.contains("A personal note from Annelies Brink"));
        assert!(prompt.contains("- Singers: Miranda Noor, Annelies Brink, Fannie de Jong, Emma Vermeer"));
    }

    #[test]
    fn test_translation_prompt_embeds_lyrics() {
        let prompt = translation_prompt("[Dutch] [Annelies]\nHallo");
        assert!(prompt.contains("---\n[Dutch] [Annelies]\nHallo\n---"));
        assert!(prompt.contains("Output ONLY the translated lyrics text."));
    }
}
