//! The chaptered song report, as markdown and as HTML.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::catalog::Catalog;
use crate::core::state::{CreativeState, QualityKey};
use crate::services::markdown::{MarkdownRenderer, RenderProfile, KARAOKE_VIEW_MARKER};
use crate::services::staleness::ReportRefresh;
use crate::utils::text::slugify;

pub const ABOUT_NOT_AVAILABLE: &str = "Artist information not available.";
const NO_INTRODUCTION: &str = "No introduction available.";
const UNTITLED: &str = "Untitled";
const FIRST_OPTIONAL_CHAPTER: usize = 5;

const REPORT_CSS: &str = "body { font-family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, 'Noto Sans', sans-serif, 'Apple Color Emoji', 'Segoe UI Emoji', 'Segoe UI Symbol', 'Noto Color Emoji'; color: #1f2937; background-color: #f9fafb; } main { max-width: 800px; margin: auto; padding: 2rem; } h1, h2, h3 { color: #111827; } blockquote { border-left: 4px solid #d1d5db; padding-left: 1rem; margin-left: 0; font-style: italic; color: #4b5563; }";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportVariant {
    /// Shown inside the app; the karaoke block is marked for restyling.
    View,
    /// Written to `report.md` and rendered into the standalone HTML file.
    Export,
}

/// Everything one report is built from.
#[derive(Clone, Copy, Debug)]
pub struct ReportContext<'a> {
    pub state: &'a CreativeState,
    pub catalog: &'a Catalog,
    pub introduction: &'a str,
    pub translation: &'a str,
    pub about: &'a str,
}

impl<'a> ReportContext<'a> {
    /// Uses the introduction and translation stored in the state.
    pub fn new(state: &'a CreativeState, catalog: &'a Catalog, about: &'a str) -> Self {
        Self {
            state,
            catalog,
            introduction: &state.report_introduction,
            translation: &state.translated_lyrics,
            about,
        }
    }

    /// Uses the texts of a regeneration pass, fallbacks included.
    pub fn with_refresh(mut self, refresh: &'a ReportRefresh) -> Self {
        self.introduction = &refresh.introduction;
        self.translation = &refresh.translation;
        self
    }
}

fn leading_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s+").expect("Invalid whitespace regex"))
}

fn or_default<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.is_empty() {
        fallback
    } else {
        text
    }
}

fn quality_lines(state: &CreativeState, catalog: &Catalog) -> String {
    QualityKey::ALL
        .iter()
        .filter_map(|&key| {
            let name = state.quality(key)?;
            let (group, quality) = catalog.quality(key, name)?;
            Some(format!(
                "- **{}: {}** - *{}*",
                group.group_name, quality.name, quality.description
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn instrument_lines(state: &CreativeState, catalog: &Catalog) -> String {
    state
        .instruments
        .iter()
        .map(|name| {
            let description = state
                .style
                .as_deref()
                .and_then(|style| catalog.instrument(style, name))
                .map(|i| i.description.as_str())
                .filter(|d| !d.is_empty())
                .unwrap_or("No description available.");
            format!("- **{}:** {}", name, description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the report. Chapters 1 to 4 are fixed; the translation chapter
/// is only present for songs with a non-English language and a stored
/// translation, and "About the Artists" always comes last.
pub fn build_report_markdown(ctx: &ReportContext<'_>, variant: ReportVariant) -> String {
    let state = ctx.state;
    let title = or_default(&state.title, UNTITLED);
    let style_info = state.style.as_deref().and_then(|s| ctx.catalog.style(s));

    let plain = state.plain_lyrics();
    let karaoke = match variant {
        ReportVariant::View => format!("{}{}</div>", KARAOKE_VIEW_MARKER, plain),
        ReportVariant::Export => plain,
    };

    let mut chapter = FIRST_OPTIONAL_CHAPTER;
    let translation_chapter = if state.song_has_non_english() && !ctx.translation.is_empty() {
        let languages = if state.is_bilingual() {
            format!("{}, {}", state.language, state.language2)
        } else {
            state.language.clone()
        };
        let text = format!(
            "\n---\n\n## Chapter {}: English Translation\n**Original Language(s):** {}\n### Translated Lyrics\n```\n{}\n```\n",
            chapter, languages, ctx.translation
        );
        chapter += 1;
        text
    } else {
        String::new()
    };
    let about_chapter = format!(
        "\n---\n\n## Chapter {}: About the Artists\n{}\n",
        chapter,
        or_default(ctx.about, ABOUT_NOT_AVAILABLE)
    );

    let qualities = quality_lines(state, ctx.catalog);
    let instruments = instrument_lines(state, ctx.catalog);
    let report = [
        format!("# Song Report: {}", title),
        String::new(),
        "## Chapter 1: The Story Behind the Song".to_string(),
        or_default(ctx.introduction, NO_INTRODUCTION).to_string(),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Chapter 2: Musical Blueprint".to_string(),
        format!("**Style: {}**", state.style.as_deref().unwrap_or("N/A")),
        style_info
            .map(|s| format!("> *{}*", s.description))
            .unwrap_or_default(),
        "### Chosen Qualities".to_string(),
        or_default(&qualities, "No specific qualities selected.").to_string(),
        "### Instruments".to_string(),
        or_default(&instruments, "No instruments selected.").to_string(),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Chapter 3: The Libretto".to_string(),
        format!("**Title:** {}", title),
        "### Formatted Lyrics".to_string(),
        "```".to_string(),
        or_default(&state.lyrics, "No lyrics generated.").to_string(),
        "```".to_string(),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Chapter 4: The Karaoke Session".to_string(),
        "### Karaoke Lyrics".to_string(),
        karaoke,
        translation_chapter,
        about_chapter,
    ]
    .join("\n");

    // Blank lines and indentation are dropped, code blocks included.
    leading_whitespace().replace_all(report.trim(), "").into_owned()
}

/// Standalone HTML file with inline CSS and no external resources.
pub fn render_report_html_document(title: &str, markdown: &str) -> String {
    let body = MarkdownRenderer::new(RenderProfile::report_export()).render(markdown);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Song Report: {title}</title>
    <style> {css} </style>
</head>
<body>
    <main>
        <article>
            {body}
        </article>
    </main>
</body>
</html>"#,
        title = title,
        css = REPORT_CSS,
        body = body
    )
}

/// HTML fragment for the in-app report page.
pub fn render_report_view_html(markdown: &str) -> String {
    MarkdownRenderer::new(RenderProfile::report_view()).render(markdown)
}

/// The style followed by the selected instruments, comma separated.
pub fn style_and_instruments_line(state: &CreativeState) -> String {
    state
        .style
        .iter()
        .chain(state.instruments.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn file_stem(title: &str, fallback: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

pub fn report_file_name(title: &str) -> String {
    format!("{}.md", file_stem(title, "song_report"))
}

pub fn bundle_file_name(title: &str) -> String {
    format!("{}.zip", file_stem(title, "song_collection"))
}
