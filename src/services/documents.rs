use anyhow::Result;

use crate::services::assets::{Placeholders, StaticTextSource};
use crate::services::characters::{ANNELIES_PROFILE_PATH, MIRANDA_PROFILE_PATH};
use crate::services::markdown::{MarkdownRenderer, RenderProfile};

pub const ABOUT_GROUP_PATH: &str = "Noor-Brink.md";
pub const MANUAL_PATH: &str = "manual.md";
pub const TOS_PATH: &str = "tos.md";

pub const ABOUT_LOAD_FAILED: &str = "Artist information could not be loaded.";
const ABOUT_ERROR_MARKDOWN: &str = "## Error\n\nCould not load content at this time. Please try again later.";
const MANUAL_ERROR_HTML: &str = "<h2>Error</h2><p>Failed to load User Manual. Please try again later.</p>";
const TOS_ERROR_HTML: &str = "<h2>Error</h2><p>Failed to load Terms of Service. Please try again later.</p>";

/// The three pages of the About dialog, rendered to HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AboutPages {
    pub group: String,
    pub miranda: String,
    pub annelies: String,
}

impl AboutPages {
    pub fn sections(&self) -> [(&'static str, &str); 3] {
        [
            ("The Creators", self.group.as_str()),
            ("Miranda Noor", self.miranda.as_str()),
            ("Annelies Brink", self.annelies.as_str()),
        ]
    }
}

/// All three pages or, if any of them cannot be fetched, the error page
/// in all three places.
pub async fn render_about(source: &dyn StaticTextSource, placeholders: &Placeholders) -> AboutPages {
    let renderer = MarkdownRenderer::new(RenderProfile::about());
    let fetched = futures_util::try_join!(
        source.fetch_text(ABOUT_GROUP_PATH),
        source.fetch_text(MIRANDA_PROFILE_PATH),
        source.fetch_text(ANNELIES_PROFILE_PATH),
    );
    match fetched {
        Ok((group, miranda, annelies)) => AboutPages {
            group: renderer.render(&placeholders.expand(&group)),
            miranda: renderer.render(&placeholders.expand(&miranda)),
            annelies: renderer.render(&placeholders.expand(&annelies)),
        },
        Err(e) => {
            log::error!("Failed to fetch \"About\" content: {:#}", e);
            let error = renderer.render(ABOUT_ERROR_MARKDOWN);
            AboutPages {
                group: error.clone(),
                miranda: error.clone(),
                annelies: error,
            }
        }
    }
}

pub async fn render_manual(source: &dyn StaticTextSource) -> String {
    match source.fetch_text(MANUAL_PATH).await {
        Ok(text) => MarkdownRenderer::new(RenderProfile::manual()).render(&text),
        Err(e) => {
            log::error!("Failed to fetch manual markdown file: {:#}", e);
            MANUAL_ERROR_HTML.to_string()
        }
    }
}

pub async fn render_tos(source: &dyn StaticTextSource, placeholders: &Placeholders) -> String {
    match source.fetch_text(TOS_PATH).await {
        Ok(text) => MarkdownRenderer::new(RenderProfile::tos()).render(&placeholders.expand(&text)),
        Err(e) => {
            log::error!("Failed to fetch TOS markdown file: {:#}", e);
            TOS_ERROR_HTML.to_string()
        }
    }
}

/// The group page as markdown, for the report's last chapter.
pub async fn load_about_text(source: &dyn StaticTextSource, placeholders: &Placeholders) -> Result<String> {
    let text = source.fetch_text(ABOUT_GROUP_PATH).await?;
    Ok(placeholders.expand(&text))
}

/// Like [`load_about_text`] but degrades to a fixed sentence.
pub async fn about_text_or_fallback(source: &dyn StaticTextSource, placeholders: &Placeholders) -> String {
    match load_about_text(source, placeholders).await {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to load about content for report: {:#}", e);
            ABOUT_LOAD_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::NativeStorage;
    use crate::services::assets::StorageTextSource;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn placeholders() -> Placeholders {
        Placeholders::at(NaiveDate::from_ymd_opt(2026, 5, 4).unwrap())
    }

    fn source(dir: &std::path::Path) -> StorageTextSource {
        StorageTextSource::new(Arc::new(NativeStorage::new(dir)))
    }

    #[tokio::test]
    async fn test_about_expands_and_strips_images() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(ABOUT_GROUP_PATH), "![Noor](/noor.png)\n# Noor\n\nSince {year}.")?;
        std::fs::write(dir.path().join(MIRANDA_PROFILE_PATH), "Miranda is {miranda-age}.")?;
        std::fs::write(dir.path().join(ANNELIES_PROFILE_PATH), "Annelies is {annelies-age}.")?;

        let pages = render_about(&source(dir.path()), &placeholders()).await;
        assert_eq!(pages.group, "<h1>Noor</h1><p>Since 2026.</p>");
        assert_eq!(pages.miranda, "<p>Miranda is 19.</p>");
        assert_eq!(pages.annelies, "<p>Annelies is 19.</p>");
        Ok(())
    }

    #[tokio::test]
    async fn test_about_failure_renders_error_everywhere() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(ABOUT_GROUP_PATH), "# Noor")?;
        let pages = render_about(&source(dir.path()), &placeholders()).await;
        assert!(pages.group.starts_with("<h2>Error</h2>"));
        assert_eq!(pages.group, pages.annelies);
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_and_tos_fallbacks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = source(dir.path());
        assert_eq!(render_manual(&src).await, MANUAL_ERROR_HTML);
        assert_eq!(render_tos(&src, &placeholders()).await, TOS_ERROR_HTML);
        assert_eq!(about_text_or_fallback(&src, &placeholders()).await, ABOUT_LOAD_FAILED);

        std::fs::write(dir.path().join(TOS_PATH), "## Terms\n\nEffective {day} {month} {year}.")?;
        assert_eq!(
            render_tos(&src, &placeholders()).await,
            "<h2>Terms</h2><p>Effective 4 May 2026.</p>"
        );
        Ok(())
    }
}
